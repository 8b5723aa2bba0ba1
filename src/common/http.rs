//! HTTP retrieval for scraped pages and artifact downloads.

use futures_util::StreamExt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::common::progress;
use crate::errors::UpdateError;

fn client() -> Result<reqwest::Client, UpdateError> {
    let client = reqwest::Client::builder()
        .user_agent(format!("shackup/{}", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Fetch a page as text. Non-success statuses are reported as transient
/// environment problems, not silently swallowed.
pub async fn fetch_text(url: &str) -> Result<String, UpdateError> {
    let response = client()?.get(url).send().await?;

    if !response.status().is_success() {
        return Err(UpdateError::Transient(format!(
            "{url} returned status {}",
            response.status()
        )));
    }

    Ok(response.text().await?)
}

/// Download a file into `dest`, streaming to disk with a progress bar.
/// A zero-byte result is a hard failure: it usually means a redirect page
/// or a dead link, and must never count as a successful acquisition.
pub async fn download(url: &str, dest: &Path) -> Result<u64, UpdateError> {
    let response = client()?.get(url).send().await?;

    if !response.status().is_success() {
        return Err(UpdateError::Transient(format!(
            "download of {url} failed with status {}",
            response.status()
        )));
    }

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| url.to_string());
    let bar = match response.content_length() {
        Some(total) if total > 0 => Some(progress::create_download_bar(total, name)),
        _ => None,
    };

    let mut file = File::create(dest)?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
        if let Some(bar) = &bar {
            bar.set_position(written);
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if written == 0 {
        // Remove the empty file so a rerun starts clean.
        let _ = std::fs::remove_file(dest);
        return Err(UpdateError::EmptyDownload(url.to_string()));
    }

    Ok(written)
}
