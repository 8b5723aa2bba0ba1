//! Interactive application picker.
//!
//! Strictly a producer of the requested-application list: it never touches
//! the planner, so the core stays testable with synthetic requests.

use anyhow::{Context, Result, bail};
use dialoguer::MultiSelect;

use crate::catalog::ApplicationSpec;

pub fn pick(catalog: &[ApplicationSpec]) -> Result<Vec<String>> {
    let items: Vec<String> = catalog
        .iter()
        .map(|spec| format!("{:<10} {}", spec.id, spec.description))
        .collect();

    let selection = MultiSelect::new()
        .with_prompt("Select applications (space toggles, enter confirms)")
        .items(&items)
        .interact()
        .context("interactive selection failed")?;

    if selection.is_empty() {
        bail!("nothing selected");
    }

    Ok(selection
        .into_iter()
        .map(|idx| catalog[idx].id.to_string())
        .collect())
}
