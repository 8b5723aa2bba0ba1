//! Desktop menu integration.
//!
//! After an install we adjust the application's menu entry: unhide it, hide
//! helper entries the upstream package drops into the menu, or repair a
//! launch command that does not work on the Pi image. All of this is
//! best-effort; a broken menu never fails an install.

use anyhow::{Context, Result, anyhow};
use duct::cmd;
use freedesktop_file_parser::{EntryType, parse};
use std::path::{Path, PathBuf};

use crate::ui::prelude::*;

#[derive(Debug, Clone, Copy)]
pub enum MenuAction {
    /// Make the entry visible in the menu.
    Show,
    /// Hide the entry (NoDisplay=true).
    Hide,
    /// Replace the Exec line with a known-good launch command.
    FixExec(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct MenuTweak {
    /// Desktop file id, e.g. "fldigi.desktop".
    pub entry: &'static str,
    pub action: MenuAction,
}

/// Apply a menu tweak and poke the desktop environment to re-read menus.
pub fn apply(tweak: &MenuTweak) -> Result<()> {
    let path = find_entry(tweak.entry)
        .ok_or_else(|| anyhow!("desktop entry {} not found", tweak.entry))?;

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let parsed = parse(&contents).context("Failed to parse desktop file")?;

    let updated = match tweak.action {
        MenuAction::Show => {
            if !parsed.entry.no_display.unwrap_or(false) {
                return Ok(());
            }
            set_desktop_key(&contents, "NoDisplay", "false")
        }
        MenuAction::Hide => {
            if parsed.entry.no_display.unwrap_or(false) {
                return Ok(());
            }
            set_desktop_key(&contents, "NoDisplay", "true")
        }
        MenuAction::FixExec(exec) => {
            match &parsed.entry.entry_type {
                EntryType::Application(app) if app.exec.as_deref() == Some(exec) => {
                    return Ok(());
                }
                EntryType::Application(_) => {}
                _ => return Err(anyhow!("{} is not an application entry", tweak.entry)),
            }
            set_desktop_key(&contents, "Exec", exec)
        }
    };

    write_entry(&path, &updated)?;
    refresh_menus();
    Ok(())
}

fn find_entry(entry: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from("/usr/local/share/applications"),
        PathBuf::from("/usr/share/applications"),
    ];
    if let Some(data_dir) = dirs::data_dir() {
        candidates.insert(0, data_dir.join("applications"));
    }

    candidates
        .into_iter()
        .map(|dir| dir.join(entry))
        .find(|path| path.exists())
}

/// Set `key` inside the `[Desktop Entry]` group, replacing an existing
/// assignment or inserting one right after the group header.
fn set_desktop_key(contents: &str, key: &str, value: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_main_group = false;
    let mut replaced = false;

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            // Leaving the main group without having seen the key: insert it.
            if in_main_group && !replaced {
                lines.push(format!("{key}={value}"));
                replaced = true;
            }
            in_main_group = trimmed == "[Desktop Entry]";
            lines.push(line.to_string());
            continue;
        }
        if in_main_group
            && !replaced
            && trimmed
                .split_once('=')
                .is_some_and(|(k, _)| k.trim() == key)
        {
            lines.push(format!("{key}={value}"));
            replaced = true;
            continue;
        }
        lines.push(line.to_string());
    }

    if !replaced {
        lines.push(format!("{key}={value}"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn write_entry(path: &Path, contents: &str) -> Result<()> {
    // System entries need elevated writes; user entries do not.
    if std::fs::write(path, contents).is_ok() {
        return Ok(());
    }

    let mut tmp = tempfile::NamedTempFile::new().context("creating temp desktop file")?;
    std::io::Write::write_all(&mut tmp, contents.as_bytes())
        .context("writing temp desktop file")?;
    let tmp_path = tmp
        .path()
        .to_str()
        .context("non-UTF-8 temp path")?
        .to_string();
    let dest = path.to_str().context("non-UTF-8 desktop entry path")?;

    cmd!("sudo", "install", "-m", "644", &tmp_path, dest)
        .run()
        .with_context(|| format!("installing {}", path.display()))?;

    Ok(())
}

/// Nudge the desktop environment. Failures are expected on headless setups.
fn refresh_menus() {
    for (program, args) in [
        ("update-desktop-database", vec!["/usr/local/share/applications"]),
        ("lxpanelctl", vec!["restart"]),
    ] {
        if which::which(program).is_err() {
            continue;
        }
        if let Err(e) = cmd(program, &args).stderr_null().run() {
            emit(
                Level::Debug,
                "desktop.refresh",
                &format!("{program} failed: {e}"),
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = "\
[Desktop Entry]
Type=Application
Name=Fldigi
Exec=fldigi
NoDisplay=true

[Desktop Action Other]
Name=Other
";

    #[test]
    fn replaces_existing_key_in_main_group_only() {
        let out = set_desktop_key(ENTRY, "NoDisplay", "false");
        assert!(out.contains("NoDisplay=false"));
        assert!(!out.contains("NoDisplay=true"));
        // The action group is untouched.
        assert!(out.contains("[Desktop Action Other]"));
    }

    #[test]
    fn inserts_missing_key_before_next_group() {
        let out = set_desktop_key(ENTRY, "Terminal", "false");
        let main_group_end = out.find("[Desktop Action Other]").unwrap();
        let inserted = out.find("Terminal=false").unwrap();
        assert!(inserted < main_group_end);
    }

    #[test]
    fn fixes_exec_line() {
        let out = set_desktop_key(ENTRY, "Exec", "fldigi --flarq-dir ~/flarq");
        assert!(out.contains("Exec=fldigi --flarq-dir ~/flarq"));
        assert!(!out.contains("Exec=fldigi\n"));
    }
}
