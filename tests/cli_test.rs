mod common;

use anyhow::Result;
use common::TestEnvironment;

#[test]
fn list_prints_catalog_without_updating_anything() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["--list"])?;
    assert_eq!(output.exit_code, 0, "list failed: {}", output.stderr);
    assert!(output.stdout.contains("fldigi"));
    assert!(output.stdout.contains("wsjtx"));
    assert!(output.stdout.contains("hamclock"));

    // Listing resolves roots and writes a default config, nothing more.
    assert!(
        env.home()
            .join(".config/shackup/shackup.toml")
            .exists()
    );
    Ok(())
}

#[test]
fn unknown_application_is_skipped_and_run_still_succeeds() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["definitely-not-an-app"])?;
    assert_eq!(output.exit_code, 0, "stderr: {}", output.stderr);
    assert!(output.stderr.contains("unknown application"));
    Ok(())
}

#[test]
fn unknown_application_events_are_json_in_json_mode() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["--json", "definitely-not-an-app"])?;
    assert_eq!(output.exit_code, 0);

    let warn_line = output
        .stderr
        .lines()
        .find(|line| line.contains("app.unknown"))
        .expect("expected an app.unknown event");
    let event: serde_json::Value = serde_json::from_str(warn_line)?;
    assert_eq!(event["level"], "warn");
    Ok(())
}

#[test]
fn help_documents_the_flags() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["--help"])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("--force"));
    assert!(output.stdout.contains("--self-check"));
    assert!(output.stdout.contains("--list"));
    Ok(())
}

#[test]
fn completions_generate_for_bash() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["--completions", "bash"])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("shackup"));
    Ok(())
}
