use assert_cmd::prelude::*;
use std::process::Command;

// We check the --help output in order to confirm that the clap cli is setup correctly.
// A badly declared argument makes clap panic whatever arguments are passed.
#[test]
fn check_clap_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("labpubs")?;

    cmd.arg("--help");
    cmd.assert().success();

    Ok(())
}

// Nothing listens on the discard port, so the first page request fails and the run must abort
// before the output directory is created.
#[test]
fn failed_fetch_exits_non_zero_without_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    std::fs::write(
        dir.path().join("labpubs.toml"),
        "zotero_url = \"http://127.0.0.1:9\"\n\
         group = \"1\"\n\
         publications = \"PUBS\"\n\
         preprints = \"PRE\"\n",
    )?;
    let out = dir.path().join("out");

    let mut cmd = Command::cargo_bin("labpubs")?;
    cmd.current_dir(dir.path())
        .arg(&out)
        .arg("--quiet");
    cmd.assert().failure().code(2);

    assert!(!out.exists());
    Ok(())
}

// No group or collection ids are configured.
#[test]
fn missing_config_exits_non_zero() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;

    let mut cmd = Command::cargo_bin("labpubs")?;
    cmd.current_dir(dir.path()).arg("--quiet");
    cmd.assert().failure().code(2);

    assert!(!dir.path().join("data").exists());
    Ok(())
}

// Fatal errors go through the logger, which still prints errors when quiet.
#[test]
fn fatal_error_is_logged_with_its_cause() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;

    let mut cmd = Command::cargo_bin("labpubs")?;
    cmd.current_dir(dir.path()).arg("--quiet");
    let assert = cmd.assert().failure().code(2);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("Cannot load the configuration"), "{stderr}");
    assert!(stderr.contains("group is not set"), "{stderr}");
    Ok(())
}
