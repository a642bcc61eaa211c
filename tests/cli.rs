use std::io::Write;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

fn astroatmos(args: &[&str], dir: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_astroatmos"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run astroatmos")
}

fn site_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    let output = astroatmos(&["--help"], &dir);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("astroatmos"));
    for command in ["forecast", "kp", "moon"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_moon_runs_without_site() {
    let dir = TempDir::new().unwrap();
    let output = astroatmos(&["moon", "--phase", "full"], &dir);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Current phase:"));
    assert!(stdout.contains("Next Full Moon:"));
}

#[test]
fn test_moon_rejects_unknown_phase() {
    let dir = TempDir::new().unwrap();
    let output = astroatmos(&["moon", "--phase", "blue"], &dir);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_forecast_rejects_invalid_site() {
    let dir = TempDir::new().unwrap();
    let config = site_config("[location]\nlat = 120.0\nlon = -120.026\ntimezone = US/Pacific\n");
    let path = config.path().to_str().unwrap();

    let output = astroatmos(&["--config", path, "forecast", "--no-show"], &dir);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("atitude"), "{stderr}");
}

#[test]
fn test_forecast_rejects_window_override() {
    let dir = TempDir::new().unwrap();
    let config = site_config("[location]\nlat = 39.236\nlon = -120.026\ntimezone = US/Pacific\n");
    let path = config.path().to_str().unwrap();

    let output = astroatmos(&["--config", path, "forecast", "--hours", "500", "--no-show"], &dir);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("between 1 and 168"));
}
