//! End-to-end tests for the skatepark-sim binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[allow(deprecated)]
fn sim_cmd() -> Command {
    let mut cmd = Command::cargo_bin("skatepark-sim").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("SKATEPARK_CONFIG");
    cmd
}

// =============================================================================
// Output formats
// =============================================================================

mod output {
    use super::*;

    #[test]
    fn test_text_report() {
        sim_cmd()
            .args(["--duration", "0.5"])
            .assert()
            .success()
            .stdout(predicate::str::contains("kinetic"))
            .stdout(predicate::str::contains("track:              parabola"))
            .stdout(predicate::str::contains("frames:             30"));
    }

    #[test]
    fn test_json_lines() {
        let output = sim_cmd()
            .args(["--track", "loop", "--duration", "0.5", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8(output.stdout).unwrap();
        let lines: Vec<&str> = stdout.lines().collect();
        assert!(lines.len() > 2);
        for line in &lines[..lines.len() - 1] {
            let sample: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(sample["total"].is_f64());
        }
        let summary: serde_json::Value = serde_json::from_str(lines[lines.len() - 1]).unwrap();
        assert_eq!(summary["summary"]["track"], "loop");
    }

    #[test]
    fn test_logs_stay_off_stdout() {
        sim_cmd()
            .args(["--duration", "0.2", "--format", "json", "-vv"])
            .assert()
            .success()
            .stdout(predicate::str::contains("skater dropped").not())
            .stderr(predicate::str::contains("skater dropped"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "friction = 0.2").unwrap();
        writeln!(file, "mass = 80.0").unwrap();

        sim_cmd()
            .arg("--config")
            .arg(file.path())
            .args(["--duration", "0.2"])
            .assert()
            .success();
    }

    #[test]
    fn test_invalid_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "friction = -0.5").unwrap();

        sim_cmd()
            .arg("--config")
            .arg(file.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid config file"));
    }

    #[test]
    fn test_missing_config_file() {
        sim_cmd()
            .args(["--config", "/nonexistent/physics.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read config file"));
    }

    #[test]
    fn test_unknown_track() {
        sim_cmd()
            .args(["--track", "halfpipe"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }

    #[test]
    fn test_negative_gravity_flag_is_rejected() {
        sim_cmd()
            .args(["--gravity=-3", "--duration", "0.1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("gravity"));
    }
}

// =============================================================================
// Scenarios
// =============================================================================

mod scenarios {
    use super::*;

    #[test]
    fn test_drop_onto_the_ground() {
        sim_cmd()
            .args(["--track", "slope", "--x", "8", "--y", "2", "--duration", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ground strikes:     1"));
    }

    #[test]
    fn test_help() {
        sim_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--track"))
            .stdout(predicate::str::contains("--friction"));
    }
}
