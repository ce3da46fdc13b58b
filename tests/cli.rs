use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_config(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp config");
    tmp.write_all(xml.as_bytes()).expect("write config");
    tmp
}

#[test]
fn autoplay_turns_the_camera_at_the_configured_speed() {
    let config = write_config(
        r#"<viewer>
  <autoplay>
    <speed>10</speed>
  </autoplay>
  <model>
    <name>chair</name>
    <size>1 2 1</size>
    <clip>
      <name>Idle</name>
      <duration-ms>1000</duration-ms>
    </clip>
  </model>
</viewer>
"#,
    );
    let mut cmd = Command::cargo_bin("model-viewer").expect("binary exists");
    cmd.arg(config.path())
        .args(["--frames", "100", "--step-ms", "10"]);
    cmd.assert()
        .success()
        .stdout(contains("Loaded model chair (1 clip(s))"))
        .stdout(contains("Final pose: yaw=10.00 pitch=0.00"))
        .stdout(contains("Pose changed on 100 frame(s)"))
        .stdout(contains("Rendered 100 frame(s)"));
}

#[test]
fn reset_returns_to_the_configured_orbit() {
    let config = write_config(
        r#"<viewer>
  <camera>
    <orbit>20 10 6</orbit>
    <interpolation-ms>200</interpolation-ms>
  </camera>
</viewer>
"#,
    );
    let mut cmd = Command::cargo_bin("model-viewer").expect("binary exists");
    cmd.arg(config.path())
        .args(["--frames", "30", "--drag", "320,0", "--reset"]);
    cmd.assert()
        .success()
        .stdout(contains("Loaded model default (0 clip(s))"))
        .stdout(contains("Final pose: yaw=20.00 pitch=10.00 distance=6.00"));
}

#[test]
fn invalid_config_reports_the_offending_tag() {
    let config = write_config("<viewer><camera><fov>wide</fov></camera></viewer>");
    let mut cmd = Command::cargo_bin("model-viewer").expect("binary exists");
    cmd.arg(config.path());
    cmd.assert()
        .failure()
        .stderr(contains("Error:"))
        .stderr(contains("<fov>"));
}

#[test]
fn missing_config_file_fails() {
    let mut cmd = Command::cargo_bin("model-viewer").expect("binary exists");
    cmd.arg("does-not-exist.xml");
    cmd.assert()
        .failure()
        .stderr(contains("failed to read does-not-exist.xml"));
}
