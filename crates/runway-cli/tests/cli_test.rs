use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const VALID_KEY: &str = r#"{"type":"service_account","project_id":"my-project-id"}"#;

/// `runway` with a clean environment.
fn runway() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("runway");
    cmd.env_clear();
    cmd
}

/// `runway` with the minimal deploy settings, invoking `/bin/echo` instead
/// of gcloud.
fn runway_deploy() -> assert_cmd::Command {
    let mut cmd = runway();
    cmd.args(["--program", "/bin/echo"])
        .env("PLUGIN_ACTION", "deploy")
        .env("PLUGIN_TOKEN", VALID_KEY)
        .env("PLUGIN_SERVICE", "my-service")
        .env("PLUGIN_IMAGE", "my-image");
    cmd
}

// ── Help / Version ──

#[test]
fn shows_help() {
    runway()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deploy container images to Cloud Run"));
}

#[test]
fn shows_version() {
    runway()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("runway"));
}

#[test]
fn short_v_shows_version() {
    runway()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("runway"))
        .stderr(predicate::str::contains("runway cloud run plugin"));
}

// ── Resolution failures ──

#[test]
fn fails_without_settings() {
    runway()
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing action"));
}

#[test]
fn fails_without_token() {
    runway()
        .env("PLUGIN_ACTION", "deploy")
        .env("PLUGIN_SERVICE", "my-service")
        .env("PLUGIN_IMAGE", "my-image")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing token"));
}

#[test]
fn fails_on_malformed_additional_flags() {
    runway_deploy()
        .env("PLUGIN_ADDL_FLAGS", r#"{"impossible-structure"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse additional flags"));
}

#[test]
fn fails_on_unsupported_action() {
    runway_deploy()
        .env("PLUGIN_ACTION", "unknown-action")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not implemented yet"));
}

// ── Deploy ──

#[test]
fn deploy_runs_all_steps() {
    runway_deploy()
        .assert()
        .success()
        .stdout(predicate::str::contains("version\n"))
        .stdout(predicate::str::contains("auth activate-service-account --key-file"))
        .stdout(predicate::str::contains(
            "--quiet beta run deploy my-service --image my-image --project my-project-id --platform managed",
        ))
        .stderr(predicate::str::contains("my-project-id"));
}

#[test]
fn deploy_with_legacy_settings() {
    runway()
        .args(["--program", "/bin/echo"])
        .env("PLUGIN_ACTION", "deploy")
        .env("TOKEN", VALID_KEY)
        .env("PLUGIN_SERVICE", "my-service")
        .env("PLUGIN_DEPLOYMENT_IMAGE", "legacy-image")
        .assert()
        .success()
        .stdout(predicate::str::contains("--image legacy-image"));
}

#[test]
fn deploy_passes_env_and_flags() {
    runway_deploy()
        .env("PLUGIN_ENV_SECRET_API_KEY", "secret")
        .env("PLUGIN_ADDL_FLAGS", r#"{"clear-config-maps":""}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("--set-env-vars ^:||:^API_KEY=secret"))
        .stdout(predicate::str::contains("--clear-config-maps"));
}

#[test]
fn failing_program_fails_deploy() {
    runway_deploy()
        .args(["--program", "/bin/false"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("version probe failed"));
}

#[test]
fn dry_run_executes_nothing() {
    runway_deploy()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy my-service").not())
        .stderr(predicate::str::contains("running"));
}

#[cfg(unix)]
#[test]
fn non_utf8_unrelated_variable_is_passed_through() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    runway_deploy()
        .env("UNRELATED_CI_VAR", OsStr::from_bytes(b"\xff\xfe"))
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy my-service"))
        .stderr(predicate::str::contains("UNRELATED_CI_VAR"));
}

// ── Credential file ──

#[test]
fn credential_file_removed_after_success() {
    let tmp = TempDir::new().unwrap();

    runway_deploy()
        .arg("--key-dir")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(tmp.path().to_str().unwrap()));

    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn credential_file_removed_after_failure() {
    let tmp = TempDir::new().unwrap();

    runway_deploy()
        .args(["--program", "/bin/false"])
        .arg("--key-dir")
        .arg(tmp.path())
        .assert()
        .failure();

    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn deploy_failure_reported_when_cleanup_also_fails() {
    // `/bin/sh <step>` runs the script named after the first gcloud argument
    // from the working directory. Activation deletes the key and fails.
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("version"), "exit 0\n").unwrap();
    std::fs::write(
        workspace.path().join("auth"),
        "/bin/rm -f \"$3\"\nexit 1\n",
    )
    .unwrap();
    let key_dir = TempDir::new().unwrap();

    runway_deploy()
        .args(["--program", "/bin/sh", "--key-dir"])
        .arg(key_dir.path())
        .env("DRONE_WORKSPACE", workspace.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("service account activation failed"))
        .stderr(predicate::str::contains("failed to remove credential file"));

    assert_eq!(std::fs::read_dir(key_dir.path()).unwrap().count(), 0);
}

// ── Env file ──

#[test]
fn reads_settings_from_env_file() {
    let tmp = TempDir::new().unwrap();
    let env_file = tmp.path().join("plugin.env");
    std::fs::write(
        &env_file,
        format!(
            "PLUGIN_ACTION=deploy\n\
             PLUGIN_TOKEN='{VALID_KEY}'\n\
             PLUGIN_SERVICE=file-service\n\
             PLUGIN_IMAGE=file-image\n"
        ),
    )
    .unwrap();

    runway()
        .args(["--program", "/bin/echo", "--env-file"])
        .arg(&env_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy file-service --image file-image"));
}

#[test]
fn process_env_wins_over_env_file() {
    let tmp = TempDir::new().unwrap();
    let env_file = tmp.path().join("plugin.env");
    std::fs::write(&env_file, "PLUGIN_SERVICE=file-service\n").unwrap();

    runway_deploy()
        .arg("--env-file")
        .arg(&env_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy my-service"));
}

#[test]
fn missing_env_file_fails() {
    runway_deploy()
        .args(["--env-file", "/definitely/not/here.env"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read env file"));
}
