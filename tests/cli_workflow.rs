use std::path::Path;
use std::process::{Command, Output};

fn mapard(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mapard"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .output()
        .expect("run mapard")
}

fn stdout_token(output: &Output, index: usize) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split_whitespace()
        .nth(index)
        .unwrap_or_else(|| panic!("missing token {index} in {stdout:?}"))
        .to_string()
}

#[test]
fn client_intake_queue_round_trip() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let data_dir = temp.path().join("data");

    let added = mapard(
        &data_dir,
        &[
            "client",
            "add",
            "--name",
            "Ada Lovelace",
            "--email",
            "ada@example.com",
        ],
    );
    assert!(added.status.success());
    let client_id = stdout_token(&added, 2);

    // Re-registration with the same email must return the same id.
    let again = mapard(
        &data_dir,
        &[
            "client",
            "add",
            "--name",
            "Ada L.",
            "--email",
            "ada@example.com",
        ],
    );
    assert!(again.status.success());
    assert_eq!(stdout_token(&again, 2), client_id);

    let created = mapard(
        &data_dir,
        &[
            "intake",
            "create",
            "--client",
            &client_id,
            "--type",
            "baseline",
            "--email",
            "ada@example.com",
        ],
    );
    assert!(created.status.success());
    let intake_id = stdout_token(&created, 2);
    assert_eq!(intake_id, format!("I-{client_id}-0001"));

    let authorized = mapard(&data_dir, &["intake", "authorize", &intake_id]);
    assert!(authorized.status.success());

    let queue = mapard(&data_dir, &["queue", "--json"]);
    assert!(queue.status.success());
    let entries: serde_json::Value =
        serde_json::from_slice(&queue.stdout).expect("parse queue JSON");
    let entries = entries.as_array().expect("queue is an array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], intake_id.as_str());
    assert_eq!(entries[0]["status"], "authorized");
    assert_eq!(entries[0]["intake_type"], "baseline");
}

#[test]
fn repeated_authorization_is_rejected_with_a_transition_error() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let data_dir = temp.path().join("data");

    let added = mapard(
        &data_dir,
        &[
            "client",
            "add",
            "--name",
            "Grace Hopper",
            "--email",
            "grace@example.com",
        ],
    );
    let client_id = stdout_token(&added, 2);

    let created = mapard(
        &data_dir,
        &[
            "intake",
            "create",
            "--client",
            &client_id,
            "--type",
            "incident",
        ],
    );
    let intake_id = stdout_token(&created, 2);

    assert!(mapard(&data_dir, &["intake", "authorize", &intake_id])
        .status
        .success());
    let second = mapard(&data_dir, &["intake", "authorize", &intake_id]);
    assert!(!second.status.success());
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("illegal transition"), "stderr: {stderr}");
}

#[test]
fn unknown_intake_types_are_rejected_at_the_boundary() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let data_dir = temp.path().join("data");

    let added = mapard(
        &data_dir,
        &[
            "client",
            "add",
            "--name",
            "Ada Lovelace",
            "--email",
            "ada@example.com",
        ],
    );
    let client_id = stdout_token(&added, 2);

    let created = mapard(
        &data_dir,
        &[
            "intake",
            "create",
            "--client",
            &client_id,
            "--type",
            "MONTHLY",
        ],
    );
    assert!(!created.status.success());
    let stderr = String::from_utf8_lossy(&created.stderr);
    assert!(stderr.contains("invalid intake type"), "stderr: {stderr}");
}
