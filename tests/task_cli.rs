mod support;

use predicates::str::contains;
use serde_json::Value;

use support::{chat_envelope, sample_tasks, stdout_json, FakeEndpoint, TestData};

const FENCED_DRAFT: &str = "```json\n{\"datetime\":\"2099-04-02 14:00\",\"content\":\"会議\",\"duration\":\"01:00\",\"type\":\"schedule\"}\n```";

fn seeded() -> TestData {
    let data = TestData::new();
    data.seed_tasks(&sample_tasks());
    data
}

#[test]
fn add_interprets_text_and_persists_task() {
    let data = TestData::new();
    let endpoint = FakeEndpoint::serve_once(200, &chat_envelope(FENCED_DRAFT));
    data.use_endpoint(&endpoint.url);

    let output = data
        .kogura()
        .args(["--json", "add", "4月2日14時", "会議"])
        .env("KOGURA_TEST_API_KEY", "secret-token")
        .output()
        .expect("run add");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let payload = stdout_json(&output);
    assert_eq!(payload["command"], "add");
    assert_eq!(payload["data"]["task"]["rawInput"], "4月2日14時 会議");
    assert_eq!(payload["data"]["task"]["content"], "会議");
    assert_eq!(payload["data"]["task"]["type"], "schedule");
    assert_eq!(payload["data"]["task"]["datetime"], "2099-04-02T05:00:00Z");
    assert_eq!(payload["data"]["task"]["done"], false);
    assert_eq!(payload["data"]["interpreter_output"], FENCED_DRAFT);

    let request = endpoint.request();
    assert!(request.starts_with("POST /chat/completions"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer secret-token"));
    assert!(request.contains("\"model\":\"test-model\""));
    assert!(request.contains("\"role\":\"system\""));

    let tasks = data.read_tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["durationText"], "01:00");
}

#[test]
fn add_shows_interpreter_output_to_humans() {
    let data = TestData::new();
    let endpoint = FakeEndpoint::serve_once(200, &chat_envelope(FENCED_DRAFT));
    data.use_endpoint(&endpoint.url);

    data.kogura()
        .args(["add", "4月2日14時 会議"])
        .assert()
        .success()
        .stdout(contains("Added task"))
        .stdout(contains("interpreter output:"))
        .stdout(contains("会議"));
}

#[test]
fn add_failure_is_generic_and_leaves_tasks_untouched() {
    let data = seeded();
    let before = data.read_tasks();
    let endpoint = FakeEndpoint::serve_once(500, "{\"error\":\"overloaded\"}");
    data.use_endpoint(&endpoint.url);

    data.kogura()
        .args(["add", "明日 買い物"])
        .assert()
        .code(4)
        .stderr(contains("Could not turn that into a task. Please try again."));
    endpoint.request();
    assert_eq!(data.read_tasks(), before);
}

#[test]
fn add_malformed_reply_reports_reason_in_json() {
    let data = TestData::new();
    let endpoint = FakeEndpoint::serve_once(200, &chat_envelope("Sorry, I can't help with that."));
    data.use_endpoint(&endpoint.url);

    let output = data
        .kogura()
        .args(["--json", "add", "明日 買い物"])
        .output()
        .expect("run add");
    assert_eq!(output.status.code(), Some(4));
    let payload = stdout_json(&output);
    assert_eq!(payload["error"]["details"]["reason"], "malformed_response");
    endpoint.request();
    assert!(!data.file("tasks.json").exists());
}

#[test]
fn add_rejects_blank_input_without_calling_out() {
    let data = TestData::new();
    data.use_endpoint("http://127.0.0.1:9/never");
    data.kogura()
        .args(["add", "   "])
        .assert()
        .code(2)
        .stderr(contains("Input is empty"));
}

#[test]
fn done_toggles_by_suffix() {
    let data = seeded();
    let output = data
        .kogura()
        .args(["--json", "done", "ccc3"])
        .output()
        .expect("run done");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["data"]["done"], true);

    let tasks = data.read_tasks();
    let task = tasks
        .iter()
        .find(|task| task["id"] == "01j0000000000000000000ccc3")
        .expect("task");
    assert_eq!(task["done"], true);
    assert_eq!(task["datetime"], "2099-03-01T05:00:00Z");

    data.kogura()
        .args(["done", "ccc3"])
        .assert()
        .success()
        .stdout(contains("not done"));
}

#[test]
fn edit_changes_fields_and_time() {
    let data = seeded();
    let output = data
        .kogura()
        .args([
            "--json",
            "edit",
            "aaa1",
            "--content",
            "朝ランする",
            "--datetime",
            "2099-03-02 07:30",
            "--type",
            "task",
            "--memo",
            "河川敷",
        ])
        .output()
        .expect("run edit");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let payload = stdout_json(&output);
    assert_eq!(payload["data"]["changed"], true);

    let tasks = data.read_tasks();
    let task = tasks
        .iter()
        .find(|task| task["id"] == "01j0000000000000000000aaa1")
        .expect("task");
    assert_eq!(task["content"], "朝ランする");
    assert_eq!(task["rawInput"], "朝ラン");
    assert_eq!(task["datetime"], "2099-03-01T22:30:00Z");
    assert_eq!(task["type"], "task");
    assert_eq!(task["memo"], "河川敷");
}

#[test]
fn edit_requires_a_field_and_valid_values() {
    let data = seeded();
    data.kogura()
        .args(["edit", "aaa1"])
        .assert()
        .code(2)
        .stderr(contains("nothing to edit"));
    data.kogura()
        .args(["edit", "aaa1", "--datetime", "tomorrow"])
        .assert()
        .code(2)
        .stderr(contains("invalid datetime"));
    data.kogura()
        .args(["edit", "aaa1", "--type", "errand"])
        .assert()
        .code(2)
        .stderr(contains("unknown task type"));
}

#[test]
fn rm_requires_confirmation() {
    let data = seeded();
    let before = data.task_ids();

    data.kogura()
        .args(["rm", "ddd4"])
        .assert()
        .code(3)
        .stderr(contains("requires confirmation"))
        .stderr(contains("--yes"));
    assert_eq!(data.task_ids(), before);

    data.kogura()
        .args(["rm", "ddd4", "--yes"])
        .assert()
        .success()
        .stdout(contains("Deleted task ddd4"));
    let after = data.task_ids();
    assert_eq!(after.len(), before.len() - 1);
    assert!(!after.contains(&"01j0000000000000000000ddd4".to_string()));
}

#[test]
fn ambiguous_and_unknown_ids_are_user_errors() {
    let data = TestData::new();
    data.seed_tasks(&Value::Array(vec![
        support::task_json("01j00000000000000000000ab1", "2099-01-01T00:00:00Z", "a"),
        support::task_json("01j00000000000000000000cb1", "2099-01-01T01:00:00Z", "b"),
    ]));

    let output = data
        .kogura()
        .args(["--json", "done", "b1"])
        .output()
        .expect("run done");
    assert_eq!(output.status.code(), Some(2));
    let payload = stdout_json(&output);
    assert_eq!(payload["error"]["details"]["candidates"].as_array().map(Vec::len), Some(2));

    data.kogura()
        .args(["done", "ffff"])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));
}

#[test]
fn corrupt_task_store_is_reported() {
    let data = TestData::new();
    data.write_file("tasks.json", "[{\"id\": ");
    data.kogura().arg("list").assert().code(4).stderr(contains("JSON error"));
}
