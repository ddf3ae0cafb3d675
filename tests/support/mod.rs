#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const PROXY_VARS: [&str; 6] = [
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

/// A throwaway data directory.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write_file("kogura.toml", contents)
    }

    /// Point the interpreter at a local endpoint.
    pub fn use_endpoint(&self, url: &str) -> PathBuf {
        self.write_config(&format!(
            "[schedule]\nutc_offset = \"+09:00\"\n\n[interpreter]\nendpoint = \"{url}\"\nmodel = \"test-model\"\napi_key_env = \"KOGURA_TEST_API_KEY\"\ntimeout_secs = 5\n"
        ))
    }

    pub fn seed_tasks(&self, tasks: &Value) {
        self.write_file(
            "tasks.json",
            &serde_json::to_string_pretty(tasks).expect("serialize tasks"),
        );
    }

    pub fn read_tasks(&self) -> Vec<Value> {
        let raw = fs::read_to_string(self.file("tasks.json")).expect("read tasks.json");
        serde_json::from_str(&raw).expect("parse tasks.json")
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.read_tasks()
            .iter()
            .map(|task| task["id"].as_str().expect("id").to_string())
            .collect()
    }

    pub fn read_collapse(&self) -> Value {
        let raw = fs::read_to_string(self.file("collapsedDates.json"))
            .expect("read collapsedDates.json");
        serde_json::from_str(&raw).expect("parse collapsedDates.json")
    }

    /// The binary, bound to this data directory.
    pub fn kogura(&self) -> Command {
        let mut cmd = Command::cargo_bin("kogura").expect("binary");
        cmd.arg("--data-dir")
            .arg(self.path())
            .env_remove("KOGURA_DATA_DIR")
            .env_remove("RUST_LOG");
        for var in PROXY_VARS {
            cmd.env_remove(var);
        }
        cmd
    }
}

pub fn task_json(id: &str, datetime: &str, content: &str) -> Value {
    serde_json::json!({
        "id": id,
        "rawInput": content,
        "content": content,
        "datetime": datetime,
        "durationText": "01:00",
        "type": "schedule",
        "done": false,
    })
}

/// Three upcoming tasks (two on one day) and two past ones.
pub fn sample_tasks() -> Value {
    Value::Array(vec![
        task_json("01j0000000000000000000aaa1", "2099-03-01T00:00:00Z", "朝ラン"),
        task_json("01j0000000000000000000bbb2", "2001-01-10T03:00:00Z", "昔の会議"),
        task_json("01j0000000000000000000ccc3", "2099-03-01T05:00:00Z", "ランチ"),
        task_json("01j0000000000000000000ddd4", "2099-03-05T09:00:00Z", "映画を見る"),
        task_json("01j0000000000000000000eee5", "2001-01-01T01:00:00Z", "初詣"),
    ])
}

pub fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

/// Chat-completions envelope around `content`.
pub fn chat_envelope(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
        }],
    })
    .to_string()
}

/// A one-shot HTTP endpoint. Joining returns the raw request it received.
pub struct FakeEndpoint {
    pub url: String,
    handle: JoinHandle<String>,
}

impl FakeEndpoint {
    pub fn serve_once(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let body = body.to_string();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                if status < 400 { "OK" } else { "Error" },
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
            request
        });
        Self {
            url: format!("http://{addr}/chat/completions"),
            handle,
        }
    }

    pub fn request(self) -> String {
        self.handle.join().expect("server thread")
    }
}

fn read_request(stream: &mut impl Read) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).expect("read request");
        if read == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..read]);
        if let Some(header_end) = find_header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}
