use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar_with_clock(exam_secs: u64) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_examd");
    let mut child = Command::new(exe)
        .env("EXAMD_EXAM_SECONDS", exam_secs.to_string())
        .env("EXAMD_TICK_MS", "20")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn examd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn open_as_admin(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &std::path::Path,
) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "admin",
        "auth.login",
        json!({ "role": "admin", "username": "admin", "password": "admin" }),
    );
}

#[test]
fn countdown_expiry_submits_exactly_once() {
    let workspace = temp_dir("examd-exam-timeout");
    let (mut child, mut stdin, mut reader) = spawn_sidecar_with_clock(10);
    open_as_admin(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.import",
        json!({ "rows": [{ "id": "s1", "username": "ana", "password": "pw" }] }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "exams.import",
        json!({ "rows": [
            { "ExamTitle": "Quick", "Question": "One", "Type": "Open" },
            { "ExamTitle": "Quick", "Question": "Two", "Type": "Open" }
        ] }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "3", "auth.logout", json!({}));

    let login = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "role": "student", "username": "ana", "password": "pw" }),
    );
    let question_id = login["payload"]["current"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "exam.answer",
        json!({ "questionId": question_id, "answer": "in time" }),
    );

    std::thread::sleep(Duration::from_millis(1500));

    let view = request_ok(&mut stdin, &mut reader, "6", "exam.view", json!({}));
    assert_eq!(view["status"], "submitted");
    assert_eq!(view["remainingSecs"], 0);
    assert_eq!(view["remaining"], "0:00");
    assert_eq!(view["clockRunning"], false);

    let routed = request_ok(&mut stdin, &mut reader, "7", "auth.view", json!({}));
    assert_eq!(routed["view"], "submitted");

    let manual = request_ok(&mut stdin, &mut reader, "8", "exam.submit", json!({}));
    assert_eq!(manual["alreadySubmitted"], true);
    assert_eq!(manual["response"]["answers"][0]["answer"], "in time");

    let _ = request_ok(&mut stdin, &mut reader, "9", "auth.logout", json!({}));
    let dash = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "auth.login",
        json!({ "role": "admin", "username": "admin", "password": "admin" }),
    );
    assert_eq!(dash["payload"]["responseCount"], 1);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
