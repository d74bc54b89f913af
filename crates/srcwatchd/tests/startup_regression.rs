//! Startup regression tests.
//!
//! Runs the daemon binary against bad configurations and checks that each
//! one ends the process with a failure status and a single diagnostic.

use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread::{self, JoinHandle};

/// Run the daemon with a clean environment and JSON logs.
fn srcwatchd(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_srcwatchd"))
        .env_clear()
        .args(["--log-format", "json"])
        .args(args)
        .output()
        .unwrap()
}

/// Answer one inspect request with a running container.
fn fake_daemon(dir: &Path) -> (PathBuf, JoinHandle<String>) {
    let path = dir.join("docker.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }

        let body = r#"{"Id":"4f1c","Name":"/srcds","State":{"Status":"running","Running":true,"Restarting":false}}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        String::from_utf8_lossy(&head).into_owned()
    });

    (path, handle)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn missing_container_name_exits_with_failure() {
    let output = srcwatchd(&["--docker-socket", "/nonexistent/docker.sock"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("environment variable 'SRCDS_CONTAINER_NAME' is not set"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn unreachable_docker_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("docker.sock");

    let output = srcwatchd(&[
        "--container-name",
        "srcds",
        "--docker-socket",
        socket.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("cannot inspect container 'srcds'"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn host_is_checked_after_container_exists() {
    let dir = tempfile::tempdir().unwrap();
    let (socket, daemon) = fake_daemon(dir.path());

    let output = srcwatchd(&[
        "--container-name",
        "srcds",
        "--port",
        "27015",
        "--docker-socket",
        socket.to_str().unwrap(),
    ]);

    let head = daemon.join().unwrap();
    assert!(head.starts_with("GET /v1.25/containers/srcds/json "));
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("environment variable 'SRCDS_HOST' is not set"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn invalid_port_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (socket, daemon) = fake_daemon(dir.path());

    let output = srcwatchd(&[
        "--container-name",
        "srcds",
        "--host",
        "127.0.0.1",
        "--port",
        "70000",
        "--docker-socket",
        socket.to_str().unwrap(),
    ]);

    daemon.join().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("SRCDS_PORT"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn malformed_flag_is_a_usage_error() {
    let output = srcwatchd(&["--query-timeout-ms", "soon"]);

    assert!(!output.status.success());
    assert_ne!(output.status.code(), Some(0));
}
