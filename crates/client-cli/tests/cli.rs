//! Exit-code behavior of the binary, exercised end to end.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::Command;

/// Serve `connections` requests with the same canned response, on a thread.
fn canned_server(status_line: &str, body: &str, connections: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len(),
    );
    std::thread::spawn(move || {
        for _ in 0..connections {
            let Ok((mut sock, _)) = listener.accept() else {
                break;
            };
            let mut buf = vec![0u8; 8192];
            let _ = sock.read(&mut buf);
            let _ = sock.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

fn relato(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_relato"));
    // Keep the token store inside the test sandbox.
    cmd.env("XDG_CONFIG_HOME", config_home);
    cmd.env("HOME", config_home);
    cmd
}

#[test]
fn test_failed_login_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let url = canned_server("401 Unauthorized", r#"{"detail": "bad"}"#, 1);

    let output = relato(dir.path())
        .args(["--server", &url, "login", "a@b.pt", "--password", "wrong"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Incorrect email or password"), "{stderr}");
}

#[test]
fn test_successful_login_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let url = canned_server("200 OK", r#"{"access_token": "tok-123"}"#, 1);

    let output = relato(dir.path())
        .args(["--server", &url, "login", "a@b.pt", "--password", "right"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}
