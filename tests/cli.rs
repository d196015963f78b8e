use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

fn spawn_server(dir: &std::path::Path, args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_coi-serve"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    None
}

fn read_listening_port(child: &mut Child) -> u16 {
    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    line.trim_start_matches("HTTP Server listening at port ")
        .trim_end_matches(" ..\n")
        .parse()
        .unwrap()
}

#[test]
fn interrupt_after_serving_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

    let mut child = spawn_server(dir.path(), &["-a", "127.0.0.1", "-p", "0"]);

    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    assert!(line.starts_with("HTTP Server listening at port "), "{line}");

    let port: u16 = line
        .trim_start_matches("HTTP Server listening at port ")
        .trim_end_matches(" ..\n")
        .parse()
        .unwrap();

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream
        .write_all(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).unwrap();
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(reply.contains("Content-Type: text/html\r\n"));
    assert!(reply.contains("Cross-Origin-Embedder-Policy: require-corp\r\n"));
    assert!(reply.contains("Cross-Origin-Opener-Policy: same-origin\r\n"));
    assert!(reply.ends_with("\r\n\r\n<html></html>"));

    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);

    let status = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap_or_else(|| {
        let _ = child.kill();
        panic!("server did not exit after SIGINT");
    });
    assert!(status.success(), "exit status {status:?}");
}

#[test]
fn interrupt_with_idle_connection_exits_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = spawn_server(dir.path(), &["-a", "127.0.0.1", "-p", "0"]);
    let port = read_listening_port(&mut child);

    let _idle = TcpStream::connect(("127.0.0.1", port)).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);

    let status = wait_with_timeout(&mut child, Duration::from_secs(3)).unwrap_or_else(|| {
        let _ = child.kill();
        panic!("server waited on an idle connection after SIGINT");
    });
    assert!(status.success(), "exit status {status:?}");
}

#[test]
fn port_in_use_fails_before_listening() {
    let dir = tempfile::tempdir().unwrap();
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port().to_string();

    let mut child = spawn_server(dir.path(), &["--address", "127.0.0.1", "--port", &port]);

    let status = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap_or_else(|| {
        let _ = child.kill();
        panic!("server kept running on a taken port");
    });
    assert!(!status.success());

    let mut stdout = String::new();
    child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
    assert!(!stdout.contains("listening"));
}

#[test]
fn unknown_flag_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = spawn_server(dir.path(), &["--root", "/tmp"]);
    let status = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap();
    assert!(!status.success());
}
