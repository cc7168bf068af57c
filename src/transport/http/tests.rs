//! Integration tests for the HTTP transport against a local listener.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, unbounded};
use rstest::{fixture, rstest};

use super::{AuthConfig, HttpTransport, HttpTransportConfig};
use crate::envelope::CONTENT_TYPE;
use crate::transport::Transport;

/// A request as seen by the fake collector. Header names are lowercased.
#[derive(Debug, Default)]
struct Received {
    request_line: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Received {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

fn receive(stream: &TcpStream) -> std::io::Result<Received> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut reader = BufReader::new(stream);
    let mut received = Received::default();
    reader.read_line(&mut received.request_line)?;

    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 && !line.trim().is_empty() {
        if let Some((name, value)) = line.split_once(':') {
            received
                .headers
                .insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
        line.clear();
    }

    let length = received
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    received.body = String::from_utf8_lossy(&body).into_owned();
    Ok(received)
}

/// Fake collector answering one request per entry of `statuses`.
///
/// Returns the base URL and a channel yielding each received request.
fn collector(listener: TcpListener, statuses: Vec<u16>) -> (String, Receiver<Received>) {
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for status in statuses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let Ok(received) = receive(&stream) else {
                return;
            };
            let reply =
                format!("HTTP/1.1 {status} X\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(reply.as_bytes());
            if tx.send(received).is_err() {
                return;
            }
        }
    });
    (base, rx)
}

#[fixture]
fn listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

fn quick_config() -> HttpTransportConfig {
    HttpTransportConfig::default().with_timeouts(Duration::from_secs(5), Duration::from_secs(5))
}

#[rstest]
fn posts_payload_with_content_type(listener: TcpListener) {
    let (base, rx) = collector(listener, vec![204]);
    let transport = HttpTransport::with_config(quick_config()).expect("spawn worker");

    let url = format!("{base}/ingest");
    assert!(transport.send_best_effort(&url, r#"{"logs":[]}"#, CONTENT_TYPE));

    let received = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert!(received.request_line.starts_with("POST /ingest "));
    assert_eq!(received.body, r#"{"logs":[]}"#);
    assert_eq!(received.header("content-type"), Some(CONTENT_TYPE));
}

#[rstest]
#[case::bearer(AuthConfig::Bearer { token: "t0k".into() }, "Bearer t0k")]
#[case::basic(
    AuthConfig::Basic { username: "user".into(), password: "pass".into() },
    "Basic dXNlcjpwYXNz"
)]
fn applies_authorization(
    listener: TcpListener,
    #[case] auth: AuthConfig,
    #[case] expected: &str,
) {
    let (base, rx) = collector(listener, vec![200]);
    let transport = HttpTransport::with_config(
        quick_config()
            .with_auth(auth)
            .with_request_header("X-Source", "beacon"),
    )
    .expect("spawn worker");

    assert!(transport.send_best_effort(&format!("{base}/"), "{}", CONTENT_TYPE));
    let received = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert_eq!(received.header("authorization"), Some(expected));
    assert_eq!(received.header("x-source"), Some("beacon"));
}

#[rstest]
fn server_errors_still_count_as_accepted(listener: TcpListener) {
    let (base, rx) = collector(listener, vec![503, 200]);
    let transport = HttpTransport::with_config(quick_config()).expect("spawn worker");
    let url = format!("{base}/");

    assert!(transport.send_best_effort(&url, "1", CONTENT_TYPE));
    assert!(transport.send_best_effort(&url, "2", CONTENT_TYPE));
    assert!(transport.flush());

    let first = rx.recv_timeout(Duration::from_secs(5)).expect("first");
    let second = rx.recv_timeout(Duration::from_secs(5)).expect("second");
    assert_eq!((first.body.as_str(), second.body.as_str()), ("1", "2"));
}

#[test]
fn refuses_after_close() {
    let transport = HttpTransport::with_config(quick_config()).expect("spawn worker");
    transport.close();
    assert!(!transport.send_best_effort("http://127.0.0.1:9/", "{}", CONTENT_TYPE));
    assert!(!transport.flush());
    transport.close();
}
