//! Control API over TCP: framing, dispatch and error replies

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use callstream_entities::control::{ControlListener, ControlReply, ControlRequest};

/// Spin up a listener plus a fake media manager thread that answers
/// requests with canned replies
fn start_listener() -> (std::net::SocketAddr, Arc<AtomicBool>) {
    let (request_sender, request_receiver) = crossbeam_channel::unbounded();
    let running = Arc::new(AtomicBool::new(true));

    let listener = ControlListener::bind("127.0.0.1:0".parse().unwrap(), request_sender).unwrap();
    let addr = listener.local_addr().unwrap();

    {
        let running = running.clone();
        thread::spawn(move || {
            let _ = listener.run(running);
        });
    }

    thread::spawn(move || {
        while let Ok((request, reply_sender)) = request_receiver.recv() {
            let reply = match request {
                ControlRequest::Ping(echo) => ControlReply::from_parts(vec![echo]),
                ControlRequest::GetActiveCalls => ControlReply::from_parts(vec!["0".to_string()]),
                ControlRequest::StartCallInterception { call_id, format } => {
                    ControlReply::ok(format!("http://ms/live1.{} (call {})", format, call_id))
                }
                _ => ControlReply::nok("unsupported in test"),
            };
            let _ = reply_sender.send(reply);
        }
    });

    (addr, running)
}

fn roundtrip(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    stream.write_all(b"\n").unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line.trim_end().to_string()
}

#[test]
fn test_ping_roundtrip() {
    let (addr, running) = start_listener();
    assert_eq!(roundtrip(addr, "PING hello"), "hello");
    running.store(false, Ordering::SeqCst);
}

#[test]
fn test_request_dispatch() {
    let (addr, running) = start_listener();
    assert_eq!(roundtrip(addr, "GET_ACTIVE_CALLS"), "0");
    assert_eq!(
        roundtrip(addr, "START_CALL_INTERCEPTION 42 mp3"),
        "OK http://ms/live1.mp3 (call 42)"
    );
    running.store(false, Ordering::SeqCst);
}

#[test]
fn test_invalid_request_gets_nok() {
    let (addr, running) = start_listener();
    let reply = roundtrip(addr, "FROBNICATE 1 2 3");
    assert!(reply.starts_with("NOK Invalid message"), "got: {}", reply);
    running.store(false, Ordering::SeqCst);
}

#[test]
fn test_multiple_requests_on_one_connection() {
    let (addr, running) = start_listener();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    for i in 0..3 {
        stream.write_all(format!("PING round{}\n", i).as_bytes()).unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line.trim_end(), format!("round{}", i));
    }

    running.store(false, Ordering::SeqCst);
}
