//! Minimal HTTP/1.1 server for preload tests: serves one static body on GET.
//!
//! Supports delaying the first body byte and pacing the body in fixed-size
//! pieces, so cooperative cancellation can land mid-stream.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamServerOptions {
    /// Sleep before sending the first body byte.
    pub first_byte_delay: Option<Duration>,
    /// Send the body in pieces of the given size with a delay after each.
    pub throttle: Option<(usize, Duration)>,
}

/// Starts a server in a background thread serving `body`. Returns the base
/// URL (e.g. "http://127.0.0.1:12345/"). The server runs until the process
/// exits.
pub fn start(body: Vec<u8>) -> String {
    start_with_options(body, StreamServerOptions::default())
}

/// Like `start` but with pacing options.
pub fn start_with_options(body: Vec<u8>, opts: StreamServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            thread::spawn(move || handle(stream, &body, opts));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: StreamServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }

    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    if stream.write_all(header.as_bytes()).is_err() {
        return;
    }

    if let Some(delay) = opts.first_byte_delay {
        thread::sleep(delay);
    }

    match opts.throttle {
        Some((piece, delay)) => {
            for chunk in body.chunks(piece.max(1)) {
                // The client hanging up mid-stream (cancel, threshold) is
                // normal; just stop writing.
                if stream.write_all(chunk).is_err() {
                    return;
                }
                let _ = stream.flush();
                thread::sleep(delay);
            }
        }
        None => {
            let _ = stream.write_all(body);
        }
    }
}
