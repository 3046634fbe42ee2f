#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

/// Two-point history body for 2023-11-14 and 2023-11-15
pub const TWO_POINT_BODY: &str = r#"{
    "meta": {"processedTime": "2023-11-16T00:00:00.000Z", "currency": "USD", "symbol": "NVDA"},
    "body": {
        "1700086400": {"date": "15-11-2023", "date_utc": 1700086400, "open": 452.0, "high": 456.0, "low": 451.0, "close": 455.5, "volume": 1000, "adjclose": 455.5},
        "1700000000": {"date": "14-11-2023", "date_utc": 1700000000, "open": 448.0, "high": 451.0, "low": 447.0, "close": 450.0, "volume": 1000, "adjclose": 450.0}
    }
}"#;

/// Minimal HTTP server answering every request with one canned response
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Starts a server on a free local port
    pub fn start(status_line: &str, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let seen = requests.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                let mut head = String::new();
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" => break,
                        Ok(_) => head.push_str(&line),
                    }
                }
                seen.lock().unwrap().push(head);

                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self { base_url, requests }
    }

    /// Raw request heads received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}
