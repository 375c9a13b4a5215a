use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One-route HTTP server answering every request with the same canned reply.
pub struct CannedServer {
    pub base_url: String,
    /// Raw request heads (request line + headers) and bodies, in arrival order.
    pub requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl CannedServer {
    pub async fn start(status_line: &'static str, body: impl Into<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.into();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let body = body.clone();
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let _ = answer(stream, status_line, &body, &seen).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn last_head(&self) -> String {
        self.requests.lock().last().map(|(h, _)| h.clone()).unwrap_or_default()
    }

    pub fn last_body(&self) -> String {
        self.requests.lock().last().map(|(_, b)| b.clone()).unwrap_or_default()
    }
}

async fn answer(
    mut stream: TcpStream,
    status_line: &str,
    body: &str,
    seen: &Mutex<Vec<(String, String)>>,
) -> std::io::Result<()> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];

    let head_end = loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    while raw.len() < head_end + content_length {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }
    let req_body = String::from_utf8_lossy(&raw[head_end..]).to_string();
    seen.lock().push((head, req_body));

    let reply = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}
