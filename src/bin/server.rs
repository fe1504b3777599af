//! HTTP Server for the Northwind assistant
//! Simple HTTP server using tokio and basic HTTP handling.
//! One conversation is shared by every connection.

use northwind_assistant::config::Settings;
use northwind_assistant::data_assistant::DataAssistant;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_REQUEST_BYTES: usize = 1_000_000;

#[derive(Deserialize)]
struct AskPayload {
    question: String,
}

type SharedAssistant = Arc<Mutex<DataAssistant>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    let assistant: SharedAssistant = Arc::new(Mutex::new(DataAssistant::from_settings(&settings)?));

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("New connection from: {}", peer);
        tokio::spawn(handle_connection(stream, assistant.clone()));
    }
}

async fn handle_connection(mut stream: TcpStream, assistant: SharedAssistant) {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    // Read request with timeout to prevent hanging
    let read_result = timeout(Duration::from_secs(5), async {
        loop {
            let n = stream.read(&mut temp_buf).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&temp_buf[..n]);
            if request_complete(&buffer) || buffer.len() > MAX_REQUEST_BYTES {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })
    .await;

    match read_result {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(e)) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
        Ok(Ok(())) => {}
    }

    if buffer.is_empty() {
        return;
    }

    let response = match String::from_utf8(buffer) {
        Ok(request) => handle_request(&request, &assistant).await,
        Err(_) => json_response(400, "Bad Request", &serde_json::json!({"error": "request is not UTF-8"})),
    };
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

fn request_complete(buffer: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(buffer) else {
        return false;
    };
    let Some(headers_end) = text.find("\r\n\r\n") else {
        return false;
    };
    match extract_content_length(&text[..headers_end]) {
        Some(len) => buffer.len() >= headers_end + 4 + len,
        None => true,
    }
}

fn extract_content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

async fn handle_request(request: &str, assistant: &SharedAssistant) -> String {
    let mut request_line = request.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let path = request_line.next().unwrap_or_default();
    let body = request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default();

    match (method, path) {
        ("GET", "/health") => json_response(200, "OK", &serde_json::json!({"status": "ok"})),
        ("GET", "/preferences") => {
            let guard = assistant.lock().await;
            let prefs = guard.orchestrator().preferences();
            json_response(200, "OK", &serde_json::json!({
                "preferences": prefs,
                "hints": prefs.hints(),
            }))
        }
        ("GET", "/history") => {
            let guard = assistant.lock().await;
            let turns: Vec<_> = guard.orchestrator().memory().turns().collect();
            json_response(200, "OK", &serde_json::json!({ "turns": turns }))
        }
        ("POST", "/ask") => {
            let payload: AskPayload = match serde_json::from_str(body) {
                Ok(p) => p,
                Err(e) => {
                    return json_response(400, "Bad Request", &serde_json::json!({
                        "error": format!("invalid payload: {}", e)
                    }))
                }
            };
            let reply = assistant.lock().await.ask(&payload.question).await;
            match reply {
                Ok(reply) => json_response(200, "OK", &serde_json::json!(reply)),
                Err(e) => {
                    error!("Ask failed: {}", e);
                    json_response(500, "Internal Server Error", &serde_json::json!({"error": e.to_string()}))
                }
            }
        }
        _ => json_response(404, "Not Found", &serde_json::json!({"error": "not found"})),
    }
}

fn json_response(status: u16, reason: &str, body: &serde_json::Value) -> String {
    let body = body.to_string();
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )
}
