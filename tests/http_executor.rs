use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use answer_api::{AnswerApiClient, AnswerApiConfig};
use answer_provider::{new_cancel_signal, Generation};
use legal_qa::{ExecutorConfig, ExecutorError, TimedExecutor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Answers every request with the same status and JSON body.
struct FixedServer {
    base_url: String,
    requests: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl FixedServer {
    async fn start(status_line: &'static str, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(AtomicUsize::new(0));

        let handle = tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    requests.fetch_add(1, Ordering::AcqRel);
                    tokio::spawn(respond(socket, status_line, body));
                }
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }
}

impl Drop for FixedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(mut socket: TcpStream, status_line: &str, body: &str) {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];
    loop {
        let Ok(n) = socket.read(&mut buffer).await else {
            return;
        };
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(head_end) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }

    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

#[tokio::test]
async fn structured_client_error_is_surfaced_after_one_attempt() {
    let server = FixedServer::start(
        "403 Forbidden",
        r#"{"detail":"Daily rate limit for free accounts reached; upgrade your plan"}"#,
    )
    .await;
    let client = AnswerApiClient::new(AnswerApiConfig::new(&server.base_url)).expect("client");
    let executor = TimedExecutor::new(client, ExecutorConfig::default());

    let error = executor
        .execute(Generation::new(1), "Can I break my lease?", &new_cancel_signal())
        .await
        .expect_err("rejected");

    assert_eq!(
        error,
        ExecutorError::ServerRejected(
            "Daily rate limit for free accounts reached; upgrade your plan".to_string()
        )
    );
    assert_eq!(server.requests(), 1);
}

#[tokio::test]
async fn server_error_is_retried_until_attempts_run_out() {
    let server = FixedServer::start("503 Service Unavailable", "").await;
    let client = AnswerApiClient::new(AnswerApiConfig::new(&server.base_url)).expect("client");
    let config = ExecutorConfig::default()
        .with_max_attempts(2)
        .with_backoff_base(std::time::Duration::from_millis(10));
    let executor = TimedExecutor::new(client, config);

    let error = executor
        .execute(Generation::new(1), "hello", &new_cancel_signal())
        .await
        .expect_err("exhausted");

    assert_eq!(
        error,
        ExecutorError::NetworkError("HTTP 503: Service Unavailable".to_string())
    );
    assert_eq!(server.requests(), 2);
}
