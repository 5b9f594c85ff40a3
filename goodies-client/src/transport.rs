//! # Client transports
//!
//! Two implementations of [`CommandTransport`], grounded on
//! `original_source/goodies/goodies_http.go`'s `HttpTransport.Process` and
//! `original_source/goodies/tcp.go`'s `TCPBasedClient.Process`: send one
//! request frame, read back exactly one response frame.

use std::sync::Arc;

use goodies_common::{CommandRequest, CommandResponse, GoodiesError, JsonSerializer, WireSerializer};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Sends one request and returns its matching response, or an
/// [`GoodiesError::Internal`] describing the transport-level failure.
#[async_trait::async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send(&self, req: &CommandRequest) -> Result<CommandResponse, GoodiesError>;
}

/// Talks to the `POST /goodies` HTTP endpoint over a shared [`reqwest::Client`].
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    serializer: JsonSerializer,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        HttpTransport {
            url: url.into(),
            client: reqwest::Client::new(),
            serializer: JsonSerializer,
        }
    }
}

#[async_trait::async_trait]
impl CommandTransport for HttpTransport {
    async fn send(&self, req: &CommandRequest) -> Result<CommandResponse, GoodiesError> {
        let body = self.serializer.serialize_request(req)?;

        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| GoodiesError::Internal(err.to_string()))?;

        if !response.status().is_success() {
            return Err(GoodiesError::Internal(format!(
                "connectivity issue: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| GoodiesError::Internal(err.to_string()))?;
        self.serializer.deserialize_response(&bytes)
    }
}

/// Keeps one persistent connection, dialed lazily on first use, matching the
/// teacher source's `TCPBasedClient` connected-once-then-reuse behavior.
pub struct TcpTransport {
    address: String,
    conn: Mutex<Option<TcpStream>>,
    serializer: JsonSerializer,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        TcpTransport {
            address: address.into(),
            conn: Mutex::new(None),
            serializer: JsonSerializer,
        }
    }
}

#[async_trait::async_trait]
impl CommandTransport for TcpTransport {
    async fn send(&self, req: &CommandRequest) -> Result<CommandResponse, GoodiesError> {
        let mut body = self.serializer.serialize_request(req)?;
        body.push(b'\n');

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            let stream = TcpStream::connect(&self.address)
                .await
                .map_err(|err| GoodiesError::Internal(err.to_string()))?;
            *guard = Some(stream);
        }
        let stream = guard.as_mut().expect("just connected above");

        stream
            .write_all(&body)
            .await
            .map_err(|err| GoodiesError::Internal(err.to_string()))?;

        let mut line = String::new();
        // A fresh BufReader per request is fine: we hold the connection lock
        // for the whole round trip, so there is never a second reader racing
        // against buffered-but-unconsumed bytes.
        let read = BufReader::new(&mut *stream).read_line(&mut line).await;
        match read {
            Ok(0) => {
                *guard = None;
                Err(GoodiesError::Internal("connection closed by peer".into()))
            }
            Ok(_) => self.serializer.deserialize_response(line.trim_end().as_bytes()),
            Err(err) => {
                *guard = None;
                Err(GoodiesError::Internal(err.to_string()))
            }
        }
    }
}

pub type SharedTransport = Arc<dyn CommandTransport>;
