//! # TCP transport
//!
//! Newline-framed request/response loop, grounded on
//! `original_source/goodies-tcp-server/goodies-server.go`'s accept loop and
//! `handleConnection`: one task per connection, one outstanding request at a
//! time, EOF or a read error closes the connection without being treated as
//! a server-level failure.

use std::sync::Arc;
use std::time::Instant;

use goodies_common::{CommandResponse, JsonSerializer, WireSerializer};
use goodies_engine::CommandProcessor;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::metrics::Metrics;

/// Binds `addr` and serves connections until the listener itself errors.
pub async fn serve(
    listener: TcpListener,
    processor: Arc<CommandProcessor>,
    metrics: Arc<Metrics>,
) -> std::io::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        let processor = processor.clone();
        let metrics = metrics.clone();
        tokio::spawn(async move {
            tracing::debug!(%peer, "tcp connection accepted");
            handle_connection(socket, processor, metrics).await;
            tracing::debug!(%peer, "tcp connection closed");
        });
    }
}

async fn handle_connection(socket: TcpStream, processor: Arc<CommandProcessor>, metrics: Arc<Metrics>) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let serializer = JsonSerializer;
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await;
        let bytes_read = match read {
            Ok(n) => n,
            Err(err) => {
                tracing::debug!(%err, "tcp read error, closing connection");
                return;
            }
        };
        if bytes_read == 0 {
            return; // EOF: peer closed the connection, not an error.
        }

        let started = Instant::now();
        metrics.record_request_start();

        let (command, response) = match serializer.deserialize_request(line.trim_end().as_bytes()) {
            Ok(req) => {
                tracing::debug!(command = %req.name, "tcp request");
                let command = req.name.clone();
                (command, processor.process(&req))
            }
            Err(err) => ("malformed".to_string(), CommandResponse::err(err)),
        };

        metrics.record_command(&command, started.elapsed(), response.success);

        let mut encoded = match serializer.serialize_response(&response) {
            Ok(bytes) => bytes,
            Err(_) => b"{\"Success\":false,\"Result\":\"\",\"ErrStr\":\"Internal: cannot serialise response\"}".to_vec(),
        };
        encoded.push(b'\n');

        if let Err(err) = writer.write_all(&encoded).await {
            tracing::debug!(%err, "tcp write error, closing connection");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goodies_engine::Store;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader as TokioBufReader};
    use tokio::net::TcpStream as ClientStream;

    async fn spawn_test_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Store::new(Duration::from_secs(30)));
        let processor = Arc::new(CommandProcessor::new(store));
        let metrics = Arc::new(Metrics::new());
        tokio::spawn(serve(listener, processor, metrics));
        addr
    }

    #[tokio::test]
    async fn set_then_get_round_trips_over_tcp() {
        let addr = spawn_test_server().await;
        let stream = ClientStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = TokioBufReader::new(read_half);

        write_half
            .write_all(b"{\"Name\":\"Set\",\"Parameters\":[\"k\",\"v\",\"-1\"]}\n")
            .await
            .unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("\"Success\":true"));

        write_half
            .write_all(b"{\"Name\":\"Get\",\"Parameters\":[\"k\"]}\n")
            .await
            .unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let parsed: CommandResponse = serde_json::from_str(&line).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.result, "v");
    }

    #[tokio::test]
    async fn malformed_frame_gets_an_error_response_not_a_closed_connection() {
        let addr = spawn_test_server().await;
        let stream = ClientStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = TokioBufReader::new(read_half);

        write_half.write_all(b"not json at all\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("\"Success\":false"));

        write_half
            .write_all(b"{\"Name\":\"Set\",\"Parameters\":[\"k\",\"v\",\"-1\"]}\n")
            .await
            .unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("\"Success\":true"));
    }
}
