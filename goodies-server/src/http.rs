//! # HTTP transport
//!
//! A single `POST /goodies` route, grounded on
//! `original_source/goodies/goodies_http.go`'s `HttpServer.Serve`: decode the
//! body, dispatch through the command processor, encode the response,
//! respond `200 OK` regardless of protocol-level success — errors live in
//! the body, not the status line.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use goodies_common::{CommandRequest, CommandResponse, JsonSerializer, WireSerializer};
use goodies_engine::CommandProcessor;

use crate::metrics::Metrics;

pub struct HttpState {
    pub processor: Arc<CommandProcessor>,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: Arc<HttpState>) -> Router {
    Router::new().route("/goodies", post(handle)).with_state(state)
}

async fn handle(State(state): State<Arc<HttpState>>, body: axum::body::Bytes) -> Vec<u8> {
    let serializer = JsonSerializer;
    let started = Instant::now();
    state.metrics.record_request_start();

    let (command, response) = match serializer.deserialize_request(&body) {
        Ok(req) => {
            let command = req.name.clone();
            (command, dispatch(&state.processor, req))
        }
        Err(err) => ("malformed".to_string(), CommandResponse::err(err)),
    };

    state
        .metrics
        .record_command(&command, started.elapsed(), response.success);

    serializer
        .serialize_response(&response)
        .unwrap_or_else(|_| b"{\"Success\":false,\"Result\":\"\",\"ErrStr\":\"Internal: cannot serialise response\"}".to_vec())
}

fn dispatch(processor: &CommandProcessor, req: CommandRequest) -> CommandResponse {
    tracing::debug!(command = %req.name, "http request");
    processor.process(&req)
}
