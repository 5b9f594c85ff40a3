//! # Wire records and serializer
//!
//! The request/response records exchanged between a transport and the
//! command processor, and the [`WireSerializer`] trait that turns them into
//! bytes and back. The JSON implementation's field names are
//! `#[serde(rename)]`d to match the PascalCase wire contract in spec.md §6
//! (`Name`, `Parameters`, `Success`, `Result`, `ErrStr`), grounded on the
//! struct tags in `original_source/goodies/goodies_json.go`.

use serde::{Deserialize, Serialize};

use crate::error::GoodiesError;

/// One command invocation, as sent by a client and read by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Parameters")]
    pub parameters: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, parameters: Vec<String>) -> Self {
        CommandRequest {
            name: name.into(),
            parameters,
        }
    }
}

/// The result of processing one [`CommandRequest`].
///
/// `success` is false iff an error is present; the two are kept separate
/// (rather than collapsing to `Result`) because the type must serialize to
/// the three-field wire shape regardless of outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "ErrStr")]
    pub err_str: String,
}

impl CommandResponse {
    /// Builds a successful response carrying the encoded result text.
    pub fn ok(result: impl Into<String>) -> Self {
        CommandResponse {
            success: true,
            result: result.into(),
            err_str: String::new(),
        }
    }

    /// Builds a failed response from a [`GoodiesError`].
    pub fn err(error: GoodiesError) -> Self {
        CommandResponse {
            success: false,
            result: String::new(),
            err_str: error.to_string(),
        }
    }

    /// Reconstructs the [`GoodiesError`] carried by a failed response.
    ///
    /// Returns `None` if `success` was true.
    pub fn error(&self) -> Option<GoodiesError> {
        if self.success {
            None
        } else {
            Some(GoodiesError::from_wire(&self.err_str))
        }
    }
}

/// Symmetric encode/decode of requests and responses into a self-describing
/// textual frame. Serialization failures surface as
/// [`GoodiesError::Transformation`].
pub trait WireSerializer: Send + Sync {
    fn serialize_request(&self, req: &CommandRequest) -> Result<Vec<u8>, GoodiesError>;
    fn deserialize_request(&self, data: &[u8]) -> Result<CommandRequest, GoodiesError>;
    fn serialize_response(&self, res: &CommandResponse) -> Result<Vec<u8>, GoodiesError>;
    fn deserialize_response(&self, data: &[u8]) -> Result<CommandResponse, GoodiesError>;
}

/// The reference [`WireSerializer`]: one JSON object per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl WireSerializer for JsonSerializer {
    fn serialize_request(&self, req: &CommandRequest) -> Result<Vec<u8>, GoodiesError> {
        serde_json::to_vec(req).map_err(|e| GoodiesError::Transformation(e.to_string()))
    }

    fn deserialize_request(&self, data: &[u8]) -> Result<CommandRequest, GoodiesError> {
        serde_json::from_slice(data).map_err(|e| GoodiesError::Transformation(e.to_string()))
    }

    fn serialize_response(&self, res: &CommandResponse) -> Result<Vec<u8>, GoodiesError> {
        serde_json::to_vec(res).map_err(|e| GoodiesError::Transformation(e.to_string()))
    }

    fn deserialize_response(&self, data: &[u8]) -> Result<CommandResponse, GoodiesError> {
        serde_json::from_slice(data).map_err(|e| GoodiesError::Transformation(e.to_string()))
    }
}
