//! Client library for the goodies cache: one method per command, grounded
//! on `original_source/goodies/goodies_client.go`'s `goodiesClient`, routed
//! through a pluggable [`transport::CommandTransport`].

pub mod transport;

use std::time::Duration;

use goodies_common::{CommandRequest, GoodiesError, GoodiesResult};
use transport::{CommandTransport, HttpTransport, TcpTransport};

/// `-1`/`-2` sentinel TTLs plus whole-second durations, matching
/// `ttlAsString` in the teacher source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Never,
    Default,
    Duration(Duration),
}

impl Ttl {
    fn as_wire_string(self) -> String {
        match self {
            Ttl::Never => "-1".to_string(),
            Ttl::Default => "-2".to_string(),
            Ttl::Duration(d) => d.as_secs().to_string(),
        }
    }
}

/// A goodies cache client bound to one transport.
pub struct Client<T: CommandTransport> {
    transport: T,
}

impl Client<HttpTransport> {
    /// Connects over HTTP to `POST {base_url}/goodies`.
    pub fn http(base_url: impl AsRef<str>) -> Self {
        let url = format!("{}/goodies", base_url.as_ref().trim_end_matches('/'));
        Client { transport: HttpTransport::new(url) }
    }
}

impl Client<TcpTransport> {
    /// Connects over TCP to `address`, dialing lazily on the first command.
    pub fn tcp(address: impl Into<String>) -> Self {
        Client { transport: TcpTransport::new(address) }
    }
}

impl<T: CommandTransport> Client<T> {
    async fn call(&self, name: &str, parameters: Vec<String>) -> GoodiesResult<String> {
        let req = CommandRequest::new(name, parameters);
        let res = self.transport.send(&req).await?;
        if res.success {
            Ok(res.result)
        } else {
            Err(res.error().unwrap_or_else(|| GoodiesError::Internal("unknown failure".into())))
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Ttl) -> GoodiesResult<()> {
        self.call("Set", vec![key.into(), value.into(), ttl.as_wire_string()]).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> GoodiesResult<String> {
        self.call("Get", vec![key.into()]).await
    }

    pub async fn update(&self, key: &str, value: &str, ttl: Ttl) -> GoodiesResult<()> {
        self.call("Update", vec![key.into(), value.into(), ttl.as_wire_string()]).await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> GoodiesResult<()> {
        self.call("Remove", vec![key.into()]).await?;
        Ok(())
    }

    /// Splits the colon-joined wire result back into individual keys.
    pub async fn keys(&self) -> GoodiesResult<Vec<String>> {
        let joined = self.call("Keys", vec![]).await?;
        if joined.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(joined.split(':').map(str::to_string).collect())
        }
    }

    pub async fn list_push(&self, key: &str, value: &str) -> GoodiesResult<()> {
        self.call("ListPush", vec![key.into(), value.into()]).await?;
        Ok(())
    }

    pub async fn list_len(&self, key: &str) -> GoodiesResult<usize> {
        let text = self.call("ListLen", vec![key.into()]).await?;
        Ok(text.parse().unwrap_or(0))
    }

    pub async fn list_get_by_index(&self, key: &str, index: i64) -> GoodiesResult<String> {
        self.call("ListGetByIndex", vec![key.into(), index.to_string()]).await
    }

    pub async fn list_remove_index(&self, key: &str, index: i64) -> GoodiesResult<()> {
        self.call("ListRemoveIndex", vec![key.into(), index.to_string()]).await?;
        Ok(())
    }

    pub async fn list_remove_value(&self, key: &str, value: &str) -> GoodiesResult<()> {
        self.call("ListRemoveValue", vec![key.into(), value.into()]).await?;
        Ok(())
    }

    pub async fn dict_set(&self, key: &str, dict_key: &str, value: &str) -> GoodiesResult<()> {
        self.call("DictSet", vec![key.into(), dict_key.into(), value.into()]).await?;
        Ok(())
    }

    pub async fn dict_get(&self, key: &str, dict_key: &str) -> GoodiesResult<String> {
        self.call("DictGet", vec![key.into(), dict_key.into()]).await
    }

    pub async fn dict_remove(&self, key: &str, dict_key: &str) -> GoodiesResult<()> {
        self.call("DictRemove", vec![key.into(), dict_key.into()]).await?;
        Ok(())
    }

    pub async fn dict_has_key(&self, key: &str, dict_key: &str) -> GoodiesResult<bool> {
        let text = self.call("DictHasKey", vec![key.into(), dict_key.into()]).await?;
        Ok(text == "1")
    }

    pub async fn set_expiry(&self, key: &str, ttl: Ttl) -> GoodiesResult<()> {
        self.call("SetExpiry", vec![key.into(), ttl.as_wire_string()]).await?;
        Ok(())
    }
}
