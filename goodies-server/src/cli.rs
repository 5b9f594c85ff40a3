//! # Command-line surface
//!
//! Flag set grounded on `original_source/goodies-tcp-server/goodies-server.go`'s
//! `flag.StringVar`/`flag.IntVar`/`flag.BoolVar` block, expressed with `clap`
//! derive the way `skytable-skytable`'s CLI binaries do.

use std::path::PathBuf;

use clap::Parser;

/// Value parser for `--file` that accepts an empty string (clap's built-in
/// `PathBuf` parser rejects empty values outright, which would make it
/// impossible to pass the empty path that disables persistence).
fn parse_snapshot_path(s: &str) -> Result<PathBuf, std::convert::Infallible> {
    Ok(PathBuf::from(s))
}

/// In-memory key-value cache server with optional HTTP and TCP transports.
#[derive(Debug, Parser)]
#[command(name = "goodies-server", version, about)]
pub struct Args {
    /// Port to listen on (TCP transport binds here, HTTP binds to port + 1
    /// unless --http-port is given).
    #[arg(short = 'p', long = "port", default_value_t = 19006)]
    pub port: u16,

    /// Path to the snapshot file. An empty path disables persistence.
    #[arg(
        short = 'f',
        long = "file",
        default_value = "./goodies.dat",
        value_parser = parse_snapshot_path
    )]
    pub file: PathBuf,

    /// Default item TTL in seconds.
    #[arg(long = "ttl", default_value_t = 30)]
    pub ttl: u64,

    /// Snapshot interval in seconds.
    #[arg(long = "stor", default_value_t = 30)]
    pub stor: u64,

    /// Print debug-level diagnostics.
    #[arg(long = "debug", default_value_t = false)]
    pub debug: bool,

    /// Bind the HTTP transport. Binding neither --http nor --tcp binds both.
    #[arg(long = "http", default_value_t = false)]
    pub http: bool,

    /// Bind the TCP transport. Binding neither --http nor --tcp binds both.
    #[arg(long = "tcp", default_value_t = false)]
    pub tcp: bool,

    /// Port for the HTTP transport. Defaults to --port + 1.
    #[arg(long = "http-port")]
    pub http_port: Option<u16>,
}

impl Args {
    /// Whether persistence is enabled: an empty `--file` disables it.
    pub fn persistence_enabled(&self) -> bool {
        !self.file.as_os_str().is_empty()
    }

    /// Whether the HTTP transport should be bound, resolving the
    /// "neither flag given means both" default.
    pub fn bind_http(&self) -> bool {
        self.http || !self.tcp
    }

    /// Whether the TCP transport should be bound, resolving the
    /// "neither flag given means both" default.
    pub fn bind_tcp(&self) -> bool {
        self.tcp || !self.http
    }

    /// Resolves the HTTP listen port: `--http-port` if given, else `--port + 1`.
    pub fn resolved_http_port(&self) -> u16 {
        self.http_port.unwrap_or(self.port.saturating_add(1))
    }
}
