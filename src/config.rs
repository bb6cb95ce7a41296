use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration of the ledger server.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address the HTTP API binds to
    #[arg(long, env = "LEDGER_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// How long a request waits for a wallet row lock, in milliseconds
    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 1000)]
    pub lock_timeout_ms: u64,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, env = "LEDGER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LEDGER_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["wallet-ledger"]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(config.db_path.is_none());
        assert_eq!(config.lock_timeout(), Duration::from_secs(1));
        assert!(!config.log_json);
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "wallet-ledger",
            "--listen-addr",
            "127.0.0.1:9000",
            "--db-path",
            "/tmp/ledger",
            "--lock-timeout-ms",
            "250",
            "--log-level",
            "debug",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/ledger")));
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_level, "debug");
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_listen_addr() {
        assert!(Config::try_parse_from(["wallet-ledger", "--listen-addr", "nowhere"]).is_err());
    }
}
