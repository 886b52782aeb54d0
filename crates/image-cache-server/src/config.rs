//! Command-line configuration

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_ORIGIN: &str = "https://http.cat";

/// Process configuration, read once at startup and never mutated
#[derive(Debug, Clone, Parser)]
#[command(
    name = "image-cache-server",
    version,
    about = "Caching HTTP server for status code images",
    disable_help_flag = true
)]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(short = 'h', long, env = "HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long, env = "PORT")]
    pub port: u16,

    /// Directory holding cached images; created if missing
    #[arg(short = 'c', long = "cache", env = "CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Base URL images are fetched from on a cache miss
    #[arg(long = "origin", env = "ORIGIN_URL", default_value = DEFAULT_ORIGIN)]
    pub origin_url: Url,

    /// Print help (`-h` is taken by --host)
    #[arg(long, action = ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_flags() {
        let config = Config::try_parse_from([
            "image-cache-server",
            "-h",
            "127.0.0.1",
            "-p",
            "9000",
            "-c",
            "/tmp/c",
        ])
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/c"));
    }

    #[test]
    fn test_parse_long_flags_with_origin() {
        let config = Config::try_parse_from([
            "image-cache-server",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--cache",
            "./cache",
            "--origin",
            "http://localhost:4000",
        ])
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.origin_url.as_str(), "http://localhost:4000/");
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::try_parse_from([
            "image-cache-server",
            "-h",
            "127.0.0.1",
            "-p",
            "not-a-port",
            "-c",
            "/tmp/c",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_origin() {
        let result = Config::try_parse_from([
            "image-cache-server",
            "-h",
            "127.0.0.1",
            "-p",
            "9000",
            "-c",
            "/tmp/c",
            "--origin",
            "not a url",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_is_long_only() {
        let err = Config::try_parse_from(["image-cache-server", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
