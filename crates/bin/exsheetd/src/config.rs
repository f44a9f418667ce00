use clap::Parser;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_INGEST_ADDR: &str = "127.0.0.1:4030";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "exsheetd", version, about = "Exsheet extraction daemon.")]
struct CliArgs {
    #[arg(long, env = "EXSHEET_INGEST_ADDR", default_value = DEFAULT_INGEST_ADDR)]
    ingest_addr: SocketAddr,

    #[arg(long, env = "EXSHEET_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    upload_dir: PathBuf,

    #[arg(
        long,
        env = "EXSHEET_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    request_timeout_secs: u64,

    #[arg(
        long,
        env = "EXSHEET_MAX_BODY_BYTES",
        default_value_t = DEFAULT_MAX_BODY_BYTES
    )]
    max_body_bytes: usize,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone, Debug)]
pub struct ExsheetConfig {
    pub ingest_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl ExsheetConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for ExsheetConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.upload_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "EXSHEET_UPLOAD_DIR",
                value: String::new(),
            });
        }
        if args.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "EXSHEET_REQUEST_TIMEOUT_SECS",
                value: args.request_timeout_secs.to_string(),
            });
        }
        if args.max_body_bytes == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "EXSHEET_MAX_BODY_BYTES",
                value: args.max_body_bytes.to_string(),
            });
        }

        Ok(Self {
            ingest_addr: args.ingest_addr,
            upload_dir: args.upload_dir,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            max_body_bytes: args.max_body_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            ingest_addr: DEFAULT_INGEST_ADDR.parse().expect("valid ingest addr"),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[test]
    fn defaults_parse_into_a_config() {
        let config = ExsheetConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn rejects_an_empty_upload_dir() {
        let mut args = base_args();
        args.upload_dir = PathBuf::new();

        let err = ExsheetConfig::try_from(args).expect_err("config should be rejected");

        assert!(err.to_string().contains("EXSHEET_UPLOAD_DIR"));
    }

    #[test]
    fn rejects_a_zero_timeout() {
        let mut args = base_args();
        args.request_timeout_secs = 0;

        let err = ExsheetConfig::try_from(args).expect_err("config should be rejected");

        assert!(err.to_string().contains("EXSHEET_REQUEST_TIMEOUT_SECS"));
    }
}
