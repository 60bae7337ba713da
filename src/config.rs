//! Worker configuration.
//!
//! Every setting can be given as a flag after `eventloop` or through the
//! environment, which is how a launcher that spawns the whole group passes
//! per-worker values. Flags win over the environment.

use crate::error::{Error, Result};
use crate::types::Rank;

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONTROLLER: &str = "LIBMATRIX_CONTROLLER";
pub const ENV_RANK: &str = "LIBMATRIX_RANK";
pub const ENV_GROUP_SIZE: &str = "LIBMATRIX_GROUP_SIZE";
pub const ENV_TIMEOUT_MS: &str = "LIBMATRIX_TIMEOUT_MS";
/// Presence switches logging to debug level.
pub const ENV_DEBUG: &str = "LIBMATRIX_DEBUG";

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Address the controller listens on.
    pub controller: SocketAddr,
    /// This worker's rank inside the group.
    pub rank: Rank,
    /// Number of workers in the group.
    pub group_size: usize,
    /// Receive timeout; `None` blocks forever.
    pub recv_timeout: Option<Duration>,
}

impl WorkerConfig {
    /// Resolves the configuration from flags, falling back to the process environment.
    pub fn from_args(args: &[String]) -> Result<Self> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Resolves the configuration from flags, falling back to `env` for missing values.
    pub fn resolve<F>(args: &[String], env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut controller = None;
        let mut rank = None;
        let mut group_size = None;
        let mut timeout_ms = None;

        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--controller" => controller = Some(require(value, "--controller")?),
                "--rank" => rank = Some(require(value, "--rank")?),
                "--size" => group_size = Some(require(value, "--size")?),
                "--timeout-ms" => timeout_ms = Some(require(value, "--timeout-ms")?),
                other => {
                    return Err(Error::Config(format!("unknown argument '{}'", other)));
                }
            }
            i += 2;
        }

        let controller: SocketAddr = parse(
            controller.or_else(|| env(ENV_CONTROLLER)),
            "controller address",
            ENV_CONTROLLER,
        )?;
        let rank: Rank = parse(rank.or_else(|| env(ENV_RANK)), "rank", ENV_RANK)?;
        let group_size: usize = parse(
            group_size.or_else(|| env(ENV_GROUP_SIZE)),
            "group size",
            ENV_GROUP_SIZE,
        )?;

        let recv_timeout = match timeout_ms.or_else(|| env(ENV_TIMEOUT_MS)) {
            Some(raw) => Some(Duration::from_millis(parse_value::<u64>(&raw, "timeout")?)),
            None => None,
        };

        if group_size == 0 {
            return Err(Error::Config("group size must be at least 1".to_string()));
        }
        if rank >= group_size {
            return Err(Error::Config(format!(
                "rank {} out of range for group of {}",
                rank, group_size
            )));
        }

        Ok(Self {
            controller,
            rank,
            group_size,
            recv_timeout,
        })
    }
}

fn require(value: Option<String>, flag: &str) -> Result<String> {
    value.ok_or_else(|| Error::Config(format!("{} needs a value", flag)))
}

fn parse<T: FromStr>(raw: Option<String>, what: &str, env_key: &str) -> Result<T> {
    let raw = raw.ok_or_else(|| {
        Error::Config(format!("missing {} (flag or {})", what, env_key))
    })?;
    parse_value(&raw, what)
}

fn parse_value<T: FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid {}: '{}'", what, raw)))
}
