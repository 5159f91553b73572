// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Invalid values
//! fail startup with a [`ConfigError`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `14265` |
//! | `IOTA_PROVIDER` | Full node URL, e.g. `https://node:443`; overrides the three below | unset |
//! | `IOTA_HOST` | Remote node host | `iota.bitfinex.com` |
//! | `IOTA_PORT` | Remote node port | `80` |
//! | `IOTA_PROTOCOL` | `http` or `https` | `http` |
//! | `OVERRIDE_ATTACH_TO_TANGLE` | Perform `attachToTangle` PoW locally | `true` |
//! | `POW_TIMEOUT_MINUTES` | Request timeout in minutes | `15` |
//! | `POW_WORKERS` | PoW worker threads | available parallelism |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const IOTA_PROVIDER_ENV: &str = "IOTA_PROVIDER";
pub const IOTA_HOST_ENV: &str = "IOTA_HOST";
pub const IOTA_PORT_ENV: &str = "IOTA_PORT";
pub const IOTA_PROTOCOL_ENV: &str = "IOTA_PROTOCOL";
pub const OVERRIDE_ATTACH_ENV: &str = "OVERRIDE_ATTACH_TO_TANGLE";
pub const POW_TIMEOUT_ENV: &str = "POW_TIMEOUT_MINUTES";
pub const POW_WORKERS_ENV: &str = "POW_WORKERS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 14265;
const DEFAULT_IOTA_HOST: &str = "iota.bitfinex.com";
const DEFAULT_IOTA_PORT: u16 = 80;
const DEFAULT_IOTA_PROTOCOL: &str = "http";
const DEFAULT_POW_TIMEOUT_MINUTES: u64 = 15;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid remote node URL: {0}")]
    InvalidNodeUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    /// Remote node the relay forwards to.
    pub node_url: Url,
    pub override_attach: bool,
    pub pow_timeout: Duration,
    pub pow_workers: usize,
    pub log_format: LogFormat,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(PORT_ENV, get(PORT_ENV), DEFAULT_PORT)?;

        let node_url = match get(IOTA_PROVIDER_ENV) {
            Some(provider) => parse_node_url(&provider)?,
            None => {
                let node_host = get(IOTA_HOST_ENV).unwrap_or_else(|| DEFAULT_IOTA_HOST.to_string());
                let node_port = parse_or(IOTA_PORT_ENV, get(IOTA_PORT_ENV), DEFAULT_IOTA_PORT)?;
                let protocol =
                    get(IOTA_PROTOCOL_ENV).unwrap_or_else(|| DEFAULT_IOTA_PROTOCOL.to_string());
                node_url_from_parts(&protocol, &node_host, node_port)?
            }
        };

        let override_attach = match get(OVERRIDE_ATTACH_ENV) {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                name: OVERRIDE_ATTACH_ENV,
                value,
            })?,
        };

        let timeout_minutes = parse_or(
            POW_TIMEOUT_ENV,
            get(POW_TIMEOUT_ENV),
            DEFAULT_POW_TIMEOUT_MINUTES,
        )?;
        if timeout_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                name: POW_TIMEOUT_ENV,
                value: "0".to_string(),
            });
        }

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let pow_workers = parse_or(POW_WORKERS_ENV, get(POW_WORKERS_ENV), default_workers)?;
        if pow_workers == 0 {
            return Err(ConfigError::InvalidValue {
                name: POW_WORKERS_ENV,
                value: "0".to_string(),
            });
        }

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: LOG_FORMAT_ENV,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            node_url,
            override_attach,
            pow_timeout: Duration::from_secs(timeout_minutes * 60),
            pow_workers,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: HOST_ENV,
                value: self.host.clone(),
            })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_node_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidNodeUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidNodeUrl(raw.to_string()));
    }
    Ok(url)
}

fn node_url_from_parts(protocol: &str, host: &str, port: u16) -> Result<Url, ConfigError> {
    let protocol = protocol.trim_end_matches(':');
    let host = host.strip_prefix("http://").unwrap_or(host);
    parse_node_url(&format!("{protocol}://{host}:{port}"))
}
