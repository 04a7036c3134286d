//! Command-line and environment configuration for the chat client.

use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "http://localhost:7777/api";
pub const DEFAULT_AVATAR_MALE: &str =
    "https://cdn.dev-connect.app/avatars/default-male.png";
pub const DEFAULT_AVATAR_FEMALE: &str =
    "https://cdn.dev-connect.app/avatars/default-female.png";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Path of the event channel, relative to the server root.
pub const SOCKET_PATH: &str = "/ws";

/// Terminal client for one-to-one developer chat.
///
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(name = "dev-connect", version, about)]
pub struct Cli {
    /// REST API base url
    #[arg(long, env = "DEV_CONNECT_API_BASE")]
    pub api_base: Option<String>,

    /// Event channel url [default: derived from the API base]
    #[arg(long, env = "DEV_CONNECT_SOCKET_URL")]
    pub socket_url: Option<String>,

    /// Session token, sent as the `token` cookie
    #[arg(long, env = "DEV_CONNECT_TOKEN")]
    pub session_token: Option<String>,

    /// Seconds before a REST call or event channel connect is given up
    #[arg(long, env = "DEV_CONNECT_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// User id of the peer to chat with
    pub peer: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: Url,
    pub socket_url: Url,
    pub session_token: Option<String>,
    pub request_timeout: Duration,
    pub peer: String,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_base = parse_url(cli.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))?;
        let socket_url = match cli.socket_url {
            Some(url) => parse_url(&url)?,
            None => socket_url_for(&api_base)?,
        };

        Ok(Config {
            api_base,
            socket_url,
            session_token: cli.session_token.filter(|t| !t.is_empty()),
            request_timeout: Duration::from_secs(cli.request_timeout_secs.max(1)),
            peer: cli.peer,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Maps `http(s)://host/api` onto `ws(s)://host/ws`.
pub fn socket_url_for(api_base: &Url) -> Result<Url, ConfigError> {
    let scheme = match api_base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };
    let host = api_base.host_str().unwrap_or("localhost");
    let raw = match api_base.port() {
        Some(port) => format!("{scheme}://{host}:{port}{SOCKET_PATH}"),
        None => format!("{scheme}://{host}{SOCKET_PATH}"),
    };
    parse_url(&raw)
}
