//! Server configuration.
//!
//! Loaded from the TOML file named by the `TUICUBSERV_CONF` environment
//! variable, falling back to `./config.toml`, falling back to defaults.
//! Secrets are hashed with SHA-256 at load time; everything downstream only
//! ever sees and compares the hex digests.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file path.
pub const CONFIG_PATH_VAR: &str = "TUICUBSERV_CONF";

mod defaults {
    pub const DB_PATH: &str = "/var/lib/tuicubserver/db";
    pub const LOGFILE_PATH: &str = "/tmp/tuicubserver.log";
    pub const MESSAGES_HOST: &str = "api.tuicub.com";
    pub const MESSAGES_PORT: u16 = 23433;
    pub const SECRET: &str = "changeme";
}

/// The resolved configuration both subcommands run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the database directory.
    pub db_path: String,
    /// Path of the file logs are appended to.
    pub logfile_path: String,
    /// Host of the events process's message-bus listener.
    pub messages_host: String,
    /// Port of the events process's message-bus listener.
    pub messages_port: u16,
    /// SHA-256 hex digest of the secret authenticating bus frames.
    pub messages_secret: String,
    /// SHA-256 hex digest of the secret authenticating disconnect callbacks.
    pub events_secret: String,
}

/// The raw shape of the TOML file; every section and key is optional.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    db: DbSection,
    #[serde(default)]
    logging: LoggingSection,
    #[serde(default)]
    messages: MessagesSection,
    #[serde(default)]
    events: EventsSection,
}

#[derive(Debug, Default, Deserialize)]
struct DbSection {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    logfile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesSection {
    host: Option<String>,
    port: Option<u16>,
    secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EventsSection {
    secret: Option<String>,
}

impl Config {
    /// Loads the configuration from the environment-selected file.
    pub fn load() -> Config {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));
        Config::load_from(&path)
    }

    /// Loads the configuration from a specific path, using defaults for
    /// anything missing. An unreadable or malformed file degrades to the
    /// defaults rather than failing startup.
    pub fn load_from(path: &Path) -> Config {
        let raw = std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| match toml::from_str::<RawConfig>(&contents) {
                Ok(raw) => Some(raw),
                Err(err) => {
                    tracing::warn!(?path, %err, "Malformed config file, using defaults");
                    None
                }
            })
            .unwrap_or_default();

        Config {
            db_path: raw.db.url.unwrap_or_else(|| defaults::DB_PATH.into()),
            logfile_path: raw
                .logging
                .logfile
                .unwrap_or_else(|| defaults::LOGFILE_PATH.into()),
            messages_host: raw
                .messages
                .host
                .unwrap_or_else(|| defaults::MESSAGES_HOST.into()),
            messages_port: raw.messages.port.unwrap_or(defaults::MESSAGES_PORT),
            messages_secret: sha256(
                &raw.messages.secret.unwrap_or_else(|| defaults::SECRET.into()),
            ),
            events_secret: sha256(
                &raw.events.secret.unwrap_or_else(|| defaults::SECRET.into()),
            ),
        }
    }
}

/// Hex-encoded SHA-256 digest of the input.
pub fn sha256(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Whether `host` is a valid IPv4 or IPv6 address, or a valid FQDN.
pub fn is_host_valid(host: &str) -> bool {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    is_valid_hostname(host)
}

fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() {
        return false;
    }

    // One trailing dot is allowed for a fully-qualified name.
    let hostname = hostname.strip_suffix('.').unwrap_or(hostname);

    if hostname.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = hostname.split('.').collect();

    // The TLD must not be all digits.
    match labels.last() {
        Some(tld) if !tld.is_empty() && tld.bytes().all(|byte| byte.is_ascii_digit()) => {
            return false
        }
        _ => {}
    }

    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
    })
}
