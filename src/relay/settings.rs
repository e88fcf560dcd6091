use std::path::PathBuf;

use crate::config::Config;
use crate::relay::presence_reply::PresenceReply;
use crate::relay::protocol::MAX_BODY_LEN;
use crate::relay::relay_engine::MAX_ROOM_MEMBERS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_LOG_QUEUE_CAP: usize = 1024;

/// Typed view over the `[Server]`, `[Relay]` and `[Logging]` sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub bind_addr: String,
    pub max_body_len: usize,
    pub presence_reply: PresenceReply,
    pub max_room_members: usize,
    pub log_dir: Option<PathBuf>,
    pub log_filename: Option<String>,
    pub log_queue_cap: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            max_body_len: MAX_BODY_LEN,
            presence_reply: PresenceReply::default(),
            max_room_members: MAX_ROOM_MEMBERS,
            log_dir: None,
            log_filename: None,
            log_queue_cap: DEFAULT_LOG_QUEUE_CAP,
        }
    }
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let bind_addr = config
            .get_non_empty_or_default("Server", "bind_addr", DEFAULT_BIND_ADDR)
            .to_owned();

        let max_body_len = parse_usize(config, "Server", "max_body_len", MAX_BODY_LEN)?;
        if max_body_len == 0 {
            return Err("Server.max_body_len must be greater than zero".to_owned());
        }

        let presence_reply = match config.get_non_empty("Relay", "presence_reply") {
            Some(v) => v.parse()?,
            None => PresenceReply::default(),
        };

        let max_room_members =
            parse_usize(config, "Relay", "max_room_members", MAX_ROOM_MEMBERS)?;
        if max_room_members == 0 || max_room_members > MAX_ROOM_MEMBERS {
            return Err(format!(
                "Relay.max_room_members must be between 1 and {MAX_ROOM_MEMBERS}"
            ));
        }

        let log_queue_cap = parse_usize(config, "Logging", "queue_cap", DEFAULT_LOG_QUEUE_CAP)?.max(1);

        Ok(Self {
            bind_addr,
            max_body_len,
            presence_reply,
            max_room_members,
            log_dir: config
                .get_non_empty("Logging", "server_log_path")
                .map(expand_home),
            log_filename: config
                .get_non_empty("Logging", "server_log_filename")
                .map(str::to_owned),
            log_queue_cap,
        })
    }

    /// Replace only the port of `bind_addr` (the `PORT` env knob).
    pub fn override_port(&mut self, port: &str) -> Result<(), String> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| format!("invalid port '{port}'"))?;
        let host = self
            .bind_addr
            .rsplit_once(':')
            .map_or(self.bind_addr.as_str(), |(host, _)| host);
        self.bind_addr = format!("{host}:{port}");
        Ok(())
    }
}

fn parse_usize(config: &Config, section: &str, key: &str, default: usize) -> Result<usize, String> {
    match config.get_non_empty(section, key) {
        Some(v) => v
            .parse()
            .map_err(|_| format!("{section}.{key}: '{v}' is not a number")),
        None => Ok(default),
    }
}

/// Expands a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
        if let Ok(home) = home {
            return PathBuf::from(home).join(rest.trim_start_matches(['/', '\\']));
        }
    }
    PathBuf::from(path)
}
