use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::log::log_sink::LogSink;
use crate::relay::relay_server::RelayServer;
use crate::relay::settings::RelaySettings;

pub const CONFIG_ENV: &str = "ROOMRELAY_CONFIG";
pub const PORT_ENV: &str = "PORT";
const DEFAULT_CONFIG_FILE: &str = "relay.conf";

/// Run the relay with the given settings and log sink. Blocks.
pub fn run_relay_server_with_log(settings: RelaySettings, log_sink: Arc<dyn LogSink>) -> io::Result<()> {
    RelayServer::bind(settings, log_sink)?.run()
}

/// Convenience: run the relay on `addr` with default settings and no logging.
pub fn run_relay_server(addr: &str) -> io::Result<()> {
    let settings = RelaySettings {
        bind_addr: addr.to_owned(),
        ..RelaySettings::default()
    };
    RelayServer::bind_no_log(settings)?.run()
}

/// `--config PATH` if given, else `ROOMRELAY_CONFIG`, else `relay.conf`
/// next to the executable.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(p) = explicit {
        return p;
    }
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(p);
    }

    // Next to the executable so restarts pick up the same file
    // even if launched from a different working directory.
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load settings from `path` (missing file means defaults), then apply the
/// `PORT` override.
pub fn load_settings(path: &std::path::Path) -> Result<RelaySettings, String> {
    let cfg = Config::load_or_empty(path)?;
    let mut settings = RelaySettings::from_config(&cfg)?;
    if let Ok(port) = std::env::var(PORT_ENV) {
        settings.override_port(&port)?;
    }
    Ok(settings)
}
