use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// INI-style settings: `key = value` lines, optional `[Section]` headers,
/// `#` or `;` comments. Keys before the first header are globals.
#[derive(Debug, Default)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Error reading file {}: {e}", path.display()))?;
        Self::parse(&content).map_err(|e| format!("{}: {e}", path.display()))
    }

    /// Like [`Config::load`], but a missing file yields an empty config.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).map_err(|e| format!("{}: {e}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::empty()),
            Err(e) => Err(format!("Error reading file {}: {e}", path.display())),
        }
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut cfg = Self::empty();
        let mut current_section: Option<String> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                if name.is_empty() {
                    return Err(format!("line {}: empty section name", idx + 1));
                }
                current_section = Some(name.to_string());
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(format!("line {}: expected `key = value`", idx + 1));
            };
            let key = key.trim().to_string();
            let value = value.trim().trim_matches('"').to_string();

            match &current_section {
                None => {
                    cfg.globals.insert(key, value);
                }
                Some(sec) => {
                    cfg.sections.entry(sec.clone()).or_default().insert(key, value);
                }
            }
        }
        Ok(cfg)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(|s| s.as_str())
    }

    /// Section value, else global value, else `default`. Empty values count
    /// as unset.
    #[must_use]
    pub fn get_non_empty_or_default<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const SAMPLE: &str = r#"
# relay settings
log_queue = 64

[Server]
bind_addr = "127.0.0.1:7000"

[Relay]
presence_reply = requester
empty =
"#;

    #[test]
    fn sections_and_globals_are_separate() {
        let cfg = Config::parse(SAMPLE).unwrap();
        assert_eq!(cfg.get("Server", "bind_addr"), Some("127.0.0.1:7000"));
        assert_eq!(cfg.get("Relay", "presence_reply"), Some("requester"));
        assert_eq!(cfg.get_global("log_queue"), Some("64"));
        assert_eq!(cfg.get("Server", "log_queue"), None);
    }

    #[test]
    fn defaults_fall_back_through_globals() {
        let cfg = Config::parse(SAMPLE).unwrap();
        assert_eq!(cfg.get_non_empty_or_default("Logging", "log_queue", "1"), "64");
        assert_eq!(cfg.get_non_empty_or_default("Relay", "empty", "dflt"), "dflt");
        assert_eq!(cfg.get_non_empty_or_default("Nope", "nope", "dflt"), "dflt");
    }

    #[test]
    fn garbage_line_reports_its_number() {
        let err = Config::parse("[Server]\nbind_addr 1.2.3.4\n").unwrap_err();
        assert!(err.contains("line 2"), "{err}");
    }

    #[test]
    fn missing_file_is_empty_config() {
        let cfg = Config::load_or_empty("/definitely/not/here/relay.conf").unwrap();
        assert!(cfg.globals.is_empty() && cfg.sections.is_empty());
    }
}
