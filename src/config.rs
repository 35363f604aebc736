//! Settings loaded from `config.toml`, the environment, and command-line flags.

use std::fs;
use std::path::PathBuf;
use toml::Value as TomlValue;
use tracing::warn;

const CONFIG_ENV: &str = "BRANCHSCOPE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Context lines requested when re-fetching a single path's diff.
    pub context_lines: usize,
    /// Files resolved at the same time.
    pub concurrency: usize,
    pub command_timeout_secs: u64,
    pub detect_moves: bool,
    /// Maximum hunk-line distance for a move match; 0 is the whole hunk.
    pub move_window: usize,
    pub include_diff: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            context_lines: 10,
            concurrency: 4,
            command_timeout_secs: 30,
            detect_moves: true,
            move_window: 0,
            include_diff: false,
        }
    }
}

impl Settings {
    /// Defaults overlaid with the config file, if one exists and parses.
    pub fn load() -> Self {
        let mut settings = Self::default();
        let Some(path) = config_path() else {
            return settings;
        };
        let Ok(text) = fs::read_to_string(&path) else {
            return settings;
        };
        match text.parse::<TomlValue>() {
            Ok(value) => settings.apply_toml(&value),
            Err(e) => warn!(path = %path.display(), error = %e, "ignoring unparsable config"),
        }
        settings
    }

    fn apply_toml(&mut self, value: &TomlValue) {
        let Some(table) = value.as_table() else {
            return;
        };

        let usize_key = |key: &str| {
            table
                .get(key)
                .and_then(|v| v.as_integer())
                .and_then(|v| usize::try_from(v).ok())
        };
        let bool_key = |key: &str| table.get(key).and_then(|v| v.as_bool());

        if let Some(v) = usize_key("context_lines") {
            self.context_lines = v;
        }
        if let Some(v) = usize_key("concurrency") {
            self.concurrency = v.max(1);
        }
        if let Some(v) = usize_key("command_timeout_secs") {
            self.command_timeout_secs = v.max(1) as u64;
        }
        if let Some(v) = bool_key("detect_moves") {
            self.detect_moves = v;
        }
        if let Some(v) = usize_key("move_window") {
            self.move_window = v;
        }
        if let Some(v) = bool_key("include_diff") {
            self.include_diff = v;
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(value) = std::env::var(CONFIG_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    let dir = dirs::config_dir()?;
    Some(dir.join("branchscope").join("config.toml"))
}
