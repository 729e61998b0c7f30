//! Startup configuration, grounded in `kv-cli/src/config.rs`'s
//! `ConfigLoad`: kept `prompt`, `show_stats` and `multi_line`, along with
//! `Default` and `terminal_update`, and dropped the unused
//! `api_key`/`version`/`progress_color`/`replace_newline` fields -- there
//! is no remote query service here to authenticate against or a progress
//! bar to color. `storage_path`/`log_dir`/`log_level` are new: this CLI
//! picks its embedded engine and log destination from them, which the
//! networked `kv-cli` had no equivalent of.

use std::path::PathBuf;

use serde_derive::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigLoad {
    /// `None` selects the in-memory engine; `Some(path)` opens (or
    /// creates) a `LogCask` at that path.
    pub storage_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,

    pub prompt: String,
    /// Show stats after executing a command. Only meaningful in
    /// non-interactive (batch) mode.
    pub show_stats: bool,
    /// Multi line mode, default true.
    pub multi_line: bool,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        ConfigLoad {
            storage_path: None,
            log_dir: None,
            log_level: "warn".to_string(),
            prompt: "txkv> ".to_string(),
            show_stats: false,
            multi_line: true,
        }
    }
}

impl ConfigLoad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips on the settings that only make sense once we know we're
    /// talking to an interactive terminal.
    pub fn terminal_update(&mut self) {
        self.show_stats = true;
    }

    /// Folds CLI flags over the defaults, matching `fix_settings`'s role in
    /// the upstream config: the command line always wins.
    pub fn apply_args(&mut self, args: &crate::Args) {
        if let Some(path) = &args.storage_path {
            self.storage_path = Some(path.clone());
        }
        if let Some(dir) = &args.log_dir {
            self.log_dir = Some(dir.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_update_enables_stats() {
        let mut cfg = ConfigLoad::new();
        assert!(!cfg.show_stats);
        cfg.terminal_update();
        assert!(cfg.show_stats);
    }
}
