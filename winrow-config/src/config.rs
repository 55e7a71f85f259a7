//! The `Config` struct, its defaults, and YAML persistence.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - XDG-style path helpers (`config_path`, `config_dir`)
//! - Environment overrides (`apply_env`)
//! - Default session dump location (`dump_path`)

use crate::env_vars::{DEFAULT_TAB_WIDTH, EnvOverrides};
use crate::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default variable-width font name.
pub const DEFAULT_VAR_FONT: &str = "/lib/font/bit/lucsans/euro.8.font";
/// Default fixed-width font name.
pub const DEFAULT_FIXED_FONT: &str = "/lib/font/bit/lucm/unicode.9.font";
/// Quiet period after the last keystroke in a tag before it is committed.
pub const DEFAULT_TAG_COMMIT_DELAY_MS: u64 = 500;
/// File name used for session dumps when none is given.
pub const DEFAULT_DUMP_FILE_NAME: &str = "winrow.dump";

fn default_var_font() -> String {
    DEFAULT_VAR_FONT.to_string()
}

fn default_fixed_font() -> String {
    DEFAULT_FIXED_FONT.to_string()
}

fn default_tab_width() -> u32 {
    DEFAULT_TAB_WIDTH
}

fn default_tag_commit_delay_ms() -> u64 {
    DEFAULT_TAG_COMMIT_DELAY_MS
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Variable-width font name, recorded in session dumps
    #[serde(default = "default_var_font")]
    pub var_font: String,

    /// Fixed-width font name, recorded in session dumps
    #[serde(default = "default_fixed_font")]
    pub fixed_font: String,

    /// Tab width in columns
    #[serde(default = "default_tab_width")]
    pub tab_width: u32,

    /// Expand typed tabs to spaces
    #[serde(default)]
    pub tab_expand: bool,

    /// Start each window in autoindent mode
    #[serde(default)]
    pub autoindent: bool,

    /// Click to focus a window instead of focus-follows-mouse
    #[serde(default)]
    pub click_to_focus: bool,

    /// Swap buttons 1 and 3 when clicking in a scroll bar
    #[serde(default)]
    pub swap_scroll_buttons: bool,

    /// Mount point of the request-serving file system, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,

    /// Shell used to run external commands (falls back to `$SHELL`, then `sh`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Milliseconds of typing silence before a tag edit is committed
    #[serde(default = "default_tag_commit_delay_ms")]
    pub tag_commit_delay_ms: u64,

    /// Session dump file used by `Dump`/`Load` without an argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            var_font: default_var_font(),
            fixed_font: default_fixed_font(),
            tab_width: default_tab_width(),
            tab_expand: false,
            autoindent: false,
            click_to_focus: false,
            swap_scroll_buttons: false,
            mount_point: None,
            shell: None,
            tag_commit_delay_ms: default_tag_commit_delay_ms(),
            dump_file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    ///
    /// Environment overrides are applied after the file is read.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);
        let mut config = Self::load_from(&config_path)?.unwrap_or_default();
        config.apply_env(&EnvOverrides::from_env());
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// Returns `None` if the file doesn't exist or is empty.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(ConfigError::from)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let config: Config = serde_yaml_ng::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        log::info!("Loaded config from {:?}", path);
        Ok(Some(config))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::from)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::from)?;
        fs::rename(&temp_path, path).map_err(ConfigError::from)?;
        Ok(())
    }

    /// Get the configuration file path: `~/.config/winrow/config.yaml`
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path
    pub fn config_dir() -> PathBuf {
        match dirs::home_dir() {
            Some(home_dir) => home_dir.join(".config").join("winrow"),
            None => PathBuf::from("."),
        }
    }

    /// Check field values that serde cannot check on its own.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.tab_width == 0 {
            return Err(ConfigError::Validation(
                "tab_width must be at least 1".to_string(),
            ));
        }
        if self.tag_commit_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "tag_commit_delay_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `tabstop` / `tabexpand` / `acmeshell` overrides.
    pub fn apply_env(&mut self, overrides: &EnvOverrides) {
        if let Some(width) = overrides.tab_width {
            self.tab_width = width;
        }
        if let Some(expand) = overrides.tab_expand {
            self.tab_expand = expand;
        }
        if let Some(shell) = &overrides.shell {
            self.shell = Some(shell.clone());
        }
    }

    /// Quiet period before a tag edit is committed.
    pub fn tag_commit_delay(&self) -> Duration {
        Duration::from_millis(self.tag_commit_delay_ms)
    }

    /// Shell used for external commands.
    pub fn shell_program(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }

    /// Session dump file used when `Dump`/`Load` get no argument.
    ///
    /// Returns `None` when no explicit file is configured and the home
    /// directory cannot be determined.
    pub fn dump_path(&self) -> Option<PathBuf> {
        self.dump_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(DEFAULT_DUMP_FILE_NAME)))
    }

    /// Whether `path` lies under the configured mount point.
    pub fn is_mount_point(&self, path: &str) -> bool {
        let Some(mount) = self.mount_point.as_deref().filter(|m| !m.is_empty()) else {
            return false;
        };
        let cleaned = Path::new(path);
        cleaned.starts_with(mount)
    }
}
