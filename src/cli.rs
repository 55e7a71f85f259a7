//! Command-line interface for winrow.
//!
//! Flags override the configuration file and the environment.

use crate::debug::DebugLevel;
use clap::Parser;
use std::path::PathBuf;
use winrow_config::Config;

/// winrow - a window-oriented text editor core
#[derive(Parser, Debug)]
#[command(name = "winrow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Load a session dump instead of opening files
    #[arg(short = 'l', long = "load", value_name = "FILE")]
    pub load: Option<PathBuf>,

    /// Start with autoindent on
    #[arg(short = 'a', long)]
    pub autoindent: bool,

    /// Only a click moves keyboard focus
    #[arg(short = 'b', long)]
    pub click_to_focus: bool,

    /// Swap the scroll directions of buttons 1 and 3
    #[arg(short = 'r', long)]
    pub swap_scroll: bool,

    /// Variable-width font
    #[arg(short = 'f', long, value_name = "FONT")]
    pub var_font: Option<String>,

    /// Fixed-width font
    #[arg(short = 'F', long, value_name = "FONT")]
    pub fixed_font: Option<String>,

    /// Directory where the filesystem interface is mounted
    #[arg(short = 'm', long, value_name = "DIR")]
    pub mount_point: Option<String>,

    /// Set debug log level (overrides config and DEBUG_LEVEL)
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Files to open
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for DebugLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Off => DebugLevel::Off,
            LogLevelArg::Error => DebugLevel::Error,
            LogLevelArg::Info => DebugLevel::Info,
            LogLevelArg::Debug => DebugLevel::Debug,
            LogLevelArg::Trace => DebugLevel::Trace,
        }
    }
}

impl Cli {
    /// Layer the flags over a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if self.autoindent {
            config.autoindent = true;
        }
        if self.click_to_focus {
            config.click_to_focus = true;
        }
        if self.swap_scroll {
            config.swap_scroll_buttons = true;
        }
        if let Some(font) = &self.var_font {
            config.var_font = font.clone();
        }
        if let Some(font) = &self.fixed_font {
            config.fixed_font = font.clone();
        }
        if let Some(mtpt) = &self.mount_point {
            config.mount_point = Some(mtpt.clone());
        }
    }

    pub fn debug_level(&self) -> Option<DebugLevel> {
        self.log_level.map(DebugLevel::from)
    }
}
