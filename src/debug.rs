use parking_lot::Mutex;
/// Debug logging for winrow
///
/// Controlled by the DEBUG_LEVEL environment variable (or `--log-level`):
/// - 0 or unset: No debugging
/// - 1: Errors only
/// - 2: Info level (window lifecycle, commands, sessions)
/// - 3: Debug level (lock contention, focus changes, pool growth)
/// - 4: Trace level (every pointer and key event)
///
/// Output goes to /tmp/winrow_debug.log on Unix, or %TEMP%\winrow_debug.log
/// on Windows, so diagnostics never mix with command output captured by the
/// editor.
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        std::env::var("DEBUG_LEVEL")
            .ok()
            .and_then(|val| Self::parse(&val))
            .unwrap_or(DebugLevel::Off)
    }

    /// Parse a numeric (`0`-`4`) or named (`off`, `error`, ...) level.
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "0" | "off" => Some(DebugLevel::Off),
            "1" | "error" | "warn" => Some(DebugLevel::Error),
            "2" | "info" => Some(DebugLevel::Info),
            "3" | "debug" => Some(DebugLevel::Debug),
            "4" | "trace" => Some(DebugLevel::Trace),
            _ => None,
        }
    }

    fn to_filter(self) -> log::LevelFilter {
        match self {
            DebugLevel::Off => log::LevelFilter::Off,
            DebugLevel::Error => log::LevelFilter::Warn,
            DebugLevel::Info => log::LevelFilter::Info,
            DebugLevel::Debug => log::LevelFilter::Debug,
            DebugLevel::Trace => log::LevelFilter::Trace,
        }
    }

    fn from_log(level: log::Level) -> Self {
        match level {
            log::Level::Error | log::Level::Warn => DebugLevel::Error,
            log::Level::Info => DebugLevel::Info,
            log::Level::Debug => DebugLevel::Debug,
            log::Level::Trace => DebugLevel::Trace,
        }
    }
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
    mirror_stderr: bool,
}

impl DebugLogger {
    fn new() -> Self {
        Self::with_level(DebugLevel::from_env())
    }

    fn with_level(level: DebugLevel) -> Self {
        let mirror_stderr = std::env::var_os("RUST_LOG").is_some();
        if level == DebugLevel::Off {
            return DebugLogger {
                level,
                file: None,
                mirror_stderr,
            };
        }

        #[cfg(unix)]
        let log_path = std::path::PathBuf::from("/tmp/winrow_debug.log");
        #[cfg(windows)]
        let log_path = std::env::temp_dir().join("winrow_debug.log");

        // Silently run without a file if it can't be opened.
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&log_path)
            .ok();
        let mut logger = DebugLogger {
            level,
            file,
            mirror_stderr,
        };
        logger.write_raw(&format!(
            "\n{}\nwinrow debug session started at {} (level={:?})\n{}\n",
            "=".repeat(80),
            get_timestamp(),
            level,
            "=".repeat(80)
        ));
        logger
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
        if self.mirror_stderr {
            eprint!("{}", msg);
        }
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level <= self.level {
            let level_str = match level {
                DebugLevel::Error => "ERROR",
                DebugLevel::Info => "INFO ",
                DebugLevel::Debug => "DEBUG",
                DebugLevel::Trace => "TRACE",
                DebugLevel::Off => return,
            };
            self.write_raw(&format!(
                "[{}] [{}] [{}] {}\n",
                get_timestamp(),
                level_str,
                category,
                msg
            ));
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new()))
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

/// Forwards `log` crate records into the debug log file, using the record's
/// target as the category.
struct LogBridge;

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        is_enabled(DebugLevel::from_log(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let level = DebugLevel::from_log(record.level());
        if is_enabled(level) {
            log(level, record.target(), &format!("{}", record.args()));
        }
    }

    fn flush(&self) {}
}

static BRIDGE: LogBridge = LogBridge;

/// Install the `log` facade bridge.
///
/// `level` overrides DEBUG_LEVEL when given. Calling this more than once is
/// harmless; only the first call installs the logger.
pub fn init_log_bridge(level: Option<DebugLevel>) {
    let logger = get_logger();
    if let Some(level) = level {
        let mut guard = logger.lock();
        if guard.level != level {
            *guard = DebugLogger::with_level(level);
        }
    }
    let effective = logger.lock().level;
    if log::set_logger(&BRIDGE).is_ok() {
        log::set_max_level(effective.to_filter());
    }
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!(DebugLevel::parse("0"), Some(DebugLevel::Off));
        assert_eq!(DebugLevel::parse(" 3 "), Some(DebugLevel::Debug));
        assert_eq!(DebugLevel::parse("TRACE"), Some(DebugLevel::Trace));
        assert_eq!(DebugLevel::parse("warn"), Some(DebugLevel::Error));
        assert_eq!(DebugLevel::parse("loud"), None);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(DebugLevel::Error < DebugLevel::Info);
        assert!(DebugLevel::Debug < DebugLevel::Trace);
        assert_eq!(DebugLevel::Info.to_filter(), log::LevelFilter::Info);
    }
}
