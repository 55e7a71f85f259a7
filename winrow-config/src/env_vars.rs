//! Environment overrides applied on top of the YAML configuration.
//!
//! The editor honours three environment variables inherited from its
//! plan9 heritage:
//!
//! - `tabstop`: tab width in columns (a zero or unparsable value keeps the default)
//! - `tabexpand`: `true`/`false`, whether typed tabs are expanded to spaces
//! - `acmeshell`: shell used to run external commands

/// Tab width used when neither the config nor `tabstop` provides one.
pub const DEFAULT_TAB_WIDTH: u32 = 4;

/// Parse a `tabstop` value. Returns `None` for empty, zero, or invalid input.
pub fn parse_tabstop(value: &str) -> Option<u32> {
    match value.trim().parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

/// Parse a `tabexpand` value using the usual boolean spellings.
///
/// Unrecognised values read as `false`, matching a failed `ParseBool`.
pub fn parse_tabexpand(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "t" | "true"
    )
}

/// Snapshot of the overrides present in an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub tab_width: Option<u32>,
    pub tab_expand: Option<bool>,
    pub shell: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary lookup function (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let tab_width = lookup("tabstop").and_then(|v| parse_tabstop(&v));
        let tab_expand = lookup("tabexpand")
            .filter(|v| !v.is_empty())
            .map(|v| parse_tabexpand(&v));
        let shell = lookup("acmeshell").filter(|v| !v.trim().is_empty());
        Self {
            tab_width,
            tab_expand,
            shell,
        }
    }
}
