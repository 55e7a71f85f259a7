//! Directory contexts that commands and their diagnostics belong to.
//!
//! A command launched from a window carries the window's directory and
//! include path. Warnings produced on its behalf are collected per context
//! and shown in that directory's `+Errors` window. Contexts are shared by
//! reference count; the last holder releasing its `Arc` frees it.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct MountDir {
    pub id: u64,
    pub dir: String,
    pub incl: Vec<String>,
}

impl MountDir {
    pub fn new(dir: impl Into<String>, incl: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            dir: dir.into(),
            incl,
        })
    }
}

/// Name of the diagnostics window for `dir`.
pub fn error_window_name(dir: &str) -> String {
    if dir.is_empty() {
        "+Errors".to_string()
    } else {
        Path::new(dir).join("+Errors").to_string_lossy().to_string()
    }
}

/// True if `filename` lies under the mount point `mtpt`.
pub fn is_mount_point(mtpt: &str, filename: &str) -> bool {
    if mtpt.is_empty() {
        return false;
    }
    let s = filename.trim_end_matches('/');
    let s = if s.is_empty() { "/" } else { s };
    s.strip_prefix(mtpt)
        .is_some_and(|rest| mtpt.ends_with('/') || rest.is_empty() || rest.starts_with('/'))
}
