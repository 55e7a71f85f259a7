//! Per-window content lock with owner tracking.

use super::{Window, WindowState};
use parking_lot::MutexGuard;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::Ordering;

/// Which subsystem holds a window lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LockOwner {
    /// Pointer event loop
    Mouse = b'M',
    /// Key event loop
    Keyboard = b'K',
    /// Tag commands and other editor-initiated work
    Editor = b'X',
    /// Warning flush into `+Errors`
    Warnings = b'E',
    /// Session dump and load
    Session = b'D',
    /// Filesystem request handlers
    Filesystem = b'F',
}

impl LockOwner {
    pub(super) fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'M' => Some(LockOwner::Mouse),
            b'K' => Some(LockOwner::Keyboard),
            b'X' => Some(LockOwner::Editor),
            b'E' => Some(LockOwner::Warnings),
            b'D' => Some(LockOwner::Session),
            b'F' => Some(LockOwner::Filesystem),
            _ => None,
        }
    }
}

/// Scoped hold of a window's lock. Dropping it releases the lock and clears
/// the recorded owner.
pub struct WindowGuard<'a> {
    window: &'a Window,
    state: MutexGuard<'a, WindowState>,
}

impl<'a> WindowGuard<'a> {
    pub(super) fn new(window: &'a Window, state: MutexGuard<'a, WindowState>) -> Self {
        Self { window, state }
    }

    /// The locked window.
    pub fn window(&self) -> &'a Window {
        self.window
    }
}

impl Deref for WindowGuard<'_> {
    type Target = WindowState;

    fn deref(&self) -> &WindowState {
        &self.state
    }
}

impl DerefMut for WindowGuard<'_> {
    fn deref_mut(&mut self) -> &mut WindowState {
        &mut self.state
    }
}

impl Drop for WindowGuard<'_> {
    fn drop(&mut self) {
        self.window.owner.store(0, Ordering::Release);
    }
}

impl Window {
    /// Acquire the window lock on behalf of `owner`.
    ///
    /// Blocks while another owner holds it; contested acquisitions are
    /// logged with both owners. Not reentrant.
    pub fn lock(&self, owner: LockOwner) -> WindowGuard<'_> {
        let state = match self.state.try_lock() {
            Some(state) => state,
            None => {
                log::debug!(
                    "window {} lock contested: held by {:?}, wanted by {:?}",
                    self.id,
                    self.owner(),
                    owner
                );
                self.state.lock()
            }
        };
        self.owner.store(owner as u8, Ordering::Release);
        WindowGuard::new(self, state)
    }

    /// Acquire the lock only if it is free.
    pub fn try_lock(&self, owner: LockOwner) -> Option<WindowGuard<'_>> {
        let state = self.state.try_lock()?;
        self.owner.store(owner as u8, Ordering::Release);
        Some(WindowGuard::new(self, state))
    }

    /// Current holder of the lock, if any.
    pub fn owner(&self) -> Option<LockOwner> {
        LockOwner::from_u8(self.owner.load(Ordering::Acquire))
    }
}
