//! A resettable one-shot deadline for `select!` loops.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

/// Fires once, `delay` after the most recent [`Debounce::arm`].
///
/// While disarmed, [`Debounce::fired`] never completes, so the branch can
/// stay in a `select!` unconditionally.
#[derive(Debug)]
pub struct Debounce {
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new()
    }
}

impl Debounce {
    pub fn new() -> Self {
        Self {
            sleep: Box::pin(tokio::time::sleep(Duration::ZERO)),
            armed: false,
        }
    }

    /// Start or restart the deadline.
    pub fn arm(&mut self, delay: Duration) {
        self.sleep.as_mut().reset(Instant::now() + delay);
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Completes when an armed deadline passes, disarming it.
    ///
    /// Cancel safe: dropping the future leaves the deadline as it was.
    pub async fn fired(&mut self) {
        if !self.armed {
            std::future::pending::<()>().await;
        }
        self.sleep.as_mut().await;
        self.armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rearm_pushes_deadline_back() {
        let mut d = Debounce::new();
        let start = Instant::now();
        d.arm(Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(300)).await;
        d.arm(Duration::from_millis(500));
        d.fired().await;
        assert!(start.elapsed() >= Duration::from_millis(800));
        assert!(!d.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let mut d = Debounce::new();
        d.arm(Duration::from_millis(10));
        d.disarm();
        let fired = tokio::time::timeout(Duration::from_secs(5), d.fired()).await;
        assert!(fired.is_err());
    }
}
