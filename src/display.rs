//! A display device without a screen.
//!
//! The editor core only needs somewhere to send flushes and cursor warps and
//! something to read pointer, resize and key events from. `HeadlessDevice`
//! keeps the sending half of every window's event channels so a driver (the
//! binary's signal handling, or a test) can feed input, and records what
//! the core asked the display to do.

use crate::geometry::{Point, Rect};
use crate::traits::{Display, DisplayDevice, DisplaySession, Metrics, Mouse};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

const EVENT_CAPACITY: usize = 64;

/// Sending side of one window's event channels.
#[derive(Debug, Clone)]
pub struct DisplayPort {
    pub title: String,
    pub pointer: mpsc::Sender<Mouse>,
    pub resize: mpsc::Sender<()>,
    pub keys: mpsc::Sender<char>,
    pub display: Arc<HeadlessDisplay>,
}

/// Drawing handle that only counts what it is asked to do.
#[derive(Debug)]
pub struct HeadlessDisplay {
    screen: Arc<Mutex<Rect>>,
    flushes: AtomicUsize,
    attaches: AtomicUsize,
    cursor: Mutex<Option<Point>>,
}

impl HeadlessDisplay {
    fn new(screen: Arc<Mutex<Rect>>) -> Self {
        Self {
            screen,
            flushes: AtomicUsize::new(0),
            attaches: AtomicUsize::new(0),
            cursor: Mutex::new(None),
        }
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    /// Where the pointer was last warped to.
    pub fn cursor(&self) -> Option<Point> {
        *self.cursor.lock()
    }
}

impl Display for HeadlessDisplay {
    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn attach(&self) -> anyhow::Result<()> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn screen_rect(&self) -> Rect {
        *self.screen.lock()
    }

    fn move_cursor(&self, p: Point) {
        *self.cursor.lock() = Some(p);
    }
}

/// A device whose windows share one virtual screen.
#[derive(Debug)]
pub struct HeadlessDevice {
    screen: Arc<Mutex<Rect>>,
    metrics: Metrics,
    ports: Mutex<Vec<DisplayPort>>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(Rect::new(0, 0, 800, 600), Metrics::default())
    }
}

impl HeadlessDevice {
    pub fn new(screen: Rect, metrics: Metrics) -> Self {
        Self {
            screen: Arc::new(Mutex::new(screen)),
            metrics,
            ports: Mutex::new(Vec::new()),
        }
    }

    /// Ports of every session opened so far, oldest first.
    pub fn ports(&self) -> Vec<DisplayPort> {
        self.ports.lock().clone()
    }

    /// The most recently opened port.
    pub fn last_port(&self) -> Option<DisplayPort> {
        self.ports.lock().last().cloned()
    }

    /// Change the screen size. Windows find out through their resize channel.
    pub fn set_screen_rect(&self, r: Rect) {
        *self.screen.lock() = r;
        let ports = self.ports();
        for port in ports {
            // Closed windows no longer listen.
            let _ = port.resize.try_send(());
        }
    }
}

impl DisplayDevice for HeadlessDevice {
    fn open(&self, title: &str) -> anyhow::Result<DisplaySession> {
        let (pointer_tx, pointer) = mpsc::channel(EVENT_CAPACITY);
        let (resize_tx, resize) = mpsc::channel(EVENT_CAPACITY);
        let (keys_tx, keys) = mpsc::channel(EVENT_CAPACITY);
        let display = Arc::new(HeadlessDisplay::new(Arc::clone(&self.screen)));
        self.ports.lock().push(DisplayPort {
            title: title.to_string(),
            pointer: pointer_tx,
            resize: resize_tx,
            keys: keys_tx,
            display: Arc::clone(&display),
        });
        crate::debug_info!("DISPLAY", "opened headless session {:?}", title);
        Ok(DisplaySession {
            display,
            pointer,
            resize,
            keys,
        })
    }

    fn screen_rect(&self) -> Rect {
        *self.screen.lock()
    }

    fn metrics(&self) -> Metrics {
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ports_feed_sessions() {
        let device = HeadlessDevice::default();
        let mut session = device.open("a").unwrap();
        let port = device.last_port().unwrap();
        assert_eq!(port.title, "a");
        port.keys.send('x').await.unwrap();
        assert_eq!(session.keys.recv().await, Some('x'));
        session.display.move_cursor(Point::new(3, 4));
        assert_eq!(port.display.cursor(), Some(Point::new(3, 4)));
    }

    #[tokio::test]
    async fn test_resize_notifies_and_shares_screen() {
        let device = HeadlessDevice::default();
        let mut session = device.open("a").unwrap();
        device.set_screen_rect(Rect::new(0, 0, 400, 300));
        assert_eq!(session.resize.recv().await, Some(()));
        assert_eq!(session.display.screen_rect(), Rect::new(0, 0, 400, 300));
    }
}
