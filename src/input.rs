//! Per-window input loops.
//!
//! Every window runs two tasks for its lifetime:
//! - [`pointer`]: pointer samples, screen resizes, warning wake-ups and
//!   plumb messages
//! - [`keyboard`]: typed runes and the deferred tag commit
//!
//! Both loops take the editor's structural lock before touching the tree
//! and end when the window's teardown signal fires.

pub mod debounce;
pub mod keyboard;
pub mod pointer;

pub use debounce::Debounce;
pub use keyboard::KeyLoop;
pub use pointer::{PointerLoop, Sweep};

/// Wheel-up bit of the button mask
pub const WHEEL_UP: u32 = 8;
/// Wheel-down bit of the button mask
pub const WHEEL_DOWN: u32 = 16;

/// Logical button for a button mask: 1, 2 and 4 map to buttons 1, 2 and 3.
/// Chords and wheel masks have no logical button.
pub fn button_number(mask: u32) -> u32 {
    match mask {
        1 => 1,
        2 => 2,
        4 => 3,
        _ => 0,
    }
}

/// Button used for a scroll-bar click, honouring the swap setting.
pub fn scroll_button(but: u32, swap: bool) -> u32 {
    match (but, swap) {
        (1, true) => 3,
        (3, true) => 1,
        (b, _) => b,
    }
}
