// Library exports for testing and embedding
//
// # Lock Order
//
// winrow guards its state with three kinds of lock, always taken in this
// order:
//
//   1. the structural lock: `Editor::row()`, a `parking_lot::Mutex` around
//      the window tree. Taken by input loops, coordinators and built-in
//      commands before touching columns or focus.
//
//   2. a window lock: `Window::lock(owner)`, recording which subsystem
//      holds it. Never take the structural lock while holding one.
//
//   3. a file lock: the `parking_lot::Mutex` inside a `FileRef`, shared
//      between zeroxes. Held only for the duration of one buffer operation.
//
// `tokio::sync::Mutex` is used only where a guard must be held across an
// await (the shared plumb receiver). No parking_lot guard is ever held
// across an await.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod column;
pub mod command;
pub mod display;
pub mod editor;
pub mod events;
pub mod exec;
pub mod file;
pub mod geometry;
pub mod input;
pub mod mount;
pub mod pool;
pub mod row;
pub mod session;
pub mod text;
pub mod traits;
pub mod warnings;
pub mod window;

pub use editor::{Editor, EditorTasks};
pub use winrow_config::Config;
