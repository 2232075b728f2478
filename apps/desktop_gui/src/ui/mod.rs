//! UI layer for desktop GUI: the single todo screen.

pub mod app;

pub use app::TodoApp;
