//! Tiling layout engine for the trellis window manager.
//!
//! The engine owns a per-workspace tree of containers and windows, computes
//! every window's rectangle from that declarative model, and reacts to
//! structural edits, discrete and pointer-driven resizes, and spatial focus
//! navigation. The operating system sits behind the [`backend::WindowBackend`]
//! trait; commands and their argument types come from `trellis-ipc` and the
//! configuration from `trellis-config`.

pub mod backend;
pub mod clock;
pub mod engine;
pub mod geometry;
pub mod layout;
pub mod navigation;
pub mod resize;

pub use engine::{CommandError, Engine, Session};
pub use layout::{LayoutKind, Options};
