//! Abstract interfaces to the operating system.
//!
//! The engine never talks to the OS directly: it reads and writes window
//! rectangles through a [`WindowBackend`] and learns about monitors through a
//! [`MonitorProvider`]. One implementation of each exists per OS; tests plug
//! in an in-memory fake.

use thiserror::Error;
use trellis_ipc::WindowId;

use crate::geometry::{Point, Rect, Size};

/// Failure of a backend call.
///
/// These are transient by design: the caller treats them as a no-op and the
/// next refresh pass re-synchronises.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("window backend is unavailable")]
    Unavailable,
    #[error("window {0} is gone")]
    WindowDead(WindowId),
}

/// Handler invoked with a window's new rectangle.
pub type RectHandler = Box<dyn FnMut(Rect)>;

/// Handler invoked when a window disappears.
pub type ClosedHandler = Box<dyn FnMut()>;

/// Reads and writes window geometry, and observes window lifecycle.
///
/// Calls are serialised by the single-threaded event loop. A call may take
/// time to get an OS reply; other events are dispatched in between, so
/// callers must not assume the tree is unchanged across a call.
pub trait WindowBackend {
    /// Reads a window's current rectangle.
    fn get_rect(&mut self, window: WindowId) -> Result<Rect, BackendError>;

    /// Asks the OS to place a window. The OS may clip the rectangle, and may
    /// reject the request while the window is mid-animation.
    fn set_rect(&mut self, window: WindowId, origin: Point, size: Size)
        -> Result<(), BackendError>;

    /// Convenience wrapper over [`WindowBackend::set_rect`].
    fn set_frame(&mut self, window: WindowId, rect: Rect) -> Result<(), BackendError> {
        self.set_rect(window, rect.loc, rect.size)
    }

    /// Gives a window input focus.
    fn focus(&mut self, window: WindowId) -> Result<(), BackendError>;

    /// Registers a handler for asynchronous resize notifications.
    fn on_resized(&mut self, window: WindowId, handler: RectHandler);

    /// Registers a handler for move notifications.
    fn on_moved(&mut self, window: WindowId, handler: RectHandler);

    /// Registers a handler for the window disappearing.
    fn on_closed(&mut self, window: WindowId, handler: ClosedHandler);
}

/// A physical monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    /// Connector or display name.
    pub name: String,
    /// Full monitor rectangle.
    pub frame: Rect,
    /// Frame minus system reserved areas (menu bar, dock).
    pub visible_frame: Rect,
}

/// Enumerates monitors.
pub trait MonitorProvider {
    fn monitors(&self) -> Vec<Monitor>;
}
