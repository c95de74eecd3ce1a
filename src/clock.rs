//! A shared monotonic clock handle.
//!
//! The event loop stamps the clock once per dispatch; everything downstream
//! (notably the pointer-resize debouncer) reads the stamped time instead of
//! the wall clock. Tests drive time explicitly.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct Clock {
    time: Rc<Cell<Duration>>,
}

impl Clock {
    pub fn with_time(time: Duration) -> Self {
        Self {
            time: Rc::new(Cell::new(time)),
        }
    }

    pub fn now(&self) -> Duration {
        self.time.get()
    }

    pub fn set_time(&self, time: Duration) {
        self.time.set(time);
    }

    pub fn advance(&self, delta: Duration) {
        self.time.set(self.time.get() + delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = Clock::with_time(Duration::ZERO);
        let other = clock.clone();
        clock.advance(Duration::from_millis(16));
        assert_eq!(other.now(), Duration::from_millis(16));
    }
}
