//! report.rs
//! Leveled message sink injected into the engine.

use log::Level;
use std::cell::RefCell;

pub trait Reporter {
    fn report(&self, level: Level, message: &str);
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, level: Level, message: &str) {
        log::log!(target: "contour_alignment", level, "{}", message);
    }
}

/// Keeps every message in memory, in emission order.
#[derive(Debug, Default)]
pub struct CapturingReporter {
    entries: RefCell<Vec<(Level, String)>>,
}

impl CapturingReporter {
    pub fn new() -> Self { Self::default() }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries.borrow().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries.borrow().iter().any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Reporter for CapturingReporter {
    fn report(&self, level: Level, message: &str) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }
}
