//! Interaction lock
//!
//! Autoplay and manual viewport interaction are mutually exclusive. The lock
//! is a small shared cell handed to both the scheduler (which forces `Auto`
//! on play) and the pointer handler (which unlocks on click). Each engine
//! instance creates its own lock; clones share state.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Who currently drives the viewport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    /// Autoplay owns the camera; manual input is suppressed
    #[default]
    Auto,
    /// The user owns the camera
    Manual,
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionMode::Auto => f.write_str("auto"),
            InteractionMode::Manual => f.write_str("manual"),
        }
    }
}

/// Shared interaction mode
#[derive(Clone, Debug, Default)]
pub struct InteractionLock {
    mode: Rc<Cell<InteractionMode>>,
}

impl InteractionLock {
    pub fn new(mode: InteractionMode) -> Self {
        Self {
            mode: Rc::new(Cell::new(mode)),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode.get()
    }

    pub fn is_locked(&self) -> bool {
        self.mode.get() == InteractionMode::Auto
    }

    /// Switch to `Auto`. Returns true if the mode changed.
    pub fn lock(&self) -> bool {
        self.set(InteractionMode::Auto)
    }

    /// Switch to `Manual`. Returns true if the mode changed.
    pub fn unlock(&self) -> bool {
        self.set(InteractionMode::Manual)
    }

    pub fn set(&self, mode: InteractionMode) -> bool {
        let previous = self.mode.replace(mode);
        if previous != mode {
            tracing::debug!(from = %previous, to = %mode, "interaction mode changed");
        }
        previous != mode
    }

    /// True if both handles share the same cell
    pub fn shares_state_with(&self, other: &InteractionLock) -> bool {
        Rc::ptr_eq(&self.mode, &other.mode)
    }
}
