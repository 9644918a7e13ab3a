//! Interaction synchronization
//!
//! Keeps autoplay and manual viewport control mutually exclusive. While the
//! shared [`InteractionLock`] is `Auto`, drags and wheel input are swallowed;
//! a click hands control to the user and pauses playback in the same step.

use itinera_animation::Transport;
use itinera_camera::{CameraController, CameraInput, ScreenPoint};
use itinera_core::{InteractionLock, InteractionMode};

/// Raw pointer input from the host
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    Click { x: f64, y: f64 },
    Drag { dx: f64, dy: f64 },
    /// Wheel notches at a pointer position (positive = zoom in)
    Wheel { delta: f64, x: f64, y: f64 },
}

/// What the handler did with an input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// Suppressed because autoplay owns the camera
    Swallowed,
    /// A click unlocked interaction and paused playback
    Unlocked,
    /// The camera was moved
    Applied,
    /// Accepted but nothing to do
    Ignored,
}

#[derive(Clone, Debug, Default)]
pub struct InteractionHandler {
    lock: InteractionLock,
}

impl InteractionHandler {
    pub fn new(lock: InteractionLock) -> Self {
        Self { lock }
    }

    pub fn lock(&self) -> &InteractionLock {
        &self.lock
    }

    pub fn mode(&self) -> InteractionMode {
        self.lock.mode()
    }

    pub fn lock_interaction(&self) {
        self.lock.lock();
    }

    pub fn unlock_interaction(&self) {
        self.lock.unlock();
    }

    /// Route one pointer input to the camera or the transport
    pub fn handle(
        &self,
        input: PointerInput,
        camera: &mut CameraController,
        transport: &mut dyn Transport,
    ) -> InteractionOutcome {
        match (self.lock.mode(), input) {
            (InteractionMode::Auto, PointerInput::Click { .. }) => {
                self.lock.unlock();
                transport.pause();
                tracing::debug!("click took manual control; playback paused");
                InteractionOutcome::Unlocked
            }
            (InteractionMode::Auto, _) => {
                tracing::trace!(?input, "input swallowed during autoplay");
                InteractionOutcome::Swallowed
            }
            (InteractionMode::Manual, PointerInput::Drag { dx, dy }) => {
                let frame = CameraInput::drag(dx, dy);
                if frame.is_empty() {
                    return InteractionOutcome::Ignored;
                }
                camera.apply_input(&frame);
                InteractionOutcome::Applied
            }
            (InteractionMode::Manual, PointerInput::Wheel { delta, x, y }) => {
                if delta == 0.0 {
                    return InteractionOutcome::Ignored;
                }
                camera.apply_input(&CameraInput::scroll(delta, ScreenPoint::new(x, y)));
                InteractionOutcome::Applied
            }
            (InteractionMode::Manual, PointerInput::Click { .. }) => InteractionOutcome::Ignored,
        }
    }
}
