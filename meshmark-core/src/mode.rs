//! Input mode state machine: Navigate/Draw crossed with Line/Tube.

use tracing::debug;

use crate::capture::Path;
use crate::controls::CameraControl;
use crate::input::{PointerHub, PointerSubscription};

/// How the captured path is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representation {
    #[default]
    Line,
    Tube,
}

impl Representation {
    pub fn toggled(self) -> Self {
        match self {
            Self::Line => Self::Tube,
            Self::Tube => Self::Line,
        }
    }
}

/// A keyboard command understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    ToggleDraw,
    ToggleRepresentation,
}

impl ModeCommand {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'd' | 'D' => Some(Self::ToggleDraw),
            't' | 'T' => Some(Self::ToggleRepresentation),
            _ => None,
        }
    }
}

/// What a command changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    DrawEntered,
    DrawExited,
    Representation(Representation),
}

/// Two independent toggles: drawing (which disables navigation) and the
/// display representation.
///
/// While drawing, the controller owns the only pointer subscription of the
/// session. It is acquired on entering Draw and dropped on leaving it or on
/// reset, so repeated toggles never stack listeners.
#[derive(Debug, Default)]
pub struct InputModeController {
    draw_enabled: bool,
    representation: Representation,
    session: Option<PointerSubscription>,
}

impl InputModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_enabled(&self) -> bool {
        self.draw_enabled
    }

    /// Camera navigation is always the inverse of drawing
    pub fn navigation_enabled(&self) -> bool {
        !self.draw_enabled
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn tube_enabled(&self) -> bool {
        self.representation == Representation::Tube
    }

    /// True while drawing with the pointer button held
    pub fn is_capturing(&self) -> bool {
        self.draw_enabled && self.session.as_ref().is_some_and(PointerSubscription::is_held)
    }

    pub fn apply(
        &mut self,
        command: ModeCommand,
        hub: &PointerHub,
        path: &mut Path,
        camera: &mut dyn CameraControl,
    ) -> ModeChange {
        match command {
            ModeCommand::ToggleDraw => self.toggle_draw(hub, path, camera),
            ModeCommand::ToggleRepresentation => self.toggle_representation(),
        }
    }

    /// Entering Draw clears the path and starts listening to the pointer.
    /// Leaving it keeps the path but stops listening.
    pub fn toggle_draw(
        &mut self,
        hub: &PointerHub,
        path: &mut Path,
        camera: &mut dyn CameraControl,
    ) -> ModeChange {
        self.draw_enabled = !self.draw_enabled;
        camera.set_enabled(self.navigation_enabled());

        if self.draw_enabled {
            path.clear();
            self.session = Some(hub.subscribe());
            debug!("entered draw mode");
            ModeChange::DrawEntered
        } else {
            self.session = None;
            debug!(points = path.len(), "left draw mode");
            ModeChange::DrawExited
        }
    }

    pub fn toggle_representation(&mut self) -> ModeChange {
        self.representation = self.representation.toggled();
        debug!(representation = ?self.representation, "representation changed");
        ModeChange::Representation(self.representation)
    }

    /// Back to Navigate + Line, releasing any pointer subscription
    pub fn reset(&mut self, camera: &mut dyn CameraControl) {
        self.draw_enabled = false;
        self.representation = Representation::Line;
        self.session = None;
        camera.set_enabled(true);
    }
}
