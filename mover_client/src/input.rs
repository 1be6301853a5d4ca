//! Input handling.
//!
//! Touch widgets (joystick, jump button, drag field) are injected into a
//! local avatar at construction. Keyboard and mouse are sampled by the host
//! once per tick and passed in as a `DeviceInput` snapshot.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use mover_shared::math::Vec2;
use serde::{Deserialize, Serialize};

/// Virtual analog stick.
pub trait Joystick: Send + Sync {
    /// Stick deflection with magnitude at most 1.
    fn axis_normalized(&self) -> Vec2;
}

/// Virtual on-screen button.
pub trait JumpButton: Send + Sync {
    fn pressed(&self) -> bool;
}

/// Virtual drag area used for looking around.
pub trait TouchField: Send + Sync {
    /// Drag delta since the previous frame.
    fn touch_dist(&self) -> Vec2;
}

/// A required interaction surface that was not provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSurface {
    Joystick,
    JumpButton,
    TouchField,
}

impl std::fmt::Display for MissingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingSurface::Joystick => write!(f, "Joystick not found"),
            MissingSurface::JumpButton => write!(f, "Jump Button not found"),
            MissingSurface::TouchField => write!(f, "Touch Field not found"),
        }
    }
}

impl std::error::Error for MissingSurface {}

/// Interaction surfaces as handed to an avatar; any of them may be absent.
#[derive(Default)]
pub struct InteractionSurfaces {
    pub joystick: Option<Box<dyn Joystick>>,
    pub jump_button: Option<Box<dyn JumpButton>>,
    pub touch_field: Option<Box<dyn TouchField>>,
}

impl InteractionSurfaces {
    /// No surfaces at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_joystick(mut self, joystick: impl Joystick + 'static) -> Self {
        self.joystick = Some(Box::new(joystick));
        self
    }

    pub fn with_jump_button(mut self, button: impl JumpButton + 'static) -> Self {
        self.jump_button = Some(Box::new(button));
        self
    }

    pub fn with_touch_field(mut self, field: impl TouchField + 'static) -> Self {
        self.touch_field = Some(Box::new(field));
        self
    }

    /// Lists absent surfaces in a stable order.
    pub fn missing(&self) -> Vec<MissingSurface> {
        let mut out = Vec::new();
        if self.joystick.is_none() {
            out.push(MissingSurface::Joystick);
        }
        if self.jump_button.is_none() {
            out.push(MissingSurface::JumpButton);
        }
        if self.touch_field.is_none() {
            out.push(MissingSurface::TouchField);
        }
        out
    }

    /// Succeeds only when all three surfaces are present.
    pub fn bind(self) -> Result<BoundSurfaces, Vec<MissingSurface>> {
        match (self.joystick, self.jump_button, self.touch_field) {
            (Some(joystick), Some(jump_button), Some(touch_field)) => Ok(BoundSurfaces {
                joystick,
                jump_button,
                touch_field,
            }),
            (joystick, jump_button, touch_field) => {
                let partial = InteractionSurfaces {
                    joystick,
                    jump_button,
                    touch_field,
                };
                Err(partial.missing())
            }
        }
    }
}

/// The full set of surfaces a local avatar polls each step.
pub struct BoundSurfaces {
    joystick: Box<dyn Joystick>,
    jump_button: Box<dyn JumpButton>,
    touch_field: Box<dyn TouchField>,
}

impl BoundSurfaces {
    /// Combines touch widgets with the device snapshot.
    pub fn sample(&self, device: &DeviceInput) -> MoveInput {
        let stick = self.joystick.axis_normalized();
        let touch = self.touch_field.touch_dist();
        MoveInput {
            horizontal: stick.x + device.horizontal,
            vertical: stick.y + device.vertical,
            jump: self.jump_button.pressed() || device.jump_held,
            run: device.run_held,
            look: touch + device.mouse_delta,
        }
    }
}

/// Keyboard and mouse state for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInput {
    /// Horizontal axis in `[-1, 1]` (A/D, arrows).
    pub horizontal: f32,
    /// Vertical axis in `[-1, 1]` (W/S, arrows).
    pub vertical: f32,
    pub jump_held: bool,
    /// Left shift.
    pub run_held: bool,
    /// Mouse movement in degrees.
    pub mouse_delta: Vec2,
    /// Escape went down this frame.
    pub escape_pressed: bool,
}

/// Combined per-step movement input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    pub horizontal: f32,
    pub vertical: f32,
    pub jump: bool,
    pub run: bool,
    /// Look delta in degrees: x is yaw, y is pitch.
    pub look: Vec2,
}

/// Joystick whose axis can be set from another owner of the handle.
#[derive(Debug, Clone, Default)]
pub struct VirtualJoystick {
    axis: Arc<RwLock<Vec2>>,
}

impl VirtualJoystick {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, axis: Vec2) {
        if let Ok(mut guard) = self.axis.write() {
            *guard = axis;
        }
    }
}

impl Joystick for VirtualJoystick {
    fn axis_normalized(&self) -> Vec2 {
        let axis = self.axis.read().map(|a| *a).unwrap_or_default();
        if axis.len() > 1.0 {
            axis.normalize_or_zero()
        } else {
            axis
        }
    }
}

/// Shared on-screen button.
#[derive(Debug, Clone, Default)]
pub struct VirtualButton {
    pressed: Arc<AtomicBool>,
}

impl VirtualButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pressed(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::Relaxed);
    }
}

impl JumpButton for VirtualButton {
    fn pressed(&self) -> bool {
        self.pressed.load(Ordering::Relaxed)
    }
}

/// Shared drag field.
#[derive(Debug, Clone, Default)]
pub struct VirtualTouchField {
    dist: Arc<RwLock<Vec2>>,
}

impl VirtualTouchField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, dist: Vec2) {
        if let Ok(mut guard) = self.dist.write() {
            *guard = dist;
        }
    }
}

impl TouchField for VirtualTouchField {
    fn touch_dist(&self) -> Vec2 {
        self.dist.read().map(|d| *d).unwrap_or_default()
    }
}

/// Host-side handles to a full set of virtual widgets.
#[derive(Debug, Clone, Default)]
pub struct VirtualWidgets {
    pub joystick: VirtualJoystick,
    pub jump_button: VirtualButton,
    pub touch_field: VirtualTouchField,
}

impl VirtualWidgets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surfaces sharing state with these handles.
    pub fn surfaces(&self) -> InteractionSurfaces {
        InteractionSurfaces::none()
            .with_joystick(self.joystick.clone())
            .with_jump_button(self.jump_button.clone())
            .with_touch_field(self.touch_field.clone())
    }
}

/// Cursor lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorLock {
    #[default]
    None,
    Locked,
}

/// Cursor state owned by a local avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub lock: CursorLock,
    pub visible: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            lock: CursorLock::None,
            visible: true,
        }
    }
}

impl CursorState {
    /// Hides and locks the cursor.
    pub fn capture(&mut self) {
        self.lock = CursorLock::Locked;
        self.visible = false;
    }

    pub fn release(&mut self) {
        self.lock = CursorLock::None;
        self.visible = true;
    }
}
