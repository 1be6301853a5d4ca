//! Scripted input.
//!
//! Headless runs have no keyboard or touch screen, so the host replays a
//! timeline of input states onto a peer's virtual widgets and device
//! snapshot. Scripts are JSON arrays of steps sorted by `at`.

use std::path::Path;

use anyhow::Context;
use mover_client::input::{DeviceInput, VirtualWidgets};
use mover_shared::math::Vec2;
use serde::{Deserialize, Serialize};

/// Input held from `at` seconds until the next step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptStep {
    pub at: f32,
    pub stick: Vec2,
    pub jump_button: bool,
    pub touch: Vec2,
    pub device: DeviceInput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputScript {
    steps: Vec<ScriptStep>,
}

impl InputScript {
    pub fn new(mut steps: Vec<ScriptStep>) -> Self {
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { steps }
    }

    /// Walk forward, jump, turn right while walking, then stop.
    pub fn demo() -> Self {
        Self::new(vec![
            ScriptStep {
                at: 0.0,
                stick: Vec2::new(0.0, 1.0),
                ..Default::default()
            },
            ScriptStep {
                at: 1.0,
                stick: Vec2::new(0.0, 1.0),
                jump_button: true,
                ..Default::default()
            },
            ScriptStep {
                at: 1.1,
                stick: Vec2::new(0.0, 1.0),
                ..Default::default()
            },
            ScriptStep {
                at: 2.0,
                stick: Vec2::new(0.0, 1.0),
                touch: Vec2::new(1.5, 0.0),
                device: DeviceInput {
                    run_held: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            ScriptStep {
                at: 3.0,
                ..Default::default()
            },
        ])
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        let steps: Vec<ScriptStep> = serde_json::from_str(s)?;
        Ok(Self::new(steps))
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read script {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse script {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step active at time `t`, if the script has started.
    pub fn at(&self, t: f32) -> Option<&ScriptStep> {
        self.steps.iter().rev().find(|s| s.at <= t)
    }

    /// Applies the step active at `t` to widgets and returns the device
    /// snapshot for the tick.
    pub fn apply(&self, t: f32, widgets: &VirtualWidgets) -> DeviceInput {
        let step = self.at(t).copied().unwrap_or_default();
        widgets.joystick.set(step.stick);
        widgets.jump_button.set_pressed(step.jump_button);
        widgets.touch_field.set(step.touch);
        step.device
    }
}
