//! Configuration system.
//!
//! Loads mover configuration from JSON strings or files. Every field has a
//! default, so an empty object `{}` is a valid config.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Upper bound for every tick rate.
pub const MAX_RATE_HZ: u32 = 10_000;

/// Root configuration shared by avatars and the host loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoverConfig {
    /// Move speed while grounded.
    pub ground_speed: f32,
    /// Move speed while airborne.
    pub air_speed: f32,
    /// Vertical velocity applied on jump.
    pub jump_speed: f32,
    /// Downward acceleration while airborne.
    pub gravity: f32,
    /// Replicator smoothing rate.
    pub smoothing: f32,
    /// Physics steps per second.
    pub fixed_hz: u32,
    /// Render frames per second.
    pub frame_hz: u32,
    /// Serialization ticks per second.
    pub send_rate_hz: u32,
    /// Optional camera pitch clamp in degrees. `None` leaves pitch free.
    pub pitch_limit_deg: Option<f32>,
    /// Bind name tags of players registered after start.
    pub bind_late_joiners: bool,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            ground_speed: 5.0,
            air_speed: 2.5,
            jump_speed: 5.0,
            gravity: 9.8,
            smoothing: 10.0,
            fixed_hz: 50,
            frame_hz: 60,
            send_rate_hz: 10,
            pitch_limit_deg: None,
            bind_late_joiners: false,
        }
    }
}

impl MoverConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_json_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects rates that would stall the host loop and limits the camera
    /// could not clamp to.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, hz) in [
            ("fixed_hz", self.fixed_hz),
            ("frame_hz", self.frame_hz),
            ("send_rate_hz", self.send_rate_hz),
        ] {
            anyhow::ensure!(
                (1..=MAX_RATE_HZ).contains(&hz),
                "{name} must be in 1..={MAX_RATE_HZ}, got {hz}"
            );
        }
        anyhow::ensure!(self.smoothing >= 0.0, "smoothing must not be negative");
        anyhow::ensure!(
            self.pitch_limit_deg.map_or(true, |l| l.is_finite() && l >= 0.0),
            "pitch_limit_deg must be finite and non-negative"
        );
        Ok(())
    }

    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.fixed_hz as f32
    }

    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frame_hz as f32
    }

    pub fn send_interval(&self) -> f32 {
        1.0 / self.send_rate_hz as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = MoverConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, MoverConfig::default());
        assert_eq!(cfg.ground_speed, 5.0);
        assert_eq!(cfg.pitch_limit_deg, None);
    }

    #[test]
    fn partial_override() {
        let cfg = MoverConfig::from_json_str(r#"{"smoothing": 4.0, "pitch_limit_deg": 80.0}"#)
            .unwrap();
        assert_eq!(cfg.smoothing, 4.0);
        assert_eq!(cfg.pitch_limit_deg, Some(80.0));
        assert_eq!(cfg.gravity, 9.8);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let cfg = MoverConfig {
            send_rate_hz: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn absurd_rates_are_rejected() {
        for json in [
            r#"{"fixed_hz": 4294967295}"#,
            r#"{"frame_hz": 10001}"#,
            r#"{"send_rate_hz": 1000000}"#,
        ] {
            let cfg = MoverConfig::from_json_str(json).unwrap();
            assert!(cfg.validate().is_err(), "{json} accepted");
        }
        let edge = MoverConfig {
            fixed_hz: MAX_RATE_HZ,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn bad_pitch_limit_is_rejected() {
        let cfg = MoverConfig::from_json_str(r#"{"pitch_limit_deg": -80.0}"#).unwrap();
        assert!(cfg.validate().is_err());
        let nan = MoverConfig {
            pitch_limit_deg: Some(f32::NAN),
            ..Default::default()
        };
        assert!(nan.validate().is_err());
        let zero = MoverConfig {
            pitch_limit_deg: Some(0.0),
            ..Default::default()
        };
        assert!(zero.validate().is_ok());
    }
}
