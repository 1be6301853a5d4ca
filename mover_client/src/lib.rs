//! `mover_client`
//!
//! Player avatar systems:
//! - Input surfaces (virtual joystick, jump button, touch field) and
//!   keyboard/mouse snapshots
//! - Local character controller (walk, jump, gravity, look)
//! - Remote replicator easing replicas toward received samples
//! - Pose sync channel (owner writes, observers read)
//! - Roster with one-shot name-tag binding

pub mod animator;
pub mod avatar;
pub mod camera;
pub mod controller;
pub mod input;
pub mod interp;
pub mod roster;
pub mod sync;

pub use avatar::{Authority, PlayerAvatar};
pub use roster::Roster;
