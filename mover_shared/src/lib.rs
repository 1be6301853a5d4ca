//! `mover_shared`
//!
//! Shared libraries used by the avatar crate and the host.
//!
//! Design goals:
//! - Deterministic and modular where practical.
//! - Clear separation of concerns (math, net, physics, scene, config).
//! - Traits for abstraction and dependency injection.
//! - No `unsafe`.

pub mod config;
pub mod math;
pub mod net;
pub mod physics;
pub mod scene;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::physics::*;
    pub use crate::scene::*;
}
