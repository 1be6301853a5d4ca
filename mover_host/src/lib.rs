//! `mover_host`
//!
//! Host-side systems:
//! - Session clock driving fixed steps, render frames and serialization ticks
//! - Peers, each with its own roster of owned avatars and replicas
//! - Loopback transport between peers
//! - Scripted input for headless runs
//!
//! Networking model:
//! - Owners broadcast `Spawn` / `PoseUpdate` / `Despawn`
//! - Observers create replicas on `Spawn` and feed `PoseUpdate` payloads to
//!   the replica's sync channel

pub mod script;
pub mod session;
pub mod transport;

pub use session::{Peer, Session, SessionOptions};
