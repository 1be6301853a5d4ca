//! Pose sync channel.
//!
//! The role is fixed when the avatar is created: the owner writes its pose
//! every serialization tick, observers read it. Values always travel in the
//! order position, rotation.

use anyhow::Context;
use mover_shared::{math::Pose, net::PoseStream};

use crate::avatar::Authority;

/// Direction of the sync channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRole {
    Writer,
    Reader,
}

impl From<Authority> for SyncRole {
    fn from(a: Authority) -> Self {
        match a {
            Authority::Local => SyncRole::Writer,
            Authority::Remote => SyncRole::Reader,
        }
    }
}

/// Per-avatar sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncChannel {
    role: SyncRole,
    ticks: u64,
}

impl SyncChannel {
    pub fn new(role: SyncRole) -> Self {
        Self { role, ticks: 0 }
    }

    pub fn role(&self) -> SyncRole {
        self.role
    }

    /// Serialization ticks handled so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Pushes position then rotation.
    pub fn write(&mut self, pose: &Pose, stream: &mut PoseStream) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.role == SyncRole::Writer,
            "reader channel cannot write a pose"
        );
        anyhow::ensure!(stream.is_writing(), "writer channel given a reading stream");
        stream.send_vec3(pose.position)?;
        stream.send_quat(pose.rotation)?;
        self.ticks += 1;
        Ok(())
    }

    /// Pulls position then rotation. Nothing is committed unless both
    /// values decode.
    pub fn read(&mut self, stream: &mut PoseStream) -> anyhow::Result<Pose> {
        anyhow::ensure!(
            self.role == SyncRole::Reader,
            "writer channel cannot read a pose"
        );
        anyhow::ensure!(!stream.is_writing(), "reader channel given a writing stream");
        let position = stream.receive_vec3().context("receive position")?;
        let rotation = stream.receive_quat().context("receive rotation")?;
        self.ticks += 1;
        Ok(Pose::new(position, rotation))
    }
}
