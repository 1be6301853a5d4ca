//! Networking primitives.
//!
//! Goals:
//! - Provide the ordered per-tick pose stream written by owners and read by
//!   observers.
//! - Provide the envelope used by the host to route a stream to an avatar.
//! - Keep serialization explicit.
//!
//! Pose wire layout, big-endian, 28 bytes:
//!
//! ```text
//! [position.x f32][position.y f32][position.z f32]
//! [rotation.x f32][rotation.y f32][rotation.z f32][rotation.w f32]
//! ```
//!
//! No tick number, sequence or version travels with a sample.

use anyhow::{ensure, Context};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::math::{Pose, Quat, Vec3};

/// Size of an encoded `Vec3`.
pub const VEC3_WIRE_LEN: usize = 12;
/// Size of an encoded `Quat`.
pub const QUAT_WIRE_LEN: usize = 16;
/// Size of one pose sample.
pub const POSE_WIRE_LEN: usize = VEC3_WIRE_LEN + QUAT_WIRE_LEN;

/// Identifies a replicated avatar across peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvatarId(pub u32);

impl std::fmt::Display for AvatarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "avatar#{}", self.0)
    }
}

/// Ordered serialization stream handed to an avatar on each tick.
///
/// A stream is either writing (the owner pushes values) or reading (an
/// observer pulls values in the same order).
#[derive(Debug)]
pub enum PoseStream {
    Writing(BytesMut),
    Reading(Bytes),
}

impl PoseStream {
    pub fn writing() -> Self {
        PoseStream::Writing(BytesMut::with_capacity(POSE_WIRE_LEN))
    }

    pub fn reading(payload: impl Into<Bytes>) -> Self {
        PoseStream::Reading(payload.into())
    }

    pub fn is_writing(&self) -> bool {
        matches!(self, PoseStream::Writing(_))
    }

    pub fn send_vec3(&mut self, v: Vec3) -> anyhow::Result<()> {
        let buf = self.write_buf()?;
        buf.put_f32(v.x);
        buf.put_f32(v.y);
        buf.put_f32(v.z);
        Ok(())
    }

    pub fn send_quat(&mut self, q: Quat) -> anyhow::Result<()> {
        let buf = self.write_buf()?;
        buf.put_f32(q.x);
        buf.put_f32(q.y);
        buf.put_f32(q.z);
        buf.put_f32(q.w);
        Ok(())
    }

    pub fn receive_vec3(&mut self) -> anyhow::Result<Vec3> {
        let buf = self.read_buf()?;
        ensure!(
            buf.remaining() >= VEC3_WIRE_LEN,
            "truncated stream: need {VEC3_WIRE_LEN} bytes for vec3, have {}",
            buf.remaining()
        );
        Ok(Vec3::new(buf.get_f32(), buf.get_f32(), buf.get_f32()))
    }

    pub fn receive_quat(&mut self) -> anyhow::Result<Quat> {
        let buf = self.read_buf()?;
        ensure!(
            buf.remaining() >= QUAT_WIRE_LEN,
            "truncated stream: need {QUAT_WIRE_LEN} bytes for quat, have {}",
            buf.remaining()
        );
        Ok(Quat::from_xyzw(
            buf.get_f32(),
            buf.get_f32(),
            buf.get_f32(),
            buf.get_f32(),
        ))
    }

    /// Bytes not yet consumed by a reader, or written so far by a writer.
    pub fn remaining(&self) -> usize {
        match self {
            PoseStream::Writing(buf) => buf.len(),
            PoseStream::Reading(buf) => buf.remaining(),
        }
    }

    /// Finishes a writing stream and returns its payload.
    pub fn into_payload(self) -> anyhow::Result<Bytes> {
        match self {
            PoseStream::Writing(buf) => Ok(buf.freeze()),
            PoseStream::Reading(_) => anyhow::bail!("stream is reading, has no outgoing payload"),
        }
    }

    fn write_buf(&mut self) -> anyhow::Result<&mut BytesMut> {
        match self {
            PoseStream::Writing(buf) => Ok(buf),
            PoseStream::Reading(_) => anyhow::bail!("cannot send on a reading stream"),
        }
    }

    fn read_buf(&mut self) -> anyhow::Result<&mut Bytes> {
        match self {
            PoseStream::Reading(buf) => Ok(buf),
            PoseStream::Writing(_) => anyhow::bail!("cannot receive on a writing stream"),
        }
    }
}

/// Encodes a pose as one standalone sample.
pub fn encode_pose(pose: &Pose) -> anyhow::Result<Bytes> {
    let mut stream = PoseStream::writing();
    stream.send_vec3(pose.position)?;
    stream.send_quat(pose.rotation)?;
    stream.into_payload()
}

/// Decodes one standalone sample.
pub fn decode_pose(payload: &[u8]) -> anyhow::Result<Pose> {
    let mut stream = PoseStream::reading(Bytes::copy_from_slice(payload));
    let position = stream.receive_vec3().context("decode position")?;
    let rotation = stream.receive_quat().context("decode rotation")?;
    Ok(Pose::new(position, rotation))
}

/// High-level message envelope exchanged between peers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NetMsg {
    /// Serialization tick output of an owned avatar.
    PoseUpdate {
        avatar: AvatarId,
        payload: Vec<u8>,
    },
    /// An owner announces a new avatar so peers can create a replica.
    Spawn { avatar: AvatarId, pose: Pose },
    /// An owner removed its avatar.
    Despawn { avatar: AvatarId },
}

/// Convenience codec helpers.
pub fn encode_to_bytes(msg: &NetMsg) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<NetMsg> {
    serde_json::from_slice(b).context("deserialize")
}
