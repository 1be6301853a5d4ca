//! Shared fixtures for the integration tests.

use mover_client::{input::VirtualWidgets, PlayerAvatar};
use mover_shared::{
    config::MoverConfig,
    math::Pose,
    net::AvatarId,
    physics::{CharacterMover, GroundPlaneMover},
};

/// Installs a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Owned avatar wired to `widgets`, standing on the ground at its spawn
/// height.
pub fn local_avatar(id: u32, pose: Pose, widgets: &VirtualWidgets) -> PlayerAvatar {
    let mover = GroundPlaneMover::grounded_at(pose.position.y);
    local_avatar_with(id, pose, widgets, Box::new(mover))
}

pub fn local_avatar_with(
    id: u32,
    pose: Pose,
    widgets: &VirtualWidgets,
    mover: Box<dyn CharacterMover>,
) -> PlayerAvatar {
    PlayerAvatar::local(
        AvatarId(id),
        pose,
        widgets.surfaces(),
        mover,
        &MoverConfig::default(),
    )
}

pub fn remote_avatar(id: u32, pose: Pose) -> PlayerAvatar {
    PlayerAvatar::remote(AvatarId(id), pose, &MoverConfig::default())
}
