//! Owner → stream → replica, without the host loop.

use mover_client::input::{DeviceInput, VirtualWidgets};
use mover_client::interp::smoothing_factor;
use mover_client::{Authority, PlayerAvatar};
use mover_shared::math::{Pose, Quat, Vec2, Vec3};
use mover_shared::net::{PoseStream, POSE_WIRE_LEN};
use mover_tests::{local_avatar, remote_avatar};

/// Runs one serialization tick from `owner` into `replica`.
fn sync(owner: &mut PlayerAvatar, replica: &mut PlayerAvatar) -> anyhow::Result<()> {
    let mut out = PoseStream::writing();
    owner.serialize(&mut out)?;
    let payload = out.into_payload()?;
    assert_eq!(payload.len(), POSE_WIRE_LEN);
    replica.serialize(&mut PoseStream::reading(payload))
}

#[test]
fn written_pose_is_read_back_identically() -> anyhow::Result<()> {
    let widgets = VirtualWidgets::new();
    let start = Pose::new(Vec3::new(1.25, 0.0, -7.5), Quat::from_rotation_y(2.0));
    let mut owner = local_avatar(1, start, &widgets);
    let mut replica = remote_avatar(1, Pose::default());
    owner.start();
    replica.start();

    sync(&mut owner, &mut replica)?;
    assert_eq!(replica.replication_target(), Some(owner.pose()));
    Ok(())
}

#[test]
fn remote_frame_matches_exponential_blend() -> anyhow::Result<()> {
    let widgets = VirtualWidgets::new();
    let mut owner = local_avatar(1, Pose::at(Vec3::new(10.0, 0.0, 0.0)), &widgets);
    let mut replica = remote_avatar(1, Pose::default());
    owner.start();
    replica.start();
    sync(&mut owner, &mut replica)?;

    let dt = 1.0 / 60.0;
    let target = owner.pose().position;
    for _ in 0..30 {
        let prev = replica.pose().position;
        replica.frame_update(dt, &DeviceInput::default());
        let expected = prev.lerp(target, smoothing_factor(10.0, dt));
        assert!(replica.pose().position.distance(expected) < 1e-5);
        assert!(replica.pose().position.x <= target.x);
    }
    Ok(())
}

#[test]
fn replica_rotation_eases_toward_sample() -> anyhow::Result<()> {
    let widgets = VirtualWidgets::new();
    let turned = Pose::new(Vec3::ZERO, Quat::from_rotation_y(1.2));
    let mut owner = local_avatar(1, turned, &widgets);
    let mut replica = remote_avatar(1, Pose::default());
    owner.start();
    replica.start();
    sync(&mut owner, &mut replica)?;

    let mut prev = replica.pose().rotation.angle_between(turned.rotation);
    for _ in 0..120 {
        replica.frame_update(1.0 / 60.0, &DeviceInput::default());
        let now = replica.pose().rotation.angle_between(turned.rotation);
        assert!(now <= prev + 1e-3);
        prev = now;
    }
    assert!(prev < 1e-2);
    Ok(())
}

#[test]
fn owner_and_replica_never_write_each_other() -> anyhow::Result<()> {
    let widgets = VirtualWidgets::new();
    widgets.joystick.set(Vec2::new(0.0, 1.0));
    let mut a = local_avatar(1, Pose::default(), &widgets);
    let mut b = remote_avatar(2, Pose::at(Vec3::new(5.0, 0.0, 5.0)));
    a.start();
    b.start();
    assert_eq!(a.authority(), Authority::Local);
    assert_eq!(b.authority(), Authority::Remote);

    let b_before = b.pose();
    for _ in 0..10 {
        a.fixed_update(0.02, &DeviceInput::default());
        b.fixed_update(0.02, &DeviceInput::default());
    }
    assert_eq!(b.pose(), b_before, "controller moved a replica");

    let a_before = a.pose();
    for _ in 0..10 {
        a.frame_update(1.0 / 60.0, &DeviceInput::default());
        b.frame_update(1.0 / 60.0, &DeviceInput::default());
    }
    assert_eq!(a.pose(), a_before, "replicator moved an owner");

    // Streams in the wrong direction are refused by both.
    let mut reading = PoseStream::reading(vec![0u8; POSE_WIRE_LEN]);
    assert!(a.serialize(&mut reading).is_err());
    assert_eq!(a.pose(), a_before);
    assert!(b.serialize(&mut PoseStream::writing()).is_err());
    Ok(())
}

#[test]
fn stale_sample_overwrites_fresher_one() -> anyhow::Result<()> {
    let widgets = VirtualWidgets::new();
    widgets.joystick.set(Vec2::new(0.0, 1.0));
    let mut owner = local_avatar(1, Pose::default(), &widgets);
    owner.start();

    let mut first = PoseStream::writing();
    owner.serialize(&mut first)?;
    for _ in 0..25 {
        owner.fixed_update(0.02, &DeviceInput::default());
    }
    let mut second = PoseStream::writing();
    owner.serialize(&mut second)?;

    let mut replica = remote_avatar(1, Pose::default());
    replica.start();
    replica.serialize(&mut PoseStream::reading(second.into_payload()?))?;
    replica.serialize(&mut PoseStream::reading(first.into_payload()?))?;

    // No sequencing: the late arrival wins even though it is older.
    assert_eq!(replica.replication_target(), Some(Pose::default()));
    Ok(())
}
