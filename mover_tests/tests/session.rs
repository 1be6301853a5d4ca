//! Full host loop over the loopback transport.

use mover_client::input::{CursorLock, DeviceInput, InteractionSurfaces};
use mover_host::{script::InputScript, Session, SessionOptions};
use mover_shared::config::MoverConfig;
use mover_shared::math::{Pose, Vec2, Vec3};
use mover_shared::net::AvatarId;
use mover_tests::init_tracing;

#[tokio::test]
async fn replicas_converge_on_every_observer() -> anyhow::Result<()> {
    init_tracing();
    let opts = SessionOptions {
        peers: 3,
        ..Default::default()
    };
    let mut session = Session::loopback(MoverConfig::default(), opts)?;
    session.spawn_one_per_peer().await?;

    session
        .peer(0)
        .unwrap()
        .widgets()
        .joystick
        .set(Vec2::new(1.0, 0.0));
    session.run_frames(90).await?;
    session.peer(0).unwrap().widgets().joystick.set(Vec2::ZERO);
    session.run_frames(120).await?;

    let errors = session.replica_errors();
    // Three owners, each seen by two observers.
    assert_eq!(errors.len(), 6);
    for (id, observer, err) in errors {
        assert!(err < 0.05, "{id} on {observer} trails by {err}");
    }
    Ok(())
}

#[tokio::test]
async fn lossy_link_still_converges_once_owner_stops() -> anyhow::Result<()> {
    init_tracing();
    let opts = SessionOptions {
        drop_rate: 0.5,
        seed: 42,
        ..Default::default()
    };
    let mut session = Session::loopback(MoverConfig::default(), opts)?;
    // Spawns travel over the same lossy link; resend until peer1 has it.
    session.spawn_one_per_peer().await?;
    let mut attempts = 0;
    while session.peer(1).unwrap().roster().get(AvatarId(1)).is_none() {
        assert!(attempts < 20, "spawn never got through");
        let peer = session.peer_mut(0).unwrap();
        peer.despawn_owned(AvatarId(1)).await?;
        peer.spawn_owned(AvatarId(1), Pose::default()).await?;
        session.advance_frame().await?;
        attempts += 1;
    }

    session
        .peer(0)
        .unwrap()
        .widgets()
        .joystick
        .set(Vec2::new(0.0, 1.0));
    session.run_frames(60).await?;
    session.peer(0).unwrap().widgets().joystick.set(Vec2::ZERO);
    // Ten seconds of still updates at 10 Hz with half of them dropped.
    session.run_frames(600).await?;

    let replica = session
        .peer(1)
        .unwrap()
        .roster()
        .get(AvatarId(1))
        .unwrap()
        .pose();
    let owner = session
        .peer(0)
        .unwrap()
        .roster()
        .get(AvatarId(1))
        .unwrap()
        .pose();
    assert!(replica.position.distance(owner.position) < 0.05);
    Ok(())
}

#[tokio::test]
async fn escape_releases_only_the_owner_cursor() -> anyhow::Result<()> {
    let mut session = Session::loopback(MoverConfig::default(), SessionOptions::default())?;
    session.spawn_one_per_peer().await?;

    session.peer_mut(0).unwrap().set_device(DeviceInput {
        escape_pressed: true,
        ..Default::default()
    });
    session.advance_frame().await?;

    let mine = session.peer(0).unwrap().roster().get(AvatarId(1)).unwrap();
    assert_eq!(mine.cursor().unwrap().lock, CursorLock::None);
    let theirs = session.peer(1).unwrap().roster().get(AvatarId(2)).unwrap();
    assert_eq!(theirs.cursor().unwrap().lock, CursorLock::Locked);
    Ok(())
}

#[tokio::test]
async fn degraded_owner_still_replicates_its_spawn_pose() -> anyhow::Result<()> {
    let mut session = Session::loopback(MoverConfig::default(), SessionOptions::default())?;
    let spawn = Pose::at(Vec3::new(-3.0, 0.0, 4.0));
    session
        .peer_mut(0)
        .unwrap()
        .spawn_owned_with(AvatarId(7), spawn, InteractionSurfaces::none())
        .await?;
    session.peer(0).unwrap().widgets().joystick.set(Vec2::new(1.0, 1.0));
    session.run_frames(60).await?;

    let owner = session.peer(0).unwrap().roster().get(AvatarId(7)).unwrap();
    assert!(owner.is_degraded());
    assert_eq!(owner.pose(), spawn);
    let replica = session.peer(1).unwrap().roster().get(AvatarId(7)).unwrap();
    assert_eq!(replica.replication_target(), Some(spawn));
    Ok(())
}

#[tokio::test]
async fn demo_script_moves_the_scripted_owner() -> anyhow::Result<()> {
    let cfg = MoverConfig::default();
    let mut session = Session::loopback(cfg.clone(), SessionOptions::default())?;
    session.spawn_one_per_peer().await?;
    let script = InputScript::demo();

    for _ in 0..(cfg.frame_hz * 4) {
        let t = session.elapsed() as f32;
        let peer = session.peer_mut(0).unwrap();
        let device = script.apply(t, peer.widgets());
        peer.set_device(device);
        session.advance_frame().await?;
    }

    let owner = session.peer(0).unwrap().roster().get(AvatarId(1)).unwrap();
    assert!(owner.pose().position.z > 5.0);
    assert!(owner.pose().position.x > 0.0, "turned right while walking");
    let still = session.peer(1).unwrap().roster().get(AvatarId(2)).unwrap();
    assert_eq!(still.pose().position, Vec3::new(2.0, 0.0, 0.0));
    Ok(())
}
