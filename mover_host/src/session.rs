//! Simulation host.
//!
//! A `Session` stands in for the engine's callback scheduler across several
//! peers living in one process. Each frame it:
//! - drains every peer's inbox (spawns, pose updates, despawns)
//! - runs as many fixed physics steps as the elapsed time covers
//! - runs one render-frame update
//! - on serialization ticks, has every peer send the poses it owns
//!
//! Determinism notes:
//! - Time advances by a fixed frame step, never by wall clock.
//! - Peers are visited in index order; rosters iterate by avatar id.

use std::time::Duration;

use bytes::Bytes;
use mover_client::{
    input::{DeviceInput, InteractionSurfaces, VirtualWidgets},
    PlayerAvatar, Roster,
};
use mover_shared::{
    config::MoverConfig,
    math::{Pose, Vec3},
    net::{AvatarId, NetMsg},
    physics::GroundPlaneMover,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::transport::{LoopbackTransport, Transport};

/// One simulated process: a roster plus its transport endpoint.
pub struct Peer {
    pub name: String,
    cfg: MoverConfig,
    roster: Roster,
    transport: Box<dyn Transport>,
    widgets: VirtualWidgets,
    device: DeviceInput,
}

impl Peer {
    pub fn new(name: impl Into<String>, cfg: MoverConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            roster: Roster::new(&cfg),
            cfg,
            transport,
            widgets: VirtualWidgets::new(),
            device: DeviceInput::default(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Handles to the touch widgets injected into this peer's avatars.
    pub fn widgets(&self) -> &VirtualWidgets {
        &self.widgets
    }

    /// Keyboard/mouse state used for following ticks.
    pub fn set_device(&mut self, device: DeviceInput) {
        self.device = device;
    }

    /// Spawns an avatar owned by this peer, wired to its widgets, and
    /// announces it.
    pub async fn spawn_owned(&mut self, id: AvatarId, pose: Pose) -> anyhow::Result<()> {
        let surfaces = self.widgets.surfaces();
        self.spawn_owned_with(id, pose, surfaces).await
    }

    /// Like `spawn_owned` with explicit surfaces, which may be incomplete.
    pub async fn spawn_owned_with(
        &mut self,
        id: AvatarId,
        pose: Pose,
        surfaces: InteractionSurfaces,
    ) -> anyhow::Result<()> {
        let avatar = PlayerAvatar::local(
            id,
            pose,
            surfaces,
            Box::new(GroundPlaneMover::grounded_at(pose.position.y)),
            &self.cfg,
        );
        self.roster.spawn(avatar)?;
        self.transport.send(&NetMsg::Spawn { avatar: id, pose }).await?;
        info!(peer = %self.name, avatar = %id, "Spawned owned avatar");
        Ok(())
    }

    /// Removes an owned avatar and tells the other peers.
    pub async fn despawn_owned(&mut self, id: AvatarId) -> anyhow::Result<()> {
        if self.roster.remove(id).is_some() {
            self.transport.send(&NetMsg::Despawn { avatar: id }).await?;
            info!(peer = %self.name, avatar = %id, "Despawned owned avatar");
        }
        Ok(())
    }

    /// Applies every pending message. Returns how many were handled.
    pub fn poll_network(&mut self) -> anyhow::Result<usize> {
        let mut handled = 0;
        while let Some(msg) = self.transport.try_recv()? {
            handled += 1;
            self.handle_message(msg);
        }
        Ok(handled)
    }

    fn handle_message(&mut self, msg: NetMsg) {
        match msg {
            NetMsg::Spawn { avatar, pose } => {
                if self.roster.get(avatar).is_some() {
                    debug!(peer = %self.name, avatar = %avatar, "Duplicate spawn ignored");
                    return;
                }
                let replica = PlayerAvatar::remote(avatar, pose, &self.cfg);
                if let Err(e) = self.roster.spawn(replica) {
                    warn!(peer = %self.name, avatar = %avatar, error = %e, "Failed to spawn replica");
                }
            }
            NetMsg::PoseUpdate { avatar, payload } => {
                match self.roster.read_update(avatar, Bytes::from(payload)) {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(peer = %self.name, avatar = %avatar, "Update for unknown avatar dropped");
                    }
                    Err(e) => {
                        warn!(peer = %self.name, avatar = %avatar, error = %e, "Rejected pose update");
                    }
                }
            }
            NetMsg::Despawn { avatar } => {
                if self.roster.remove(avatar).is_some() {
                    debug!(peer = %self.name, avatar = %avatar, "Replica removed");
                }
            }
        }
    }

    pub fn fixed_update(&mut self, dt: f32) {
        self.roster.fixed_update(dt, &self.device);
    }

    pub fn frame_update(&mut self, dt: f32) {
        self.roster.frame_update(dt, &self.device);
        // Key-down events last one frame.
        self.device.escape_pressed = false;
    }

    /// Serialization tick. Returns the number of poses sent.
    pub async fn serialize_tick(&mut self) -> anyhow::Result<usize> {
        let updates = self.roster.write_owned()?;
        let count = updates.len();
        for (avatar, payload) in updates {
            self.transport
                .send(&NetMsg::PoseUpdate {
                    avatar,
                    payload: payload.to_vec(),
                })
                .await?;
        }
        Ok(count)
    }
}

/// Options for building a loopback session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub peers: usize,
    pub drop_rate: f64,
    pub seed: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            peers: 2,
            drop_rate: 0.0,
            seed: 0x5eed,
        }
    }
}

/// Several peers sharing one clock.
pub struct Session {
    cfg: MoverConfig,
    peers: Vec<Peer>,
    elapsed: f64,
    fixed_acc: f32,
    send_acc: f32,
    frames: u64,
    send_ticks: u64,
}

impl Session {
    /// Builds peers connected by a loopback mesh.
    pub fn loopback(cfg: MoverConfig, opts: SessionOptions) -> anyhow::Result<Self> {
        cfg.validate()?;
        anyhow::ensure!(opts.peers > 0, "session needs at least one peer");
        let peers = LoopbackTransport::mesh(opts.peers, opts.drop_rate, opts.seed)
            .into_iter()
            .enumerate()
            .map(|(i, t)| Peer::new(format!("peer{i}"), cfg.clone(), Box::new(t)))
            .collect();
        Ok(Self::with_peers(cfg, peers))
    }

    pub fn with_peers(cfg: MoverConfig, peers: Vec<Peer>) -> Self {
        Self {
            cfg,
            peers,
            elapsed: 0.0,
            fixed_acc: 0.0,
            send_acc: 0.0,
            frames: 0,
            send_ticks: 0,
        }
    }

    pub fn config(&self) -> &MoverConfig {
        &self.cfg
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn peer(&self, i: usize) -> Option<&Peer> {
        self.peers.get(i)
    }

    pub fn peer_mut(&mut self, i: usize) -> Option<&mut Peer> {
        self.peers.get_mut(i)
    }

    /// Simulated seconds since the session began.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn send_ticks(&self) -> u64 {
        self.send_ticks
    }

    /// Spawns one owned avatar per peer, spaced along X, and delivers the
    /// announcements.
    pub async fn spawn_one_per_peer(&mut self) -> anyhow::Result<Vec<AvatarId>> {
        let mut ids = Vec::with_capacity(self.peers.len());
        for (i, peer) in self.peers.iter_mut().enumerate() {
            let id = AvatarId(i as u32 + 1);
            let pose = Pose::at(Vec3::new(i as f32 * 2.0, 0.0, 0.0));
            peer.spawn_owned(id, pose).await?;
            ids.push(id);
        }
        for peer in &mut self.peers {
            peer.poll_network()?;
        }
        Ok(ids)
    }

    /// Advances one render frame.
    pub async fn advance_frame(&mut self) -> anyhow::Result<()> {
        let dt = self.cfg.frame_dt();
        let fixed_dt = self.cfg.fixed_dt();

        for peer in &mut self.peers {
            peer.poll_network()?;
        }

        // One frame never owes more than this many fixed steps; anything
        // beyond is a stalled accumulator and gets dropped.
        let max_steps = self.cfg.fixed_hz.div_ceil(self.cfg.frame_hz.max(1)) + 1;
        let mut steps = 0;
        self.fixed_acc += dt;
        while self.fixed_acc >= fixed_dt {
            if steps == max_steps {
                warn!(backlog = self.fixed_acc, steps, "Fixed-step budget exhausted, dropping backlog");
                self.fixed_acc = 0.0;
                break;
            }
            for peer in &mut self.peers {
                peer.fixed_update(fixed_dt);
            }
            self.fixed_acc -= fixed_dt;
            steps += 1;
        }

        for peer in &mut self.peers {
            peer.frame_update(dt);
        }

        self.send_acc += dt;
        let interval = self.cfg.send_interval();
        if self.send_acc >= interval {
            self.send_acc -= interval;
            for peer in &mut self.peers {
                peer.serialize_tick().await?;
            }
            self.send_ticks += 1;
        }

        self.elapsed += dt as f64;
        self.frames += 1;
        Ok(())
    }

    /// Advances `frames` render frames as fast as possible.
    pub async fn run_frames(&mut self, frames: u64) -> anyhow::Result<()> {
        for _ in 0..frames {
            self.advance_frame().await?;
        }
        Ok(())
    }

    /// Advances in step with the wall clock for `duration`, calling
    /// `before_frame` ahead of each frame.
    pub async fn run_realtime<F>(&mut self, duration: Duration, mut before_frame: F) -> anyhow::Result<()>
    where
        F: FnMut(&mut Session),
    {
        let frame = Duration::from_secs_f32(self.cfg.frame_dt());
        let start = Instant::now();
        let mut next = start;
        while next.duration_since(start) < duration {
            before_frame(self);
            self.advance_frame().await?;
            next += frame;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Distance between each owned avatar and its replicas on other peers.
    pub fn replica_errors(&self) -> Vec<(AvatarId, String, f32)> {
        let mut out = Vec::new();
        for owner in &self.peers {
            for id in owner.roster().local_ids() {
                let Some(authoritative) = owner.roster().get(id).map(|a| a.pose()) else {
                    continue;
                };
                for observer in self.peers.iter().filter(|p| p.name != owner.name) {
                    if let Some(replica) = observer.roster().get(id) {
                        let err = replica.pose().position.distance(authoritative.position);
                        out.push((id, observer.name.clone(), err));
                    }
                }
            }
        }
        out
    }
}
