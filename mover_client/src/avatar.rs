//! Player avatar.
//!
//! One avatar per player per process. Exactly one process holds the
//! `Authority::Local` instance of a given avatar; every other process holds
//! a `Authority::Remote` replica.
//!
//! Lifecycle, driven by the host loop:
//! - `local` / `remote`: construction (cursor, camera, surfaces).
//! - `start`: once, before the first update (layers, replicator target).
//! - `fixed_update`: every physics step, moves local avatars.
//! - `frame_update`: every render frame, eases remote avatars.
//! - `serialize`: every serialization tick, writes or reads the pose.

use mover_shared::{
    config::MoverConfig,
    math::Pose,
    net::{AvatarId, PoseStream},
    physics::CharacterMover,
    scene::{NodeId, RenderLayers, SceneGraph},
};
use tracing::{debug, error, warn};

use crate::{
    animator::Animator,
    camera::CameraRig,
    controller::LocalController,
    input::{BoundSurfaces, CursorState, DeviceInput, InteractionSurfaces, MissingSurface},
    interp::RemoteReplicator,
    sync::{SyncChannel, SyncRole},
};

/// Who moves this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Moved from input in this process.
    Local,
    /// Rendered from received samples.
    Remote,
}

/// Name tag floating above an avatar, facing its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameTag {
    pub node: NodeId,
    pub target: Option<AvatarId>,
}

/// Renderable parts of an avatar.
#[derive(Debug, Clone)]
pub struct AvatarParts {
    pub scene: SceneGraph,
    pub body: NodeId,
    pub weapon: NodeId,
    pub name_tag: NodeId,
}

impl Default for AvatarParts {
    fn default() -> Self {
        let mut scene = SceneGraph::new();
        let body = scene.add_root("body");
        scene.add_child(body, "head");
        scene.add_child(body, "torso");
        let weapon = scene.add_root("weapon");
        scene.add_child(weapon, "barrel");
        let name_tag = scene.add_root("name_tag");
        scene.move_to_layer(name_tag, RenderLayers::NAME_TAG);
        Self {
            scene,
            body,
            weapon,
            name_tag,
        }
    }
}

struct LocalRole {
    surfaces: Option<BoundSurfaces>,
    missing: Vec<MissingSurface>,
    mover: Box<dyn CharacterMover>,
    controller: LocalController,
    cursor: CursorState,
}

enum Role {
    Local(Box<LocalRole>),
    Remote(RemoteReplicator),
}

pub struct PlayerAvatar {
    id: AvatarId,
    pose: Pose,
    camera: CameraRig,
    animator: Animator,
    parts: AvatarParts,
    name_tag: NameTag,
    sync: SyncChannel,
    role: Role,
    started: bool,
}

impl std::fmt::Debug for PlayerAvatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerAvatar")
            .field("id", &self.id)
            .field("authority", &self.authority())
            .field("pose", &self.pose)
            .field("started", &self.started)
            .finish()
    }
}

impl PlayerAvatar {
    /// Creates the owned instance. Missing surfaces are logged and leave
    /// the avatar unable to move.
    pub fn local(
        id: AvatarId,
        pose: Pose,
        surfaces: InteractionSurfaces,
        mover: Box<dyn CharacterMover>,
        cfg: &MoverConfig,
    ) -> Self {
        let (surfaces, missing) = match surfaces.bind() {
            Ok(bound) => (Some(bound), Vec::new()),
            Err(missing) => {
                for m in &missing {
                    error!(avatar = %id, "{m}");
                }
                (None, missing)
            }
        };

        let mut cursor = CursorState::default();
        cursor.capture();

        let mut camera = CameraRig::new(cfg.pitch_limit_deg);
        camera.active = true;

        let role = Role::Local(Box::new(LocalRole {
            surfaces,
            missing,
            mover,
            controller: LocalController::new(cfg),
            cursor,
        }));
        Self::with_role(id, pose, camera, role, Authority::Local)
    }

    /// Creates a replica of an avatar owned elsewhere.
    pub fn remote(id: AvatarId, pose: Pose, cfg: &MoverConfig) -> Self {
        let camera = CameraRig::new(cfg.pitch_limit_deg);
        let role = Role::Remote(RemoteReplicator::new(pose, cfg.smoothing));
        Self::with_role(id, pose, camera, role, Authority::Remote)
    }

    fn with_role(
        id: AvatarId,
        pose: Pose,
        camera: CameraRig,
        role: Role,
        authority: Authority,
    ) -> Self {
        let parts = AvatarParts::default();
        let name_tag = NameTag {
            node: parts.name_tag,
            target: None,
        };
        Self {
            id,
            pose,
            camera,
            animator: Animator::new(),
            parts,
            name_tag,
            sync: SyncChannel::new(SyncRole::from(authority)),
            role,
            started: false,
        }
    }

    pub fn id(&self) -> AvatarId {
        self.id
    }

    pub fn authority(&self) -> Authority {
        match self.role {
            Role::Local(_) => Authority::Local,
            Role::Remote(_) => Authority::Remote,
        }
    }

    pub fn is_local(&self) -> bool {
        self.authority() == Authority::Local
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn parts(&self) -> &AvatarParts {
        &self.parts
    }

    pub fn name_tag(&self) -> &NameTag {
        &self.name_tag
    }

    pub fn set_name_tag_target(&mut self, target: Option<AvatarId>) {
        self.name_tag.target = target;
    }

    pub fn sync(&self) -> &SyncChannel {
        &self.sync
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Cursor state; remote replicas have none.
    pub fn cursor(&self) -> Option<CursorState> {
        match &self.role {
            Role::Local(local) => Some(local.cursor),
            Role::Remote(_) => None,
        }
    }

    /// Vertical velocity of a local avatar.
    pub fn vertical_velocity(&self) -> Option<f32> {
        match &self.role {
            Role::Local(local) => Some(local.controller.vertical_velocity()),
            Role::Remote(_) => None,
        }
    }

    pub fn is_grounded(&self) -> Option<bool> {
        match &self.role {
            Role::Local(local) => Some(local.mover.is_grounded()),
            Role::Remote(_) => None,
        }
    }

    /// True for a local avatar built without its full set of surfaces.
    pub fn is_degraded(&self) -> bool {
        matches!(&self.role, Role::Local(local) if local.surfaces.is_none())
    }

    /// Surfaces still missing; empty for replicas and healthy avatars.
    pub fn missing_surfaces(&self) -> &[MissingSurface] {
        match &self.role {
            Role::Local(local) => &local.missing,
            Role::Remote(_) => &[],
        }
    }

    /// Last received sample of a replica.
    pub fn replication_target(&self) -> Option<Pose> {
        match &self.role {
            Role::Remote(rep) => Some(rep.target()),
            Role::Local(_) => None,
        }
    }

    /// First-frame setup. Name tags are bound by the roster afterwards.
    pub fn start(&mut self) {
        if self.started {
            warn!(avatar = %self.id, "start called twice, ignoring");
            return;
        }
        self.started = true;

        match &mut self.role {
            Role::Local(_) => {
                let scene = &mut self.parts.scene;
                let hidden = scene.move_to_layer(self.parts.weapon, RenderLayers::HIDDEN)
                    + scene.move_to_layer(self.parts.body, RenderLayers::HIDDEN);
                debug!(avatar = %self.id, nodes = hidden, "Hid own body from own camera");
            }
            Role::Remote(rep) => {
                rep.reset(self.pose);
            }
        }
    }

    /// Per-frame update.
    pub fn frame_update(&mut self, dt: f32, device: &DeviceInput) {
        match &mut self.role {
            Role::Remote(rep) => rep.step(&mut self.pose, dt),
            Role::Local(local) => {
                if device.escape_pressed {
                    local.cursor.release();
                    debug!(avatar = %self.id, "Cursor released");
                }
            }
        }
    }

    /// Per-physics-step update. Does nothing for replicas or for a local
    /// avatar missing any surface.
    pub fn fixed_update(&mut self, dt: f32, device: &DeviceInput) {
        let Role::Local(local) = &mut self.role else {
            return;
        };
        let Some(surfaces) = &local.surfaces else {
            return;
        };

        let input = surfaces.sample(device);
        local.controller.step(
            &mut self.pose,
            &mut self.camera,
            &mut self.animator,
            local.mover.as_mut(),
            &input,
            dt,
        );
    }

    /// Serialization tick: the owner writes its pose, a replica reads a new
    /// target. A failed read keeps the previous target.
    pub fn serialize(&mut self, stream: &mut PoseStream) -> anyhow::Result<()> {
        match &mut self.role {
            Role::Local(_) => self.sync.write(&self.pose, stream),
            Role::Remote(rep) => {
                let sample = self.sync.read(stream)?;
                rep.set_target(sample);
                Ok(())
            }
        }
    }
}
