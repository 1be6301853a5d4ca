//! Avatar roster.
//!
//! Every process keeps one roster of all players it knows about: its own
//! avatar plus replicas of everyone else's. The roster is where avatars see
//! each other, which is what name-tag binding needs.
//!
//! Binding happens once, when an avatar starts:
//! - a local avatar points every known player's name tag at itself;
//! - a replica copies the name-tag target of the first other player.
//!
//! Players registered afterwards are left unbound unless
//! `MoverConfig::bind_late_joiners` is set.

use std::collections::BTreeMap;

use anyhow::bail;
use bytes::Bytes;
use mover_shared::{
    config::MoverConfig,
    net::{AvatarId, PoseStream},
};
use tracing::{debug, info};

use crate::{avatar::PlayerAvatar, input::DeviceInput};

#[derive(Debug, Default)]
pub struct Roster {
    avatars: BTreeMap<AvatarId, PlayerAvatar>,
    bind_late_joiners: bool,
}

impl Roster {
    pub fn new(cfg: &MoverConfig) -> Self {
        Self {
            avatars: BTreeMap::new(),
            bind_late_joiners: cfg.bind_late_joiners,
        }
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }

    pub fn get(&self, id: AvatarId) -> Option<&PlayerAvatar> {
        self.avatars.get(&id)
    }

    pub fn get_mut(&mut self, id: AvatarId) -> Option<&mut PlayerAvatar> {
        self.avatars.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerAvatar> {
        self.avatars.values()
    }

    /// Ids of avatars this process owns.
    pub fn local_ids(&self) -> Vec<AvatarId> {
        self.avatars
            .values()
            .filter(|a| a.is_local())
            .map(|a| a.id())
            .collect()
    }

    /// Registers an avatar without starting it.
    pub fn insert(&mut self, avatar: PlayerAvatar) -> anyhow::Result<()> {
        let id = avatar.id();
        if self.avatars.contains_key(&id) {
            bail!("{id} already registered");
        }
        self.avatars.insert(id, avatar);
        Ok(())
    }

    /// Registers and starts an avatar in one go.
    pub fn spawn(&mut self, avatar: PlayerAvatar) -> anyhow::Result<()> {
        let id = avatar.id();
        self.insert(avatar)?;
        self.start(id)?;
        if self.bind_late_joiners {
            self.bind_late_joiner(id);
        }
        info!(avatar = %id, players = self.avatars.len(), "Avatar spawned");
        Ok(())
    }

    /// Runs an avatar's first-frame setup followed by name-tag binding.
    pub fn start(&mut self, id: AvatarId) -> anyhow::Result<()> {
        let Some(avatar) = self.avatars.get_mut(&id) else {
            bail!("{id} not registered");
        };
        if avatar.is_started() {
            return Ok(());
        }
        avatar.start();

        if avatar.is_local() {
            for other in self.avatars.values_mut() {
                other.set_name_tag_target(Some(id));
            }
            debug!(avatar = %id, players = self.avatars.len(), "Bound name tags to local avatar");
        } else {
            let inherited = self
                .avatars
                .values()
                .find(|a| a.id() != id)
                .map(|a| a.name_tag().target);
            if let Some(target) = inherited {
                if let Some(avatar) = self.avatars.get_mut(&id) {
                    avatar.set_name_tag_target(target);
                }
                debug!(avatar = %id, target = ?target, "Copied name-tag target");
            }
        }
        Ok(())
    }

    /// Points a newcomer's name tag at the first started local avatar.
    fn bind_late_joiner(&mut self, id: AvatarId) {
        let local = self
            .avatars
            .values()
            .find(|a| a.is_local() && a.is_started() && a.id() != id)
            .map(|a| a.id());
        if let (Some(local), Some(avatar)) = (local, self.avatars.get_mut(&id)) {
            avatar.set_name_tag_target(Some(local));
        }
    }

    pub fn remove(&mut self, id: AvatarId) -> Option<PlayerAvatar> {
        self.avatars.remove(&id)
    }

    pub fn fixed_update(&mut self, dt: f32, device: &DeviceInput) {
        for avatar in self.avatars.values_mut() {
            avatar.fixed_update(dt, device);
        }
    }

    pub fn frame_update(&mut self, dt: f32, device: &DeviceInput) {
        for avatar in self.avatars.values_mut() {
            avatar.frame_update(dt, device);
        }
    }

    /// Serializes every owned avatar. Returns one payload per avatar.
    pub fn write_owned(&mut self) -> anyhow::Result<Vec<(AvatarId, Bytes)>> {
        let mut out = Vec::new();
        for avatar in self.avatars.values_mut().filter(|a| a.is_local()) {
            let mut stream = PoseStream::writing();
            avatar.serialize(&mut stream)?;
            out.push((avatar.id(), stream.into_payload()?));
        }
        Ok(out)
    }

    /// Feeds a received payload to the matching replica. Returns `false`
    /// when no avatar with that id is registered.
    pub fn read_update(&mut self, id: AvatarId, payload: Bytes) -> anyhow::Result<bool> {
        let Some(avatar) = self.avatars.get_mut(&id) else {
            return Ok(false);
        };
        if avatar.is_local() {
            bail!("{id} is owned here, refusing remote update");
        }
        avatar.serialize(&mut PoseStream::reading(payload))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use mover_shared::{
        math::{Pose, Vec3},
        net::encode_pose,
        physics::GroundPlaneMover,
    };

    use super::*;
    use crate::input::VirtualWidgets;

    fn local(id: u32) -> PlayerAvatar {
        PlayerAvatar::local(
            AvatarId(id),
            Pose::default(),
            VirtualWidgets::new().surfaces(),
            Box::new(GroundPlaneMover::default()),
            &MoverConfig::default(),
        )
    }

    fn remote(id: u32) -> PlayerAvatar {
        PlayerAvatar::remote(AvatarId(id), Pose::default(), &MoverConfig::default())
    }

    #[test]
    fn local_start_binds_every_known_tag_to_itself() {
        let mut roster = Roster::new(&MoverConfig::default());
        roster.insert(remote(2)).unwrap();
        roster.insert(remote(3)).unwrap();
        roster.insert(local(1)).unwrap();
        roster.start(AvatarId(1)).unwrap();

        for a in roster.iter() {
            assert_eq!(a.name_tag().target, Some(AvatarId(1)));
        }
    }

    #[test]
    fn remote_start_copies_first_other_target() {
        let mut roster = Roster::new(&MoverConfig::default());
        roster.spawn(local(1)).unwrap();
        roster.spawn(remote(5)).unwrap();
        assert_eq!(
            roster.get(AvatarId(5)).unwrap().name_tag().target,
            Some(AvatarId(1))
        );
    }

    #[test]
    fn late_joiner_stays_unbound_by_default() {
        let mut roster = Roster::new(&MoverConfig::default());
        roster.spawn(remote(0)).unwrap();
        roster.spawn(local(1)).unwrap();
        assert_eq!(
            roster.get(AvatarId(0)).unwrap().name_tag().target,
            Some(AvatarId(1))
        );

        // The local avatar's binding never reruns, so a newcomer only gets
        // whatever its first other player carries.
        roster.get_mut(AvatarId(0)).unwrap().set_name_tag_target(None);
        roster.spawn(remote(8)).unwrap();
        assert_eq!(roster.get(AvatarId(8)).unwrap().name_tag().target, None);
    }

    #[test]
    fn late_joiner_binding_is_opt_in() {
        let cfg = MoverConfig {
            bind_late_joiners: true,
            ..Default::default()
        };
        let mut roster = Roster::new(&cfg);
        roster.spawn(remote(0)).unwrap();
        roster.spawn(local(1)).unwrap();
        roster.get_mut(AvatarId(0)).unwrap().set_name_tag_target(None);
        // First other player of 8 is 0, now unbound; late binding fixes it.
        roster.spawn(remote(8)).unwrap();
        assert_eq!(
            roster.get(AvatarId(8)).unwrap().name_tag().target,
            Some(AvatarId(1))
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut roster = Roster::new(&MoverConfig::default());
        roster.insert(remote(1)).unwrap();
        assert!(roster.insert(remote(1)).is_err());
    }

    #[test]
    fn updates_route_to_replicas_only() {
        let mut roster = Roster::new(&MoverConfig::default());
        roster.spawn(local(1)).unwrap();
        roster.spawn(remote(2)).unwrap();

        let sample = Pose::at(Vec3::new(4.0, 0.0, 0.0));
        let payload = encode_pose(&sample).unwrap();
        assert!(roster.read_update(AvatarId(2), payload.clone()).unwrap());
        assert!(!roster.read_update(AvatarId(42), payload.clone()).unwrap());
        assert!(roster.read_update(AvatarId(1), payload).is_err());
        assert_eq!(roster.get(AvatarId(1)).unwrap().pose(), Pose::default());
    }

    #[test]
    fn write_owned_skips_replicas() {
        let mut roster = Roster::new(&MoverConfig::default());
        roster.spawn(local(1)).unwrap();
        roster.spawn(remote(2)).unwrap();
        let out = roster.write_owned().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, AvatarId(1));
    }
}
