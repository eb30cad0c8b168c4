//! The snapshot aggregate — one complete save payload.
//!
//! FIELD ORDER IS THE SERIALIZATION ORDER (fixed, never reordered):
//!   Meta → PlayerCharacter → GSM → Ability → SkillTree → Inventory
//!   → Missions → Music → FX
//! New slices are appended at the end only. See `SliceKind`.
//!
//! A snapshot is transient: built fresh for each save, or decoded fresh
//! for each load and consumed by the applier. It is never cached.

use crate::{
    slices::*,
    types::{ProfileId, SliceKind},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAggregate {
    pub profile_id:       ProfileId,
    pub meta:             ProfileMetadata,
    pub player_character: CharacterStateData,
    pub gsm:              GsmProfileData,
    pub ability:          AbilityProfileData,
    pub skill_tree:       SkillTreeProfileData,
    pub inventory:        InventoryProfileData,
    pub missions:         MissionProfileData,
    pub music:            MusicProfileData,
    pub fx:               FxProfileData,
}

impl SnapshotAggregate {
    /// An empty snapshot: every slice at its default value.
    pub fn empty(profile_id: ProfileId) -> Self {
        Self {
            profile_id,
            meta:             ProfileMetadata::default(),
            player_character: CharacterStateData::default(),
            gsm:              GsmProfileData::default(),
            ability:          AbilityProfileData::default(),
            skill_tree:       SkillTreeProfileData::default(),
            inventory:        InventoryProfileData::default(),
            missions:         MissionProfileData::default(),
            music:            MusicProfileData::default(),
            fx:               FxProfileData::default(),
        }
    }

    /// Decode one slice body into its field, replacing the current value.
    pub fn set_slice_json(&mut self, kind: SliceKind, body: &[u8]) -> serde_json::Result<()> {
        match kind {
            SliceKind::Meta => self.meta = serde_json::from_slice(body)?,
            SliceKind::PlayerCharacter => self.player_character = serde_json::from_slice(body)?,
            SliceKind::Gsm => self.gsm = serde_json::from_slice(body)?,
            SliceKind::Ability => self.ability = serde_json::from_slice(body)?,
            SliceKind::SkillTree => self.skill_tree = serde_json::from_slice(body)?,
            SliceKind::Inventory => self.inventory = serde_json::from_slice(body)?,
            SliceKind::Missions => self.missions = serde_json::from_slice(body)?,
            SliceKind::Music => self.music = serde_json::from_slice(body)?,
            SliceKind::Fx => self.fx = serde_json::from_slice(body)?,
        }
        Ok(())
    }

    pub fn slice<S: ProfileSlice>(&self) -> &S {
        S::of(self)
    }

    pub fn slice_mut<S: ProfileSlice>(&mut self) -> &mut S {
        S::of_mut(self)
    }
}
