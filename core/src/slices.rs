//! Slice types — one plain data record per gameplay subsystem.
//!
//! RULE: A slice never holds a reference to another slice or to a live
//! subsystem. Attributes are identifiers, tags, counters and timestamps.
//! Maps are BTreeMaps so the encoded bytes are deterministic.
//!
//! Every struct is `#[serde(default)]`: fields appended to a slice later
//! decode as their default from older payloads.

use crate::{snapshot::SnapshotAggregate, types::SliceKind};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// The contract every slice type fulfils.
pub trait ProfileSlice:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + Debug + Send + 'static
{
    /// Stable tag of this slice; fixes its position in the canonical order.
    const KIND: SliceKind;

    /// Structural checks run before a slice is handed to its owner.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn of(snapshot: &SnapshotAggregate) -> &Self;
    fn of_mut(snapshot: &mut SnapshotAggregate) -> &mut Self;
}

macro_rules! profile_slice {
    ($ty:ty, $kind:expr, $field:ident) => {
        profile_slice!($ty, $kind, $field, |_s: &$ty| Ok(()));
    };
    ($ty:ty, $kind:expr, $field:ident, $validate:expr) => {
        impl ProfileSlice for $ty {
            const KIND: SliceKind = $kind;

            fn validate(&self) -> Result<(), String> {
                let check: fn(&$ty) -> Result<(), String> = $validate;
                check(self)
            }

            fn of(snapshot: &SnapshotAggregate) -> &Self {
                &snapshot.$field
            }

            fn of_mut(snapshot: &mut SnapshotAggregate) -> &mut Self {
                &mut snapshot.$field
            }
        }
    };
}

// ── Meta ───────────────────────────────────────────────────────

/// Always the first slice. Listing screens decode only this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileMetadata {
    pub display_name:       String,
    pub last_played_utc:    DateTime<Utc>,
    pub total_play_seconds: f64,
}

profile_slice!(ProfileMetadata, SliceKind::Meta, meta, |m| {
    if !m.total_play_seconds.is_finite() || m.total_play_seconds < 0.0 {
        return Err(format!("total_play_seconds out of range: {}", m.total_play_seconds));
    }
    Ok(())
});

// ── Player character ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub location: [f64; 3],
    /// Pitch, yaw, roll in degrees.
    pub rotation: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStateData {
    pub transform:   Transform,
    pub health:      f32,
    pub max_health:  f32,
    pub stamina:     f32,
    pub stats:       BTreeMap<String, f32>,
    pub active_tags: BTreeSet<String>,
}

profile_slice!(CharacterStateData, SliceKind::PlayerCharacter, player_character, |c| {
    if c.health < 0.0 || c.max_health < 0.0 {
        return Err("negative health".into());
    }
    if c.health > c.max_health {
        return Err(format!("health {} exceeds max_health {}", c.health, c.max_health));
    }
    Ok(())
});

// ── Global stealth manager ─────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTier {
    #[default]
    Calm,
    Suspicious,
    Searching,
    Alerted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GsmProfileData {
    /// Normalised 0..=1.
    pub global_alert_level:       f32,
    pub suspicion:                f32,
    pub alert_tier:               AlertTier,
    pub active_alert_tags:        BTreeSet<String>,
    pub seconds_since_last_alert: f64,
}

profile_slice!(GsmProfileData, SliceKind::Gsm, gsm, |g| {
    if !(0.0..=1.0).contains(&g.global_alert_level) {
        return Err(format!("global_alert_level out of range: {}", g.global_alert_level));
    }
    Ok(())
});

// ── Abilities ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityProfileData {
    pub granted_abilities:   BTreeSet<String>,
    /// Remaining cooldown seconds per ability id.
    pub cooldowns:           BTreeMap<String, f32>,
    pub charges:             BTreeMap<String, u32>,
}

profile_slice!(AbilityProfileData, SliceKind::Ability, ability);

// ── Skill tree ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillTreeProfileData {
    pub unlocked_nodes: BTreeSet<String>,
    pub unspent_points: u32,
    pub spent_points:   u32,
}

profile_slice!(SkillTreeProfileData, SliceKind::SkillTree, skill_tree);

// ── Inventory ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedItem {
    pub item_id:  String,
    pub quantity: u32,
}

impl SerializedItem {
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self { item_id: item_id.into(), quantity }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSlotBinding {
    pub slot_index: u32,
    pub item_id:    String,
}

impl ItemSlotBinding {
    pub fn new(slot_index: u32, item_id: impl Into<String>) -> Self {
        Self { slot_index, item_id: item_id.into() }
    }
}

/// Duplicate items are allowed; quick-slot indices are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryProfileData {
    pub items:       Vec<SerializedItem>,
    pub quick_slots: Vec<ItemSlotBinding>,
    pub currency:    u64,
}

impl InventoryProfileData {
    pub fn count_item(&self, item_id: &str) -> u64 {
        self.items
            .iter()
            .filter(|item| item.item_id == item_id)
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    pub fn binding_for(&self, slot_index: u32) -> Option<&ItemSlotBinding> {
        self.quick_slots.iter().find(|b| b.slot_index == slot_index)
    }
}

profile_slice!(InventoryProfileData, SliceKind::Inventory, inventory, |inv| {
    let mut seen = BTreeSet::new();
    for binding in &inv.quick_slots {
        if !seen.insert(binding.slot_index) {
            return Err(format!("quick-slot index {} bound twice", binding.slot_index));
        }
    }
    Ok(())
});

// ── Missions ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionProfileData {
    pub completed_missions: BTreeSet<String>,
    pub active_mission:     Option<String>,
    /// Objective id -> completed count.
    pub objective_progress: BTreeMap<String, u32>,
    /// Mission event tags already fired.
    pub fired_events:       BTreeSet<String>,
}

profile_slice!(MissionProfileData, SliceKind::Missions, missions, |m| {
    if let Some(active) = &m.active_mission {
        if m.completed_missions.contains(active) {
            return Err(format!("active mission '{active}' is already completed"));
        }
    }
    Ok(())
});

// ── Music (schema v2) ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicProfileData {
    pub current_track:   Option<String>,
    pub unlocked_tracks: BTreeSet<String>,
    pub volume:          f32,
}

profile_slice!(MusicProfileData, SliceKind::Music, music, |m| {
    if !(0.0..=1.0).contains(&m.volume) {
        return Err(format!("volume out of range: {}", m.volume));
    }
    Ok(())
});

// ── FX (schema v2) ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxProfileData {
    pub toggles:   BTreeMap<String, bool>,
    pub intensity: f32,
}

profile_slice!(FxProfileData, SliceKind::Fx, fx);
