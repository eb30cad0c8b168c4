//! Shared primitive types used across the profile subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// On-disk schema version. Bumped whenever a slice kind is appended.
pub type SchemaVersion = u16;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = 2;

const MAX_SLOT_NAME_LEN: usize = 64;

/// Identifies one save slot. Immutable once the slot exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileId {
    pub slot_name:  String,
    pub slot_index: u32,
}

impl ProfileId {
    pub fn new(slot_name: impl Into<String>, slot_index: u32) -> Self {
        Self { slot_name: slot_name.into(), slot_index }
    }

    /// Slot names end up in file names and SQL keys, so they are restricted
    /// to `[A-Za-z0-9_-]`.
    pub fn validate(&self) -> Result<(), String> {
        if self.slot_name.is_empty() {
            return Err("slot name is empty".into());
        }
        if self.slot_name.len() > MAX_SLOT_NAME_LEN {
            return Err(format!(
                "slot name longer than {MAX_SLOT_NAME_LEN} characters"
            ));
        }
        if let Some(bad) = self
            .slot_name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(format!("slot name contains invalid character {bad:?}"));
        }
        Ok(())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.slot_name, self.slot_index)
    }
}

/// Stable slice tags, in canonical serialization order.
/// NEVER reorder or remove entries — only append.
/// The discriminant is the on-disk section tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum SliceKind {
    Meta = 0,
    PlayerCharacter = 1,
    Gsm = 2,
    Ability = 3,
    SkillTree = 4,
    Inventory = 5,
    Missions = 6,
    Music = 7, // schema v2
    Fx = 8,    // schema v2
               // Add new slices here — append only, bump CURRENT_SCHEMA_VERSION.
}

impl SliceKind {
    /// Every slice kind, in canonical order.
    pub const ALL: [SliceKind; 9] = [
        SliceKind::Meta,
        SliceKind::PlayerCharacter,
        SliceKind::Gsm,
        SliceKind::Ability,
        SliceKind::SkillTree,
        SliceKind::Inventory,
        SliceKind::Missions,
        SliceKind::Music,
        SliceKind::Fx,
    ];

    pub fn tag(self) -> u16 {
        self as u16
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::PlayerCharacter => "player_character",
            Self::Gsm => "gsm",
            Self::Ability => "ability",
            Self::SkillTree => "skill_tree",
            Self::Inventory => "inventory",
            Self::Missions => "missions",
            Self::Music => "music",
            Self::Fx => "fx",
        }
    }

    /// Schema version in which this slice was appended.
    pub fn introduced_in(self) -> SchemaVersion {
        match self {
            Self::Music | Self::Fx => 2,
            _ => 1,
        }
    }

    /// Slices known to a reader/writer at `version`, in canonical order.
    pub fn known_at(version: SchemaVersion) -> impl Iterator<Item = SliceKind> {
        Self::ALL
            .into_iter()
            .filter(move |kind| kind.introduced_in() <= version)
    }
}

impl fmt::Display for SliceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
