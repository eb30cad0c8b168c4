//! Collaborator trait and the world context that carries them.
//!
//! RULE: Every gameplay subsystem that owns a slice implements
//! `SliceOwner<ThatSlice>`. The builder and applier reach subsystems only
//! through the `WorldContext` passed in at call time — never through
//! ambient globals — so tests can substitute fakes.

use crate::{
    error::CollabResult,
    slices::*,
};

/// What a subsystem reports after restoring its slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Entity references in the slice that no longer exist in the world
    /// (e.g. a skill node removed from the tree). The rest was applied.
    pub dropped_refs: Vec<String>,
}

impl RestoreOutcome {
    pub fn complete() -> Self {
        Self::default()
    }

    pub fn with_dropped(dropped_refs: Vec<String>) -> Self {
        Self { dropped_refs }
    }

    pub fn is_complete(&self) -> bool {
        self.dropped_refs.is_empty()
    }
}

/// The contract every slice-owning subsystem fulfils.
pub trait SliceOwner<S: ProfileSlice> {
    /// Read the subsystem's current state into a fresh slice value.
    /// Must not mutate live state.
    fn capture(&self) -> CollabResult<S>;

    /// Push a slice value back into live state.
    fn restore(&mut self, data: &S) -> CollabResult<RestoreOutcome>;
}

/// Live collaborators for one world/session. `None` means the subsystem
/// is not reachable right now (e.g. no active pawn).
#[derive(Default)]
pub struct WorldContext<'w> {
    pub session:    Option<&'w mut dyn SliceOwner<ProfileMetadata>>,
    pub character:  Option<&'w mut dyn SliceOwner<CharacterStateData>>,
    pub stealth:    Option<&'w mut dyn SliceOwner<GsmProfileData>>,
    pub abilities:  Option<&'w mut dyn SliceOwner<AbilityProfileData>>,
    pub skill_tree: Option<&'w mut dyn SliceOwner<SkillTreeProfileData>>,
    pub inventory:  Option<&'w mut dyn SliceOwner<InventoryProfileData>>,
    pub missions:   Option<&'w mut dyn SliceOwner<MissionProfileData>>,
    pub music:      Option<&'w mut dyn SliceOwner<MusicProfileData>>,
    pub fx:         Option<&'w mut dyn SliceOwner<FxProfileData>>,
}

impl<'w> WorldContext<'w> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, owner: &'w mut dyn SliceOwner<ProfileMetadata>) -> Self {
        self.session = Some(owner);
        self
    }

    pub fn with_character(mut self, owner: &'w mut dyn SliceOwner<CharacterStateData>) -> Self {
        self.character = Some(owner);
        self
    }

    pub fn with_stealth(mut self, owner: &'w mut dyn SliceOwner<GsmProfileData>) -> Self {
        self.stealth = Some(owner);
        self
    }

    pub fn with_abilities(mut self, owner: &'w mut dyn SliceOwner<AbilityProfileData>) -> Self {
        self.abilities = Some(owner);
        self
    }

    pub fn with_skill_tree(mut self, owner: &'w mut dyn SliceOwner<SkillTreeProfileData>) -> Self {
        self.skill_tree = Some(owner);
        self
    }

    pub fn with_inventory(mut self, owner: &'w mut dyn SliceOwner<InventoryProfileData>) -> Self {
        self.inventory = Some(owner);
        self
    }

    pub fn with_missions(mut self, owner: &'w mut dyn SliceOwner<MissionProfileData>) -> Self {
        self.missions = Some(owner);
        self
    }

    pub fn with_music(mut self, owner: &'w mut dyn SliceOwner<MusicProfileData>) -> Self {
        self.music = Some(owner);
        self
    }

    pub fn with_fx(mut self, owner: &'w mut dyn SliceOwner<FxProfileData>) -> Self {
        self.fx = Some(owner);
        self
    }
}
