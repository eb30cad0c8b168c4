//! Shared fixtures: fake collaborators, sample snapshots.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use profile_core::{
    clock::SessionClock,
    error::{CollabResult, CollaboratorError},
    slices::*,
    snapshot::SnapshotAggregate,
    subsystem::{RestoreOutcome, SliceOwner, WorldContext},
    types::{ProfileId, SliceKind},
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// A snapshot with every slice populated.
pub fn sample_snapshot(id: ProfileId) -> SnapshotAggregate {
    let mut s = SnapshotAggregate::empty(id);
    s.meta = ProfileMetadata {
        display_name:       "Alpha".into(),
        last_played_utc:    at(0),
        total_play_seconds: 3723.5,
    };
    s.player_character = CharacterStateData {
        transform: Transform { location: [120.5, -40.25, 88.0], rotation: [0.0, 90.0, 0.0] },
        health: 72.5,
        max_health: 100.0,
        stamina: 40.0,
        stats: BTreeMap::from([("agility".into(), 12.0), ("strength".into(), 8.5)]),
        active_tags: BTreeSet::from(["State.Crouched".into()]),
    };
    s.gsm = GsmProfileData {
        global_alert_level: 0.35,
        suspicion: 12.0,
        alert_tier: AlertTier::Suspicious,
        active_alert_tags: BTreeSet::from(["Alert.Region.Docks".into()]),
        seconds_since_last_alert: 95.0,
    };
    s.ability = AbilityProfileData {
        granted_abilities: BTreeSet::from(["Ability.Dash".into(), "Ability.Vanish".into()]),
        cooldowns: BTreeMap::from([("Ability.Vanish".into(), 4.5)]),
        charges: BTreeMap::from([("Ability.Dash".into(), 2)]),
    };
    s.skill_tree = SkillTreeProfileData {
        unlocked_nodes: BTreeSet::from(["Node.Shadowstep".into(), "Node.QuietFeet".into()]),
        unspent_points: 3,
        spent_points: 7,
    };
    s.inventory = InventoryProfileData {
        items: vec![SerializedItem::new("potion", 3), SerializedItem::new("smoke_bomb", 1)],
        quick_slots: vec![ItemSlotBinding::new(0, "potion")],
        currency: 450,
    };
    s.missions = MissionProfileData {
        completed_missions: BTreeSet::from(["M01_Prologue".into()]),
        active_mission: Some("M02_Docks".into()),
        objective_progress: BTreeMap::from([("M02_Docks.Obj.Guards".into(), 2)]),
        fired_events: BTreeSet::from(["Mission.Event.DocksEntered".into()]),
    };
    s.music = MusicProfileData {
        current_track: Some("Track.Docks.Stealth".into()),
        unlocked_tracks: BTreeSet::from(["Track.Docks.Stealth".into(), "Track.Menu".into()]),
        volume: 0.8,
    };
    s.fx = FxProfileData {
        toggles: BTreeMap::from([("Fx.Rain".into(), true), ("Fx.Bloom".into(), false)]),
        intensity: 0.6,
    };
    s
}

// ── Fake collaborators ─────────────────────────────────────────

pub type Journal = Rc<RefCell<Vec<(&'static str, SliceKind)>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Stands in for any subsystem that owns one slice.
pub struct FakeOwner<S> {
    pub state:         S,
    pub capture_error: Option<String>,
    pub restore_error: Option<String>,
    pub restores:      usize,
    pub journal:       Option<Journal>,
}

impl<S: ProfileSlice> FakeOwner<S> {
    pub fn new(state: S) -> Self {
        Self { state, capture_error: None, restore_error: None, restores: 0, journal: None }
    }

    fn log(&self, op: &'static str) {
        if let Some(journal) = &self.journal {
            journal.borrow_mut().push((op, S::KIND));
        }
    }
}

impl<S: ProfileSlice> SliceOwner<S> for FakeOwner<S> {
    fn capture(&self) -> CollabResult<S> {
        self.log("capture");
        match &self.capture_error {
            Some(reason) => Err(CollaboratorError::unavailable(S::KIND, reason.clone())),
            None => Ok(self.state.clone()),
        }
    }

    fn restore(&mut self, data: &S) -> CollabResult<RestoreOutcome> {
        self.log("restore");
        if let Some(reason) = &self.restore_error {
            return Err(CollaboratorError::unavailable(S::KIND, reason.clone()));
        }
        self.state = data.clone();
        self.restores += 1;
        Ok(RestoreOutcome::complete())
    }
}

/// Skill tree whose data-driven node set may have shrunk since the save.
pub struct FakeSkillTree {
    pub tree_nodes: BTreeSet<String>,
    pub state:      SkillTreeProfileData,
}

impl SliceOwner<SkillTreeProfileData> for FakeSkillTree {
    fn capture(&self) -> CollabResult<SkillTreeProfileData> {
        Ok(self.state.clone())
    }

    fn restore(&mut self, data: &SkillTreeProfileData) -> CollabResult<RestoreOutcome> {
        let (kept, dropped): (BTreeSet<String>, BTreeSet<String>) = data
            .unlocked_nodes
            .iter()
            .cloned()
            .partition(|node| self.tree_nodes.contains(node));
        self.state = SkillTreeProfileData { unlocked_nodes: kept, ..data.clone() };
        Ok(RestoreOutcome::with_dropped(dropped.into_iter().collect()))
    }
}

/// Every collaborator a world provides.
pub struct FakeWorld {
    pub session:    SessionClock,
    pub character:  FakeOwner<CharacterStateData>,
    pub stealth:    FakeOwner<GsmProfileData>,
    pub abilities:  FakeOwner<AbilityProfileData>,
    pub skill_tree: FakeSkillTree,
    pub inventory:  FakeOwner<InventoryProfileData>,
    pub missions:   FakeOwner<MissionProfileData>,
    pub music:      FakeOwner<MusicProfileData>,
    pub fx:         FakeOwner<FxProfileData>,
}

impl FakeWorld {
    /// World whose live state matches `sample_snapshot`.
    pub fn populated() -> Self {
        let s = sample_snapshot(ProfileId::new("Run1", 0));
        let mut session = SessionClock::new(s.meta.display_name.clone());
        session.resume();
        session.advance(s.meta.total_play_seconds);
        Self {
            session,
            character:  FakeOwner::new(s.player_character),
            stealth:    FakeOwner::new(s.gsm),
            abilities:  FakeOwner::new(s.ability),
            skill_tree: FakeSkillTree {
                tree_nodes: s.skill_tree.unlocked_nodes.clone(),
                state:      s.skill_tree,
            },
            inventory:  FakeOwner::new(s.inventory),
            missions:   FakeOwner::new(s.missions),
            music:      FakeOwner::new(s.music),
            fx:         FakeOwner::new(s.fx),
        }
    }

    /// Fresh world: every subsystem at its default state.
    pub fn blank() -> Self {
        let tree_nodes = sample_snapshot(ProfileId::new("Run1", 0)).skill_tree.unlocked_nodes;
        Self {
            session:    SessionClock::new(""),
            character:  FakeOwner::new(Default::default()),
            stealth:    FakeOwner::new(Default::default()),
            abilities:  FakeOwner::new(Default::default()),
            skill_tree: FakeSkillTree { tree_nodes, state: Default::default() },
            inventory:  FakeOwner::new(Default::default()),
            missions:   FakeOwner::new(Default::default()),
            music:      FakeOwner::new(Default::default()),
            fx:         FakeOwner::new(Default::default()),
        }
    }

    pub fn attach_journal(&mut self, journal: &Journal) {
        self.character.journal = Some(journal.clone());
        self.stealth.journal = Some(journal.clone());
        self.abilities.journal = Some(journal.clone());
        self.inventory.journal = Some(journal.clone());
        self.missions.journal = Some(journal.clone());
        self.music.journal = Some(journal.clone());
        self.fx.journal = Some(journal.clone());
    }

    pub fn context(&mut self) -> WorldContext<'_> {
        WorldContext::new()
            .with_session(&mut self.session)
            .with_character(&mut self.character)
            .with_stealth(&mut self.stealth)
            .with_abilities(&mut self.abilities)
            .with_skill_tree(&mut self.skill_tree)
            .with_inventory(&mut self.inventory)
            .with_missions(&mut self.missions)
            .with_music(&mut self.music)
            .with_fx(&mut self.fx)
    }
}
