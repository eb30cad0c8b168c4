//! Snapshot applier — pushes a decoded snapshot back into live state.
//!
//! APPLY ORDER is the canonical slice order, so Meta and PlayerCharacter
//! always land before the pawn-dependent slices (GSM, Ability, SkillTree).
//!
//! A failed slice is logged and skipped; the rest are still applied.
//! One missing subsystem never blocks restoring the rest of the profile.

use crate::{
    error::CollaboratorError,
    slices::ProfileSlice,
    snapshot::SnapshotAggregate,
    subsystem::{SliceOwner, WorldContext},
    types::SliceKind,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SliceStatus {
    Applied,
    /// Applied, but these entity references were dropped.
    Partial { dropped: Vec<String> },
    Skipped { reason: CollaboratorError },
}

impl SliceStatus {
    pub fn is_applied(&self) -> bool {
        !matches!(self, SliceStatus::Skipped { .. })
    }
}

/// One status per slice kind, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub slices: Vec<(SliceKind, SliceStatus)>,
}

impl ApplyReport {
    pub fn status(&self, kind: SliceKind) -> Option<&SliceStatus> {
        self.slices.iter().find(|(k, _)| *k == kind).map(|(_, s)| s)
    }

    /// True when every slice was applied in full.
    pub fn all_applied(&self) -> bool {
        self.slices
            .iter()
            .all(|(_, status)| matches!(status, SliceStatus::Applied))
    }

    pub fn skipped(&self) -> Vec<SliceKind> {
        self.slices
            .iter()
            .filter(|(_, status)| !status.is_applied())
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn partial(&self) -> Vec<SliceKind> {
        self.slices
            .iter()
            .filter(|(_, status)| matches!(status, SliceStatus::Partial { .. }))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct SnapshotApplier;

impl SnapshotApplier {
    pub fn new() -> Self {
        Self
    }

    /// Consume the snapshot, applying each slice to its owner.
    pub fn apply(&self, ctx: &mut WorldContext<'_>, snapshot: SnapshotAggregate) -> ApplyReport {
        let mut slices = Vec::with_capacity(SliceKind::ALL.len());

        slices.push(restore(ctx.session.as_deref_mut(), &snapshot.meta));
        slices.push(restore(ctx.character.as_deref_mut(), &snapshot.player_character));
        slices.push(restore(ctx.stealth.as_deref_mut(), &snapshot.gsm));
        slices.push(restore(ctx.abilities.as_deref_mut(), &snapshot.ability));
        slices.push(restore(ctx.skill_tree.as_deref_mut(), &snapshot.skill_tree));
        slices.push(restore(ctx.inventory.as_deref_mut(), &snapshot.inventory));
        slices.push(restore(ctx.missions.as_deref_mut(), &snapshot.missions));
        slices.push(restore(ctx.music.as_deref_mut(), &snapshot.music));
        slices.push(restore(ctx.fx.as_deref_mut(), &snapshot.fx));

        let report = ApplyReport { slices };
        let skipped = report.skipped();
        if skipped.is_empty() {
            log::info!("applied profile {}", snapshot.profile_id);
        } else {
            log::warn!(
                "applied profile {} with {} skipped slice(s): {:?}",
                snapshot.profile_id,
                skipped.len(),
                skipped
            );
        }
        report
    }
}

fn restore<'o, S: ProfileSlice>(
    owner: Option<&mut (dyn SliceOwner<S> + 'o)>,
    data: &S,
) -> (SliceKind, SliceStatus) {
    let Some(owner) = owner else {
        let reason = CollaboratorError::unavailable(S::KIND, "no collaborator in world context");
        log::warn!("skipping slice '{}': {reason}", S::KIND);
        return (S::KIND, SliceStatus::Skipped { reason });
    };

    if let Err(msg) = data.validate() {
        let reason = CollaboratorError::rejected(S::KIND, msg);
        log::warn!("skipping slice '{}': {reason}", S::KIND);
        return (S::KIND, SliceStatus::Skipped { reason });
    }

    let status = match owner.restore(data) {
        Ok(outcome) if outcome.is_complete() => {
            log::debug!("restored slice '{}'", S::KIND);
            SliceStatus::Applied
        }
        Ok(outcome) => {
            log::warn!(
                "restored slice '{}' with dropped references: {:?}",
                S::KIND,
                outcome.dropped_refs
            );
            SliceStatus::Partial { dropped: outcome.dropped_refs }
        }
        Err(reason) => {
            log::warn!("skipping slice '{}': {reason}", S::KIND);
            SliceStatus::Skipped { reason }
        }
    };
    (S::KIND, status)
}

/// Apply with a default applier.
pub fn apply_snapshot_to_world(ctx: &mut WorldContext<'_>, snapshot: SnapshotAggregate) -> ApplyReport {
    SnapshotApplier::new().apply(ctx, snapshot)
}
