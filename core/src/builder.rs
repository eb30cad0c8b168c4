//! Snapshot builder — reads live subsystem state into a fresh snapshot.
//!
//! CAPTURE ORDER is the canonical slice order. The builder never mutates
//! live state, and must run on whatever thread owns the world; only the
//! finished snapshot may cross to a background worker.

use crate::{
    error::{BuildError, CollaboratorError},
    slices::ProfileSlice,
    snapshot::SnapshotAggregate,
    subsystem::{SliceOwner, WorldContext},
    types::{ProfileId, SliceKind},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What to do when a collaborator cannot supply its slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSlicePolicy {
    /// Fail the whole build with `CollaboratorUnavailable`.
    Abort,
    /// Substitute the slice's default value and carry on.
    #[default]
    UseDefault,
}

/// Which slices were captured and which were defaulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub captured:  Vec<SliceKind>,
    pub defaulted: Vec<(SliceKind, CollaboratorError)>,
}

impl BuildReport {
    pub fn is_complete(&self) -> bool {
        self.defaulted.is_empty()
    }

    pub fn was_defaulted(&self, kind: SliceKind) -> bool {
        self.defaulted.iter().any(|(k, _)| *k == kind)
    }
}

pub struct SnapshotBuilder {
    policy:      MissingSlicePolicy,
    captured_at: Option<DateTime<Utc>>,
}

impl SnapshotBuilder {
    pub fn new(policy: MissingSlicePolicy) -> Self {
        Self { policy, captured_at: None }
    }

    /// Pin the timestamp stamped into `meta.last_played_utc`.
    /// Defaults to the wall clock at build time.
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    pub fn policy(&self) -> MissingSlicePolicy {
        self.policy
    }

    /// Assemble a snapshot from every collaborator in canonical order.
    pub fn build(
        &self,
        ctx: &WorldContext<'_>,
        profile_id: ProfileId,
    ) -> Result<(SnapshotAggregate, BuildReport), BuildError> {
        let mut snapshot = SnapshotAggregate::empty(profile_id);
        let mut report = BuildReport::default();

        let meta_captured = self.capture(ctx.session.as_deref(), &mut snapshot, &mut report)?;
        if !meta_captured {
            snapshot.meta.display_name = snapshot.profile_id.slot_name.clone();
        }
        snapshot.meta.last_played_utc = self.captured_at.unwrap_or_else(Utc::now);

        self.capture(ctx.character.as_deref(), &mut snapshot, &mut report)?;
        self.capture(ctx.stealth.as_deref(), &mut snapshot, &mut report)?;
        self.capture(ctx.abilities.as_deref(), &mut snapshot, &mut report)?;
        self.capture(ctx.skill_tree.as_deref(), &mut snapshot, &mut report)?;
        self.capture(ctx.inventory.as_deref(), &mut snapshot, &mut report)?;
        self.capture(ctx.missions.as_deref(), &mut snapshot, &mut report)?;
        self.capture(ctx.music.as_deref(), &mut snapshot, &mut report)?;
        self.capture(ctx.fx.as_deref(), &mut snapshot, &mut report)?;

        log::debug!(
            "built snapshot for {}: {} captured, {} defaulted",
            snapshot.profile_id,
            report.captured.len(),
            report.defaulted.len()
        );
        Ok((snapshot, report))
    }

    /// Returns whether the slice came from its owner (false = defaulted).
    fn capture<'o, S: ProfileSlice>(
        &self,
        owner: Option<&(dyn SliceOwner<S> + 'o)>,
        snapshot: &mut SnapshotAggregate,
        report: &mut BuildReport,
    ) -> Result<bool, BuildError> {
        let result = match owner {
            Some(owner) => owner.capture(),
            None => Err(CollaboratorError::unavailable(S::KIND, "no collaborator in world context")),
        };

        match result {
            Ok(value) => {
                log::debug!("captured slice '{}'", S::KIND);
                *snapshot.slice_mut::<S>() = value;
                report.captured.push(S::KIND);
                Ok(true)
            }
            Err(err) => match self.policy {
                MissingSlicePolicy::Abort => Err(BuildError::CollaboratorUnavailable {
                    slice:  S::KIND,
                    reason: err.to_string(),
                }),
                MissingSlicePolicy::UseDefault => {
                    log::warn!("slice '{}' defaulted: {err}", S::KIND);
                    report.defaulted.push((S::KIND, err));
                    Ok(false)
                }
            },
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(MissingSlicePolicy::default())
    }
}

/// Build with the default policy (missing slices are defaulted).
pub fn build_snapshot_from_world(
    ctx: &WorldContext<'_>,
    profile_id: ProfileId,
) -> Result<(SnapshotAggregate, BuildReport), BuildError> {
    SnapshotBuilder::default().build(ctx, profile_id)
}
