//! Session clock — owns play-time tracking and the Meta slice.

use crate::{
    error::CollabResult,
    slices::ProfileMetadata,
    subsystem::{RestoreOutcome, SliceOwner},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClock {
    pub display_name:       String,
    pub total_play_seconds: f64,
    pub last_played_utc:    Option<DateTime<Utc>>,
    pub paused:             bool,
}

impl SessionClock {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name:       display_name.into(),
            total_play_seconds: 0.0,
            last_played_utc:    None,
            paused:             true,
        }
    }

    /// Accumulate `dt_seconds` of play time. Ignored while paused.
    pub fn advance(&mut self, dt_seconds: f64) -> f64 {
        if !self.paused && dt_seconds.is_finite() && dt_seconds > 0.0 {
            self.total_play_seconds += dt_seconds;
        }
        self.total_play_seconds
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }
}

impl SliceOwner<ProfileMetadata> for SessionClock {
    fn capture(&self) -> CollabResult<ProfileMetadata> {
        Ok(ProfileMetadata {
            display_name:       self.display_name.clone(),
            last_played_utc:    self.last_played_utc.unwrap_or_else(Utc::now),
            total_play_seconds: self.total_play_seconds,
        })
    }

    fn restore(&mut self, data: &ProfileMetadata) -> CollabResult<RestoreOutcome> {
        self.display_name = data.display_name.clone();
        self.total_play_seconds = data.total_play_seconds;
        self.last_played_utc = Some(data.last_played_utc);
        // A freshly loaded profile starts paused until gameplay resumes.
        self.paused = true;
        Ok(RestoreOutcome::complete())
    }
}
