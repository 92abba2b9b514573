//! Genre filter for the random queue
//!
//! The filter file is a JSON array of four strings written by the front-end.
//! Only a slot holding exactly `"null"` is unset; any other string,
//! including an empty one, is an active token. With every slot unset any
//! track may be played randomly; otherwise a track qualifies when its
//! comment tag contains at least one active token. Tracks tagged
//! `norandom` never enter the random queue. Tokens match as substrings of
//! the comment tag, case-sensitively, so an empty token matches every tag.

use crate::catalog::Track;
use crate::{Error, Result};
use jukebox_common::files;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Number of filter slots
pub const SLOT_COUNT: usize = 4;

/// Sentinel for an unset slot
pub const UNSET: &str = "null";

/// Comment token that excludes a track from random play
pub const NORANDOM: &str = "norandom";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreFilter {
    slots: [String; SLOT_COUNT],
}

impl Default for GenreFilter {
    fn default() -> Self {
        Self::unset()
    }
}

impl GenreFilter {
    /// All slots unset
    pub fn unset() -> Self {
        Self {
            slots: std::array::from_fn(|_| UNSET.to_string()),
        }
    }

    pub fn from_slots(slots: [String; SLOT_COUNT]) -> Self {
        Self { slots }
    }

    /// Parse the filter file's JSON value
    ///
    /// Arrays shorter than four are padded with unset slots; longer arrays
    /// are truncated with a warning. Anything that is not an array of
    /// strings is malformed.
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            Error::GenreFilterMalformed(format!("expected an array, found {}", value))
        })?;

        if items.len() > SLOT_COUNT {
            warn!(
                "Genre filter has {} entries, using the first {}",
                items.len(),
                SLOT_COUNT
            );
        }

        let mut filter = Self::unset();
        for (slot, item) in filter.slots.iter_mut().zip(items) {
            *slot = item
                .as_str()
                .ok_or_else(|| {
                    Error::GenreFilterMalformed(format!("expected a string, found {}", item))
                })?
                .to_string();
        }

        Ok(filter)
    }

    /// Load the filter file; missing, unparsable or malformed files yield all-unset
    pub fn load(path: &Path) -> Self {
        let value = match files::read_json::<Value>(path) {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!("Genre filter {} missing, no filter applied", path.display());
                return Self::unset();
            }
            Err(e) => {
                warn!("Genre filter unreadable: {}, no filter applied", e);
                return Self::unset();
            }
        };

        match Self::from_value(&value) {
            Ok(filter) => {
                if filter.is_unset() {
                    info!("No genre filter active");
                } else {
                    info!("Genre filter: {:?}", filter.active_tokens().collect::<Vec<_>>());
                }
                filter
            }
            Err(e) => {
                warn!("{}, no filter applied", e);
                Self::unset()
            }
        }
    }

    pub fn slots(&self) -> &[String; SLOT_COUNT] {
        &self.slots
    }

    /// Tokens of the slots that are set
    pub fn active_tokens(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .map(String::as_str)
            .filter(|s| *s != UNSET)
    }

    pub fn is_unset(&self) -> bool {
        self.active_tokens().next().is_none()
    }

    /// Whether `track` may be placed in the random queue
    pub fn eligible(&self, track: &Track) -> bool {
        if track.genre_tag.contains(NORANDOM) {
            return false;
        }
        if self.is_unset() {
            return true;
        }
        self.active_tokens()
            .any(|token| track.genre_tag.contains(token))
    }
}
