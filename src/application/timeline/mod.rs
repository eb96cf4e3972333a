//! In-memory home timelines and the public feed read path.
//!
//! Each account's timeline is an ordered index of [`TimelineEntry`] values guarded by its own
//! async mutex. Reads walk the index, backfill from storage when it runs short, and pass every
//! candidate through visibility, mute and filter checks before it reaches the page.

mod assemble;
mod entry;
mod index;
mod manager;
mod page;
mod public;
mod sweep;

use std::time::Duration;

use thiserror::Error;

use crate::application::context::Interrupted;
use crate::application::mutes::MuteError;
use crate::application::repos::RepoError;
use crate::application::status_filter::FilterError;
use crate::application::visibility::VisibilityError;
use crate::config::TimelineSettings;

pub use entry::TimelineEntry;
pub use index::{IndexedEntry, TimelineIndex};
pub use manager::{Timeline, TimelineManager};
pub use page::TimelinePage;
pub use public::PublicTimeline;
pub use sweep::TimelineSweeper;

pub const DEFAULT_BOOST_REINSERTION_DEPTH: usize = 50;
pub const DEFAULT_INDEXED_LEN: usize = 400;
pub const DEFAULT_PREPARED_LEN: usize = 50;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_LOAD_ATTEMPTS: usize = 5;

/// Extra rows requested from storage on top of the page limit, to absorb filtered candidates.
const LOAD_HEADROOM: usize = 10;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for TimelineError {
    fn from(err: Interrupted) -> Self {
        match err {
            Interrupted::Cancelled => TimelineError::Cancelled,
            Interrupted::DeadlineExceeded => TimelineError::DeadlineExceeded,
        }
    }
}

impl From<VisibilityError> for TimelineError {
    fn from(err: VisibilityError) -> Self {
        match err {
            VisibilityError::Repo(err) => TimelineError::Repo(err),
            VisibilityError::Interrupted(err) => err.into(),
        }
    }
}

impl From<MuteError> for TimelineError {
    fn from(err: MuteError) -> Self {
        match err {
            MuteError::Repo(err) => TimelineError::Repo(err),
            MuteError::Interrupted(err) => err.into(),
        }
    }
}

impl From<FilterError> for TimelineError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Repo(err) => TimelineError::Repo(err),
            FilterError::Interrupted(err) => err.into(),
        }
    }
}

/// Sizing and pacing of the timeline cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineConfig {
    pub boost_reinsertion_depth: usize,
    pub indexed_len: usize,
    pub prepared_len: usize,
    pub sweep_interval: Duration,
    pub load_attempts: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            boost_reinsertion_depth: DEFAULT_BOOST_REINSERTION_DEPTH,
            indexed_len: DEFAULT_INDEXED_LEN,
            prepared_len: DEFAULT_PREPARED_LEN,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            load_attempts: DEFAULT_LOAD_ATTEMPTS,
        }
    }
}

impl From<&TimelineSettings> for TimelineConfig {
    fn from(settings: &TimelineSettings) -> Self {
        Self {
            boost_reinsertion_depth: settings.boost_reinsertion_depth,
            indexed_len: settings.indexed_len,
            prepared_len: settings.prepared_len,
            sweep_interval: settings.sweep_interval,
            load_attempts: settings.load_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interruptions_map_onto_timeline_errors() {
        assert!(matches!(
            TimelineError::from(VisibilityError::Interrupted(Interrupted::Cancelled)),
            TimelineError::Cancelled
        ));
        assert!(matches!(
            TimelineError::from(FilterError::Interrupted(Interrupted::DeadlineExceeded)),
            TimelineError::DeadlineExceeded
        ));
        assert!(matches!(
            TimelineError::from(MuteError::Repo(RepoError::Timeout)),
            TimelineError::Repo(RepoError::Timeout)
        ));
    }
}
