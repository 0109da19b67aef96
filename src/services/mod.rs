pub mod round_tracker;
pub mod scoring;

pub use round_tracker::{
    HoleLine, MAX_STROKES_PER_HOLE, RoundSummary, RoundTracker, ScoreEntry, TrackerState,
};
pub use scoring::{RoundStats, ScoreName, relative_strokes, score_display};
