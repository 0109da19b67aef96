use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::CourseCatalog;
use crate::error::{PersistenceError, TrackerError};
use crate::models::{Course, FairwayResult, Hazard, HoleScore, NewRound, Round, RoundType};
use crate::persistence::PersistenceGateway;
use crate::services::scoring::{RoundStats, ScoreName, relative_strokes, score_display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Idle,
    InProgress,
    Complete,
}

/// Highest stroke count accepted for a single hole.
pub const MAX_STROKES_PER_HOLE: u32 = 30;

/// What the player enters for the current hole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub strokes: u32,
    pub putts: u32,
    #[serde(default)]
    pub green_in_regulation: bool,
    #[serde(default)]
    pub fairway: Option<FairwayResult>,
    #[serde(default)]
    pub hazards: BTreeSet<Hazard>,
}

impl ScoreEntry {
    pub fn new(strokes: u32, putts: u32, green_in_regulation: bool) -> Self {
        Self {
            strokes,
            putts,
            green_in_regulation,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), TrackerError> {
        if self.strokes == 0 || self.strokes > MAX_STROKES_PER_HOLE || self.putts > self.strokes {
            return Err(TrackerError::InvalidScore {
                strokes: self.strokes,
                putts: self.putts,
            });
        }
        Ok(())
    }

    fn into_hole_score(self, hole_number: u32) -> HoleScore {
        HoleScore {
            hole_number,
            strokes: self.strokes,
            putts: self.putts,
            green_in_regulation: self.green_in_regulation,
            fairway: self.fairway,
            hazards: self.hazards,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleLine {
    pub hole_number: u32,
    pub par: Option<i32>,
    pub strokes: u32,
    pub putts: u32,
    pub green_in_regulation: bool,
    pub relative_to_par: Option<i32>,
    pub score_name: Option<ScoreName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_id: String,
    pub course_id: String,
    pub course_name: String,
    pub state: TrackerState,
    pub current_hole: u32,
    pub total_holes: u32,
    pub total_strokes: u32,
    pub total_putts: u32,
    pub greens_in_regulation: u32,
    pub total_par: i32,
    pub total_score: i32,
    pub score_display: String,
    pub score_through_played: String,
    pub average_putts_per_hole: f64,
    pub greens_in_regulation_percentage: f64,
    pub holes: Vec<HoleLine>,
}

struct ActiveRound {
    round: Round,
    course: Arc<Course>,
    current_hole: u32,
    stats: RoundStats,
}

impl ActiveRound {
    fn relative_to_par(&self, hole_number: u32) -> Option<i32> {
        let score = self.round.hole_score(hole_number).filter(|s| s.is_played())?;
        let hole = self.course.hole(hole_number)?;
        Some(relative_strokes(score.strokes, hole.par))
    }
}

/// Runs a persistence sequence under the gateway timeout. On any failure the
/// gateway's staged writes are discarded so nothing half-done is saved later.
async fn persist_within<T, F>(
    gateway: &dyn PersistenceGateway,
    limit: Duration,
    work: F,
) -> Result<T, TrackerError>
where
    F: Future<Output = Result<T, PersistenceError>>,
{
    let outcome = match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::Timeout(limit)),
    };

    match outcome {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!("persistence failed: {}", err);
            gateway.discard().await;
            Err(TrackerError::PersistenceFailed(err))
        }
    }
}

/// Owns the lifecycle of one active round.
///
/// Mutating operations take `&mut self`, so a tracker is serialised by
/// construction; share it behind an async mutex when several tasks need it.
/// In-memory state only changes after the gateway confirms the save, so an
/// error or a cancelled call leaves the previous state in place.
pub struct RoundTracker {
    gateway: Arc<dyn PersistenceGateway>,
    persist_timeout: Duration,
    active: Option<ActiveRound>,
}

impl RoundTracker {
    /// `gateway` must not be shared with another tracker: its staged writes
    /// would be saved or discarded by whichever tracker acts next.
    pub fn new(gateway: Arc<dyn PersistenceGateway>, persist_timeout: Duration) -> Self {
        Self {
            gateway,
            persist_timeout,
            active: None,
        }
    }

    pub async fn start_round(&mut self, course: Arc<Course>) -> Result<&Round, TrackerError> {
        self.start_round_with_type(course, RoundType::StrokePlay).await
    }

    pub async fn start_round_with_type(
        &mut self,
        course: Arc<Course>,
        round_type: RoundType,
    ) -> Result<&Round, TrackerError> {
        if course.holes.is_empty() {
            return Err(TrackerError::EmptyCourse(course.id.clone()));
        }
        course
            .validate()
            .map_err(|reason| TrackerError::InvalidCourse(format!("{}: {reason}", course.id)))?;

        let mut hole_numbers: Vec<u32> = course.holes.iter().map(|h| h.number).collect();
        hole_numbers.sort_unstable();

        let gateway = self.gateway.as_ref();
        gateway.discard().await;

        let new_round = NewRound {
            course_id: course.id.clone(),
            started_at: Utc::now(),
            starting_hole: 1,
            total_holes: course.hole_count(),
            round_type,
        };

        let round = persist_within(gateway, self.persist_timeout, async {
            let mut round = gateway.create_round(new_round).await?;
            for number in &hole_numbers {
                let score = gateway.create_hole_score(&round.id, *number, 0, 0).await?;
                round.hole_scores.push(score);
            }
            gateway.save().await?;
            Ok::<_, PersistenceError>(round)
        })
        .await?;

        info!(
            "Started round {} on {} ({} holes)",
            round.id, course.name, round.total_holes
        );

        let active = self.active.insert(ActiveRound {
            round,
            course,
            current_hole: 1,
            stats: RoundStats::default(),
        });
        Ok(&active.round)
    }

    /// Looks the course up in `catalog` and starts a stroke-play round on it.
    pub async fn start_round_for(
        &mut self,
        catalog: &dyn CourseCatalog,
        course_id: &str,
    ) -> Result<&Round, TrackerError> {
        let course = catalog.get_course(course_id).await?;
        self.start_round(course).await
    }

    /// Reloads a persisted round, e.g. after a restart. The current hole is the
    /// first one without a played score.
    pub async fn resume(
        &mut self,
        catalog: &dyn CourseCatalog,
        round_id: &str,
    ) -> Result<TrackerState, TrackerError> {
        let gateway = self.gateway.as_ref();
        let round = persist_within(gateway, self.persist_timeout, gateway.load_round(round_id))
            .await?
            .ok_or_else(|| TrackerError::RoundNotFound(round_id.to_string()))?;
        let course = catalog.get_course(&round.course_id).await?;

        let current_hole = if round.is_complete {
            round.total_holes
        } else {
            round.first_unplayed_hole().unwrap_or(round.total_holes)
        };
        let stats = RoundStats::from_scores(&round.hole_scores, &course);

        info!("Resumed round {} at hole {}", round.id, current_hole);
        self.active = Some(ActiveRound {
            round,
            course,
            current_hole,
            stats,
        });
        Ok(self.state())
    }

    /// Records the score for the current hole, then advances to the next hole
    /// or completes the round when this was the last one.
    pub async fn record_hole_score(&mut self, entry: ScoreEntry) -> Result<TrackerState, TrackerError> {
        let Some(active) = self.active.as_mut() else {
            return Err(TrackerError::NoActiveRound);
        };
        if active.round.is_complete {
            return Err(TrackerError::RoundComplete);
        }
        entry.validate()?;

        let hole_number = active.current_hole;
        let score = entry.into_hole_score(hole_number);

        let mut next = active.round.clone();
        next.put_hole_score(score.clone());
        let stats = RoundStats::from_scores(&next.hole_scores, &active.course);
        let completes = hole_number >= next.total_holes;
        let now = Utc::now();

        let gateway = self.gateway.as_ref();
        gateway.discard().await;
        persist_within(gateway, self.persist_timeout, async {
            gateway.update_hole_score(&next.id, &score).await?;
            if completes {
                gateway.complete_round(&next.id, stats.totals(), now).await?;
            }
            gateway.save().await
        })
        .await?;

        debug!(
            "Recorded hole {}: {} strokes, {} putts",
            hole_number, score.strokes, score.putts
        );

        if completes {
            next.is_complete = true;
            next.totals = stats.totals();
            next.completed_at = Some(now);
            info!(
                "Round {} complete: {} strokes ({})",
                next.id,
                stats.total_strokes,
                score_display(stats.total_score(active.course.par))
            );
        } else {
            active.current_hole += 1;
        }
        active.round = next;
        active.stats = stats;

        Ok(self.state())
    }

    /// Moves the cursor to hole `n` without touching any score.
    pub fn navigate_to_hole(&mut self, n: u32) -> Result<(), TrackerError> {
        let Some(active) = self.active.as_mut() else {
            return Err(TrackerError::NoActiveRound);
        };
        if n < 1 || n > active.round.total_holes {
            return Err(TrackerError::InvalidHoleNumber(n));
        }
        debug!("Navigated from hole {} to hole {}", active.current_hole, n);
        active.current_hole = n;
        Ok(())
    }

    pub fn state(&self) -> TrackerState {
        match &self.active {
            None => TrackerState::Idle,
            Some(active) if active.round.is_complete => TrackerState::Complete,
            Some(_) => TrackerState::InProgress,
        }
    }

    pub fn round(&self) -> Option<&Round> {
        self.active.as_ref().map(|a| &a.round)
    }

    pub fn course(&self) -> Option<&Course> {
        self.active.as_ref().map(|a| a.course.as_ref())
    }

    pub fn current_hole(&self) -> Option<u32> {
        self.active.as_ref().map(|a| a.current_hole)
    }

    pub fn hole_score(&self, n: u32) -> Option<&HoleScore> {
        self.active.as_ref()?.round.hole_score(n)
    }

    /// Strokes minus par for a played hole; `None` for unplayed or unknown holes.
    ///
    /// The placeholders created by `start_round` hold zero strokes and count as
    /// unplayed, so every hole past the current one reports `None` until scored.
    pub fn hole_score_relative_to_par(&self, n: u32) -> Option<i32> {
        self.active.as_ref()?.relative_to_par(n)
    }

    pub fn stats(&self) -> RoundStats {
        self.active.as_ref().map(|a| a.stats).unwrap_or_default()
    }

    pub fn total_strokes(&self) -> u32 {
        self.stats().total_strokes
    }

    pub fn total_putts(&self) -> u32 {
        self.stats().total_putts
    }

    pub fn greens_in_regulation(&self) -> u32 {
        self.stats().greens_in_regulation
    }

    pub fn total_par(&self) -> i32 {
        self.active.as_ref().map_or(0, |a| a.course.par)
    }

    pub fn total_score(&self) -> i32 {
        self.stats().total_score(self.total_par())
    }

    pub fn score_display(&self) -> String {
        score_display(self.total_score())
    }

    pub fn average_putts_per_hole(&self) -> f64 {
        self.stats().average_putts_per_hole()
    }

    pub fn greens_in_regulation_percentage(&self) -> f64 {
        self.stats().greens_in_regulation_percentage()
    }

    pub fn summary(&self) -> Option<RoundSummary> {
        let active = self.active.as_ref()?;
        let stats = active.stats;

        let holes = active
            .round
            .hole_scores
            .iter()
            .map(|score| {
                let relative = active.relative_to_par(score.hole_number);
                HoleLine {
                    hole_number: score.hole_number,
                    par: active.course.hole(score.hole_number).map(|h| h.par),
                    strokes: score.strokes,
                    putts: score.putts,
                    green_in_regulation: score.green_in_regulation,
                    relative_to_par: relative,
                    score_name: relative.map(ScoreName::from_relative),
                }
            })
            .collect();

        Some(RoundSummary {
            round_id: active.round.id.clone(),
            course_id: active.course.id.clone(),
            course_name: active.course.name.clone(),
            state: self.state(),
            current_hole: active.current_hole,
            total_holes: active.round.total_holes,
            total_strokes: stats.total_strokes,
            total_putts: stats.total_putts,
            greens_in_regulation: stats.greens_in_regulation,
            total_par: active.course.par,
            total_score: stats.total_score(active.course.par),
            score_display: score_display(stats.total_score(active.course.par)),
            score_through_played: score_display(stats.score_through_played()),
            average_putts_per_hole: stats.average_putts_per_hole(),
            greens_in_regulation_percentage: stats.greens_in_regulation_percentage(),
            holes,
        })
    }
}
