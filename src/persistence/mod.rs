//! Durable storage for rounds and hole scores.
//!
//! Gateways follow a unit-of-work model: the `create_*`, `update_*` and
//! `complete_*` calls only stage writes, and `save` applies everything staged
//! so far atomically. A failed `save` rolls back and drops the staged writes.

mod memory;

pub use memory::MemoryGateway;

use std::mem;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::PersistenceError;
use crate::models::{HoleScore, NewRound, Round, RoundTotals};

/// Staged writes live on the gateway itself, so a gateway must have a single
/// writer. Give every `RoundTracker` its own gateway; several `SqliteGateway`s
/// can share one pool. Reads (`load_round`, `list_rounds`) are safe from
/// anywhere.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Stages a new round and returns it with its assigned identity and no
    /// hole scores.
    async fn create_round(&self, new_round: NewRound) -> Result<Round, PersistenceError>;

    async fn create_hole_score(
        &self,
        round_id: &str,
        hole_number: u32,
        strokes: u32,
        putts: u32,
    ) -> Result<HoleScore, PersistenceError>;

    async fn update_hole_score(&self, round_id: &str, score: &HoleScore)
    -> Result<(), PersistenceError>;

    async fn complete_round(
        &self,
        round_id: &str,
        totals: RoundTotals,
        completed_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    /// Applies all staged writes. Calling it with nothing staged is a no-op.
    async fn save(&self) -> Result<(), PersistenceError>;

    /// Drops staged writes without applying them.
    async fn discard(&self);

    async fn load_round(&self, round_id: &str) -> Result<Option<Round>, PersistenceError>;

    async fn list_rounds(&self) -> Result<Vec<Round>, PersistenceError>;
}

#[derive(Debug, Clone)]
pub(crate) enum PendingWrite {
    InsertRound(Round),
    PutHoleScore {
        round_id: String,
        score: HoleScore,
    },
    CompleteRound {
        round_id: String,
        totals: RoundTotals,
        completed_at: DateTime<Utc>,
    },
}

/// Staging area shared by the gateway implementations.
#[derive(Default)]
pub(crate) struct Staged {
    writes: Mutex<Vec<PendingWrite>>,
}

impl Staged {
    pub(crate) async fn push(&self, write: PendingWrite) {
        self.writes.lock().await.push(write);
    }

    pub(crate) async fn take(&self) -> Vec<PendingWrite> {
        mem::take(&mut *self.writes.lock().await)
    }

    pub(crate) async fn clear(&self) {
        self.writes.lock().await.clear();
    }
}

pub(crate) fn new_round_record(new_round: NewRound) -> Round {
    Round {
        id: Uuid::new_v4().to_string(),
        course_id: new_round.course_id,
        started_at: new_round.started_at,
        starting_hole: new_round.starting_hole,
        total_holes: new_round.total_holes,
        round_type: new_round.round_type,
        is_complete: false,
        totals: RoundTotals::default(),
        completed_at: None,
        hole_scores: Vec::new(),
    }
}

pub(crate) fn new_hole_score(hole_number: u32, strokes: u32, putts: u32) -> HoleScore {
    HoleScore {
        strokes,
        putts,
        ..HoleScore::placeholder(hole_number)
    }
}

pub struct SqliteGateway {
    db: SqlitePool,
    staged: Staged,
}

impl SqliteGateway {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            staged: Staged::default(),
        }
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn create_round(&self, new_round: NewRound) -> Result<Round, PersistenceError> {
        let round = new_round_record(new_round);
        self.staged.push(PendingWrite::InsertRound(round.clone())).await;
        Ok(round)
    }

    async fn create_hole_score(
        &self,
        round_id: &str,
        hole_number: u32,
        strokes: u32,
        putts: u32,
    ) -> Result<HoleScore, PersistenceError> {
        let score = new_hole_score(hole_number, strokes, putts);
        self.staged
            .push(PendingWrite::PutHoleScore {
                round_id: round_id.to_string(),
                score: score.clone(),
            })
            .await;
        Ok(score)
    }

    async fn update_hole_score(
        &self,
        round_id: &str,
        score: &HoleScore,
    ) -> Result<(), PersistenceError> {
        self.staged
            .push(PendingWrite::PutHoleScore {
                round_id: round_id.to_string(),
                score: score.clone(),
            })
            .await;
        Ok(())
    }

    async fn complete_round(
        &self,
        round_id: &str,
        totals: RoundTotals,
        completed_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.staged
            .push(PendingWrite::CompleteRound {
                round_id: round_id.to_string(),
                totals,
                completed_at,
            })
            .await;
        Ok(())
    }

    async fn save(&self) -> Result<(), PersistenceError> {
        let writes = self.staged.take().await;
        if writes.is_empty() {
            return Ok(());
        }

        let count = writes.len();
        // Dropping the transaction on error or cancellation rolls it back.
        let mut tx = self.db.begin().await?;
        for write in writes {
            match write {
                PendingWrite::InsertRound(round) => {
                    repository::insert_round(&mut tx, &round).await?;
                }
                PendingWrite::PutHoleScore { round_id, score } => {
                    repository::upsert_hole_score(&mut tx, &round_id, &score).await?;
                }
                PendingWrite::CompleteRound {
                    round_id,
                    totals,
                    completed_at,
                } => {
                    let updated =
                        repository::complete_round(&mut tx, &round_id, &totals, completed_at)
                            .await?;
                    if !updated {
                        warn!("complete_round matched no row for round {}", round_id);
                        return Err(PersistenceError::Corrupt(format!(
                            "round {round_id} does not exist"
                        )));
                    }
                }
            }
        }
        tx.commit().await?;
        debug!("saved {} staged writes", count);
        Ok(())
    }

    async fn discard(&self) {
        self.staged.clear().await;
    }

    async fn load_round(&self, round_id: &str) -> Result<Option<Round>, PersistenceError> {
        Ok(repository::find_round_by_id(&self.db, round_id).await?)
    }

    async fn list_rounds(&self) -> Result<Vec<Round>, PersistenceError> {
        Ok(repository::fetch_rounds(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::RoundType;

    fn nine_hole_round() -> NewRound {
        NewRound {
            course_id: "c1".to_string(),
            started_at: Utc::now(),
            starting_hole: 1,
            total_holes: 9,
            round_type: RoundType::StrokePlay,
        }
    }

    #[tokio::test]
    async fn staged_writes_are_invisible_until_saved() {
        let pool = db::connect_memory().await.expect("Failed to create test db");
        let gateway = SqliteGateway::new(pool);

        let round = gateway.create_round(nine_hole_round()).await.expect("create");
        for n in 1..=9 {
            gateway
                .create_hole_score(&round.id, n, 0, 0)
                .await
                .expect("hole score");
        }
        assert!(gateway.load_round(&round.id).await.expect("load").is_none());

        gateway.save().await.expect("save");
        let stored = gateway
            .load_round(&round.id)
            .await
            .expect("load")
            .expect("round saved");
        assert_eq!(stored.hole_scores.len(), 9);

        // Nothing staged: save is a no-op.
        gateway.save().await.expect("second save");
    }

    #[tokio::test]
    async fn discard_drops_staged_writes() {
        let pool = db::connect_memory().await.expect("Failed to create test db");
        let gateway = SqliteGateway::new(pool);

        let round = gateway.create_round(nine_hole_round()).await.expect("create");
        gateway.discard().await;
        gateway.save().await.expect("save");
        assert!(gateway.load_round(&round.id).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn failed_save_rolls_back_everything() {
        let pool = db::connect_memory().await.expect("Failed to create test db");
        let gateway = SqliteGateway::new(pool);

        let round = gateway.create_round(nine_hole_round()).await.expect("create");
        gateway
            .complete_round("missing", RoundTotals::default(), Utc::now())
            .await
            .expect("stage");
        assert!(matches!(
            gateway.save().await,
            Err(PersistenceError::Corrupt(_))
        ));
        assert!(gateway.load_round(&round.id).await.expect("load").is_none());
        assert!(gateway.list_rounds().await.expect("list").is_empty());
    }
}
