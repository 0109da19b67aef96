use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{PendingWrite, PersistenceGateway, Staged, new_hole_score, new_round_record};
use crate::error::PersistenceError;
use crate::models::{HoleScore, NewRound, Round, RoundTotals};

/// Gateway backed by a map, with switches to simulate a failing or slow store.
#[derive(Default)]
pub struct MemoryGateway {
    rounds: Mutex<BTreeMap<String, Round>>,
    staged: Staged,
    fail_saves: AtomicBool,
    save_delay: Mutex<Option<Duration>>,
    saves: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every `save` fails with `Unavailable` and drops staged writes.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn set_save_delay(&self, delay: Option<Duration>) {
        *self.save_delay.lock().await = delay;
    }

    /// Number of saves that committed at least one write.
    pub fn committed_saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

fn apply(rounds: &mut BTreeMap<String, Round>, write: PendingWrite) -> Result<(), PersistenceError> {
    match write {
        PendingWrite::InsertRound(round) => {
            rounds.insert(round.id.clone(), round);
        }
        PendingWrite::PutHoleScore { round_id, score } => {
            let round = rounds.get_mut(&round_id).ok_or_else(|| {
                PersistenceError::Corrupt(format!("round {round_id} does not exist"))
            })?;
            round.put_hole_score(score);
        }
        PendingWrite::CompleteRound {
            round_id,
            totals,
            completed_at,
        } => {
            let round = rounds.get_mut(&round_id).ok_or_else(|| {
                PersistenceError::Corrupt(format!("round {round_id} does not exist"))
            })?;
            round.is_complete = true;
            round.totals = totals;
            round.completed_at = Some(completed_at);
        }
    }
    Ok(())
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
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

        let delay = *self.save_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "memory store rejected the save".to_string(),
            ));
        }
        if writes.is_empty() {
            return Ok(());
        }

        let mut rounds = self.rounds.lock().await;
        let mut next = rounds.clone();
        for write in writes {
            apply(&mut next, write)?;
        }
        *rounds = next;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn discard(&self) {
        self.staged.clear().await;
    }

    async fn load_round(&self, round_id: &str) -> Result<Option<Round>, PersistenceError> {
        Ok(self.rounds.lock().await.get(round_id).cloned())
    }

    async fn list_rounds(&self) -> Result<Vec<Round>, PersistenceError> {
        let mut rounds: Vec<Round> = self.rounds.lock().await.values().cloned().collect();
        rounds.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(rounds)
    }
}
