use serde::{Deserialize, Serialize};

use crate::models::{Course, HoleScore, RoundTotals};

/// Running aggregates over the hole scores of a round.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoundStats {
    pub total_strokes: u32,
    pub total_putts: u32,
    pub greens_in_regulation: u32,
    /// Holes with a played score (placeholders excluded).
    pub holes_played: u32,
    /// Par of the played holes only.
    pub par_played: i32,
}

impl RoundStats {
    pub fn from_scores(scores: &[HoleScore], course: &Course) -> Self {
        scores
            .iter()
            .filter(|s| s.is_played())
            .fold(Self::default(), |mut stats, score| {
                stats.total_strokes = stats.total_strokes.saturating_add(score.strokes);
                stats.total_putts = stats.total_putts.saturating_add(score.putts);
                if score.green_in_regulation {
                    stats.greens_in_regulation += 1;
                }
                stats.holes_played += 1;
                stats.par_played = stats
                    .par_played
                    .saturating_add(course.hole(score.hole_number).map_or(0, |h| h.par));
                stats
            })
    }

    pub fn totals(&self) -> RoundTotals {
        RoundTotals {
            total_strokes: self.total_strokes,
            total_putts: self.total_putts,
            greens_in_regulation: self.greens_in_regulation,
        }
    }

    /// Strokes against the full course par.
    pub fn total_score(&self, total_par: i32) -> i32 {
        relative_strokes(self.total_strokes, total_par)
    }

    /// Strokes against the par of the holes played so far.
    pub fn score_through_played(&self) -> i32 {
        relative_strokes(self.total_strokes, self.par_played)
    }

    pub fn average_putts_per_hole(&self) -> f64 {
        if self.holes_played == 0 {
            return 0.0;
        }
        f64::from(self.total_putts) / f64::from(self.holes_played)
    }

    pub fn greens_in_regulation_percentage(&self) -> f64 {
        if self.holes_played == 0 {
            return 0.0;
        }
        f64::from(self.greens_in_regulation) / f64::from(self.holes_played) * 100.0
    }
}

/// Strokes minus par, saturating instead of wrapping on absurd stroke counts.
pub fn relative_strokes(strokes: u32, par: i32) -> i32 {
    i32::try_from(strokes).unwrap_or(i32::MAX).saturating_sub(par)
}

/// "+N" over par, "-N" under, "E" for even.
pub fn score_display(relative: i32) -> String {
    match relative {
        0 => "E".to_string(),
        n if n > 0 => format!("+{n}"),
        n => n.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ScoreName {
    Condor,
    Albatross,
    Eagle,
    Birdie,
    Par,
    Bogey,
    DoubleBogey,
    TripleBogey,
    Other,
}

impl ScoreName {
    pub fn from_relative(relative: i32) -> Self {
        match relative {
            -4 => Self::Condor,
            -3 => Self::Albatross,
            -2 => Self::Eagle,
            -1 => Self::Birdie,
            0 => Self::Par,
            1 => Self::Bogey,
            2 => Self::DoubleBogey,
            3 => Self::TripleBogey,
            _ => Self::Other,
        }
    }
}

impl From<i32> for ScoreName {
    fn from(value: i32) -> Self {
        Self::from_relative(value)
    }
}
