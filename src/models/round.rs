use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    #[default]
    StrokePlay,
    MatchPlay,
}

impl RoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundType::StrokePlay => "stroke_play",
            RoundType::MatchPlay => "match_play",
        }
    }
}

impl FromStr for RoundType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stroke_play" => Ok(RoundType::StrokePlay),
            "match_play" => Ok(RoundType::MatchPlay),
            other => Err(format!("unknown round type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairwayResult {
    Hit,
    Left,
    Right,
}

impl FairwayResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            FairwayResult::Hit => "hit",
            FairwayResult::Left => "left",
            FairwayResult::Right => "right",
        }
    }
}

impl FromStr for FairwayResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hit" => Ok(FairwayResult::Hit),
            "left" => Ok(FairwayResult::Left),
            "right" => Ok(FairwayResult::Right),
            other => Err(format!("unknown fairway result: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    Penalty,
    Sand,
    Water,
}

impl Hazard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hazard::Penalty => "penalty",
            Hazard::Sand => "sand",
            Hazard::Water => "water",
        }
    }
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hazard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "penalty" => Ok(Hazard::Penalty),
            "sand" => Ok(Hazard::Sand),
            "water" => Ok(Hazard::Water),
            other => Err(format!("unknown hazard: {other}")),
        }
    }
}

/// Outcome of one hole. `strokes == 0` marks a placeholder that has not been
/// played yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleScore {
    pub hole_number: u32,
    pub strokes: u32,
    pub putts: u32,
    pub green_in_regulation: bool,
    pub fairway: Option<FairwayResult>,
    #[serde(default)]
    pub hazards: BTreeSet<Hazard>,
}

impl HoleScore {
    pub fn placeholder(hole_number: u32) -> Self {
        Self {
            hole_number,
            strokes: 0,
            putts: 0,
            green_in_regulation: false,
            fairway: None,
            hazards: BTreeSet::new(),
        }
    }

    pub fn is_played(&self) -> bool {
        self.strokes > 0
    }
}

/// Aggregates stamped onto a round when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundTotals {
    pub total_strokes: u32,
    pub total_putts: u32,
    pub greens_in_regulation: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    pub course_id: String,
    pub started_at: DateTime<Utc>,
    pub starting_hole: u32,
    pub total_holes: u32,
    pub round_type: RoundType,
    pub is_complete: bool,
    pub totals: RoundTotals,
    pub completed_at: Option<DateTime<Utc>>,
    pub hole_scores: Vec<HoleScore>,
}

impl Round {
    pub fn hole_score(&self, hole_number: u32) -> Option<&HoleScore> {
        self.hole_scores.iter().find(|s| s.hole_number == hole_number)
    }

    /// Replaces the entry for the score's hole, or inserts it keeping the
    /// collection ordered by hole number.
    pub fn put_hole_score(&mut self, score: HoleScore) {
        match self
            .hole_scores
            .binary_search_by_key(&score.hole_number, |s| s.hole_number)
        {
            Ok(idx) => self.hole_scores[idx] = score,
            Err(idx) => self.hole_scores.insert(idx, score),
        }
    }

    /// First hole without a played score, or `None` once every hole is in.
    pub fn first_unplayed_hole(&self) -> Option<u32> {
        (self.starting_hole..=self.total_holes)
            .find(|n| !self.hole_score(*n).is_some_and(HoleScore::is_played))
    }
}

/// Values needed to open a new round; the gateway assigns identity.
#[derive(Debug, Clone)]
pub struct NewRound {
    pub course_id: String,
    pub started_at: DateTime<Utc>,
    pub starting_hole: u32,
    pub total_holes: u32,
    pub round_type: RoundType,
}

#[derive(Debug, Clone, FromRow)]
pub struct RoundRow {
    pub id: String,
    pub course_id: String,
    pub started_at: String,
    pub starting_hole: i64,
    pub total_holes: i64,
    pub round_type: String,
    pub is_complete: bool,
    pub total_strokes: i64,
    pub total_putts: i64,
    pub greens_in_regulation: i64,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct HoleScoreRow {
    pub round_id: String,
    pub hole_number: i64,
    pub strokes: i64,
    pub putts: i64,
    pub green_in_regulation: bool,
    pub fairway: Option<String>,
    pub hazards: String,
}

pub fn hazards_to_text(hazards: &BTreeSet<Hazard>) -> String {
    hazards
        .iter()
        .map(Hazard::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn hazards_from_text(text: &str) -> Result<BTreeSet<Hazard>, String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Hazard::from_str)
        .collect()
}
