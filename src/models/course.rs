use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub location: String,
    pub par: i32,
    pub total_yardage: Option<i32>,
    pub holes: Vec<Hole>,
    #[serde(default)]
    pub tees: Vec<TeeOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hole {
    pub number: u32,
    pub par: i32,
    pub yardage: i32,
    pub handicap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeeOption {
    pub name: String,
    pub color: TeeColor,
    pub yardages: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeeColor {
    White,
    Blue,
    Red,
    Gold,
    Black,
}

impl TeeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeeColor::White => "white",
            TeeColor::Blue => "blue",
            TeeColor::Red => "red",
            TeeColor::Gold => "gold",
            TeeColor::Black => "black",
        }
    }
}

impl fmt::Display for TeeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeeColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(TeeColor::White),
            "blue" => Ok(TeeColor::Blue),
            "red" => Ok(TeeColor::Red),
            "gold" => Ok(TeeColor::Gold),
            "black" => Ok(TeeColor::Black),
            other => Err(format!("unknown tee color: {other}")),
        }
    }
}

/// Body of a course creation request; the catalog assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    pub location: String,
    pub par: i32,
    pub total_yardage: Option<i32>,
    pub holes: Vec<Hole>,
    #[serde(default)]
    pub tees: Vec<TeeOption>,
}

impl NewCourseRequest {
    pub fn into_course(self, id: String) -> Course {
        Course {
            id,
            name: self.name,
            location: self.location,
            par: self.par,
            total_yardage: self.total_yardage,
            holes: self.holes,
            tees: self.tees,
        }
    }
}

impl Course {
    pub fn hole_count(&self) -> u32 {
        self.holes.len() as u32
    }

    pub fn hole(&self, number: u32) -> Option<&Hole> {
        self.holes.iter().find(|h| h.number == number)
    }

    pub fn par_of_holes(&self) -> i32 {
        self.holes.iter().map(|h| h.par).sum()
    }

    pub fn tee(&self, name: &str) -> Option<&TeeOption> {
        self.tees.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Yardage of `hole` played from the named tee, falling back to the
    /// hole's canonical yardage when the tee has no entry for it.
    pub fn yardage_for(&self, tee_name: &str, hole: u32) -> Option<i32> {
        let canonical = self.hole(hole)?.yardage;
        let from_tee = self
            .tee(tee_name)
            .and_then(|t| t.yardages.get(hole.checked_sub(1)? as usize).copied());
        Some(from_tee.unwrap_or(canonical))
    }

    pub fn tee_total_yardage(&self, tee_name: &str) -> Option<i32> {
        self.tee(tee_name).map(|t| t.yardages.iter().sum())
    }

    /// Structural checks applied before a course enters the catalog.
    ///
    /// A par total that disagrees with the per-hole pars is not an error here;
    /// callers decide whether to warn about it.
    pub fn validate(&self) -> Result<(), String> {
        let count = self.holes.len();
        if count != 9 && count != 18 {
            return Err(format!("course must have 9 or 18 holes, found {count}"));
        }

        let mut numbers: Vec<u32> = self.holes.iter().map(|h| h.number).collect();
        numbers.sort_unstable();
        if numbers.iter().enumerate().any(|(i, n)| *n != i as u32 + 1) {
            return Err("hole numbers must be unique and contiguous from 1".to_string());
        }

        let mut seen = HashSet::new();
        for hole in &self.holes {
            if hole.handicap == 0 || hole.handicap as usize > count {
                return Err(format!(
                    "hole {} handicap {} is outside 1..={count}",
                    hole.number, hole.handicap
                ));
            }
            if !seen.insert(hole.handicap) {
                return Err(format!("handicap ranking {} is used twice", hole.handicap));
            }
            if hole.par <= 0 {
                return Err(format!("hole {} has non-positive par", hole.number));
            }
        }

        for tee in &self.tees {
            if tee.yardages.len() != count {
                return Err(format!(
                    "tee '{}' lists {} yardages for {count} holes",
                    tee.name,
                    tee.yardages.len()
                ));
            }
        }

        Ok(())
    }

    /// Holes sorted by number, the order every consumer relies on.
    pub fn normalize(&mut self) {
        self.holes.sort_by_key(|h| h.number);
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
    pub id: String,
    pub name: String,
    pub location: String,
    pub par: i64,
    pub total_yardage: Option<i64>,
    pub updated_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct HoleRow {
    pub course_id: String,
    pub number: i64,
    pub par: i64,
    pub yardage: i64,
    pub handicap: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct TeeRow {
    pub course_id: String,
    pub name: String,
    pub color: String,
    pub yardages: String,
}
