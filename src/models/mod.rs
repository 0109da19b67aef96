pub mod course;
pub mod round;

pub use course::{Course, Hole, NewCourseRequest, TeeColor, TeeOption};
pub use round::{
    FairwayResult, Hazard, HoleScore, NewRound, Round, RoundTotals, RoundType,
};
