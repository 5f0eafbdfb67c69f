//! Human-pacing simulation: content complexity scoring and the evasion
//! timing model that turns a chapter into a sequence of delays.

mod complexity;
mod model;

pub use complexity::complexity_score;
pub use model::{
    DelayKind, DelayStep, PacingPlan, is_special_title, plan_chapter, time_of_day_factor,
};
