//! Content services built on the chat model: poems, CV evaluation and
//! presentation outlines.

mod chat;
mod cv;
mod presentation;

pub use chat::{ChatTurn, StreamingChat};
pub use cv::{default_criteria, CvEvaluationRequest, CvEvaluator, EvaluationCriterion};
pub use presentation::{parse_outline, PresentationPlanner, Slide};
