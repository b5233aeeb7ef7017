pub mod exercise;
pub mod posture;

pub use exercise::{ExerciseAnalyzer, ExerciseReading, Position};
pub use posture::{angle_at, extract_posture, PostureFeature, PostureFeatures};
