pub mod plank;
pub mod reps;
pub mod smooth;

pub use plank::{format_mm_ss, PlankTick, PlankTimer};
pub use reps::{RepCounter, RepState};
pub use smooth::Smoother;
