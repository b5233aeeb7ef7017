pub mod adapter;
pub mod landmark;

pub use adapter::{FrameAdapter, FrameRejection, RawFrame};
pub use landmark::{Landmark, LandmarkFrame, LandmarkIndex};
