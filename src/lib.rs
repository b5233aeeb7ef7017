pub mod config;
pub mod features;
pub mod mode;
pub mod pose;
pub mod protocol;
pub mod random;
pub mod report;
pub mod scoring;
pub mod session;
pub mod tracker;
