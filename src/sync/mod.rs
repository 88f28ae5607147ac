pub mod diff;
pub mod engine;
pub mod progress;
pub mod verification;
