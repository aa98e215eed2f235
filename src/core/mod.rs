pub mod classifier;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod guard;
pub mod scoring;
pub mod traits;
pub mod workspace;
