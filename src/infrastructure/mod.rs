pub mod artifacts;
pub mod cache;
pub mod queue;
pub mod upstream;
