// src/extractors/mod.rs
pub mod normalizer;
pub mod pipeline;
pub mod record;
pub mod section;
pub mod segmenter;

// Re-export key extraction types for convenience
pub use pipeline::{Pipeline, PipelineOutput};
