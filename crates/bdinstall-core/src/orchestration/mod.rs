//! Pipeline orchestration and the interfaces it consumes.

pub mod collaborators;
pub mod pipeline;

pub use collaborators::{Notices, ProcessController, SanityCheck};
pub use pipeline::{
    Collaborators, InstallPipeline, Notice, PipelineReport, PipelineResult, StepRecord,
};
