//! Generation execution
//!
//! The run state machine, its failure taxonomy, the per-run progress channel,
//! image archiving and the pipeline that ties them together.

pub mod archive;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod stage;

pub use archive::{ArchivedImage, Archiver, StorageArchiver};
pub use error::GenerationError;
pub use pipeline::{revise_for_safety, GenerationPipeline, PipelineDeps, PipelineSettings};
pub use progress::{ProgressEvent, ProgressSender, ProgressStream};
pub use stage::Stage;
