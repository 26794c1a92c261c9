//! Pipeline orchestration for pressroom.
//!
//! This crate ties the knowledge store, tool layer and topic scheduler
//! together into end-to-end editorial runs:
//! - [`stage`]: stage definitions and tool bindings
//! - [`context`]: the append-only bundle of stage outputs
//! - [`pipeline`]: graph validation and sequential execution
//! - [`editorial`]: the default eight-stage pipeline
//! - [`export`]: Markdown and JSON run export
//! - [`agency`]: the process-wide [`Agency`] context

pub mod agency;
pub mod context;
pub mod editorial;
pub mod export;
pub mod pipeline;
pub mod stage;

pub use agency::{Agency, CycleReport, RunOutcome};
pub use context::{ContextBundle, StageInput, StageOutput};
pub use editorial::{EditorialOptions, editorial_pipeline, editorial_stages};
pub use export::{ExportPaths, export_run};
pub use pipeline::{Pipeline, PipelineRun, ProgressReporter, RunStatus, SilentProgress};
pub use stage::{Stage, StageId, ToolBinding};
