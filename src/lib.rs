pub mod pipeline;

pub use pipeline::{exit_status, needs_report, AlreadyReported, Pipeline, RunOutcome};
