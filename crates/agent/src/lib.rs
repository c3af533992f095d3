//! Intake runtime and artifact generation.
//!
//! `runtime` drives a conversation from first answer to commit. On commit the
//! `generator` asks the configured language model for a requirements document
//! (`prd`) and merges the collected data entities into the shared OpenAPI
//! contract (`contract`).
//!
//! The model only writes prose. Slot validation, stage transitions and the
//! contract shape are decided deterministically by this crate and `devteam-core`.

pub mod contract;
pub mod generator;
pub mod llm;
pub mod prd;
pub mod providers;
pub mod runtime;

pub use generator::{ArtifactGenerator, GenerationError};
pub use llm::{build_client, generate_json, JsonGeneration, LlmClient, LlmError, ScriptedLlmClient};
pub use runtime::{CommitReport, IntakeRuntime, IntakeStatus, StartedIntake};
