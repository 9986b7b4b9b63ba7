//! Application layer - orchestrates ports into the runtime.
//!
//! - `artifact_loader` resolves the handler's module file
//! - `polling_loop` drives the handler from the input key
//! - `publisher` writes results to the output key
//! - `bootstrap` wires it all together at startup

pub mod artifact_loader;
pub mod bootstrap;
pub mod polling_loop;
pub mod publisher;

pub use artifact_loader::{module_file_names, Artifact, ArtifactError, ArtifactLoader, UnpackError, ARCHIVE_FILE_NAME};
pub use bootstrap::{Runtime, RuntimeBuilder, StartupError};
pub use polling_loop::{CycleError, CycleOutcome, PollingLoop, RunStats};
pub use publisher::{PublishError, PublishReceipt, ResultPublisher};
