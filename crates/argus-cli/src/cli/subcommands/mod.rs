mod sources;
mod workflow;

pub use sources::SourceCommands;
pub use workflow::{EditArgs, WorkflowCommands};
