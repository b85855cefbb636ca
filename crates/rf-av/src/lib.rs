//! External encoder integration: tool discovery, command execution, source
//! probing, and the encode runner with live progress extraction.

pub mod command;
pub mod probe;
pub mod runner;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use probe::{probe_source, SourceInfo};
pub use runner::{EncodeRunner, RunOutcome, RunnerHooks};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
