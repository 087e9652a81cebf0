pub mod cowsay;
pub mod registry;

pub use cowsay::Cowsay;
pub use registry::{ToolDefinition, ToolExecutor, ToolRegistry};
