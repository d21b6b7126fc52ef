pub mod filesystem;
pub mod memory_write;
pub mod shell;
pub mod stubs;
pub mod web_fetch;

pub use filesystem::{ReadFileTool, WriteFileTool};
pub use memory_write::{MemoryWriteSink, MemoryWriteTool};
pub use shell::ShellTool;
pub use stubs::{McpTool, McpTransport, SubAgentSpawner, SubAgentTool};
pub use web_fetch::WebFetchTool;
