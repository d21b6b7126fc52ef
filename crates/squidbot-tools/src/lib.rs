pub mod builtin;
pub mod registry;
pub mod tool;

pub use builtin::{
    MemoryWriteSink, MemoryWriteTool, McpTool, McpTransport, ReadFileTool, ShellTool,
    SubAgentSpawner, SubAgentTool, WebFetchTool, WriteFileTool,
};
pub use registry::ToolRegistry;
pub use tool::Tool;
