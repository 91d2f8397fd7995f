pub mod agent;
pub mod formatter;
pub mod prompt;
pub mod tool_call;

pub use agent::ReActAgent;
pub use tool_call::{find_all_tool_calls, parse_tool_call, tool_id};
