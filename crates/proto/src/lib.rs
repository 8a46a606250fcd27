//! Wire types shared by the MCP server and its clients.

pub mod methods;

pub use methods::*;
