//! MCP (Model Context Protocol) server specifications

pub mod spec;

pub use spec::{
    CommandLaunch, DEFAULT_MCP_PATH, DEFAULT_MCP_PORT, LocalTransport, RemoteEndpoint,
    ResolvedServer, ServerKind, ServerLaunch,
};
