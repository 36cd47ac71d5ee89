//! Client-facing surfaces: the local REPL and the HTTP tool endpoint.

pub mod cli;
pub mod http;

pub use cli::CliChannel;
pub use http::{HttpState, http_routes};
