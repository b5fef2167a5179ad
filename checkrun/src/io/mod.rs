//! Side-effecting helpers: configuration, tool lookup, discovery, scratch
//! directories and process execution.

pub mod config;
pub mod discovery;
pub mod pipeline;
pub mod scratch;
pub mod tools;
