//! CLI command modules.

pub mod consumer;
pub mod http;
pub mod producer;
