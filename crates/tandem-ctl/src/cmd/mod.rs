//! CLI command modules.

pub mod http;
pub mod moderation;
pub mod status;
