//! CLI command implementations.

pub mod common;
pub mod devices;
pub mod info;
pub mod modules;
pub mod realtime;
pub mod render;
