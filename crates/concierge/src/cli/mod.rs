//! Command-line interface: offline jobs and server client commands

pub mod client;
pub mod commands;
pub mod display;
