//! Rigcraft CLI library
//!
//! Command implementations live here so they can be integration-tested;
//! `main.rs` only parses arguments and dispatches.

pub mod commands;
pub mod input;
