//! etchosts - add and remove host entries in a hosts file.

pub mod cli;
pub mod config;
pub mod error;
pub mod hosts;
pub mod logging;
