//! Host process of a desktop time tracker for legal professionals.
//! It keeps clients and their time entries in a local json store and serves them to the
//! front-end window over a line based json channel.
//!

pub mod cli;
pub mod fs;
pub mod host;
pub mod utils;
