//! In-process driver for a small `ringcache` cluster: wires up a handful of
//! nodes over the loopback HTTP transport, replays synthetic traffic through
//! them, and reports hit-rate and routing statistics.

pub mod generator;
pub mod models;
pub mod runner;
