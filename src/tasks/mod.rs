//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a map.
//!
//! # Tasks
//! - TTL Sweeper: Evicts expired entries every TTL/2

mod sweeper;

pub use sweeper::Sweeper;
