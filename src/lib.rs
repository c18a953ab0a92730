//! skuctl - interactive Microsoft 365 license management.
//!
//! Assigns and removes licenses for single users, user lists, groups and
//! group lists, using a local reference table to turn product identifiers
//! into friendly names and service plan lists.

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod state;
