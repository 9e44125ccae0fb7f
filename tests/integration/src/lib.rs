//! Integration test utilities for the gateway client
//!
//! This crate provides an in-process mock gateway (transport, endpoint
//! resolver, event sink) for driving end-to-end connection scenarios
//! without a network.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
