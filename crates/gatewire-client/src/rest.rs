//! Gateway endpoint resolution
//!
//! The REST call that tells the client where to connect and how many
//! session starts remain. The implementation lives with the caller; the
//! engine only consumes this interface.

use async_trait::async_trait;
use std::time::Duration;

/// Remaining session-start allowance reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStartLimit {
    /// Total session starts per reset period
    pub total: u32,
    /// Session starts remaining in the current period
    pub remaining: u32,
    /// Time until the allowance resets
    pub reset_after: Duration,
}

/// Where and how to open the gateway connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoint {
    /// Transport URL to connect to
    pub url: String,
    /// Session-start allowance
    pub session_start_limit: SessionStartLimit,
    /// Shard count the service recommends
    pub recommended_shards: u32,
}

/// Resolves the gateway endpoint via the REST API
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    /// Fetch the current endpoint and session-start allowance
    async fn resolve(&self) -> Result<GatewayEndpoint, anyhow::Error>;
}
