//! Client configuration
//!
//! Options recognized by the gateway client, with builder-style setters.

use gatewire_protocol::{Identify, IdentifyProperties, Intents, PresenceUpdate, ShardId};
use std::sync::Arc;
use std::time::Duration;

/// Supplies the authentication token for identify/resume payloads
///
/// Kept behind a trait so credential stores can rotate tokens without the
/// client holding a stale copy.
pub trait TokenSource: Send + Sync {
    /// The current token
    fn token(&self) -> String;
}

impl TokenSource for String {
    fn token(&self) -> String {
        self.clone()
    }
}

impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    fn token(&self) -> String {
        (**self).token()
    }
}

/// Gateway client configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Subscribed event categories
    pub intents: Intents,

    /// Shard identification (index/count)
    pub shard: Option<ShardId>,

    /// Member-list threshold above which guilds are considered large
    pub large_threshold: Option<u32>,

    /// Initial presence declared at identify time
    pub presence: Option<PresenceUpdate>,

    /// Client metadata declared at identify time
    pub properties: IdentifyProperties,

    /// Extra slack subtracted from the heartbeat deadline so a beat is never
    /// sent at the last possible instant
    pub heartbeat_safety_margin: Duration,

    /// Floor the safety margin never drops below, whatever is configured
    pub min_safety_margin: Duration,

    /// Command ceiling per rate-limit window
    pub commands_per_window: u16,

    /// Rate-limit slots reserved for heartbeats beyond the strict minimum
    pub heartbeat_headroom: u16,

    /// Treat unknown dispatch events as decode errors instead of tolerating
    /// them (useful for protocol-conformance testing)
    pub strict_decoding: bool,
}

impl GatewayConfig {
    /// Default heartbeat safety margin
    pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(500);

    /// Default minimum safety margin floor
    pub const DEFAULT_MIN_MARGIN: Duration = Duration::from_millis(100);

    /// Default command ceiling per rate-limit window
    pub const DEFAULT_COMMANDS_PER_WINDOW: u16 = 120;

    /// Default heartbeat headroom slots
    pub const DEFAULT_HEARTBEAT_HEADROOM: u16 = 4;

    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            intents: Intents::default(),
            shard: None,
            large_threshold: None,
            presence: None,
            properties: IdentifyProperties::this_device(),
            heartbeat_safety_margin: Self::DEFAULT_SAFETY_MARGIN,
            min_safety_margin: Self::DEFAULT_MIN_MARGIN,
            commands_per_window: Self::DEFAULT_COMMANDS_PER_WINDOW,
            heartbeat_headroom: Self::DEFAULT_HEARTBEAT_HEADROOM,
            strict_decoding: false,
        }
    }

    /// Set the subscribed event categories
    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    /// Set the shard identification
    #[must_use]
    pub fn with_shard(mut self, index: u32, count: u32) -> Self {
        self.shard = Some(ShardId { index, count });
        self
    }

    /// Set the large-guild member threshold
    #[must_use]
    pub fn with_large_threshold(mut self, threshold: u32) -> Self {
        self.large_threshold = Some(threshold);
        self
    }

    /// Set the initial presence
    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdate) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Set the declared client metadata
    #[must_use]
    pub fn with_properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Set the heartbeat safety margin
    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.heartbeat_safety_margin = margin;
        self
    }

    /// Set the heartbeat headroom slots
    #[must_use]
    pub fn with_heartbeat_headroom(mut self, slots: u16) -> Self {
        self.heartbeat_headroom = slots;
        self
    }

    /// Enable strict decoding (unknown events become errors)
    #[must_use]
    pub fn with_strict_decoding(mut self) -> Self {
        self.strict_decoding = true;
        self
    }

    /// Build the identify payload for a fresh session
    #[must_use]
    pub fn identify_payload(&self, token: String) -> Identify {
        Identify {
            token,
            properties: self.properties.clone(),
            intents: self.intents,
            shard: self.shard,
            large_threshold: self.large_threshold,
            presence: self.presence.clone(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}
