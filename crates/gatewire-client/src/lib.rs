//! Gateway connection engine
//!
//! A persistent, auto-reconnecting client for the gateway protocol defined
//! in `gatewire-protocol`. One [`GatewayClient`] owns one logical session
//! across any number of physical connections: it heartbeats on the
//! server-dictated interval, resumes after recoverable drops, identifies
//! fresh when the session is invalidated, and gives up only on errors the
//! protocol marks terminal.
//!
//! The transport, endpoint resolution, credentials, and event consumption
//! are all traits (`transport::Connector`, `rest::EndpointResolver`,
//! `config::TokenSource`, `dispatch::EventSink`), so the engine runs the
//! same against a real WebSocket or an in-process test double.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod queue;
pub mod ratelimit;
pub mod rest;
pub mod session;
pub mod status;
pub mod timing;
pub mod transport;

mod receiver;
mod sender;
mod signals;

pub use client::GatewayClient;
pub use config::{GatewayConfig, TokenSource};
pub use dispatch::EventSink;
pub use error::{Disposition, GatewayError, GatewayResult};
pub use queue::{CommandQueue, PreShutdownHandle, PreShutdownRegistry};
pub use rest::{EndpointResolver, GatewayEndpoint, SessionStartLimit};
pub use session::Session;
pub use status::ConnectionStatus;
pub use timing::HeartbeatTiming;
pub use transport::{
    Connector, TransportError, TransportMessage, TransportReader, TransportWriter, WsConnector,
};
