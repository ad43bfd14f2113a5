//! `pw-plugin-sdk`: the plugin side of the subprocess-plugin protocol.
//!
//! A host launches the plugin with a negotiated environment, waits for the
//! handshake on descriptor 3, then drives it over one of two transports.
//! Plugin authors supply a [`CommandHandler`]; the SDK handles negotiation,
//! the handshake, the lifecycle service, health checks, and both wire
//! protocols.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Your plugin binary                                          │
//! │                                                              │
//! │   let plugin = PluginBuilder::new(MyCommands)                │
//! │       .version("1.0.0")                                      │
//! │       .build()?;               // env + version checked here │
//! │   let startup = StartupContext::from_reserved_fd()?;         │
//! │   let code = plugin.run(startup).await?;                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Startup flow
//!
//! 1. Read the negotiated environment; pick the role (server or client)
//! 2. Check the requested version against the compiled one
//! 3. Bind the binary listener, or dial the host over WebSocket
//! 4. Register the lifecycle and health services
//! 5. Emit `CoreVersion`, `Version`, `Address`, `RPCProtocol`, `DONE:`
//! 6. Serve: `Initialization`, then `Deploy("command")` brings the command
//!    service up on the live listener; `UnInitialization` drains and stops
//!
//! Steps 1 and 2 fail before any socket exists.

pub mod builder;
pub mod command;
pub mod dispatch;
pub mod environment;
pub mod handler;
pub mod health;
pub mod lifecycle;
pub mod negotiation;
pub mod plugin;
pub mod registry;
pub mod service;
pub mod startup;
pub mod transport;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::PluginBuilder;
pub use dispatch::Dispatcher;
pub use environment::{ClientEnvironment, NegotiatedEnvironment, ServerEnvironment};
pub use handler::{CommandHandler, CommandOutcome};
pub use lifecycle::{LifecycleService, LifecycleState};
pub use negotiation::{negotiate, Negotiated, Role};
pub use plugin::{Plugin, StopHandle};
pub use registry::ServiceRegistry;
pub use service::Service;
pub use startup::StartupContext;
pub use transport::{Transport, TransportSettings};
pub use types::{CommandError, PluginError, TransportError};

// Re-export protocol types so plugins never need to import pw-protocol directly.
pub use pw_protocol::{
    Address, ErrorStatus, Fault, FaultCode, PluginInfo, ProtocolId, ProtocolSet, ServingStatus,
};
