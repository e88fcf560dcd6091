//! Room-scoped signaling relay: registry, relay rules, wire protocol and
//! the TCP runtime around them.

pub mod connection_ids;
pub mod effect;
pub mod errors;
pub mod groups;
pub mod presence_reply;
pub mod protocol;
pub mod registry;
pub mod relay_engine;
pub mod relay_server;
pub mod router;
pub mod run;
pub mod runtime;
pub mod server_event;
pub mod session_state;
pub mod settings;
pub mod transport;

pub use presence_reply::PresenceReply;
pub use relay_engine::RelayEngine;
pub use relay_server::RelayServer;
pub use settings::RelaySettings;
