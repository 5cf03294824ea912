#![warn(rust_2018_idioms)]

pub mod configuration;
mod description_applier;
mod description_builder;
pub mod error;
pub mod fingerprint;
pub mod ice_credentials;
mod negotiation;
pub mod peer_connection;
pub mod sdp;
pub mod state;
mod state_collator;
mod task_queue;
pub mod transceiver;
pub mod transport;

pub use configuration::{IceServer, RTCConfiguration};
pub use error::{Error, Result};
pub use peer_connection::{Event, PeerConnection};
