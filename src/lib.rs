//! Two-player grid battle over a direct TCP link.
//!
//! One side hosts, one joins as guest; the sides exchange game parameters,
//! fleet placements and a strictly alternating run of attacks until one
//! fleet is destroyed. This crate is the session protocol and game-state
//! engine; rendering and input belong to the consuming layer, which drives
//! a [`SessionHandle`] and reads [`SessionEvent`]s.

mod boat;
mod common;
mod config;
mod connection;
mod grid;
mod logging;
pub mod protocol;
mod session;
pub mod transport;

pub use boat::*;
pub use common::*;
pub use config::*;
pub use connection::*;
pub use grid::*;
pub use logging::init_logging;
pub use protocol::*;
pub use session::*;
