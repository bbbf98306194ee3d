//! 802.11 Soft AP control-plane core: Station state machines, the 4-Way
//! Handshake authenticator orchestration, and the WSC Push-Button
//! Configuration registrar.
//!
//! This crate owns frame parsing/building, the per-Station state machine,
//! and the decisions of when to start/stop a handshake or touch the kernel.
//! It does not own a netlink transport or an EAPoL/WSC state machine —
//! those are supplied by the caller through the [`kernel::KernelTransport`],
//! [`handshake::Eapol4WayHandshake`] and [`handshake::EapWsc`] traits.

pub mod ap_state;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod handshake;
pub mod kernel;
pub mod macaddr;
pub mod rates;
pub mod station;
pub mod wsc_registrar;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use ap_state::ApState;
pub use config::{ApConfig, ApConfigBuilder, WscConfig, WscDeviceType};
pub use engine::Engine;
pub use error::ApError;
pub use events::Event;
pub use macaddr::MacAddr;
