//! Upward event surface (§6): what this core reports to its caller.

use crate::error::DeauthReason;
use crate::macaddr::MacAddr;

/// Events emitted toward the caller, verbatim per spec.md §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StartFailed,
    Started,
    Stopping,
    StationAdded { mac: MacAddr, assoc_ies: Vec<u8> },
    StationRemoved { mac: MacAddr, reason: DeauthReason },
    RegistrationStart { mac: MacAddr, assoc_ies: Vec<u8> },
    RegistrationSuccess { mac: MacAddr },
    PbcModeExit,
}
