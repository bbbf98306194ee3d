//! Error kinds, one enum per concern, matching §7 of the design.
//!
//! Frame-level errors are recovered locally by the caller (reply with a
//! status code, keep the AP running); only `ApError::Startup` and a handful
//! of `ApError` variants tear down the whole `ApState`. See `ApError` docs.

use std::fmt;

use crate::frame::StatusCode;
use crate::macaddr::MacAddr;

/// Failure building or validating an `ApConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No SSID was configured.
    MissingSsid,
    /// Neither a passphrase nor a pre-derived PSK was configured.
    MissingKeyMaterial,
    /// SSID is not 1-32 bytes.
    SsidLength(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingSsid => write!(f, "ssid is required to start an AP"),
            ConfigError::MissingKeyMaterial => {
                write!(f, "either a passphrase or a pre-derived psk is required")
            }
            ConfigError::SsidLength(n) => write!(f, "ssid must be 1-32 bytes, got {n}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A malformed or incomplete information element / management frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// An IE's declared length ran past the end of the buffer.
    Truncated,
    /// A required IE (SSID, Rates, and one of RSN/WSC) was absent.
    MissingIe(&'static str),
    /// An IE was present but its body was not parseable.
    Malformed(&'static str),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Truncated => write!(f, "truncated information element"),
            FrameError::MissingIe(name) => write!(f, "missing required IE: {name}"),
            FrameError::Malformed(name) => write!(f, "malformed IE: {name}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl FrameError {
    /// The IEEE 802.11 status code the AP replies with when this error
    /// surfaces during (re)association processing.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::InvalidIe
    }
}

/// Reason code accompanying a deauthentication/disassociation, or a
/// `StationRemoved` event. A thin wrapper so call sites don't pass around a
/// bare `u16` meaning two different things (802.11 reason vs status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeauthReason(pub u16);

impl DeauthReason {
    pub const UNSPECIFIED: DeauthReason = DeauthReason(1);
    pub const DISASSOC_AP_BUSY: DeauthReason = DeauthReason(5);
    pub const IEEE8021X_FAILED: DeauthReason = DeauthReason(23);
}

/// Top-level AP error surfaced through `Event` / logs. Frame-level errors
/// (`FrameError`) are folded into an association-response status and never
/// reach this enum; this enum is for failures that affect a whole Station
/// or the whole `ApState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApError {
    /// Startup precondition failed (§4.6 Start); the AP never came up.
    Startup(ConfigError),
    /// STA requested a cipher the AP didn't advertise, or more than one.
    UnsupportedCipher,
    /// STA requested an AKM other than PSK.
    UnsupportedAkm,
    /// STA is not in `authorized_macs`, or failed another access check.
    Unauthorized(MacAddr),
    /// A kernel command critical to a Station's authorization failed.
    KernelCommandFailed { mac: MacAddr, command: &'static str },
    /// The 4-Way Handshake or EAP-WSC exchange failed for a Station.
    HandshakeFailed { mac: MacAddr, reason: DeauthReason },
    /// A second WSC PBC session was detected within the monitor window.
    SessionOverlap,
}

impl fmt::Display for ApError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApError::Startup(e) => write!(f, "ap start failed: {e}"),
            ApError::UnsupportedCipher => write!(f, "unsupported or ambiguous pairwise cipher"),
            ApError::UnsupportedAkm => write!(f, "unsupported akm, only psk is supported"),
            ApError::Unauthorized(mac) => write!(f, "{mac} is not an authorized station"),
            ApError::KernelCommandFailed { mac, command } => {
                write!(f, "kernel command {command} failed for station {mac}")
            }
            ApError::HandshakeFailed { mac, reason } => {
                write!(f, "handshake failed for station {mac}, reason {}", reason.0)
            }
            ApError::SessionOverlap => write!(f, "wsc pbc session overlap detected"),
        }
    }
}

impl std::error::Error for ApError {}

impl From<ConfigError> for ApError {
    fn from(e: ConfigError) -> Self {
        ApError::Startup(e)
    }
}
