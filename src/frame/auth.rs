//! Open System Authentication, Disassociation and Deauthentication parsing/
//! building (§4.4). Shared-Key authentication is not supported, matching
//! spec.md §4.4.

use crate::error::{DeauthReason, FrameError};
use crate::macaddr::MacAddr;

use super::{MgmtHeader, MgmtSubtype, StatusCode};

pub const ALGORITHM_OPEN_SYSTEM: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRequestInfo {
    pub algorithm: u16,
    pub transaction_sequence: u16,
}

pub fn parse_auth_request(body: &[u8]) -> Result<AuthRequestInfo, FrameError> {
    if body.len() < 4 {
        return Err(FrameError::Truncated);
    }
    Ok(AuthRequestInfo {
        algorithm: u16::from_le_bytes([body[0], body[1]]),
        transaction_sequence: u16::from_le_bytes([body[2], body[3]]),
    })
}

/// Builds an Open System Authentication response (transaction sequence 2).
pub fn build_auth_response(own_mac: MacAddr, da: MacAddr, status: StatusCode) -> Vec<u8> {
    let header = MgmtHeader {
        subtype: MgmtSubtype::Authentication,
        da,
        sa: own_mac,
        bssid: own_mac,
    };
    let mut out = Vec::new();
    header.write(&mut out);
    out.extend_from_slice(&ALGORITHM_OPEN_SYSTEM.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // transaction sequence
    out.extend_from_slice(&status.value().to_le_bytes());
    out
}

/// Parses the single 2-byte reason code fixed field Disassociation and
/// Deauthentication frames share.
pub fn parse_reason(body: &[u8]) -> Result<DeauthReason, FrameError> {
    if body.len() < 2 {
        return Err(FrameError::Truncated);
    }
    Ok(DeauthReason(u16::from_le_bytes([body[0], body[1]])))
}

pub fn build_deauth(own_mac: MacAddr, da: MacAddr, reason: DeauthReason) -> Vec<u8> {
    build_notify(own_mac, da, MgmtSubtype::Deauthentication, reason)
}

pub fn build_disassoc(own_mac: MacAddr, da: MacAddr, reason: DeauthReason) -> Vec<u8> {
    build_notify(own_mac, da, MgmtSubtype::Disassociation, reason)
}

fn build_notify(own_mac: MacAddr, da: MacAddr, subtype: MgmtSubtype, reason: DeauthReason) -> Vec<u8> {
    let header = MgmtHeader {
        subtype,
        da,
        sa: own_mac,
        bssid: own_mac,
    };
    let mut out = Vec::new();
    header.write(&mut out);
    out.extend_from_slice(&reason.0.to_le_bytes());
    out
}
