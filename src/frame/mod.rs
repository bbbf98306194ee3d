//! Frame Builder/Parser (C2): §4.2.
//!
//! Builds and parses 802.11 management frames at the MPDU level: a 24-byte
//! header (frame control, duration, three addresses, sequence control)
//! followed by a frame-type-specific fixed body and a sequence of
//! information elements in ascending Element-ID order.

pub mod assoc;
pub mod auth;
pub mod beacon;
pub mod ie;
pub mod probe;
pub mod rsne;
pub mod wsc;

pub use ie::TlvIterator;
pub use rsne::Rsne;

use crate::error::FrameError;
use crate::macaddr::MacAddr;

/// 802.11 management frame subtypes this core dispatches on (§4.6 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MgmtSubtype {
    AssociationRequest,
    AssociationResponse,
    ReassociationRequest,
    ReassociationResponse,
    ProbeRequest,
    ProbeResponse,
    Beacon,
    Disassociation,
    Authentication,
    Deauthentication,
}

impl MgmtSubtype {
    pub const fn value(self) -> u8 {
        match self {
            MgmtSubtype::AssociationRequest => 0x0,
            MgmtSubtype::AssociationResponse => 0x1,
            MgmtSubtype::ReassociationRequest => 0x2,
            MgmtSubtype::ReassociationResponse => 0x3,
            MgmtSubtype::ProbeRequest => 0x4,
            MgmtSubtype::ProbeResponse => 0x5,
            MgmtSubtype::Beacon => 0x8,
            MgmtSubtype::Disassociation => 0xa,
            MgmtSubtype::Authentication => 0xb,
            MgmtSubtype::Deauthentication => 0xc,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Some(match value {
            0x0 => MgmtSubtype::AssociationRequest,
            0x1 => MgmtSubtype::AssociationResponse,
            0x2 => MgmtSubtype::ReassociationRequest,
            0x3 => MgmtSubtype::ReassociationResponse,
            0x4 => MgmtSubtype::ProbeRequest,
            0x5 => MgmtSubtype::ProbeResponse,
            0x8 => MgmtSubtype::Beacon,
            0xa => MgmtSubtype::Disassociation,
            0xb => MgmtSubtype::Authentication,
            0xc => MgmtSubtype::Deauthentication,
            _ => return None,
        })
    }
}

/// The 24-byte MAC header shared by every management frame this core builds
/// or parses: frame control, duration, DA/SA/BSSID, sequence control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MgmtHeader {
    pub subtype: MgmtSubtype,
    pub da: MacAddr,
    pub sa: MacAddr,
    pub bssid: MacAddr,
}

impl MgmtHeader {
    pub const LEN: usize = 24;

    pub fn write(&self, out: &mut Vec<u8>) {
        let fc: u16 = 0b00 | (self.subtype.value() as u16) << 4;
        out.extend_from_slice(&fc.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // duration = 0
        out.extend_from_slice(self.da.as_ref());
        out.extend_from_slice(self.sa.as_ref());
        out.extend_from_slice(self.bssid.as_ref());
        out.extend_from_slice(&0u16.to_le_bytes()); // sequence = 0
    }

    pub fn parse(buf: &[u8]) -> Result<(Self, &[u8]), FrameError> {
        if buf.len() < Self::LEN {
            return Err(FrameError::Truncated);
        }
        let fc = u16::from_le_bytes([buf[0], buf[1]]);
        let subtype_bits = ((fc >> 4) & 0xf) as u8;
        let subtype = MgmtSubtype::from_value(subtype_bits)
            .ok_or(FrameError::Malformed("mgmt frame subtype"))?;
        let da = MacAddr::new(buf[4..10].try_into().unwrap());
        let sa = MacAddr::new(buf[10..16].try_into().unwrap());
        let bssid = MacAddr::new(buf[16..22].try_into().unwrap());
        Ok((
            MgmtHeader {
                subtype,
                da,
                sa,
                bssid,
            },
            &buf[Self::LEN..],
        ))
    }
}

/// Capability Information field bits this core ever sets (IEEE 802.11-2016
/// §9.4.1.4): ESS and Privacy. No IBSS/MFP/SpectrumMgmt bits are produced or
/// required by this core (MFP is a non-goal per spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capability {
    pub ess: bool,
    pub privacy: bool,
}

impl Capability {
    pub fn to_bits(self) -> u16 {
        let mut bits = 0u16;
        if self.ess {
            bits |= 1 << 0;
        }
        if self.privacy {
            bits |= 1 << 4;
        }
        bits
    }

    pub fn from_bits(bits: u16) -> Self {
        Capability {
            ess: bits & (1 << 0) != 0,
            privacy: bits & (1 << 4) != 0,
        }
    }
}

/// IEEE 802.11 status codes this core ever sends (§4.2 Errors table). Only
/// the codes spec.md names are represented — this core never invents a new
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    Unspecified,
    InvalidIe,
    InvalidPairwiseCipher,
    InvalidAkmp,
}

impl StatusCode {
    pub fn value(self) -> u16 {
        match self {
            StatusCode::Success => 0,
            StatusCode::Unspecified => 1,
            StatusCode::InvalidAkmp => 43,
            StatusCode::InvalidPairwiseCipher => 42,
            StatusCode::InvalidIe => 40,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, StatusCode::Success)
    }
}

/// Element IDs used by this core (IEEE 802.11-2016 §9.4.2.1), in the
/// ascending order beacons/responses must emit them.
pub mod element_id {
    pub const SSID: u8 = 0;
    pub const SUPPORTED_RATES: u8 = 1;
    pub const DSSS_PARAMETER_SET: u8 = 3;
    pub const RSN: u8 = 48;
    pub const EXTENDED_SUPPORTED_RATES: u8 = 50;
    pub const MOBILITY_DOMAIN: u8 = 54;
    pub const VENDOR_SPECIFIC: u8 = 221;
}

/// The Wi-Fi Alliance OUI + vendor type that marks a Vendor Specific IE as
/// a WSC element (WSC 2.0.5 §8.3).
pub const WSC_OUI_TYPE: [u8; 4] = [0x00, 0x50, 0xf2, 0x04];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mgmt_header_round_trips() {
        let hdr = MgmtHeader {
            subtype: MgmtSubtype::AssociationResponse,
            da: MacAddr::new([1; 6]),
            sa: MacAddr::new([2; 6]),
            bssid: MacAddr::new([2; 6]),
        };
        let mut buf = Vec::new();
        hdr.write(&mut buf);
        assert_eq!(buf.len(), MgmtHeader::LEN);
        let (parsed, rest) = MgmtHeader::parse(&buf).unwrap();
        assert_eq!(parsed, hdr);
        assert!(rest.is_empty());
    }

    #[test]
    fn capability_bits_round_trip() {
        let cap = Capability {
            ess: true,
            privacy: true,
        };
        assert_eq!(Capability::from_bits(cap.to_bits()), cap);
    }

    #[test]
    fn truncated_header_rejected() {
        assert_eq!(MgmtHeader::parse(&[0u8; 10]), Err(FrameError::Truncated));
    }
}
