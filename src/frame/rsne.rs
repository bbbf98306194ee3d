//! RSN Element parsing and building (IEEE 802.11-2016 §9.4.2.25), restricted
//! to what §4.2/§4.4 need: pairwise/group cipher suites, AKM (PSK only),
//! and the capability bits this core inspects (MFPR, SPP A-MSDU Required).

use crate::error::FrameError;
use crate::rates::{Akm, Cipher, GroupCipher};

use super::ie;

const SUITE_OUI: [u8; 3] = [0x00, 0x0f, 0xac];

const SUITE_TYPE_TKIP: u8 = 2;
const SUITE_TYPE_CCMP: u8 = 4;
const SUITE_TYPE_AKM_8021X: u8 = 1;
const SUITE_TYPE_AKM_PSK: u8 = 2;

fn cipher_suite(cipher: Cipher) -> [u8; 4] {
    let t = match cipher {
        Cipher::Tkip => SUITE_TYPE_TKIP,
        Cipher::Ccmp => SUITE_TYPE_CCMP,
    };
    [SUITE_OUI[0], SUITE_OUI[1], SUITE_OUI[2], t]
}

fn parse_cipher_suite(bytes: &[u8; 4]) -> Option<Cipher> {
    if bytes[..3] != SUITE_OUI {
        return None;
    }
    match bytes[3] {
        SUITE_TYPE_TKIP => Some(Cipher::Tkip),
        SUITE_TYPE_CCMP => Some(Cipher::Ccmp),
        _ => None,
    }
}

fn akm_suite(akm: Akm) -> [u8; 4] {
    let t = match akm {
        Akm::Psk => SUITE_TYPE_AKM_PSK,
    };
    [SUITE_OUI[0], SUITE_OUI[1], SUITE_OUI[2], t]
}

fn parse_akm_suite(bytes: &[u8; 4]) -> Option<Akm> {
    if bytes[..3] != SUITE_OUI {
        return None;
    }
    match bytes[3] {
        SUITE_TYPE_AKM_PSK => Some(Akm::Psk),
        _ => None,
    }
}

/// RSN capabilities bits this core reads or sets (IEEE 802.11-2016
/// §9.4.2.25.4). Management Frame Protection is a non-goal beyond
/// advertising refusal (spec.md §1): this core never sets MFPC/MFPR, and
/// only inspects them on the STA's RSNE to apply the `mfpr &&
/// spp_a_msdu_required` rejection rule (§4.4 RSN path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RsnCapabilities {
    pub mfpr: bool,
    pub mfpc: bool,
    pub spp_a_msdu_required: bool,
    pub spp_a_msdu_capable: bool,
}

impl RsnCapabilities {
    fn to_bits(self) -> u16 {
        let mut bits = 0u16;
        if self.mfpr {
            bits |= 1 << 6;
        }
        if self.mfpc {
            bits |= 1 << 7;
        }
        if self.spp_a_msdu_capable {
            bits |= 1 << 10;
        }
        if self.spp_a_msdu_required {
            bits |= 1 << 11;
        }
        bits
    }

    fn from_bits(bits: u16) -> Self {
        RsnCapabilities {
            mfpr: bits & (1 << 6) != 0,
            mfpc: bits & (1 << 7) != 0,
            spp_a_msdu_capable: bits & (1 << 10) != 0,
            spp_a_msdu_required: bits & (1 << 11) != 0,
        }
    }
}

/// A parsed or to-be-built RSN Element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rsne {
    pub group_cipher: Option<Cipher>,
    pub pairwise_ciphers: Vec<Cipher>,
    pub akms: Vec<Akm>,
    pub capabilities: RsnCapabilities,
    /// PMKIDs, if any were present (at most one is ever meaningful here:
    /// FT/PMKR1Name is out of scope, §4.2 Parsers).
    pub pmkids: Vec<[u8; 16]>,
}

impl Rsne {
    /// Builds the AP's advertised RSNE (§4.2 beacon/probe-response tail):
    /// pairwise = selected cipher, group = selected, AKM = PSK, no PMKIDs.
    pub fn for_ap(pairwise: Cipher, group: GroupCipher) -> Self {
        let group_cipher = match group {
            GroupCipher::Cipher(c) => Some(c),
            GroupCipher::NoGroupTraffic => None,
        };
        Rsne {
            group_cipher,
            pairwise_ciphers: vec![pairwise],
            akms: vec![Akm::Psk],
            capabilities: RsnCapabilities::default(),
            pmkids: Vec::new(),
        }
    }

    /// Builds the AP's advertised RSNE when more than one pairwise cipher
    /// is negotiable (§4.1 "Pairwise ciphers are the intersection of wiphy
    /// capabilities and {CCMP, TKIP}"): `for_ap` covers the common
    /// single-cipher case, this covers the full offered set.
    pub fn for_ap_multi(pairwise: &[Cipher], group: GroupCipher) -> Self {
        let group_cipher = match group {
            GroupCipher::Cipher(c) => Some(c),
            GroupCipher::NoGroupTraffic => None,
        };
        Rsne {
            group_cipher,
            pairwise_ciphers: pairwise.to_vec(),
            akms: vec![Akm::Psk],
            capabilities: RsnCapabilities::default(),
            pmkids: Vec::new(),
        }
    }

    pub fn write_payload(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&1u16.to_le_bytes()); // version

        let group = self.group_cipher.map(cipher_suite).unwrap_or([
            SUITE_OUI[0],
            SUITE_OUI[1],
            SUITE_OUI[2],
            0, // "Use group cipher suite" / no group traffic placeholder
        ]);
        out.extend_from_slice(&group);

        out.extend_from_slice(&(self.pairwise_ciphers.len() as u16).to_le_bytes());
        for c in &self.pairwise_ciphers {
            out.extend_from_slice(&cipher_suite(*c));
        }

        out.extend_from_slice(&(self.akms.len() as u16).to_le_bytes());
        for a in &self.akms {
            out.extend_from_slice(&akm_suite(*a));
        }

        out.extend_from_slice(&self.capabilities.to_bits().to_le_bytes());

        if !self.pmkids.is_empty() {
            out.extend_from_slice(&(self.pmkids.len() as u16).to_le_bytes());
            for pmkid in &self.pmkids {
                out.extend_from_slice(pmkid);
            }
        }
    }

    pub fn write_ie(&self, out: &mut Vec<u8>) {
        let mut payload = Vec::new();
        self.write_payload(&mut payload);
        ie::write_ie(out, super::element_id::RSN, &payload);
    }

    /// Parses an RSNE payload (the bytes after the element id/length octets).
    pub fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() < 8 {
            return Err(FrameError::Malformed("rsne too short"));
        }
        let mut pos = 2; // skip version, unchecked: some STAs send non-1 values
        let group_bytes: [u8; 4] = payload
            .get(pos..pos + 4)
            .ok_or(FrameError::Malformed("rsne group cipher"))?
            .try_into()
            .unwrap();
        let group_cipher = parse_cipher_suite(&group_bytes);
        pos += 4;

        let pairwise_count = u16::from_le_bytes(
            payload
                .get(pos..pos + 2)
                .ok_or(FrameError::Malformed("rsne pairwise count"))?
                .try_into()
                .unwrap(),
        ) as usize;
        pos += 2;
        let mut pairwise_ciphers = Vec::with_capacity(pairwise_count);
        for _ in 0..pairwise_count {
            let bytes: [u8; 4] = payload
                .get(pos..pos + 4)
                .ok_or(FrameError::Malformed("rsne pairwise suite"))?
                .try_into()
                .unwrap();
            if let Some(c) = parse_cipher_suite(&bytes) {
                pairwise_ciphers.push(c);
            }
            pos += 4;
        }

        let akm_count = u16::from_le_bytes(
            payload
                .get(pos..pos + 2)
                .ok_or(FrameError::Malformed("rsne akm count"))?
                .try_into()
                .unwrap(),
        ) as usize;
        pos += 2;
        let mut akms = Vec::with_capacity(akm_count);
        for _ in 0..akm_count {
            let bytes: [u8; 4] = payload
                .get(pos..pos + 4)
                .ok_or(FrameError::Malformed("rsne akm suite"))?
                .try_into()
                .unwrap();
            if let Some(a) = parse_akm_suite(&bytes) {
                akms.push(a);
            }
            pos += 4;
        }

        let capabilities = match payload.get(pos..pos + 2) {
            Some(bytes) => RsnCapabilities::from_bits(u16::from_le_bytes(bytes.try_into().unwrap())),
            None => RsnCapabilities::default(),
        };
        pos += 2;

        let mut pmkids = Vec::new();
        if let Some(bytes) = payload.get(pos..pos + 2) {
            let count = u16::from_le_bytes(bytes.try_into().unwrap()) as usize;
            pos += 2;
            for _ in 0..count {
                if let Some(pmkid) = payload.get(pos..pos + 16) {
                    pmkids.push(pmkid.try_into().unwrap());
                    pos += 16;
                } else {
                    break;
                }
            }
        }

        Ok(Rsne {
            group_cipher,
            pairwise_ciphers,
            akms,
            capabilities,
            pmkids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ap_rsne_round_trips() {
        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        let mut buf = Vec::new();
        rsne.write_payload(&mut buf);
        let parsed = Rsne::parse(&buf).unwrap();
        assert_eq!(parsed.pairwise_ciphers, vec![Cipher::Ccmp]);
        assert_eq!(parsed.group_cipher, Some(Cipher::Ccmp));
        assert_eq!(parsed.akms, vec![Akm::Psk]);
        assert!(parsed.pmkids.is_empty());
    }

    #[test]
    fn parses_mfpr_and_spp_a_msdu_required_bits() {
        let mut rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        rsne.capabilities.mfpr = true;
        rsne.capabilities.spp_a_msdu_required = true;
        let mut buf = Vec::new();
        rsne.write_payload(&mut buf);
        let parsed = Rsne::parse(&buf).unwrap();
        assert!(parsed.capabilities.mfpr);
        assert!(parsed.capabilities.spp_a_msdu_required);
    }

    #[test]
    fn rejects_too_short_payload() {
        assert!(Rsne::parse(&[0, 0]).is_err());
    }
}
