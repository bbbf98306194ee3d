//! (Re)Association Request parsing and Association Response construction
//! (§4.2, §4.4).

use crate::error::FrameError;
use crate::macaddr::MacAddr;
use crate::rates::RateSet;

use super::wsc::WscAssocRequestInfo;
use super::{element_id, ie, Capability, MgmtHeader, MgmtSubtype, Rsne, StatusCode};

/// Parsed (Re)Association Request, including a copy of its IE block for
/// `Station::assoc_ies` (§3 Station, §3 Invariants: "assoc_rsne... is
/// borrowed from assoc_ies").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocRequestInfo {
    pub capability: Capability,
    pub listen_interval: u16,
    pub rates: RateSet,
    pub rsne: Option<Rsne>,
    pub wsc: Option<WscAssocRequestInfo>,
    pub ssid: Vec<u8>,
    /// Raw IE bytes following the fixed fields, stored verbatim as
    /// `Station::assoc_ies`.
    pub assoc_ies: Vec<u8>,
}

/// Parses an (re)association request body. `is_reassoc` selects whether to
/// skip the extra "Current AP Address" fixed field reassociation requests
/// carry before the IEs.
pub fn parse_assoc_request(body: &[u8], is_reassoc: bool) -> Result<AssocRequestInfo, FrameError> {
    // Fixed fields: Capability(2) + Listen Interval(2) [+ Current AP
    // Address(6) for reassociation].
    let fixed_len = if is_reassoc { 10 } else { 4 };
    if body.len() < fixed_len {
        return Err(FrameError::Truncated);
    }
    let capability = Capability::from_bits(u16::from_le_bytes([body[0], body[1]]));
    let listen_interval = u16::from_le_bytes([body[2], body[3]]);
    let mut info = parse_ies(&body[fixed_len..])?;
    info.capability = capability;
    info.listen_interval = listen_interval;
    Ok(info)
}

/// Parses a bare IE block into the same `AssocRequestInfo` shape, with
/// `capability`/`listen_interval` left at their defaults. Used both as the
/// tail of `parse_assoc_request` and directly for a kernel `NEW_STATION`
/// notification (§4.6 "Failure semantics": hardware auto-association
/// bundles association IEs with the event, not a full assoc-request frame).
pub fn parse_ies(ies: &[u8]) -> Result<AssocRequestInfo, FrameError> {
    let mut ssid = None;
    let mut rsne = None;
    let mut wsc = None;

    let mut iter = ie::TlvIterator::new(ies);
    for (id, payload) in &mut iter {
        match id {
            element_id::SSID => ssid = Some(payload.to_vec()),
            element_id::RSN => rsne = Some(Rsne::parse(payload)?),
            element_id::VENDOR_SPECIFIC if payload.starts_with(&super::WSC_OUI_TYPE) => {
                wsc = Some(super::wsc::parse_assoc_request(
                    &payload[super::WSC_OUI_TYPE.len()..],
                )?);
            }
            _ => {}
        }
    }
    if iter.truncated() {
        return Err(FrameError::Truncated);
    }

    let rates = ie::parse_rates(ies)?;
    let ssid = ssid.ok_or(FrameError::MissingIe("SSID"))?;

    Ok(AssocRequestInfo {
        capability: Capability::default(),
        listen_interval: 0,
        rates,
        rsne,
        wsc,
        ssid,
        assoc_ies: ies.to_vec(),
    })
}

/// Builds an Association/Reassociation Response (§4.2). `wsc_ie`, when
/// supplied, is appended verbatim (the WSC association-response IE for
/// WSC-only associations).
pub fn build_assoc_response(
    own_mac: MacAddr,
    da: MacAddr,
    reassoc: bool,
    status: StatusCode,
    aid: u16,
    rates: &RateSet,
    wsc_ie: Option<&[u8]>,
) -> Vec<u8> {
    let header = MgmtHeader {
        subtype: if reassoc {
            MgmtSubtype::ReassociationResponse
        } else {
            MgmtSubtype::AssociationResponse
        },
        da,
        sa: own_mac,
        bssid: own_mac,
    };
    let mut out = Vec::new();
    header.write(&mut out);

    let cap = Capability {
        ess: true,
        privacy: true,
    };
    out.extend_from_slice(&cap.to_bits().to_le_bytes());
    out.extend_from_slice(&status.value().to_le_bytes());
    // AID is carried with the two MSBs set per §4.2/§8 round-trip property.
    out.extend_from_slice(&(aid | 0xc000).to_le_bytes());

    ie::write_ie(&mut out, element_id::SUPPORTED_RATES, &ie::encode_supported_rates(rates));

    if let Some(wsc_ie) = wsc_ie {
        out.extend_from_slice(wsc_ie);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::{choose_rates, Cipher, GroupCipher};

    fn sample_request_body() -> Vec<u8> {
        let mut body = Vec::new();
        let cap = Capability {
            ess: true,
            privacy: true,
        };
        body.extend_from_slice(&cap.to_bits().to_le_bytes());
        body.extend_from_slice(&10u16.to_le_bytes());
        ie::write_ie(&mut body, element_id::SSID, b"TestAP");
        ie::write_ie(&mut body, element_id::SUPPORTED_RATES, &[0x82, 11, 22]);
        let rsne = Rsne::for_ap(Cipher::Ccmp, GroupCipher::Cipher(Cipher::Ccmp));
        rsne.write_ie(&mut body);
        body
    }

    #[test]
    fn parses_fixed_fields_and_ies() {
        let parsed = parse_assoc_request(&sample_request_body(), false).unwrap();
        assert_eq!(parsed.listen_interval, 10);
        assert_eq!(parsed.ssid, b"TestAP");
        assert_eq!(parsed.rates.as_slice(), &[2, 11, 22]);
        assert!(parsed.rsne.is_some());
    }

    #[test]
    fn assoc_response_aid_has_msbs_set() {
        let resp = build_assoc_response(
            MacAddr::new([1; 6]),
            MacAddr::new([2; 6]),
            false,
            StatusCode::Success,
            5,
            &choose_rates(false),
            None,
        );
        let aid_offset = MgmtHeader::LEN + 2 + 2;
        let aid = u16::from_le_bytes([resp[aid_offset], resp[aid_offset + 1]]);
        assert_eq!(aid, 5 | 0xc000);
    }

    #[test]
    fn missing_ssid_is_rejected() {
        let mut body = Vec::new();
        let cap = Capability::default();
        body.extend_from_slice(&cap.to_bits().to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        assert!(parse_assoc_request(&body, false).is_err());
    }
}
