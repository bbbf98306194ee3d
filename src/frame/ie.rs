//! IE-TLV iteration and the Supported Rates / Extended Supported Rates
//! parsers (§4.2 "Parsers").

use crate::error::FrameError;
use crate::rates::{Rate, RateSet};

use super::element_id;

/// Walks a byte slice as a sequence of `(element_id, len, payload)` TLVs,
/// the way every IE-bearing 802.11 frame body is laid out after its fixed
/// fields.
pub struct TlvIterator<'a> {
    buf: &'a [u8],
    truncated: bool,
}

impl<'a> TlvIterator<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        TlvIterator {
            buf,
            truncated: false,
        }
    }

    /// True once `next()` has returned `None` because an IE ran past the
    /// end of the buffer, rather than because the buffer was exhausted
    /// cleanly. Callers that require every IE to be well-formed check this
    /// after iterating (an "unterminated IE" per §4.2 Errors).
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for TlvIterator<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        if self.buf.len() < 2 {
            self.truncated = true;
            self.buf = &[];
            return None;
        }
        let id = self.buf[0];
        let len = self.buf[1] as usize;
        if self.buf.len() < 2 + len {
            self.truncated = true;
            self.buf = &[];
            return None;
        }
        let payload = &self.buf[2..2 + len];
        self.buf = &self.buf[2 + len..];
        Some((id, payload))
    }
}

/// Writes one IE: element id, one-byte length, payload. The one IE-length
/// field written here is exactly the number of bytes in `payload` (§9.1
/// IE-collector Open Question: no second/duplicate length write).
pub fn write_ie(out: &mut Vec<u8>, id: u8, payload: &[u8]) {
    debug_assert!(payload.len() <= u8::MAX as usize);
    out.push(id);
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
}

/// BSS membership selector marker (IEEE 802.11-2016 §9.4.2.3) that must be
/// skipped rather than parsed as a rate (§8 Boundary behaviors).
const BSS_MEMBERSHIP_SELECTOR: u8 = 0xff;

/// Parses one Supported-Rates-shaped IE payload into a set of rates,
/// skipping BSS membership selectors and masking off the Basic Rate bit.
fn parse_rate_ie(payload: &[u8], rates: &mut Vec<Rate>) {
    for &byte in payload {
        if byte == BSS_MEMBERSHIP_SELECTOR {
            continue;
        }
        rates.push(byte & 0x7f);
    }
}

/// Collects Supported Rates and Extended Supported Rates IEs from a frame
/// body into one `RateSet` (§4.2 Parsers).
pub fn parse_rates(body: &[u8]) -> Result<RateSet, FrameError> {
    let mut rates = Vec::new();
    let mut found = false;
    let mut iter = TlvIterator::new(body);
    for (id, payload) in &mut iter {
        if id == element_id::SUPPORTED_RATES || id == element_id::EXTENDED_SUPPORTED_RATES {
            found = true;
            parse_rate_ie(payload, &mut rates);
        }
    }
    if iter.truncated() {
        return Err(FrameError::Truncated);
    }
    if !found {
        return Err(FrameError::MissingIe("Supported Rates"));
    }
    Ok(RateSet::from_rates(rates))
}

/// Finds the first occurrence of `id` in a TLV-encoded body, returning its
/// payload slice.
pub fn find_ie<'a>(body: &'a [u8], id: u8) -> Result<Option<&'a [u8]>, FrameError> {
    let mut iter = TlvIterator::new(body);
    let found = iter.find(|&(eid, _)| eid == id).map(|(_, payload)| payload);
    if iter.truncated() {
        return Err(FrameError::Truncated);
    }
    Ok(found)
}

/// Encodes a rate set as a Supported Rates IE payload (up to 8 entries,
/// the first marked as Basic Rate) — §4.2 beacon/probe-response builder.
pub fn encode_supported_rates(rates: &RateSet) -> Vec<u8> {
    rates
        .as_slice()
        .iter()
        .take(8)
        .enumerate()
        .map(|(i, &r)| if i == 0 { r | 0x80 } else { r })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tlv_iterator_yields_ies_in_order() {
        let buf = [0u8, 2, b'h', b'i', 1, 1, 2];
        let ies: Vec<_> = TlvIterator::new(&buf).collect();
        assert_eq!(ies, vec![(0, &b"hi"[..]), (1, &[2][..])]);
    }

    #[test]
    fn tlv_iterator_detects_truncation() {
        let buf = [0u8, 5, 1, 2];
        let mut iter = TlvIterator::new(&buf);
        assert_eq!(iter.next(), None);
        assert!(iter.truncated());
    }

    #[test]
    fn parse_rates_skips_bss_membership_selector() {
        let mut body = Vec::new();
        write_ie(&mut body, element_id::SUPPORTED_RATES, &[0x82, 0xff, 0x8b]);
        let rates = parse_rates(&body).unwrap();
        assert_eq!(rates.as_slice(), &[2, 11]);
    }

    #[test]
    fn parse_rates_requires_presence() {
        let body = Vec::new();
        assert_eq!(
            parse_rates(&body),
            Err(FrameError::MissingIe("Supported Rates"))
        );
    }

    #[test]
    fn encode_supported_rates_marks_first_as_basic() {
        let rates = RateSet::from_rates([2, 11, 22]);
        let encoded = encode_supported_rates(&rates);
        assert_eq!(encoded, vec![0x82, 11, 22]);
    }
}
