//! Rate/Cipher Policy (C1): §4.1.

/// Supported rate, in units of 500 kb/s, as carried on the wire in the
/// Supported Rates / Extended Supported Rates IEs (high bit reserved for
/// the Basic Rate marker and stripped before it reaches this type).
pub type Rate = u8;

/// CCK-permitted rates: 1 / 5.5 / 11 Mbit/s.
pub const CCK_RATES: [Rate; 3] = [2, 11, 22];

/// OFDM-only rates: 6/9/12/18/24/36/48/54 Mbit/s.
pub const OFDM_RATES: [Rate; 8] = [12, 18, 24, 36, 48, 72, 96, 108];

/// An ordered, de-duplicated set of supported rates. The first entry is
/// always the mandatory Basic Rate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateSet(Vec<Rate>);

impl RateSet {
    pub fn from_rates(rates: impl IntoIterator<Item = Rate>) -> Self {
        let mut v: Vec<Rate> = rates.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        RateSet(v)
    }

    pub fn as_slice(&self) -> &[Rate] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The mandatory Basic Rate: the lowest rate in the set (§4.1).
    pub fn basic_rate(&self) -> Option<Rate> {
        self.0.first().copied()
    }

    /// Whether this (STA-advertised) rate set contains the given AP Basic
    /// Rate, used to reject association per §4.1.
    pub fn contains(&self, rate: Rate) -> bool {
        self.0.contains(&rate)
    }
}

/// Chooses the advertised rate set for the AP (§4.1).
pub fn choose_rates(no_cck: bool) -> RateSet {
    if no_cck {
        RateSet::from_rates(OFDM_RATES)
    } else {
        RateSet::from_rates(CCK_RATES)
    }
}

/// Pairwise/group cipher suite selectors, restricted to what this core
/// negotiates (CCMP/TKIP pairwise, PSK-only AKM — §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cipher {
    Ccmp,
    Tkip,
}

impl Cipher {
    /// Key length in bytes for this cipher's transient key.
    pub fn key_len(self) -> usize {
        match self {
            Cipher::Ccmp => 16,
            Cipher::Tkip => 32,
        }
    }

    /// Ordering used to pick "weakest of negotiated pairwise ciphers" for
    /// the group cipher (§4.1): TKIP is weaker than CCMP.
    fn strength(self) -> u8 {
        match self {
            Cipher::Tkip => 0,
            Cipher::Ccmp => 1,
        }
    }
}

/// The group cipher, or the explicit "no group traffic" choice (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupCipher {
    Cipher(Cipher),
    NoGroupTraffic,
}

/// Authentication and Key Management suite. Fixed to PSK by this core
/// (§4.1); STAs proposing any other AKM are rejected (§4.4 RSN path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Akm {
    Psk,
}

/// Bitmask over the two ciphers this core ever negotiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairwiseCipherMask {
    pub ccmp: bool,
    pub tkip: bool,
}

impl PairwiseCipherMask {
    pub fn contains(&self, cipher: Cipher) -> bool {
        match cipher {
            Cipher::Ccmp => self.ccmp,
            Cipher::Tkip => self.tkip,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Cipher> + '_ {
        [
            self.ccmp.then_some(Cipher::Ccmp),
            self.tkip.then_some(Cipher::Tkip),
        ]
        .into_iter()
        .flatten()
    }

    fn weakest(&self) -> Option<Cipher> {
        self.iter().min_by_key(|c| c.strength())
    }
}

/// Wiphy (radio) cipher capability as reported by the kernel transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WiphyCipherCaps {
    pub ccmp: bool,
    pub tkip: bool,
    /// Whether the radio/driver combination supports group traffic at all;
    /// some monitor-only or P2P-only configurations don't.
    pub group_traffic: bool,
}

/// Chooses pairwise ciphers (intersection of wiphy caps and {CCMP, TKIP})
/// and the group cipher (weakest negotiated pairwise, or `NoGroupTraffic`
/// if disabled) — §4.1.
pub fn choose_ciphers(caps: WiphyCipherCaps) -> (PairwiseCipherMask, GroupCipher) {
    let pairwise = PairwiseCipherMask {
        ccmp: caps.ccmp,
        tkip: caps.tkip,
    };

    let group = if !caps.group_traffic {
        GroupCipher::NoGroupTraffic
    } else {
        match pairwise.weakest() {
            Some(cipher) => GroupCipher::Cipher(cipher),
            None => GroupCipher::NoGroupTraffic,
        }
    };

    (pairwise, group)
}
