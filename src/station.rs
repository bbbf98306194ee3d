//! Station table entry (§3 Station, §4.4).

use crate::frame::{Capability, Rsne};
use crate::kernel::CommandToken;
use crate::macaddr::MacAddr;
use crate::rates::RateSet;

/// A Station's progress through authentication/association/RSNA
/// (§4.4 "States per Station").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationState {
    None,
    Authenticated,
    Associated,
    RsnaEstablished,
}

/// One entry of `ApState::sta_states`, keyed by `addr`.
///
/// `assoc_rsne` is conceptually a borrow into `assoc_ies` (spec.md §3
/// invariant: "freeing assoc_ies frees assoc_rsne"); this core instead
/// stores an owned parse of it alongside the raw bytes and always clears
/// both together, which gets the same lifetime coupling without a
/// self-referential struct.
#[derive(Debug, Clone)]
pub struct Station {
    pub addr: MacAddr,
    pub state: StationState,
    pub aid: Option<u16>,
    pub capability: Capability,
    pub listen_interval: u16,
    pub rates: RateSet,
    pub assoc_ies: Vec<u8>,
    pub assoc_rsne: Option<Rsne>,
    pub wsc_uuid_e: Option<[u8; 16]>,
    pub wsc_v2: bool,
    /// Set once a handshake (4-Way or EAP-WSC) has been started for this
    /// Station (§4.5); cleared on completion, failure, or removal.
    pub handshake_active: bool,
    /// Pending-response token: at most one (re)association response may be
    /// in flight per Station (§5 "Ordering guarantees").
    pub pending_response: Option<CommandToken>,
}

impl Station {
    pub fn new(addr: MacAddr) -> Self {
        Station {
            addr,
            state: StationState::None,
            aid: None,
            capability: Capability::default(),
            listen_interval: 0,
            rates: RateSet::from_rates(Vec::new()),
            assoc_ies: Vec::new(),
            assoc_rsne: None,
            wsc_uuid_e: None,
            wsc_v2: false,
            handshake_active: false,
            pending_response: None,
        }
    }

    pub fn is_associated(&self) -> bool {
        matches!(self.state, StationState::Associated | StationState::RsnaEstablished)
    }

    /// Demotes an Associated/RsnaEstablished Station back to Authenticated,
    /// clearing association-scoped state (§4.4 Disassociation).
    pub fn demote_to_authenticated(&mut self) {
        self.state = StationState::Authenticated;
        self.aid = None;
        self.assoc_ies.clear();
        self.assoc_rsne = None;
        self.wsc_uuid_e = None;
        self.wsc_v2 = false;
        self.handshake_active = false;
        self.pending_response = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_station_starts_in_none_state() {
        let sta = Station::new(MacAddr::new([1; 6]));
        assert_eq!(sta.state, StationState::None);
        assert!(!sta.is_associated());
    }

    #[test]
    fn demotion_clears_association_scoped_fields() {
        let mut sta = Station::new(MacAddr::new([1; 6]));
        sta.state = StationState::RsnaEstablished;
        sta.aid = Some(5);
        sta.assoc_ies = vec![1, 2, 3];
        sta.handshake_active = true;
        sta.demote_to_authenticated();
        assert_eq!(sta.state, StationState::Authenticated);
        assert_eq!(sta.aid, None);
        assert!(sta.assoc_ies.is_empty());
        assert!(!sta.handshake_active);
    }
}
