//! WSC PBC Registrar (C3): §4.3.
//!
//! Tracks enrollee Probe Requests within a monitor window, enforces the
//! session-overlap rule, and emits PBC lifecycle signals for the engine to
//! turn into `Event`s and kernel commands. Only Push-Button Configuration is
//! implemented; PIN-based WSC is out of scope.

use std::time::{Duration, Instant};

use crate::macaddr::MacAddr;

pub const MONITOR_TIME: Duration = Duration::from_secs(120);
pub const WALK_TIME: Duration = Duration::from_secs(120);

/// A Probe Request seen from a WSC PBC enrollee (§3 ProbeRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRecord {
    pub mac: MacAddr,
    pub uuid_e: Option<[u8; 16]>,
    pub timestamp: Instant,
}

/// What `push_button()` refuses with (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOverlap;

/// Whether a `push_button()` call is arming PBC mode for the first time
/// (needs `wsc_dpid` set and a beacon refresh) or just resetting an
/// already-armed walk-time timer (§4.3 invariant: no beacon change).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushButtonOutcome {
    Armed,
    Reset,
}

/// What the engine must do after feeding a PBC probe request in (§4.3 step
/// 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// No overlap detected; the probe was recorded.
    Recorded,
    /// A second session was detected. `pbc_was_active` tells the engine
    /// whether PBC mode was actually armed before this call — §4.3 step 4
    /// only exits PBC mode (and emits `PBC_MODE_EXIT`) "if PBC mode is
    /// active"; two enrollees probing with no prior `push_button()` queue
    /// up without ever toggling PBC mode, so the engine must not emit the
    /// event or refresh the beacon when this is `false`. `evict`, when
    /// present, names the STA that occupied the overlapping slot
    /// previously; the engine only acts on it if that STA is actually
    /// mid-EAP-WSC (this registrar doesn't know about the Station table).
    SessionOverlap {
        evict: Option<MacAddr>,
        pbc_was_active: bool,
    },
}

/// State: `wsc_pbc_probes` (ordered by insertion, which is timestamp order)
/// and the optional walk-time deadline.
pub struct WscRegistrar {
    probes: Vec<ProbeRecord>,
    pbc_deadline: Option<Instant>,
}

impl Default for WscRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

impl WscRegistrar {
    pub fn new() -> Self {
        WscRegistrar {
            probes: Vec::new(),
            pbc_deadline: None,
        }
    }

    pub fn is_pbc_active(&self) -> bool {
        self.pbc_deadline.is_some()
    }

    pub fn probe_records(&self) -> &[ProbeRecord] {
        &self.probes
    }

    /// §4.3 `push_button()`.
    pub fn push_button(&mut self, now: Instant) -> Result<PushButtonOutcome, SessionOverlap> {
        if self.probes.len() > 1 {
            return Err(SessionOverlap);
        }
        let outcome = if self.pbc_deadline.is_some() {
            PushButtonOutcome::Reset
        } else {
            PushButtonOutcome::Armed
        };
        self.pbc_deadline = Some(now + WALK_TIME);
        Ok(outcome)
    }

    /// §4.3 "On Probe Request carrying WSC IE with config_methods ⊇
    /// {PUSH_BUTTON} and device_password_id = PUSH_BUTTON".
    pub fn handle_pbc_probe(
        &mut self,
        mac: MacAddr,
        uuid_e: Option<[u8; 16]>,
        now: Instant,
    ) -> ProbeOutcome {
        let previous_first = self.probes.first().map(|r| r.mac);

        self.probes
            .retain(|r| now.duration_since(r.timestamp) < MONITOR_TIME && r.mac != mac);

        if self.probes.is_empty() {
            self.probes.push(ProbeRecord {
                mac,
                uuid_e,
                timestamp: now,
            });
            return ProbeOutcome::Recorded;
        }

        self.probes.push(ProbeRecord {
            mac,
            uuid_e,
            timestamp: now,
        });
        let pbc_was_active = self.pbc_deadline.is_some();
        self.pbc_deadline = None;

        let evict = previous_first.filter(|&first_mac| first_mac != mac);
        ProbeOutcome::SessionOverlap {
            evict,
            pbc_was_active,
        }
    }

    /// §4.3 "On successful registration": drop the enrollee's probe
    /// record(s) without triggering overlap.
    pub fn clear_probes_for(&mut self, mac: MacAddr) {
        self.probes.retain(|r| r.mac != mac);
    }

    /// Checks the walk-time deadline, exiting PBC mode if it has passed.
    /// Returns `true` if this call is what exited it (§4.3 "Walk-time
    /// expiry").
    pub fn poll_walk_time(&mut self, now: Instant) -> bool {
        match self.pbc_deadline {
            Some(deadline) if now >= deadline => {
                self.pbc_deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Exits PBC mode outright, e.g. from the overlap path once the engine
    /// has decided to honor it. Idempotent.
    pub fn exit_pbc_mode(&mut self) {
        self.pbc_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(b: u8) -> MacAddr {
        MacAddr::new([b; 6])
    }

    #[test]
    fn push_button_arms_then_resets() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        assert_eq!(reg.push_button(t0), Ok(PushButtonOutcome::Armed));
        assert!(reg.is_pbc_active());
        assert_eq!(
            reg.push_button(t0 + Duration::from_secs(1)),
            Ok(PushButtonOutcome::Reset)
        );
    }

    #[test]
    fn push_button_refuses_when_probes_overlap_already_queued() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        reg.handle_pbc_probe(mac(1), None, t0);
        reg.handle_pbc_probe(mac(2), None, t0);
        assert_eq!(reg.push_button(t0), Err(SessionOverlap));
    }

    #[test]
    fn first_probe_is_recorded_without_overlap() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        assert_eq!(
            reg.handle_pbc_probe(mac(1), None, t0),
            ProbeOutcome::Recorded
        );
        assert_eq!(reg.probe_records().len(), 1);
    }

    #[test]
    fn second_distinct_probe_triggers_overlap_and_exits_pbc() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        reg.push_button(t0).unwrap();
        reg.handle_pbc_probe(mac(1), None, t0);
        let outcome = reg.handle_pbc_probe(mac(2), None, t0 + Duration::from_secs(1));
        assert_eq!(
            outcome,
            ProbeOutcome::SessionOverlap {
                evict: Some(mac(1)),
                pbc_was_active: true,
            }
        );
        assert!(!reg.is_pbc_active());
    }

    #[test]
    fn overlap_without_prior_push_button_does_not_report_pbc_was_active() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        reg.handle_pbc_probe(mac(1), None, t0);
        let outcome = reg.handle_pbc_probe(mac(2), None, t0 + Duration::from_secs(1));
        assert_eq!(
            outcome,
            ProbeOutcome::SessionOverlap {
                evict: Some(mac(1)),
                pbc_was_active: false,
            }
        );
    }

    #[test]
    fn repeated_probe_from_same_mac_refreshes_without_overlap() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        reg.handle_pbc_probe(mac(1), None, t0);
        let outcome = reg.handle_pbc_probe(mac(1), None, t0 + Duration::from_secs(1));
        assert_eq!(outcome, ProbeOutcome::Recorded);
        assert_eq!(reg.probe_records().len(), 1);
    }

    #[test]
    fn stale_entries_are_purged_on_insert() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        reg.handle_pbc_probe(mac(1), None, t0);
        let outcome = reg.handle_pbc_probe(mac(2), None, t0 + MONITOR_TIME + Duration::from_secs(1));
        assert_eq!(outcome, ProbeOutcome::Recorded);
        assert_eq!(reg.probe_records().len(), 1);
        assert_eq!(reg.probe_records()[0].mac, mac(2));
    }

    #[test]
    fn successful_registration_clears_without_overlap_signal() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        reg.handle_pbc_probe(mac(1), None, t0);
        reg.clear_probes_for(mac(1));
        assert!(reg.probe_records().is_empty());
    }

    #[test]
    fn walk_time_expiry_exits_pbc_mode_once() {
        let mut reg = WscRegistrar::new();
        let t0 = Instant::now();
        reg.push_button(t0).unwrap();
        assert!(!reg.poll_walk_time(t0 + Duration::from_secs(1)));
        assert!(reg.poll_walk_time(t0 + WALK_TIME));
        assert!(!reg.is_pbc_active());
    }
}
