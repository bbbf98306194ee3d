//! `ApConfig`: the immutable-once-started configuration for one AP instance.

use crate::error::ConfigError;
use crate::macaddr::MacAddr;

/// WSC primary device type, the (category, OUI, subcategory) triple
/// advertised in the probe-response WSC IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WscDeviceType {
    pub category: u16,
    pub oui: [u8; 4],
    pub subcategory: u16,
}

impl Default for WscDeviceType {
    fn default() -> Self {
        // Category 6 ("Network Infrastructure"), WFA OUI, subcategory 1 ("AP").
        WscDeviceType {
            category: 6,
            oui: [0x00, 0x50, 0xf2, 0x04],
            subcategory: 1,
        }
    }
}

/// WSC descriptor carried in beacons/probe responses while advertising or
/// running PBC.
#[derive(Debug, Clone)]
pub struct WscConfig {
    pub device_name: String,
    pub primary_device_type: WscDeviceType,
}

impl Default for WscConfig {
    fn default() -> Self {
        WscConfig {
            device_name: String::from("Soft AP"),
            primary_device_type: WscDeviceType::default(),
        }
    }
}

/// Immutable-once-started AP configuration (§3 ApConfig).
#[derive(Debug, Clone)]
pub struct ApConfig {
    pub(crate) ssid: Vec<u8>,
    pub(crate) psk: [u8; 32],
    pub(crate) channel: u8,
    pub(crate) no_cck_rates: bool,
    pub(crate) authorized_macs: Vec<MacAddr>,
    pub(crate) wsc: WscConfig,
}

impl ApConfig {
    pub fn builder() -> ApConfigBuilder {
        ApConfigBuilder::new()
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid
    }

    pub fn psk(&self) -> &[u8; 32] {
        &self.psk
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn no_cck_rates(&self) -> bool {
        self.no_cck_rates
    }

    /// Empty means "any station may authenticate" (§4.4 Authentication).
    pub fn authorized_macs(&self) -> &[MacAddr] {
        &self.authorized_macs
    }

    pub fn wsc(&self) -> &WscConfig {
        &self.wsc
    }

    pub fn is_authorized(&self, mac: &MacAddr) -> bool {
        self.authorized_macs.is_empty() || self.authorized_macs.contains(mac)
    }

    /// Zeroes the PMK buffer on AP teardown (§4.6 Stop).
    pub(crate) fn zero_psk(&mut self) {
        self.psk = [0; 32];
    }
}

/// Consuming builder for `ApConfig`, in the style of the source crate's
/// `Config<RST>` builder (`with_x(self, ...) -> Self`).
#[derive(Debug, Clone, Default)]
pub struct ApConfigBuilder {
    ssid: Option<Vec<u8>>,
    passphrase: Option<String>,
    psk: Option<[u8; 32]>,
    channel: Option<u8>,
    no_cck_rates: bool,
    authorized_macs: Vec<MacAddr>,
    wsc: WscConfig,
}

impl ApConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ssid(mut self, ssid: impl Into<Vec<u8>>) -> Self {
        self.ssid = Some(ssid.into());
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Supply a pre-derived 32-byte PSK directly, skipping PBKDF2 at start.
    pub fn with_psk(mut self, psk: [u8; 32]) -> Self {
        self.psk = Some(psk);
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn no_cck_rates(mut self, no_cck_rates: bool) -> Self {
        self.no_cck_rates = no_cck_rates;
        self
    }

    pub fn with_authorized_macs(mut self, macs: impl Into<Vec<MacAddr>>) -> Self {
        self.authorized_macs = macs.into();
        self
    }

    pub fn with_wsc(mut self, wsc: WscConfig) -> Self {
        self.wsc = wsc;
        self
    }

    /// Validates and, if only a passphrase was given, derives the PSK via
    /// PBKDF2-HMAC-SHA1 (§4.6 Start). `ssid` is used as the PBKDF2 salt, so
    /// this is only callable once an SSID is set.
    pub fn build(self) -> Result<ApConfig, ConfigError> {
        let ssid = self.ssid.ok_or(ConfigError::MissingSsid)?;
        if ssid.is_empty() || ssid.len() > 32 {
            return Err(ConfigError::SsidLength(ssid.len()));
        }

        let psk = match (self.psk, &self.passphrase) {
            (Some(psk), _) => psk,
            (None, Some(passphrase)) => crate::crypto::derive_psk(passphrase, &ssid),
            (None, None) => return Err(ConfigError::MissingKeyMaterial),
        };

        Ok(ApConfig {
            ssid,
            psk,
            channel: self.channel.unwrap_or(6),
            no_cck_rates: self.no_cck_rates,
            authorized_macs: self.authorized_macs,
            wsc: self.wsc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ssid_rejected() {
        let err = ApConfig::builder().with_passphrase("abcdefgh").build();
        assert_eq!(err.unwrap_err(), ConfigError::MissingSsid);
    }

    #[test]
    fn missing_key_material_rejected() {
        let err = ApConfig::builder().with_ssid("TestAP").build();
        assert_eq!(err.unwrap_err(), ConfigError::MissingKeyMaterial);
    }

    #[test]
    fn defaults_channel_to_six() {
        let cfg = ApConfig::builder()
            .with_ssid("TestAP")
            .with_passphrase("abcdefgh")
            .build()
            .unwrap();
        assert_eq!(cfg.channel(), 6);
    }

    #[test]
    fn empty_authorized_macs_allows_any() {
        let cfg = ApConfig::builder()
            .with_ssid("TestAP")
            .with_passphrase("abcdefgh")
            .build()
            .unwrap();
        assert!(cfg.is_authorized(&MacAddr::new([1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn nonempty_authorized_macs_restricts() {
        let allowed = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let cfg = ApConfig::builder()
            .with_ssid("TestAP")
            .with_passphrase("abcdefgh")
            .with_authorized_macs(vec![allowed])
            .build()
            .unwrap();
        assert!(cfg.is_authorized(&allowed));
        assert!(!cfg.is_authorized(&MacAddr::new([9; 6])));
    }
}
