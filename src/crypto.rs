//! Key-material helpers that belong to the AP core rather than the crypto
//! provider: PSK derivation, UUID-R derivation, and GTK generation.
//!
//! Cipher *implementation* (actually encrypting/decrypting frames, PTK/GTK
//! derivation inside the 4-Way Handshake) is out of scope per spec.md §1 and
//! is consumed from a crypto provider / the EAPoL component. What lives here
//! is the handful of cryptographic operations the AP core itself must
//! perform before ever starting the handshake.

use hmac::Hmac;
use rand::RngCore;
use sha1::Sha1;
use uuid::Uuid;

use crate::rates::Cipher;

const PBKDF2_ITERATIONS: u32 = 4096;

/// PSK = PBKDF2-HMAC-SHA1(passphrase, ssid, 4096, 32) — §4.6 Start.
pub fn derive_psk(passphrase: &str, ssid: &[u8]) -> [u8; 32] {
    let mut psk = [0u8; 32];
    pbkdf2::pbkdf2::<Hmac<Sha1>>(passphrase.as_bytes(), ssid, PBKDF2_ITERATIONS, &mut psk)
        .expect("32-byte output is always a valid pbkdf2-hmac-sha1 length");
    psk
}

/// A private namespace used to turn a MAC address into a stable, unique
/// UUID-R (§9.1 Open Question: UUID-R derivation). Version-5 (SHA-1 name-
/// based) UUIDs are deterministic given the same namespace + name, which is
/// exactly the "stable per-MAC function" spec.md §3 asks for.
const UUID_R_NAMESPACE: Uuid = Uuid::from_bytes([
    0x4c, 0x2e, 0x46, 0xa3, 0x34, 0xb1, 0x4c, 0x1a, 0x9e, 0x2f, 0x5a, 0x1d, 0x8e, 0x90, 0x3b, 0x77,
]);

/// Derives UUID-R deterministically from the AP's own MAC address.
pub fn derive_uuid_r(own_mac: &[u8; 6]) -> [u8; 16] {
    *Uuid::new_v5(&UUID_R_NAMESPACE, own_mac).as_bytes()
}

/// Generates a fresh GTK with a CSPRNG, sized per cipher (16 B for CCMP,
/// 32 B for TKIP), and — for TKIP — swaps the MIC key halves (bytes
/// 16-23 <-> 24-31) before installation, per the Wi-Fi specification
/// §3.3.4 (spec.md §4.5 point 1, §9 Open Question: preserve exactly).
pub fn generate_gtk(cipher: Cipher) -> Vec<u8> {
    let mut gtk = vec![0u8; cipher.key_len()];
    rand::rngs::OsRng.fill_bytes(&mut gtk);
    if cipher == Cipher::Tkip {
        swap_tkip_mic_halves(&mut gtk);
    }
    gtk
}

/// Swaps the Tx/Rx MIC key halves within a 32-byte TKIP key: bytes 16-23
/// become bytes 24-31 and vice versa. Required for TKIP interop; do not
/// "clean up" without an interop test against the same reference the
/// source crate cites (§9 Open Question).
pub fn swap_tkip_mic_halves(tkip_key: &mut [u8]) {
    assert!(
        tkip_key.len() == 32,
        "tkip key must be 32 bytes to have mic halves"
    );
    let mut tmp = [0u8; 8];
    tmp.copy_from_slice(&tkip_key[16..24]);
    tkip_key.copy_within(24..32, 16);
    tkip_key[24..32].copy_from_slice(&tmp);
}
