//! Per-game escrow wallets.
//!
//! A wallet is a random 32-byte secret with a public identifier derived
//! from it; the secret stays inside the storage layer and never appears in
//! an API response.

use std::fmt::Write as _;

use rand::Rng;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct EscrowWallet {
    pub pubkey: String,
    pub secret: String,
}

impl EscrowWallet {
    pub fn provision() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let secret = hex(&bytes);
        let pubkey = hex(&Sha256::digest(secret.as_bytes()));
        Self { pubkey, secret }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn wallets_are_unique_and_well_formed() {
        let a = EscrowWallet::provision();
        let b = EscrowWallet::provision();
        assert_ne!(a.secret, b.secret);
        assert_ne!(a.pubkey, b.pubkey);
        assert_eq!(a.secret.len(), 64);
        assert_eq!(a.pubkey.len(), 64);
        assert!(a.pubkey.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn pubkey_derives_from_secret() {
        let w = EscrowWallet::provision();
        let expected = hex(&Sha256::digest(w.secret.as_bytes()));
        assert_eq!(w.pubkey, expected);
    }
}
