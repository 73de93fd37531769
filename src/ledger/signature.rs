// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet-ownership proof via signature recovery.
//!
//! A user proves control of an address by signing an arbitrary message in
//! their wallet; the server recovers the signer address from the 65-byte
//! signature over the EIP-191 prefixed hash
//! (`"\x19Ethereum Signed Message:\n" + len(message) + message`).
//!
//! The trailing recovery-id byte arrives as 27/28 from most wallets and
//! must be normalized to 0/1 before recovery. Getting the prefix or the
//! offset wrong recovers a *different* address without erroring, so the
//! tests below pin the result to a fixed key with a known address.

use alloy::primitives::{Address, Signature};

/// Errors from signature recovery. Pure input classification: `Malformed`
/// never reaches the curve math, `RecoveryFailed` means the curve rejected
/// the signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("signature recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Recover the signer address from a message and its hex-encoded
/// 65-byte signature (`r || s || v`, `0x` prefix accepted).
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<Address, SignatureError> {
    let raw = alloy::hex::decode(signature_hex)
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;

    if raw.len() != 65 {
        return Err(SignatureError::Malformed(format!(
            "expected 65 bytes, got {}",
            raw.len()
        )));
    }

    let mut bytes = [0u8; 65];
    bytes.copy_from_slice(&raw);

    // Wallets emit v as 27/28; the recovery id must be 0/1.
    if bytes[64] == 27 || bytes[64] == 28 {
        bytes[64] -= 27;
    }

    let signature =
        Signature::from_raw(&bytes).map_err(|e| SignatureError::Malformed(e.to_string()))?;

    signature
        .recover_address_from_msg(message)
        .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};
    use std::str::FromStr;

    /// Well-known test vector key; its derived address is fixed.
    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const TEST_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    fn sign(message: &str, signer: &PrivateKeySigner) -> String {
        let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
        alloy::hex::encode(signature.as_bytes())
    }

    #[test]
    fn recovers_known_test_vector() {
        let key_bytes = alloy::hex::decode(TEST_KEY).unwrap();
        let signer = PrivateKeySigner::from_slice(&key_bytes).unwrap();
        assert_eq!(signer.address(), Address::from_str(TEST_ADDRESS).unwrap());

        let signature_hex = sign("Connect wallet", &signer);
        let recovered = recover_signer("Connect wallet", &signature_hex).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn recovers_random_keys_roundtrip() {
        for _ in 0..4 {
            let signer = PrivateKeySigner::random();
            let signature_hex = sign("hello chainpay", &signer);
            let recovered = recover_signer("hello chainpay", &signature_hex).unwrap();
            assert_eq!(recovered, signer.address());
        }
    }

    #[test]
    fn accepts_zero_x_prefix_and_legacy_v() {
        let signer = PrivateKeySigner::random();
        let signature = signer.sign_message_sync(b"prefix test").unwrap();
        let mut bytes = signature.as_bytes();
        // Force the 27/28 convention regardless of what as_bytes produced.
        if bytes[64] < 27 {
            bytes[64] += 27;
        }
        let hex = format!("0x{}", alloy::hex::encode(bytes));
        let recovered = recover_signer("prefix test", &hex).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn flipped_bit_never_recovers_original_address() {
        let signer = PrivateKeySigner::random();
        let signature = signer.sign_message_sync(b"tamper test").unwrap();
        let mut bytes = signature.as_bytes();
        bytes[10] ^= 0x01;
        let hex = alloy::hex::encode(bytes);

        match recover_signer("tamper test", &hex) {
            Ok(address) => assert_ne!(address, signer.address()),
            Err(SignatureError::RecoveryFailed(_)) => {}
            Err(other) => panic!("unexpected error class: {other}"),
        }
    }

    #[test]
    fn different_message_recovers_different_address() {
        let signer = PrivateKeySigner::random();
        let signature_hex = sign("message one", &signer);

        match recover_signer("message two", &signature_hex) {
            Ok(address) => assert_ne!(address, signer.address()),
            Err(SignatureError::RecoveryFailed(_)) => {}
            Err(other) => panic!("unexpected error class: {other}"),
        }
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert!(matches!(
            recover_signer("msg", "0xdeadbeef"),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn bad_hex_is_malformed() {
        assert!(matches!(
            recover_signer("msg", "not-hex-at-all"),
            Err(SignatureError::Malformed(_))
        ));
    }
}
