//! Private key encryption at rest.
//!
//! Custodial private keys are stored AES-256-GCM encrypted with a key
//! derived from the configured secret via SHA-256. Wire format is
//! `base64(nonce):base64(ciphertext || tag)`.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest;

fn derive_key(secret: &str) -> Result<LessSafeKey> {
    let key_bytes = digest::digest(&digest::SHA256, secret.as_bytes());
    let unbound = UnboundKey::new(&AES_256_GCM, key_bytes.as_ref())
        .map_err(|_| anyhow!("failed to build encryption key"))?;
    Ok(LessSafeKey::new(unbound))
}

pub fn encrypt_private_key(private_key: &str, secret: &str) -> Result<String> {
    let key = derive_key(secret)?;

    let nonce_bytes: [u8; NONCE_LEN] = rand::random();
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = private_key.as_bytes().to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| anyhow!("failed to encrypt private key"))?;

    Ok(format!("{}:{}", BASE64.encode(nonce_bytes), BASE64.encode(&in_out)))
}

pub fn decrypt_private_key(encrypted: &str, secret: &str) -> Result<String> {
    let key = derive_key(secret)?;

    let (nonce_part, cipher_part) = encrypted
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid encrypted key format"))?;

    let nonce_bytes: [u8; NONCE_LEN] = BASE64
        .decode(nonce_part)?
        .try_into()
        .map_err(|_| anyhow!("invalid nonce length"))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut cipher = BASE64.decode(cipher_part)?;
    let plain = key
        .open_in_place(nonce, Aad::empty(), &mut cipher)
        .map_err(|_| anyhow!("failed to decrypt private key"))?;

    Ok(String::from_utf8(plain.to_vec())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_private_key() {
        let encrypted = encrypt_private_key("5tzFkiKscXHK5ZXCGbXZxdw7gTjj", "test-secret").unwrap();
        assert!(encrypted.contains(':'));

        let decrypted = decrypt_private_key(&encrypted, "test-secret").unwrap();
        assert_eq!(decrypted, "5tzFkiKscXHK5ZXCGbXZxdw7gTjj");
    }

    #[test]
    fn wrong_secret_fails_to_decrypt() {
        let encrypted = encrypt_private_key("secret-material", "key-a").unwrap();
        assert!(decrypt_private_key(&encrypted, "key-b").is_err());
    }

    #[test]
    fn same_plaintext_encrypts_differently_each_time() {
        let a = encrypt_private_key("payload", "secret").unwrap();
        let b = encrypt_private_key("payload", "secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        assert!(decrypt_private_key("no-separator", "secret").is_err());
        assert!(decrypt_private_key("AAAA:not-base64!!", "secret").is_err());
    }
}
