//! Secret scalars, deterministic ECDSA signing (RFC 6979), and WIF encoding.

use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha2::Sha256;

use crate::error::Result;
use crate::helpers::encode_base58_checksum;
use crate::secp256k1::{generator, n, S256Point};
use crate::signature::Signature;

type HmacSha256 = Hmac<Sha256>;

fn to_32_bytes(n: &BigUint) -> [u8; 32] {
    let raw = n.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(&raw);
    out
}

/// A secret scalar `e` paired with its eagerly-derived public point `P = e*G`.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    secret: BigUint,
    point: S256Point,
}

impl PrivateKey {
    /// Derive the public point for `secret` and cache it.
    pub fn new(secret: BigUint) -> Result<Self> {
        let point = generator().mul(&secret)?;
        Ok(Self { secret, point })
    }

    /// The secret scalar.
    pub fn secret(&self) -> &BigUint {
        &self.secret
    }

    /// The cached public point `P = e*G`.
    pub fn point(&self) -> &S256Point {
        &self.point
    }

    /// Zero-padded 64-hex-digit representation of the secret.
    pub fn hex(&self) -> String {
        format!("{:064x}", self.secret)
    }

    /// RFC 6979 deterministic nonce derivation.
    ///
    /// Initializes `V = 0x01*32`, `K = 0x00*32`, folds in the secret and
    /// `z` bytes across two HMAC rounds, then iterates until a candidate
    /// lands in `[1, N)`.
    fn deterministic_k(&self, z: &BigUint) -> BigUint {
        let order = n();
        let z = if z >= order { z - order } else { z.clone() };
        let z_bytes = to_32_bytes(&z);
        let secret_bytes = to_32_bytes(&self.secret);

        let mut k = [0u8; 32];
        let mut v = [1u8; 32];

        let hmac_step = |k: &[u8; 32], chunks: &[&[u8]]| -> [u8; 32] {
            let mut mac = HmacSha256::new_from_slice(k).expect("HMAC accepts any key length");
            for chunk in chunks {
                mac.update(chunk);
            }
            mac.finalize().into_bytes().into()
        };

        k = hmac_step(&k, &[&v, &[0x00], &secret_bytes, &z_bytes]);
        v = hmac_step(&k, &[&v]);
        k = hmac_step(&k, &[&v, &[0x01], &secret_bytes, &z_bytes]);
        v = hmac_step(&k, &[&v]);

        loop {
            v = hmac_step(&k, &[&v]);
            let candidate = BigUint::from_bytes_be(&v);
            if candidate >= BigUint::one() && &candidate < order {
                return candidate;
            }
            k = hmac_step(&k, &[&v, &[0x00]]);
            v = hmac_step(&k, &[&v]);
        }
    }

    /// Sign digest `z`, retrying with the next RFC 6979 candidate if the
    /// resulting `r` or `s` would be zero. The result is normalized to
    /// low-S form (`s <= N/2`).
    pub fn sign(&self, z: &BigUint) -> Result<Signature> {
        let order = n();
        let mut k = self.deterministic_k(z);
        loop {
            let r_point = generator().mul(&k)?;
            let r = match r_point.into_x() {
                Some(x) if !x.is_zero() => x,
                _ => {
                    k = (&k + BigUint::one()) % order;
                    continue;
                }
            };

            let k_inv = k.modpow(&(order - BigUint::from(2u8)), order);
            let mut s = ((z + &r * &self.secret) * k_inv) % order;
            if s.is_zero() {
                k = (&k + BigUint::one()) % order;
                continue;
            }
            if &s > &(order / BigUint::from(2u8)) {
                s = order - &s;
            }
            return Ok(Signature::new(r, s));
        }
    }

    /// WIF encoding: `base58_check(prefix || secret(32 BE) || suffix)`.
    pub fn wif(&self, compressed: bool, testnet: bool) -> String {
        let prefix: u8 = if testnet { 0xef } else { 0x80 };
        let mut payload = vec![prefix];
        payload.extend(to_32_bytes(&self.secret));
        if compressed {
            payload.push(0x01);
        }
        encode_base58_checksum(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let pk = PrivateKey::new(BigUint::from(8675309u64)).unwrap();
        let z = BigUint::parse_bytes(
            b"ec208baa0fc1c19f708a9ca96fdeff3ac3f230bb4a7ba4aede4942ad003c0f60",
            16,
        )
        .unwrap();
        let sig = pk.sign(&z).unwrap();
        assert!(pk.point().verify(&z, &sig).unwrap());
    }

    #[test]
    fn wif_round_trips_through_base58check() {
        let pk = PrivateKey::new(BigUint::from(5003u64)).unwrap();
        let wif = pk.wif(true, true);
        assert!(wif.starts_with('c') || wif.starts_with('9'));
        let decoded = crate::helpers::decode_base58_checksum(&wif).unwrap();
        assert_eq!(decoded[0], 0xef);
        assert_eq!(&decoded[1..33], &to_32_bytes(&pk.secret)[..]);
    }

    #[test]
    fn flipping_any_bit_breaks_verification() {
        let pk = PrivateKey::new(BigUint::from(42u64)).unwrap();
        let z = BigUint::from(999_888_777u64);
        let sig = pk.sign(&z).unwrap();
        assert!(pk.point().verify(&z, &sig).unwrap());

        let bad_sig = Signature::new(sig.r() + BigUint::one(), sig.s().clone());
        assert!(!pk.point().verify(&z, &bad_sig).unwrap());

        let bad_z = z + BigUint::one();
        assert!(!pk.point().verify(&bad_z, &sig).unwrap());
    }
}
