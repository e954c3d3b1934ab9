//! `S256Point`: a [`Point`] specialized to secp256k1, with SEC encoding,
//! address derivation, and ECDSA verification.

use std::sync::OnceLock;

use num_bigint::BigUint;

use super::field::{s256_field, sqrt};
use super::{n, reduce_scalar, A, B, GX_HEX, GY_HEX};
use crate::error::{Error, Result};
use crate::helpers::{encode_base58_checksum, hash160};
use crate::point::Point;
use crate::signature::Signature;

/// A public key: a point on secp256k1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S256Point(Point);

impl S256Point {
    /// Build a point from its affine coordinates, validating it is on the
    /// curve.
    pub fn new(x: BigUint, y: BigUint) -> Result<Self> {
        let (a, b) = Self::curve_params()?;
        let point = Point::new(s256_field(x)?, s256_field(y)?, a, b)?;
        Ok(Self(point))
    }

    fn curve_params() -> Result<(crate::field::FieldElement, crate::field::FieldElement)> {
        Ok((s256_field(BigUint::from(A))?, s256_field(BigUint::from(B))?))
    }

    /// The point at infinity on secp256k1.
    pub fn infinity() -> Self {
        let (a, b) = Self::curve_params().expect("curve constants are in range");
        Self(Point::infinity(a, b))
    }

    /// Scalar multiplication, reducing the coefficient modulo the group
    /// order `n` first (since `n*G = O`).
    pub fn mul(&self, coefficient: &BigUint) -> Result<Self> {
        let coef = reduce_scalar(coefficient);
        Ok(Self(self.0.mul(&coef)?))
    }

    /// Point addition.
    pub fn add(&self, other: &Self) -> Result<Self> {
        Ok(Self(self.0.add(&other.0)?))
    }

    /// The affine `x` coordinate as an owned integer, or `None` at infinity.
    pub fn into_x(self) -> Option<BigUint> {
        self.0.x().map(|x| x.num().clone())
    }

    /// Verify that `sig` is a valid signature over digest `z` under this
    /// public key.
    pub fn verify(&self, z: &BigUint, sig: &Signature) -> Result<bool> {
        let n = n();
        let s_inv = sig.s().modpow(&(n - BigUint::from(2u8)), n);
        let u = (z * &s_inv) % n;
        let v = (sig.r() * &s_inv) % n;
        let total = generator().mul(&u)?.add(&self.mul(&v)?)?;
        match total.0.x() {
            Some(x) => Ok(x.num() == sig.r()),
            None => Ok(false),
        }
    }

    /// SEC encoding: uncompressed `0x04 || x || y` (65 bytes), compressed
    /// `0x02`/`0x03 || x` (33 bytes) by the parity of `y`.
    pub fn sec(&self, compressed: bool) -> Vec<u8> {
        if self.0.is_infinity() {
            return Vec::new();
        }
        let x = self.0.x().expect("checked not-infinity above");
        let y = self.0.y().expect("checked not-infinity above");
        let mut x_bytes = x.num().to_bytes_be();
        pad_to_32(&mut x_bytes);

        if compressed {
            let prefix = if y.num() % 2u8 == BigUint::from(0u8) { 0x02 } else { 0x03 };
            let mut out = vec![prefix];
            out.extend(x_bytes);
            out
        } else {
            let mut y_bytes = y.num().to_bytes_be();
            pad_to_32(&mut y_bytes);
            let mut out = vec![0x04];
            out.extend(x_bytes);
            out.extend(y_bytes);
            out
        }
    }

    /// Decode a SEC-encoded point, recovering `y`'s parity from the prefix
    /// byte for compressed encodings.
    pub fn parse(sec_bin: &[u8]) -> Result<Self> {
        match sec_bin.first() {
            Some(0x04) => {
                if sec_bin.len() != 65 {
                    return Err(Error::ScriptParseError);
                }
                let x = BigUint::from_bytes_be(&sec_bin[1..33]);
                let y = BigUint::from_bytes_be(&sec_bin[33..65]);
                Self::new(x, y)
            }
            Some(&prefix @ (0x02 | 0x03)) => {
                if sec_bin.len() != 33 {
                    return Err(Error::ScriptParseError);
                }
                let is_even = prefix == 0x02;
                let x = s256_field(BigUint::from_bytes_be(&sec_bin[1..]))?;
                let b = s256_field(BigUint::from(B))?;
                let alpha = x.mul(&x)?.mul(&x)?.add(&b)?;
                let beta = sqrt(&alpha);
                let (even_beta, odd_beta) = if beta.num() % 2u8 == BigUint::from(0u8) {
                    let odd = super::p() - beta.num();
                    (beta.clone(), s256_field(odd)?)
                } else {
                    let even = super::p() - beta.num();
                    (s256_field(even)?, beta.clone())
                };
                let y = if is_even { even_beta } else { odd_beta };
                let a = s256_field(BigUint::from(A))?;
                Ok(Self(Point::new(x, y, a, b)?))
            }
            _ => Err(Error::ScriptParseError),
        }
    }

    /// `ripemd160(sha256(sec(compressed)))`.
    pub fn hash160(&self, compressed: bool) -> [u8; 20] {
        hash160(&self.sec(compressed))
    }

    /// Derive the Base58Check address: `0x00`/`0x6f || hash160`.
    pub fn address(&self, compressed: bool, testnet: bool) -> String {
        let h160 = self.hash160(compressed);
        let prefix: u8 = if testnet { 0x6f } else { 0x00 };
        let mut payload = vec![prefix];
        payload.extend(h160);
        encode_base58_checksum(&payload)
    }
}

fn pad_to_32(bytes: &mut Vec<u8>) {
    if bytes.len() < 32 {
        let mut padded = vec![0u8; 32 - bytes.len()];
        padded.extend_from_slice(bytes);
        *bytes = padded;
    }
}

/// The secp256k1 generator point.
pub fn generator() -> &'static S256Point {
    static G: OnceLock<S256Point> = OnceLock::new();
    G.get_or_init(|| {
        let x = BigUint::parse_bytes(GX_HEX.as_bytes(), 16).expect("valid hex");
        let y = BigUint::parse_bytes(GY_HEX.as_bytes(), 16).expect("valid hex");
        S256Point::new(x, y).expect("generator is on the curve")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_times_generator_is_infinity() {
        let result = generator().mul(n()).unwrap();
        assert!(result.0.is_infinity());
    }

    #[test]
    fn sec_compressed_round_trips() {
        let p = generator().mul(&BigUint::from(0x1234_5deadbeefu64)).unwrap();
        let sec = p.sec(true);
        assert_eq!(sec.len(), 33);
        assert_eq!(S256Point::parse(&sec).unwrap(), p);
    }

    #[test]
    fn sec_uncompressed_round_trips() {
        let p = generator().mul(&BigUint::from(999u64)).unwrap();
        let sec = p.sec(false);
        assert_eq!(sec.len(), 65);
        assert_eq!(S256Point::parse(&sec).unwrap(), p);
    }

    #[test]
    fn known_address_vector() {
        use hex_literal::hex;

        // secret e = 0x12345deadbeef, compressed mainnet address.
        let expected_sec = hex!("030564faa58724c9326b297b3c0b35fb37a0ed7e3e13d1f1ba63fc762928f2b85b");
        let p = generator().mul(&BigUint::from(0x0001_2345_dead_beefu64)).unwrap();
        assert_eq!(p.sec(true), expected_sec);
        assert_eq!(p.address(true, false), "1F1Pn2y6pDb68E5nYJJeba4TLg2U7B6KF1");
    }
}
