//! Hashing, Base58Check, varints, and little-endian integer conversions.

use std::io::Read;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// `sha256(sha256(x))`.
pub fn hash256(s: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(s);
    Sha256::digest(first).into()
}

/// `ripemd160(sha256(x))`.
pub fn hash160(s: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(s);
    Ripemd160::digest(sha).into()
}

/// Base58-encode `s`, mapping leading zero bytes to leading `'1'`s.
pub fn encode_base58(s: &[u8]) -> String {
    let leading_zeros = s.iter().take_while(|&&b| b == 0).count();
    let mut num = BigUint::from_bytes_be(s);
    let base = BigUint::from(58u8);
    let mut digits = Vec::new();
    while !num.is_zero() {
        let (q, r) = {
            let r = &num % &base;
            (&num / &base, r)
        };
        let idx = r.to_usize().expect("remainder mod 58 fits in usize");
        digits.push(BASE58_ALPHABET[idx]);
        num = q;
    }
    digits.reverse();
    let prefix = "1".repeat(leading_zeros);
    prefix + std::str::from_utf8(&digits).expect("alphabet is ASCII")
}

/// Base58Check-encode: append the first 4 bytes of `hash256(payload)`, then
/// Base58-encode.
pub fn encode_base58_checksum(payload: &[u8]) -> String {
    let mut buf = payload.to_vec();
    buf.extend_from_slice(&hash256(payload)[..4]);
    encode_base58(&buf)
}

/// Decode a Base58 string back to bytes, with no checksum handling.
pub fn decode_base58(s: &str) -> Result<Vec<u8>> {
    let mut num = BigUint::zero();
    let base = BigUint::from(58u8);
    for c in s.bytes() {
        let digit = BASE58_ALPHABET
            .iter()
            .position(|&b| b == c)
            .ok_or(Error::Base58ChecksumError)?;
        num = &num * &base + BigUint::from(digit);
    }
    let leading_ones = s.bytes().take_while(|&b| b == b'1').count();
    let mut combined = vec![0u8; leading_ones];
    combined.extend_from_slice(&num.to_bytes_be());
    Ok(combined)
}

/// Decode a Base58Check string, validating and stripping its checksum.
pub fn decode_base58_checksum(s: &str) -> Result<Vec<u8>> {
    let combined = decode_base58(s)?;
    if combined.len() < 4 {
        return Err(Error::Base58ChecksumError);
    }
    let (payload, checksum) = combined.split_at(combined.len() - 4);
    if &hash256(payload)[..4] != checksum {
        return Err(Error::Base58ChecksumError);
    }
    Ok(payload.to_vec())
}

/// Interpret `b` as a little-endian unsigned integer.
pub fn little_endian_to_u64(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..b.len()].copy_from_slice(b);
    u64::from_le_bytes(buf)
}

/// Encode `n` as `length` little-endian bytes.
pub fn u64_to_little_endian(n: u64, length: usize) -> Vec<u8> {
    n.to_le_bytes()[..length].to_vec()
}

/// Read a Bitcoin varint from a stream.
///
/// `i < 0xFD` is the literal byte; `0xFD`/`0xFE`/`0xFF` prefix a 2/4/8-byte
/// little-endian length.
pub fn read_varint<R: Read>(stream: &mut R) -> Result<u64> {
    let mut prefix = [0u8; 1];
    stream.read_exact(&mut prefix)?;
    match prefix[0] {
        0xFD => {
            let mut buf = [0u8; 2];
            stream.read_exact(&mut buf)?;
            Ok(little_endian_to_u64(&buf))
        }
        0xFE => {
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf)?;
            Ok(little_endian_to_u64(&buf))
        }
        0xFF => {
            let mut buf = [0u8; 8];
            stream.read_exact(&mut buf)?;
            Ok(little_endian_to_u64(&buf))
        }
        i => Ok(i as u64),
    }
}

/// Encode `i` as a Bitcoin varint.
pub fn encode_varint(i: u64) -> Result<Vec<u8>> {
    if i < 0xFD {
        Ok(vec![i as u8])
    } else if i < 0x1_0000 {
        let mut out = vec![0xFD];
        out.extend(u64_to_little_endian(i, 2));
        Ok(out)
    } else if i < 0x1_0000_0000 {
        let mut out = vec![0xFE];
        out.extend(u64_to_little_endian(i, 4));
        Ok(out)
    } else {
        let mut out = vec![0xFF];
        out.extend(u64_to_little_endian(i, 8));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_round_trips_every_band() {
        for i in [0u64, 0xFC, 0xFD, 0xFFFF, 0x1_0000, 0xFFFF_FFFF, 0x1_0000_0000, u64::MAX] {
            let encoded = encode_varint(i).unwrap();
            let mut cursor = std::io::Cursor::new(encoded);
            assert_eq!(read_varint(&mut cursor).unwrap(), i);
        }
    }

    #[test]
    fn base58_round_trips_with_leading_zero_bytes() {
        let payload = [0u8, 0u8, 1, 2, 3, 4, 5];
        let encoded = encode_base58(&payload);
        assert!(encoded.starts_with("11"));
        assert_eq!(decode_base58(&encoded).unwrap(), payload);
    }

    #[test]
    fn base58_checksum_detects_corruption() {
        let encoded = encode_base58_checksum(&[1, 2, 3, 4]);
        let mut bytes = encoded.into_bytes();
        // Flip the last character to a different, still-valid alphabet letter.
        let last = *bytes.last().unwrap();
        let alt = BASE58_ALPHABET.iter().find(|&&b| b != last).copied().unwrap();
        *bytes.last_mut().unwrap() = alt;
        let corrupted = String::from_utf8(bytes).unwrap();
        assert!(matches!(
            decode_base58_checksum(&corrupted),
            Err(Error::Base58ChecksumError)
        ));
    }

    #[test]
    fn hash256_is_double_sha256() {
        let once = Sha256::digest(b"abc");
        let twice = Sha256::digest(once);
        assert_eq!(hash256(b"abc"), twice.as_slice());
    }
}
