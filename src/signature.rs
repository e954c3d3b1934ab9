//! ECDSA `(r, s)` signatures and their DER encoding.

use num_bigint::BigUint;

use crate::error::{Error, Result};

/// An ECDSA signature `(r, s)`, `1 <= r, s < N`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    r: BigUint,
    s: BigUint,
}

impl Signature {
    /// Build a signature from its two components.
    pub fn new(r: BigUint, s: BigUint) -> Self {
        Self { r, s }
    }

    /// The `r` component.
    pub fn r(&self) -> &BigUint {
        &self.r
    }

    /// The `s` component.
    pub fn s(&self) -> &BigUint {
        &self.s
    }

    fn encode_component(n: &BigUint) -> Vec<u8> {
        let mut bin = n.to_bytes_be();
        if bin.is_empty() {
            bin.push(0);
        }
        // strip leading zero bytes, then restore one iff the top bit is
        // set, so the integer is never misread as negative.
        let first_nonzero = bin.iter().position(|&b| b != 0).unwrap_or(bin.len() - 1);
        let mut bin = bin.split_off(first_nonzero);
        if bin[0] & 0x80 != 0 {
            bin.insert(0, 0x00);
        }
        bin
    }

    /// DER encoding: `0x30 len 0x02 len(r) r 0x02 len(s) s`.
    pub fn der(&self) -> Vec<u8> {
        let rbin = Self::encode_component(&self.r);
        let sbin = Self::encode_component(&self.s);

        let mut body = Vec::with_capacity(rbin.len() + sbin.len() + 4);
        body.push(0x02);
        body.push(rbin.len() as u8);
        body.extend_from_slice(&rbin);
        body.push(0x02);
        body.push(sbin.len() as u8);
        body.extend_from_slice(&sbin);

        let mut result = Vec::with_capacity(body.len() + 2);
        result.push(0x30);
        result.push(body.len() as u8);
        result.extend_from_slice(&body);
        result
    }

    /// Parse a DER-encoded signature.
    pub fn parse(der: &[u8]) -> Result<Self> {
        let mut pos = 0usize;
        let next = |pos: &mut usize, n: usize| -> Result<&[u8]> {
            let end = pos.checked_add(n).ok_or(Error::DerDecodeError)?;
            let slice = der.get(*pos..end).ok_or(Error::DerDecodeError)?;
            *pos = end;
            Ok(slice)
        };

        if *next(&mut pos, 1)?.first().ok_or(Error::DerDecodeError)? != 0x30 {
            return Err(Error::DerDecodeError);
        }
        let total_len = *next(&mut pos, 1)?.first().ok_or(Error::DerDecodeError)? as usize;
        if pos + total_len != der.len() {
            return Err(Error::DerDecodeError);
        }

        if *next(&mut pos, 1)?.first().ok_or(Error::DerDecodeError)? != 0x02 {
            return Err(Error::DerDecodeError);
        }
        let r_len = *next(&mut pos, 1)?.first().ok_or(Error::DerDecodeError)? as usize;
        let r = BigUint::from_bytes_be(next(&mut pos, r_len)?);

        if *next(&mut pos, 1)?.first().ok_or(Error::DerDecodeError)? != 0x02 {
            return Err(Error::DerDecodeError);
        }
        let s_len = *next(&mut pos, 1)?.first().ok_or(Error::DerDecodeError)? as usize;
        let s = BigUint::from_bytes_be(next(&mut pos, s_len)?);

        if pos != der.len() {
            return Err(Error::DerDecodeError);
        }

        Ok(Self { r, s })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn der_round_trips() {
        let sig = Signature::new(BigUint::from(0x1234_5678u64), BigUint::from(0x9abc_def0u64));
        let der = sig.der();
        assert_eq!(Signature::parse(&der).unwrap(), sig);
    }

    #[test]
    fn der_pads_high_bit_components() {
        // A component whose top byte has its high bit set must be prefixed
        // with 0x00 so it isn't misread as a negative ASN.1 integer.
        let r = BigUint::from_bytes_be(&[0x80, 0x01]);
        let s = BigUint::from(1u8);
        let sig = Signature::new(r, s);
        let der = sig.der();
        assert_eq!(der[4], 0x00);
        assert_eq!(Signature::parse(&der).unwrap(), sig);
    }

    #[test]
    fn parse_rejects_truncated_input() {
        assert!(Signature::parse(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01]).is_err());
    }

    #[test]
    fn parse_rejects_wrong_tag() {
        assert!(Signature::parse(&[0x31, 0x00]).is_err());
    }
}
