//! Arithmetic modulo an arbitrary prime.
//!
//! [`FieldElement`] pairs an integer `num` with its modulus `prime` and
//! keeps the invariant `0 <= num < prime`. Operations between two elements
//! require equal `prime`; mixing moduli is a [`Error::FieldMismatch`].

use core::ops::{Add, Div, Mul, Sub};

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::error::{Error, Result};

/// An element of `Z/primeZ`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldElement {
    num: BigUint,
    prime: BigUint,
}

impl FieldElement {
    /// Build a field element, rejecting `num` outside `[0, prime)`.
    pub fn new(num: BigUint, prime: BigUint) -> Result<Self> {
        if num >= prime {
            return Err(Error::OutOfRange);
        }
        Ok(Self { num, prime })
    }

    /// The element's residue, `0 <= num < prime`.
    pub fn num(&self) -> &BigUint {
        &self.num
    }

    /// The modulus this element belongs to.
    pub fn prime(&self) -> &BigUint {
        &self.prime
    }

    /// The additive identity of this element's field.
    pub fn zero_like(&self) -> Self {
        Self {
            num: BigUint::zero(),
            prime: self.prime.clone(),
        }
    }

    fn check_same_field(&self, other: &Self) -> Result<()> {
        if self.prime != other.prime {
            return Err(Error::FieldMismatch);
        }
        Ok(())
    }

    /// `self + other`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_same_field(other)?;
        let num = (&self.num + &other.num) % &self.prime;
        Ok(Self { num, prime: self.prime.clone() })
    }

    /// `self - other`.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_same_field(other)?;
        let num = (&self.num + &self.prime - &other.num) % &self.prime;
        Ok(Self { num, prime: self.prime.clone() })
    }

    /// `self * other`.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.check_same_field(other)?;
        let num = (&self.num * &other.num) % &self.prime;
        Ok(Self { num, prime: self.prime.clone() })
    }

    /// `self / other`, via Fermat's little theorem: `a/b = a * b^(prime-2) mod prime`.
    pub fn div(&self, other: &Self) -> Result<Self> {
        self.check_same_field(other)?;
        let exp = &other.prime - BigUint::from(2u8);
        let inv = other.num.modpow(&exp, &other.prime);
        let num = (&self.num * inv) % &self.prime;
        Ok(Self { num, prime: self.prime.clone() })
    }

    /// `self^exponent`. The exponent is first reduced modulo `prime - 1`
    /// (Fermat's little theorem), which makes negative exponents
    /// well-defined without a separate inversion path.
    pub fn pow(&self, exponent: &BigInt) -> Self {
        let order = BigInt::from(&self.prime - BigUint::one());
        let mut n = exponent.mod_floor(&order);
        if n.is_negative() {
            n += &order;
        }
        let n = n.to_biguint().expect("mod_floor against a positive modulus is non-negative");
        let num = self.num.modpow(&n, &self.prime);
        Self { num, prime: self.prime.clone() }
    }
}

impl Add<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;
    fn add(self, rhs: &FieldElement) -> Self::Output {
        FieldElement::add(self, rhs)
    }
}

impl Sub<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;
    fn sub(self, rhs: &FieldElement) -> Self::Output {
        FieldElement::sub(self, rhs)
    }
}

impl Mul<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;
    fn mul(self, rhs: &FieldElement) -> Self::Output {
        FieldElement::mul(self, rhs)
    }
}

impl Div<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement>;
    fn div(self, rhs: &FieldElement) -> Self::Output {
        FieldElement::div(self, rhs)
    }
}
