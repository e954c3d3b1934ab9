//! Points on a short Weierstrass curve `y^2 = x^3 + a*x + b` over
//! [`FieldElement`].
//!
//! The point at infinity is modeled as a distinct variant rather than a pair
//! of absent coordinates, per the design note that a tagged sum is cleaner
//! than nullable `x`/`y` fields.

use num_bigint::BigUint;

use crate::error::{Error, Result};
use crate::field::FieldElement;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Coords {
    Infinity,
    Affine(FieldElement, FieldElement),
}

/// A point on `y^2 = x^3 + a*x + b`, either the identity or an affine pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Point {
    coords: Coords,
    a: FieldElement,
    b: FieldElement,
}

impl Point {
    /// Construct the point at infinity (the group identity) for curve `(a, b)`.
    pub fn infinity(a: FieldElement, b: FieldElement) -> Self {
        Self { coords: Coords::Infinity, a, b }
    }

    /// Construct an affine point, validating it lies on the curve.
    pub fn new(x: FieldElement, y: FieldElement, a: FieldElement, b: FieldElement) -> Result<Self> {
        let lhs = y.mul(&y)?;
        let rhs = x.mul(&x)?.mul(&x)?.add(&a.mul(&x)?)?.add(&b)?;
        if lhs != rhs {
            return Err(Error::NotOnCurve);
        }
        Ok(Self { coords: Coords::Affine(x, y), a, b })
    }

    /// `true` if this is the point at infinity.
    pub fn is_infinity(&self) -> bool {
        matches!(self.coords, Coords::Infinity)
    }

    /// The affine `x` coordinate, or `None` at infinity.
    pub fn x(&self) -> Option<&FieldElement> {
        match &self.coords {
            Coords::Affine(x, _) => Some(x),
            Coords::Infinity => None,
        }
    }

    /// The affine `y` coordinate, or `None` at infinity.
    pub fn y(&self) -> Option<&FieldElement> {
        match &self.coords {
            Coords::Affine(_, y) => Some(y),
            Coords::Infinity => None,
        }
    }

    fn check_same_curve(&self, other: &Self) -> Result<()> {
        if self.a != other.a || self.b != other.b {
            return Err(Error::CurveMismatch);
        }
        Ok(())
    }

    /// The group law. See `spec.md` §4.2 for the case analysis.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_same_curve(other)?;

        let (x1, y1) = match &self.coords {
            Coords::Infinity => return Ok(other.clone()),
            Coords::Affine(x, y) => (x, y),
        };
        let (x2, y2) = match &other.coords {
            Coords::Infinity => return Ok(self.clone()),
            Coords::Affine(x, y) => (x, y),
        };

        if x1 == x2 && y1 != y2 {
            return Ok(Self::infinity(self.a.clone(), self.b.clone()));
        }

        if x1 != x2 {
            let s = y2.sub(y1)?.div(&x2.sub(x1)?)?;
            let x3 = s.mul(&s)?.sub(x1)?.sub(x2)?;
            let y3 = s.mul(&x1.sub(&x3)?)?.sub(y1)?;
            return Self::new(x3, y3, self.a.clone(), self.b.clone());
        }

        // x1 == x2, y1 == y2: either a vertical tangent (y == 0) or the
        // general doubling case.
        if y1.num() == &BigUint::from(0u8) {
            return Ok(Self::infinity(self.a.clone(), self.b.clone()));
        }

        let two = y1.add(y1)?;
        let three_x1_sq = {
            let x1_sq = x1.mul(x1)?;
            x1_sq.add(&x1_sq)?.add(&x1_sq)?
        };
        let s = three_x1_sq.add(&self.a)?.div(&two)?;
        let x3 = s.mul(&s)?.sub(x1)?.sub(x1)?;
        let y3 = s.mul(&x1.sub(&x3)?)?.sub(y1)?;
        Self::new(x3, y3, self.a.clone(), self.b.clone())
    }

    /// Scalar multiplication by a non-negative integer, via LSB-first
    /// double-and-add.
    pub fn mul(&self, coefficient: &BigUint) -> Result<Self> {
        let mut coef = coefficient.clone();
        let mut current = self.clone();
        let mut result = Self::infinity(self.a.clone(), self.b.clone());
        let zero = BigUint::from(0u8);
        let one = BigUint::from(1u8);
        while coef > zero {
            if &coef & &one == one {
                result = result.add(&current)?;
            }
            current = current.add(&current)?;
            coef >>= 1;
        }
        Ok(result)
    }
}
