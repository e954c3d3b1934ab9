//! The secp256k1 curve: `y^2 = x^3 + 7` over `F_p`, `p = 2^256 - 2^32 - 977`,
//! with generator `G` and prime group order `n`.

pub mod field;
pub mod point;

pub use field::s256_field;
pub use point::{generator, S256Point};

use std::sync::OnceLock;

use num_bigint::BigUint;

/// Curve coefficient `a` in `y^2 = x^3 + a*x + b`.
pub const A: u64 = 0;

/// Curve coefficient `b` in `y^2 = x^3 + a*x + b`.
pub const B: u64 = 7;

/// Field prime `p = 2^256 - 2^32 - 977`, in hex.
pub const P_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F";

/// Group order `n`, in hex.
pub const N_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141";

/// Generator x-coordinate, in hex.
pub const GX_HEX: &str = "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798";

/// Generator y-coordinate, in hex.
pub const GY_HEX: &str = "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8";

fn hex_to_biguint(hex: &str) -> BigUint {
    BigUint::parse_bytes(hex.as_bytes(), 16).expect("curve constants are valid hex")
}

/// The field prime `p`.
pub fn p() -> &'static BigUint {
    static P: OnceLock<BigUint> = OnceLock::new();
    P.get_or_init(|| hex_to_biguint(P_HEX))
}

/// The group order `n`.
pub fn n() -> &'static BigUint {
    static N: OnceLock<BigUint> = OnceLock::new();
    N.get_or_init(|| hex_to_biguint(N_HEX))
}

/// Reduce a scalar modulo `n`, since `n*G = O` makes any multiple of `n`
/// redundant in scalar multiplication.
pub fn reduce_scalar(scalar: &BigUint) -> BigUint {
    scalar % n()
}
