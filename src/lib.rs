#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(
    clippy::unwrap_used,
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications
)]

//! Finite-field and elliptic-curve arithmetic, deterministic ECDSA, a Script
//! evaluator, and legacy Bitcoin transaction construction/signing/verification
//! for secp256k1.
//!
//! Non-goals: SegWit/witness transactions, Taproot, full block validation,
//! P2P networking, mempool policy, fee estimation, and CLI entry points.
//! None of those surfaces are implemented here.

pub mod error;
pub mod field;
pub mod helpers;
pub mod point;
pub mod private_key;
pub mod provider;
pub mod script;
pub mod secp256k1;
pub mod signature;
pub mod tx;

pub use error::{Error, Result};
pub use field::FieldElement;
pub use point::Point;
pub use private_key::PrivateKey;
pub use provider::{MapPrevTxProvider, PrevTxProvider};
pub use script::{Command, Script};
pub use secp256k1::S256Point;
pub use signature::Signature;
pub use tx::{Tx, TxIn, TxOut};
