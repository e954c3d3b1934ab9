//! Error types.

use core::fmt;

/// Errors produced by this crate.
///
/// Every variant corresponds to one entry of the error taxonomy: arithmetic
/// and parsing failures abort the operation they occur in and are surfaced
/// to the caller rather than defaulted away.
#[derive(Debug)]
pub enum Error {
    /// A [`FieldElement`](crate::field::FieldElement) was constructed with
    /// `num` outside `[0, prime)`.
    OutOfRange,

    /// Two field elements with different moduli were combined.
    FieldMismatch,

    /// Two points from different curves (differing `a`/`b`) were combined.
    CurveMismatch,

    /// A point's coordinates do not satisfy `y^2 = x^3 + a*x + b`.
    NotOnCurve,

    /// A [`Script`](crate::script::Script) could not be parsed: a length
    /// prefix overran the byte budget, or a push was malformed.
    ScriptParseError,

    /// Script evaluation failed: an opcode returned failure, the stack was
    /// empty at termination, or the top element was the empty byte string.
    ScriptEvalFailure,

    /// A DER-encoded signature was malformed.
    DerDecodeError,

    /// A Base58Check payload's checksum did not match.
    Base58ChecksumError,

    /// A varint-prefixed length or its encoding would overflow.
    VarIntTooLarge,

    /// `sign_input` produced a signature that does not itself verify.
    SignatureInvalid,

    /// [`PrevTxProvider::fetch`](crate::provider::PrevTxProvider::fetch)
    /// returned a transaction whose id does not match the requested txid.
    TxIdMismatch {
        /// txid that was requested.
        requested: String,
        /// txid actually computed from the fetched transaction.
        actual: String,
    },

    /// The previous-transaction provider could not complete the request
    /// (connection refused, timeout, non-2xx response, ...).
    NetworkError(String),

    /// The previous-transaction provider returned bytes that do not parse
    /// as a legacy transaction.
    ProviderParseError(String),

    /// Underlying I/O failure while reading a parse stream.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange => write!(f, "num not in field range"),
            Error::FieldMismatch => write!(f, "cannot operate on elements of different fields"),
            Error::CurveMismatch => write!(f, "points are not on the same curve"),
            Error::NotOnCurve => write!(f, "point is not on the curve"),
            Error::ScriptParseError => write!(f, "script parsing failed"),
            Error::ScriptEvalFailure => write!(f, "script evaluation failed"),
            Error::DerDecodeError => write!(f, "malformed DER signature"),
            Error::Base58ChecksumError => write!(f, "bad address: checksum mismatch"),
            Error::VarIntTooLarge => write!(f, "integer too large for varint encoding"),
            Error::SignatureInvalid => write!(f, "signature does not verify"),
            Error::TxIdMismatch { requested, actual } => {
                write!(f, "not the same id: {requested} vs {actual}")
            }
            Error::NetworkError(msg) => write!(f, "network error: {msg}"),
            Error::ProviderParseError(msg) => write!(f, "unexpected response: {msg}"),
            Error::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
