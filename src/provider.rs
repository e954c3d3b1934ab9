//! Fetching previously-broadcast transactions by txid.
//!
//! The core stays synchronous: `PrevTxProvider::fetch` is a blocking call,
//! and every operation that needs a previous output's value or
//! `script_pubkey` (`TxIn::value`, `TxIn::script_pubkey`, `Tx::sig_hash`,
//! `Tx::verify`, `Tx::sign_input`) inherits that blocking behavior.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::tx::Tx;

/// A source of previously-broadcast transactions, keyed by txid.
pub trait PrevTxProvider {
    /// Fetch the transaction identified by `txid_hex` (big-endian hex,
    /// no `0x` prefix). Implementations may cache.
    fn fetch(&self, txid_hex: &str, testnet: bool) -> Result<Tx>;
}

/// Parse a raw, possibly segwit-marked transaction and confirm its id
/// matches `txid_hex`.
///
/// If byte offset 4 (where the first input's script length varint would
/// otherwise be) is `0x00`, the bytes carry a segwit marker/flag pair; they
/// are stripped and the trailing 4 bytes (the witness-format locktime) are
/// recovered as the legacy locktime before reparsing.
fn parse_prev_tx_raw(raw: &[u8], txid_hex: &str, testnet: bool) -> Result<Tx> {
    let tx = if raw.len() > 4 && raw[4] == 0 {
        let mut stripped = Vec::with_capacity(raw.len() - 2);
        stripped.extend_from_slice(&raw[..4]);
        stripped.extend_from_slice(&raw[6..raw.len() - 4]);
        let mut cursor = Cursor::new(stripped);
        let mut tx = Tx::parse(&mut cursor, testnet)?;
        let locktime = u32::from_le_bytes(
            raw[raw.len() - 4..]
                .try_into()
                .map_err(|_| Error::ProviderParseError("truncated locktime".into()))?,
        );
        tx = Tx::new(tx.version(), tx.tx_ins().to_vec(), tx.tx_outs().to_vec(), locktime, testnet);
        tx
    } else {
        let mut cursor = Cursor::new(raw);
        Tx::parse(&mut cursor, testnet)?
    };

    let actual = tx.id()?;
    if actual != txid_hex {
        return Err(Error::TxIdMismatch { requested: txid_hex.to_string(), actual });
    }
    Ok(tx)
}

/// An in-memory provider, for tests: transactions must be registered with
/// [`MapPrevTxProvider::insert`] before they can be fetched.
#[derive(Default)]
pub struct MapPrevTxProvider {
    txs: Mutex<HashMap<String, Tx>>,
}

impl MapPrevTxProvider {
    /// An empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tx`, keyed by its own computed txid.
    pub fn insert(&mut self, tx: Tx) {
        let txid = tx.id().expect("serializing a constructed Tx cannot fail");
        self.txs.get_mut().expect("not poisoned").insert(txid, tx);
    }
}

impl PrevTxProvider for MapPrevTxProvider {
    fn fetch(&self, txid_hex: &str, _testnet: bool) -> Result<Tx> {
        self.txs
            .lock()
            .expect("not poisoned")
            .get(txid_hex)
            .cloned()
            .ok_or_else(|| Error::ProviderParseError(format!("no such txid: {txid_hex}")))
    }
}

/// Wraps a raw-bytes fetch function with a shared, mutex-guarded cache, so
/// the same txid is only fetched once regardless of how many inputs
/// reference it.
pub struct CachingPrevTxProvider<F> {
    fetcher: F,
    cache: Mutex<HashMap<String, Tx>>,
}

impl<F> CachingPrevTxProvider<F>
where
    F: Fn(&str, bool) -> Result<Vec<u8>>,
{
    /// Wrap `fetcher`, which must return raw transaction bytes for a txid.
    pub fn new(fetcher: F) -> Self {
        Self { fetcher, cache: Mutex::new(HashMap::new()) }
    }
}

impl<F> PrevTxProvider for CachingPrevTxProvider<F>
where
    F: Fn(&str, bool) -> Result<Vec<u8>>,
{
    fn fetch(&self, txid_hex: &str, testnet: bool) -> Result<Tx> {
        if let Some(tx) = self.cache.lock().expect("not poisoned").get(txid_hex) {
            return Ok(tx.clone());
        }
        let raw = (self.fetcher)(txid_hex, testnet)?;
        let tx = parse_prev_tx_raw(&raw, txid_hex, testnet)?;
        self.cache
            .lock()
            .expect("not poisoned")
            .insert(txid_hex.to_string(), tx.clone());
        Ok(tx)
    }
}

#[cfg(feature = "http")]
mod http {
    use super::*;

    const MAINNET_BASE: &str = "https://blockstream.info/api";
    const TESTNET_BASE: &str = "https://blockstream.info/testnet/api";

    /// Fetches raw transaction bytes over HTTP. Not part of the core: built
    /// only behind the `http` feature, as an illustrative implementation of
    /// the `{base}/tx/{txid}.hex` endpoint in spec form.
    pub struct HttpPrevTxProvider {
        inner: CachingPrevTxProvider<Box<dyn Fn(&str, bool) -> Result<Vec<u8>> + Send + Sync>>,
    }

    impl HttpPrevTxProvider {
        /// A provider backed by a blocking HTTP client.
        pub fn new() -> Self {
            let fetcher: Box<dyn Fn(&str, bool) -> Result<Vec<u8>> + Send + Sync> =
                Box::new(|txid: &str, testnet: bool| {
                    let base = if testnet { TESTNET_BASE } else { MAINNET_BASE };
                    let url = format!("{base}/tx/{txid}/hex");
                    let body = ureq::get(&url)
                        .call()
                        .map_err(|e| Error::NetworkError(e.to_string()))?
                        .into_string()
                        .map_err(|e| Error::NetworkError(e.to_string()))?;
                    hex::decode(body.trim())
                        .map_err(|e| Error::ProviderParseError(e.to_string()))
                });
            Self { inner: CachingPrevTxProvider::new(fetcher) }
        }
    }

    impl Default for HttpPrevTxProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PrevTxProvider for HttpPrevTxProvider {
        fn fetch(&self, txid_hex: &str, testnet: bool) -> Result<Tx> {
            self.inner.fetch(txid_hex, testnet)
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpPrevTxProvider;
