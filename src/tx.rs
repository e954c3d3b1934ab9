//! Legacy Bitcoin transactions: serialization, signature hashing, fees, and
//! input signing/verification.

use std::io::Read;

use num_bigint::BigUint;

use crate::error::{Error, Result};
use crate::helpers::{encode_varint, hash256, read_varint};
use crate::private_key::PrivateKey;
use crate::provider::PrevTxProvider;
use crate::script::{Command, Script};

const SIGHASH_ALL: u32 = 1;

/// One transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    prev_tx: [u8; 32],
    prev_index: u32,
    script_sig: Script,
    sequence: u32,
}

impl TxIn {
    /// Build an input with an empty `script_sig`, default sequence `0xffffffff`.
    pub fn new(prev_tx: [u8; 32], prev_index: u32) -> Self {
        Self {
            prev_tx,
            prev_index,
            script_sig: Script::empty(),
            sequence: 0xffff_ffff,
        }
    }

    /// `prev_tx` in natural (big-endian) hash order, as stored internally.
    pub fn prev_tx(&self) -> &[u8; 32] {
        &self.prev_tx
    }

    /// Index of the referenced output in the previous transaction.
    pub fn prev_index(&self) -> u32 {
        self.prev_index
    }

    /// The current unlocking script.
    pub fn script_sig(&self) -> &Script {
        &self.script_sig
    }

    /// Replace the unlocking script (used by [`Tx::sign_input`] and by
    /// `sig_hash`'s input substitution).
    pub fn set_script_sig(&mut self, script_sig: Script) {
        self.script_sig = script_sig;
    }

    fn parse<R: Read>(stream: &mut R) -> Result<Self> {
        let mut prev_tx_le = [0u8; 32];
        stream.read_exact(&mut prev_tx_le)?;
        prev_tx_le.reverse();

        let mut index_buf = [0u8; 4];
        stream.read_exact(&mut index_buf)?;
        let prev_index = u32::from_le_bytes(index_buf);

        let script_sig = Script::parse(stream)?;

        let mut seq_buf = [0u8; 4];
        stream.read_exact(&mut seq_buf)?;
        let sequence = u32::from_le_bytes(seq_buf);

        Ok(Self { prev_tx: prev_tx_le, prev_index, script_sig, sequence })
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut reversed = self.prev_tx;
        reversed.reverse();
        out.extend(reversed);
        out.extend(self.prev_index.to_le_bytes());
        out.extend(self.script_sig.serialize()?);
        out.extend(self.sequence.to_le_bytes());
        Ok(out)
    }

    /// Fetch the previous transaction through `provider` and return it.
    fn fetch_prev_tx<P: PrevTxProvider>(&self, provider: &P, testnet: bool) -> Result<Tx> {
        let txid_hex = hex::encode(self.prev_tx);
        provider.fetch(&txid_hex, testnet)
    }

    /// The referenced output's value, in satoshis.
    pub fn value<P: PrevTxProvider>(&self, provider: &P, testnet: bool) -> Result<u64> {
        let prev = self.fetch_prev_tx(provider, testnet)?;
        let out = prev
            .tx_outs
            .get(self.prev_index as usize)
            .ok_or(Error::ProviderParseError("prev_index out of range".into()))?;
        Ok(out.amount)
    }

    /// The referenced output's `script_pubkey`.
    pub fn script_pubkey<P: PrevTxProvider>(&self, provider: &P, testnet: bool) -> Result<Script> {
        let prev = self.fetch_prev_tx(provider, testnet)?;
        let out = prev
            .tx_outs
            .get(self.prev_index as usize)
            .ok_or(Error::ProviderParseError("prev_index out of range".into()))?;
        Ok(out.script_pubkey.clone())
    }
}

/// One transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    amount: u64,
    script_pubkey: Script,
}

impl TxOut {
    /// Build an output.
    pub fn new(amount: u64, script_pubkey: Script) -> Self {
        Self { amount, script_pubkey }
    }

    /// Value, in satoshis.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// The locking script.
    pub fn script_pubkey(&self) -> &Script {
        &self.script_pubkey
    }

    fn parse<R: Read>(stream: &mut R) -> Result<Self> {
        let mut amount_buf = [0u8; 8];
        stream.read_exact(&mut amount_buf)?;
        let amount = u64::from_le_bytes(amount_buf);
        let script_pubkey = Script::parse(stream)?;
        Ok(Self { amount, script_pubkey })
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend(self.amount.to_le_bytes());
        out.extend(self.script_pubkey.serialize()?);
        Ok(out)
    }
}

/// A legacy (pre-SegWit) Bitcoin transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    version: u32,
    tx_ins: Vec<TxIn>,
    tx_outs: Vec<TxOut>,
    locktime: u32,
    testnet: bool,
}

impl Tx {
    /// Build a transaction from its parts.
    pub fn new(version: u32, tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>, locktime: u32, testnet: bool) -> Self {
        Self { version, tx_ins, tx_outs, locktime, testnet }
    }

    /// Protocol version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Inputs.
    pub fn tx_ins(&self) -> &[TxIn] {
        &self.tx_ins
    }

    /// Outputs.
    pub fn tx_outs(&self) -> &[TxOut] {
        &self.tx_outs
    }

    /// Locktime.
    pub fn locktime(&self) -> u32 {
        self.locktime
    }

    /// Whether this transaction targets testnet.
    pub fn testnet(&self) -> bool {
        self.testnet
    }

    /// Parse a legacy transaction from a byte stream.
    pub fn parse<R: Read>(stream: &mut R, testnet: bool) -> Result<Self> {
        let mut version_buf = [0u8; 4];
        stream.read_exact(&mut version_buf)?;
        let version = u32::from_le_bytes(version_buf);

        let num_inputs = read_varint(stream)?;
        let mut tx_ins = Vec::with_capacity(num_inputs as usize);
        for _ in 0..num_inputs {
            tx_ins.push(TxIn::parse(stream)?);
        }

        let num_outputs = read_varint(stream)?;
        let mut tx_outs = Vec::with_capacity(num_outputs as usize);
        for _ in 0..num_outputs {
            tx_outs.push(TxOut::parse(stream)?);
        }

        let mut locktime_buf = [0u8; 4];
        stream.read_exact(&mut locktime_buf)?;
        let locktime = u32::from_le_bytes(locktime_buf);

        Ok(Self { version, tx_ins, tx_outs, locktime, testnet })
    }

    /// Serialize the transaction in legacy wire format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend(self.version.to_le_bytes());
        out.extend(encode_varint(self.tx_ins.len() as u64)?);
        for tx_in in &self.tx_ins {
            out.extend(tx_in.serialize()?);
        }
        out.extend(encode_varint(self.tx_outs.len() as u64)?);
        for tx_out in &self.tx_outs {
            out.extend(tx_out.serialize()?);
        }
        out.extend(self.locktime.to_le_bytes());
        Ok(out)
    }

    /// `hash256(serialize())`, in little-endian wire order.
    pub fn hash(&self) -> Result<[u8; 32]> {
        let h = hash256(&self.serialize()?);
        let mut reversed = h;
        reversed.reverse();
        Ok(reversed)
    }

    /// The human-readable, big-endian-hex txid.
    pub fn id(&self) -> Result<String> {
        Ok(hex::encode(self.hash()?))
    }

    /// Compute the signature hash for input `i`, substituting its previous
    /// `script_pubkey` for `script_sig` and emptying every other input's.
    pub fn sig_hash<P: PrevTxProvider>(&self, i: usize, provider: &P) -> Result<BigUint> {
        let mut buffer = Vec::new();
        buffer.extend(self.version.to_le_bytes());
        buffer.extend(encode_varint(self.tx_ins.len() as u64)?);

        for (j, tx_in) in self.tx_ins.iter().enumerate() {
            let script_sig = if j == i {
                tx_in.script_pubkey(provider, self.testnet)?
            } else {
                Script::empty()
            };
            let mut reversed = tx_in.prev_tx;
            reversed.reverse();
            buffer.extend(reversed);
            buffer.extend(tx_in.prev_index.to_le_bytes());
            buffer.extend(script_sig.serialize()?);
            buffer.extend(tx_in.sequence.to_le_bytes());
        }

        buffer.extend(encode_varint(self.tx_outs.len() as u64)?);
        for tx_out in &self.tx_outs {
            buffer.extend(tx_out.serialize()?);
        }

        buffer.extend(self.locktime.to_le_bytes());
        buffer.extend(SIGHASH_ALL.to_le_bytes());

        Ok(BigUint::from_bytes_be(&hash256(&buffer)))
    }

    /// `Σ(tx_in.value()) − Σ(tx_out.amount)`.
    pub fn fee<P: PrevTxProvider>(&self, provider: &P) -> Result<i64> {
        let mut input_sum: i64 = 0;
        for tx_in in &self.tx_ins {
            input_sum += tx_in.value(provider, self.testnet)? as i64;
        }
        let output_sum: i64 = self.tx_outs.iter().map(|o| o.amount as i64).sum();
        Ok(input_sum - output_sum)
    }

    /// Evaluate `script_sig ++ script_pubkey` for input `i` against `sig_hash(i)`.
    pub fn verify_input<P: PrevTxProvider>(&self, i: usize, provider: &P) -> Result<bool> {
        let tx_in = self.tx_ins.get(i).ok_or(Error::ScriptEvalFailure)?;
        let z = self.sig_hash(i, provider)?;
        let script_pubkey = tx_in.script_pubkey(provider, self.testnet)?;
        let combined = tx_in.script_sig.concat(&script_pubkey);
        combined.evaluate(&z)
    }

    /// `fee() >= 0` and every input verifies.
    pub fn verify<P: PrevTxProvider>(&self, provider: &P) -> Result<bool> {
        if self.fee(provider)? < 0 {
            return Ok(false);
        }
        for i in 0..self.tx_ins.len() {
            if !self.verify_input(i, provider)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sign input `i` with `private_key`, installing `script_sig = [sig ||
    /// SIGHASH_ALL, pubkey.sec(compressed)]`, then confirm it verifies.
    pub fn sign_input<P: PrevTxProvider>(
        &mut self,
        i: usize,
        private_key: &PrivateKey,
        compressed: bool,
        provider: &P,
    ) -> Result<bool> {
        let z = self.sig_hash(i, provider)?;
        let der = private_key.sign(&z)?.der();
        let mut sig_bytes = der;
        sig_bytes.push(0x01);
        let sec = private_key.point().sec(compressed);
        let script_sig = Script::new(vec![Command::Data(sig_bytes), Command::Data(sec)]);

        let tx_in = self.tx_ins.get_mut(i).ok_or(Error::ScriptEvalFailure)?;
        tx_in.set_script_sig(script_sig);

        let ok = self.verify_input(i, provider)?;
        if !ok {
            return Err(Error::SignatureInvalid);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::private_key::PrivateKey;
    use crate::provider::MapPrevTxProvider;

    fn make_funding_tx(locking_script: Script, amount: u64) -> Tx {
        let tx_in = TxIn::new([0x11; 32], 0);
        let tx_out = TxOut::new(amount, locking_script);
        Tx::new(1, vec![tx_in], vec![tx_out], 0, true)
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let pk = PrivateKey::new(BigUint::from(424242u64)).unwrap();
        let h160 = pk.point().hash160(true);
        let funding = make_funding_tx(Script::p2pkh(&h160), 5000);
        let funding_id = funding.id().unwrap();

        let mut provider = MapPrevTxProvider::new();
        provider.insert(funding);

        let prev_txid_bytes = hex::decode(&funding_id).unwrap();
        let mut prev_tx = [0u8; 32];
        prev_tx.copy_from_slice(&prev_txid_bytes);

        let spend_in = TxIn::new(prev_tx, 0);
        let spend_out = TxOut::new(4000, Script::p2pkh(&h160));
        let mut spend = Tx::new(1, vec![spend_in], vec![spend_out], 0, true);

        assert!(spend.sign_input(0, &pk, true, &provider).unwrap());
        assert!(spend.verify(&provider).unwrap());
        assert_eq!(spend.fee(&provider).unwrap(), 1000);
    }

    #[test]
    fn verify_fails_on_negative_fee() {
        let pk = PrivateKey::new(BigUint::from(7u64)).unwrap();
        let h160 = pk.point().hash160(true);
        let funding = make_funding_tx(Script::p2pkh(&h160), 1000);
        let funding_id = funding.id().unwrap();

        let mut provider = MapPrevTxProvider::new();
        provider.insert(funding);

        let prev_txid_bytes = hex::decode(&funding_id).unwrap();
        let mut prev_tx = [0u8; 32];
        prev_tx.copy_from_slice(&prev_txid_bytes);

        let spend_in = TxIn::new(prev_tx, 0);
        let spend_out = TxOut::new(2000, Script::p2pkh(&h160));
        let mut spend = Tx::new(1, vec![spend_in], vec![spend_out], 0, true);

        // Signing succeeds (the script itself is valid); it's `verify`'s
        // fee check that must reject this transaction.
        assert!(spend.sign_input(0, &pk, true, &provider).unwrap());
        assert_eq!(spend.fee(&provider).unwrap(), -1000);
        assert!(!spend.verify(&provider).unwrap());
    }

    #[test]
    fn serialize_parse_round_trips() {
        let pk = PrivateKey::new(BigUint::from(99u64)).unwrap();
        let h160 = pk.point().hash160(true);
        let tx = make_funding_tx(Script::p2pkh(&h160), 777);
        let bytes = tx.serialize().unwrap();
        let mut cursor = std::io::Cursor::new(bytes);
        let parsed = Tx::parse(&mut cursor, true).unwrap();
        assert_eq!(parsed, tx);
    }
}
