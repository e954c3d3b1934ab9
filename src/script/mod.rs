//! Bitcoin Script: a stack-based command list, its serialization, and the
//! evaluator that scripts compose through.

mod op;

use std::collections::VecDeque;
use std::io::Read;

use num_bigint::BigUint;

use crate::error::{Error, Result};
use crate::helpers::{encode_varint, read_varint};

/// One element of a [`Script`]'s command list: either a pushed data element
/// or an opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// A byte string to be pushed onto the stack, length `1..=520`.
    Data(Vec<u8>),
    /// An opcode, `0..=255`.
    Op(u8),
}

/// An ordered list of [`Command`]s.
///
/// `scriptSig` and `scriptPubKey` are both `Script`s; they compose by
/// concatenation (`scriptSig ++ scriptPubKey`), with the unlocking script
/// executing first and leaving its results for the locking script to
/// consume.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Script {
    cmds: Vec<Command>,
}

impl Script {
    /// Build a script from an explicit command list.
    pub fn new(cmds: Vec<Command>) -> Self {
        Self { cmds }
    }

    /// The empty script.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The P2PKH `scriptPubKey` template:
    /// `OP_DUP OP_HASH160 <h160> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(h160: &[u8; 20]) -> Self {
        Self::new(vec![
            Command::Op(op::OP_DUP),
            Command::Op(op::OP_HASH160),
            Command::Data(h160.to_vec()),
            Command::Op(op::OP_EQUALVERIFY),
            Command::Op(op::OP_CHECKSIG),
        ])
    }

    /// Concatenate `self ++ other`, `self` executing first.
    pub fn concat(&self, other: &Self) -> Self {
        let mut cmds = self.cmds.clone();
        cmds.extend(other.cmds.iter().cloned());
        Self { cmds }
    }

    /// Parse a length-prefixed script from a stream.
    pub fn parse<R: Read>(stream: &mut R) -> Result<Self> {
        let length = read_varint(stream)?;
        let mut cmds = Vec::new();
        let mut count: u64 = 0;
        while count < length {
            let mut current = [0u8; 1];
            stream.read_exact(&mut current)?;
            count += 1;
            let current_byte = current[0];
            match current_byte {
                1..=75 => {
                    let n = current_byte as usize;
                    let mut buf = vec![0u8; n];
                    stream.read_exact(&mut buf)?;
                    count += n as u64;
                    cmds.push(Command::Data(buf));
                }
                76 => {
                    let mut len_buf = [0u8; 1];
                    stream.read_exact(&mut len_buf)?;
                    let n = len_buf[0] as usize;
                    let mut buf = vec![0u8; n];
                    stream.read_exact(&mut buf)?;
                    count += 1 + n as u64;
                    cmds.push(Command::Data(buf));
                }
                77 => {
                    let mut len_buf = [0u8; 2];
                    stream.read_exact(&mut len_buf)?;
                    let n = u16::from_le_bytes(len_buf) as usize;
                    let mut buf = vec![0u8; n];
                    stream.read_exact(&mut buf)?;
                    count += 2 + n as u64;
                    cmds.push(Command::Data(buf));
                }
                op_code => cmds.push(Command::Op(op_code)),
            }
        }
        if count != length {
            return Err(Error::ScriptParseError);
        }
        Ok(Self { cmds })
    }

    fn raw_serialize(&self) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        for cmd in &self.cmds {
            match cmd {
                Command::Op(op_code) => result.push(*op_code),
                Command::Data(data) => {
                    let length = data.len();
                    match length {
                        1..=75 => result.push(length as u8),
                        76..=255 => {
                            result.push(76);
                            result.push(length as u8);
                        }
                        256..=520 => {
                            result.push(77);
                            result.extend((length as u16).to_le_bytes());
                        }
                        _ => return Err(Error::ScriptParseError),
                    }
                    result.extend(data);
                }
            }
        }
        Ok(result)
    }

    /// Serialize: `varint(len) || raw_serialize()`.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let raw = self.raw_serialize()?;
        let mut out = encode_varint(raw.len() as u64)?;
        out.extend(raw);
        Ok(out)
    }

    /// Evaluate the script against signature hash `z`.
    ///
    /// Valid iff the main stack is non-empty at termination and its top
    /// element is not the empty byte string.
    pub fn evaluate(&self, z: &BigUint) -> Result<bool> {
        let mut cmds: VecDeque<Command> = self.cmds.iter().cloned().collect();
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut altstack: Vec<Vec<u8>> = Vec::new();

        while let Some(cmd) = cmds.pop_front() {
            match cmd {
                Command::Data(data) => stack.push(data),
                Command::Op(op_code) => {
                    if !op::execute(op_code, &mut stack, &mut cmds, &mut altstack, z)? {
                        return Ok(false);
                    }
                }
            }
        }

        match stack.pop() {
            None => Ok(false),
            Some(top) => Ok(!top.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(script: &Script) -> Script {
        let serialized = script.serialize().unwrap();
        let mut cursor = std::io::Cursor::new(serialized);
        Script::parse(&mut cursor).unwrap()
    }

    #[test]
    fn p2pkh_round_trips() {
        let script = Script::p2pkh(&[0xAB; 20]);
        assert_eq!(roundtrip(&script), script);
    }

    #[test]
    fn pushdata1_round_trips() {
        let script = Script::new(vec![Command::Data(vec![0x11; 100])]);
        assert_eq!(roundtrip(&script), script);
    }

    #[test]
    fn pushdata2_round_trips() {
        let script = Script::new(vec![Command::Data(vec![0x22; 300])]);
        assert_eq!(roundtrip(&script), script);
    }

    #[test]
    fn empty_stack_is_invalid() {
        let script = Script::new(vec![]);
        assert!(!script.evaluate(&BigUint::from(0u8)).unwrap());
    }

    #[test]
    fn zero_top_is_invalid() {
        let script = Script::new(vec![Command::Data(vec![])]);
        assert!(!script.evaluate(&BigUint::from(0u8)).unwrap());
    }

    #[test]
    fn truncated_script_is_parse_error() {
        // varint says 5 bytes follow, but only 2 are present.
        let bytes = vec![5u8, 0x51, 0x52];
        let mut cursor = std::io::Cursor::new(bytes);
        assert!(Script::parse(&mut cursor).is_err());
    }

    #[test]
    fn if_takes_the_true_branch_and_skips_the_else() {
        // <1> OP_IF <1> OP_ELSE <0> OP_ENDIF
        let script = Script::new(vec![
            Command::Data(vec![1]),
            Command::Op(op::OP_IF),
            Command::Data(vec![1]),
            Command::Op(op::OP_ELSE),
            Command::Data(vec![0]),
            Command::Op(op::OP_ENDIF),
        ]);
        assert!(script.evaluate(&BigUint::from(0u8)).unwrap());
    }

    #[test]
    fn if_takes_the_else_branch_when_condition_is_false() {
        // <0> OP_IF <0> OP_ELSE <1> OP_ENDIF
        let script = Script::new(vec![
            Command::Data(vec![]),
            Command::Op(op::OP_IF),
            Command::Data(vec![]),
            Command::Op(op::OP_ELSE),
            Command::Data(vec![1]),
            Command::Op(op::OP_ENDIF),
        ]);
        assert!(script.evaluate(&BigUint::from(0u8)).unwrap());
    }

    #[test]
    fn nested_if_without_else_is_a_noop_when_false() {
        // <0> OP_IF <1> OP_IF <1> OP_ENDIF OP_ENDIF <1>
        let script = Script::new(vec![
            Command::Data(vec![]),
            Command::Op(op::OP_IF),
            Command::Data(vec![1]),
            Command::Op(op::OP_IF),
            Command::Data(vec![1]),
            Command::Op(op::OP_ENDIF),
            Command::Op(op::OP_ENDIF),
            Command::Data(vec![1]),
        ]);
        assert!(script.evaluate(&BigUint::from(0u8)).unwrap());
    }
}
