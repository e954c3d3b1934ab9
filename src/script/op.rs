//! Opcode constants and their stack-machine semantics.

use std::collections::VecDeque;

use num_bigint::BigUint;

use super::Command;
use crate::error::{Error, Result};
use crate::helpers::hash256 as sha256d;
use crate::helpers::hash160 as ripemd_sha256;
use crate::secp256k1::S256Point;
use crate::signature::Signature;
use sha2::{Digest, Sha256};

pub(crate) const OP_0: u8 = 0;
pub(crate) const OP_1NEGATE: u8 = 79;
pub(crate) const OP_1: u8 = 81;
pub(crate) const OP_16: u8 = 96;
pub(crate) const OP_NOP: u8 = 97;
pub(crate) const OP_IF: u8 = 99;
pub(crate) const OP_NOTIF: u8 = 100;
pub(crate) const OP_ELSE: u8 = 103;
pub(crate) const OP_ENDIF: u8 = 104;
pub(crate) const OP_VERIFY: u8 = 105;
pub(crate) const OP_RETURN: u8 = 106;
pub(crate) const OP_TOALTSTACK: u8 = 107;
pub(crate) const OP_FROMALTSTACK: u8 = 108;
pub(crate) const OP_2DROP: u8 = 109;
pub(crate) const OP_2DUP: u8 = 110;
pub(crate) const OP_DEPTH: u8 = 116;
pub(crate) const OP_DROP: u8 = 117;
pub(crate) const OP_DUP: u8 = 118;
pub(crate) const OP_NIP: u8 = 119;
pub(crate) const OP_OVER: u8 = 120;
pub(crate) const OP_SWAP: u8 = 124;
pub(crate) const OP_TUCK: u8 = 125;
pub(crate) const OP_SIZE: u8 = 130;
pub(crate) const OP_EQUAL: u8 = 135;
pub(crate) const OP_EQUALVERIFY: u8 = 136;
pub(crate) const OP_1ADD: u8 = 139;
pub(crate) const OP_1SUB: u8 = 140;
pub(crate) const OP_NEGATE: u8 = 143;
pub(crate) const OP_ABS: u8 = 144;
pub(crate) const OP_NOT: u8 = 145;
pub(crate) const OP_0NOTEQUAL: u8 = 146;
pub(crate) const OP_ADD: u8 = 147;
pub(crate) const OP_SUB: u8 = 148;
pub(crate) const OP_BOOLAND: u8 = 154;
pub(crate) const OP_BOOLOR: u8 = 155;
pub(crate) const OP_NUMEQUAL: u8 = 156;
pub(crate) const OP_NUMEQUALVERIFY: u8 = 157;
pub(crate) const OP_NUMNOTEQUAL: u8 = 158;
pub(crate) const OP_LESSTHAN: u8 = 159;
pub(crate) const OP_GREATERTHAN: u8 = 160;
pub(crate) const OP_LESSTHANOREQUAL: u8 = 161;
pub(crate) const OP_GREATERTHANOREQUAL: u8 = 162;
pub(crate) const OP_MIN: u8 = 163;
pub(crate) const OP_MAX: u8 = 164;
pub(crate) const OP_WITHIN: u8 = 165;
pub(crate) const OP_RIPEMD160: u8 = 166;
pub(crate) const OP_SHA256: u8 = 168;
pub(crate) const OP_HASH160: u8 = 169;
pub(crate) const OP_HASH256: u8 = 170;
pub(crate) const OP_CHECKSIG: u8 = 172;
pub(crate) const OP_CHECKSIGVERIFY: u8 = 173;
pub(crate) const OP_CHECKMULTISIG: u8 = 174;
pub(crate) const OP_CHECKMULTISIGVERIFY: u8 = 175;

/// Bitcoin Script's integer encoding: little-endian sign-magnitude, shortest
/// form, empty for zero.
fn decode_num(element: &[u8]) -> i64 {
    if element.is_empty() {
        return 0;
    }
    let mut big_endian: Vec<u8> = element.iter().rev().copied().collect();
    let negative = big_endian[0] & 0x80 != 0;
    if negative {
        big_endian[0] &= 0x7f;
    }
    let mut result: i64 = 0;
    for b in big_endian {
        result = (result << 8) + b as i64;
    }
    if negative {
        -result
    } else {
        result
    }
}

fn encode_num(num: i64) -> Vec<u8> {
    if num == 0 {
        return Vec::new();
    }
    let negative = num < 0;
    let mut abs_num = num.unsigned_abs();
    let mut result = Vec::new();
    while abs_num > 0 {
        result.push((abs_num & 0xff) as u8);
        abs_num >>= 8;
    }
    if result.last().copied().unwrap_or(0) & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        *result.last_mut().expect("num != 0 pushed at least one byte") |= 0x80;
    }
    result
}

fn pop(stack: &mut Vec<Vec<u8>>) -> Result<Vec<u8>> {
    stack.pop().ok_or(Error::ScriptEvalFailure)
}

fn pop_num(stack: &mut Vec<Vec<u8>>) -> Result<i64> {
    Ok(decode_num(&pop(stack)?))
}

fn push_bool(stack: &mut Vec<Vec<u8>>, value: bool) {
    stack.push(if value { vec![1] } else { Vec::new() });
}

/// Skip cmds until a matching OP_ELSE/OP_ENDIF, tracking nested branches.
fn skip_branch(cmds: &mut VecDeque<Command>, stop_at_else: bool) -> Result<()> {
    let mut depth = 1i32;
    loop {
        let cmd = cmds.pop_front().ok_or(Error::ScriptEvalFailure)?;
        if let Command::Op(op_code) = cmd {
            match op_code {
                OP_IF | OP_NOTIF => depth += 1,
                OP_ENDIF => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                OP_ELSE if depth == 1 && stop_at_else => return Ok(()),
                _ => {}
            }
        }
    }
}

fn op_if(stack: &mut Vec<Vec<u8>>, cmds: &mut VecDeque<Command>, negate: bool) -> Result<bool> {
    let mut condition = decode_num(&pop(stack)?) != 0;
    if negate {
        condition = !condition;
    }
    if !condition {
        skip_branch(cmds, true)?;
    }
    Ok(true)
}

fn checksig(stack: &mut Vec<Vec<u8>>, z: &BigUint) -> Result<bool> {
    let pubkey_bytes = pop(stack)?;
    let der = pop(stack)?;
    let der = if der.last() == Some(&0x01) { &der[..der.len() - 1] } else { &der[..] };
    let pubkey = match S256Point::parse(&pubkey_bytes) {
        Ok(p) => p,
        Err(_) => {
            push_bool(stack, false);
            return Ok(true);
        }
    };
    let sig = match Signature::parse(der) {
        Ok(s) => s,
        Err(_) => {
            push_bool(stack, false);
            return Ok(true);
        }
    };
    push_bool(stack, pubkey.verify(z, &sig)?);
    Ok(true)
}

fn checkmultisig(stack: &mut Vec<Vec<u8>>, z: &BigUint) -> Result<bool> {
    let n = pop_num(stack)? as usize;
    let mut pubkeys = Vec::with_capacity(n);
    for _ in 0..n {
        pubkeys.push(pop(stack)?);
    }
    let m = pop_num(stack)? as usize;
    let mut sigs = Vec::with_capacity(m);
    for _ in 0..m {
        sigs.push(pop(stack)?);
    }
    // off-by-one bug in the original OP_CHECKMULTISIG: one extra element is
    // consumed from the stack. Pop and discard it.
    pop(stack)?;

    for sig in &sigs {
        let der = if sig.last() == Some(&0x01) { &sig[..sig.len() - 1] } else { &sig[..] };
        let signature = match Signature::parse(der) {
            Ok(s) => s,
            Err(_) => {
                push_bool(stack, false);
                return Ok(true);
            }
        };
        let mut matched = false;
        while let Some(pk_bytes) = pubkeys.pop() {
            if let Ok(pubkey) = S256Point::parse(&pk_bytes) {
                if pubkey.verify(z, &signature).unwrap_or(false) {
                    matched = true;
                    break;
                }
            }
        }
        if !matched {
            push_bool(stack, false);
            return Ok(true);
        }
    }
    push_bool(stack, true);
    Ok(true)
}

/// Dispatch a single opcode. Mirrors `spec.md` §4.5: `OP_IF`/`OP_NOTIF` get
/// the remaining command list, `OP_TOALTSTACK`/`OP_FROMALTSTACK` get the alt
/// stack, and the `OP_CHECKSIG*`/`OP_CHECKMULTISIG*` family get `z`.
pub(crate) fn execute(
    op_code: u8,
    stack: &mut Vec<Vec<u8>>,
    cmds: &mut VecDeque<Command>,
    altstack: &mut Vec<Vec<u8>>,
    z: &BigUint,
) -> Result<bool> {
    match op_code {
        OP_0 => {
            stack.push(Vec::new());
            Ok(true)
        }
        OP_1NEGATE => {
            stack.push(encode_num(-1));
            Ok(true)
        }
        OP_1..=OP_16 => {
            stack.push(encode_num((op_code - OP_1 + 1) as i64));
            Ok(true)
        }
        OP_NOP => Ok(true),
        OP_IF => op_if(stack, cmds, false),
        OP_NOTIF => op_if(stack, cmds, true),
        OP_ELSE => {
            // Reached after executing an OP_IF/OP_NOTIF's true branch: skip
            // the else branch up to and including its matching OP_ENDIF.
            skip_branch(cmds, false)?;
            Ok(true)
        }
        OP_ENDIF => Ok(true),
        OP_VERIFY => Ok(decode_num(&pop(stack)?) != 0),
        OP_RETURN => Ok(false),
        OP_TOALTSTACK => {
            let item = pop(stack)?;
            altstack.push(item);
            Ok(true)
        }
        OP_FROMALTSTACK => {
            let item = altstack.pop().ok_or(Error::ScriptEvalFailure)?;
            stack.push(item);
            Ok(true)
        }
        OP_2DROP => {
            pop(stack)?;
            pop(stack)?;
            Ok(true)
        }
        OP_2DUP => {
            if stack.len() < 2 {
                return Err(Error::ScriptEvalFailure);
            }
            let len = stack.len();
            let pair = stack[len - 2..].to_vec();
            stack.extend(pair);
            Ok(true)
        }
        OP_DEPTH => {
            stack.push(encode_num(stack.len() as i64));
            Ok(true)
        }
        OP_DROP => {
            pop(stack)?;
            Ok(true)
        }
        OP_DUP => {
            let top = stack.last().ok_or(Error::ScriptEvalFailure)?.clone();
            stack.push(top);
            Ok(true)
        }
        OP_NIP => {
            let top = pop(stack)?;
            pop(stack)?;
            stack.push(top);
            Ok(true)
        }
        OP_OVER => {
            if stack.len() < 2 {
                return Err(Error::ScriptEvalFailure);
            }
            let item = stack[stack.len() - 2].clone();
            stack.push(item);
            Ok(true)
        }
        OP_SWAP => {
            let len = stack.len();
            if len < 2 {
                return Err(Error::ScriptEvalFailure);
            }
            stack.swap(len - 1, len - 2);
            Ok(true)
        }
        OP_TUCK => {
            if stack.len() < 2 {
                return Err(Error::ScriptEvalFailure);
            }
            let top = stack[stack.len() - 1].clone();
            stack.insert(stack.len() - 2, top);
            Ok(true)
        }
        OP_SIZE => {
            let top = stack.last().ok_or(Error::ScriptEvalFailure)?;
            stack.push(encode_num(top.len() as i64));
            Ok(true)
        }
        OP_EQUAL => {
            let a = pop(stack)?;
            let b = pop(stack)?;
            push_bool(stack, a == b);
            Ok(true)
        }
        OP_EQUALVERIFY => {
            let a = pop(stack)?;
            let b = pop(stack)?;
            Ok(a == b)
        }
        OP_1ADD => {
            let n = pop_num(stack)?;
            stack.push(encode_num(n + 1));
            Ok(true)
        }
        OP_1SUB => {
            let n = pop_num(stack)?;
            stack.push(encode_num(n - 1));
            Ok(true)
        }
        OP_NEGATE => {
            let n = pop_num(stack)?;
            stack.push(encode_num(-n));
            Ok(true)
        }
        OP_ABS => {
            let n = pop_num(stack)?;
            stack.push(encode_num(n.abs()));
            Ok(true)
        }
        OP_NOT => {
            let n = pop_num(stack)?;
            push_bool(stack, n == 0);
            Ok(true)
        }
        OP_0NOTEQUAL => {
            let n = pop_num(stack)?;
            push_bool(stack, n != 0);
            Ok(true)
        }
        OP_ADD => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            stack.push(encode_num(a + b));
            Ok(true)
        }
        OP_SUB => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            stack.push(encode_num(a - b));
            Ok(true)
        }
        OP_BOOLAND => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a != 0 && b != 0);
            Ok(true)
        }
        OP_BOOLOR => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a != 0 || b != 0);
            Ok(true)
        }
        OP_NUMEQUAL => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a == b);
            Ok(true)
        }
        OP_NUMEQUALVERIFY => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            Ok(a == b)
        }
        OP_NUMNOTEQUAL => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a != b);
            Ok(true)
        }
        OP_LESSTHAN => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a < b);
            Ok(true)
        }
        OP_GREATERTHAN => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a > b);
            Ok(true)
        }
        OP_LESSTHANOREQUAL => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a <= b);
            Ok(true)
        }
        OP_GREATERTHANOREQUAL => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            push_bool(stack, a >= b);
            Ok(true)
        }
        OP_MIN => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            stack.push(encode_num(a.min(b)));
            Ok(true)
        }
        OP_MAX => {
            let b = pop_num(stack)?;
            let a = pop_num(stack)?;
            stack.push(encode_num(a.max(b)));
            Ok(true)
        }
        OP_WITHIN => {
            let max = pop_num(stack)?;
            let min = pop_num(stack)?;
            let x = pop_num(stack)?;
            push_bool(stack, min <= x && x < max);
            Ok(true)
        }
        OP_RIPEMD160 => {
            let item = pop(stack)?;
            use ripemd::{Digest as _, Ripemd160};
            stack.push(Ripemd160::digest(item).to_vec());
            Ok(true)
        }
        OP_SHA256 => {
            let item = pop(stack)?;
            stack.push(Sha256::digest(item).to_vec());
            Ok(true)
        }
        OP_HASH160 => {
            let item = pop(stack)?;
            stack.push(ripemd_sha256(&item).to_vec());
            Ok(true)
        }
        OP_HASH256 => {
            let item = pop(stack)?;
            stack.push(sha256d(&item).to_vec());
            Ok(true)
        }
        OP_CHECKSIG => checksig(stack, z),
        OP_CHECKSIGVERIFY => {
            checksig(stack, z)?;
            Ok(decode_num(&pop(stack)?) != 0)
        }
        OP_CHECKMULTISIG => checkmultisig(stack, z),
        OP_CHECKMULTISIGVERIFY => {
            checkmultisig(stack, z)?;
            Ok(decode_num(&pop(stack)?) != 0)
        }
        _ => Err(Error::ScriptEvalFailure),
    }
}
