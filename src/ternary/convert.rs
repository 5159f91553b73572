// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversions among trits, trytes and signed integers.
//!
//! A tryte is three trits `t0 + 3·t1 + 9·t2`, written as one character of
//! [`TRYTE_ALPHABET`]. Integers are little-endian balanced ternary: the first
//! trit has weight 3^0.

/// A balanced ternary digit in {-1, 0, 1}.
pub type Trit = i8;

/// The 27 tryte symbols, ordered by value 0..=13 then -13..=-1.
pub const TRYTE_ALPHABET: &str = "9ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const TRITS_PER_TRYTE: usize = 3;

/// Length of a hash (address, bundle, trunk, branch) in trytes.
pub const HASH_TRYTES: usize = 81;

/// Trits of every symbol in [`TRYTE_ALPHABET`], same order.
const TRYTE_TRITS: [[Trit; 3]; 27] = [
    [0, 0, 0],
    [1, 0, 0],
    [-1, 1, 0],
    [0, 1, 0],
    [1, 1, 0],
    [-1, -1, 1],
    [0, -1, 1],
    [1, -1, 1],
    [-1, 0, 1],
    [0, 0, 1],
    [1, 0, 1],
    [-1, 1, 1],
    [0, 1, 1],
    [1, 1, 1],
    [-1, -1, -1],
    [0, -1, -1],
    [1, -1, -1],
    [-1, 0, -1],
    [0, 0, -1],
    [1, 0, -1],
    [-1, 1, -1],
    [0, 1, -1],
    [1, 1, -1],
    [-1, -1, 0],
    [0, -1, 0],
    [1, -1, 0],
    [-1, 0, 0],
];

/// Errors produced by the ternary codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TernaryError {
    #[error("Invalid ternary input: {0}")]
    InvalidInput(String),

    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Anything that can be turned into a trit sequence.
pub trait ToTrits {
    fn to_trits(&self) -> Result<Vec<Trit>, TernaryError>;
}

impl ToTrits for str {
    fn to_trits(&self) -> Result<Vec<Trit>, TernaryError> {
        trits_from_trytes(self)
    }
}

impl ToTrits for String {
    fn to_trits(&self) -> Result<Vec<Trit>, TernaryError> {
        trits_from_trytes(self)
    }
}

impl ToTrits for i64 {
    fn to_trits(&self) -> Result<Vec<Trit>, TernaryError> {
        Ok(trits_from_value(*self))
    }
}

/// Decode a trytes string or encode an integer into trits.
pub fn trits<T: ToTrits + ?Sized>(input: &T) -> Result<Vec<Trit>, TernaryError> {
    input.to_trits()
}

fn tryte_index(symbol: u8) -> Option<usize> {
    match symbol {
        b'9' => Some(0),
        b'A'..=b'Z' => Some((symbol - b'A') as usize + 1),
        _ => None,
    }
}

/// Decode a trytes string into trits via alphabet lookup.
pub fn trits_from_trytes(trytes: &str) -> Result<Vec<Trit>, TernaryError> {
    let mut trits = Vec::with_capacity(trytes.len() * TRITS_PER_TRYTE);
    for (position, symbol) in trytes.bytes().enumerate() {
        let index = tryte_index(symbol).ok_or_else(|| {
            TernaryError::InvalidInput(format!(
                "non-tryte character {:?} at position {position}",
                symbol as char
            ))
        })?;
        trits.extend_from_slice(&TRYTE_TRITS[index]);
    }
    Ok(trits)
}

/// Encode an integer as minimal balanced ternary. Zero is the empty sequence.
pub fn trits_from_value(value: i64) -> Vec<Trit> {
    let mut trits = Vec::new();
    let mut remaining = value.unsigned_abs();
    while remaining > 0 {
        let mut digit = (remaining % 3) as Trit;
        remaining /= 3;
        if digit > 1 {
            digit = -1;
            remaining += 1;
        }
        trits.push(digit);
    }
    if value < 0 {
        trits.iter_mut().for_each(|t| *t = -*t);
    }
    trits
}

/// Minimal trits of `value` right-padded with zeros to exactly `width` trits.
pub fn padded_trits(value: i64, width: usize) -> Result<Vec<Trit>, TernaryError> {
    let mut trits = trits_from_value(value);
    if trits.len() > width {
        return Err(TernaryError::InvalidLength {
            expected: width,
            actual: trits.len(),
        });
    }
    trits.resize(width, 0);
    Ok(trits)
}

/// Encode trits as a trytes string. The length must be a multiple of 3.
pub fn trytes(trits: &[Trit]) -> Result<String, TernaryError> {
    if trits.len() % TRITS_PER_TRYTE != 0 {
        return Err(TernaryError::InvalidLength {
            expected: trits.len().next_multiple_of(TRITS_PER_TRYTE),
            actual: trits.len(),
        });
    }

    let alphabet = TRYTE_ALPHABET.as_bytes();
    let mut out = String::with_capacity(trits.len() / TRITS_PER_TRYTE);
    for chunk in trits.chunks_exact(TRITS_PER_TRYTE) {
        if chunk.iter().any(|t| !(-1..=1).contains(t)) {
            return Err(TernaryError::InvalidInput(format!(
                "trit out of range in {chunk:?}"
            )));
        }
        let value = chunk[0] + 3 * chunk[1] + 9 * chunk[2];
        let index = value.rem_euclid(27) as usize;
        out.push(alphabet[index] as char);
    }
    Ok(out)
}

/// Decode trits into a signed integer using weights 3^i.
///
/// Sequences longer than 39 trits exceed `i64` and wrap.
pub fn value(trits: &[Trit]) -> i64 {
    trits
        .iter()
        .rev()
        .fold(0i64, |acc, &t| acc.wrapping_mul(3).wrapping_add(t as i64))
}

/// `true` if `input` only contains tryte symbols and, when given, has exactly
/// `length` characters.
pub fn is_trytes(input: &str, length: Option<usize>) -> bool {
    length.map_or(true, |len| input.len() == len) && input.bytes().all(|b| tryte_index(b).is_some())
}

/// `true` for an 81-tryte hash.
pub fn is_hash(input: &str) -> bool {
    is_trytes(input, Some(HASH_TRYTES))
}
