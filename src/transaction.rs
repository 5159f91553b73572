// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-layout transaction codec.
//!
//! A transaction is exactly 2673 trytes (8019 trits). String fields are
//! sliced by tryte offset, numeric fields by trit offset:
//!
//! | Field | Trytes | Trits |
//! |-------|--------|-------|
//! | signatureMessageFragment | 0..2187 | |
//! | address | 2187..2268 | |
//! | value | | 6804..6837 |
//! | reserved (all `9`) | 2279..2295 | |
//! | obsoleteTag | 2295..2322 | |
//! | timestamp | | 6966..6993 |
//! | currentIndex | | 6993..7020 |
//! | lastIndex | | 7020..7047 |
//! | bundle | 2349..2430 | |
//! | trunkTransaction | 2430..2511 | |
//! | branchTransaction | 2511..2592 | |
//! | tag | 2592..2619 | |
//! | attachmentTimestamp | | 7857..7884 |
//! | attachmentTimestampLowerBound | | 7884..7911 |
//! | attachmentTimestampUpperBound | | 7911..7938 |
//! | nonce | 2646..2673 | |

use std::ops::Range;

use crate::ternary::{
    curl, is_trytes, padded_trits, trits_from_trytes, trytes, value, TernaryError, HASH_TRYTES,
};

pub const TRANSACTION_TRYTES: usize = 2673;
pub const TRANSACTION_TRITS: usize = 3 * TRANSACTION_TRYTES;

pub const SIGNATURE_TRYTES: usize = 2187;
pub const TAG_TRYTES: usize = 27;
pub const NONCE_TRYTES: usize = 27;

/// Trit offset of the nonce field.
pub const NONCE_TRIT_OFFSET: usize = 3 * NONCE.start;

const SIGNATURE: Range<usize> = 0..2187;
const ADDRESS: Range<usize> = 2187..2268;
const RESERVED: Range<usize> = 2279..2295;
const OBSOLETE_TAG: Range<usize> = 2295..2322;
const BUNDLE: Range<usize> = 2349..2430;
const TRUNK: Range<usize> = 2430..2511;
const BRANCH: Range<usize> = 2511..2592;
const TAG: Range<usize> = 2592..2619;
const NONCE: Range<usize> = 2646..2673;

const VALUE_TRITS: Range<usize> = 6804..6837;
const TIMESTAMP_TRITS: Range<usize> = 6966..6993;
const CURRENT_INDEX_TRITS: Range<usize> = 6993..7020;
const LAST_INDEX_TRITS: Range<usize> = 7020..7047;
const ATTACHMENT_TIMESTAMP_TRITS: Range<usize> = 7857..7884;
const ATTACHMENT_LOWER_BOUND_TRITS: Range<usize> = 7884..7911;
const ATTACHMENT_UPPER_BOUND_TRITS: Range<usize> = 7911..7938;

/// Encoded width of the value field, covering the reserved zone.
const VALUE_FIELD_TRITS: usize = 81;
/// Significant trits of the value; the rest of the field stays zero.
const VALUE_SIGNIFICANT_TRITS: usize = VALUE_TRITS.end - VALUE_TRITS.start;
/// Encoded width of every other numeric field.
const NUMERIC_FIELD_TRITS: usize = 27;

/// Decoded transaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Curl hash of the full 8019 trits, as 81 trytes.
    pub hash: String,
    pub signature_message_fragment: String,
    pub address: String,
    pub value: i64,
    pub obsolete_tag: String,
    pub timestamp: i64,
    pub current_index: i64,
    pub last_index: i64,
    pub bundle: String,
    pub trunk_transaction: String,
    pub branch_transaction: String,
    /// Always set by [`Transaction::decode`]; `None` encodes `obsolete_tag`.
    pub tag: Option<String>,
    pub attachment_timestamp: i64,
    pub attachment_timestamp_lower_bound: i64,
    pub attachment_timestamp_upper_bound: i64,
    pub nonce: String,
}

impl Transaction {
    /// Parse transaction trytes.
    ///
    /// Returns `None` on wrong length, non-tryte characters or a non-zero
    /// reserved zone. The hash is recomputed from the trytes.
    pub fn decode(input: &str) -> Option<Self> {
        if input.len() != TRANSACTION_TRYTES || !is_trytes(input, None) {
            return None;
        }
        if input[RESERVED].bytes().any(|b| b != b'9') {
            return None;
        }

        let trits = trits_from_trytes(input).ok()?;
        let hash = trytes(&curl::hash(&trits)).ok()?;

        Some(Self {
            hash,
            signature_message_fragment: input[SIGNATURE].to_string(),
            address: input[ADDRESS].to_string(),
            value: value(&trits[VALUE_TRITS]),
            obsolete_tag: input[OBSOLETE_TAG].to_string(),
            timestamp: value(&trits[TIMESTAMP_TRITS]),
            current_index: value(&trits[CURRENT_INDEX_TRITS]),
            last_index: value(&trits[LAST_INDEX_TRITS]),
            bundle: input[BUNDLE].to_string(),
            trunk_transaction: input[TRUNK].to_string(),
            branch_transaction: input[BRANCH].to_string(),
            tag: Some(input[TAG].to_string()),
            attachment_timestamp: value(&trits[ATTACHMENT_TIMESTAMP_TRITS]),
            attachment_timestamp_lower_bound: value(&trits[ATTACHMENT_LOWER_BOUND_TRITS]),
            attachment_timestamp_upper_bound: value(&trits[ATTACHMENT_UPPER_BOUND_TRITS]),
            nonce: input[NONCE].to_string(),
        })
    }

    /// Serialize back into 2673 trytes. The stored `hash` is not consulted.
    pub fn encode(&self) -> Result<String, TernaryError> {
        let tag = self.tag.as_deref().unwrap_or(&self.obsolete_tag);

        let mut out = String::with_capacity(TRANSACTION_TRYTES);
        push_field(&mut out, &self.signature_message_fragment, SIGNATURE_TRYTES)?;
        push_field(&mut out, &self.address, HASH_TRYTES)?;
        push_value(&mut out, self.value)?;
        push_field(&mut out, &self.obsolete_tag, TAG_TRYTES)?;
        push_number(&mut out, self.timestamp, NUMERIC_FIELD_TRITS)?;
        push_number(&mut out, self.current_index, NUMERIC_FIELD_TRITS)?;
        push_number(&mut out, self.last_index, NUMERIC_FIELD_TRITS)?;
        push_field(&mut out, &self.bundle, HASH_TRYTES)?;
        push_field(&mut out, &self.trunk_transaction, HASH_TRYTES)?;
        push_field(&mut out, &self.branch_transaction, HASH_TRYTES)?;
        push_field(&mut out, tag, TAG_TRYTES)?;
        push_number(&mut out, self.attachment_timestamp, NUMERIC_FIELD_TRITS)?;
        push_number(&mut out, self.attachment_timestamp_lower_bound, NUMERIC_FIELD_TRITS)?;
        push_number(&mut out, self.attachment_timestamp_upper_bound, NUMERIC_FIELD_TRITS)?;
        push_field(&mut out, &self.nonce, NONCE_TRYTES)?;
        Ok(out)
    }
}

fn push_field(out: &mut String, field: &str, width: usize) -> Result<(), TernaryError> {
    if field.len() != width {
        return Err(TernaryError::InvalidLength {
            expected: width,
            actual: field.len(),
        });
    }
    if !is_trytes(field, None) {
        return Err(TernaryError::InvalidInput(format!(
            "field of width {width} contains non-tryte characters"
        )));
    }
    out.push_str(field);
    Ok(())
}

fn push_value(out: &mut String, value: i64) -> Result<(), TernaryError> {
    let mut trits = padded_trits(value, VALUE_SIGNIFICANT_TRITS)?;
    trits.resize(VALUE_FIELD_TRITS, 0);
    out.push_str(&trytes(&trits)?);
    Ok(())
}

fn push_number(out: &mut String, number: i64, width: usize) -> Result<(), TernaryError> {
    out.push_str(&trytes(&padded_trits(number, width)?)?);
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A structurally valid bundle member with the given indexes.
    pub fn fragment(current_index: i64, last_index: i64) -> String {
        Transaction {
            hash: String::new(),
            signature_message_fragment: "SIGNATURE".repeat(243),
            address: "A".repeat(HASH_TRYTES),
            value: 0,
            obsolete_tag: "OBSOLETE9TAG".to_string() + &"9".repeat(15),
            timestamp: 1_500_000_000,
            current_index,
            last_index,
            bundle: "B".repeat(HASH_TRYTES),
            trunk_transaction: "9".repeat(HASH_TRYTES),
            branch_transaction: "9".repeat(HASH_TRYTES),
            tag: Some("9".repeat(TAG_TRYTES)),
            attachment_timestamp: 0,
            attachment_timestamp_lower_bound: 0,
            attachment_timestamp_upper_bound: 0,
            nonce: "9".repeat(NONCE_TRYTES),
        }
        .encode()
        .expect("fixture encodes")
    }
}
