// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Bundle Builder
//!
//! Chains the fragments of an `attachToTangle` request and finalizes each one
//! with proof-of-work.
//!
//! Fragments arrive in descending `currentIndex` order. The first one must be
//! the bundle tail (`currentIndex == lastIndex`) and is attached to the
//! caller's trunk and branch. Every later fragment points its trunk at the
//! previous fragment's finalized hash and its branch at the caller's
//! original trunk. Processing is strictly sequential; any failure discards
//! the whole bundle.

use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pow::{PowError, ProofOfWork};
use crate::ternary::{is_hash, TernaryError, HASH_LENGTH};
use crate::transaction::Transaction;

/// Largest value of a 27-trit field: (3^27 - 1) / 2.
pub const MAX_TIMESTAMP_VALUE: i64 = 3_812_798_742_493;

/// Errors that abort a bundle attachment.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("Invalid {0}")]
    InvalidParameter(String),

    #[error("Wrong bundle order. The bundle should be ordered in descending order from currentIndex")]
    BundleOrder,

    #[error("Malformed transaction trytes at position {index}")]
    MalformedTransaction { index: usize },

    #[error("Proof-of-work returned undecodable trytes at position {index}")]
    InvalidPowResult { index: usize },

    #[error("Transaction encoding failed: {0}")]
    Encoding(#[from] TernaryError),

    #[error(transparent)]
    Pow(#[from] PowError),
}

/// Validated `attachToTangle` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    pub trunk_transaction: String,
    pub branch_transaction: String,
    pub min_weight_magnitude: usize,
    /// Fragment trytes in descending `currentIndex` order.
    pub trytes: Vec<String>,
}

impl AttachRequest {
    /// Extract and validate parameters from a decoded request body.
    pub fn from_params(params: &Value) -> Result<Self, AttachError> {
        let trunk_transaction = hash_param(params, "trunkTransaction")?;
        let branch_transaction = hash_param(params, "branchTransaction")?;

        let min_weight_magnitude = params
            .get("minWeightMagnitude")
            .and_then(Value::as_u64)
            .map(|m| m as usize)
            .filter(|&m| m <= HASH_LENGTH)
            .ok_or_else(|| AttachError::InvalidParameter("minWeightMagnitude".to_string()))?;

        let trytes = params
            .get("trytes")
            .and_then(Value::as_array)
            .filter(|list| !list.is_empty())
            .ok_or_else(|| AttachError::InvalidParameter("trytes".to_string()))?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AttachError::InvalidParameter("trytes".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trunk_transaction,
            branch_transaction,
            min_weight_magnitude,
            trytes,
        })
    }
}

fn hash_param(params: &Value, name: &str) -> Result<String, AttachError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| is_hash(s))
        .map(str::to_string)
        .ok_or_else(|| AttachError::InvalidParameter(name.to_string()))
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn current_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Attach every fragment of `request`, returning finalized trytes in
/// ascending `currentIndex` order.
///
/// `clock` supplies the attachment timestamp in milliseconds.
pub fn attach_to_tangle<P, C>(
    pow: &P,
    session: &CancellationToken,
    request: &AttachRequest,
    mut clock: C,
) -> Result<Vec<String>, AttachError>
where
    P: ProofOfWork + ?Sized,
    C: FnMut() -> i64,
{
    let started = Instant::now();
    let mut finalized = Vec::with_capacity(request.trytes.len());
    let mut previous_hash: Option<String> = None;

    for (index, fragment) in request.trytes.iter().enumerate() {
        let mut tx = Transaction::decode(fragment)
            .ok_or(AttachError::MalformedTransaction { index })?;

        tx.tag = Some(tx.obsolete_tag.clone());
        tx.attachment_timestamp = clock();
        tx.attachment_timestamp_lower_bound = 0;
        tx.attachment_timestamp_upper_bound = MAX_TIMESTAMP_VALUE;

        match previous_hash.take() {
            None => {
                if tx.current_index != tx.last_index {
                    return Err(AttachError::BundleOrder);
                }
                tx.trunk_transaction = request.trunk_transaction.clone();
                tx.branch_transaction = request.branch_transaction.clone();
            }
            Some(hash) => {
                tx.trunk_transaction = hash;
                tx.branch_transaction = request.trunk_transaction.clone();
            }
        }

        let candidate = tx.encode()?;
        let result = pow.search(&candidate, request.min_weight_magnitude, session)?;
        let attached =
            Transaction::decode(&result).ok_or(AttachError::InvalidPowResult { index })?;

        debug!(
            index,
            current_index = attached.current_index,
            hash = %attached.hash,
            "Fragment attached"
        );

        previous_hash = Some(attached.hash);
        finalized.push(result);
    }

    finalized.reverse();

    info!(
        fragments = finalized.len(),
        min_weight_magnitude = request.min_weight_magnitude,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Bundle attached"
    );

    Ok(finalized)
}
