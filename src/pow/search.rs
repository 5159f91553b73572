// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parallel nonce search over the final absorb chunk.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::ternary::{Curl, Trit, HASH_LENGTH};

/// Trits of the nonce that the search varies (the tail of the nonce field).
pub const NONCE_SEARCH_TRITS: usize = 27;

/// Number of distinct candidates: 3^27.
pub const SEARCH_SPACE: u64 = 7_625_597_484_987;

/// Candidates tried between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 64;

/// Write `counter` as 27 base-3 digits mapped onto trits {-1, 0, 1}.
fn write_counter(target: &mut [Trit], mut counter: u64) {
    for trit in target.iter_mut() {
        *trit = (counter % 3) as Trit - 1;
        counter /= 3;
    }
}

fn meets_target(rate: &[Trit], min_weight_magnitude: usize) -> bool {
    rate[HASH_LENGTH - min_weight_magnitude..HASH_LENGTH]
        .iter()
        .all(|&t| t == 0)
}

/// Search for a final chunk whose hash ends in `min_weight_magnitude` zero
/// trits.
///
/// `mid_state` has already absorbed every chunk but the last; `last_chunk`
/// is the final 243 trits with the nonce at its tail. The counter space is
/// split into contiguous slices, one per worker; the first hit stops the
/// others. Returns `None` when cancelled or exhausted.
pub fn find_nonce(
    mid_state: &Curl,
    last_chunk: &[Trit],
    min_weight_magnitude: usize,
    workers: usize,
    cancel: &CancellationToken,
) -> Option<Vec<Trit>> {
    debug_assert_eq!(last_chunk.len(), HASH_LENGTH);

    let workers = workers.max(1) as u64;
    let slice = SEARCH_SPACE / workers;
    let found = AtomicBool::new(false);
    let nonce_start = HASH_LENGTH - NONCE_SEARCH_TRITS;

    (0..workers).into_par_iter().find_map_any(|worker| {
        let start = worker * slice;
        let end = if worker == workers - 1 {
            SEARCH_SPACE
        } else {
            start + slice
        };

        let mut candidate = last_chunk.to_vec();
        for counter in start..end {
            if found.load(Ordering::Relaxed) {
                return None;
            }
            if (counter - start) % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return None;
            }

            write_counter(&mut candidate[nonce_start..], counter);
            let mut curl = mid_state.clone();
            curl.absorb(&candidate);

            if meets_target(curl.rate(), min_weight_magnitude) {
                found.store(true, Ordering::SeqCst);
                return Some(candidate);
            }
        }
        None
    })
}
