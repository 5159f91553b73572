// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Curl-P-27 sponge.
//!
//! The state is 729 trits; the low 243 slots are the rate used by
//! [`Curl::absorb`] and [`Curl::squeeze`]. The truth table, round count and
//! cursor walk in [`Curl::transform`] must stay bit-exact, otherwise hashes no
//! longer match the ones computed by network nodes.

use super::convert::Trit;

/// Hash length (and sponge rate) in trits.
pub const HASH_LENGTH: usize = 243;

/// Full sponge state length in trits.
pub const STATE_LENGTH: usize = 3 * HASH_LENGTH;

/// Rounds applied by a single transform.
pub const NUMBER_OF_ROUNDS: usize = 27;

const TRUTH_TABLE: [Trit; 9] = [1, 0, -1, 1, -1, 0, -1, 1, 0];

/// Sponge instance. Each hash or search owns its own copy of the state.
#[derive(Debug, Clone)]
pub struct Curl {
    state: [Trit; STATE_LENGTH],
}

impl Default for Curl {
    fn default() -> Self {
        Self::new()
    }
}

impl Curl {
    /// Zero-initialised sponge.
    pub fn new() -> Self {
        Self {
            state: [0; STATE_LENGTH],
        }
    }

    /// Sponge resumed from an externally supplied state.
    pub fn with_state(state: [Trit; STATE_LENGTH]) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &[Trit; STATE_LENGTH] {
        &self.state
    }

    /// The rate portion of the state: what the next squeeze would return.
    pub fn rate(&self) -> &[Trit] {
        &self.state[..HASH_LENGTH]
    }

    pub fn reset(&mut self) {
        self.state = [0; STATE_LENGTH];
    }

    /// Copy `input` into the rate 243 trits at a time, transforming after
    /// each chunk. Empty input still transforms once.
    pub fn absorb(&mut self, input: &[Trit]) {
        if input.is_empty() {
            self.transform();
            return;
        }
        for chunk in input.chunks(HASH_LENGTH) {
            self.state[..chunk.len()].copy_from_slice(chunk);
            self.transform();
        }
    }

    /// Fill `output` from the rate 243 trits at a time, transforming after
    /// each chunk.
    pub fn squeeze(&mut self, output: &mut [Trit]) {
        if output.is_empty() {
            self.transform();
            return;
        }
        for chunk in output.chunks_mut(HASH_LENGTH) {
            let len = chunk.len();
            chunk.copy_from_slice(&self.state[..len]);
            self.transform();
        }
    }

    /// 27 rounds over a snapshot of the state. A single cursor walks the
    /// snapshot in steps of +364 / -365; slot `i` combines the trit under the
    /// cursor before and after its step.
    pub fn transform(&mut self) {
        let mut scratch = [0 as Trit; STATE_LENGTH];
        let mut index = 0usize;
        for _ in 0..NUMBER_OF_ROUNDS {
            scratch.copy_from_slice(&self.state);
            for slot in self.state.iter_mut() {
                let low = scratch[index];
                index = if index < 365 { index + 364 } else { index - 365 };
                let high = scratch[index];
                *slot = TRUTH_TABLE[(low + 3 * high + 4) as usize];
            }
        }
    }
}

/// Hash `input` with a fresh sponge and squeeze one 243-trit digest.
pub fn hash(input: &[Trit]) -> [Trit; HASH_LENGTH] {
    let mut curl = Curl::new();
    curl.absorb(input);
    let mut digest = [0; HASH_LENGTH];
    curl.squeeze(&mut digest);
    digest
}
