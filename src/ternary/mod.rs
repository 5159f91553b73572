// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balanced-ternary primitives.
//!
//! This module provides:
//! - Conversions among trits, trytes and signed integers
//! - The Curl-P-27 sponge used for transaction hashes and proof-of-work

pub mod convert;
pub mod curl;

pub use convert::*;
pub use curl::{Curl, HASH_LENGTH, NUMBER_OF_ROUNDS, STATE_LENGTH};
