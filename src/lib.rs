// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tangle PoW Proxy - IOTA node API proxy with local proof-of-work
//!
//! Relays node API commands to a remote IOTA node unchanged, except
//! `attachToTangle`, which is answered locally: the bundle is chained,
//! stamped and finalized with a Curl-P-27 nonce search on a worker pool.
//!
//! ## Modules
//!
//! - `ternary` - Trit/tryte codec and the Curl-P-27 sponge
//! - `transaction` - Fixed-layout transaction codec
//! - `pow` - Nonce search engine with interruptible sessions
//! - `bundle` - `attachToTangle` bundle chaining
//! - `relay` - Pass-through HTTP relay to the remote node
//! - `dispatcher` - Routes commands to the bundle builder or the relay
//! - `api` - HTTP surface (Axum)

pub mod api;
pub mod bundle;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pow;
pub mod relay;
pub mod state;
pub mod ternary;
pub mod transaction;
