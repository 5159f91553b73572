// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::relay::HttpRelay;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher<HttpRelay>>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher<HttpRelay>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}
