/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use resource::constants::{
    logging::DEFAULT_LOG_FILTER,
    sequence::{DEFAULT_REPLAY_CACHE_CAPACITY, DEFAULT_STREAM_BUFFER_LENGTH},
};

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub initial_cache_capacity: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self { initial_cache_capacity: DEFAULT_REPLAY_CACHE_CAPACITY }
    }
}

/// A label makes `AlreadyConsumed` failures easier to attribute when several
/// collections are alive at once.
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    pub label: Option<String>,
}

impl CollectionOptions {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self { label: Some(label.into()) }
    }
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub buffer_length: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self { buffer_length: DEFAULT_STREAM_BUFFER_LENGTH }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub filter: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_owned() }
    }
}
