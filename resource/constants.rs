/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod sequence {
    pub const DEFAULT_REPLAY_CACHE_CAPACITY: usize = 16;
    pub const DEFAULT_STREAM_BUFFER_LENGTH: usize = 8192;
    pub const DEFAULT_IMPLODE_SEPARATOR: &str = "";
}

pub mod logging {
    pub const LOG_FILTER_ENV_VAR: &str = "LAZYSEQ_LOG";
    pub const DEFAULT_LOG_FILTER: &str = "info";
}
