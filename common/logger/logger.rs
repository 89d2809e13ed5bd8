/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use options::LoggingOptions;
use resource::constants::logging::LOG_FILTER_ENV_VAR;
use tracing_subscriber::{prelude::*, util::TryInitError, EnvFilter};

pub mod result;

fn env_filter(options: &LoggingOptions) -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(&options.filter))
}

/// Installs the process-wide subscriber. Fails if one is already installed.
pub fn initialise_logging() -> Result<(), TryInitError> {
    initialise_logging_with(&LoggingOptions::default())
}

pub fn initialise_logging_with(options: &LoggingOptions) -> Result<(), TryInitError> {
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).with(env_filter(options)).try_init()
}

/// Installs the process-wide subscriber with output captured per test. Every
/// test may call this; only the first call in a process installs anything.
pub fn initialise_test_logging() {
    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(env_filter(&LoggingOptions::default()))
        .try_init();
    if installed.is_ok() {
        tracing::trace!("test logging installed");
    }
}

#[cfg(test)]
mod tests {
    use options::LoggingOptions;

    use super::{initialise_logging, initialise_logging_with, initialise_test_logging};

    #[test]
    fn global_subscriber_is_installed_once() {
        assert!(initialise_logging_with(&LoggingOptions { filter: "debug".to_owned() }).is_ok());
        assert!(initialise_logging().is_err());
        initialise_test_logging();
    }
}
