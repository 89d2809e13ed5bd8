/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use error::CodedError;

pub trait ResultExt<T, E> {
    /// Emits a `DEBUG` event carrying the error code when this is an [`Err`], then
    /// hands the result back unchanged so it can still be propagated with `?`.
    fn log_failure(self, operation: &str) -> Self
    where
        E: CodedError;

    /// Unwraps a result, yielding the content of an [`Ok`].
    ///
    /// # Panics
    ///
    /// Panics if the value is an [`Err`], after logging the error at `ERROR` level.
    fn unwrap_or_log(self) -> T
    where
        E: fmt::Debug;

    /// Unwraps a result, yielding the content of an [`Err`].
    ///
    /// # Panics
    ///
    /// Panics if the value is an [`Ok`], after logging the value at `ERROR` level.
    fn unwrap_err_or_log(self) -> E
    where
        T: fmt::Debug;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    #[inline]
    fn log_failure(self, operation: &str) -> Self
    where
        E: CodedError,
    {
        if let Err(error) = &self {
            tracing::debug!(code = error.code(), operation, "{}", error.format_description());
        }
        self
    }

    #[inline]
    #[track_caller]
    fn unwrap_or_log(self) -> T
    where
        E: fmt::Debug,
    {
        match self {
            Ok(value) => value,
            Err(error) => failed_with("called `Result::unwrap_or_log()` on an `Err` value", &error),
        }
    }

    #[inline]
    #[track_caller]
    fn unwrap_err_or_log(self) -> E
    where
        T: fmt::Debug,
    {
        match self {
            Ok(value) => failed_with("called `Result::unwrap_err_or_log()` on an `Ok` value", &value),
            Err(error) => error,
        }
    }
}

#[inline(never)]
#[cold]
#[track_caller]
fn failed_with(msg: &str, value: &dyn fmt::Debug) -> ! {
    let location = std::panic::Location::caller();
    tracing::error!(unwrap.filepath = location.file(), unwrap.lineno = location.line(), "{}: {:?}", msg, value);
    panic!("{}: {:?}", msg, value);
}

#[cfg(test)]
mod tests {
    use error::coded_error;

    use super::ResultExt;

    coded_error! {
        FetchError(component = "Fetch", prefix = "FCH") {
            Failed(1, "Fetch failed."),
        }
    }

    #[test]
    fn log_failure_passes_result_through() {
        let ok: Result<u32, FetchError> = Ok(3);
        assert_eq!(ok.log_failure("fetch").unwrap_or_log(), 3);

        let err: Result<u32, FetchError> = Err(FetchError::Failed {});
        let error = err.log_failure("fetch").unwrap_err_or_log();
        assert!(matches!(error, FetchError::Failed {}));
    }

    #[test]
    #[should_panic(expected = "unwrap_or_log")]
    fn unwrap_or_log_panics_on_err() {
        let err: Result<u32, FetchError> = Err(FetchError::Failed {});
        err.unwrap_or_log();
    }
}
