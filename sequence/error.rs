/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{error::Error, io, sync::Arc};

use error::coded_error;

coded_error! {
    pub SequenceError(component = "Sequence", prefix = "SEQ") {
        AlreadyConsumed(1, "The collection '{collection}' was already consumed by '{consumed_by}' and cannot perform '{operation}'.", collection: String, operation: &'static str, consumed_by: &'static str),
        InvalidArgument(2, "Invalid argument for '{operation}': {reason}.", operation: &'static str, reason: String),
        PreconditionViolation(3, "Cannot perform '{operation}' because an earlier drain of the replay cache failed.", operation: &'static str, ( coded_source: Box<SequenceError> )),
        SourceFailure(4, "The underlying source failed to produce an element.", ( source: Arc<dyn Error + Send + Sync> )),
        CannotRewind(5, "The one-shot '{kind}' source has already advanced and cannot be rewound.", kind: &'static str),
        SeekOutOfBounds(6, "Cannot seek to position {position} of a sequence holding {length} elements.", position: usize, length: usize),
        ValidationFailed(7, "The value for key {key} in the sequence was invalid.", key: String),
        Io(8, "I/O failure while performing '{operation}'.", operation: &'static str, ( source: Arc<io::Error> )),
    }
}

impl SequenceError {
    pub fn source_failure(error: impl Error + Send + Sync + 'static) -> Self {
        Self::SourceFailure { source: Arc::new(error) }
    }

    pub fn invalid_argument(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { operation, reason: reason.into() }
    }

    pub(crate) fn io(operation: &'static str, error: io::Error) -> Self {
        Self::Io { operation, source: Arc::new(error) }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use error::CodedError;

    use super::SequenceError;

    #[test]
    fn codes_follow_variant_numbers() {
        let consumed = SequenceError::AlreadyConsumed {
            collection: "numbers".to_owned(),
            operation: "to_vec",
            consumed_by: "count",
        };
        assert_eq!(consumed.code(), "SEQ1");
        assert_eq!(consumed.component(), "Sequence");
        assert_eq!(SequenceError::CannotRewind { kind: "iterator" }.code(), "SEQ5");
        assert_eq!(SequenceError::ValidationFailed { key: "3".to_owned() }.code(), "SEQ7");
    }

    #[test]
    fn validation_message_names_the_key() {
        let error = SequenceError::ValidationFailed { key: "2".to_owned() };
        assert_eq!(error.format_description(), "The value for key 2 in the sequence was invalid.");
    }

    #[test]
    fn precondition_violation_chains_the_original_failure() {
        let original = SequenceError::io("lines", io::Error::new(io::ErrorKind::UnexpectedEof, "truncated"));
        let poisoned = SequenceError::PreconditionViolation { operation: "count", coded_source: Box::new(original) };
        assert_eq!(poisoned.root_source_coded_error().code(), "SEQ8");
    }

    #[test]
    fn poisoned_failure_reports_its_source_failure() {
        let original = SequenceError::source_failure(io::Error::new(io::ErrorKind::Other, "backend gone"));
        let poisoned = SequenceError::PreconditionViolation { operation: "share", coded_source: Box::new(original) };
        assert_eq!(poisoned.source_coded_error().map(|cause| cause.code()), Some("SEQ4"));
        assert_eq!(
            poisoned.to_string(),
            "[SEQ3] Cannot perform 'share' because an earlier drain of the replay cache failed. \
             Cause: [SEQ4] The underlying source failed to produce an element. Cause: backend gone"
        );
    }
}
