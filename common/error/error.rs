/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{error::Error, fmt};

/// An error with a stable, component-scoped code such as `SEQ3`.
///
/// Implementations are normally generated by [`coded_error!`]. A coded error may wrap
/// one further coded error, which lets a failure keep its original cause when it is
/// reported again later (for example when a poisoned replay cache is touched).
pub trait CodedError {
    fn variant_name(&self) -> &'static str;

    fn component(&self) -> &'static str;

    fn code(&self) -> &'static str;

    fn code_prefix(&self) -> &'static str;

    fn code_number(&self) -> usize;

    fn format_description(&self) -> String;

    fn source_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)>;

    fn source_coded_error(&self) -> Option<&(dyn CodedError + Send + Sync)>;

    /// The coded errors this one wraps, nearest first. Does not include `self`.
    fn causes(&self) -> Causes<'_> {
        Causes { next: self.source_coded_error() }
    }

    fn root_source_coded_error(&self) -> &(dyn CodedError + Send + Sync)
    where
        Self: Sized + Send + Sync,
    {
        self.causes().last().unwrap_or(self)
    }

    fn format_code_and_description(&self) -> String {
        format!("[{}] {}", self.code(), self.format_description())
    }
}

impl<T: CodedError + ?Sized> CodedError for Box<T> {
    fn variant_name(&self) -> &'static str {
        (**self).variant_name()
    }

    fn component(&self) -> &'static str {
        (**self).component()
    }

    fn code(&self) -> &'static str {
        (**self).code()
    }

    fn code_prefix(&self) -> &'static str {
        (**self).code_prefix()
    }

    fn code_number(&self) -> usize {
        (**self).code_number()
    }

    fn format_description(&self) -> String {
        (**self).format_description()
    }

    fn source_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        (**self).source_error()
    }

    fn source_coded_error(&self) -> Option<&(dyn CodedError + Send + Sync)> {
        (**self).source_coded_error()
    }
}

pub struct Causes<'a> {
    next: Option<&'a (dyn CodedError + Send + Sync)>,
}

impl<'a> Iterator for Causes<'a> {
    type Item = &'a (dyn CodedError + Send + Sync);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.source_coded_error();
        Some(current)
    }
}

impl PartialEq for dyn CodedError {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for dyn CodedError {}

impl fmt::Debug for dyn CodedError + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Renders the error and its whole cause chain on one line:
/// `[SEQ3] ... Cause: [SEQ4] ... Cause: <plain error>`.
impl fmt::Display for dyn CodedError + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_code_and_description())?;
        let mut innermost_source = self.source_error();
        for cause in self.causes() {
            write!(f, " Cause: {}", cause.format_code_and_description())?;
            innermost_source = cause.source_error();
        }
        match innermost_source {
            Some(source) => write!(f, " Cause: {source}"),
            None => Ok(()),
        }
    }
}

/// Declares a coded error enum.
///
/// ```ignore
/// coded_error! {
///     pub StageError(component = "Stage", prefix = "STG") {
///         Empty(1, "Stage '{stage}' produced nothing.", stage: &'static str),
///         Read(2, "Read failed.", ( source: Arc<io::Error> )),
///         Retried(3, "Retry failed.", ( coded_source: Box<StageError> )),
///     }
/// }
/// ```
///
/// Descriptions are `format!` strings over the variant's named fields. A variant may
/// carry either `source` or `coded_source`, never both. Reusing a number is a compile error.
#[macro_export]
macro_rules! coded_error {
    ( $vis: vis $name:ident(component = $component: literal, prefix = $prefix: literal) { $(
        $variant: ident (
            $number: literal,
            $description: literal
            $(, $field: ident : $field_type: ty )*
            $(, ( source : $source: ty ) )?
            $(, ( coded_source : $coded_source: ty ) )?
        ),
    )*}) => {
        #[derive(Clone)]
        $vis enum $name {
            $(
                $variant { $(source: $source, )? $(coded_source: $coded_source, )? $($field: $field_type, )* },
            )*
        }

        impl $name {
            const _UNIQUE_CODE_NUMBERS: () = {
                #[deny(unreachable_patterns)]
                match 0 {
                    $( $number => (), )*
                    _ => (),
                }
            };

            // (variant, code, number)
            fn coded_identity(&self) -> (&'static str, &'static str, usize) {
                match self {
                    $(
                        Self::$variant { .. } => (stringify!($variant), concat!($prefix, stringify!($number)), $number),
                    )*
                }
            }
        }

        impl $crate::CodedError for $name {
            fn variant_name(&self) -> &'static str {
                self.coded_identity().0
            }

            fn component(&self) -> &'static str {
                $component
            }

            fn code(&self) -> &'static str {
                self.coded_identity().1
            }

            fn code_prefix(&self) -> &'static str {
                $prefix
            }

            fn code_number(&self) -> usize {
                self.coded_identity().2
            }

            #[allow(unused_variables)]
            fn format_description(&self) -> String {
                match self {
                    $( Self::$variant { $( $field, )* .. } => format!($description), )*
                }
            }

            #[allow(unreachable_patterns)]
            fn source_error(&self) -> Option<&(dyn ::std::error::Error + Send + Sync + 'static)> {
                match self {
                    $($( Self::$variant { source, .. } => {
                        let source: &$source = source;
                        Some(source as &(dyn ::std::error::Error + Send + Sync))
                    }, )?)*
                    _ => None,
                }
            }

            #[allow(unreachable_patterns)]
            fn source_coded_error(&self) -> Option<&(dyn $crate::CodedError + Send + Sync)> {
                match self {
                    $($( Self::$variant { coded_source, .. } => {
                        let coded_source: &$coded_source = coded_source;
                        Some(coded_source as &(dyn $crate::CodedError + Send + Sync))
                    }, )?)*
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(self as &dyn $crate::CodedError, f)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(self as &dyn $crate::CodedError, f)
            }
        }

        impl ::std::error::Error for $name {
            fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
                $crate::CodedError::source_error(self).map(|source| source as &(dyn ::std::error::Error + 'static))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Arc};

    use crate::CodedError;

    coded_error! {
        StageError(component = "Stage", prefix = "STG") {
            Empty(1, "Stage '{stage}' produced no elements.", stage: String),
            Read(2, "Stage input could not be read.", ( source: Arc<io::Error> )),
            Retried(3, "Stage '{stage}' failed again after a retry.", stage: String, ( coded_source: Box<StageError> )),
        }
    }

    fn empty(stage: &str) -> StageError {
        StageError::Empty { stage: stage.to_owned() }
    }

    #[test]
    fn identity_comes_from_the_declaration() {
        let error = empty("filter");
        assert_eq!(error.code(), "STG1");
        assert_eq!(error.code_prefix(), "STG");
        assert_eq!(error.code_number(), 1);
        assert_eq!(error.variant_name(), "Empty");
        assert_eq!(error.component(), "Stage");
        assert_eq!(error.format_code_and_description(), "[STG1] Stage 'filter' produced no elements.");
    }

    #[test]
    fn plain_sources_are_exposed_through_std_error() {
        let read = StageError::Read { source: Arc::new(io::Error::new(io::ErrorKind::Other, "disk")) };
        assert!(read.source_error().is_some());
        assert!(read.source_coded_error().is_none());
        assert_eq!(std::error::Error::source(&read).map(|source| source.to_string()).as_deref(), Some("disk"));
        assert_eq!(read.to_string(), "[STG2] Stage input could not be read. Cause: disk");
    }

    #[test]
    fn boxed_coded_sources_form_a_chain() {
        let twice = StageError::Retried {
            stage: "outer".to_owned(),
            coded_source: Box::new(StageError::Retried { stage: "inner".to_owned(), coded_source: Box::new(empty("map")) }),
        };
        assert_eq!(twice.source_coded_error().map(|cause| cause.code()), Some("STG3"));
        assert_eq!(twice.causes().map(|cause| cause.code()).collect::<Vec<_>>(), vec!["STG3", "STG1"]);
        assert_eq!(twice.root_source_coded_error().code(), "STG1");
        assert_eq!(
            twice.to_string(),
            "[STG3] Stage 'outer' failed again after a retry. \
             Cause: [STG3] Stage 'inner' failed again after a retry. \
             Cause: [STG1] Stage 'map' produced no elements."
        );
    }

    #[test]
    fn an_error_without_causes_is_its_own_root() {
        let error = empty("take");
        assert_eq!(error.causes().count(), 0);
        assert_eq!(error.root_source_coded_error().code(), "STG1");
        assert!(Box::new(error).source_coded_error().is_none());
    }
}
