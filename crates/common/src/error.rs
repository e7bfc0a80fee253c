use std::error::Error as StdError;

/// Boxed error used to carry the underlying cause of a contextualised failure.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error types that can be built from a plain message, optionally wrapping
/// the error that caused it.
///
/// Implement this for a crate's error type, then invoke [`impl_context!`]
/// in its error module to get `.context()` and `.with_context()` on `Result`
/// and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;

    /// Wrap `source` under a human-readable `context`.
    ///
    /// The default flattens both into a single message; error types with a
    /// dedicated variant for wrapped causes should override it so the source
    /// chain survives.
    fn from_context(context: String, source: BoxError) -> Self {
        Self::from_message(format!("{context}: {source}"))
    }
}

/// Generate a crate-local `Context` trait with `.context()` and `.with_context()`
/// methods on `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// skillman_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E> Context<T> for std::result::Result<T, E>
        where
            E: Into<$crate::error::BoxError>,
        {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_context(context.into(), source.into())
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_context(f().into(), source.into())
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
