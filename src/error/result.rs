//! Result alias and context extension.

use super::context::ErrorContext;
use super::market_error::MarketError;

pub type MarketResult<T> = Result<T, MarketError>;

/// Attach an [`ErrorContext`] to any error convertible into [`MarketError`].
pub trait ResultExt<T> {
    fn context(self, ctx: ErrorContext) -> MarketResult<T>;

    /// Like [`context`](ResultExt::context) but only builds the context on error.
    fn with_context<F>(self, f: F) -> MarketResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<MarketError>,
{
    fn context(self, ctx: ErrorContext) -> MarketResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> MarketResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
