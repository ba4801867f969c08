// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// Errors raised synchronously by the deferred API.
///
/// Everything else travels forward as a rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeferredError {
    #[error("type constraint violation: {0}")]
    TypeConstraintViolation(&'static str),
}
