// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// Errors from driving the event loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("task budget of {budget} exhausted; something keeps rescheduling itself")]
    TaskBudgetExhausted { budget: usize },
}
