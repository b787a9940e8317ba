//! Provider adapters for generation models.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Scripted provider for tests and offline runs.
pub mod mock;
/// `OpenRouter` chat-completions implementation.
pub mod openrouter;
/// Per-call timeout wrapper.
pub mod timeout;

pub use mock::{MockProvider, MockReply};
pub use openrouter::OpenRouterProvider;
pub use timeout::TimeoutProvider;
