//! Built-in capabilities.
//!
//! These are ordinary [`crate::capability::Capability`] values, not part of
//! the core dispatch machinery itself — a concrete client picks whichever
//! subset it needs. They exist here because a client with
//! zero capabilities cannot do anything useful, and because they exercise
//! every shape the composition model has to support: request-only
//! (`hover`), request-with-union-response (`definition`), notification-only
//! outbound (`sync`), notification-only inbound (`diagnostics`,
//! `window::log_message`), and request-inbound (`workspace_requests`).

pub mod call_hierarchy;
pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod document_symbol;
pub mod hover;
pub mod inline_value;
pub mod references;
pub mod sync;
pub mod window;
pub mod workspace_requests;
pub mod workspace_symbol;
