//! lspkit-core
//!
//! Error types, the `RequestId` primitive, and a logger handle shared by
//! every other `lspkit` crate. Nothing in here speaks JSON-RPC or LSP; it is
//! the ambient layer the protocol crate builds on.

pub mod error;
pub mod id;
pub mod logger;
pub mod result;

pub use error::{Error, ErrorContext, ErrorKind};
pub use id::RequestId;
pub use logger::{Logger, NoopLogger};
pub use result::Result;

/// Common imports for crates that build on `lspkit-core`.
pub mod prelude {
    pub use crate::error::{Error, ErrorContext, ErrorKind};
    pub use crate::id::RequestId;
    pub use crate::logger::{Logger, NoopLogger};
    pub use crate::result::Result;
    pub use tracing::{debug, error, info, trace, warn};
}
