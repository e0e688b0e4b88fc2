//! `Result` type alias for lspkit operations.

use crate::error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
