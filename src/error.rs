//! Boundary error type for lhdiff_core
//!
//! The matching pipeline itself is total (see `matcher` module docs):
//! it never fails on a well-formed `LineSide`. The only place an error
//! can legitimately originate is at the I/O boundary, reading a file
//! into a `LineSide`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced at the I/O boundary of the core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
