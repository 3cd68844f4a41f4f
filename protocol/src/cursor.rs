// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

mod read;
mod write;

use thiserror::Error;

pub use read::Cursor;
pub use write::CursorMut;

/// The error type for `Cursor` and `CursorMut`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CursorError {
    /// Invalid number.
    #[error("Invalid number")]
    InvalidNumber,
    /// Invalid string.
    #[error("Invalid string")]
    InvalidString,
    /// Expected data not found.
    #[error("Expected data not found")]
    Expect,
    /// An unexpected data found.
    #[error("Unexpected data")]
    ExpectEmpty,
    /// Buffer size is no enougth to decode or encode a packet.
    #[error("Unexpected end of buffer")]
    UnexpectedEnd,
}

pub type Result<T, E = CursorError> = core::result::Result<T, E>;
