// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Process-wide defaults.
//!
//! Instances may override them with their own `set_timeout` and `set_retries`.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Default receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default number of attempts to get a page from a master server.
pub const DEFAULT_RETRIES: u32 = 3;

static TIMEOUT: AtomicU64 = AtomicU64::new(DEFAULT_TIMEOUT.as_millis() as u64);
static RETRIES: AtomicU32 = AtomicU32::new(DEFAULT_RETRIES);

/// Sets the receive timeout for sockets without their own timeout.
///
/// The timeout is rounded down to milliseconds, zero is treated as one millisecond.
pub fn set_timeout(timeout: Duration) {
    let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    TIMEOUT.store(ms, Ordering::Relaxed);
}

/// Returns the receive timeout for sockets without their own timeout.
pub fn timeout() -> Duration {
    Duration::from_millis(TIMEOUT.load(Ordering::Relaxed).max(1))
}

/// Sets the number of attempts to get a page from a master server.
pub fn set_retries(retries: u32) {
    RETRIES.store(retries.max(1), Ordering::Relaxed);
}

/// Returns the number of attempts to get a page from a master server.
pub fn retries() -> u32 {
    RETRIES.load(Ordering::Relaxed)
}
