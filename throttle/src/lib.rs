//! Concurrency limits for log collection
//!
//! This crate provides process-wide limits that keep a collection run from overwhelming either
//! the collecting host or the servers it pulls from.
//!
//! # Overview
//!
//! Two independent limits are available:
//!
//! 1. **Concurrent servers** - Caps how many servers are scanned and copied from at once
//! 2. **Open files** - Caps how many files may be held open simultaneously
//!
//! Both limits are disabled by default. A disabled limit hands out no permits and never waits,
//! so a run without limits behaves exactly like an unbounded fan-out.
//!
//! # Usage
//!
//! ```rust,no_run
//! use throttle::{open_file_permit, server_permit, set_max_concurrent_servers, set_max_open_files};
//!
//! # async fn example() {
//! set_max_concurrent_servers(8);
//! set_max_open_files(256);
//!
//! // held for the whole time a server is being synchronized
//! let _server = server_permit().await;
//! // held while one source/destination pair is open
//! let _file = open_file_permit().await;
//! # }
//! ```
//!
//! Permits are released when the returned guard is dropped.

mod semaphore;

static CONCURRENT_SERVERS: semaphore::Semaphore = semaphore::Semaphore::new();
static OPEN_FILES_LIMIT: semaphore::Semaphore = semaphore::Semaphore::new();

/// Limits the number of servers processed at once, 0 means no limit.
pub fn set_max_concurrent_servers(max_servers: usize) {
    if max_servers > 0 {
        tracing::debug!("limiting concurrent servers to {}", max_servers);
    }
    CONCURRENT_SERVERS.setup(max_servers);
}

/// Limits the number of files open at once, 0 means no limit.
pub fn set_max_open_files(max_open_files: usize) {
    if max_open_files > 0 {
        tracing::debug!("limiting open files to {}", max_open_files);
    }
    OPEN_FILES_LIMIT.setup(max_open_files);
}

pub struct ServerGuard {
    _permit: Option<tokio::sync::SemaphorePermit<'static>>,
}

pub async fn server_permit() -> ServerGuard {
    ServerGuard {
        _permit: CONCURRENT_SERVERS.acquire().await,
    }
}

pub struct OpenFileGuard {
    _permit: Option<tokio::sync::SemaphorePermit<'static>>,
}

pub async fn open_file_permit() -> OpenFileGuard {
    OpenFileGuard {
        _permit: OPEN_FILES_LIMIT.acquire().await,
    }
}
