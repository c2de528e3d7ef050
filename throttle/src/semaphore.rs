use std::sync::atomic::{AtomicBool, Ordering};

/// A semaphore that is a no-op until it's given a non-zero limit.
pub struct Semaphore {
    enabled: AtomicBool,
    sem: tokio::sync::Semaphore,
}

impl Semaphore {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            sem: tokio::sync::Semaphore::const_new(0),
        }
    }

    /// Sets the number of permits, 0 disables the limit.
    pub fn setup(&self, limit: usize) {
        self.enabled.store(limit > 0, Ordering::Release);
        if limit == 0 {
            return;
        }
        self.sem.forget_permits(self.sem.available_permits());
        self.sem.add_permits(limit);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub async fn acquire(&self) -> Option<tokio::sync::SemaphorePermit<'_>> {
        if !self.is_enabled() {
            return None;
        }
        // the semaphore is never closed so acquire can't fail
        self.sem.acquire().await.ok()
    }

    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}
