//! Per-book critical sections.
//!
//! Every read-evaluate-write cycle against one book's loans or reservations
//! runs while holding that book's lock, so availability checks and queue
//! position mutations are linearizable per book id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct BookLocks {
    inner: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BookLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the critical section for one book. The guard must not be held
    /// across a call that acquires the same book's lock again.
    pub async fn acquire(&self, book_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("book lock registry poisoned");
            map.entry(book_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
