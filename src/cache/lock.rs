//! Poison-tolerant lock access for the page cache.
//!
//! A panic inside a regeneration task must not take the whole cache down, so
//! a poisoned lock is recovered and the event logged.

use std::sync::{LockResult, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), "rwlock.read", op)
}

pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), "rwlock.write", op)
}

pub(crate) fn lock<'a, T>(lock: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    recover(lock.lock(), "mutex.lock", op)
}

fn recover<G>(result: LockResult<G>, lock_kind: &'static str, op: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "lectern::cache",
            op,
            lock_kind,
            result = "poisoned_recovered",
            "Recovered from poisoned page cache lock"
        );
        poisoned.into_inner()
    })
}
