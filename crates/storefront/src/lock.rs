//! Poison-tolerant lock guards.
//!
//! Store state is only ever mutated between awaits, never across them, so a
//! poisoned lock means a panic mid-update in another consumer; recovering the
//! inner value is the right call for a client-side store.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
