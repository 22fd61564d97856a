//! One lock per cache key, created on demand.
//!
//! Entries live only while someone holds or waits for the key, so the table
//! stays as small as the number of requests in flight.

use std::{collections::HashMap, sync::Arc};

use log::trace;
use parking_lot::{Condvar, Mutex};

use crate::key::CacheKey;

#[derive(Default)]
struct Slot {
    held: Mutex<bool>,
    released: Condvar,
}

#[derive(Default)]
pub struct LockTable {
    slots: Mutex<HashMap<CacheKey, Arc<Slot>>>,
}

impl LockTable {
    /// Block until `key` is free, then hold it until the guard drops.
    pub fn lock(&self, key: CacheKey) -> KeyGuard<'_> {
        // cloned under the table lock so a releasing guard sees us waiting
        let slot = self.slots.lock().entry(key).or_default().clone();

        let mut held = slot.held.lock();
        while *held {
            trace!("Waiting for {key}");
            slot.released.wait(&mut held);
        }
        *held = true;
        drop(held);

        KeyGuard {
            table: self,
            key,
            slot: Some(slot),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its key on drop, including during unwinding.
pub struct KeyGuard<'a> {
    table: &'a LockTable,
    key: CacheKey,
    /// Only `None` once dropped.
    slot: Option<Arc<Slot>>,
}

impl KeyGuard<'_> {
    pub fn key(&self) -> CacheKey {
        self.key
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        *slot.held.lock() = false;
        slot.released.notify_one();

        // every clone and drop of a slot happens under the table lock
        let mut slots = self.table.slots.lock();
        drop(slot);
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Barrier,
        },
        thread,
        time::Duration,
    };

    use more_asserts::assert_le;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lock_and_release_leaves_table_empty() {
        let table = LockTable::default();
        let key = CacheKey::new("Sans", "A");
        {
            let guard = table.lock(key);
            assert_eq!(guard.key(), key);
            assert_eq!(table.len(), 1);
        }
        assert!(table.is_empty());
    }

    #[test]
    fn same_key_is_exclusive() {
        let table = LockTable::default();
        let key = CacheKey::new("Sans", "A");
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    let _guard = table.lock(key);
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn different_keys_do_not_block() {
        let table = LockTable::default();
        let _a = table.lock(CacheKey::new("Sans", "A"));
        // would deadlock if keys shared a lock
        let _b = table.lock(CacheKey::new("Sans", "B"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn released_on_panic() {
        let table = LockTable::default();
        let key = CacheKey::new("Sans", "A");
        let result = thread::scope(|s| {
            s.spawn(|| {
                let _guard = table.lock(key);
                panic!("pipeline blew up");
            })
            .join()
        });
        assert!(result.is_err());
        assert!(table.is_empty());
        // and can be taken again
        let _guard = table.lock(key);
        assert_le!(table.len(), 1);
    }

    #[test]
    fn handoff_to_waiter_leaves_table_empty() {
        let table = LockTable::default();
        let key = CacheKey::new("Sans", "A");
        let guard = table.lock(key);
        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let _guard = table.lock(key);
            });
            // the waiter has registered once the slot is shared
            while table
                .slots
                .lock()
                .get(&key)
                .is_some_and(|slot| Arc::strong_count(slot) < 3)
            {
                thread::yield_now();
            }
            drop(guard);
            waiter.join().unwrap();
        });
        assert!(table.is_empty());
    }

    #[test]
    fn contended_release_never_leaks_slots() {
        let table = LockTable::default();
        let keys = [CacheKey::new("Sans", "A"), CacheKey::new("Sans", "B")];
        thread::scope(|s| {
            for i in 0..8 {
                let table = &table;
                s.spawn(move || {
                    for _ in 0..500 {
                        let _guard = table.lock(keys[i % 2]);
                    }
                });
            }
        });
        assert!(table.is_empty());
    }
}
