//! Explicit "computed or not" cell for lazily cached fields.
//!
//! # Race Behavior
//!
//! ```text
//! thread A: read ─► empty ─► load() ─┐
//! thread B: read ─► empty ─► load() ─┼─► write lock ─► first stored value wins
//!                                    │
//! both threads return the stored value
//! ```
//!
//! Loads run outside the lock, so two first readers may both load. They always
//! converge on the value that was stored first.

use parking_lot::RwLock;

/// Lazily computed value with double-checked initialization.
#[derive(Debug)]
pub struct SlotCell<T> {
    value: RwLock<Option<T>>,
}

impl<T: Clone> Default for SlotCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SlotCell<T> {
    /// Create a new empty slot cell.
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    /// Check whether a value has been stored.
    #[inline]
    pub fn is_computed(&self) -> bool {
        self.value.read().is_some()
    }

    /// Get the stored value, if any.
    #[inline]
    pub fn get(&self) -> Option<T> {
        self.value.read().clone()
    }

    /// Store `value` unless a value is already present; returns the stored value.
    pub fn set(&self, value: T) -> T {
        self.value.write().get_or_insert(value).clone()
    }

    /// Get the stored value or compute and store it.
    pub fn get_or_init(&self, load: impl FnOnce() -> T) -> T {
        if let Some(value) = self.get() {
            return value;
        }
        self.set(load())
    }

    /// Fallible variant of [`get_or_init`](Self::get_or_init).
    ///
    /// Errors are returned to the caller and nothing is stored.
    pub fn get_or_try_init<E>(&self, load: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        Ok(self.set(load()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_slot_cell_computes_once() {
        let slot: SlotCell<u64> = SlotCell::new();
        assert!(!slot.is_computed());

        assert_eq!(slot.get_or_init(|| 10), 10);
        assert_eq!(slot.get_or_init(|| panic!("Should not reload")), 10);
        assert!(slot.is_computed());
    }

    #[test]
    fn test_slot_cell_first_set_wins() {
        let slot = SlotCell::new();
        assert_eq!(slot.set("first"), "first");
        assert_eq!(slot.set("second"), "first");
    }

    #[test]
    fn test_slot_cell_error_not_stored() {
        let slot: SlotCell<u32> = SlotCell::new();
        let result: Result<u32, &str> = slot.get_or_try_init(|| Err("boom"));
        assert!(result.is_err());
        assert!(!slot.is_computed());
        assert_eq!(slot.get_or_try_init::<&str>(|| Ok(7)), Ok(7));
    }

    #[test]
    fn test_slot_cell_racers_converge() {
        let slot = Arc::new(SlotCell::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let slot = Arc::clone(&slot);
                let loads = Arc::clone(&loads);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    slot.get_or_init(|| {
                        loads.fetch_add(1, Ordering::Relaxed);
                        i
                    })
                })
            })
            .collect();

        let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(loads.load(Ordering::Relaxed) >= 1);
        assert!(results.iter().all(|&r| r == results[0]));
        assert_eq!(slot.get(), Some(results[0]));
    }
}
