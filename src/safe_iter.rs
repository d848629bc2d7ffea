//! Outstanding safe-iterator tracking.
//!
//! Each table owns a counter; every safe iterator holds a guard on it.
//! While the count is non-zero the table skips its opportunistic rehash
//! steps, so chains a safe iterator is walking stay where they are.
//! Dropping the guard (explicitly or with the iterator) gives the slot back.

use core::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
pub(crate) struct SafeIterCount {
    count: Rc<Cell<usize>>,
}

impl SafeIterCount {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count.get()
    }

    /// Address of the shared counter. Each table owns exactly one, so it
    /// also tags the handles the table issues.
    #[inline]
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.count) as usize
    }

    pub(crate) fn acquire(&self) -> SafeIterGuard {
        self.count.set(self.count.get() + 1);
        SafeIterGuard {
            owner: Rc::clone(&self.count),
        }
    }
}

/// RAII guard returned by `SafeIterCount::acquire`.
#[derive(Debug)]
pub(crate) struct SafeIterGuard {
    owner: Rc<Cell<usize>>,
}

impl SafeIterGuard {
    pub(crate) fn belongs_to(&self, counter: &SafeIterCount) -> bool {
        Rc::ptr_eq(&self.owner, &counter.count)
    }
}

impl Drop for SafeIterGuard {
    fn drop(&mut self) {
        let c = self.owner.get();
        debug_assert!(c > 0);
        self.owner.set(c - 1);
    }
}
