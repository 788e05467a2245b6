//! Storage disciplines for the current snapshot.
//!
//! The refill and admission logic is written once over [`BucketState`] values; a storage
//! only decides how the next snapshot replaces the current one:
//!
//! - [`AtomicStorage`] publishes through an `ArcSwap` with compare-and-swap. No lock is
//!   held while a transition is computed; a writer that lost a race recomputes from the
//!   newer snapshot.
//! - [`LocalStorage`] keeps the snapshot in a `RefCell`. It is `Send` but not `Sync`, so
//!   the compiler enforces the single-owner assumption.

use crate::state::BucketState;
use arc_swap::ArcSwap;
use std::cell::RefCell;
use std::sync::Arc;

/// What a transition wants done with the snapshot it computed.
#[derive(Debug)]
pub enum Transition<T> {
    /// Must replace exactly the snapshot it was computed from; recompute on conflict.
    Commit(BucketState, T),
    /// Publish if nothing changed meanwhile, otherwise drop it and return anyway. Used
    /// for refreshed-but-undebited snapshots, which a concurrent writer already supersedes.
    Refresh(BucketState, T),
}

/// How a bucket stores and replaces its snapshot.
pub trait StateStorage {
    fn with_state(initial: BucketState) -> Self;

    /// Copy of the current snapshot.
    fn snapshot(&self) -> BucketState;

    /// Run `f` against the current snapshot and apply the resulting transition. `f` may
    /// run more than once and must be a pure function of its input.
    fn transition<T, F>(&self, f: F) -> T
    where
        F: FnMut(&BucketState) -> Transition<T>;
}

/// Lock-free storage for buckets shared between threads.
#[derive(Debug)]
pub struct AtomicStorage {
    current: ArcSwap<BucketState>,
}

impl StateStorage for AtomicStorage {
    fn with_state(initial: BucketState) -> Self {
        Self { current: ArcSwap::from_pointee(initial) }
    }

    fn snapshot(&self) -> BucketState {
        BucketState::clone(&self.current.load())
    }

    fn transition<T, F>(&self, mut f: F) -> T
    where
        F: FnMut(&BucketState) -> Transition<T>,
    {
        loop {
            // Holding `observed` keeps its allocation alive, so the pointer comparison in
            // compare_and_swap cannot be fooled by address reuse.
            let observed = self.current.load_full();
            match f(&observed) {
                Transition::Commit(next, out) => {
                    let prev = self.current.compare_and_swap(&observed, Arc::new(next));
                    if Arc::ptr_eq(&prev, &observed) {
                        return out;
                    }
                    tracing::trace!("bucket: snapshot changed concurrently, retrying");
                }
                Transition::Refresh(next, out) => {
                    let _ = self.current.compare_and_swap(&observed, Arc::new(next));
                    return out;
                }
            }
        }
    }
}

/// Unsynchronized storage for buckets with a single owner.
#[derive(Debug)]
pub struct LocalStorage {
    current: RefCell<BucketState>,
}

impl StateStorage for LocalStorage {
    fn with_state(initial: BucketState) -> Self {
        Self { current: RefCell::new(initial) }
    }

    fn snapshot(&self) -> BucketState {
        self.current.borrow().clone()
    }

    fn transition<T, F>(&self, mut f: F) -> T
    where
        F: FnMut(&BucketState) -> Transition<T>,
    {
        let step = f(&self.current.borrow());
        match step {
            Transition::Commit(next, out) | Transition::Refresh(next, out) => {
                *self.current.borrow_mut() = next;
                out
            }
        }
    }
}
