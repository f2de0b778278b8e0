//! Re-entrancy and concurrency guards for service construction.
//!
//! - [`ChainGuard`] tracks, per thread, the ids currently being built by each
//!   container so that a reference cycle fails fast instead of recursing.
//! - [`ConstructionLocks`] serializes construction of a given singleton id
//!   across threads.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rivet_common::error::{RivetError, Result};

thread_local! {
    /// `(container, id)` pairs under construction on this thread, outermost first.
    static CHAIN: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Marks an id as under construction until dropped.
#[derive(Debug)]
pub(crate) struct ChainGuard {
    _private: (),
}

impl ChainGuard {
    /// Pushes `id` onto the current thread's resolution chain for `owner`.
    ///
    /// # Errors
    ///
    /// Returns a cyclic dependency error if `id` is already on the chain.
    pub(crate) fn enter(owner: usize, id: &str) -> Result<Self> {
        CHAIN.with_borrow_mut(|chain| {
            if chain.iter().any(|(o, entry)| *o == owner && entry == id) {
                let mut cycle: Vec<String> = chain
                    .iter()
                    .filter(|(o, _)| *o == owner)
                    .map(|(_, entry)| entry.clone())
                    .skip_while(|entry| entry != id)
                    .collect();
                cycle.push(id.to_owned());
                tracing::debug!(chain = ?cycle, "cyclic dependency detected");
                return Err(RivetError::CyclicDependency { chain: cycle });
            }
            chain.push((owner, id.to_owned()));
            Ok(Self { _private: () })
        })
    }
}

impl Drop for ChainGuard {
    fn drop(&mut self) {
        let _ = CHAIN.try_with(|chain| chain.borrow_mut().pop());
    }
}

/// One construction mutex per service id.
#[derive(Debug, Default)]
pub(crate) struct ConstructionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConstructionLocks {
    /// Returns the mutex guarding construction of `id`.
    pub(crate) fn for_id(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_owned()).or_default())
    }

    /// Forgets every mutex. Builds already holding one keep it until done.
    pub(crate) fn clear(&self) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
