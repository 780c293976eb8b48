//! Flag relationship store with live backend and embedded fallback.
//!
//! Every checker that needs flag metadata (conflict sets, privilege
//! requirements, categories) goes through [`RelationshipStore`]. The store
//! is constructed either against a live [`GraphBackend`] or directly on
//! the embedded dataset; callers never see which source answered a query.
//!
//! Degradation policy: a backend failure — at construction or at any
//! query — logs one notice and flips the instance permanently to the
//! embedded table. There are no reconnect attempts mid-session; construct
//! a new store to retry the backend.
//!
//! # Example
//!
//! ```
//! use scanvet_store::RelationshipStore;
//!
//! let store = RelationshipStore::embedded();
//! let conflicts = store.conflicts_of("-sS");
//! assert!(conflicts.contains(&"-sT".to_string()));
//!
//! let (needs_root, flags) = store.requires_privilege(&["-sS".into(), "-v".into()]);
//! assert!(needs_root);
//! assert_eq!(flags, vec!["-sS"]);
//! ```

mod backend;
mod error;
pub mod fallback;

use std::sync::atomic::{AtomicBool, Ordering};

use scanvet_core::OptionRecord;
use tracing::{debug, warn};

pub use backend::{GraphBackend, OptionFilter};
pub use error::{Result, StoreError};

/// Capability-abstracted lookup of flag conflicts and privilege
/// requirements.
///
/// Shared-immutable after construction: queries take `&self` and the only
/// interior state is the degraded-mode latch, so one store may serve
/// concurrent validation runs.
pub struct RelationshipStore {
    backend: Option<Box<dyn GraphBackend>>,
    degraded: AtomicBool,
}

impl RelationshipStore {
    /// Connects against a live backend, degrading to the embedded table
    /// if the initial ping fails.
    pub fn connect(backend: Box<dyn GraphBackend>) -> Self {
        let degraded = match backend.ping() {
            Ok(()) => {
                debug!("relationship backend reachable");
                false
            }
            Err(err) => {
                warn!(error = %err, "relationship backend unreachable, using embedded fallback");
                true
            }
        };
        Self {
            backend: Some(backend),
            degraded: AtomicBool::new(degraded),
        }
    }

    /// A store that serves the embedded dataset only.
    pub fn embedded() -> Self {
        Self {
            backend: None,
            degraded: AtomicBool::new(true),
        }
    }

    /// True when queries are served from the embedded table.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn live(&self) -> Option<&dyn GraphBackend> {
        if self.degraded.load(Ordering::Relaxed) {
            None
        } else {
            self.backend.as_deref()
        }
    }

    /// Latches fallback mode for the remaining lifetime of this instance.
    fn degrade(&self, err: &StoreError) {
        warn!(error = %err, "relationship backend query failed, switching to embedded fallback");
        self.degraded.store(true, Ordering::Relaxed);
    }

    /// Flags known to conflict with `flag`; empty when none are known.
    pub fn conflicts_of(&self, flag: &str) -> Vec<String> {
        if let Some(backend) = self.live() {
            match backend.conflicts_of(flag) {
                Ok(conflicts) => return conflicts,
                Err(err) => self.degrade(&err),
            }
        }
        fallback::conflicts_of(flag)
    }

    /// All known options matching the filter.
    pub fn options_matching(&self, filter: &OptionFilter) -> Vec<OptionRecord> {
        if let Some(backend) = self.live() {
            match backend.options(filter) {
                Ok(options) => return options,
                Err(err) => self.degrade(&err),
            }
        }
        fallback::options(filter)
    }

    /// Which of the given flags require elevated privilege.
    ///
    /// Returns `(any_required, matching_flags)` with `matching_flags` in
    /// input order, deduplicated.
    pub fn requires_privilege(&self, flags: &[String]) -> (bool, Vec<String>) {
        let privileged: Vec<String> = self
            .options_matching(&OptionFilter::new().requiring_privilege(true))
            .into_iter()
            .map(|rec| rec.name)
            .collect();

        let mut found: Vec<String> = Vec::new();
        for flag in flags {
            if privileged.contains(flag) && !found.contains(flag) {
                found.push(flag.clone());
            }
        }
        (!found.is_empty(), found)
    }
}

impl Default for RelationshipStore {
    fn default() -> Self {
        Self::embedded()
    }
}

impl std::fmt::Debug for RelationshipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipStore")
            .field("has_backend", &self.backend.is_some())
            .field("degraded", &self.is_degraded())
            .finish()
    }
}
