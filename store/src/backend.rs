//! The graph backend capability seam.
//!
//! A [`GraphBackend`] answers the same queries as the embedded fallback
//! table; the [`RelationshipStore`](crate::RelationshipStore) hides which
//! of the two is active. Connection parameters (address, credentials) are
//! a concern of the backend implementation, not of this crate.

use scanvet_core::{FlagCategory, OptionRecord};

use crate::error::Result;

/// Filters for option queries.
///
/// All fields are optional; an empty filter matches every known option.
///
/// # Examples
///
/// ```
/// use scanvet_core::FlagCategory;
/// use scanvet_store::OptionFilter;
///
/// let filter = OptionFilter::new()
///     .requiring_privilege(true)
///     .in_category(FlagCategory::ScanType);
/// assert_eq!(filter.requires_privilege, Some(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptionFilter {
    /// Match only options with this privilege requirement.
    pub requires_privilege: Option<bool>,
    /// Match only options in this category.
    pub category: Option<FlagCategory>,
    /// Exclude options that conflict with any of these flags.
    pub exclude_conflicting_with: Vec<String>,
}

impl OptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requiring_privilege(mut self, required: bool) -> Self {
        self.requires_privilege = Some(required);
        self
    }

    pub fn in_category(mut self, category: FlagCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn excluding_conflicting_with(mut self, flags: &[&str]) -> Self {
        self.exclude_conflicting_with = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Applies the filter to one record.
    pub fn matches(&self, record: &OptionRecord) -> bool {
        if self
            .requires_privilege
            .is_some_and(|required| record.requires_privilege != required)
        {
            return false;
        }
        if self.category.is_some_and(|category| record.category != category) {
            return false;
        }
        if record
            .conflicts_with
            .iter()
            .any(|c| self.exclude_conflicting_with.contains(c))
        {
            return false;
        }
        true
    }
}

/// A live relationship-graph backend.
///
/// Implementations are expected to be remote (graph database, HTTP
/// service); every method is fallible so the store can degrade cleanly.
pub trait GraphBackend: Send + Sync {
    /// Cheap connectivity probe, called once at store construction.
    fn ping(&self) -> Result<()>;

    /// Flags known to conflict with `flag`; empty when none are known.
    fn conflicts_of(&self, flag: &str) -> Result<Vec<String>>;

    /// All options matching the filter.
    fn options(&self, filter: &OptionFilter) -> Result<Vec<OptionRecord>>;
}
