use std::collections::BTreeSet;
use std::rc::Rc;

use serde::Serialize;

use crate::error::ViewError;
use crate::filter::FilterState;
use crate::model::Record;

/// The records matching one filter state, in store order.
///
/// A fresh index list is built on every recompute; cloning is cheap and a
/// kept clone never changes underneath its holder.
#[derive(Clone, Debug)]
pub struct Subset {
    records: Rc<[Record]>,
    indices: Rc<[usize]>,
    state: Rc<FilterState>,
}

impl Subset {
    pub(crate) fn new(records: Rc<[Record]>, indices: Vec<usize>, state: FilterState) -> Self {
        Subset {
            records,
            indices: indices.into(),
            state: Rc::new(state),
        }
    }

    /// Every record of `records`, under an empty filter state.
    pub(crate) fn full(records: Rc<[Record]>) -> Self {
        let indices = (0..records.len()).collect();
        Subset::new(records, indices, FilterState::default())
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Size of the store the subset was taken from.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// True when any constraint produced this subset.
    pub fn is_filtered(&self) -> bool {
        self.state.is_active()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.indices.iter().map(move |&i| &self.records[i])
    }
}

impl PartialEq for Subset {
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices
            && (Rc::ptr_eq(&self.records, &other.records) || self.records == other.records)
    }
}

/// A view that re-renders from each new subset.
///
/// `apply` runs while the engine is propagating: it may read the engine but
/// any filter change it issues is suppressed.
pub trait Consumer {
    fn apply(&self, subset: &Subset) -> Result<(), ViewError>;

    fn label(&self) -> &str {
        "view"
    }
}

impl<F> Consumer for F
where
    F: Fn(&Subset) -> Result<(), ViewError>,
{
    fn apply(&self, subset: &Subset) -> Result<(), ViewError> {
        self(subset)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HighlightField {
    Municipio,
    Circuito,
}

/// Geospatial collaborator driven by [`crate::map::MapSync`].
pub trait MapView {
    fn reset_to_default_extent(&self);

    fn highlight_by_field(&self, field: HighlightField, values: &BTreeSet<String>);
}
