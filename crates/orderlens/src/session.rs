use std::collections::HashMap;
use std::sync::Arc;

use ol_filter::FilterSpec;
use ol_table::OrderTable;

use crate::analysis::{Analysis, analyze};

/// The currently loaded table plus a memo of analyses keyed by selection.
///
/// The memo is only an optimisation: a cached entry is always equal to a
/// fresh `analyze` over the same table and spec. Replacing the table drops it.
#[derive(Debug, Default)]
pub struct Session {
    table: Arc<OrderTable>,
    memo: HashMap<FilterSpec, Arc<Analysis>>,
    hits: u64,
    misses: u64,
}

impl Session {
    #[must_use]
    pub fn new(table: OrderTable) -> Self {
        Self {
            table: Arc::new(table),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn table(&self) -> &Arc<OrderTable> {
        &self.table
    }

    /// Swaps in a new upload or regenerated table wholesale.
    pub fn replace_table(&mut self, table: OrderTable) {
        self.table = Arc::new(table);
        self.memo.clear();
    }

    pub fn analyze(&mut self, spec: &FilterSpec) -> Arc<Analysis> {
        if let Some(hit) = self.memo.get(spec) {
            self.hits += 1;
            return Arc::clone(hit);
        }
        self.misses += 1;
        let analysis = Arc::new(analyze(&self.table, spec));
        self.memo.insert(spec.clone(), Arc::clone(&analysis));
        analysis
    }

    #[must_use]
    pub fn cached_selections(&self) -> usize {
        self.memo.len()
    }

    #[must_use]
    pub fn hit_miss(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
