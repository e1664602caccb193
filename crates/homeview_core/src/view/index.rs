//! In-memory view index.
//!
//! # Responsibility
//! - Invoke a map function once per document and keep its emissions.
//! - Keep rows sorted by key collation so range reads are ordered.
//! - Replace a document's rows when a new revision arrives.
//!
//! # Invariants
//! - Row order is `(collate(key), doc id)`, ascending.
//! - Each document contributes only the emissions of its latest revision.
//! - Documents without a string `_id` and design documents are not indexed.

use crate::model::document::{DocId, Document};
use crate::view::collate::{collate, CollationKey};
use crate::view::projector::MapFunction;
use crate::view::query::{ViewQuery, ViewResult, ViewRow};
use log::{debug, info, warn};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

type RowKey = (CollationKey, DocId);

/// Sorted collection of emissions produced by one map function.
pub struct ViewIndex {
    map_fn: Box<dyn MapFunction>,
    rows: BTreeMap<RowKey, Vec<Value>>,
    doc_keys: HashMap<DocId, Vec<CollationKey>>,
    row_count: usize,
}

#[derive(Clone, Copy)]
struct RowRef<'a> {
    id: &'a str,
    key: &'a Value,
    value: &'a Value,
}

impl RowRef<'_> {
    fn to_row(self) -> ViewRow {
        ViewRow {
            id: self.id.to_string(),
            key: self.key.clone(),
            value: self.value.clone(),
            doc: None,
        }
    }
}

impl ViewIndex {
    pub fn new(map_fn: Box<dyn MapFunction>) -> Self {
        Self {
            map_fn,
            rows: BTreeMap::new(),
            doc_keys: HashMap::new(),
            row_count: 0,
        }
    }

    /// Name of the map function feeding this index.
    pub fn name(&self) -> &str {
        self.map_fn.name()
    }

    /// Number of rows currently indexed.
    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Number of documents that currently contribute rows.
    pub fn document_count(&self) -> usize {
        self.doc_keys.len()
    }

    pub fn contains_document(&self, doc_id: &str) -> bool {
        self.doc_keys.contains_key(doc_id)
    }

    /// Indexes one document revision, replacing its previous rows.
    ///
    /// Returns the number of rows the document now contributes.
    pub fn update(&mut self, doc: &Document) -> usize {
        let Some(doc_id) = doc.id() else {
            warn!(
                "event=view_update module=view status=skipped view={} reason=missing_id",
                self.name()
            );
            return 0;
        };

        self.remove(doc_id);
        if doc.is_design_doc() {
            return 0;
        }

        let emissions = self.map_fn.map(doc);
        let emitted = emissions.len();
        let mut keys = Vec::with_capacity(emitted);

        for emission in emissions {
            let key = CollationKey(emission.key);
            self.rows
                .entry((key.clone(), doc_id.to_string()))
                .or_default()
                .push(emission.value);
            keys.push(key);
        }

        if !keys.is_empty() {
            self.doc_keys.insert(doc_id.to_string(), keys);
        }
        self.row_count += emitted;

        debug!(
            "event=view_update module=view status=ok view={} rows={}",
            self.name(),
            emitted
        );
        emitted
    }

    /// Drops every row contributed by `doc_id`. Returns the number removed.
    pub fn remove(&mut self, doc_id: &str) -> usize {
        let Some(keys) = self.doc_keys.remove(doc_id) else {
            return 0;
        };

        let mut removed = 0;
        for key in keys {
            if let Some(values) = self.rows.remove(&(key, doc_id.to_string())) {
                removed += values.len();
            }
        }
        self.row_count -= removed;
        removed
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.doc_keys.clear();
        self.row_count = 0;
    }

    /// Rebuilds the index from scratch over `docs`.
    pub fn rebuild<'a, I>(&mut self, docs: I)
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let started_at = Instant::now();
        self.clear();

        let mut doc_count = 0usize;
        for doc in docs {
            self.update(doc);
            doc_count += 1;
        }

        info!(
            "event=view_rebuild module=view status=ok view={} docs={} rows={} duration_ms={}",
            self.name(),
            doc_count,
            self.row_count,
            started_at.elapsed().as_millis()
        );
    }

    /// Reads rows matching `query`.
    ///
    /// `include_docs` is ignored here; the index never holds documents.
    pub fn query(&self, query: &ViewQuery) -> ViewResult {
        let total_rows = self.row_count;
        let limit = query.limit.unwrap_or(usize::MAX);

        if let Some(keys) = &query.keys {
            let rows = keys
                .iter()
                .flat_map(|key| self.rows_for_key(key, query.descending))
                .skip(query.skip)
                .take(limit)
                .map(RowRef::to_row)
                .collect();
            return ViewResult {
                total_rows,
                offset: 0,
                rows,
            };
        }

        let (start, end) = match &query.key {
            Some(key) => (Some(key), Some(key)),
            None => (query.start_key.as_ref(), query.end_key.as_ref()),
        };
        let inclusive_end = query.key.is_some() || query.inclusive_end;
        let descending = query.descending;

        let directional = |ordering: Ordering| {
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        };
        let before_start = |key: &Value| {
            start.is_some_and(|start| directional(collate(key, start)) == Ordering::Less)
        };
        let past_end = |key: &Value| {
            end.is_some_and(|end| match directional(collate(key, end)) {
                Ordering::Greater => true,
                Ordering::Equal => !inclusive_end,
                Ordering::Less => false,
            })
        };

        let mut leading = 0usize;
        let mut skipped = 0usize;
        let mut rows = Vec::new();

        for row in self.directional_rows(descending) {
            if before_start(row.key) {
                leading += 1;
                continue;
            }
            if past_end(row.key) {
                break;
            }
            if skipped < query.skip {
                skipped += 1;
                continue;
            }
            if rows.len() >= limit {
                break;
            }
            rows.push(row.to_row());
        }

        ViewResult {
            total_rows,
            offset: leading + skipped,
            rows,
        }
    }

    fn directional_rows(&self, descending: bool) -> Vec<RowRef<'_>> {
        let mut rows = self
            .rows
            .iter()
            .flat_map(|((key, id), values)| {
                values.iter().map(move |value| RowRef {
                    id: id.as_str(),
                    key: &key.0,
                    value,
                })
            })
            .collect::<Vec<_>>();
        if descending {
            rows.reverse();
        }
        rows
    }

    fn rows_for_key(&self, key: &Value, descending: bool) -> Vec<RowRef<'_>> {
        let lower = (CollationKey(key.clone()), String::new());
        let mut rows = self
            .rows
            .range(lower..)
            .take_while(|((row_key, _), _)| collate(&row_key.0, key) == Ordering::Equal)
            .flat_map(|((row_key, id), values)| {
                values.iter().map(move |value| RowRef {
                    id: id.as_str(),
                    key: &row_key.0,
                    value,
                })
            })
            .collect::<Vec<_>>();
        if descending {
            rows.reverse();
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::ViewIndex;
    use crate::model::document::Document;
    use crate::view::projector::{Emission, FieldProjector, MapFunction};
    use serde_json::json;

    struct TwoKeys;

    impl MapFunction for TwoKeys {
        fn name(&self) -> &str {
            "two_keys"
        }

        fn map(&self, doc: &Document) -> Vec<Emission> {
            ["a", "b"]
                .into_iter()
                .map(|key| Emission {
                    key: json!(key),
                    value: doc.raw_id().cloned().unwrap_or_default(),
                })
                .collect()
        }
    }

    #[test]
    fn update_replaces_all_previous_emissions() {
        let mut index = ViewIndex::new(Box::new(TwoKeys));
        let doc = Document::new("d1");

        assert_eq!(index.update(&doc), 2);
        assert_eq!(index.update(&doc), 2);
        assert_eq!(index.len(), 2);
        assert_eq!(index.document_count(), 1);

        assert_eq!(index.remove("d1"), 2);
        assert!(index.is_empty());
        assert!(!index.contains_document("d1"));
    }

    #[test]
    fn design_documents_and_id_less_documents_are_skipped() {
        let mut index = ViewIndex::new(Box::new(FieldProjector::quickview()));

        assert_eq!(index.update(&Document::new("_design/simpleViews")), 0);
        assert_eq!(index.update(&Document::default()), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn remove_unknown_document_is_a_no_op() {
        let mut index = ViewIndex::new(Box::new(FieldProjector::quickview()));
        assert_eq!(index.remove("missing"), 0);
    }
}
