use std::time::Instant;
use tokio::task;
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Record;
use crate::index::cursor::IndexCursor;
use crate::search::request::SearchRequest;
use crate::search::results::SearchPage;
use crate::storage::handle::StoreHandle;

/// Where a scan stands: still consuming the offset, or filling the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    Skipping { remaining: u64 },
    Collecting,
}

/// Answers prefix searches with offset/limit paging over the data index.
///
/// Page boundaries are not remembered between calls; every request opens a
/// fresh cursor and skips `offset` entries.
#[derive(Clone)]
pub struct QueryEngine {
    store: StoreHandle,
}

impl QueryEngine {
    pub fn new(store: StoreHandle) -> Self {
        QueryEngine { store }
    }

    pub async fn execute(&self, request: SearchRequest) -> Result<SearchPage> {
        self.search(request.prefix, request.offset, request.limit).await
    }

    /// Records whose `data` starts with `prefix`, in index order, skipping
    /// `offset` and returning at most `limit`.
    pub async fn search(&self, prefix: impl Into<String>, offset: u64, limit: usize) -> Result<SearchPage> {
        if limit == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "limit must be positive"));
        }

        let prefix = prefix.into();
        let store = self.store.open().await?;
        let started = Instant::now();

        let (has_more, records) = task::spawn_blocking({
            let prefix = prefix.clone();
            move || {
                let collection = store.read();
                scan_page(collection.prefix_cursor(&prefix), offset, limit)
            }
        })
        .await
        .map_err(|e| Error::from(e).within(ErrorKind::Query))??;

        let took_ms = started.elapsed().as_millis() as u64;
        debug!(prefix = %prefix, offset, limit, found = records.len(), has_more, took_ms, "search");

        Ok(SearchPage {
            has_more,
            records,
            took_ms,
        })
    }
}

/// Run the scan, reporting any cursor failure as a `Query` error.
fn scan_page(cursor: IndexCursor<'_>, offset: u64, limit: usize) -> Result<(bool, Vec<Record>)> {
    scan(cursor, offset, limit).map_err(|e| e.within(ErrorKind::Query))
}

fn scan(mut cursor: IndexCursor<'_>, offset: u64, limit: usize) -> Result<(bool, Vec<Record>)> {
    let mut phase = if offset > 0 {
        ScanPhase::Skipping { remaining: offset }
    } else {
        ScanPhase::Collecting
    };
    let mut page = Vec::with_capacity(limit.min(1024));

    loop {
        match phase {
            ScanPhase::Skipping { remaining } => {
                if cursor.advance(remaining) < remaining {
                    return Ok((false, page));
                }
                phase = ScanPhase::Collecting;
            }
            ScanPhase::Collecting => {
                if page.len() == limit {
                    return Ok((cursor.has_next(), page));
                }
                match cursor.next_record()? {
                    Some(record) => page.push(record),
                    None => return Ok((false, page)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use crate::core::types::RecordId;
    use crate::index::data_index::DataIndex;
    use crate::storage::collection::Collection;

    fn collection(data: &[&str]) -> Collection {
        let mut collection = Collection::new();
        let records = collection.assign_ids(data.iter().map(|s| s.to_string()).collect());
        collection.apply_batch(records).unwrap();
        collection
    }

    #[test]
    fn scan_skips_then_collects() {
        let c = collection(&["ab3", "ab1", "b", "ab2", "ac"]);

        let (more, page) = scan(c.prefix_cursor("ab"), 1, 1).unwrap();
        assert!(more);
        assert_eq!(page, vec![Record::new(RecordId(4), "ab2")]);

        let (more, page) = scan(c.prefix_cursor("ab"), 1, 2).unwrap();
        assert!(!more);
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn offset_past_the_end_is_empty() {
        let c = collection(&["a", "b"]);
        assert_eq!(scan(c.prefix_cursor(""), 5, 10).unwrap(), (false, vec![]));
        assert_eq!(scan(c.prefix_cursor(""), 2, 10).unwrap(), (false, vec![]));
    }

    #[test]
    fn exact_fit_has_no_more() {
        let c = collection(&["x1", "x2", "x3"]);
        let (more, page) = scan(c.prefix_cursor("x"), 0, 3).unwrap();
        assert!(!more);
        assert_eq!(page.len(), 3);
    }

    #[test]
    fn dangling_index_entry_fails_as_query_error() {
        let mut records = BTreeMap::new();
        let mut index = DataIndex::new();
        let live: Arc<str> = Arc::from("q1");
        records.insert(RecordId(1), live.clone());
        index.insert(live, RecordId(1));
        index.insert(Arc::from("q2"), RecordId(2));
        index.insert(Arc::from("q3"), RecordId(1));

        let err = scan_page(IndexCursor::new(index.prefix_range("q"), &records), 0, 10).unwrap_err();
        assert!(err.is(ErrorKind::Query));
        assert!(err.to_string().contains("Corrupted"));

        // A page that ends before the bad entries still succeeds.
        let (more, page) = scan_page(IndexCursor::new(index.prefix_range("q"), &records), 0, 1).unwrap();
        assert!(more);
        assert_eq!(page, vec![Record::new(RecordId(1), "q1")]);
    }
}
