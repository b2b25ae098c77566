// ABOUTME: Cursor pagination engine over keyset-ordered repositories
// ABOUTME: Re-exports the page types from chatrail-core and adds the PageSource-driven paginate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use chatrail_core::pagination::*;

use crate::errors::AppResult;
use tracing::debug;

/// Position of a cursor row within its collection
///
/// Rows are ordered by `(sort_key desc, id desc)`; `sort_key` is a fixed-width
/// timestamp so text order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAnchor {
    /// Row id the cursor names
    pub id: String,
    /// Sort key of that row
    pub sort_key: String,
}

/// Keyset-ordered collection the pagination engine can walk
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Row type returned in pages
    type Row: Send;

    /// Resolve a cursor to its anchor; `None` when the id is unknown or belongs
    /// to another collection
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails
    async fn find_anchor(&self, cursor: &str) -> AppResult<Option<PageAnchor>>;

    /// Up to `limit` rows strictly after `anchor` (from the start when `None`)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    async fn fetch_after(
        &self,
        anchor: Option<&PageAnchor>,
        limit: usize,
    ) -> AppResult<Vec<Self::Row>>;

    /// Number of rows ordered at or before `anchor`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    async fn count_at_or_before(&self, anchor: &PageAnchor) -> AppResult<u64>;

    /// Size of the whole collection
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    async fn count_total(&self) -> AppResult<u64>;

    /// Id of a row, used as the next cursor
    fn row_id(row: &Self::Row) -> &str;
}

/// Compute one cursor page from `source`
///
/// The page size is the requested limit normalized into `[1, 100]` and capped
/// at `flag_limit`. A cursor that does not resolve restarts from the first page.
///
/// # Errors
///
/// Returns an error if any repository query fails
pub async fn paginate<S: PageSource>(
    source: &S,
    params: &PaginationParams,
    flag_limit: usize,
) -> AppResult<CursorPage<S::Row>> {
    let page_size = resolve_page_size(params.limit.as_ref(), flag_limit);

    let anchor = match params.cursor() {
        Some(cursor) => {
            let anchor = source.find_anchor(cursor).await?;
            if anchor.is_none() {
                debug!(cursor, "Cursor does not resolve in this collection, restarting");
            }
            anchor
        }
        None => None,
    };

    let mut rows = source.fetch_after(anchor.as_ref(), page_size + 1).await?;
    let has_more = rows.len() > page_size;
    rows.truncate(page_size);

    let next = if has_more {
        rows.last().map(|row| Cursor::new(S::row_id(row)))
    } else {
        None
    };

    let page = match &anchor {
        Some(anchor) => page_number(source.count_at_or_before(anchor).await?, page_size),
        None => 1,
    };
    let total = source.count_total().await?;

    Ok(CursorPage::new(
        rows,
        page,
        page_size,
        total,
        has_more,
        PageCursor {
            next,
            prev: anchor.map(|anchor| Cursor::new(anchor.id)),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ids "00".."nn" ordered descending, sort key equal to the id
    struct VecSource(Vec<String>);

    impl VecSource {
        fn with_rows(count: usize) -> Self {
            let mut ids: Vec<String> = (0..count).map(|i| format!("{i:02}")).collect();
            ids.reverse();
            Self(ids)
        }
    }

    #[async_trait::async_trait]
    impl PageSource for VecSource {
        type Row = String;

        async fn find_anchor(&self, cursor: &str) -> AppResult<Option<PageAnchor>> {
            Ok(self.0.iter().find(|id| *id == cursor).map(|id| PageAnchor {
                id: id.clone(),
                sort_key: id.clone(),
            }))
        }

        async fn fetch_after(
            &self,
            anchor: Option<&PageAnchor>,
            limit: usize,
        ) -> AppResult<Vec<String>> {
            Ok(self
                .0
                .iter()
                .filter(|id| anchor.is_none_or(|anchor| id.as_str() < anchor.id.as_str()))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn count_at_or_before(&self, anchor: &PageAnchor) -> AppResult<u64> {
            Ok(self.0.iter().filter(|id| **id >= anchor.id).count() as u64)
        }

        async fn count_total(&self) -> AppResult<u64> {
            Ok(self.0.len() as u64)
        }

        fn row_id(row: &String) -> &str {
            row
        }
    }

    #[tokio::test]
    async fn test_walk_visits_every_row_once() {
        let source = VecSource::with_rows(23);
        let mut params = PaginationParams::forward(None, 10);
        let mut seen = Vec::new();
        let mut pages = Vec::new();

        loop {
            let page = paginate(&source, &params, 10).await.unwrap();
            assert_eq!(page.count, page.data.len());
            assert_eq!(page.total, 23);
            pages.push(page.page);
            seen.extend(page.data.clone());
            if !page.has_more {
                assert!(page.cursor.next.is_none());
                break;
            }
            params = PaginationParams::forward(page.cursor.next, 10);
        }

        assert_eq!(seen, source.0);
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_extra_page() {
        let source = VecSource::with_rows(20);
        let first = paginate(&source, &PaginationParams::first(), 10).await.unwrap();
        assert!(first.has_more);
        let second = paginate(&source, &PaginationParams::forward(first.cursor.next, 10), 10)
            .await
            .unwrap();
        assert_eq!(second.count, 10);
        assert!(!second.has_more);
        assert_eq!(second.cursor.prev.as_ref().map(Cursor::as_str), Some("10"));
    }

    #[tokio::test]
    async fn test_unknown_cursor_restarts() {
        let source = VecSource::with_rows(5);
        let params = PaginationParams {
            cursor: Some("missing".to_owned()),
            limit: None,
        };
        let page = paginate(&source, &params, 20).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.count, 5);
        assert!(page.cursor.prev.is_none());
    }
}
