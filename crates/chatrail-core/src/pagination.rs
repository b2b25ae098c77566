// ABOUTME: Cursor-based pagination types shared by chat listing and message history
// ABOUTME: Provides the page envelope, limit normalization and best-effort page numbering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::constants::pagination::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};

/// Pagination cursor: the id of the last row the client has seen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Create a cursor pointing at a row id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw row id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the cursor and return the row id
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Navigation cursors attached to a page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageCursor {
    /// Cursor for the following page, present only when `has_more`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Cursor>,
    /// Cursor this page was fetched after, absent on the first page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Cursor>,
}

/// Paginated response containing rows and pagination metadata
///
/// `count` always equals `data.len()`. `page` is derived from a separate count
/// query and may drift when rows are inserted or deleted between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    /// Number of rows in `data`
    pub count: usize,
    /// 1-based display page number (best-effort)
    pub page: u64,
    /// Effective page size used for this request
    pub page_size: usize,
    /// Live size of the whole collection
    pub total: u64,
    /// Whether rows exist beyond this page
    pub has_more: bool,
    /// Navigation cursors
    pub cursor: PageCursor,
    /// The rows in this page
    pub data: Vec<T>,
}

impl<T> CursorPage<T> {
    /// Create a page, deriving `count` from `data`
    #[must_use]
    pub fn new(
        data: Vec<T>,
        page: u64,
        page_size: usize,
        total: u64,
        has_more: bool,
        cursor: PageCursor,
    ) -> Self {
        Self {
            count: data.len(),
            page,
            page_size,
            total,
            has_more,
            cursor,
            data,
        }
    }

    /// Project every row, keeping the pagination metadata
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            has_more: self.has_more,
            cursor: self.cursor,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Requested page size as sent by the client
///
/// Query strings always deliver text, JSON bodies may deliver numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PageLimit {
    /// Numeric limit
    Number(f64),
    /// Textual limit, parsed as a leading integer
    Text(String),
}

impl PageLimit {
    /// Integer value of the limit, `None` when it is not a finite number
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Self::Number(_) => None,
            Self::Text(text) => parse_leading_integer(text),
        }
    }
}

/// Cursor pagination request parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Row id to continue after
    #[serde(default)]
    pub cursor: Option<String>,
    /// Requested page size
    #[serde(default)]
    pub limit: Option<PageLimit>,
}

impl PaginationParams {
    /// Parameters for the first page with the default size
    #[must_use]
    pub const fn first() -> Self {
        Self {
            cursor: None,
            limit: None,
        }
    }

    /// Parameters continuing after `cursor` with an explicit page size
    #[must_use]
    pub fn forward(cursor: Option<Cursor>, limit: usize) -> Self {
        Self {
            cursor: cursor.map(Cursor::into_inner),
            limit: Some(PageLimit::Number(limit as f64)),
        }
    }

    /// Cursor with blank values treated as absent
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor
            .as_deref()
            .map(str::trim)
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Normalize a requested limit into `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`
///
/// Absent or non-numeric limits use `default_limit`.
#[must_use]
pub fn normalize_limit(limit: Option<&PageLimit>, default_limit: usize) -> usize {
    let requested = limit
        .and_then(PageLimit::as_integer)
        .unwrap_or(default_limit as i64);
    requested.clamp(MIN_PAGE_SIZE as i64, MAX_PAGE_SIZE as i64) as usize
}

/// Effective page size: the normalized request capped by the flag-configured limit
#[must_use]
pub fn resolve_page_size(limit: Option<&PageLimit>, flag_limit: usize) -> usize {
    let flag_limit = flag_limit.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    normalize_limit(limit, flag_limit).min(flag_limit)
}

/// Display page number for a page that starts after `rows_at_or_before` rows
#[must_use]
pub const fn page_number(rows_at_or_before: u64, page_size: usize) -> u64 {
    if page_size == 0 {
        return 1;
    }
    rows_at_or_before / page_size as u64 + 1
}

/// Parse the leading integer of `text` (`"15"`, `" 15abc"`, `"-3"`)
fn parse_leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long inputs; the result is clamped anyway
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}
