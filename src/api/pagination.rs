//! Page-number pagination shared by list endpoints.
//!
//! Query: `?page=N&limit=M`. Responses carry `count`, absolute `next` /
//! `previous` links and the `results` of the requested page.

use axum::http::Uri;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::PaginationConfig;
use crate::{Error, Result};

/// Raw pagination query parameters.
///
/// Kept as strings so malformed values can be reported as an invalid
/// page instead of a generic query rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
    limit: i64,
}

impl Pagination {
    pub fn from_query(query: &PageQuery, config: &PaginationConfig) -> Result<Self> {
        let page = match query.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or(Error::InvalidPage)?,
        };

        // Bad or zero limits fall back to the default page size
        let limit = query
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(config.page_size)
            .min(config.max_page_size);

        let limit = i64::from(limit.max(1));

        // Offsets past i64 can never be in range
        if page.checked_mul(limit).is_none() {
            return Err(Error::InvalidPage);
        }

        Ok(Self { page, limit })
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Reject pages past the end. The first page always exists.
    pub fn ensure_in_range(&self, count: i64) -> Result<()> {
        if self.page > 1 && self.offset() >= count {
            return Err(Error::InvalidPage);
        }
        Ok(())
    }

    /// Wrap `results` with links relative to the request URI.
    pub fn page<T>(&self, results: Vec<T>, count: i64, uri: &Uri, public_url: &str) -> Page<T> {
        let next = (self.page * self.limit < count)
            .then(|| page_link(uri, public_url, Some(self.page + 1)))
            .flatten();
        let previous = match self.page {
            1 => None,
            2 => page_link(uri, public_url, None),
            p => page_link(uri, public_url, Some(p - 1)),
        };

        Page {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Absolute URL of the request with its `page` parameter replaced.
///
/// `None` for `page` drops the parameter (the first page).
fn page_link(uri: &Uri, public_url: &str, page: Option<i64>) -> Option<String> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let mut url = Url::parse(&format!("{}{}", public_url.trim_end_matches('/'), path_and_query)).ok()?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() && page.is_none() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        if let Some(page) = page {
            pairs.append_pair("page", &page.to_string());
        }
    }

    Some(url.to_string())
}
