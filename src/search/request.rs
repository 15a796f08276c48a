use serde::{Deserialize, Serialize};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};

/// Raw query parameters as they arrive from a caller, before coercion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub search_query: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
}

/// A validated search: prefix, results to skip, page size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub prefix: String,
    pub offset: u64,
    pub limit: usize,
}

impl SearchParams {
    /// Collect `searchQuery`, `offset` and `limit` from key/value pairs;
    /// unknown keys are ignored and the last occurrence wins.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = SearchParams::default();
        for (key, value) in pairs {
            match key {
                "searchQuery" => params.search_query = Some(value.to_string()),
                "offset" => params.offset = Some(value.to_string()),
                "limit" => params.limit = Some(value.to_string()),
                _ => {}
            }
        }
        params
    }

    /// Apply the boundary rules: a missing query is empty, a missing offset is
    /// zero, and a limit that is missing, unparsable, zero or above
    /// `max_page_size` becomes `default_page_size`. A malformed offset is
    /// rejected.
    pub fn resolve(&self, config: &Config) -> Result<SearchRequest> {
        let offset = match self.offset.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::new(
                    ErrorKind::InvalidArgument,
                    format!("offset must be a non-negative integer, got '{}'", raw),
                )
            })?,
        };

        let limit = self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|limit| (1..=config.max_page_size).contains(limit))
            .unwrap_or(config.default_page_size);

        Ok(SearchRequest {
            prefix: self.search_query.clone().unwrap_or_default(),
            offset,
            limit,
        })
    }
}

impl SearchRequest {
    pub fn new(prefix: impl Into<String>, offset: u64, limit: usize) -> Self {
        SearchRequest {
            prefix: prefix.into(),
            offset,
            limit,
        }
    }
}
