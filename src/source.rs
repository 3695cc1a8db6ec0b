//! Tabular source adapter.
//!
//! A [`SourceProvider`] turns a [`SourceLocation`] into CSV bytes; the
//! [`TabularSource`] parses them into a [`RawTable`], applies the header row
//! and optionally caches parsed tables for a fixed time-to-live. Every
//! failure on the way is reported as [`LookupError::SourceUnavailable`].

use std::{
    collections::HashMap,
    fs, io,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use anyhow::Context;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};
use reqwest::{StatusCode, blocking::Client, header::CONTENT_TYPE};

use crate::{
    config::SourceLocation,
    data::RawTable,
    error::{LookupError, Result},
    io_utils,
};

pub trait SourceProvider {
    fn fetch_bytes(&self, location: &SourceLocation) -> Result<Vec<u8>>;
}

impl<F> SourceProvider for F
where
    F: Fn(&SourceLocation) -> Result<Vec<u8>>,
{
    fn fetch_bytes(&self, location: &SourceLocation) -> Result<Vec<u8>> {
        self(location)
    }
}

/// Fetches sheets over HTTP and files from the local filesystem.
pub struct DefaultProvider {
    client: Client,
    url_template: String,
}

impl DefaultProvider {
    pub fn new(url_template: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("boar-lookup/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Building HTTP client")?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    pub fn sheet_url(&self, sheet_id: &str, gid: &str) -> String {
        self.url_template
            .replace("{sheet_id}", sheet_id)
            .replace("{gid}", gid)
    }

    fn fetch_sheet(&self, location: &SourceLocation, url: &str) -> Result<Vec<u8>> {
        debug!("GET {url}");
        let unavailable = |reason: String| LookupError::source_unavailable(location.to_string(), reason);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| unavailable(format!("request failed: {err}")))?;
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(unavailable(format!("access denied (HTTP {})", status.as_u16())));
            }
            StatusCode::NOT_FOUND => return Err(unavailable("not found (HTTP 404)".to_string())),
            _ if !status.is_success() => {
                return Err(unavailable(format!("HTTP {}", status.as_u16())));
            }
            _ => {}
        }
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"));
        if is_html {
            // Private sheets redirect to a sign-in page instead of failing.
            return Err(unavailable(
                "access denied (received an HTML page instead of CSV)".to_string(),
            ));
        }
        response
            .bytes()
            .map(|body| body.to_vec())
            .map_err(|err| unavailable(format!("reading response body: {err}")))
    }
}

impl SourceProvider for DefaultProvider {
    fn fetch_bytes(&self, location: &SourceLocation) -> Result<Vec<u8>> {
        match location {
            SourceLocation::Sheet { sheet_id, gid } => {
                let url = self.sheet_url(sheet_id, gid);
                self.fetch_sheet(location, &url)
            }
            SourceLocation::File { path } => fs::read(path).map_err(|err| {
                let reason = match err.kind() {
                    io::ErrorKind::NotFound => "not found".to_string(),
                    io::ErrorKind::PermissionDenied => "access denied".to_string(),
                    _ => err.to_string(),
                };
                LookupError::source_unavailable(location.to_string(), reason)
            }),
        }
    }
}

struct CachedTable {
    table: RawTable,
    fetched_at: Instant,
}

/// Parsed tables keyed by (source id, subset id), expiring after a TTL.
pub struct TableCache {
    ttl: Duration,
    entries: Mutex<HashMap<(String, String), CachedTable>>,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &(String, String)) -> Option<RawTable> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(cached) if cached.fetched_at.elapsed() < self.ttl => {
                debug!(
                    "Using cached table for {:?} (age: {:?})",
                    key,
                    cached.fetched_at.elapsed()
                );
                Some(cached.table.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: (String, String), table: RawTable) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CachedTable {
                table,
                fetched_at: Instant::now(),
            },
        );
    }
}

pub struct TabularSource<P> {
    provider: P,
    encoding: &'static Encoding,
    cache: Option<TableCache>,
}

impl<P: SourceProvider> TabularSource<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            encoding: UTF_8,
            cache: None,
        }
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Caches parsed tables for `ttl`. A zero TTL disables caching.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = (!ttl.is_zero()).then(|| TableCache::new(ttl));
        self
    }

    /// Fetches the table and selects `header_row` as its header. `None`
    /// treats every row as data.
    pub fn fetch(&self, location: &SourceLocation, header_row: Option<usize>) -> Result<RawTable> {
        Ok(self.fetch_raw(location)?.with_header_row(header_row))
    }

    /// Fetches the table with no header row selected.
    pub fn fetch_raw(&self, location: &SourceLocation) -> Result<RawTable> {
        let key = location.cache_key();
        if let Some(table) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            return Ok(table);
        }
        let bytes = self.provider.fetch_bytes(location).inspect_err(|err| {
            warn!("{err}");
        })?;
        let table = io_utils::parse_csv(&bytes, self.encoding).map_err(|err| {
            warn!("Malformed payload from {location}: {err:#}");
            LookupError::source_unavailable(location.to_string(), format!("malformed payload: {err:#}"))
        })?;
        info!(
            "Fetched {} row(s) x {} column(s) from {}",
            table.all_rows().len(),
            table.width(),
            location
        );
        if let Some(cache) = &self.cache {
            cache.insert(key, table.clone());
        }
        Ok(table)
    }
}
