//! Rendered-response cache for public pages.
//!
//! Public read endpoints store their serialised JSON under the page path
//! that displays it (`/blog`, `/blog/{slug}`, `/about`, ...). Mutations call
//! [`revalidate`] for every page they affect so the next read recomputes.

use axum::body::Bytes;
use moka::sync::Cache;
use once_cell::sync::Lazy;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};
use std::time::Duration;

const MAX_ENTRIES: u64 = 1_000;
const ENTRY_TTL: Duration = Duration::from_secs(300);

static PAGE_CACHE: Lazy<Cache<String, Bytes>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(MAX_ENTRIES)
        .time_to_live(ENTRY_TTL)
        .build()
});

/// Bumped by every [`revalidate`]. A read that started under an older
/// generation may have loaded pre-mutation rows and must not be stored.
static GENERATION: AtomicU64 = AtomicU64::new(0);

/// Serialises the generation check in [`put_if_current`] against the bump in
/// [`revalidate`].
static STORE_LOCK: Mutex<()> = Mutex::new(());

pub fn generation() -> u64 {
    GENERATION.load(Ordering::Acquire)
}

pub fn get(key: &str) -> Option<Bytes> {
    PAGE_CACHE.get(key)
}

pub fn put(key: String, body: Bytes) {
    PAGE_CACHE.insert(key, body);
}

/// Store `body` only if no revalidation happened since `seen` was read from
/// [`generation`]. Returns whether it was stored.
pub fn put_if_current(key: String, body: Bytes, seen: u64) -> bool {
    let _guard = STORE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    if GENERATION.load(Ordering::Acquire) != seen {
        tracing::debug!(key = %key, "page changed while loading, not caching");
        return false;
    }
    PAGE_CACHE.insert(key, body);
    true
}

/// Does cached entry `key` belong to page `path`?
///
/// A page owns its exact key, its query variants (`/?latest=3`) and, except
/// for the root, every nested page (`/blog` owns `/blog/hello`).
fn belongs_to(path: &str, key: &str) -> bool {
    if key == path {
        return true;
    }
    match key.strip_prefix(path) {
        Some(rest) if rest.starts_with('?') => true,
        Some(rest) if path != "/" && rest.starts_with('/') => true,
        _ => false,
    }
}

/// Drop every cached rendering of `path`.
pub fn revalidate(path: &str) {
    {
        let _guard = STORE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        GENERATION.fetch_add(1, Ordering::AcqRel);
    }
    let stale: Vec<String> = PAGE_CACHE
        .iter()
        .filter(|(key, _)| belongs_to(path, key))
        .map(|(key, _)| key.as_ref().clone())
        .collect();

    for key in &stale {
        PAGE_CACHE.invalidate(key);
    }
    tracing::debug!(path = %path, dropped = stale.len(), "revalidated page");
}

pub fn revalidate_all(paths: &[&str]) {
    for path in paths {
        revalidate(path);
    }
}

pub fn entry_count() -> u64 {
    PAGE_CACHE.entry_count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_belongs_to_matches_children_and_variants() {
        assert!(belongs_to("/blog", "/blog"));
        assert!(belongs_to("/blog", "/blog/hello-world"));
        assert!(belongs_to("/", "/"));
        assert!(belongs_to("/", "/?latest=3"));
        assert!(!belongs_to("/", "/blog"));
        assert!(!belongs_to("/blog", "/blogroll"));
        assert!(!belongs_to("/about", "/blog"));
    }

    #[test]
    fn test_revalidate_drops_matching_entries_only() {
        put("/test-projects".to_string(), Bytes::from_static(b"[]"));
        put("/test-projects/1".to_string(), Bytes::from_static(b"{}"));
        put("/test-about".to_string(), Bytes::from_static(b"{}"));

        revalidate("/test-projects");

        assert!(get("/test-projects").is_none());
        assert!(get("/test-projects/1").is_none());
        assert!(get("/test-about").is_some());
    }

    #[test]
    fn test_put_after_revalidation_is_skipped() {
        let seen = generation();
        revalidate("/test-race");

        assert!(!put_if_current(
            "/test-race".to_string(),
            Bytes::from_static(b"[\"old\"]"),
            seen
        ));
        assert!(get("/test-race").is_none());
    }

    #[test]
    fn test_put_with_current_generation_is_stored() {
        // Other tests may revalidate concurrently; retry until a quiet window.
        let stored = (0..100).any(|_| {
            put_if_current(
                "/test-fresh".to_string(),
                Bytes::from_static(b"[]"),
                generation(),
            )
        });
        assert!(stored);
        assert!(get("/test-fresh").is_some());
    }
}
