//! Read side of the site content.
//!
//! Every function here logs a persistence failure and answers with an empty
//! or default value, so a page renders even when the database misbehaves.

use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::db::{
    self,
    models::{
        DashboardCounts, GuestbookEntry, PostSlug, PostSummary, PostWithTags, Project, SiteConfig,
        Skill, Tag, TimelineEvent,
    },
};

/// Entries shown on the public guestbook page.
pub const PUBLIC_GUESTBOOK_LIMIT: i64 = 100;
pub const DEFAULT_LATEST_POSTS: i64 = 3;
pub const DEFAULT_FEATURED_PROJECTS: i64 = 4;
const DASHBOARD_RANKING: i64 = 5;

fn or_default<T: Default, E: Display>(result: Result<T, E>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to get {}", what);
        T::default()
    })
}

// ============================================================================
// Posts
// ============================================================================

pub async fn published_posts(pool: &PgPool) -> Vec<PostWithTags> {
    or_default(db::posts::list_published(pool, None).await, "published posts")
}

pub async fn latest_posts(pool: &PgPool, limit: i64) -> Vec<PostWithTags> {
    or_default(
        db::posts::list_published(pool, Some(limit.max(0))).await,
        "latest posts",
    )
}

/// A published post; drafts and unknown slugs are `None`.
pub async fn post_by_slug(pool: &PgPool, slug: &str) -> Option<PostWithTags> {
    or_default(db::posts::find_published_by_slug(pool, slug).await, "post")
}

pub async fn post_slugs(pool: &PgPool) -> Vec<PostSlug> {
    or_default(db::posts::published_slugs(pool).await, "post slugs")
}

/// Drafts included, newest first.
pub async fn all_posts(pool: &PgPool) -> Vec<PostWithTags> {
    or_default(db::posts::list_all(pool).await, "posts")
}

pub async fn post_by_id(pool: &PgPool, id: i32) -> Option<PostWithTags> {
    or_default(db::posts::find_by_id(pool, id).await, "post")
}

pub async fn tags(pool: &PgPool) -> Vec<Tag> {
    or_default(db::tags::list(pool).await, "tags")
}

// ============================================================================
// Portfolio
// ============================================================================

pub async fn projects(pool: &PgPool) -> Vec<Project> {
    or_default(db::portfolio::list_projects(pool).await, "projects")
}

pub async fn featured_projects(pool: &PgPool, limit: i64) -> Vec<Project> {
    or_default(
        db::portfolio::featured_projects(pool, limit.max(0)).await,
        "featured projects",
    )
}

pub async fn skills(pool: &PgPool) -> Vec<Skill> {
    or_default(db::portfolio::list_skills(pool).await, "skills")
}

/// Skills keyed by category, each list in display order.
pub fn group_by_category(skills: Vec<Skill>) -> BTreeMap<String, Vec<Skill>> {
    let mut groups: BTreeMap<String, Vec<Skill>> = BTreeMap::new();
    for skill in skills {
        groups.entry(skill.category.clone()).or_default().push(skill);
    }
    for list in groups.values_mut() {
        list.sort_by_key(|s| (s.sort_order, s.id));
    }
    groups
}

pub async fn timeline(pool: &PgPool) -> Vec<TimelineEvent> {
    or_default(db::portfolio::list_timeline(pool).await, "timeline")
}

// ============================================================================
// Site config & guestbook
// ============================================================================

pub async fn all_config(pool: &PgPool) -> Vec<SiteConfig> {
    or_default(db::config::all(pool).await, "site config")
}

pub async fn config_value(pool: &PgPool, key: &str) -> Option<String> {
    or_default(db::config::get(pool, key).await, "config value").map(|row| row.value)
}

/// Requested keys mapped to their values; missing keys are absent.
pub async fn config_values(pool: &PgPool, keys: &[String]) -> BTreeMap<String, String> {
    or_default(db::config::values(pool, keys).await, "config values")
        .into_iter()
        .map(|row| (row.key, row.value))
        .collect()
}

pub async fn guestbook_entries(pool: &PgPool) -> Vec<GuestbookEntry> {
    or_default(
        db::guestbook::list(pool, Some(PUBLIC_GUESTBOOK_LIMIT)).await,
        "guestbook entries",
    )
}

pub async fn all_guestbook_entries(pool: &PgPool) -> Vec<GuestbookEntry> {
    or_default(db::guestbook::list(pool, None).await, "guestbook entries")
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub top_posts: Vec<PostSummary>,
    pub recent_posts: Vec<PostSummary>,
}

pub async fn dashboard(pool: &PgPool) -> DashboardStats {
    let (counts, top_posts, recent_posts) = tokio::join!(
        db::dashboard::counts(pool),
        db::dashboard::top_viewed(pool, DASHBOARD_RANKING),
        db::dashboard::recent(pool, DASHBOARD_RANKING),
    );
    DashboardStats {
        counts: or_default(counts, "dashboard counts"),
        top_posts: or_default(top_posts, "top posts"),
        recent_posts: or_default(recent_posts, "recent posts"),
    }
}
