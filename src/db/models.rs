//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

// ============================================================================
// Posts & Tags
// ============================================================================

/// Blog post model
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub read_time: Option<String>,
    pub view_count: i32,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tag model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
}

/// A post together with its resolved tag list
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostWithTags {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<Tag>,
}

/// New blog post for creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub read_time: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i32>,
}

/// Blog post update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub published: Option<bool>,
    pub published_at: Option<DateTime<Utc>>,
    pub read_time: Option<String>,
    /// When present the post's tag set is replaced by exactly these ids.
    pub tag_ids: Option<Vec<i32>>,
}

impl UpdatePost {
    /// Merge the changes into `post`, returning the tag ids to install (if any).
    ///
    /// `published_at` is stamped with `now` on every draft -> published
    /// transition and cleared when a post goes back to draft, so an unpublished
    /// post never carries a date. An explicit `published_at` always wins.
    pub fn apply(self, post: &mut Post, now: DateTime<Utc>) -> Option<Vec<i32>> {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(slug) = self.slug {
            post.slug = slug;
        }
        if let Some(description) = self.description {
            post.description = Some(description);
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(cover_image) = self.cover_image {
            post.cover_image = Some(cover_image);
        }
        if let Some(read_time) = self.read_time {
            post.read_time = Some(read_time);
        }

        if let Some(published) = self.published {
            if published && !post.published {
                post.published_at = Some(now);
            } else if !published {
                post.published_at = None;
            }
            post.published = published;
        }
        if let Some(published_at) = self.published_at {
            post.published_at = Some(published_at);
        }

        post.updated_at = now;
        self.tag_ids.map(dedup_ids)
    }
}

/// Drop repeated ids while keeping first-seen order.
pub fn dedup_ids(ids: Vec<i32>) -> Vec<i32> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTag {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub color: Option<String>,
}

impl UpdateTag {
    pub fn apply(self, tag: &mut Tag) {
        if let Some(name) = self.name {
            tag.name = name;
        }
        if let Some(slug) = self.slug {
            tag.slug = slug;
        }
        if let Some(color) = self.color {
            tag.color = Some(color);
        }
    }
}

// ============================================================================
// Portfolio
// ============================================================================

/// Project model. `status` is one of `in_progress`, `completed`,
/// `maintaining`; `tech_stack` is stored as a JSON-encoded string array.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub github: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    #[serde(serialize_with = "serialize_tech_stack")]
    pub tech_stack: Option<String>,
    pub featured: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Decode a stored tech stack; anything unparsable reads as empty.
pub fn parse_tech_stack(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

pub fn encode_tech_stack(stack: &[String]) -> String {
    serde_json::to_string(stack).unwrap_or_else(|_| "[]".to_string())
}

fn serialize_tech_stack<S: Serializer>(raw: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(parse_tech_stack(raw.as_deref()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub github: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub github: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub sort_order: Option<i32>,
}

impl UpdateProject {
    pub fn apply(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title;
        }
        if let Some(description) = self.description {
            project.description = Some(description);
        }
        if let Some(link) = self.link {
            project.link = Some(link);
        }
        if let Some(github) = self.github {
            project.github = Some(github);
        }
        if let Some(image) = self.image {
            project.image = Some(image);
        }
        if let Some(status) = self.status {
            project.status = Some(status);
        }
        if let Some(stack) = self.tech_stack {
            project.tech_stack = Some(encode_tech_stack(&stack));
        }
        if let Some(featured) = self.featured {
            project.featured = featured;
        }
        if let Some(sort_order) = self.sort_order {
            project.sort_order = sort_order;
        }
    }
}

/// Skill model
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: i32,
    pub category: String,
    pub name: String,
    pub icon: Option<String>,
    pub level: i32,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSkill {
    pub category: String,
    pub name: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub level: i32,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSkill {
    pub category: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub level: Option<i32>,
    pub sort_order: Option<i32>,
}

impl UpdateSkill {
    pub fn apply(self, skill: &mut Skill) {
        if let Some(category) = self.category {
            skill.category = category;
        }
        if let Some(name) = self.name {
            skill.name = name;
        }
        if let Some(icon) = self.icon {
            skill.icon = Some(icon);
        }
        if let Some(level) = self.level {
            skill.level = level;
        }
        if let Some(sort_order) = self.sort_order {
            skill.sort_order = sort_order;
        }
    }
}

/// Timeline event model
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: i32,
    pub year: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimelineEvent {
    pub year: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimelineEvent {
    pub year: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}

impl UpdateTimelineEvent {
    pub fn apply(self, event: &mut TimelineEvent) {
        if let Some(year) = self.year {
            event.year = year;
        }
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = Some(description);
        }
        if let Some(icon) = self.icon {
            event.icon = Some(icon);
        }
        if let Some(sort_order) = self.sort_order {
            event.sort_order = sort_order;
        }
    }
}

// ============================================================================
// Site config, guestbook, newsletter
// ============================================================================

/// Site configuration entry (key/value)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// Guestbook entry model
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuestbookEntry {
    pub id: i32,
    pub user_name: String,
    pub message: String,
    pub created_by_email: Option<String>,
    pub user_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Newsletter subscriber
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

// ============================================================================
// Engagement & dashboard
// ============================================================================

/// Stored view/like counters of a post
#[derive(Debug, Clone, Copy, Default, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub view_count: i32,
    pub like_count: i32,
}

/// Published post slug for sitemap generation
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSlug {
    pub slug: String,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate numbers shown on the admin dashboard
#[derive(Debug, Clone, Default, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub posts: i64,
    pub projects: i64,
    pub tags: i64,
    pub skills: i64,
    pub guestbook: i64,
    pub subscribers: i64,
    pub total_views: i64,
    pub total_likes: i64,
}

/// Short post row for dashboard rankings
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub published: bool,
    pub view_count: i32,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> Post {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Post {
            id: 1,
            slug: "hello-world".to_string(),
            title: "Hello".to_string(),
            description: None,
            content: "# Hello".to_string(),
            cover_image: None,
            published: false,
            published_at: None,
            read_time: None,
            view_count: 0,
            like_count: 0,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_first_publish_stamps_published_at() {
        let mut post = draft();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        UpdatePost {
            published: Some(true),
            ..Default::default()
        }
        .apply(&mut post, now);

        assert!(post.published);
        assert_eq!(post.published_at, Some(now));
        assert_eq!(post.updated_at, now);
    }

    #[test]
    fn test_republish_keeps_original_published_at() {
        let mut post = draft();
        let first = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        UpdatePost {
            published: Some(true),
            ..Default::default()
        }
        .apply(&mut post, first);
        UpdatePost {
            published: Some(true),
            title: Some("Edited".to_string()),
            ..Default::default()
        }
        .apply(&mut post, later);

        assert_eq!(post.published_at, Some(first));
        assert_eq!(post.title, "Edited");
    }

    #[test]
    fn test_unpublish_then_republish_restamps() {
        let mut post = draft();
        let first = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let hidden = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let again = Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap();

        UpdatePost {
            published: Some(true),
            ..Default::default()
        }
        .apply(&mut post, first);

        UpdatePost {
            published: Some(false),
            ..Default::default()
        }
        .apply(&mut post, hidden);
        assert!(!post.published);
        assert!(post.published_at.is_none());

        UpdatePost {
            published: Some(true),
            ..Default::default()
        }
        .apply(&mut post, again);
        assert_eq!(post.published_at, Some(again));
    }

    #[test]
    fn test_draft_update_leaves_published_at_unset() {
        let mut post = draft();
        let now = Utc::now();
        UpdatePost {
            published: Some(false),
            content: Some("body".to_string()),
            ..Default::default()
        }
        .apply(&mut post, now);

        assert!(!post.published);
        assert!(post.published_at.is_none());
    }

    #[test]
    fn test_explicit_published_at_overrides() {
        let mut post = draft();
        let explicit = Utc.with_ymd_and_hms(2020, 5, 5, 0, 0, 0).unwrap();
        UpdatePost {
            published: Some(true),
            published_at: Some(explicit),
            ..Default::default()
        }
        .apply(&mut post, Utc::now());

        assert_eq!(post.published_at, Some(explicit));
    }

    #[test]
    fn test_tag_ids_only_returned_when_present() {
        let mut post = draft();
        assert_eq!(UpdatePost::default().apply(&mut post, Utc::now()), None);

        let ids = UpdatePost {
            tag_ids: Some(vec![2, 5, 2]),
            ..Default::default()
        }
        .apply(&mut post, Utc::now());
        assert_eq!(ids, Some(vec![2, 5]));

        let ids = UpdatePost {
            tag_ids: Some(vec![]),
            ..Default::default()
        }
        .apply(&mut post, Utc::now());
        assert_eq!(ids, Some(vec![]));
    }

    #[test]
    fn test_tech_stack_round_trip_and_garbage() {
        let encoded = encode_tech_stack(&["Rust".to_string(), "Axum".to_string()]);
        assert_eq!(parse_tech_stack(Some(&encoded)), vec!["Rust", "Axum"]);
        assert!(parse_tech_stack(Some("not json")).is_empty());
        assert!(parse_tech_stack(None).is_empty());
    }

    #[test]
    fn test_project_serializes_tech_stack_as_array() {
        let project = Project {
            id: 1,
            title: "Blog".to_string(),
            description: None,
            link: None,
            github: None,
            image: None,
            status: Some("completed".to_string()),
            tech_stack: Some(r#"["Rust"]"#.to_string()),
            featured: true,
            sort_order: 1,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["techStack"], serde_json::json!(["Rust"]));
        assert_eq!(json["sortOrder"], 1);
    }

    #[test]
    fn test_post_with_tags_flattens_post_fields() {
        let value = serde_json::to_value(PostWithTags {
            post: draft(),
            tags: vec![Tag {
                id: 2,
                name: "Rust".to_string(),
                slug: "rust".to_string(),
                color: None,
            }],
        })
        .unwrap();
        assert_eq!(value["slug"], "hello-world");
        assert_eq!(value["viewCount"], 0);
        assert_eq!(value["tags"][0]["slug"], "rust");
    }
}
