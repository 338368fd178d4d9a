use chrono::{DateTime, SecondsFormat, Utc};

use super::escape_xml;
use crate::db::models::PostSlug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

const STATIC_PAGES: &[(&str, ChangeFrequency, f32)] = &[
    ("", ChangeFrequency::Daily, 1.0),
    ("/blog", ChangeFrequency::Daily, 0.9),
    ("/guestbook", ChangeFrequency::Weekly, 0.7),
    ("/projects", ChangeFrequency::Weekly, 0.7),
    ("/about", ChangeFrequency::Monthly, 0.5),
];

/// Static pages first, then one entry per published post.
pub fn entries(base_url: &str, posts: &[PostSlug], now: DateTime<Utc>) -> Vec<SitemapEntry> {
    let base_url = base_url.trim_end_matches('/');

    let pages = STATIC_PAGES
        .iter()
        .map(|&(path, change_frequency, priority)| SitemapEntry {
            url: format!("{base_url}{path}"),
            last_modified: now,
            change_frequency,
            priority,
        });

    let posts = posts.iter().map(|post| SitemapEntry {
        url: format!("{base_url}/blog/{}", post.slug),
        last_modified: post.updated_at,
        change_frequency: ChangeFrequency::Weekly,
        priority: 0.8,
    });

    pages.chain(posts).collect()
}

pub fn render(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&format!(
            "  <url>\n\
             \x20   <loc>{}</loc>\n\
             \x20   <lastmod>{}</lastmod>\n\
             \x20   <changefreq>{}</changefreq>\n\
             \x20   <priority>{:.1}</priority>\n\
             \x20 </url>\n",
            escape_xml(&entry.url),
            entry.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.change_frequency.as_str(),
            entry.priority,
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_static_pages_then_posts() {
        let updated = Utc.with_ymd_and_hms(2024, 4, 2, 8, 30, 0).unwrap();
        let posts = vec![PostSlug {
            slug: "hello-world".into(),
            updated_at: updated,
        }];
        let entries = entries("https://yourblog.com/", &posts, now());

        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].url, "https://yourblog.com");
        assert_eq!(entries[0].priority, 1.0);
        assert_eq!(entries[1].url, "https://yourblog.com/blog");
        assert_eq!(entries[4].change_frequency, ChangeFrequency::Monthly);

        let post = &entries[5];
        assert_eq!(post.url, "https://yourblog.com/blog/hello-world");
        assert_eq!(post.last_modified, updated);
        assert_eq!(post.change_frequency, ChangeFrequency::Weekly);
        assert_eq!(post.priority, 0.8);
    }

    #[test]
    fn test_render_xml() {
        let xml = render(&entries("https://yourblog.com", &[], now()));
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://yourblog.com/about</loc>"));
        assert!(xml.contains("<lastmod>2024-05-01T12:00:00Z</lastmod>"));
        assert!(xml.contains("<priority>0.9</priority>"));
        assert_eq!(xml.matches("<url>").count(), 5);
    }
}
