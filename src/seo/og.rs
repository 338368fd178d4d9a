//! Open Graph preview image, rendered as SVG.

use serde::Deserialize;

use super::escape_xml;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 630;

const MAX_TITLE_CHARS: usize = 80;
const MAX_DESCRIPTION_CHARS: usize = 140;
const MAX_DATE_CHARS: usize = 32;
const DEFAULT_DESCRIPTION: &str = "A personal blog";

#[derive(Debug, Default, Deserialize)]
pub struct OgParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn render(params: &OgParams, site_name: &str) -> String {
    let title = truncate(
        non_empty(params.title.as_deref()).unwrap_or(site_name),
        MAX_TITLE_CHARS,
    );
    let description = truncate(
        non_empty(params.description.as_deref()).unwrap_or(DEFAULT_DESCRIPTION),
        MAX_DESCRIPTION_CHARS,
    );
    let initial = site_name.chars().next().unwrap_or('B');

    let date_badge = non_empty(params.date.as_deref())
        .map(|date| {
            format!(
                r##"<rect x="940" y="56" width="200" height="48" rx="24" fill="#ffffff" fill-opacity="0.1"/>
  <text x="1040" y="87" font-size="16" fill="#a1a1aa" text-anchor="middle">{}</text>"##,
                escape_xml(&truncate(date, MAX_DATE_CHARS))
            )
        })
        .unwrap_or_default();

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="Inter, -apple-system, Segoe UI, sans-serif">
  <defs>
    <linearGradient id="logo" x1="0" y1="0" x2="1" y2="1">
      <stop offset="0%" stop-color="#a855f7"/>
      <stop offset="100%" stop-color="#ec4899"/>
    </linearGradient>
    <radialGradient id="glow-a" cx="25%" cy="25%" r="50%">
      <stop offset="0%" stop-color="#8b5cf6" stop-opacity="0.15"/>
      <stop offset="100%" stop-color="#8b5cf6" stop-opacity="0"/>
    </radialGradient>
    <radialGradient id="glow-b" cx="75%" cy="75%" r="50%">
      <stop offset="0%" stop-color="#ec4899" stop-opacity="0.15"/>
      <stop offset="100%" stop-color="#ec4899" stop-opacity="0"/>
    </radialGradient>
  </defs>
  <rect width="{WIDTH}" height="{HEIGHT}" fill="#0a0a0a"/>
  <rect width="{WIDTH}" height="{HEIGHT}" fill="url(#glow-a)"/>
  <rect width="{WIDTH}" height="{HEIGHT}" fill="url(#glow-b)"/>
  <rect x="60" y="60" width="56" height="56" rx="16" fill="url(#logo)"/>
  <text x="88" y="98" font-size="28" font-weight="bold" fill="#ffffff" text-anchor="middle">{initial}</text>
  <text x="132" y="98" font-size="28" font-weight="600" fill="#ffffff">{site}</text>
  {date_badge}
  <text x="60" y="470" font-size="64" font-weight="bold" fill="#ffffff">{title}</text>
  <text x="60" y="540" font-size="24" fill="#71717a">{description}</text>
</svg>
"##,
        initial = escape_xml(&initial.to_string()),
        site = escape_xml(site_name),
        title = escape_xml(&title),
        description = escape_xml(&description),
    )
}
