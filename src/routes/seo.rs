use axum::{
    extract::Query,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    content, db,
    seo::{og, sitemap},
};

/// GET /sitemap.xml
pub async fn sitemap_xml() -> Response {
    let posts = match db::get_pool() {
        Some(pool) => content::post_slugs(&pool).await,
        None => Vec::new(),
    };
    let base_url = &crate::config::get().site_url;
    let xml = sitemap::render(&sitemap::entries(base_url, &posts, Utc::now()));

    ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

/// GET /og?title&description&date
pub async fn og_image(Query(params): Query<og::OgParams>) -> Response {
    let svg = og::render(&params, &crate::config::get().site_name);
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        svg,
    )
        .into_response()
}
