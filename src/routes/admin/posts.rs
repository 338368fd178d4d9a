use axum::{extract::Path, http::StatusCode, response::Response, Json};

use super::{admin_read, require_text, require_text_if_set};
use crate::{
    cache, content, db,
    db::models::{NewPost, NewTag, PostWithTags, Tag, UpdatePost, UpdateTag},
    error::{ActionResponse, AppError, AppResult},
    routes::pool,
};

const POST_PATHS: &[&str] = &["/admin/posts", "/blog", "/"];
const TAG_PATHS: &[&str] = &["/admin/tags", "/blog"];

// ============================================================================
// Posts
// ============================================================================

/// GET /api/admin/posts
pub async fn list_posts() -> Response {
    admin_read(|pool| async move { content::all_posts(&pool).await }).await
}

/// GET /api/admin/posts/{id}
pub async fn get_post(Path(id): Path<i32>) -> AppResult<Json<PostWithTags>> {
    let pool = pool()?;
    content::post_by_id(&pool, id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

/// POST /api/admin/posts
pub async fn create_post(
    Json(new): Json<NewPost>,
) -> AppResult<(StatusCode, Json<ActionResponse<PostWithTags>>)> {
    require_text(&new.title, "Title")?;
    require_text(&new.slug, "Slug")?;

    let pool = pool()?;
    let post = db::posts::create(&pool, new)
        .await
        .map_err(|e| AppError::persistence("Failed to create post", e))?;

    tracing::info!(post_id = post.post.id, slug = %post.post.slug, "post created");
    cache::revalidate_all(POST_PATHS);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok(post))))
}

/// PATCH /api/admin/posts/{id}
pub async fn update_post(
    Path(id): Path<i32>,
    Json(changes): Json<UpdatePost>,
) -> AppResult<Json<ActionResponse<PostWithTags>>> {
    require_text_if_set(changes.title.as_deref(), "Title")?;
    require_text_if_set(changes.slug.as_deref(), "Slug")?;

    let pool = pool()?;
    let post = db::posts::update(&pool, id, changes)
        .await
        .map_err(|e| AppError::persistence("Failed to update post", e))?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    tracing::info!(post_id = id, published = post.post.published, "post updated");
    cache::revalidate_all(POST_PATHS);
    Ok(Json(ActionResponse::ok(post)))
}

/// DELETE /api/admin/posts/{id}
pub async fn delete_post(Path(id): Path<i32>) -> AppResult<Json<ActionResponse<()>>> {
    let pool = pool()?;
    let deleted = db::posts::delete(&pool, id)
        .await
        .map_err(|e| AppError::persistence("Failed to delete post", e))?;
    if !deleted {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    tracing::info!(post_id = id, "post deleted");
    cache::revalidate_all(POST_PATHS);
    Ok(Json(ActionResponse::done()))
}

// ============================================================================
// Tags
// ============================================================================

/// GET /api/admin/tags
pub async fn list_tags() -> Response {
    admin_read(|pool| async move { content::tags(&pool).await }).await
}

/// POST /api/admin/tags
pub async fn create_tag(
    Json(new): Json<NewTag>,
) -> AppResult<(StatusCode, Json<ActionResponse<Tag>>)> {
    require_text(&new.name, "Name")?;
    require_text(&new.slug, "Slug")?;

    let pool = pool()?;
    let tag = db::tags::create(&pool, new)
        .await
        .map_err(|e| AppError::persistence("Failed to create tag", e))?;

    cache::revalidate_all(TAG_PATHS);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok(tag))))
}

/// PATCH /api/admin/tags/{id}
pub async fn update_tag(
    Path(id): Path<i32>,
    Json(changes): Json<UpdateTag>,
) -> AppResult<Json<ActionResponse<Tag>>> {
    require_text_if_set(changes.name.as_deref(), "Name")?;
    require_text_if_set(changes.slug.as_deref(), "Slug")?;

    let pool = pool()?;
    let tag = db::tags::update(&pool, id, changes)
        .await
        .map_err(|e| AppError::persistence("Failed to update tag", e))?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    cache::revalidate_all(TAG_PATHS);
    Ok(Json(ActionResponse::ok(tag)))
}

/// DELETE /api/admin/tags/{id}
pub async fn delete_tag(Path(id): Path<i32>) -> AppResult<Json<ActionResponse<()>>> {
    let pool = pool()?;
    let deleted = db::tags::delete(&pool, id)
        .await
        .map_err(|e| AppError::persistence("Failed to delete tag", e))?;
    if !deleted {
        return Err(AppError::NotFound("Tag not found".to_string()));
    }

    cache::revalidate_all(TAG_PATHS);
    Ok(Json(ActionResponse::done()))
}
