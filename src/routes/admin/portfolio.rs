use axum::{extract::Path, http::StatusCode, response::Response, Json};

use super::{admin_read, require_text, require_text_if_set};
use crate::{
    cache, content, db,
    db::models::{
        NewProject, NewSkill, NewTimelineEvent, Project, Skill, TimelineEvent, UpdateProject,
        UpdateSkill, UpdateTimelineEvent,
    },
    error::{ActionResponse, AppError, AppResult},
    routes::pool,
};

const PROJECT_PATHS: &[&str] = &["/admin/projects", "/projects"];
const SKILL_PATHS: &[&str] = &["/admin/skills", "/about"];
const TIMELINE_PATHS: &[&str] = &["/admin/timeline", "/about"];

fn check_level(level: i32) -> AppResult<()> {
    if !(0..=100).contains(&level) {
        return Err(AppError::BadRequest(
            "Level must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Projects
// ============================================================================

/// GET /api/admin/projects
pub async fn list_projects() -> Response {
    admin_read(|pool| async move { content::projects(&pool).await }).await
}

/// POST /api/admin/projects
pub async fn create_project(
    Json(new): Json<NewProject>,
) -> AppResult<(StatusCode, Json<ActionResponse<Project>>)> {
    require_text(&new.title, "Title")?;

    let pool = pool()?;
    let project = db::portfolio::create_project(&pool, new)
        .await
        .map_err(|e| AppError::persistence("Failed to create project", e))?;

    cache::revalidate_all(PROJECT_PATHS);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok(project))))
}

/// PATCH /api/admin/projects/{id}
pub async fn update_project(
    Path(id): Path<i32>,
    Json(changes): Json<UpdateProject>,
) -> AppResult<Json<ActionResponse<Project>>> {
    require_text_if_set(changes.title.as_deref(), "Title")?;

    let pool = pool()?;
    let project = db::portfolio::update_project(&pool, id, changes)
        .await
        .map_err(|e| AppError::persistence("Failed to update project", e))?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    cache::revalidate_all(PROJECT_PATHS);
    Ok(Json(ActionResponse::ok(project)))
}

/// DELETE /api/admin/projects/{id}
pub async fn delete_project(Path(id): Path<i32>) -> AppResult<Json<ActionResponse<()>>> {
    let pool = pool()?;
    let deleted = db::portfolio::delete_project(&pool, id)
        .await
        .map_err(|e| AppError::persistence("Failed to delete project", e))?;
    if !deleted {
        return Err(AppError::NotFound("Project not found".to_string()));
    }

    cache::revalidate_all(PROJECT_PATHS);
    Ok(Json(ActionResponse::done()))
}

// ============================================================================
// Skills
// ============================================================================

/// GET /api/admin/skills
pub async fn list_skills() -> Response {
    admin_read(|pool| async move { content::skills(&pool).await }).await
}

/// POST /api/admin/skills
pub async fn create_skill(
    Json(new): Json<NewSkill>,
) -> AppResult<(StatusCode, Json<ActionResponse<Skill>>)> {
    require_text(&new.category, "Category")?;
    require_text(&new.name, "Name")?;
    check_level(new.level)?;

    let pool = pool()?;
    let skill = db::portfolio::create_skill(&pool, new)
        .await
        .map_err(|e| AppError::persistence("Failed to create skill", e))?;

    cache::revalidate_all(SKILL_PATHS);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok(skill))))
}

/// PATCH /api/admin/skills/{id}
pub async fn update_skill(
    Path(id): Path<i32>,
    Json(changes): Json<UpdateSkill>,
) -> AppResult<Json<ActionResponse<Skill>>> {
    require_text_if_set(changes.category.as_deref(), "Category")?;
    require_text_if_set(changes.name.as_deref(), "Name")?;
    if let Some(level) = changes.level {
        check_level(level)?;
    }

    let pool = pool()?;
    let skill = db::portfolio::update_skill(&pool, id, changes)
        .await
        .map_err(|e| AppError::persistence("Failed to update skill", e))?
        .ok_or_else(|| AppError::NotFound("Skill not found".to_string()))?;

    cache::revalidate_all(SKILL_PATHS);
    Ok(Json(ActionResponse::ok(skill)))
}

/// DELETE /api/admin/skills/{id}
pub async fn delete_skill(Path(id): Path<i32>) -> AppResult<Json<ActionResponse<()>>> {
    let pool = pool()?;
    let deleted = db::portfolio::delete_skill(&pool, id)
        .await
        .map_err(|e| AppError::persistence("Failed to delete skill", e))?;
    if !deleted {
        return Err(AppError::NotFound("Skill not found".to_string()));
    }

    cache::revalidate_all(SKILL_PATHS);
    Ok(Json(ActionResponse::done()))
}

// ============================================================================
// Timeline
// ============================================================================

/// GET /api/admin/timeline
pub async fn list_timeline() -> Response {
    admin_read(|pool| async move { content::timeline(&pool).await }).await
}

/// POST /api/admin/timeline
pub async fn create_timeline_event(
    Json(new): Json<NewTimelineEvent>,
) -> AppResult<(StatusCode, Json<ActionResponse<TimelineEvent>>)> {
    require_text(&new.year, "Year")?;
    require_text(&new.title, "Title")?;

    let pool = pool()?;
    let event = db::portfolio::create_timeline_event(&pool, new)
        .await
        .map_err(|e| AppError::persistence("Failed to create timeline event", e))?;

    cache::revalidate_all(TIMELINE_PATHS);
    Ok((StatusCode::CREATED, Json(ActionResponse::ok(event))))
}

/// PATCH /api/admin/timeline/{id}
pub async fn update_timeline_event(
    Path(id): Path<i32>,
    Json(changes): Json<UpdateTimelineEvent>,
) -> AppResult<Json<ActionResponse<TimelineEvent>>> {
    require_text_if_set(changes.year.as_deref(), "Year")?;
    require_text_if_set(changes.title.as_deref(), "Title")?;

    let pool = pool()?;
    let event = db::portfolio::update_timeline_event(&pool, id, changes)
        .await
        .map_err(|e| AppError::persistence("Failed to update timeline event", e))?
        .ok_or_else(|| AppError::NotFound("Timeline event not found".to_string()))?;

    cache::revalidate_all(TIMELINE_PATHS);
    Ok(Json(ActionResponse::ok(event)))
}

/// DELETE /api/admin/timeline/{id}
pub async fn delete_timeline_event(Path(id): Path<i32>) -> AppResult<Json<ActionResponse<()>>> {
    let pool = pool()?;
    let deleted = db::portfolio::delete_timeline_event(&pool, id)
        .await
        .map_err(|e| AppError::persistence("Failed to delete timeline event", e))?;
    if !deleted {
        return Err(AppError::NotFound("Timeline event not found".to_string()));
    }

    cache::revalidate_all(TIMELINE_PATHS);
    Ok(Json(ActionResponse::done()))
}
