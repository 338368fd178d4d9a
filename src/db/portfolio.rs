//! Projects, skills and timeline events.
//!
//! New rows without an explicit `sort_order` land after the current maximum
//! of their scope (the whole table, or the skill's category); an empty scope
//! counts as maximum 0.

use sqlx::PgPool;

use super::models::{
    encode_tech_stack, NewProject, NewSkill, NewTimelineEvent, Project, Skill, TimelineEvent,
    UpdateProject, UpdateSkill, UpdateTimelineEvent,
};

const PROJECT_COLUMNS: &str =
    "id, title, description, link, github, image, status, tech_stack, featured, sort_order, created_at";
const SKILL_COLUMNS: &str = "id, category, name, icon, level, sort_order";
const TIMELINE_COLUMNS: &str = "id, year, title, description, icon, sort_order";

// ============================================================================
// Projects
// ============================================================================

pub async fn list_projects(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY featured DESC, sort_order ASC, id ASC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn featured_projects(pool: &PgPool, limit: i64) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE featured = true \
         ORDER BY sort_order ASC, id ASC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn create_project(pool: &PgPool, new: NewProject) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "INSERT INTO projects (title, description, link, github, image, status, tech_stack, \
                               featured, sort_order) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, \
                 COALESCE($9, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM projects))) \
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.link)
    .bind(&new.github)
    .bind(&new.image)
    .bind(&new.status)
    .bind(encode_tech_stack(&new.tech_stack))
    .bind(new.featured)
    .bind(new.sort_order)
    .fetch_one(pool)
    .await
}

pub async fn update_project(
    pool: &PgPool,
    id: i32,
    changes: UpdateProject,
) -> Result<Option<Project>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(mut project) = existing else {
        return Ok(None);
    };
    changes.apply(&mut project);

    let project = sqlx::query_as::<_, Project>(&format!(
        "UPDATE projects \
         SET title = $1, description = $2, link = $3, github = $4, image = $5, status = $6, \
             tech_stack = $7, featured = $8, sort_order = $9 \
         WHERE id = $10 \
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(&project.title)
    .bind(&project.description)
    .bind(&project.link)
    .bind(&project.github)
    .bind(&project.image)
    .bind(&project.status)
    .bind(&project.tech_stack)
    .bind(project.featured)
    .bind(project.sort_order)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(project))
}

pub async fn delete_project(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Skills
// ============================================================================

/// All skills ordered by category, then sort order.
pub async fn list_skills(pool: &PgPool) -> Result<Vec<Skill>, sqlx::Error> {
    sqlx::query_as::<_, Skill>(&format!(
        "SELECT {SKILL_COLUMNS} FROM skills ORDER BY category ASC, sort_order ASC, id ASC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn create_skill(pool: &PgPool, new: NewSkill) -> Result<Skill, sqlx::Error> {
    sqlx::query_as::<_, Skill>(&format!(
        "INSERT INTO skills (category, name, icon, level, sort_order) \
         VALUES ($1, $2, $3, $4, \
                 COALESCE($5, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM skills WHERE category = $1))) \
         RETURNING {SKILL_COLUMNS}"
    ))
    .bind(&new.category)
    .bind(&new.name)
    .bind(&new.icon)
    .bind(new.level)
    .bind(new.sort_order)
    .fetch_one(pool)
    .await
}

pub async fn update_skill(
    pool: &PgPool,
    id: i32,
    changes: UpdateSkill,
) -> Result<Option<Skill>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Skill>(&format!(
        "SELECT {SKILL_COLUMNS} FROM skills WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(mut skill) = existing else {
        return Ok(None);
    };
    changes.apply(&mut skill);

    let skill = sqlx::query_as::<_, Skill>(&format!(
        "UPDATE skills SET category = $1, name = $2, icon = $3, level = $4, sort_order = $5 \
         WHERE id = $6 RETURNING {SKILL_COLUMNS}"
    ))
    .bind(&skill.category)
    .bind(&skill.name)
    .bind(&skill.icon)
    .bind(skill.level)
    .bind(skill.sort_order)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(skill))
}

pub async fn delete_skill(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM skills WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Timeline
// ============================================================================

pub async fn list_timeline(pool: &PgPool) -> Result<Vec<TimelineEvent>, sqlx::Error> {
    sqlx::query_as::<_, TimelineEvent>(&format!(
        "SELECT {TIMELINE_COLUMNS} FROM timeline_events ORDER BY sort_order ASC, id ASC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn create_timeline_event(
    pool: &PgPool,
    new: NewTimelineEvent,
) -> Result<TimelineEvent, sqlx::Error> {
    sqlx::query_as::<_, TimelineEvent>(&format!(
        "INSERT INTO timeline_events (year, title, description, icon, sort_order) \
         VALUES ($1, $2, $3, $4, \
                 COALESCE($5, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM timeline_events))) \
         RETURNING {TIMELINE_COLUMNS}"
    ))
    .bind(&new.year)
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.icon)
    .bind(new.sort_order)
    .fetch_one(pool)
    .await
}

pub async fn update_timeline_event(
    pool: &PgPool,
    id: i32,
    changes: UpdateTimelineEvent,
) -> Result<Option<TimelineEvent>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, TimelineEvent>(&format!(
        "SELECT {TIMELINE_COLUMNS} FROM timeline_events WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(mut event) = existing else {
        return Ok(None);
    };
    changes.apply(&mut event);

    let event = sqlx::query_as::<_, TimelineEvent>(&format!(
        "UPDATE timeline_events SET year = $1, title = $2, description = $3, icon = $4, \
             sort_order = $5 \
         WHERE id = $6 RETURNING {TIMELINE_COLUMNS}"
    ))
    .bind(&event.year)
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.icon)
    .bind(event.sort_order)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(event))
}

pub async fn delete_timeline_event(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM timeline_events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
