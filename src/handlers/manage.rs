// src/handlers/manage.rs

//! Staff maintenance of the lookup lists and the system configuration.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::lookup::{
        ExamName, ExamNameRequest, ModuleOutcome, ModuleOutcomeRequest, QuestionModule,
        QuestionModuleRequest, Revision, RevisionRequest, SearchParams, SectionInstruction,
        SectionInstructionRequest, SubjectCode, SubjectCodeRequest, SystemConfiguration,
    },
    services::paper_store,
    utils::html::clean_html,
};

fn check<T: Validate>(payload: &T) -> Result<(), AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    Ok(())
}

fn not_found_unless_affected(rows: u64, what: &str) -> Result<(), AppError> {
    if rows == 0 {
        return Err(AppError::NotFound(format!("{} not found", what)));
    }
    Ok(())
}

async fn count(pool: &SqlitePool, table: &str) -> Result<i64, AppError> {
    let n = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Counts shown on the management landing page.
pub async fn dashboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let body = json!({
        "papers": count(&pool, "question_papers").await?,
        "revisions": count(&pool, "revisions").await?,
        "exam_names": count(&pool, "exam_names").await?,
        "subject_codes": count(&pool, "subject_codes").await?,
        "modules": count(&pool, "question_modules").await?,
        "outcomes": count(&pool, "module_outcomes").await?,
        "instructions": count(&pool, "section_instructions").await?,
        "users": count(&pool, "users").await?,
        "default_max_marks": paper_store::default_max_marks(&pool).await?,
        "recent_papers": paper_store::recent_papers(&pool).await?
    });

    Ok(Json(body))
}

// ---------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------

pub async fn list_revisions(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params.pattern();
    let rows = sqlx::query_as::<_, Revision>(
        "SELECT id, year, is_active FROM revisions WHERE (? IS NULL OR year LIKE ?) ORDER BY year DESC",
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list revisions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rows))
}

pub async fn create_revision(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RevisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let year = payload.year.trim().to_string();

    let id = sqlx::query("INSERT INTO revisions (year, is_active) VALUES (?, ?)")
        .bind(&year)
        .bind(payload.is_active)
        .execute(&pool)
        .await
        .map_err(|e| AppError::from_insert(e, format!("Revision '{}' already exists", year)))?
        .last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(Revision {
            id,
            year,
            is_active: payload.is_active,
        }),
    ))
}

pub async fn update_revision(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<RevisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let year = payload.year.trim().to_string();

    let result = sqlx::query("UPDATE revisions SET year = ?, is_active = ? WHERE id = ?")
        .bind(&year)
        .bind(payload.is_active)
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| AppError::from_insert(e, format!("Revision '{}' already exists", year)))?;
    not_found_unless_affected(result.rows_affected(), "Revision")?;

    Ok(Json(Revision {
        id,
        year,
        is_active: payload.is_active,
    }))
}

pub async fn delete_revision(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM revisions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;
    not_found_unless_affected(result.rows_affected(), "Revision")?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------
// Exam names
// ---------------------------------------------------------------------

pub async fn list_exam_names(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params.pattern();
    let rows = sqlx::query_as::<_, ExamName>(
        r#"
        SELECT id, name, is_active, display_order FROM exam_names
        WHERE (? IS NULL OR name LIKE ?)
        ORDER BY display_order, name
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn create_exam_name(
    State(pool): State<SqlitePool>,
    Json(payload): Json<ExamNameRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let name = payload.name.trim().to_string();

    let id = sqlx::query("INSERT INTO exam_names (name, is_active, display_order) VALUES (?, ?, ?)")
        .bind(&name)
        .bind(payload.is_active)
        .bind(payload.display_order)
        .execute(&pool)
        .await
        .map_err(|e| AppError::from_insert(e, format!("Exam name '{}' already exists", name)))?
        .last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(ExamName {
            id,
            name,
            is_active: payload.is_active,
            display_order: payload.display_order,
        }),
    ))
}

pub async fn update_exam_name(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<ExamNameRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let name = payload.name.trim().to_string();

    let result = sqlx::query(
        "UPDATE exam_names SET name = ?, is_active = ?, display_order = ? WHERE id = ?",
    )
    .bind(&name)
    .bind(payload.is_active)
    .bind(payload.display_order)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| AppError::from_insert(e, format!("Exam name '{}' already exists", name)))?;
    not_found_unless_affected(result.rows_affected(), "Exam name")?;

    Ok(Json(ExamName {
        id,
        name,
        is_active: payload.is_active,
        display_order: payload.display_order,
    }))
}

pub async fn delete_exam_name(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exam_names WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;
    not_found_unless_affected(result.rows_affected(), "Exam name")?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------
// Subject codes
// ---------------------------------------------------------------------

pub async fn list_subject_codes(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params.pattern();
    let rows = sqlx::query_as::<_, SubjectCode>(
        r#"
        SELECT id, code, subject_name, duration_hours, is_active FROM subject_codes
        WHERE (? IS NULL OR code LIKE ? OR subject_name LIKE ?)
        ORDER BY code
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn create_subject_code(
    State(pool): State<SqlitePool>,
    Json(payload): Json<SubjectCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let code = payload.code.trim().to_uppercase();
    let subject_name = payload.subject_name.trim().to_string();

    let id = sqlx::query(
        "INSERT INTO subject_codes (code, subject_name, duration_hours, is_active) VALUES (?, ?, ?, ?)",
    )
    .bind(&code)
    .bind(&subject_name)
    .bind(payload.duration_hours)
    .bind(payload.is_active)
    .execute(&pool)
    .await
    .map_err(|e| AppError::from_insert(e, format!("Subject code '{}' already exists", code)))?
    .last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(SubjectCode {
            id,
            code,
            subject_name,
            duration_hours: payload.duration_hours,
            is_active: payload.is_active,
        }),
    ))
}

pub async fn update_subject_code(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<SubjectCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let code = payload.code.trim().to_uppercase();
    let subject_name = payload.subject_name.trim().to_string();

    let result = sqlx::query(
        r#"
        UPDATE subject_codes SET code = ?, subject_name = ?, duration_hours = ?, is_active = ?
        WHERE id = ?
        "#,
    )
    .bind(&code)
    .bind(&subject_name)
    .bind(payload.duration_hours)
    .bind(payload.is_active)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| AppError::from_insert(e, format!("Subject code '{}' already exists", code)))?;
    not_found_unless_affected(result.rows_affected(), "Subject code")?;

    Ok(Json(SubjectCode {
        id,
        code,
        subject_name,
        duration_hours: payload.duration_hours,
        is_active: payload.is_active,
    }))
}

pub async fn delete_subject_code(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM subject_codes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;
    not_found_unless_affected(result.rows_affected(), "Subject code")?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------

pub async fn list_modules(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params.pattern();
    let rows = sqlx::query_as::<_, QuestionModule>(
        r#"
        SELECT id, module_number, is_active FROM question_modules
        WHERE (? IS NULL OR CAST(module_number AS TEXT) LIKE ?)
        ORDER BY module_number
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn create_module(
    State(pool): State<SqlitePool>,
    Json(payload): Json<QuestionModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;

    let id = sqlx::query("INSERT INTO question_modules (module_number, is_active) VALUES (?, ?)")
        .bind(payload.module_number)
        .bind(payload.is_active)
        .execute(&pool)
        .await
        .map_err(|e| {
            AppError::from_insert(e, format!("Module {} already exists", payload.module_number))
        })?
        .last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(QuestionModule {
            id,
            module_number: payload.module_number,
            is_active: payload.is_active,
        }),
    ))
}

pub async fn update_module(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;

    let result =
        sqlx::query("UPDATE question_modules SET module_number = ?, is_active = ? WHERE id = ?")
            .bind(payload.module_number)
            .bind(payload.is_active)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| {
                AppError::from_insert(e, format!("Module {} already exists", payload.module_number))
            })?;
    not_found_unless_affected(result.rows_affected(), "Module")?;

    Ok(Json(QuestionModule {
        id,
        module_number: payload.module_number,
        is_active: payload.is_active,
    }))
}

pub async fn delete_module(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM question_modules WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;
    not_found_unless_affected(result.rows_affected(), "Module")?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------
// Module outcomes
// ---------------------------------------------------------------------

pub async fn list_outcomes(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params.pattern();
    let rows = sqlx::query_as::<_, ModuleOutcome>(
        r#"
        SELECT id, outcome_code, description, is_active FROM module_outcomes
        WHERE (? IS NULL OR outcome_code LIKE ? OR description LIKE ?)
        ORDER BY outcome_code
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn create_outcome(
    State(pool): State<SqlitePool>,
    Json(payload): Json<ModuleOutcomeRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let outcome_code = payload.outcome_code.trim().to_string();
    let description = payload.description.as_deref().map(clean_html);

    let id = sqlx::query(
        "INSERT INTO module_outcomes (outcome_code, description, is_active) VALUES (?, ?, ?)",
    )
    .bind(&outcome_code)
    .bind(&description)
    .bind(payload.is_active)
    .execute(&pool)
    .await
    .map_err(|e| AppError::from_insert(e, format!("Outcome '{}' already exists", outcome_code)))?
    .last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(ModuleOutcome {
            id,
            outcome_code,
            description,
            is_active: payload.is_active,
        }),
    ))
}

pub async fn update_outcome(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<ModuleOutcomeRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let outcome_code = payload.outcome_code.trim().to_string();
    let description = payload.description.as_deref().map(clean_html);

    let result = sqlx::query(
        "UPDATE module_outcomes SET outcome_code = ?, description = ?, is_active = ? WHERE id = ?",
    )
    .bind(&outcome_code)
    .bind(&description)
    .bind(payload.is_active)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| AppError::from_insert(e, format!("Outcome '{}' already exists", outcome_code)))?;
    not_found_unless_affected(result.rows_affected(), "Outcome")?;

    Ok(Json(ModuleOutcome {
        id,
        outcome_code,
        description,
        is_active: payload.is_active,
    }))
}

pub async fn delete_outcome(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM module_outcomes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;
    not_found_unless_affected(result.rows_affected(), "Outcome")?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------
// Section instructions
// ---------------------------------------------------------------------

pub async fn list_instructions(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params.pattern();
    let rows = sqlx::query_as::<_, SectionInstruction>(
        r#"
        SELECT id, text, part, is_active FROM section_instructions
        WHERE (? IS NULL OR text LIKE ?)
        ORDER BY part, id
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn create_instruction(
    State(pool): State<SqlitePool>,
    Json(payload): Json<SectionInstructionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let text = clean_html(payload.text.trim());
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Instruction text is required".to_string()));
    }

    let id = sqlx::query("INSERT INTO section_instructions (text, part, is_active) VALUES (?, ?, ?)")
        .bind(&text)
        .bind(payload.part.code())
        .bind(payload.is_active)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create instruction: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?
        .last_insert_rowid();

    Ok((
        StatusCode::CREATED,
        Json(SectionInstruction {
            id,
            text,
            part: payload.part,
            is_active: payload.is_active,
        }),
    ))
}

pub async fn update_instruction(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<SectionInstructionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;
    let text = clean_html(payload.text.trim());
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Instruction text is required".to_string()));
    }

    let result = sqlx::query(
        "UPDATE section_instructions SET text = ?, part = ?, is_active = ? WHERE id = ?",
    )
    .bind(&text)
    .bind(payload.part.code())
    .bind(payload.is_active)
    .bind(id)
    .execute(&pool)
    .await?;
    not_found_unless_affected(result.rows_affected(), "Instruction")?;

    Ok(Json(SectionInstruction {
        id,
        text,
        part: payload.part,
        is_active: payload.is_active,
    }))
}

pub async fn delete_instruction(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM section_instructions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;
    not_found_unless_affected(result.rows_affected(), "Instruction")?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------
// System configuration
// ---------------------------------------------------------------------

pub async fn get_system_config(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let default_max_marks = paper_store::default_max_marks(&pool).await?;
    Ok(Json(SystemConfiguration { default_max_marks }))
}

/// Updates the singleton row, creating it if it was removed.
pub async fn update_system_config(
    State(pool): State<SqlitePool>,
    Json(payload): Json<SystemConfiguration>,
) -> Result<impl IntoResponse, AppError> {
    check(&payload)?;

    sqlx::query(
        r#"
        INSERT INTO system_configuration (id, default_max_marks) VALUES (1, ?)
        ON CONFLICT(id) DO UPDATE SET default_max_marks = excluded.default_max_marks
        "#,
    )
    .bind(payload.default_max_marks)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update system configuration: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Default maximum marks set to {}", payload.default_max_marks);
    Ok(Json(payload))
}
