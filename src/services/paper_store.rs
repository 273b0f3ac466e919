// src/services/paper_store.rs

//! Reads and header writes of the question paper aggregate.

use std::collections::HashMap;

use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::RECENT_PAPERS_LIMIT,
    error::AppError,
    models::{
        lookup::{ExamName, HeadingChoices, Revision, SubjectCode},
        paper::{HeadingRequest, PaperAggregate, PaperStatus, PaperSummary, QuestionPaper},
        question::Question,
        section::{Part, Section, SectionWithQuestions},
    },
    utils::html::clean_html,
};

const PAPER_COLUMNS: &str = r#"
    id, code, revision, subject_code, subject_name, exam_name, duration_hours,
    exam_marks, maximum_mark, module1_hours, module2_hours, module3_hours,
    module4_hours, percent_r, percent_u, percent_a, created_at
"#;

/// Loads one paper header, 404 when it does not exist.
pub async fn load_paper(pool: &SqlitePool, id: i64) -> Result<QuestionPaper, AppError> {
    sqlx::query_as::<_, QuestionPaper>(&format!(
        "SELECT {} FROM question_papers WHERE id = ?",
        PAPER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load paper {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Question paper not found".to_string()))
}

async fn section_questions(pool: &SqlitePool, section_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE section_id = ? ORDER BY position, id",
    )
    .bind(section_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// One section of a paper with its questions, `None` if not written yet.
pub async fn load_section(
    pool: &SqlitePool,
    paper_id: i64,
    part: Part,
) -> Result<Option<SectionWithQuestions>, AppError> {
    let section = sqlx::query_as::<_, Section>(
        "SELECT * FROM sections WHERE paper_id = ? AND part = ?",
    )
    .bind(paper_id)
    .bind(part.code())
    .fetch_optional(pool)
    .await?;

    match section {
        Some(section) => {
            let questions = section_questions(pool, section.id).await?;
            Ok(Some(SectionWithQuestions { section, questions }))
        }
        None => Ok(None),
    }
}

/// Header plus every saved section, A before B before C.
pub async fn load_aggregate(pool: &SqlitePool, id: i64) -> Result<PaperAggregate, AppError> {
    let paper = load_paper(pool, id).await?;

    let mut sections = Vec::new();
    for part in Part::ALL {
        if let Some(section) = load_section(pool, id, part).await? {
            sections.push(section);
        }
    }

    Ok(PaperAggregate { paper, sections })
}

/// Wizard progress of a paper, from which sections exist.
pub async fn paper_status(pool: &SqlitePool, id: i64) -> Result<PaperStatus, AppError> {
    let parts: Vec<String> = sqlx::query_scalar("SELECT part FROM sections WHERE paper_id = ?")
        .bind(id)
        .fetch_all(pool)
        .await?;

    let parts: Vec<Part> = parts
        .into_iter()
        .filter_map(|p| Part::try_from(p).ok())
        .collect();

    Ok(PaperStatus::from_parts(&parts))
}

/// Most recent papers with their wizard status, newest first.
pub async fn recent_papers(pool: &SqlitePool) -> Result<Vec<PaperSummary>, AppError> {
    let papers = sqlx::query_as::<_, QuestionPaper>(&format!(
        "SELECT {} FROM question_papers ORDER BY created_at DESC, id DESC LIMIT ?",
        PAPER_COLUMNS
    ))
    .bind(RECENT_PAPERS_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list papers: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let rows: Vec<(i64, String)> = sqlx::query_as(
        r#"
        SELECT paper_id, part FROM sections
        WHERE paper_id IN (
            SELECT id FROM question_papers ORDER BY created_at DESC, id DESC LIMIT ?
        )
        "#,
    )
    .bind(RECENT_PAPERS_LIMIT)
    .fetch_all(pool)
    .await?;

    let mut parts: HashMap<i64, Vec<Part>> = HashMap::new();
    for (paper_id, part) in rows {
        if let Ok(part) = Part::try_from(part) {
            parts.entry(paper_id).or_default().push(part);
        }
    }

    Ok(papers
        .into_iter()
        .map(|p| {
            let status =
                PaperStatus::from_parts(parts.get(&p.id).map(Vec::as_slice).unwrap_or(&[]));
            PaperSummary {
                id: p.id,
                code: p.code,
                subject_code: p.subject_code,
                subject_name: p.subject_name,
                exam_name: p.exam_name,
                maximum_mark: p.maximum_mark,
                status,
                status_label: status.label(),
                created_at: p.created_at,
            }
        })
        .collect())
}

/// Active lookup values offered on the heading step.
pub async fn heading_choices(pool: &SqlitePool) -> Result<HeadingChoices, AppError> {
    let default_max_marks = default_max_marks(pool).await?;

    let revisions = sqlx::query_as::<_, Revision>(
        "SELECT id, year, is_active FROM revisions WHERE is_active = 1 ORDER BY year DESC",
    )
    .fetch_all(pool)
    .await?;

    let exam_names = sqlx::query_as::<_, ExamName>(
        r#"
        SELECT id, name, is_active, display_order FROM exam_names
        WHERE is_active = 1 ORDER BY display_order, name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let subject_codes = sqlx::query_as::<_, SubjectCode>(
        r#"
        SELECT id, code, subject_name, duration_hours, is_active FROM subject_codes
        WHERE is_active = 1 ORDER BY code
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(HeadingChoices {
        default_max_marks,
        revisions,
        exam_names,
        subject_codes,
    })
}

pub async fn default_max_marks(pool: &SqlitePool) -> Result<i64, AppError> {
    let marks: Option<i64> =
        sqlx::query_scalar("SELECT default_max_marks FROM system_configuration WHERE id = 1")
            .fetch_optional(pool)
            .await?;

    Ok(marks.unwrap_or(75))
}

/// Heading values after validation and lookup fallbacks.
struct ResolvedHeading {
    code: i64,
    revision: String,
    subject_code: String,
    subject_name: String,
    exam_name: String,
    duration_hours: i64,
    exam_marks: i64,
}

/// Validates a heading and fills the fields left to the lookups.
///
/// Revision and subject code must name active lookup rows, unless an edit
/// keeps the value already stored on the paper.
async fn resolve_heading(
    pool: &SqlitePool,
    req: &HeadingRequest,
    current: Option<&QuestionPaper>,
) -> Result<ResolvedHeading, AppError> {
    req.validate()?;
    req.check_percentages().map_err(AppError::BadRequest)?;
    let exam_name = clean_html(&req.resolved_exam_name().map_err(AppError::BadRequest)?);

    let revision = req.revision.trim().to_string();
    let kept_revision = current.is_some_and(|p| p.revision == revision);
    if !kept_revision {
        let known: Option<i64> =
            sqlx::query_scalar("SELECT id FROM revisions WHERE year = ? AND is_active = 1")
                .bind(&revision)
                .fetch_optional(pool)
                .await?;
        if known.is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown revision '{}'",
                revision
            )));
        }
    }

    let subject_code = req.subject_code.trim().to_string();
    let subject = sqlx::query_as::<_, SubjectCode>(
        "SELECT id, code, subject_name, duration_hours, is_active FROM subject_codes WHERE code = ?",
    )
    .bind(&subject_code)
    .fetch_optional(pool)
    .await?;

    let kept_subject = current.is_some_and(|p| p.subject_code == subject_code);
    let subject = match subject {
        Some(s) if s.is_active || kept_subject => Some(s),
        _ if kept_subject => None,
        _ => {
            return Err(AppError::BadRequest(format!(
                "Unknown subject code '{}'",
                subject_code
            )));
        }
    };

    let subject_name = match (req.subject_name.as_deref().map(str::trim), &subject, current) {
        (Some(name), _, _) if !name.is_empty() => clean_html(name),
        (_, Some(s), _) => s.subject_name.clone(),
        (_, None, Some(p)) => p.subject_name.clone(),
        _ => {
            return Err(AppError::BadRequest("Subject name is required".to_string()));
        }
    };

    let duration_hours = req
        .duration_hours
        .or(subject.as_ref().map(|s| s.duration_hours))
        .or(current.map(|p| p.duration_hours))
        .unwrap_or(3);

    let exam_marks = match req.exam_marks.or(current.map(|p| p.exam_marks)) {
        Some(marks) => marks,
        None => default_max_marks(pool).await?,
    };

    Ok(ResolvedHeading {
        code: req.code,
        revision,
        subject_code,
        subject_name,
        exam_name,
        duration_hours,
        exam_marks,
    })
}

/// Creates a paper from the heading step. `maximum_mark` starts at 0.
pub async fn create_paper(pool: &SqlitePool, req: &HeadingRequest) -> Result<QuestionPaper, AppError> {
    let h = resolve_heading(pool, req, None).await?;

    let id = sqlx::query(
        r#"
        INSERT INTO question_papers
        (code, revision, subject_code, subject_name, exam_name, duration_hours, exam_marks,
         maximum_mark, module1_hours, module2_hours, module3_hours, module4_hours,
         percent_r, percent_u, percent_a)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(h.code)
    .bind(&h.revision)
    .bind(&h.subject_code)
    .bind(&h.subject_name)
    .bind(&h.exam_name)
    .bind(h.duration_hours)
    .bind(h.exam_marks)
    .bind(req.module1_hours)
    .bind(req.module2_hours)
    .bind(req.module3_hours)
    .bind(req.module4_hours)
    .bind(req.percent_r)
    .bind(req.percent_u)
    .bind(req.percent_a)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create paper: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .last_insert_rowid();

    tracing::info!("Created question paper {} ({})", id, h.subject_code);
    load_paper(pool, id).await
}

/// Rewrites the header of an existing paper. Sections and the running
/// total are left alone.
pub async fn update_heading(
    pool: &SqlitePool,
    id: i64,
    req: &HeadingRequest,
) -> Result<QuestionPaper, AppError> {
    let current = load_paper(pool, id).await?;
    let h = resolve_heading(pool, req, Some(&current)).await?;

    sqlx::query(
        r#"
        UPDATE question_papers SET
            code = ?, revision = ?, subject_code = ?, subject_name = ?, exam_name = ?,
            duration_hours = ?, exam_marks = ?,
            module1_hours = ?, module2_hours = ?, module3_hours = ?, module4_hours = ?,
            percent_r = ?, percent_u = ?, percent_a = ?
        WHERE id = ?
        "#,
    )
    .bind(h.code)
    .bind(&h.revision)
    .bind(&h.subject_code)
    .bind(&h.subject_name)
    .bind(&h.exam_name)
    .bind(h.duration_hours)
    .bind(h.exam_marks)
    .bind(req.module1_hours)
    .bind(req.module2_hours)
    .bind(req.module3_hours)
    .bind(req.module4_hours)
    .bind(req.percent_r)
    .bind(req.percent_u)
    .bind(req.percent_a)
    .bind(id)
    .execute(pool)
    .await?;

    load_paper(pool, id).await
}

/// Deletes a paper; sections, questions and wizard sessions cascade.
pub async fn delete_paper(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM question_papers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete paper {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question paper not found".to_string()));
    }

    tracing::info!("Deleted question paper {}", id);
    Ok(())
}
