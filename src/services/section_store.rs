// src/services/section_store.rs

//! Persists one section of a paper.
//!
//! A save replaces the section's whole question set and moves the paper's
//! running total by the difference between the new and the old section
//! total. Everything happens in one transaction.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::AppError,
    models::{
        lookup::{ModuleOutcome, QuestionChoices, QuestionModule},
        question::{ParentOption, ParentRef, Question},
        section::{Part, PendingCounts, QuestionsSubmission, Section, SectionWithQuestions},
    },
    services::{
        batch::{NewQuestion, ParentLink, SectionBatch},
        paper_store,
    },
    utils::html::{clean_html, to_plain_text},
};

const PARENT_PREVIEW_CHARS: usize = 100;

/// Active modules and outcomes offered on the questions step.
pub async fn question_choices(pool: &SqlitePool) -> Result<QuestionChoices, AppError> {
    let modules = sqlx::query_as::<_, QuestionModule>(
        "SELECT id, module_number, is_active FROM question_modules WHERE is_active = 1 ORDER BY module_number",
    )
    .fetch_all(pool)
    .await?;

    let outcomes = sqlx::query_as::<_, ModuleOutcome>(
        "SELECT id, outcome_code, description, is_active FROM module_outcomes WHERE is_active = 1 ORDER BY outcome_code",
    )
    .fetch_all(pool)
    .await?;

    Ok(QuestionChoices { modules, outcomes })
}

/// Stored questions referenced as parents, restricted to `paper_id`.
async fn referenced_parents(
    pool: &SqlitePool,
    paper_id: i64,
    submission: &QuestionsSubmission,
) -> Result<HashMap<i64, Question>, AppError> {
    let mut found = HashMap::new();
    for input in &submission.questions {
        let Some(ParentRef::Existing(id)) = input.parent else {
            continue;
        };
        if found.contains_key(&id) {
            continue;
        }

        let stored = sqlx::query_as::<_, Question>(
            r#"
            SELECT q.* FROM questions q
            JOIN sections s ON s.id = q.section_id
            WHERE q.id = ? AND s.paper_id = ?
            "#,
        )
        .bind(id)
        .bind(paper_id)
        .fetch_optional(pool)
        .await?;

        if let Some(q) = stored {
            found.insert(id, q);
        }
    }
    Ok(found)
}

async fn insert_question(
    conn: &mut SqliteConnection,
    section_id: i64,
    q: &NewQuestion,
    parent_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO questions
        (section_id, position, module, outcome, level, question, text_below_image,
         image_path, image_position, image_size, parent_id, sub_question_letter,
         answer_text, answer_equation, answer_image_path, or_group)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(section_id)
    .bind(q.position)
    .bind(q.module)
    .bind(&q.outcome)
    .bind(q.level.code())
    .bind(&q.question)
    .bind(&q.text_below_image)
    .bind(&q.image_path)
    .bind(q.image_position.as_str())
    .bind(q.image_size.as_str())
    .bind(parent_id)
    .bind(&q.sub_question_letter)
    .bind(&q.answer_text)
    .bind(&q.answer_equation)
    .bind(&q.answer_image_path)
    .bind(q.or_group)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// A top-level copy of a parent stored outside this section.
fn parent_copy(stored: &Question, position: i64) -> NewQuestion {
    NewQuestion {
        position,
        module: stored.module,
        outcome: stored.outcome.clone(),
        level: stored.level,
        question: stored.question.clone(),
        text_below_image: stored.text_below_image.clone(),
        image_path: stored.image_path.clone(),
        image_position: stored.image_position,
        image_size: stored.image_size,
        parent: None,
        sub_question_letter: None,
        answer_text: stored.answer_text.clone(),
        answer_equation: stored.answer_equation.clone(),
        answer_image_path: stored.answer_image_path.clone(),
        or_group: None,
    }
}

/// Validates and writes one section.
///
/// Nothing is written when the instructions are empty, the counts are out
/// of bounds or any question of the batch fails validation.
pub async fn save_section(
    pool: &SqlitePool,
    paper_id: i64,
    part: Part,
    counts: PendingCounts,
    submission: QuestionsSubmission,
) -> Result<SectionWithQuestions, AppError> {
    let info = clean_html(submission.info.trim());
    if info.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Section Information/Instructions are required.".to_string(),
        ));
    }

    let counts = counts.validate(part).map_err(AppError::BadRequest)?;
    paper_store::load_paper(pool, paper_id).await?;

    let existing = referenced_parents(pool, paper_id, &submission).await?;
    let choices = question_choices(pool).await?;
    let questions = SectionBatch::declare(part, counts)
        .validate(submission.questions, &existing, &choices)
        .map_err(AppError::BadRequest)?;

    let new_total = counts.total();
    let mut tx = pool.begin().await?;

    let previous = sqlx::query_as::<_, Section>(
        "SELECT * FROM sections WHERE paper_id = ? AND part = ?",
    )
    .bind(paper_id)
    .bind(part.code())
    .fetch_optional(&mut *tx)
    .await?;

    let (section_id, old_total) = match previous {
        Some(old) => {
            sqlx::query(
                r#"
                UPDATE sections SET
                    info = ?, question_count = ?, required_count = ?,
                    mark_per_question = ?, total = ?, or_grouped = ?
                WHERE id = ?
                "#,
            )
            .bind(&info)
            .bind(counts.question_count)
            .bind(counts.required_count)
            .bind(counts.mark_per_question)
            .bind(new_total)
            .bind(part.is_or_grouped())
            .bind(old.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM questions WHERE section_id = ?")
                .bind(old.id)
                .execute(&mut *tx)
                .await?;

            (old.id, old.total)
        }
        None => {
            let id = sqlx::query(
                r#"
                INSERT INTO sections
                (paper_id, part, info, question_count, required_count,
                 mark_per_question, total, or_grouped)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(paper_id)
            .bind(part.code())
            .bind(&info)
            .bind(counts.question_count)
            .bind(counts.required_count)
            .bind(counts.mark_per_question)
            .bind(new_total)
            .bind(part.is_or_grouped())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            (id, 0)
        }
    };

    sqlx::query("UPDATE question_papers SET maximum_mark = maximum_mark + ? WHERE id = ?")
        .bind(new_total - old_total)
        .bind(paper_id)
        .execute(&mut *tx)
        .await?;

    // Parents first so children can point at their new ids.
    let mut slot_ids: HashMap<usize, i64> = HashMap::new();
    for (index, q) in questions.iter().enumerate() {
        if q.is_top_level() {
            let id = insert_question(&mut tx, section_id, q, None).await?;
            slot_ids.insert(index, id);
        }
    }

    let mut copies: HashMap<String, i64> = HashMap::new();
    let mut next_position = questions.len() as i64;
    for q in questions.iter().filter(|q| !q.is_top_level()) {
        let parent_id = match &q.parent {
            Some(ParentLink::Slot(slot)) => slot_ids.get(slot).copied(),
            Some(ParentLink::Existing(stored)) => match copies.get(&stored.question) {
                Some(&id) => Some(id),
                None => {
                    let copy = parent_copy(stored, next_position);
                    next_position += 1;
                    let id = insert_question(&mut tx, section_id, &copy, None).await?;
                    tracing::debug!(
                        "Recreated parent question {} as {} in section {}",
                        stored.id,
                        id,
                        section_id
                    );
                    copies.insert(stored.question.clone(), id);
                    Some(id)
                }
            },
            None => None,
        };

        insert_question(&mut tx, section_id, q, parent_id).await?;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to save part {} of paper {}: {:?}", part.code(), paper_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Saved part {} of paper {}: {} questions, total {} (was {})",
        part.code(),
        paper_id,
        questions.len(),
        new_total,
        old_total
    );

    paper_store::load_section(pool, paper_id, part)
        .await?
        .ok_or(AppError::InternalServerError(
            "Section vanished after save".to_string(),
        ))
}

/// Stored top-level questions of `part` offered as parents.
///
/// Numbering follows the question paper: top-level questions only,
/// counted from 1 in position order.
pub async fn parent_options(
    pool: &SqlitePool,
    paper_id: i64,
    part: Part,
) -> Result<Vec<ParentOption>, AppError> {
    let Some(section) = paper_store::load_section(pool, paper_id, part).await? else {
        return Ok(Vec::new());
    };

    Ok(section
        .questions
        .iter()
        .filter(|q| !q.is_sub_question())
        .enumerate()
        .map(|(i, q)| {
            let plain = to_plain_text(&q.question);
            let text = if plain.chars().count() > PARENT_PREVIEW_CHARS {
                let head: String = plain.chars().take(PARENT_PREVIEW_CHARS).collect();
                format!("{}...", head)
            } else {
                plain
            };
            ParentOption {
                id: q.id,
                text,
                display_number: i + 1,
            }
        })
        .collect())
}
