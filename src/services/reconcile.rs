// src/services/reconcile.rs

//! Parent, letter and OR-group bookkeeping on a validated batch.

use std::collections::{HashMap, HashSet};

use crate::services::batch::{NewQuestion, ParentLink};

/// Repoints stored parents at an identical top-level question of the batch.
///
/// When a section is edited, sub-questions still reference the parent rows
/// of the previous version. If the resubmitted batch contains a top-level
/// question with the same text, that slot becomes the parent.
pub fn match_existing_parents(questions: &mut [NewQuestion]) {
    let by_text: HashMap<String, usize> = questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.is_top_level())
        .rev()
        .map(|(i, q)| (q.question.clone(), i))
        .collect();

    for q in questions.iter_mut() {
        if let Some(ParentLink::Existing(stored)) = &q.parent {
            if let Some(&slot) = by_text.get(&stored.question) {
                q.parent = Some(ParentLink::Slot(slot));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ParentKey {
    Slot(usize),
    Stored(i64),
}

fn parent_key(link: &ParentLink) -> ParentKey {
    match link {
        ParentLink::Slot(slot) => ParentKey::Slot(*slot),
        ParentLink::Existing(stored) => ParentKey::Stored(stored.id),
    }
}

/// Gives every sub-question without a letter the next free one among its
/// siblings: a, b, c ...
pub fn assign_letters(questions: &mut [NewQuestion]) {
    let mut used: HashMap<ParentKey, HashSet<String>> = HashMap::new();
    for q in questions.iter() {
        if let (Some(link), Some(letter)) = (&q.parent, &q.sub_question_letter) {
            used.entry(parent_key(link))
                .or_default()
                .insert(letter.clone());
        }
    }

    for q in questions.iter_mut() {
        let Some(link) = &q.parent else { continue };
        if q.sub_question_letter.is_some() {
            continue;
        }

        let taken = used.entry(parent_key(link)).or_default();
        let letter = ('a'..='z')
            .map(|c| c.to_string())
            .find(|l| !taken.contains(l))
            .unwrap_or_else(|| "z".to_string());
        taken.insert(letter.clone());
        q.sub_question_letter = Some(letter);
    }
}

/// Pairs the top-level questions of an OR-grouped section.
///
/// Top-level questions are taken two at a time in insertion order and share
/// group `k + 1`. The second member takes the first member's module.
/// Sub-questions follow their parent's group and module.
pub fn pair_alternatives(questions: &mut [NewQuestion]) -> Result<(), String> {
    for (index, q) in questions.iter().enumerate() {
        if let Some(ParentLink::Existing(_)) = q.parent {
            return Err(format!(
                "Question {}: an OR-grouped sub-question must belong to a question of the same submission",
                index + 1
            ));
        }
    }

    let tops: Vec<usize> = questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.is_top_level())
        .map(|(i, _)| i)
        .collect();

    if tops.len() % 2 != 0 {
        return Err(format!(
            "OR questions come in pairs: {} main questions cannot be paired",
            tops.len()
        ));
    }

    let mut groups: HashMap<usize, (i64, i64)> = HashMap::new();
    for (k, pair) in tops.chunks(2).enumerate() {
        let group = k as i64 + 1;
        let module = questions[pair[0]].module;
        for &member in pair {
            questions[member].module = module;
            questions[member].or_group = Some(group);
            groups.insert(member, (group, module));
        }
    }

    for q in questions.iter_mut() {
        if let Some(ParentLink::Slot(parent)) = q.parent {
            if let Some(&(group, module)) = groups.get(&parent) {
                q.or_group = Some(group);
                q.module = module;
            }
        }
    }

    Ok(())
}
