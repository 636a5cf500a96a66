//! Auxiliary collection normalization (stories, locations, media, artifacts).
//!
//! # Invariants
//! - Each accepted record has a non-empty id unique within its collection.
//! - Story member ids are kept as declared; resolution happens in the checker.

use crate::model::issue::{Collection, ImportIssue, IssueKind, RecordRef};
use crate::model::person::PersonId;
use crate::normalize::fields::{lookup, split_id_list, text_value};
use serde_json::Value;
use std::collections::HashSet;

const ID_KEYS: &[&str] = &["id", "uuid"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const STORY_MEMBER_KEYS: &[&str] = &["memberids", "members", "personids", "people"];
const MEMBER_OBJECT_ID_KEYS: &[&str] = &["personid", "memberid", "id"];

/// Accepted auxiliary record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDraft {
    pub id: String,
}

/// Accepted story with the persons it mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDraft {
    pub id: String,
    pub title: Option<String>,
    /// Declared member ids, deduplicated, in declaration order.
    pub member_ids: Vec<PersonId>,
}

/// Normalizes id-only collections.
pub(crate) fn normalize_entities(
    collection: Collection,
    rows: &[Value],
    issues: &mut Vec<ImportIssue>,
) -> Vec<EntityDraft> {
    let mut seen = HashSet::new();
    rows.iter()
        .enumerate()
        .filter_map(|(row, value)| {
            let id = entity_id(collection, row, value, &mut seen, issues)?;
            Some(EntityDraft { id })
        })
        .collect()
}

pub(crate) fn normalize_stories(rows: &[Value], issues: &mut Vec<ImportIssue>) -> Vec<StoryDraft> {
    let mut seen = HashSet::new();
    let mut stories = Vec::new();
    for (row, value) in rows.iter().enumerate() {
        let Some(id) = entity_id(Collection::Stories, row, value, &mut seen, issues) else {
            continue;
        };
        let Some(record) = value.as_object() else {
            continue;
        };

        let title = lookup(record, TITLE_KEYS).and_then(|(_, value)| text_value(value).ok().flatten());
        let member_ids = match lookup(record, STORY_MEMBER_KEYS) {
            Some((_, value)) => story_member_ids(row, value, issues),
            None => Vec::new(),
        };
        stories.push(StoryDraft {
            id,
            title,
            member_ids,
        });
    }
    stories
}

fn entity_id(
    collection: Collection,
    row: usize,
    value: &Value,
    seen: &mut HashSet<String>,
    issues: &mut Vec<ImportIssue>,
) -> Option<String> {
    let row_ref = RecordRef::Row {
        collection,
        index: row,
    };
    let id = value
        .as_object()
        .and_then(|record| lookup(record, ID_KEYS))
        .and_then(|(_, value)| text_value(value).ok().flatten());

    let Some(id) = id else {
        issues.push(ImportIssue::new(
            IssueKind::MissingIdentifier,
            row_ref,
            format!("{} row has no id; skipped", collection.as_str()),
        ));
        return None;
    };
    if !seen.insert(id.clone()) {
        issues.push(ImportIssue::new(
            IssueKind::DuplicateIdentifier,
            row_ref,
            format!("{} id `{id}` already imported; skipped", collection.as_str()),
        ));
        return None;
    }
    Some(id)
}

fn story_member_ids(row: usize, value: &Value, issues: &mut Vec<ImportIssue>) -> Vec<PersonId> {
    let mut ids: Vec<PersonId> = Vec::new();
    let mut push = |id: String| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };

    match value {
        Value::Array(items) => {
            for item in items {
                let id = match item {
                    Value::Object(member) => lookup(member, MEMBER_OBJECT_ID_KEYS)
                        .and_then(|(_, value)| text_value(value).ok().flatten()),
                    other => text_value(other).ok().flatten(),
                };
                match id {
                    Some(id) => push(id),
                    None => issues.push(ImportIssue::new(
                        IssueKind::InvalidField,
                        RecordRef::Row {
                            collection: Collection::Stories,
                            index: row,
                        },
                        "story member entry ignored: no person id",
                    )),
                }
            }
        }
        other => match text_value(other) {
            Ok(Some(text)) => split_id_list(&text).into_iter().for_each(&mut push),
            Ok(None) => {}
            Err(reason) => issues.push(ImportIssue::new(
                IssueKind::InvalidField,
                RecordRef::Row {
                    collection: Collection::Stories,
                    index: row,
                },
                format!("story members ignored: {reason}"),
            )),
        },
    }
    ids
}
