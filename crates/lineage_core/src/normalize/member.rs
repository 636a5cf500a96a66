//! Member record normalization.
//!
//! # Responsibility
//! - Map one raw member row onto a `PersonDraft`.
//! - Collect declared relations from nested arrays and flattened id columns.
//!
//! # Invariants
//! - A row without an identifier never yields a draft.
//! - Every issue references the source row index.
//! - Generated relation ids depend only on row content.

use crate::config::{ImportOptions, SourceFormat};
use crate::model::issue::{Collection, ImportIssue, IssueKind, RecordRef};
use crate::model::person::{Gender, Person, PersonDraft};
use crate::model::relation::{declared_relation_id, Relation, RelationType};
use crate::normalize::fields::{
    lookup, parse_date, split_full_name, split_id_list, text_value, PersonField,
};
use serde_json::Value;

const RELATION_ID_KEYS: &[&str] = &["id", "relationid"];
const RELATION_TYPE_KEYS: &[&str] = &["type", "relationtype", "kind", "relation"];
const RELATION_TARGET_KEYS: &[&str] = &["personid", "targetid", "target", "relatedid", "memberid"];

/// Normalizes one member row, pushing issues in field order.
pub(crate) fn normalize_member(
    row: usize,
    value: &Value,
    options: &ImportOptions,
    issues: &mut Vec<ImportIssue>,
) -> Option<PersonDraft> {
    let row_ref = RecordRef::Row {
        collection: Collection::Members,
        index: row,
    };

    let Some(record) = value.as_object() else {
        issues.push(ImportIssue::new(
            IssueKind::MissingIdentifier,
            row_ref,
            "member row is not an object; skipped",
        ));
        return None;
    };

    let mut fields: Vec<(PersonField, &str, &Value)> = Vec::new();
    let mut unmapped: Vec<&str> = Vec::new();
    for (key, field_value) in record {
        match PersonField::from_key(key) {
            Some(field) => {
                if let Some((_, first_key, _)) = fields.iter().find(|(seen, _, _)| *seen == field)
                {
                    issues.push(ImportIssue::new(
                        IssueKind::InvalidField,
                        row_ref.clone(),
                        format!("field `{key}` repeats `{first_key}`; ignored"),
                    ));
                    continue;
                }
                fields.push((field, key.as_str(), field_value));
            }
            None => unmapped.push(key.as_str()),
        }
    }

    let id = match field(&fields, PersonField::Id).map(text_value) {
        Some(Ok(Some(id))) => id,
        Some(Err(reason)) => {
            issues.push(ImportIssue::new(
                IssueKind::MissingIdentifier,
                row_ref,
                format!("member id is unusable ({reason}); skipped"),
            ));
            return None;
        }
        Some(Ok(None)) | None => {
            issues.push(ImportIssue::new(
                IssueKind::MissingIdentifier,
                row_ref,
                "member row has no id; skipped",
            ));
            return None;
        }
    };

    let mut person = Person::new(id);
    let mut invalid = |name: &str, reason: String| {
        issues.push(ImportIssue::new(
            IssueKind::InvalidField,
            row_ref.clone(),
            format!("field `{name}` ignored: {reason}"),
        ));
    };

    if let Some(value) = field(&fields, PersonField::FirstName) {
        match text_value(value) {
            Ok(text) => person.first_name = text.unwrap_or_default(),
            Err(reason) => invalid("firstName", reason),
        }
    }
    if let Some(value) = field(&fields, PersonField::LastName) {
        match text_value(value) {
            Ok(text) => person.last_name = text.unwrap_or_default(),
            Err(reason) => invalid("lastName", reason),
        }
    }
    if let Some(value) = field(&fields, PersonField::FullName) {
        match text_value(value) {
            Ok(Some(full)) if person.first_name.is_empty() && person.last_name.is_empty() => {
                let (first, last) = split_full_name(&full);
                person.first_name = first;
                person.last_name = last;
            }
            Ok(_) => {}
            Err(reason) => invalid("name", reason),
        }
    }
    if let Some(value) = field(&fields, PersonField::BirthDate) {
        match parse_date(value, options.format) {
            Ok(date) => person.birth_date = date,
            Err(reason) => invalid("birthDate", reason),
        }
    }
    if let Some(value) = field(&fields, PersonField::Gender) {
        match text_value(value) {
            Ok(text) => person.gender = text.as_deref().and_then(Gender::parse),
            Err(reason) => invalid("gender", reason),
        }
    }
    if let Some(value) = field(&fields, PersonField::Avatar) {
        match text_value(value) {
            Ok(text) => person.avatar = text,
            Err(reason) => invalid("avatar", reason),
        }
    }

    let mut draft = PersonDraft::new(row, person);
    let mut collector = RelationCollector {
        owner: draft.person.id.clone(),
        row_ref: row_ref.clone(),
        relations: Vec::new(),
    };
    if let Some(value) = field(&fields, PersonField::Relations) {
        collector.collect_nested(value, options.format, issues);
    }
    for (column, kind) in [
        (PersonField::Parents, RelationType::Parent),
        (PersonField::Children, RelationType::Child),
        (PersonField::Spouses, RelationType::Spouse),
    ] {
        if let Some(value) = field(&fields, column) {
            collector.collect_flattened(value, kind, issues);
        }
    }
    draft.relations = collector.relations;

    if options.report_unmapped_fields && !unmapped.is_empty() {
        issues.push(ImportIssue::new(
            IssueKind::UnmappedField,
            row_ref,
            format!("unmapped fields ignored: {}", unmapped.join(", ")),
        ));
    }

    Some(draft)
}

fn field<'a>(fields: &[(PersonField, &str, &'a Value)], wanted: PersonField) -> Option<&'a Value> {
    fields
        .iter()
        .find(|(field, _, _)| *field == wanted)
        .map(|(_, _, value)| *value)
}

struct RelationCollector {
    owner: String,
    row_ref: RecordRef,
    relations: Vec<Relation>,
}

impl RelationCollector {
    fn push(&mut self, id: Option<String>, kind: RelationType, target: String) {
        let position = self.relations.len();
        let id = id.unwrap_or_else(|| declared_relation_id(&self.owner, position, kind, &target));
        self.relations.push(Relation::new(id, kind, target));
    }

    fn warn(&self, issues: &mut Vec<ImportIssue>, message: String) {
        issues.push(ImportIssue::new(
            IssueKind::InvalidField,
            self.row_ref.clone(),
            message,
        ));
    }

    /// Reads `relations: [{ type, personId }]`, or its string-encoded form
    /// from spreadsheet cells.
    fn collect_nested(&mut self, value: &Value, format: SourceFormat, issues: &mut Vec<ImportIssue>) {
        let decoded;
        let entries = match value {
            Value::Null => return,
            Value::Array(entries) => entries,
            Value::String(text) if text.trim().is_empty() => return,
            Value::String(text) if format.is_tabular() => {
                decoded = match serde_json::from_str::<Value>(text) {
                    Ok(Value::Array(entries)) => entries,
                    _ => {
                        self.warn(
                            issues,
                            "field `relations` ignored: cell is not a JSON array".to_string(),
                        );
                        return;
                    }
                };
                &decoded
            }
            _ => {
                self.warn(
                    issues,
                    "field `relations` ignored: expected an array".to_string(),
                );
                return;
            }
        };

        for (position, entry) in entries.iter().enumerate() {
            let Some(entry) = entry.as_object() else {
                self.warn(
                    issues,
                    format!("relation #{position} ignored: expected an object"),
                );
                continue;
            };

            let kind = match lookup(entry, RELATION_TYPE_KEYS).map(|(_, value)| text_value(value)) {
                Some(Ok(Some(text))) => match RelationType::parse(&text) {
                    Some(kind) => kind,
                    None => {
                        self.warn(
                            issues,
                            format!("relation #{position} ignored: unknown type `{text}`"),
                        );
                        continue;
                    }
                },
                _ => {
                    self.warn(issues, format!("relation #{position} ignored: missing type"));
                    continue;
                }
            };

            let target = match lookup(entry, RELATION_TARGET_KEYS).map(|(_, value)| text_value(value))
            {
                Some(Ok(Some(target))) => target,
                _ => {
                    self.warn(
                        issues,
                        format!("relation #{position} ignored: missing target person id"),
                    );
                    continue;
                }
            };

            let id = lookup(entry, RELATION_ID_KEYS)
                .and_then(|(_, value)| text_value(value).ok().flatten());
            self.push(id, kind, target);
        }
    }

    /// Reads flattened columns such as `parentIds: "3;4"` or `spouses: [5]`.
    fn collect_flattened(&mut self, value: &Value, kind: RelationType, issues: &mut Vec<ImportIssue>) {
        let targets = match value {
            Value::Array(items) => {
                let mut targets = Vec::new();
                for item in items {
                    match text_value(item) {
                        Ok(Some(target)) => targets.push(target),
                        Ok(None) => {}
                        Err(reason) => self.warn(
                            issues,
                            format!("{kind} id ignored: {reason}"),
                        ),
                    }
                }
                targets
            }
            other => match text_value(other) {
                Ok(Some(text)) => split_id_list(&text),
                Ok(None) => Vec::new(),
                Err(reason) => {
                    self.warn(issues, format!("{kind} ids ignored: {reason}"));
                    Vec::new()
                }
            },
        };

        for target in targets {
            self.push(None, kind, target);
        }
    }
}
