use chrono::NaiveDate;
use lineage_core::{
    normalize_batch, normalize_records, Collection, Gender, ImportBatch, ImportOptions, IssueKind,
    RecordRef, RelationType, SourceFormat,
};
use serde_json::{json, Value};

fn json_options() -> ImportOptions {
    ImportOptions::default()
}

#[test]
fn bad_rows_are_skipped_without_aborting_the_batch() {
    let records = vec![
        json!({ "id": "1", "firstName": "Ada" }),
        json!({ "firstName": "Nobody" }),
        json!("not a record"),
        json!({ "id": "1", "firstName": "Again" }),
        json!({ "id": 2 }),
    ];

    let batch = normalize_records(&records, &json_options());

    let ids: Vec<&str> = batch.members.iter().map(|draft| draft.id()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(batch.members[0].person.first_name, "Ada");

    let kinds: Vec<(IssueKind, RecordRef)> = batch
        .issues
        .iter()
        .map(|issue| (issue.kind, issue.record.clone()))
        .collect();
    let row = |index| RecordRef::Row {
        collection: Collection::Members,
        index,
    };
    assert_eq!(
        kinds,
        vec![
            (IssueKind::MissingIdentifier, row(1)),
            (IssueKind::MissingIdentifier, row(2)),
            (IssueKind::DuplicateIdentifier, row(3)),
        ]
    );
}

#[test]
fn heterogeneous_field_names_map_to_one_person_shape() {
    let records = vec![
        json!({
            "Member ID": "7",
            "Given Name": " Grace ",
            "surname": "Hopper",
            "DOB": "1906-12-09",
            "Sex": "female",
            "photo_url": "https://img.example/g.png"
        }),
        json!({ "id": "8", "full_name": "Alan Mathison Turing", "gender": "nonbinary" }),
    ];

    let batch = normalize_records(&records, &json_options());
    assert!(batch.issues.is_empty(), "unexpected issues: {:?}", batch.issues);

    let grace = &batch.members[0].person;
    assert_eq!(grace.id, "7");
    assert_eq!(grace.first_name, "Grace");
    assert_eq!(grace.last_name, "Hopper");
    assert_eq!(grace.birth_date, NaiveDate::from_ymd_opt(1906, 12, 9));
    assert_eq!(grace.gender, Some(Gender::Female));
    assert_eq!(grace.avatar.as_deref(), Some("https://img.example/g.png"));

    let alan = &batch.members[1].person;
    assert_eq!(alan.first_name, "Alan Mathison");
    assert_eq!(alan.last_name, "Turing");
    assert_eq!(alan.gender, Some(Gender::Other("nonbinary".to_string())));
}

#[test]
fn invalid_field_values_are_dropped_with_a_warning() {
    let records = vec![json!({ "id": "1", "birthDate": "12th of never", "firstName": true })];

    let batch = normalize_records(&records, &json_options());

    assert_eq!(batch.members.len(), 1);
    let person = &batch.members[0].person;
    assert_eq!(person.birth_date, None);
    assert!(person.first_name.is_empty());
    assert_eq!(batch.issues.len(), 2);
    assert!(batch
        .issues
        .iter()
        .all(|issue| issue.kind == IssueKind::InvalidField && !issue.is_fatal()));
}

#[test]
fn spreadsheet_serial_dates_only_apply_to_xlsx() {
    let records = vec![json!({ "id": "1", "birthDate": 18264 })];

    let xlsx = normalize_records(&records, &ImportOptions::with_format(SourceFormat::Xlsx));
    assert_eq!(
        xlsx.members[0].person.birth_date,
        NaiveDate::from_ymd_opt(1950, 1, 1)
    );
    assert!(xlsx.issues.is_empty());

    let json = normalize_records(&records, &json_options());
    assert_eq!(json.members[0].person.birth_date, None);
    assert_eq!(json.issues[0].kind, IssueKind::InvalidField);
}

#[test]
fn tabular_cells_carry_relations_as_text() {
    let records = vec![
        json!({
            "id": "1",
            "relations": r#"[{"type":"father","personId":"2"}]"#,
            "children": "3|4"
        }),
        json!({ "id": "2" }),
    ];

    let batch = normalize_records(&records, &ImportOptions::with_format(SourceFormat::Csv));
    assert!(batch.issues.is_empty(), "unexpected issues: {:?}", batch.issues);

    let relations: Vec<(RelationType, &str)> = batch.members[0]
        .relations
        .iter()
        .map(|relation| (relation.kind, relation.target.as_str()))
        .collect();
    assert_eq!(
        relations,
        vec![
            (RelationType::Parent, "2"),
            (RelationType::Child, "3"),
            (RelationType::Child, "4"),
        ]
    );
}

#[test]
fn string_relations_are_rejected_for_json_sources() {
    let records = vec![json!({ "id": "1", "relations": "[]" })];

    let batch = normalize_records(&records, &json_options());

    assert!(batch.members[0].relations.is_empty());
    assert_eq!(batch.issues.len(), 1);
    assert_eq!(batch.issues[0].kind, IssueKind::InvalidField);
}

#[test]
fn malformed_relation_entries_are_skipped_individually() {
    let records = vec![json!({
        "id": "1",
        "relations": [
            { "type": "cousin", "personId": "2" },
            { "type": "spouse" },
            42,
            { "id": "keep", "type": "wife", "personId": "3" }
        ]
    })];

    let batch = normalize_records(&records, &json_options());

    let relations = &batch.members[0].relations;
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].id, "keep");
    assert_eq!(relations[0].kind, RelationType::Spouse);
    assert_eq!(batch.issues.len(), 3);
}

#[test]
fn generated_relation_ids_are_stable_across_runs() {
    let records = vec![json!({ "id": "1", "parentIds": [2, 3] })];

    let first = normalize_records(&records, &json_options());
    let second = normalize_records(&records, &json_options());

    assert_eq!(first, second);
    let ids: Vec<&str> = first.members[0]
        .relations
        .iter()
        .map(|relation| relation.id.as_str())
        .collect();
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn unmapped_fields_warn_unless_disabled() {
    let records = vec![json!({ "id": "1", "nickname": "Bunny", "favouriteColour": "red" })];

    let reported = normalize_records(&records, &json_options());
    assert_eq!(reported.issues.len(), 1);
    assert_eq!(reported.issues[0].kind, IssueKind::UnmappedField);
    assert!(reported.issues[0].message.contains("nickname"));

    let mut quiet = json_options();
    quiet.report_unmapped_fields = false;
    assert!(normalize_records(&records, &quiet).issues.is_empty());
}

#[test]
fn batch_objects_only_accept_known_collections() {
    assert!(ImportBatch::from_value(json!({ "id": "1", "firstName": "Ada" })).is_err());
    assert!(ImportBatch::from_value(json!({ "people": [{ "id": "1" }] })).is_err());
    assert!(ImportBatch::from_value(json!({ "members": { "id": "1" } })).is_err());

    let empty = ImportBatch::from_value(json!({})).unwrap();
    assert_eq!(empty.row_count(), 0);
    let members = ImportBatch::from_value(json!({ "members": [{ "id": "1" }] })).unwrap();
    assert_eq!(members.row_count(), 1);
}

#[test]
fn auxiliary_collections_are_counted_and_deduplicated() {
    let raw: Value = json!({
        "members": [{ "id": "1" }, { "id": "2" }],
        "stories": [
            { "id": "s1", "title": "Wedding", "memberIds": "1; 2; 1" },
            { "id": "s1" },
            { "title": "no id" }
        ],
        "locations": [{ "id": "l1" }],
        "media": [{ "id": "m1" }, { "uuid": "m2" }],
        "artifacts": []
    });
    let batch = ImportBatch::from_value(raw).unwrap();

    let normalized = normalize_batch(&batch, &json_options());

    assert_eq!(normalized.members.len(), 2);
    assert_eq!(normalized.stories.len(), 1);
    assert_eq!(normalized.stories[0].title.as_deref(), Some("Wedding"));
    assert_eq!(normalized.stories[0].member_ids, vec!["1", "2"]);
    assert_eq!(normalized.locations.len(), 1);
    assert_eq!(normalized.media.len(), 2);
    assert!(normalized.artifacts.is_empty());

    let kinds: Vec<IssueKind> = normalized.issues.iter().map(|issue| issue.kind).collect();
    assert_eq!(
        kinds,
        vec![IssueKind::DuplicateIdentifier, IssueKind::MissingIdentifier]
    );
}
