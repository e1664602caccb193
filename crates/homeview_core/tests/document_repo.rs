use homeview_core::db::open_db_in_memory;
use homeview_core::{
    Document, DocumentError, DocumentListQuery, DocumentRepository, PutOutcome, RepoError,
    SqliteDocumentRepository,
};
use serde_json::json;

fn generation(rev: &str) -> u32 {
    rev.split_once('-').unwrap().0.parse().unwrap()
}

#[test]
fn put_then_get_stamps_id_and_rev() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    let doc = Document::new("home-1")
        .with_field("status", "Active")
        .with_field("beds", 3);
    let outcome = repo.put_document(&doc).unwrap();
    assert!(matches!(outcome, PutOutcome::Created { .. }));
    assert_eq!(generation(outcome.rev()), 1);

    let loaded = repo.get_document("home-1", false).unwrap().unwrap();
    assert_eq!(loaded.id(), Some("home-1"));
    assert_eq!(loaded.rev(), Some(outcome.rev()));
    assert_eq!(loaded.field("status"), Some(&json!("Active")));
    assert_eq!(loaded.field("beds"), Some(&json!(3)));
}

#[test]
fn identical_put_is_skipped() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    let doc = Document::new("home-1").with_field("status", "Active");
    let first = repo.put_document(&doc).unwrap();
    let second = repo.put_document(&doc).unwrap();

    assert_eq!(second, PutOutcome::Unchanged { rev: first.rev().to_string() });
    assert!(!second.is_written());
}

#[test]
fn scrape_metadata_alone_does_not_create_a_revision() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    let first = Document::new("home-1")
        .with_field("status", "Active")
        .with_field("scrape_data", json!({"date": "2020-01-01"}));
    let rescraped = Document::new("home-1")
        .with_field("status", "Active")
        .with_field("scrape_data", json!({"date": "2020-03-09"}));

    repo.put_document(&first).unwrap();
    let outcome = repo.put_document(&rescraped).unwrap();
    assert!(matches!(outcome, PutOutcome::Unchanged { .. }));
}

#[test]
fn changed_put_bumps_generation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    repo.put_document(&Document::new("home-1").with_field("status", "Active"))
        .unwrap();
    let outcome = repo
        .put_document(&Document::new("home-1").with_field("status", "Closed"))
        .unwrap();

    assert!(matches!(outcome, PutOutcome::Updated { .. }));
    assert_eq!(generation(outcome.rev()), 2);
    let loaded = repo.get_document("home-1", false).unwrap().unwrap();
    assert_eq!(loaded.field("status"), Some(&json!("Closed")));
}

#[test]
fn invalid_ids_are_rejected_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    let missing = Document::default().with_field("status", "Active");
    let err = repo.put_document(&missing).unwrap_err();
    assert!(matches!(err, RepoError::Document(DocumentError::MissingId)));

    let reserved = Document::new("_users");
    let err = repo.put_document(&reserved).unwrap_err();
    assert!(matches!(err, RepoError::Document(DocumentError::InvalidId(_))));

    let design = Document::new("_design/simpleViews");
    assert!(repo.put_document(&design).is_ok());
}

#[test]
fn delete_tombstones_and_hides_document() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    repo.put_document(&Document::new("home-1")).unwrap();
    assert!(repo.contains_document("home-1").unwrap());

    let rev = repo.delete_document("home-1").unwrap();
    assert_eq!(generation(&rev), 2);
    assert!(!repo.contains_document("home-1").unwrap());
    assert!(repo.get_document("home-1", false).unwrap().is_none());

    let tombstone = repo.get_document("home-1", true).unwrap().unwrap();
    assert_eq!(tombstone.rev(), Some(rev.as_str()));

    let err = repo.delete_document("home-1").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == "home-1"));
}

#[test]
fn put_on_tombstone_resurrects_document() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    let doc = Document::new("home-1").with_field("status", "Active");
    repo.put_document(&doc).unwrap();
    repo.delete_document("home-1").unwrap();

    let outcome = repo.put_document(&doc).unwrap();
    assert!(matches!(outcome, PutOutcome::Updated { .. }));
    assert_eq!(generation(outcome.rev()), 3);
    assert!(repo.contains_document("home-1").unwrap());
}

#[test]
fn list_documents_orders_by_id_and_paginates() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    for id in ["c", "a", "d", "b"] {
        repo.put_document(&Document::new(id)).unwrap();
    }
    repo.delete_document("d").unwrap();

    let all = repo.list_documents(&DocumentListQuery::default()).unwrap();
    let ids = all.iter().filter_map(Document::id).collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let page = repo
        .list_documents(&DocumentListQuery {
            include_deleted: true,
            limit: Some(2),
            offset: 2,
        })
        .unwrap();
    let ids = page.iter().filter_map(Document::id).collect::<Vec<_>>();
    assert_eq!(ids, vec!["c", "d"]);
}

#[test]
fn corrupt_body_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO documents (doc_id, generation, rev, body, is_deleted)
         VALUES ('broken', 1, '1-00000000000000000000000000000000', '[1, 2]', 0);",
        [],
    )
    .unwrap();
    let repo = SqliteDocumentRepository::new(&conn);

    let err = repo.get_document("broken", false).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
