use homeview_core::db::open_db_in_memory;
use homeview_core::{
    quickview_path, view_path, Document, DocumentRepository, FieldProjector, PutOutcome,
    SqliteDocumentRepository, ViewQuery, ViewService, ViewServiceError,
};
use serde_json::json;

fn listing(id: &str, status: &str, price: i64) -> Document {
    Document::new(id)
        .with_field("status", status)
        .with_field("list_price", price)
        .with_field("full_address", format!("{id} Main St"))
}

#[test]
fn quickview_is_registered_and_built_from_existing_documents() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::new(&conn);
    repo.put_document(&listing("b", "Active", 400_000)).unwrap();
    repo.put_document(&listing("a", "Active", 350_000)).unwrap();
    repo.put_document(&Document::new("_design/simpleViews")).unwrap();

    let service = ViewService::new(&repo).unwrap();
    assert_eq!(service.view_names().collect::<Vec<_>>(), vec!["simpleViews/quickview"]);

    let result = service
        .query(&quickview_path(), &ViewQuery::default())
        .unwrap();
    assert_eq!(result.total_rows, 2);
    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(result.rows[0].value[8], json!(350_000));
}

#[test]
fn writes_flow_through_to_indexes() {
    let conn = open_db_in_memory().unwrap();
    let mut service = ViewService::new(SqliteDocumentRepository::new(&conn)).unwrap();
    let path = quickview_path();

    service.put_document(&listing("a", "Active", 1)).unwrap();
    service.put_document(&listing("b", "Active", 2)).unwrap();
    service.put_document(&listing("a", "Closed", 1)).unwrap();

    let a = service.query(&path, &ViewQuery::by_key("a")).unwrap();
    assert_eq!(a.rows[0].value[0], json!("Closed"));
    assert_eq!(a.total_rows, 2);

    service.delete_document("b").unwrap();
    let all = service.query(&path, &ViewQuery::default()).unwrap();
    assert_eq!(all.ids().collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn unchanged_writes_report_existing_revision() {
    let conn = open_db_in_memory().unwrap();
    let mut service = ViewService::new(SqliteDocumentRepository::new(&conn)).unwrap();

    let first = service.put_document(&listing("a", "Active", 1)).unwrap();
    let second = service.put_document(&listing("a", "Active", 1)).unwrap();

    assert_eq!(second, PutOutcome::Unchanged { rev: first.rev().to_string() });
}

#[test]
fn include_docs_attaches_stored_documents() {
    let conn = open_db_in_memory().unwrap();
    let mut service = ViewService::new(SqliteDocumentRepository::new(&conn)).unwrap();
    let outcome = service.put_document(&listing("a", "Active", 1)).unwrap();

    let mut query = ViewQuery::by_key("a");
    query.include_docs = true;
    let result = service.query(&quickview_path(), &query).unwrap();

    let doc = result.rows[0].doc.as_ref().unwrap();
    assert_eq!(doc["_id"], "a");
    assert_eq!(doc["_rev"], outcome.rev());
    assert_eq!(doc["full_address"], "a Main St");
}

#[test]
fn custom_views_are_built_and_maintained() {
    let conn = open_db_in_memory().unwrap();
    let mut service = ViewService::new(SqliteDocumentRepository::new(&conn)).unwrap();
    service.put_document(&listing("a", "Active", 500)).unwrap();
    service.put_document(&listing("b", "Active", 300)).unwrap();

    let by_price = view_path("simpleViews", "byPrice");
    service
        .register_view(
            by_price.clone(),
            Box::new(FieldProjector::new("byPrice", "list_price", ["full_address"])),
        )
        .unwrap();
    service.put_document(&listing("c", "Active", 400)).unwrap();

    let result = service
        .query(&by_price, &ViewQuery::range(300, 450))
        .unwrap();
    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["b", "c"]);
    assert_eq!(result.rows[0].value, json!(["b Main St"]));

    let err = service
        .register_view(by_price, Box::new(FieldProjector::quickview()))
        .unwrap_err();
    assert!(matches!(err, ViewServiceError::DuplicateView(_)));
}

#[test]
fn rebuild_all_picks_up_out_of_band_writes() {
    let conn = open_db_in_memory().unwrap();
    let mut service = ViewService::new(SqliteDocumentRepository::new(&conn)).unwrap();

    SqliteDocumentRepository::new(&conn)
        .put_document(&listing("side-door", "Active", 1))
        .unwrap();
    let before = service.query(&quickview_path(), &ViewQuery::default()).unwrap();
    assert_eq!(before.total_rows, 0);

    assert_eq!(service.rebuild_all().unwrap(), 1);
    let after = service.query(&quickview_path(), &ViewQuery::default()).unwrap();
    assert_eq!(after.ids().collect::<Vec<_>>(), vec!["side-door"]);
}

#[test]
fn unknown_view_is_an_error() {
    let conn = open_db_in_memory().unwrap();
    let service = ViewService::new(SqliteDocumentRepository::new(&conn)).unwrap();

    let err = service
        .query("simpleViews/urlList", &ViewQuery::default())
        .unwrap_err();
    assert!(matches!(err, ViewServiceError::UnknownView(name) if name == "simpleViews/urlList"));
}
