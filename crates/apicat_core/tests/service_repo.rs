use apicat_core::db::{open_db, open_db_in_memory};
use apicat_core::{
    MetadataServiceRepository, RepoError, RepoErrorKind, ServiceRecord, ServiceRepository,
    ServiceUpdate, SqliteMetadataStore,
};
use std::sync::{Arc, Barrier};
use std::thread;

const TABLE: &str = "services";

fn auth_service() -> ServiceRecord {
    ServiceRecord::new("S1", "auth", "0.0.0", 1000)
}

#[test]
fn create_then_get_returns_identical_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);

    repo.create_service(&auth_service()).unwrap();

    let loaded = repo.get_service("S1").unwrap().unwrap();
    assert_eq!(loaded, auth_service());
}

#[test]
fn create_with_taken_id_fails_and_keeps_first_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
    repo.create_service(&auth_service()).unwrap();

    let duplicate = ServiceRecord::new("S1", "billing", "9.9.9", 2000);
    let err = repo.create_service(&duplicate).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyExists(_)));

    let stored = repo.get_service("S1").unwrap().unwrap();
    assert_eq!(stored, auth_service());
}

#[test]
fn get_missing_service_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);

    assert!(repo.get_service("missing").unwrap().is_none());
}

#[test]
fn update_name_keeps_other_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
    repo.create_service(&auth_service()).unwrap();

    let updated = repo
        .update_service(&ServiceUpdate::for_id("S1").name("audit"))
        .unwrap();

    assert_eq!(updated.id, "S1");
    assert_eq!(updated.name, "audit");
    assert_eq!(updated.latest_version, "0.0.0");
    assert_eq!(updated.last_updated, 1000);
    assert_eq!(repo.get_service("S1").unwrap().unwrap(), updated);
}

#[test]
fn update_sets_every_supplied_field_and_last_change_wins() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
    repo.create_service(&auth_service()).unwrap();

    let update = ServiceUpdate::for_id("S1")
        .latest_version("1.0.0")
        .last_updated(2000)
        .latest_version("1.1.0");
    let updated = repo.update_service(&update).unwrap();

    assert_eq!(updated.name, "auth");
    assert_eq!(updated.latest_version, "1.1.0");
    assert_eq!(updated.last_updated, 2000);
}

#[test]
fn update_unknown_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);

    let err = repo
        .update_service(&ServiceUpdate::for_id("missing").name("x"))
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::NotFound);
    assert!(repo.get_service("missing").unwrap().is_none());
}

#[test]
fn update_without_fields_is_invalid_whether_or_not_id_exists() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
    repo.create_service(&auth_service()).unwrap();

    for id in ["S1", "missing"] {
        let err = repo.update_service(&ServiceUpdate::for_id(id)).unwrap_err();
        assert!(
            matches!(err, RepoError::InvalidArgument(ref message) if message.contains("nothing to update")),
            "unexpected error for `{id}`: {err}"
        );
    }
}

#[test]
fn update_without_id_is_invalid_argument() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);

    let missing_id = ServiceUpdate {
        id: None,
        ..ServiceUpdate::for_id("ignored").name("x")
    };
    let err = repo.update_service(&missing_id).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InvalidArgument);

    let empty_id = ServiceUpdate::for_id("").name("x");
    let err = repo.update_service(&empty_id).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InvalidArgument);
}

#[test]
fn empty_id_is_invalid_argument_on_every_keyed_call() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);

    let err = repo.get_service("").unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InvalidArgument);

    let err = repo.delete_service("").unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InvalidArgument);

    let err = repo
        .create_service(&ServiceRecord::new("", "auth", "0.0.0", 1000))
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InvalidArgument);
    assert!(repo.get_service_list().unwrap().is_empty());
}

#[test]
fn service_list_returns_every_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
    assert!(repo.get_service_list().unwrap().is_empty());

    repo.create_service(&auth_service()).unwrap();
    repo.create_service(&ServiceRecord::new("S2", "billing", "0.0.0", 1001))
        .unwrap();

    let mut ids: Vec<String> = repo
        .get_service_list()
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["S1".to_string(), "S2".to_string()]);
}

#[test]
fn delete_returns_prior_record_and_is_a_no_op_when_missing() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
    repo.create_service(&auth_service()).unwrap();

    let deleted = repo.delete_service("S1").unwrap();
    assert_eq!(deleted, Some(auth_service()));
    assert!(repo.get_service("S1").unwrap().is_none());

    assert!(repo.delete_service("S1").unwrap().is_none());
}

#[test]
fn deleted_id_can_be_created_again() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
    repo.create_service(&auth_service()).unwrap();
    repo.delete_service("S1").unwrap();

    let recreated = ServiceRecord::new("S1", "auth2", "0.0.0", 3000);
    repo.create_service(&recreated).unwrap();
    assert_eq!(repo.get_service("S1").unwrap().unwrap(), recreated);
}

#[test]
fn tables_sharing_one_store_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteMetadataStore::new(&conn);
    let prod = MetadataServiceRepository::new(store, "services_prod");
    let dev = MetadataServiceRepository::new(store, "services_dev");

    prod.create_service(&auth_service()).unwrap();
    dev.create_service(&auth_service()).unwrap();

    dev.update_service(&ServiceUpdate::for_id("S1").name("dev-auth"))
        .unwrap();
    assert_eq!(prod.get_service("S1").unwrap().unwrap().name, "auth");
    assert_eq!(prod.get_service_list().unwrap().len(), 1);
}

#[test]
fn concurrent_creates_on_same_id_admit_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite3");
    drop(open_db(&path).unwrap());

    const WRITERS: usize = 4;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let repo = MetadataServiceRepository::new(SqliteMetadataStore::new(&conn), TABLE);
                let record = ServiceRecord::new("S1", format!("writer-{writer}"), "0.0.0", 1000);
                barrier.wait();
                repo.create_service(&record).map_err(|err| err.kind())
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1, "outcomes: {outcomes:?}");
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.err())
        .all(|kind| kind == RepoErrorKind::AlreadyExists));
}
