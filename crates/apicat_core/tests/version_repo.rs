use apicat_core::db::open_db_in_memory;
use apicat_core::{
    FsBlobStore, MetadataVersionRepository, RepoError, RepoErrorKind, SqliteMetadataStore,
    VersionRecord, VersionRepository,
};

const TABLE: &str = "versions";

fn version(service_id: &str, version: &str, path: &str) -> VersionRecord {
    VersionRecord {
        service_id: service_id.to_string(),
        version: version.to_string(),
        path: path.to_string(),
        last_updated: 1000,
        enabled: true,
        tag: "latest".to_string(),
    }
}

fn blob_store() -> FsBlobStore {
    FsBlobStore::new(std::env::temp_dir().join("apicat-version-repo-unused"))
}

#[test]
fn unknown_service_has_no_versions() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);

    assert!(repo.get_all_versions("S1").unwrap().is_empty());
}

#[test]
fn create_version_then_list_returns_it() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);

    let created = repo.create_version(&version("S1", "1.0.0", "k1")).unwrap();
    assert_eq!(created, version("S1", "1.0.0", "k1"));
    assert_eq!(
        repo.get_all_versions("S1").unwrap(),
        vec![version("S1", "1.0.0", "k1")]
    );
}

#[test]
fn duplicate_version_is_already_exists_and_keeps_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);
    repo.create_version(&version("S1", "1.0.0", "k1")).unwrap();

    let err = repo
        .create_version(&version("S1", "1.0.0", "k2"))
        .unwrap_err();

    assert!(matches!(err, RepoError::AlreadyExists(_)));
    assert_eq!(repo.get_all_versions("S1").unwrap()[0].path, "k1");
}

#[test]
fn same_version_under_different_services_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);

    repo.create_version(&version("S1", "1.0.0", "a")).unwrap();
    repo.create_version(&version("S2", "1.0.0", "b")).unwrap();

    assert_eq!(repo.get_all_versions("S1").unwrap().len(), 1);
    assert_eq!(repo.get_all_versions("S2").unwrap().len(), 1);
}

#[test]
fn empty_key_parts_are_invalid_argument() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);

    let err = repo.create_version(&version("S1", "", "k")).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InvalidArgument);

    let err = repo.update_version(&version("", "1.0.0", "k")).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::InvalidArgument);

    assert!(repo.get_all_versions("S1").unwrap().is_empty());
}

#[test]
fn update_missing_version_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);

    let err = repo
        .update_version(&version("S1", "9.9.9", "k"))
        .unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::NotFound);
    assert!(err.to_string().contains("9.9.9"));
    assert!(repo.get_all_versions("S1").unwrap().is_empty());
}

#[test]
fn update_requires_both_key_components_to_exist() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);
    repo.create_version(&version("S1", "1.0.0", "k1")).unwrap();

    let err = repo
        .update_version(&version("S1", "2.0.0", "k2"))
        .unwrap_err();

    assert_eq!(err.kind(), RepoErrorKind::NotFound);
    assert_eq!(repo.get_all_versions("S1").unwrap().len(), 1);
}

#[test]
fn update_replaces_every_non_key_attribute() {
    let conn = open_db_in_memory().unwrap();
    let repo = MetadataVersionRepository::new(SqliteMetadataStore::new(&conn), blob_store(), TABLE);
    repo.create_version(&version("S1", "1.0.0", "k1")).unwrap();

    let replacement = VersionRecord {
        path: "k2".to_string(),
        last_updated: 2000,
        enabled: false,
        tag: "deprecated".to_string(),
        ..version("S1", "1.0.0", "")
    };
    let updated = repo.update_version(&replacement).unwrap();

    assert_eq!(updated, replacement);
    assert_eq!(repo.get_all_versions("S1").unwrap(), vec![replacement]);
}

#[test]
fn versions_are_listed_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteMetadataStore::new(&conn).with_page_size(2);
    let repo = MetadataVersionRepository::new(store, blob_store(), TABLE);
    let created = ["2.0.0", "1.0.0", "1.5.0", "0.1.0", "3.0.0"];
    for ver in created {
        repo.create_version(&version("S1", ver, ver)).unwrap();
        repo.create_version(&version("S2", ver, ver)).unwrap();
    }

    let listed: Vec<String> = repo
        .get_all_versions("S1")
        .unwrap()
        .into_iter()
        .map(|record| record.version)
        .collect();
    assert_eq!(listed, created);
}
