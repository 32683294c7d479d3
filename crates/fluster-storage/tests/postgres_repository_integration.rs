//! Requires a container runtime: `cargo test -p fluster-storage -- --ignored`.

use std::time::Duration;

use fluster_core::base58::encode;
use fluster_storage::{
    PgSslMode, PostgresRepository, PostgresSettings, Repository, StorageError,
};
use fluster_test_infra::postgres::{PostgresConfig, PostgresServer};

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRepository,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");

        let settings = PostgresSettings::builder()
            .host(postgres.host().await.expect("postgres host"))
            .port(postgres.port().await.expect("postgres port"))
            .user(postgres.username())
            .password(postgres.password())
            .database(postgres.database())
            .ssl_mode(PgSslMode::Disable)
            .build();

        let repo = connect_with_retry(&settings).await;
        repo.migrate().await.expect("apply migrations");

        Self {
            _postgres: postgres,
            repo,
        }
    }
}

async fn connect_with_retry(settings: &PostgresSettings) -> PostgresRepository {
    let mut last_error = None;

    for _ in 0..20 {
        match PostgresRepository::connect(settings).await {
            Ok(repo) => return repo,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn insert_attach_and_resolve() {
    let fixture = Fixture::start().await;

    let key = fixture.repo.insert("https://example.com").await.unwrap();
    let code = encode(key);
    fixture.repo.attach_short_code(key, &code).await.unwrap();

    let url = fixture.repo.resolve(&code).await.unwrap();
    assert_eq!(url, "https://example.com");
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn keys_are_unique_and_increasing() {
    let fixture = Fixture::start().await;

    let first = fixture.repo.insert("https://one.example").await.unwrap();
    let second = fixture.repo.insert("https://two.example").await.unwrap();

    assert!(first >= 1);
    assert!(second > first);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn unattached_record_is_not_resolvable() {
    let fixture = Fixture::start().await;

    let key = fixture.repo.insert("https://example.com").await.unwrap();

    let err = fixture.repo.resolve(&encode(key)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn attach_to_missing_record_fails() {
    let fixture = Fixture::start().await;

    let err = fixture
        .repo
        .attach_short_code(4242, &encode(4242))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingRecord(4242)));
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn attach_duplicate_code_conflicts() {
    let fixture = Fixture::start().await;

    let first = fixture.repo.insert("https://one.example").await.unwrap();
    let second = fixture.repo.insert("https://two.example").await.unwrap();
    fixture
        .repo
        .attach_short_code(first, &encode(first))
        .await
        .unwrap();

    let err = fixture
        .repo
        .attach_short_code(second, &encode(first))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn discard_removes_only_unattached_rows() {
    let fixture = Fixture::start().await;

    let orphan = fixture.repo.insert("https://orphan.example").await.unwrap();
    let live = fixture.repo.insert("https://live.example").await.unwrap();
    fixture
        .repo
        .attach_short_code(live, &encode(live))
        .await
        .unwrap();

    assert!(fixture.repo.discard(orphan).await.unwrap());
    assert!(!fixture.repo.discard(live).await.unwrap());
    assert_eq!(
        fixture.repo.resolve(&encode(live)).await.unwrap(),
        "https://live.example"
    );
}
