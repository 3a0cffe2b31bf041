//! Two connections to one database file, writing at the same time.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use serde_json::json;
use smarter_cli::application::ports::{Deletion, ResourceStore};
use smarter_cli::application::services::BrokerContext;
use smarter_cli::domain::manifest::{ManifestFormat, load};
use smarter_cli::domain::ResourceKey;
use smarter_cli::infra::SqliteStore;
use smarter_common::{Kind, Outcome, Verb};

use crate::helpers::{ACCOUNT, Fixture};

fn secret(name: &str, description: &str) -> String {
    json!({
        "apiVersion": "smarter.sh/v1",
        "kind": "Secret",
        "metadata": {"name": name, "description": description},
        "spec": {"value": "s3cr3t"},
    })
    .to_string()
}

#[test]
fn test_parallel_writers_on_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smarter.db");
    let fx = Fixture::with_store(Arc::new(SqliteStore::open(&path).unwrap()));
    let second = SqliteStore::open(&path).unwrap();
    let admin = fx.admin();

    let stores: [&dyn ResourceStore; 2] = [fx.store.as_ref(), &second];
    std::thread::scope(|scope| {
        for (writer, store) in stores.into_iter().enumerate() {
            let fx = &fx;
            let admin = &admin;
            scope.spawn(move || {
                let ctx = BrokerContext {
                    caller: admin,
                    store,
                    tasks: &fx.tasks,
                    config: &fx.config,
                };
                for n in 0..10 {
                    let raw = load(&secret(&format!("w{writer}-{n}"), "parallel"), Some(ManifestFormat::Json))
                        .unwrap();
                    let resp = fx.registry.apply(&ctx, &raw).unwrap();
                    assert_eq!(resp.outcome, Outcome::Created);

                    let raw = load(&secret("shared", &format!("from writer {writer}")), Some(ManifestFormat::Json))
                        .unwrap();
                    fx.registry.apply(&ctx, &raw).unwrap();
                }
            });
        }
    });

    assert_eq!(second.list(ACCOUNT, Kind::Secret).unwrap().len(), 21);
    assert_eq!(fx.store.list(ACCOUNT, Kind::Secret).unwrap().len(), 21);

    let key = smarter_cli::domain::ResourceKey::new(ACCOUNT, Kind::Secret, "shared");
    let shared = second.find(&key).unwrap().unwrap();
    assert!(shared.description.starts_with("from writer "));
    let created = second
        .events(&key)
        .unwrap()
        .into_iter()
        .filter(|e| e.event == smarter_cli::domain::EventKind::Created)
        .count();
    assert_eq!(created, 1);
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("smarter.db");
    {
        let fx = Fixture::with_store(Arc::new(SqliteStore::open(&path).unwrap()));
        fx.apply_value(&fx.admin(), &fx.example(Kind::Secret)).unwrap();
    }
    let reopened = SqliteStore::open(&path).unwrap();
    assert!(reopened.account_exists(ACCOUNT).unwrap());
    assert_eq!(reopened.list(ACCOUNT, Kind::Secret).unwrap().len(), 1);
}

#[test]
fn test_delete_never_strands_a_reference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smarter.db");
    let fx = Fixture::with_store(Arc::new(SqliteStore::open(&path).unwrap()));
    let second = SqliteStore::open(&path).unwrap();
    let admin = fx.admin();
    let secret = fx.example(Kind::Secret);
    let connection = fx.example(Kind::SqlConnection);

    std::thread::scope(|scope| {
        let (fx, admin) = (&fx, &admin);
        let (secret, connection) = (&secret, &connection);
        scope.spawn(move || {
            let ctx = fx.ctx(admin);
            for n in 0..20 {
                let raw = load(&secret.to_string(), Some(ManifestFormat::Json)).unwrap();
                fx.registry.apply(&ctx, &raw).unwrap();
                let raw = load(&connection.to_string(), Some(ManifestFormat::Json)).unwrap();
                if let Err(err) = fx.registry.apply(&ctx, &raw) {
                    // The secret was deleted between the two applies.
                    assert_eq!(err.code(), "ManifestValidationError", "{err}");
                    assert_eq!(err.fields()[0].path, "spec.password");
                }
                if n % 2 == 0 {
                    if let Err(err) = fx.registry.run(&ctx, Verb::Delete, "sqlconnection", Some("stackademy-sql")) {
                        assert_eq!(err.code(), "NotFoundError", "{err}");
                    }
                }
            }
        });
        let second = &second;
        scope.spawn(move || {
            let ctx = BrokerContext {
                caller: admin,
                store: second,
                tasks: &fx.tasks,
                config: &fx.config,
            };
            for _ in 0..20 {
                match fx
                    .registry
                    .run(&ctx, Verb::Delete, "secret", Some("stackademy-db-password"))
                {
                    Ok(resp) => assert_eq!(resp.outcome, Outcome::Deleted),
                    Err(err) => assert!(
                        matches!(err.code(), "PreconditionError" | "NotFoundError"),
                        "{err}"
                    ),
                }
            }
        });
    });

    for record in second.list(ACCOUNT, Kind::SqlConnection).unwrap() {
        for reference in &record.references {
            let target = record.key.sibling(reference.kind, &reference.name);
            assert!(second.find(&target).unwrap().is_some(), "{} points at a deleted {target}", record.key);
        }
    }
}

#[test]
fn test_referenced_secret_survives_delete_from_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smarter.db");
    let fx = Fixture::with_store(Arc::new(SqliteStore::open(&path).unwrap()));
    let second = SqliteStore::open(&path).unwrap();
    fx.apply_value(&fx.admin(), &fx.example(Kind::Secret)).unwrap();
    fx.apply_value(&fx.admin(), &fx.example(Kind::SqlConnection)).unwrap();

    let secret = ResourceKey::new(ACCOUNT, Kind::Secret, "stackademy-db-password");
    match second.delete(&secret).unwrap() {
        Deletion::Referenced(by) => {
            assert_eq!(by, vec![ResourceKey::new(ACCOUNT, Kind::SqlConnection, "stackademy-sql")]);
        }
        other => panic!("expected a referenced secret, got {other:?}"),
    }
    assert!(fx.store.find(&secret).unwrap().is_some());
}
