mod support;

use pretty_assertions::assert_eq;
use std::{sync::Arc, time::Duration};
use stem::{
    db::{ConnectionSettings, Pool, PoolConfig, PoolRegistry},
    Db, Value,
};
use support::{insert, schema};

#[test]
fn settings_from_configuration() {
    let settings: ConnectionSettings = serde_json::from_str(
        r#"{ "scheme": "postgresql", "host": "db.local", "port": 5432, "username": "app", "database": "crm" }"#,
    )
    .unwrap();

    assert_eq!(settings.password, "");
    assert_eq!(settings.to_url(), "postgresql://app@db.local:5432/crm");
    assert_eq!(
        ConnectionSettings::from_url(&settings.to_url()).unwrap(),
        settings
    );
}

#[test]
fn invalid_urls() {
    assert!(ConnectionSettings::from_url("not a url").is_err());
    assert!(Db::builder().schema(schema()).connect("nosuchdb://host/db").is_err());
}

#[test]
fn pool_config_from_configuration() {
    let config: PoolConfig = serde_json::from_str(r#"{ "max_size": 3 }"#).unwrap();
    assert_eq!(config.max_size, 3);
    assert_eq!(config.checkout_timeout, PoolConfig::new().checkout_timeout);
}

#[test]
fn checkout_times_out_while_the_pool_is_exhausted() {
    let config = PoolConfig {
        max_size: 4,
        checkout_timeout: Duration::from_millis(50),
    };
    let pool = Pool::connect("sqlite::memory:", config).unwrap();

    // An in-memory database lives on a single connection.
    assert_eq!(pool.max_size(), 1);

    let held = pool.get().unwrap();
    let Err(err) = pool.get() else {
        panic!("checkout succeeded with every connection in use");
    };
    assert!(err.is_connection_pool(), "{err}");

    drop(held);
    assert!(pool.get().is_ok());
    assert_eq!(pool.idle(), 1);
}

#[test]
fn handles_share_pools_through_a_registry() {
    let registry = PoolRegistry::new();

    let first = Db::builder()
        .schema(schema())
        .pools(&registry)
        .connect("sqlite::memory:")
        .unwrap();
    let second = Db::builder()
        .schema(schema())
        .pools(&registry)
        .connect("sqlite::memory:")
        .unwrap();

    assert_eq!(registry.len(), 1);
    assert!(Arc::ptr_eq(first.pool().unwrap(), second.pool().unwrap()));

    // One in-memory database behind both handles.
    first.push_schema().unwrap();
    insert(&first, "Company", [("CompanyName", "C1")]);

    let company = second.find("Company", 1).unwrap();
    assert_eq!(company.get("CompanyName"), &Value::from("C1"));
}

#[test]
fn handles_without_a_registry_do_not_share() {
    let first = Db::builder().schema(schema()).connect("sqlite::memory:").unwrap();
    let second = Db::builder().schema(schema()).connect("sqlite::memory:").unwrap();

    assert!(!Arc::ptr_eq(first.pool().unwrap(), second.pool().unwrap()));
}

#[test]
fn clones_share_object_caches() {
    let db = support::sqlite();
    let clone = db.clone();

    insert(&db, "Company", [("CompanyName", "C1")]);
    assert!(clone.repository("Company").unwrap().cache().contains(&Value::I64(1)));

    clone.clear_caches();
    assert!(db.repository("Company").unwrap().cache().is_empty());
}

#[test]
fn offline_handles() {
    let db = support::offline();

    assert!(db.pool().is_none());
    db.push_schema().unwrap();

    insert(&db, "Company", [("CompanyName", "C1")]);
    insert(&db, "Company", [("CompanyName", "C2")]);

    let ids = db.collection("Company").unwrap().unique_identifiers().unwrap();
    assert_eq!(ids, vec![Value::I64(1), Value::I64(2)]);
}

#[test]
fn builder_needs_a_schema() {
    let err = Db::builder().offline().unwrap_err();
    assert!(err.to_string().contains("no schema"), "{err}");
}

#[test]
fn unknown_models() {
    let db = support::offline();

    assert!(db.collection("Invoice").is_err());
    assert!(db.create("Invoice").is_err());
    assert!(db.repository("Invoice").is_err());
}
