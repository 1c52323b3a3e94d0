//! Shared fixtures for the sqlite-backed integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use rowkit_db::{DEFAULT_PROFILE, DbRegistry, DbValue, Driver, Params};
use rowkit_record::{Env, FieldDescriptor, FieldKind, Record, Schema, Validation};

/// Uuid-keyed model exercising every field kind plus audit columns.
pub struct Article;

impl Schema for Article {
    const TABLE: &'static str = "articles";

    fn descriptors() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldKind::Uuid).protected(),
            FieldDescriptor::new("title", FieldKind::Text),
            FieldDescriptor::new("views", FieldKind::Integer).with_default(0),
            FieldDescriptor::new("published", FieldKind::Boolean).with_default(false),
            FieldDescriptor::new("meta", FieldKind::Json),
            FieldDescriptor::new("created_at", FieldKind::DateTime).protected(),
            FieldDescriptor::new("updated_at", FieldKind::DateTime).protected(),
            FieldDescriptor::new("created_by", FieldKind::Text).protected(),
            FieldDescriptor::new("updated_by", FieldKind::Text).protected(),
        ]
    }

    fn resource_kind() -> &'static str {
        "Article"
    }

    fn transient() -> &'static [&'static str] {
        &["draft_note"]
    }

    fn validate(record: &Record<Self>, errors: &mut Validation) {
        match record.get("title") {
            Some(DbValue::Text(title)) if !title.is_empty() => {}
            _ => errors.add("title", "must not be blank"),
        }
    }
}

/// Integer-keyed model exercising the engine-generated-id insert path.
pub struct Counter;

impl Schema for Counter {
    const TABLE: &'static str = "counters";

    fn descriptors() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldKind::Integer).protected(),
            FieldDescriptor::new("label", FieldKind::Text),
        ]
    }
}

/// Linked side of the article/tag association.
pub struct Tag;

impl Schema for Tag {
    const TABLE: &'static str = "tags";

    fn descriptors() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldKind::Integer).protected(),
            FieldDescriptor::new("name", FieldKind::Text),
        ]
    }
}

pub async fn registry() -> DbRegistry {
    let mut registry = DbRegistry::new();
    let driver = registry
        .connect(DEFAULT_PROFILE, "sqlite::memory:")
        .await
        .expect("connect");
    for ddl in [
        "CREATE TABLE articles (\
            id TEXT PRIMARY KEY, title TEXT NOT NULL, views INTEGER, published BOOLEAN, \
            meta TEXT, created_at TEXT, updated_at TEXT, created_by TEXT, updated_by TEXT)",
        "CREATE TABLE counters (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT)",
        "CREATE TABLE tags (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
        "CREATE TABLE article_tags (article_id TEXT NOT NULL, tag_id INTEGER NOT NULL)",
    ] {
        driver.execute(ddl, &Params::new()).await.expect("ddl");
    }
    registry
}

pub async fn env() -> Env {
    Env::new(registry().await)
}

pub fn article(title: &str) -> Record<Article> {
    Record::with_fields(serde_json::json!({ "title": title })).unwrap()
}
