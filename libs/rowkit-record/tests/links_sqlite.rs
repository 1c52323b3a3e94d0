#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(feature = "sqlite")]

mod common;

use common::{Article, Tag, env};
use rowkit_db::Driver;
use rowkit_record::{
    DbValue, Env, LinkTable, Params, Record, RecordError, TxScope, link_join, replace_links,
};

const ARTICLE_TAGS: LinkTable = LinkTable {
    table: "article_tags",
    source_key: "article_id",
    target_key: "tag_id",
};

async fn saved_article(env: &Env, title: &str) -> Record<Article> {
    let mut article = common::article(title);
    assert!(article.save(env).await.unwrap());
    article
}

async fn link_count(env: &Env, article: &Record<Article>) -> i64 {
    let driver = env.db().driver_or_err(rowkit_db::DEFAULT_PROFILE).unwrap();
    let rows = driver
        .query(
            "SELECT COUNT(*) AS n FROM article_tags WHERE article_id = :id",
            &Params::new().bind(":id", article.id().unwrap().clone()),
        )
        .await
        .unwrap();
    rows[0]["n"].as_i64().unwrap()
}

#[tokio::test]
async fn replaces_the_whole_link_set_under_its_own_transaction() {
    let env = env().await;
    let article = saved_article(&env, "linked").await;

    assert!(
        replace_links(&env, &article, &ARTICLE_TAGS, &[DbValue::Int(1), DbValue::Int(2)], TxScope::Own)
            .await
            .unwrap()
    );
    assert_eq!(link_count(&env, &article).await, 2);

    // a second replacement swaps, never appends
    assert!(
        replace_links(&env, &article, &ARTICLE_TAGS, &[DbValue::Int(3)], TxScope::Own)
            .await
            .unwrap()
    );
    assert_eq!(link_count(&env, &article).await, 1);

    // and an empty set just clears
    assert!(
        replace_links(&env, &article, &ARTICLE_TAGS, &[], TxScope::Own)
            .await
            .unwrap()
    );
    assert_eq!(link_count(&env, &article).await, 0);
}

#[tokio::test]
async fn own_scope_rolls_back_to_the_previous_links_on_failure() {
    let env = env().await;
    let article = saved_article(&env, "rolled back").await;

    assert!(
        replace_links(&env, &article, &ARTICLE_TAGS, &[DbValue::Int(1)], TxScope::Own)
            .await
            .unwrap()
    );

    // NULL violates the join table's NOT NULL constraint after the
    // delete already ran; the whole replacement must roll back
    let ok = replace_links(
        &env,
        &article,
        &ARTICLE_TAGS,
        &[DbValue::Int(2), DbValue::Null],
        TxScope::Own,
    )
    .await
    .unwrap();
    assert!(!ok);
    assert_eq!(link_count(&env, &article).await, 1);

    let driver = env.db().driver_or_err(rowkit_db::DEFAULT_PROFILE).unwrap();
    assert!(!driver.in_transaction());
}

#[tokio::test]
async fn join_scope_participates_in_the_callers_transaction() {
    let env = env().await;
    let article = saved_article(&env, "joined").await;
    let driver = env.db().driver_or_err(rowkit_db::DEFAULT_PROFILE).unwrap();

    driver.begin().await.unwrap();
    assert_eq!(TxScope::detect(driver.as_ref()), TxScope::Join);
    assert!(
        replace_links(&env, &article, &ARTICLE_TAGS, &[DbValue::Int(7)], TxScope::Join)
            .await
            .unwrap()
    );
    // the helper neither committed nor rolled back
    assert!(driver.in_transaction());
    driver.rollback().await.unwrap();

    assert_eq!(link_count(&env, &article).await, 0);
}

#[tokio::test]
async fn own_scope_refuses_to_nest_inside_an_open_transaction() {
    let env = env().await;
    let article = saved_article(&env, "nested").await;
    let driver = env.db().driver_or_err(rowkit_db::DEFAULT_PROFILE).unwrap();

    driver.begin().await.unwrap();
    let err = replace_links(&env, &article, &ARTICLE_TAGS, &[DbValue::Int(1)], TxScope::Own)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RecordError::Db(rowkit_db::DbError::NestedTransaction)
    ));
    driver.rollback().await.unwrap();
}

#[tokio::test]
async fn unsaved_records_cannot_hold_links() {
    let env = env().await;
    let article = common::article("unsaved");
    let err = replace_links(&env, &article, &ARTICLE_TAGS, &[DbValue::Int(1)], TxScope::Own)
        .await
        .unwrap_err();
    assert!(matches!(err, RecordError::UnsavedRecord));
}

#[tokio::test]
async fn link_join_reads_the_linked_models() {
    let env = env().await;
    let article = saved_article(&env, "reader").await;
    let other = saved_article(&env, "bystander").await;

    let driver = env.db().driver_or_err(rowkit_db::DEFAULT_PROFILE).unwrap();
    for name in ["rust", "sql", "web"] {
        driver
            .execute(
                "INSERT INTO tags (name) VALUES (:name)",
                &Params::new().bind(":name", name),
            )
            .await
            .unwrap();
    }

    replace_links(&env, &article, &ARTICLE_TAGS, &[DbValue::Int(1), DbValue::Int(3)], TxScope::Own)
        .await
        .unwrap();
    replace_links(&env, &other, &ARTICLE_TAGS, &[DbValue::Int(2)], TxScope::Own)
        .await
        .unwrap();

    let tags = link_join(&article, &ARTICLE_TAGS, &Record::<Tag>::all())
        .unwrap()
        .order_by("name ASC", Params::new())
        .unwrap()
        .select(&env)
        .await
        .unwrap()
        .into_vec();
    let names: Vec<String> = tags.iter().map(|t| t.get("name").unwrap().to_string()).collect();
    assert_eq!(names, ["rust", "web"]);
}
