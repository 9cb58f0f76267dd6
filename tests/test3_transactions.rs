mod common;

use std::time::Duration;

use common::{SCHEMA, User, UserDao, template_with_schema, unique_db_path, user};
use sql_template::prelude::*;

async fn count_users(template: &SqlTemplate) -> Result<i64, SqlTemplateError> {
    template
        .query_for_object_with(
            "select count(*) as cnt from users",
            &RowMapper::new(|row: &Row| row.try_get("cnt")),
            &sql_args![],
        )
        .await
}

#[tokio::test]
async fn commit_makes_statements_visible() -> Result<(), Box<dyn std::error::Error>> {
    let template = template_with_schema("tx_commit", 4).await;
    let dao = UserDao::new(template.clone());

    let mut tx = template.begin().await?;
    dao.insert_on(&mut tx, &user("first")).await?;
    dao.insert_on(&mut tx, &user("second")).await?;

    let inside: Vec<User> = template.on(&mut tx).query("select * from users", &sql_args![]).await?;
    assert_eq!(inside.len(), 2);
    assert_eq!(count_users(&template).await?, 0);

    let conn = tx.commit().await?;
    assert!(!conn.in_transaction());
    drop(conn);
    assert_eq!(count_users(&template).await?, 2);
    Ok(())
}

#[tokio::test]
async fn rollback_discards_statements() -> Result<(), Box<dyn std::error::Error>> {
    let template = template_with_schema("tx_rollback", 4).await;
    let dao = UserDao::new(template.clone());

    let mut tx = template.begin().await?;
    dao.insert_on(&mut tx, &user("gone")).await?;
    let mut conn = tx.rollback().await?;

    let users: Vec<User> = template.on(&mut conn).query("select * from users", &sql_args![]).await?;
    assert!(users.is_empty());
    assert_eq!(count_users(&template).await?, 0);
    Ok(())
}

#[tokio::test]
async fn failure_inside_transaction_can_be_rolled_back() -> Result<(), Box<dyn std::error::Error>> {
    let template = template_with_schema("tx_failure", 4).await;
    let dao = UserDao::new(template.clone());

    let mut tx = template.begin().await?;
    dao.insert_on(&mut tx, &user("kept-until-error")).await?;
    let err = template
        .on(&mut tx)
        .execute("insert into users (account) values (?)", &sql_args!["no-password"])
        .await
        .unwrap_err();
    assert!(err.is_data_access());
    tx.rollback().await?;

    assert_eq!(count_users(&template).await?, 0);
    assert_eq!(template.pool_stats().in_use(), 0);
    Ok(())
}

#[tokio::test]
async fn dropped_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigAndPool::sqlite_builder(unique_db_path("tx_drop"))
        .max_connections(1)
        .connection_timeout(Duration::from_secs(5))
        .build()
        .await?;
    let template = SqlTemplate::new(config);
    template.execute(SCHEMA, &sql_args![]).await?;
    let dao = UserDao::new(template.clone());

    {
        let mut tx = template.begin().await?;
        dao.insert_on(&mut tx, &user("abandoned")).await?;
    }

    // The single pooled connection only comes back once the rollback has run.
    let conn = template.get_connection().await?;
    let autocommit = conn.with_connection(|c| Ok(c.is_autocommit())).await?;
    assert!(autocommit);
    drop(conn);
    assert_eq!(count_users(&template).await?, 0);
    Ok(())
}

#[tokio::test]
async fn connection_is_reusable_after_commit() -> Result<(), Box<dyn std::error::Error>> {
    let template = template_with_schema("tx_twice", 2).await;
    let conn = template.get_connection().await?;
    let tx = Transaction::begin(conn).await?;
    let conn = tx.commit().await?;

    let tx = Transaction::begin(conn).await?;
    tx.rollback().await?;
    Ok(())
}

#[tokio::test]
async fn connection_left_in_transaction_is_not_reused() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = unique_db_path("tx_stale_begin");
    let config = ConfigAndPool::sqlite_builder(db_path.clone())
        .max_connections(1)
        .connection_timeout(Duration::from_secs(5))
        .build()
        .await?;
    let template = SqlTemplate::new(config);
    template.execute(SCHEMA, &sql_args![]).await?;

    let mut conn = template.get_connection().await?;
    template.on(&mut conn).execute("BEGIN", &sql_args![]).await?;
    drop(conn);

    let conn = template.get_connection().await?;
    assert!(conn.with_connection(|c| Ok(c.is_autocommit())).await?);
    drop(conn);

    let affected = UserDao::new(template.clone()).insert(&user("after-stale")).await?;
    assert_eq!(affected, 1);

    let outside = rusqlite::Connection::open(&db_path)?;
    let visible: i64 = outside.query_row("select count(*) from users", [], |row| row.get(0))?;
    assert_eq!(visible, 1);
    assert!(template.pool().state().statistics.connections_closed_broken >= 1);
    Ok(())
}
