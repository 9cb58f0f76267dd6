mod common;

use std::time::Duration;

use common::{SCHEMA, User, UserDao, template_with_schema, unique_db_path, user};
use sql_template::prelude::*;
use sql_template::PoolStatsSnapshot;

fn stats(acquired: u64, released: u64) -> PoolStatsSnapshot {
    PoolStatsSnapshot { acquired, released }
}

#[tokio::test]
async fn binding_error_never_acquires() -> Result<(), Box<dyn std::error::Error>> {
    let template = template_with_schema("release_binding", 2).await;

    let err = template
        .execute("insert into users (account, password, email) values (?, ?, ?)", &sql_args!["only-one"])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlTemplateError::BindingError(_)));

    let err = template
        .query::<User>("select * from users where id = ?", &sql_args![f64::NAN])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlTemplateError::BindingError(_)));

    let err = template
        .query::<User>("select * from users where id = ?0", &sql_args![1])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlTemplateError::BindingError(_)));

    assert_eq!(template.pool_stats(), stats(0, 0));
    Ok(())
}

#[tokio::test]
async fn every_outcome_releases_exactly_once() -> Result<(), Box<dyn std::error::Error>> {
    let template = template_with_schema("release_outcomes", 2).await;
    let dao = UserDao::new(template.clone());

    dao.insert(&user("gugu")).await?;
    assert_eq!(template.pool_stats(), stats(1, 1));

    dao.find_all().await?;
    assert_eq!(template.pool_stats(), stats(2, 2));

    // NotFound
    assert_eq!(dao.find_by_id(999).await?, None);
    assert_eq!(template.pool_stats(), stats(3, 3));

    // TooManyResults
    dao.insert(&user("gugu")).await?;
    assert!(dao.find_by_account("gugu").await.is_err());
    assert_eq!(template.pool_stats(), stats(5, 5));

    // MappingError
    let err = template
        .query::<User>("select id, account from users", &sql_args![])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlTemplateError::MappingError(_)));
    assert_eq!(template.pool_stats(), stats(6, 6));

    // DataAccess
    let err = template
        .execute("insert into missing_table (id) values (?)", &sql_args![1])
        .await
        .unwrap_err();
    assert!(err.is_data_access());
    assert_eq!(template.pool_stats(), stats(7, 7));
    assert_eq!(template.pool_stats().in_use(), 0);
    Ok(())
}

#[tokio::test]
async fn single_connection_pool_survives_repeated_failures() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigAndPool::sqlite_builder(unique_db_path("release_single"))
        .max_connections(1)
        .connection_timeout(Duration::from_secs(2))
        .build()
        .await?;
    let template = SqlTemplate::new(config);
    template.execute(SCHEMA, &sql_args![]).await?;

    for _ in 0..10 {
        let err = template
            .query_for_object::<User>("select * from users where id = ?", &sql_args![1])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = template.execute("not valid sql", &sql_args![]).await.unwrap_err();
        assert!(err.is_data_access());
    }

    let snapshot = template.pool_stats();
    assert_eq!(snapshot.acquired, snapshot.released);
    assert_eq!(template.pool().state().connections, 1);
    Ok(())
}

#[tokio::test]
async fn supplied_connection_is_never_released() -> Result<(), Box<dyn std::error::Error>> {
    let template = template_with_schema("release_supplied", 2).await;
    let dao = UserDao::new(template.clone());

    let mut conn = template.get_connection().await?;
    dao.insert_on(&mut conn, &user("gugu")).await?;
    let err = template
        .on(&mut conn)
        .query_for_object::<User>("select * from users where id = ?", &sql_args![999])
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Still ours and still usable after an error.
    let users: Vec<User> = template
        .on(&mut conn)
        .query("select * from users", &sql_args![])
        .await?;
    assert_eq!(users.len(), 1);
    assert_eq!(template.pool_stats(), stats(0, 0));
    Ok(())
}
