#![allow(dead_code)]

use sql_template::prelude::*;
use tempfile::tempdir;

sql_template::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct User {
        pub id: i64,
        pub account: String,
        pub password: String,
        pub email: String,
    }
}

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account TEXT NOT NULL,
    password TEXT NOT NULL,
    email TEXT NOT NULL
);";

pub fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

pub async fn template_with_schema(prefix: &str, max_connections: u32) -> SqlTemplate {
    let config = ConfigAndPool::sqlite_builder(unique_db_path(prefix))
        .max_connections(max_connections)
        .build()
        .await
        .expect("pool");
    let mut conn = config.get_connection().await.expect("connection");
    conn.execute_batch(SCHEMA).await.expect("schema");
    drop(conn);
    SqlTemplate::new(config)
}

/// DAO call site for `users`, the way application code sits on the template.
pub struct UserDao {
    template: SqlTemplate,
}

impl UserDao {
    pub fn new(template: SqlTemplate) -> Self {
        Self { template }
    }

    pub async fn insert(&self, user: &User) -> Result<usize, SqlTemplateError> {
        self.template
            .update(
                "insert into users (account, password, email) values (?, ?, ?)",
                &sql_args![&user.account, &user.password, &user.email],
            )
            .await
    }

    pub async fn insert_on<C: AsConnection>(
        &self,
        conn: &mut C,
        user: &User,
    ) -> Result<usize, SqlTemplateError> {
        self.template
            .on(conn)
            .update(
                "insert into users (account, password, email) values (?, ?, ?)",
                &sql_args![&user.account, &user.password, &user.email],
            )
            .await
    }

    pub async fn update(&self, user: &User) -> Result<usize, SqlTemplateError> {
        self.template
            .update(
                "UPDATE users SET account = ?, password = ?, email = ? WHERE id = ?",
                &sql_args![&user.account, &user.password, &user.email, user.id],
            )
            .await
    }

    pub async fn find_all(&self) -> Result<Vec<User>, SqlTemplateError> {
        self.template.query("SELECT * FROM users", &sql_args![]).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, SqlTemplateError> {
        optional(
            self.template
                .query_for_object(
                    "select id, account, password, email from users where id = ?",
                    &sql_args![id],
                )
                .await,
        )
    }

    pub async fn find_by_account(&self, account: &str) -> Result<Option<User>, SqlTemplateError> {
        optional(
            self.template
                .query_for_object(
                    "select id, account, password, email from users where account = ?",
                    &sql_args![account],
                )
                .await,
        )
    }

    pub async fn delete_all(&self) -> Result<usize, SqlTemplateError> {
        self.template.execute("DELETE FROM users", &sql_args![]).await
    }
}

fn optional<T>(result: Result<T, SqlTemplateError>) -> Result<Option<T>, SqlTemplateError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn user(account: &str) -> User {
    User {
        id: 0,
        account: account.to_string(),
        password: "password".to_string(),
        email: format!("{account}@example.com"),
    }
}
