//! A small DAO built on `SqlTemplate`.
//!
//! Run with: cargo run --example user_dao -- --db users.db --account gugu

use clap::Parser;
use sql_template::prelude::*;
use tracing_subscriber::EnvFilter;

sql_template::record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct User {
        pub id: i64,
        pub account: String,
        pub password: String,
        pub email: String,
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Insert and look up users through sql-template")]
struct Args {
    #[arg(long, default_value = "users.db")]
    db: String,
    #[arg(long, default_value = "gugu")]
    account: String,
    #[arg(long, default_value_t = 4)]
    pool_size: u32,
}

struct UserDao {
    template: SqlTemplate,
}

impl UserDao {
    async fn insert<C: AsConnection>(&self, conn: &mut C, user: &User) -> Result<(), SqlTemplateError> {
        self.template
            .on(conn)
            .update(
                "insert into users (account, password, email) values (?, ?, ?)",
                &sql_args![&user.account, &user.password, &user.email],
            )
            .await?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), SqlTemplateError> {
        self.template
            .update(
                "UPDATE users SET account = ?, password = ?, email = ? WHERE id = ?",
                &sql_args![&user.account, &user.password, &user.email, user.id],
            )
            .await?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<User>, SqlTemplateError> {
        self.template.query("SELECT * FROM users", &sql_args![]).await
    }

    async fn find_by_account(&self, account: &str) -> Result<Option<User>, SqlTemplateError> {
        match self
            .template
            .query_for_object(
                "select id, account, password, email from users where account = ?",
                &sql_args![account],
            )
            .await
        {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "sql_template=debug".into()))
        .with_target(false)
        .init();

    let template = SqlTemplate::new(
        ConfigAndPool::sqlite_builder(args.db)
            .max_connections(args.pool_size)
            .build()
            .await?,
    );
    let mut conn = template.get_connection().await?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account TEXT NOT NULL,
            password TEXT NOT NULL,
            email TEXT NOT NULL
        );",
    )
    .await?;
    drop(conn);

    let dao = UserDao { template: template.clone() };

    if dao.find_by_account(&args.account).await?.is_none() {
        let user = User {
            id: 0,
            account: args.account.clone(),
            password: "password".into(),
            email: format!("{}@example.com", args.account),
        };
        let mut tx = template.begin().await?;
        dao.insert(&mut tx, &user).await?;
        tx.commit().await?;
    }

    if let Some(mut user) = dao.find_by_account(&args.account).await? {
        user.password = "changed".into();
        dao.update(&user).await?;
    }

    for user in dao.find_all().await? {
        println!("{user:?}");
    }
    tracing::info!(stats = ?template.pool_stats(), "done");
    Ok(())
}
