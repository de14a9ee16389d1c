use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Open the store named by `database_url` and optionally bring its schema up to date.
pub async fn connect(
    database_url: &str,
    run_migrations: bool,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);
    // An in-memory SQLite database lives and dies with its single connection.
    if database_url.starts_with("sqlite::memory:") {
        options.max_connections(1).min_connections(1);
    }

    tracing::info!(
        backend = if database_url.starts_with("postgres") { "PostgreSQL" } else { "SQLite" },
        "connecting to database"
    );
    let db = Database::connect(options).await?;

    if run_migrations {
        Migrator::up(&db, None).await?;
        tracing::info!("database migrations applied");
    }
    Ok(db)
}
