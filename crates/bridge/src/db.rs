use anyhow::Context;
use deadpool_diesel::sqlite::{Manager, Pool};
use deadpool_diesel::Runtime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

pub type DbPool = Pool;

const CREATE_PERSON_MAP: &str = "CREATE TABLE IF NOT EXISTS person_map (
    phone_e164 TEXT PRIMARY KEY,
    person_id TEXT NOT NULL
)";

const CREATE_PERSON_MAP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_person_map_person_id ON person_map (person_id)";

/// Open a pool on `database_path` and make sure the schema exists.
///
/// `:memory:` databases are private to a connection, so callers using one
/// should pass `max_size = 1`.
pub async fn establish_connection_pool(
    database_path: &str,
    max_size: usize,
) -> anyhow::Result<DbPool> {
    let manager = Manager::new(database_path, Runtime::Tokio1);
    let pool = Pool::builder(manager)
        .max_size(max_size)
        .build()
        .context("Failed to create database pool")?;

    with_connection(&pool, init_schema)
        .await
        .context("Failed to initialise schema")?;

    tracing::info!("Database ready at {}", database_path);
    Ok(pool)
}

/// Run a blocking diesel closure on a pooled connection.
pub async fn with_connection<T, F>(pool: &DbPool, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> QueryResult<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection")?;

    let result = conn
        .interact(f)
        .await
        .map_err(|e| anyhow::anyhow!("Database task failed: {:?}", e))??;

    Ok(result)
}

pub(crate) fn init_schema(conn: &mut SqliteConnection) -> QueryResult<()> {
    diesel::sql_query(CREATE_PERSON_MAP).execute(conn)?;
    diesel::sql_query(CREATE_PERSON_MAP_INDEX).execute(conn)?;
    Ok(())
}

// Contact → person mapping operations
pub mod person_map {
    use super::*;

    pub fn upsert(conn: &mut SqliteConnection, phone: &str, person: &str) -> QueryResult<usize> {
        use crate::schema::person_map::dsl::*;

        diesel::insert_into(person_map)
            .values((phone_e164.eq(phone), person_id.eq(person)))
            .on_conflict(phone_e164)
            .do_update()
            .set(person_id.eq(person))
            .execute(conn)
    }

    pub fn find_person(conn: &mut SqliteConnection, phone: &str) -> QueryResult<Option<String>> {
        use crate::schema::person_map::dsl::*;

        person_map
            .filter(phone_e164.eq(phone))
            .select(person_id)
            .first::<String>(conn)
            .optional()
    }

    pub fn list_all(conn: &mut SqliteConnection) -> QueryResult<Vec<(String, String)>> {
        use crate::schema::person_map::dsl::*;

        person_map
            .select((phone_e164, person_id))
            .order_by(phone_e164.asc())
            .load::<(String, String)>(conn)
    }
}
