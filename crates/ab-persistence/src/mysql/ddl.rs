use ab_schema::ddl::{ColumnDef, DefaultValue, TriggerBody, TriggerEvent};
use ab_schema::{DbError, DbErrorCode, DdlConnection, DdlDialect, DdlStatement, Identifier, MySqlDialect};
use async_trait::async_trait;
use log::debug;
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::pool::PoolConnection;

use crate::error::{mysql_error_number, PersistenceError};

/// Conexión DDL sobre MySQL.
///
/// Mantiene una única conexión del pool durante toda la migración: las
/// sentencias DDL de un objeto se aplican en orden sobre la misma sesión.
/// El DDL de MySQL no es transaccional; la idempotencia la aporta el motor
/// de migración.
pub struct MySqlDdlConnection {
    conn: PoolConnection<MySql>,
    dialect: Box<dyn DdlDialect>,
}

impl MySqlDdlConnection {
    pub async fn acquire(pool: &MySqlPool) -> Result<Self, PersistenceError> {
        let conn = pool.acquire().await?;
        Ok(Self { conn,
                  dialect: Box::new(MySqlDialect) })
    }

    /// Sustituye el dialecto de renderizado.
    pub fn with_dialect(mut self, dialect: Box<dyn DdlDialect>) -> Self {
        self.dialect = dialect;
        self
    }

    async fn count(&mut self, sql: &str, binds: &[&str]) -> Result<bool, DbError> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        for b in binds {
            query = query.bind(*b);
        }
        let n = query.fetch_one(&mut *self.conn).await.map_err(to_db_error)?;
        Ok(n > 0)
    }
}

/// `VARCHAR(535)` frente a `varchar(535)`, `DECIMAL(65, 2)` frente a
/// `decimal(65,2)`.
fn same_column_type(expected: &str, actual: &str) -> bool {
    let norm = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_lowercase();
    norm(expected) == norm(actual)
}

/// MariaDB devuelve los literales entre comillas y `NULL` como texto.
fn same_default(expected: Option<&DefaultValue>, actual: Option<&str>) -> bool {
    let actual = actual.filter(|a| !a.eq_ignore_ascii_case("null"))
                       .map(|a| a.strip_prefix('\'').and_then(|a| a.strip_suffix('\'')).unwrap_or(a));
    match (expected, actual) {
        (None, None) => true,
        (Some(DefaultValue::Text(t)), Some(a)) => t == a,
        (Some(DefaultValue::Integer(i)), Some(a)) => a.parse::<i64>().is_ok_and(|v| v == *i),
        (Some(DefaultValue::Float(f)), Some(a)) => a.parse::<f64>().is_ok_and(|v| v == *f),
        (Some(DefaultValue::Bool(b)), Some(a)) => a == if *b { "1" } else { "0" },
        (Some(DefaultValue::CurrentTimestamp), Some(a)) => a.to_ascii_lowercase().starts_with("current_timestamp"),
        _ => false,
    }
}

fn to_db_error(err: sqlx::Error) -> DbError {
    match mysql_error_number(&err) {
        Some(number) => {
            let message = err.as_database_error()
                             .map(|d| d.message().to_string())
                             .unwrap_or_else(|| err.to_string());
            DbError::new(DbErrorCode::from_mysql(number), message)
        }
        None => PersistenceError::from(err).into(),
    }
}

#[async_trait]
impl DdlConnection for MySqlDdlConnection {
    async fn table_exists(&mut self, table: &Identifier) -> Result<bool, DbError> {
        self.count("SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
                   &[table.as_str()])
            .await
    }

    async fn column_exists(&mut self, table: &Identifier, column: &Identifier) -> Result<bool, DbError> {
        self.count("SELECT COUNT(*) FROM information_schema.columns \
                    WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?",
                   &[table.as_str(), column.as_str()])
            .await
    }

    async fn index_exists(&mut self, table: &Identifier, index: &Identifier) -> Result<bool, DbError> {
        self.count("SELECT COUNT(*) FROM information_schema.statistics \
                    WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?",
                   &[table.as_str(), index.as_str()])
            .await
    }

    async fn trigger_exists(&mut self, trigger: &Identifier) -> Result<bool, DbError> {
        self.count("SELECT COUNT(*) FROM information_schema.triggers WHERE trigger_schema = DATABASE() AND trigger_name = ?",
                   &[trigger.as_str()])
            .await
    }

    async fn column_matches(&mut self, table: &Identifier, column: &ColumnDef) -> Result<bool, DbError> {
        let row: Option<(String, String, Option<String>)> =
            sqlx::query_as("SELECT CAST(COLUMN_TYPE AS CHAR), CAST(IS_NULLABLE AS CHAR), CAST(COLUMN_DEFAULT AS CHAR) \
                            FROM information_schema.columns \
                            WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?")
                .bind(table.as_str())
                .bind(column.name.as_str())
                .fetch_optional(&mut *self.conn)
                .await
                .map_err(to_db_error)?;
        let Some((ty, nullable, default)) = row else {
            return Ok(false);
        };
        Ok(same_column_type(&self.dialect.column_type(&column.ty), &ty)
           && nullable.eq_ignore_ascii_case("YES") == column.nullable
           && same_default(column.default.as_ref(), default.as_deref()))
    }

    async fn index_matches(&mut self,
                           table: &Identifier,
                           index: &Identifier,
                           columns: &[Identifier],
                           unique: bool)
                           -> Result<bool, DbError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT CAST(COLUMN_NAME AS CHAR), CAST(NON_UNIQUE AS SIGNED) \
                            FROM information_schema.statistics \
                            WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ? \
                            ORDER BY SEQ_IN_INDEX")
                .bind(table.as_str())
                .bind(index.as_str())
                .fetch_all(&mut *self.conn)
                .await
                .map_err(to_db_error)?;
        Ok(!rows.is_empty()
           && rows.iter().all(|(_, non_unique)| (*non_unique == 0) == unique)
           && rows.iter().map(|(c, _)| c.as_str()).eq(columns.iter().map(Identifier::as_str)))
    }

    async fn trigger_matches(&mut self,
                             trigger: &Identifier,
                             table: &Identifier,
                             event: TriggerEvent,
                             body: &TriggerBody)
                             -> Result<bool, DbError> {
        let row: Option<(String, String, String, String)> =
            sqlx::query_as("SELECT CAST(EVENT_OBJECT_TABLE AS CHAR), CAST(EVENT_MANIPULATION AS CHAR), \
                            CAST(ACTION_TIMING AS CHAR), CAST(ACTION_STATEMENT AS CHAR) \
                            FROM information_schema.triggers WHERE trigger_schema = DATABASE() AND trigger_name = ?")
                .bind(trigger.as_str())
                .fetch_optional(&mut *self.conn)
                .await
                .map_err(to_db_error)?;
        let Some((on_table, manipulation, timing, statement)) = row else {
            return Ok(false);
        };
        let expected_event = match event {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
        };
        Ok(on_table == table.as_str()
           && manipulation.eq_ignore_ascii_case(expected_event)
           && timing.eq_ignore_ascii_case("BEFORE")
           && statement.trim() == self.dialect.trigger_body(body))
    }

    async fn execute(&mut self, stmt: &DdlStatement) -> Result<(), DbError> {
        let sql = self.dialect.render(stmt);
        debug!("ddl: {sql}");
        // CREATE TRIGGER no admite el protocolo de sentencias preparadas.
        sqlx::Executor::execute(&mut *self.conn, sqlx::raw_sql(&sql)).await.map_err(to_db_error)?;
        Ok(())
    }
}
