use ab_core::{ProcessContext, QueryRunner, ServiceError};
use ab_schema::{DdlDialect, Identifier, MySqlDialect};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::types::Json;
use sqlx::QueryBuilder;

use crate::error::PersistenceError;

/// Consulta QL de una tarea ServiceQuery, ya renderizada.
///
/// ```json
/// {"object": "AB_Invoice", "fields": ["uuid", "total"],
///  "where": {"customer": "Ada"}, "orderBy": "created_at", "limit": 10}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QlQuery {
    /// Tabla física del objeto.
    pub object: String,
    pub fields: Vec<String>,
    #[serde(rename = "where", default)]
    pub filter: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl QlQuery {
    pub fn from_value(value: &Value) -> Result<Self, ServiceError> {
        let q: Self = serde_json::from_value(value.clone()).map_err(|e| ServiceError::new(format!("malformed query: {e}")))?;
        if q.fields.is_empty() {
            return Err(ServiceError::new("query selects no fields"));
        }
        Ok(q)
    }

    /// `SELECT` parametrizado que devuelve las filas como un único array JSON.
    pub fn build(&self) -> Result<QueryBuilder<'static, MySql>, ServiceError> {
        let d = MySqlDialect;
        let ident = |name: &str| {
            Identifier::new(name).map(|i| d.quote_ident(&i))
                                 .map_err(|e| ServiceError::new(e.to_string()))
        };
        let mut pairs = Vec::with_capacity(self.fields.len());
        let mut columns = Vec::with_capacity(self.fields.len());
        for f in &self.fields {
            let col = ident(f)?;
            pairs.push(format!("{}, q.{col}", d.quote_literal(f)));
            columns.push(col);
        }

        let mut qb = QueryBuilder::new(format!("SELECT COALESCE(JSON_ARRAYAGG(JSON_OBJECT({})), JSON_ARRAY()) AS result FROM (SELECT {} FROM {}",
                                               pairs.join(", "),
                                               columns.join(", "),
                                               ident(&self.object)?));
        for (i, (col, value)) in self.filter.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(ident(col)?);
            match value {
                Value::Null => {
                    qb.push(" IS NULL");
                }
                Value::Bool(b) => {
                    qb.push(" = ").push_bind(*b);
                }
                Value::Number(n) => {
                    qb.push(" = ");
                    match n.as_i64() {
                        Some(i) => qb.push_bind(i),
                        None => qb.push_bind(n.as_f64().unwrap_or_default()),
                    };
                }
                Value::String(s) => {
                    qb.push(" = ").push_bind(s.clone());
                }
                other => {
                    qb.push(" = ").push_bind(other.to_string());
                }
            }
        }
        if let Some(order) = &self.order_by {
            qb.push(" ORDER BY ").push(ident(order)?);
        }
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        qb.push(") AS q");
        Ok(qb)
    }
}

/// `QueryRunner` sobre el pool MySQL.
#[derive(Debug, Clone)]
pub struct MySqlQueryRunner {
    pool: MySqlPool,
}

impl MySqlQueryRunner {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryRunner for MySqlQueryRunner {
    async fn run(&self, query: &Value, _context: &ProcessContext) -> Result<Value, ServiceError> {
        let ql = QlQuery::from_value(query)?;
        let mut qb = ql.build()?;
        debug!("ql: {}", qb.sql());
        let Json(rows) = qb.build_query_scalar::<Json<Value>>()
                           .fetch_one(&self.pool)
                           .await
                           .map_err(|e| ServiceError::new(PersistenceError::from(e).to_string()))?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_parameterized_select() {
        let q = QlQuery::from_value(&json!({
                    "object": "AB_Invoice",
                    "fields": ["uuid", "total"],
                    "where": {"customer": "Ada", "paid": null},
                    "orderBy": "created_at",
                    "limit": 5
                })).unwrap();
        let qb = q.build().unwrap();
        assert_eq!(qb.sql(),
                   "SELECT COALESCE(JSON_ARRAYAGG(JSON_OBJECT('uuid', q.`uuid`, 'total', q.`total`)), JSON_ARRAY()) AS result \
                    FROM (SELECT `uuid`, `total` FROM `AB_Invoice` WHERE `customer` = ? AND `paid` IS NULL \
                    ORDER BY `created_at` LIMIT ?) AS q");
    }

    #[test]
    fn rejects_malformed_queries() {
        assert!(QlQuery::from_value(&json!({"object": "AB_Invoice", "fields": []})).is_err());
        assert!(QlQuery::from_value(&json!({"fields": ["a"]})).is_err());
        let q = QlQuery::from_value(&json!({"object": "AB_Invoice", "fields": [" padded"]})).unwrap();
        assert!(q.build().is_err());
    }

    #[test]
    fn hostile_names_are_quoted() {
        let q = QlQuery::from_value(&json!({"object": "AB_Invoice", "fields": ["a`; DROP TABLE x"]})).unwrap();
        let qb = q.build().unwrap();
        assert!(qb.sql().contains("`a``; DROP TABLE x`"));
        assert!(qb.sql().contains("'a`; DROP TABLE x'"));
    }
}
