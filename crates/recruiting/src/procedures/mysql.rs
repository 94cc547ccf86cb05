use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow,
};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;

use super::{
    call_statement, validate_procedure_name, ProcParam, ProcedureError, ProcedureGateway, Record,
};
use crate::config::DatabaseConfig;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Gateway backed by a MySQL connection pool.
#[derive(Clone)]
pub struct MySqlGateway {
    pool: MySqlPool,
}

impl MySqlGateway {
    /// Builds the pool without connecting; the first call opens a connection.
    pub fn connect_lazy(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .test_before_acquire(true)
            .connect_lazy_with(options);

        Self { pool }
    }
}

#[async_trait]
impl ProcedureGateway for MySqlGateway {
    async fn call(
        &self,
        procedure: &str,
        params: &[ProcParam],
    ) -> Result<Vec<Record>, ProcedureError> {
        validate_procedure_name(procedure)?;
        let statement = call_statement(procedure, params.len());

        // Dropping the transaction on any early return rolls it back and releases the connection.
        let mut tx = self.pool.begin().await?;
        let rows = bind_params(sqlx::query(&statement), params)
            .fetch_all(&mut *tx)
            .await?;
        let records = normalize_rows(&rows)?;
        tx.commit().await?;

        debug!(procedure, rows = records.len(), "stored procedure completed");
        Ok(records)
    }

    async fn query(&self, sql: &str, params: &[ProcParam]) -> Result<Vec<Record>, ProcedureError> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        let records = normalize_rows(&rows)?;
        debug!(rows = records.len(), "query completed");
        Ok(records)
    }

    async fn insert(&self, sql: &str, params: &[ProcParam]) -> Result<u64, ProcedureError> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_id())
    }
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [ProcParam],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            ProcParam::Null => query.bind(None::<String>),
            ProcParam::Int(value) => query.bind(*value),
            ProcParam::Float(value) => query.bind(*value),
            ProcParam::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

fn normalize_rows(rows: &[MySqlRow]) -> Result<Vec<Record>, sqlx::Error> {
    rows.iter().map(normalize_row).collect()
}

fn normalize_row(row: &MySqlRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = column_value(row, column.ordinal(), column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let unsigned = type_name.ends_with(" UNSIGNED");
    let value = match type_name.trim_end_matches(" UNSIGNED") {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" if unsigned => {
            Value::from(row.try_get::<u64, _>(index)?)
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(index)?)
        }
        "YEAR" => Value::from(row.try_get_unchecked::<u16, _>(index)?),
        "FLOAT" => float_value(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => float_value(row.try_get::<f64, _>(index)?),
        // Exact decimals travel as text so no precision is lost on the way to JSON.
        "DECIMAL" => Value::String(row.try_get_unchecked::<String, _>(index)?),
        "DATETIME" | "TIMESTAMP" => Value::String(
            row.try_get::<NaiveDateTime, _>(index)?
                .format(DATETIME_FORMAT)
                .to_string(),
        ),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::String(
            row.try_get::<NaiveTime, _>(index)?
                .format("%H:%M:%S")
                .to_string(),
        ),
        "JSON" => row.try_get::<Value, _>(index)?,
        _ => text_value(row, index)?,
    };
    Ok(value)
}

fn float_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn text_value(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
    match row.try_get::<String, _>(index) {
        Ok(text) => Ok(Value::String(text)),
        Err(_) => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }
}
