//! Bridge between HTTP handlers and the stored procedures that own the business rules.
//!
//! Every result row is flattened into a [`Record`], an ordered field→value mapping, so the web
//! layer never depends on a column layout it does not control.

mod mysql;

use async_trait::async_trait;
use serde_json::Value;

pub use mysql::MySqlGateway;

/// One result row, keyed by column name in select order.
pub type Record = serde_json::Map<String, Value>;

/// Positional argument for a procedure call or parameterized statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcParam {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl ProcParam {
    /// Converts a loosely typed JSON payload value the way a dynamic driver would bind it.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Int(i64::from(*flag)),
            Value::Number(number) => match number.as_i64() {
                Some(int) => Self::Int(int),
                None => number.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            Value::String(text) => Self::Text(text.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<i64> for ProcParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ProcParam {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ProcParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ProcParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ProcParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ProcParam {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl<T> From<Option<T>> for ProcParam
where
    T: Into<ProcParam>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Storage abstraction so handlers and the service can be exercised without a database.
#[async_trait]
pub trait ProcedureGateway: Send + Sync {
    /// Invokes a stored procedure and returns the rows of every result set it produced.
    async fn call(&self, procedure: &str, params: &[ProcParam])
        -> Result<Vec<Record>, ProcedureError>;

    /// Runs a fixed read-only statement.
    async fn query(&self, sql: &str, params: &[ProcParam]) -> Result<Vec<Record>, ProcedureError>;

    /// Runs an INSERT and returns the generated key.
    async fn insert(&self, sql: &str, params: &[ProcParam]) -> Result<u64, ProcedureError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProcedureError {
    #[error("invalid procedure name '{0}'")]
    InvalidName(String),
    #[error("{}", database_message(.0))]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Unavailable(String),
}

/// Server-side errors (including `SIGNAL` messages) are reported as the server wrote them.
fn database_message(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(database) => database.to_string(),
        other => other.to_string(),
    }
}

/// Procedure names are interpolated into the statement, so only plain identifiers pass.
pub fn validate_procedure_name(name: &str) -> Result<(), ProcedureError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid && name.len() <= 64 {
        Ok(())
    } else {
        Err(ProcedureError::InvalidName(name.to_string()))
    }
}

pub fn call_statement(procedure: &str, arity: usize) -> String {
    let placeholders = vec!["?"; arity].join(", ");
    format!("CALL {procedure}({placeholders})")
}

/// Renders a field for display; missing and null fields become an empty string.
pub fn field_text(record: &Record, field: &str) -> String {
    match record.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Reads an integer field, accepting numeric strings as drivers sometimes return them.
pub fn field_i64(record: &Record, field: &str) -> Option<i64> {
    match record.get(field)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn procedure_names_must_be_identifiers() {
        assert!(validate_procedure_name("sp_generar_ranking").is_ok());
        assert!(validate_procedure_name("_internal2").is_ok());

        for bad in ["", "1sp", "sp; DROP TABLE vacantes", "sp-name", "sp name"] {
            assert!(
                matches!(
                    validate_procedure_name(bad),
                    Err(ProcedureError::InvalidName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn call_statement_uses_one_placeholder_per_argument() {
        assert_eq!(call_statement("sp_listar_vacantes", 0), "CALL sp_listar_vacantes()");
        assert_eq!(
            call_statement("sp_crear_postulacion", 3),
            "CALL sp_crear_postulacion(?, ?, ?)"
        );
    }

    #[test]
    fn json_values_bind_by_their_runtime_type() {
        assert_eq!(ProcParam::from_json(&json!(7)), ProcParam::Int(7));
        assert_eq!(ProcParam::from_json(&json!("7")), ProcParam::Text("7".into()));
        assert_eq!(ProcParam::from_json(&json!(2.5)), ProcParam::Float(2.5));
        assert_eq!(ProcParam::from_json(&json!(true)), ProcParam::Int(1));
        assert_eq!(ProcParam::from_json(&Value::Null), ProcParam::Null);
        assert_eq!(
            ProcParam::from_json(&json!(["python", "sql"])),
            ProcParam::Text("[\"python\",\"sql\"]".into())
        );
        assert_eq!(ProcParam::from(None::<String>), ProcParam::Null);
    }

    #[test]
    fn field_helpers_tolerate_loose_types() {
        let record = match json!({
            "id": "12",
            "titulo": "Backend",
            "score": 87.5,
            "cv_path": null,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        assert_eq!(field_i64(&record, "id"), Some(12));
        assert_eq!(field_i64(&record, "titulo"), None);
        assert_eq!(field_text(&record, "score"), "87.5");
        assert_eq!(field_text(&record, "cv_path"), "");
        assert_eq!(field_text(&record, "missing"), "");
    }
}
