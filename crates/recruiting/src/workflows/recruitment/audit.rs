use chrono::NaiveDate;
use serde::Deserialize;

use crate::procedures::{field_text, Record};

const ACTOR_FIELD: &str = "usuario_mysql";
const ACTION_FIELD: &str = "accion";
const DATE_FIELD: &str = "fecha";

/// Raw query string of the audit page; every parameter is optional free text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub user: Option<String>,
    pub accion: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Filter applied to the audit log after it is fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub user: Option<String>,
    pub action: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl From<AuditQuery> for AuditFilter {
    fn from(query: AuditQuery) -> Self {
        Self {
            user: non_blank(query.user).map(|value| value.to_lowercase()),
            action: non_blank(query.accion).map(|value| value.to_lowercase()),
            from: query.from.as_deref().and_then(parse_day),
            to: query.to.as_deref().and_then(parse_day),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl AuditFilter {
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(user) = &self.user {
            if !field_text(record, ACTOR_FIELD).to_lowercase().contains(user) {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if !field_text(record, ACTION_FIELD).to_lowercase().contains(action) {
                return false;
            }
        }

        // Rows without a readable date stay visible.
        match parse_day(&field_text(record, DATE_FIELD)) {
            Some(day) => {
                self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
            }
            None => true,
        }
    }

    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect()
    }
}

/// Writes records as CSV; the header is the union of fields in first-seen order.
pub fn write_csv<W: std::io::Write>(records: &[Record], writer: W) -> Result<(), csv::Error> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key.as_str());
            }
        }
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    if columns.is_empty() {
        csv_writer.flush()?;
        return Ok(());
    }

    csv_writer.write_record(&columns)?;
    for record in records {
        csv_writer.write_record(columns.iter().map(|column| field_text(record, column)))?;
    }
    csv_writer.flush()?;
    Ok(())
}
