//! Row mapping shared by the three entity tables.
//!
//! Each model is stored column-per-field. Rows are turned into flat records
//! keyed by the model's serde field names and decoded through the same
//! lenient deserializers used for inbound payloads, so the table layer and
//! the sync layer agree on one record shape.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{
    EntityKind, LocalId, Project, Record, RemoteId, Stored, TimeEntry, WorkPackage,
};
use crate::sync::SavedEntity;

pub trait Table: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    /// `(column, record key)` pairs, excluding the `id` primary key.
    const COLUMNS: &'static [(&'static str, &'static str)];

    /// Local id of the parent row, for kinds that have one.
    fn parent_id(&self) -> Option<LocalId>;

    fn check(&self) -> Result<()>;

    fn saved_entity(stored: &Stored<Self>, parent_remote_id: Option<RemoteId>)
        -> SavedEntity<'_>;
}

impl Table for Project {
    const KIND: EntityKind = EntityKind::Project;
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("openproject_id", "openproject_id"),
        ("identifier", "identifier"),
        ("name", "name"),
        ("active", "active"),
        ("public", "public"),
        ("description", "description"),
    ];

    fn parent_id(&self) -> Option<LocalId> {
        None
    }

    fn check(&self) -> Result<()> {
        self.validate()
    }

    fn saved_entity(stored: &Stored<Self>, _: Option<RemoteId>) -> SavedEntity<'_> {
        SavedEntity::Project(stored)
    }
}

impl Table for WorkPackage {
    const KIND: EntityKind = EntityKind::WorkPackage;
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("openproject_id", "openproject_id"),
        ("project_id", "project"),
        ("subject", "subject"),
        ("description", "description"),
        ("start_date", "startDate"),
        ("due_date", "dueDate"),
        ("derived_start_date", "derivedStartDate"),
        ("derived_due_date", "derivedDueDate"),
        ("spent_time", "spentTime"),
        ("estimated_time", "estimatedTime"),
        ("derived_estimated_time", "derivedEstimatedTime"),
        ("derived_remaining_time", "derivedRemainingTime"),
        ("duration", "duration"),
        ("labor_costs", "laborCosts"),
        ("material_costs", "materialCosts"),
        ("overall_costs", "overallCosts"),
        ("schedule_manually", "scheduleManually"),
        ("ignore_non_working_days", "ignoreNonWorkingDays"),
        ("percentage_done", "percentageDone"),
        ("derived_percentage_done", "derivedPercentageDone"),
        ("lock_version", "lockVersion"),
        ("created_at", "createdAt"),
        ("updated_at", "updatedAt"),
    ];

    fn parent_id(&self) -> Option<LocalId> {
        Some(self.project)
    }

    fn check(&self) -> Result<()> {
        self.validate()
    }

    fn saved_entity(
        stored: &Stored<Self>,
        parent_remote_id: Option<RemoteId>,
    ) -> SavedEntity<'_> {
        SavedEntity::WorkPackage {
            work_package: stored,
            project_remote_id: parent_remote_id,
        }
    }
}

impl Table for TimeEntry {
    const KIND: EntityKind = EntityKind::TimeEntry;
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("openproject_id", "openproject_id"),
        ("work_package_id", "work_package"),
        ("ongoing", "ongoing"),
        ("comment", "comment"),
        ("spent_on", "spentOn"),
        ("hours", "hours"),
        ("created_at", "createdAt"),
        ("updated_at", "updatedAt"),
    ];

    fn parent_id(&self) -> Option<LocalId> {
        Some(self.work_package)
    }

    fn check(&self) -> Result<()> {
        self.validate()
    }

    fn saved_entity(
        stored: &Stored<Self>,
        parent_remote_id: Option<RemoteId>,
    ) -> SavedEntity<'_> {
        SavedEntity::TimeEntry {
            time_entry: stored,
            work_package_remote_id: parent_remote_id,
        }
    }
}

fn column_list<T: Table>() -> String {
    T::COLUMNS
        .iter()
        .map(|(column, _)| *column)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(flag)) => SqlValue::Integer(i64::from(*flag)),
        Some(Value::Number(number)) => number.as_i64().map_or_else(
            || SqlValue::Real(number.as_f64().unwrap_or_default()),
            SqlValue::Integer,
        ),
        Some(Value::String(text)) => SqlValue::Text(text.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(number) => Value::from(number),
        ValueRef::Real(number) => Value::from(number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
    }
}

/// Serialize a model into column values in `T::COLUMNS` order.
fn column_values<T: Table>(fields: &T) -> Result<Vec<SqlValue>> {
    let Value::Object(record) = serde_json::to_value(fields)? else {
        return Err(Error::InvalidInput(format!(
            "{} did not serialize to an object",
            T::KIND
        )));
    };
    Ok(T::COLUMNS
        .iter()
        .map(|(_, key)| to_sql(record.get(*key)))
        .collect())
}

/// Decode a model from a flat record, ignoring unknown keys.
pub fn decode<T: Table>(record: Record) -> Result<T> {
    serde_json::from_value(Value::Object(record))
        .map_err(|error| Error::Validation(format!("invalid {} record: {error}", T::KIND)))
}

fn parse_row<T: Table>(row: &Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    record.insert("id".to_string(), Value::from(row.get::<_, i64>(0)?));
    for (index, (_, key)) in T::COLUMNS.iter().enumerate() {
        record.insert((*key).to_string(), from_sql(row.get_ref(index + 1)?));
    }
    Ok(record)
}

fn decode_stored<T: Table>(record: Record) -> Result<Stored<T>> {
    serde_json::from_value(Value::Object(record)).map_err(|error| {
        Error::InvalidInput(format!("corrupt {} row: {error}", T::KIND))
    })
}

/// Insert a new row and return its local id.
pub fn insert<T: Table>(conn: &Connection, fields: &T) -> Result<LocalId> {
    let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        T::KIND.table(),
        column_list::<T>()
    );
    conn.execute(&sql, params_from_iter(column_values(fields)?))?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every column of an existing row.
pub fn write<T: Table>(conn: &Connection, id: LocalId, fields: &T) -> Result<()> {
    let assignments = T::COLUMNS
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {assignments} WHERE id = ?", T::KIND.table());

    let mut values = column_values(fields)?;
    values.push(SqlValue::Integer(id));
    let rows = conn.execute(&sql, params_from_iter(values))?;
    if rows == 0 {
        return Err(Error::not_found(T::KIND, id));
    }
    Ok(())
}

/// Rows matching `filter` (an SQL condition over `params`), oldest first.
pub fn select<T: Table>(
    conn: &Connection,
    filter: &str,
    params: &[SqlValue],
) -> Result<Vec<Stored<T>>> {
    let sql = format!(
        "SELECT id, {} FROM {} WHERE {filter} ORDER BY id",
        column_list::<T>(),
        T::KIND.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params_from_iter(params), parse_row::<T>)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    records.into_iter().map(decode_stored::<T>).collect()
}

pub fn get<T: Table>(conn: &Connection, id: LocalId) -> Result<Option<Stored<T>>> {
    Ok(select(conn, "id = ?", &[SqlValue::Integer(id)])?
        .into_iter()
        .next())
}

/// The oldest row carrying a remote identity.
pub fn find_by_remote<T: Table>(
    conn: &Connection,
    remote_id: RemoteId,
) -> Result<Option<Stored<T>>> {
    Ok(
        select(conn, "openproject_id = ?", &[SqlValue::Integer(remote_id)])?
            .into_iter()
            .next(),
    )
}

pub fn local_id_for(
    conn: &Connection,
    kind: EntityKind,
    remote_id: RemoteId,
) -> Result<Option<LocalId>> {
    let sql = format!(
        "SELECT id FROM {} WHERE openproject_id = ? ORDER BY id LIMIT 1",
        kind.table()
    );
    Ok(conn
        .query_row(&sql, [remote_id], |row| row.get(0))
        .optional()?)
}

pub fn remote_id_for(
    conn: &Connection,
    kind: EntityKind,
    id: LocalId,
) -> Result<Option<RemoteId>> {
    let sql = format!("SELECT openproject_id FROM {} WHERE id = ?", kind.table());
    Ok(conn
        .query_row(&sql, [id], |row| row.get::<_, Option<RemoteId>>(0))
        .optional()?
        .flatten())
}
