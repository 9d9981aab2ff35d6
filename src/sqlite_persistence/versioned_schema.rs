use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

/// Offset added to the schema version stored in `PRAGMA user_version`, so that
/// a database created by another tool is never mistaken for version 0.
pub const BASE_DB_VERSION: usize = 7000;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<&'static str>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    sql.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    sql.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    sql.push_str(&format!(" DEFAULT {}", default_value));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(&format!("CREATE TABLE {} ({});", self.name, columns), params![])?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, column_name),
                params![],
            )?;
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    /// Checks that every table exists with the expected column names and types.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
            let actual_columns: Vec<(String, String)> = stmt
                .query_map(params![], |row| Ok((row.get(1)?, row.get(2)?)))?
                .collect::<Result<_, _>>()?;

            if actual_columns.len() != table.columns.len() {
                bail!(
                    "Table {} has {} columns, expected {}",
                    table.name,
                    actual_columns.len(),
                    table.columns.len()
                );
            }

            for ((actual_name, actual_type), expected) in
                actual_columns.iter().zip(table.columns.iter())
            {
                if actual_name != expected.name {
                    bail!(
                        "Table {} column name mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        actual_name
                    );
                }
                if actual_type != expected.sql_type.as_sql() {
                    bail!(
                        "Table {} column {} type mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        expected.sql_type.as_sql(),
                        actual_type
                    );
                }
            }
        }
        Ok(())
    }
}

/// Opens (or creates) a database file and brings it to the latest schema version.
pub fn open_versioned<P: AsRef<Path>>(db_path: P, schemas: &[VersionedSchema]) -> Result<Connection> {
    let latest = schemas.last().context("No schemas defined")?;

    let conn = if db_path.as_ref().exists() {
        Connection::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path.as_ref()))?
    } else {
        let conn = Connection::open(&db_path)?;
        latest.create(&conn)?;
        info!("Created new tracker database at {:?}", db_path.as_ref());
        conn
    };

    let db_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;

    if db_version < 0 {
        bail!(
            "Database version {} is too old, does not contain base db version {}",
            db_version,
            BASE_DB_VERSION
        );
    }
    let version = db_version as usize;
    if version >= schemas.len() {
        bail!(
            "Database version {} is too new (max supported: {})",
            version,
            schemas.len() - 1
        );
    }

    schemas
        .get(version)
        .context("Failed to get schema")?
        .validate(&conn)?;

    migrate_if_needed(&conn, schemas, version)?;
    Ok(conn)
}

fn migrate_if_needed(conn: &Connection, schemas: &[VersionedSchema], current: usize) -> Result<()> {
    let target = schemas.len() - 1;
    if current >= target {
        return Ok(());
    }

    info!("Migrating database from version {} to {}", current, target);
    for schema in schemas.iter().skip(current + 1) {
        if let Some(migration_fn) = schema.migration {
            info!("Running migration to version {}", schema.version);
            migration_fn(conn)?;
        }
    }

    conn.execute(&format!("PRAGMA user_version = {}", BASE_DB_VERSION + target), [])?;
    Ok(())
}
