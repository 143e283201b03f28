use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};

pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column {
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
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn from_sql(declared: &str) -> Option<&'static SqlType> {
        match declared {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
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
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    def.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    def.push_str(&format!(" DEFAULT {}", default_value));
                }
                def
            })
            .collect();
        for unique in self.unique_constraints {
            columns.push(format!("UNIQUE ({})", unique.join(", ")));
        }
        format!("CREATE TABLE {} ({});", self.name, columns.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, column_name),
                params![],
            )?;
        }
        Ok(())
    }

    /// Checks column names and types against the live table, in order.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual: Vec<(String, String)> = stmt
            .query_map(params![], |row| Ok((row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;

        if actual.is_empty() {
            bail!("Table {} does not exist", self.name);
        }
        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}",
                self.name,
                actual.len(),
                self.columns.len()
            );
        }
        for ((name, declared), expected) in actual.iter().zip(self.columns) {
            if name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    name
                );
            }
            if SqlType::from_sql(declared) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    name,
                    expected.sql_type,
                    declared
                );
            }
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
        set_db_version(conn, self.version)
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

pub fn set_db_version(conn: &Connection, version: usize) -> Result<()> {
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + version),
        [],
    )?;
    Ok(())
}

/// Schema version relative to `BASE_DB_VERSION`.
pub fn read_db_version(conn: &Connection) -> Result<usize> {
    let raw = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?;
    let version = raw - BASE_DB_VERSION as i64;
    if version < 0 {
        bail!(
            "Database version {} does not contain base db version {}",
            raw,
            BASE_DB_VERSION
        );
    }
    Ok(version as usize)
}

/// Creates the latest schema on an empty database, otherwise validates the
/// stored version and runs any pending migrations.
pub fn migrate_if_needed(conn: &Connection, schemas: &[VersionedSchema]) -> Result<()> {
    let latest = schemas.last().context("No schemas defined")?;

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
        [],
        |row| row.get(0),
    )?;
    if table_count == 0 {
        return latest.create(conn);
    }

    let version = read_db_version(conn)?;
    let current = schemas.get(version).with_context(|| {
        format!(
            "Database version {} is too new (max supported: {})",
            version, latest.version
        )
    })?;
    current.validate(conn)?;

    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration) = schema.migration {
            tracing::info!("Running migration to version {}", schema.version);
            migration(conn)?;
        }
    }
    if version < latest.version {
        set_db_version(conn, latest.version)?;
    }
    Ok(())
}
