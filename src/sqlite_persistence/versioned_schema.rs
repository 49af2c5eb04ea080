use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};

/// Offset added to the schema version stored in `PRAGMA user_version`, so that a
/// database created by some other tool (user_version = 0) is never mistaken for ours.
pub const BASE_DB_VERSION: usize = 7000;

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
                foreign_key: None,
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

    fn parse(declared: &str) -> Option<&'static SqlType> {
        match declared {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            _ => None,
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    /// Every reference in this crate cascades: dependent rows are meaningless
    /// without their parent.
    pub cascade_on_delete: bool,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// (index name, comma separated columns)
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
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
                if let Some(fk) = column.foreign_key {
                    def.push_str(&format!(
                        " REFERENCES {}({}) ON DELETE {}",
                        fk.foreign_table,
                        fk.foreign_column,
                        if fk.cascade_on_delete {
                            "CASCADE"
                        } else {
                            "NO ACTION"
                        }
                    ));
                }
                def
            })
            .collect();

        for constraint in self.unique_constraints {
            parts.push(format!("UNIQUE ({})", constraint.join(", ")));
        }

        format!("CREATE TABLE {} ({});", self.name, parts.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;
        for (index_name, columns) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, columns),
                params![],
            )
            .with_context(|| format!("Failed to create index {}", index_name))?;
        }
        Ok(())
    }

    /// Checks that the live table has the declared columns, in order, with the
    /// declared types and nullability, and that every declared index exists.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual: Vec<(String, String, bool, bool)> = stmt
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)? == 1,
                    row.get::<_, i32>(5)? > 0,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;

        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}",
                self.name,
                actual.len(),
                self.columns.len()
            );
        }

        for ((name, declared_type, non_null, primary_key), expected) in
            actual.iter().zip(self.columns.iter())
        {
            if name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    name
                );
            }
            match SqlType::parse(declared_type) {
                Some(sql_type) if sql_type == expected.sql_type => {}
                _ => bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    name,
                    expected.sql_type,
                    declared_type
                ),
            }
            if *non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    name,
                    expected.non_null,
                    non_null
                );
            }
            if *primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch",
                    self.name,
                    name
                );
            }
        }

        for (index_name, _) in self.indices {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
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
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Opens (creating if needed) a database that follows `schemas`, validating the
/// stored version and running forward migrations.
///
/// A database without any table is considered fresh and gets the latest schema.
pub fn open_versioned(conn: Connection, schemas: &[VersionedSchema]) -> Result<Connection> {
    let latest = schemas.last().context("No schema versions declared")?;
    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        tracing::info!("Creating db schema at version {}", latest.version);
        latest.create(&conn)?;
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let stored = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<_, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;
    if stored < 0 {
        bail!("Database version {} predates base version {}", stored, BASE_DB_VERSION);
    }
    let version = stored as usize;
    let schema = match schemas.iter().find(|s| s.version == version) {
        Some(schema) => schema,
        None => bail!("Database version {} is unknown", version),
    };
    schema.validate(&conn)?;

    let mut current = version;
    for schema in schemas.iter().filter(|s| s.version > version) {
        if let Some(migration) = schema.migration {
            tracing::info!("Migrating db from version {} to {}", current, schema.version);
            migration(&conn)?;
        }
        current = schema.version;
    }
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + current),
        [],
    )?;

    Ok(conn)
}
