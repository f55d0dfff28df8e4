//! Table schemas, subscriptions, and the table-id registry.
//!
//! Schemas are discovered by querying the primary (`SHOW FULL COLUMNS`) and
//! parsing each column's declared type string into a [`ColumnKind`]. The
//! registry also tracks the `table_id → (db, table)` bindings installed by
//! TABLE_MAP events; a binding is only meaningful between a TABLE_MAP and
//! the row events that follow it, and is silently replaced by the next
//! TABLE_MAP carrying the same id.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{RelayError, Result};

use super::collation::{CollationCatalog, CollationInfo};
use super::event::{field_type, RowKind, TableMapEvent};
use super::metadata::FullColumn;
use super::value::{ColumnKind, ColumnValue};

/// Identifies a table as `(db, table)`.
pub type TableKey = (String, String);

/// A decoded row change delivered to a table callback.
#[derive(Debug)]
pub struct RowEvent<'a> {
    pub db: &'a str,
    pub table: &'a str,
    pub kind: RowKind,
    pub columns: &'a [Column],
    /// Present for UPDATE and DELETE.
    pub before: Option<&'a [ColumnValue]>,
    /// Present for INSERT and UPDATE.
    pub after: Option<&'a [ColumnValue]>,
}

/// Per-table row callback.
pub type RowCallback = Arc<dyn Fn(RowEvent<'_>) + Send + Sync>;

/// Per-row filter: rows it rejects are not delivered. Applied to the
/// after-image for inserts and updates, the before-image for deletes.
pub type RowFilter = Arc<dyn Fn(&[ColumnValue]) -> bool + Send + Sync>;

/// Transaction-commit callback, receiving the originating server id.
pub type XidCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// One column of a discovered table schema.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A subscribed table: ordered columns plus the user's callback and filter.
#[derive(Clone)]
pub struct TableSchema {
    pub db: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub filter: Option<RowFilter>,
    pub callback: Option<RowCallback>,
}

impl std::fmt::Debug for TableSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSchema")
            .field("db", &self.db)
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("has_filter", &self.filter.is_some())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// The `(db, table)` binding installed by a TABLE_MAP, together with the
/// wire types and metadata the following row events decode against.
#[derive(Debug, Clone)]
pub struct TableBinding {
    pub key: TableKey,
    pub column_types: Vec<u8>,
    pub column_metadata: Vec<u16>,
}

/// Holds subscribed table schemas and the live table-id bindings.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: HashMap<TableKey, TableSchema>,
    bindings: HashMap<u64, TableBinding>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: TableSchema) {
        let key = (schema.db.clone(), schema.name.clone());
        self.tables.insert(key, schema);
    }

    pub fn get(&self, key: &TableKey) -> Option<&TableSchema> {
        self.tables.get(key)
    }

    pub fn get_mut(&mut self, key: &TableKey) -> Option<&mut TableSchema> {
        self.tables.get_mut(key)
    }

    pub fn contains(&self, key: &TableKey) -> bool {
        self.tables.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TableKey> {
        self.tables.keys()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Install (or replace) the binding a TABLE_MAP event carries.
    pub fn bind(&mut self, table_map: &TableMapEvent) {
        self.bindings.insert(
            table_map.table_id,
            TableBinding {
                key: (
                    table_map.schema_name.clone(),
                    table_map.table_name.clone(),
                ),
                column_types: table_map.column_types.clone(),
                column_metadata: table_map.column_metadata.clone(),
            },
        );
    }

    pub fn binding(&self, table_id: u64) -> Option<&TableBinding> {
        self.bindings.get(&table_id)
    }

    /// Bindings do not survive a reconnect; the new dump re-announces them.
    pub fn clear_bindings(&mut self) {
        self.bindings.clear();
    }

    /// Toggle per-column temporal storage from the wire types a TABLE_MAP
    /// listed: the plain type codes mean legacy layout, the `2`-suffixed
    /// codes mean packed layout. Only meaningful on a 5.6+ primary.
    pub fn apply_temporal_reset(&mut self, table_map: &TableMapEvent) {
        let key = (
            table_map.schema_name.clone(),
            table_map.table_name.clone(),
        );
        let Some(schema) = self.tables.get_mut(&key) else {
            return;
        };
        if schema.columns.len() != table_map.column_types.len() {
            return;
        }
        for (column, &wire_type) in schema.columns.iter_mut().zip(&table_map.column_types) {
            match wire_type {
                field_type::TIMESTAMP | field_type::DATETIME | field_type::TIME => {
                    column.kind.reset_storage(true)
                }
                field_type::TIMESTAMP2 | field_type::DATETIME2 | field_type::TIME2 => {
                    column.kind.reset_storage(false)
                }
                _ => {}
            }
        }
    }
}

/// Build the ordered column list for a table from its `SHOW FULL COLUMNS`
/// rows.
///
/// `is_old_storage` seeds the temporal layout from the primary's version;
/// TABLE_MAP events may re-toggle it per column later.
pub fn build_columns(
    rows: &[FullColumn],
    catalog: &CollationCatalog,
    is_old_storage: bool,
) -> Result<Vec<Column>> {
    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let collation = match row.collation.as_deref() {
            Some(name) => Some(
                catalog
                    .get(name)
                    .ok_or_else(|| {
                        RelayError::schema(format!(
                            "cannot find collation '{}' for column '{}' of type {}",
                            name, row.field, row.type_str
                        ))
                    })?
                    .clone(),
            ),
            None => None,
        };
        let kind = parse_column_type(&row.type_str, collation, is_old_storage)
            .map_err(|e| RelayError::schema(format!("column '{}': {}", row.field, e)))?;
        columns.push(Column::new(row.field.clone(), kind));
    }
    Ok(columns)
}

/// Parse a declared column type string (as reported by `SHOW FULL COLUMNS`)
/// into its decoder variant.
fn parse_column_type(
    type_str: &str,
    collation: Option<CollationInfo>,
    is_old_storage: bool,
) -> std::result::Result<ColumnKind, String> {
    let lower = type_str.trim().to_ascii_lowercase();
    let base: String = lower
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let unsigned = lower.contains(" unsigned");

    let kind = match base.as_str() {
        "tinyint" | "bool" | "boolean" => ColumnKind::Tiny { unsigned },
        "smallint" => ColumnKind::Short { unsigned },
        "mediumint" => ColumnKind::Int24 { unsigned },
        "int" | "integer" => ColumnKind::Long { unsigned },
        "bigint" => ColumnKind::LongLong { unsigned },
        "float" => ColumnKind::Float,
        "double" | "real" => ColumnKind::Double,
        "year" => ColumnKind::Year,
        "date" => ColumnKind::Date,
        "datetime" => ColumnKind::DateTime {
            decimals: paren_number(&lower).unwrap_or(0) as u8,
            old_storage: is_old_storage,
        },
        "timestamp" => ColumnKind::Timestamp {
            decimals: paren_number(&lower).unwrap_or(0) as u8,
            old_storage: is_old_storage,
        },
        "time" => ColumnKind::Time {
            decimals: paren_number(&lower).unwrap_or(0) as u8,
            old_storage: is_old_storage,
        },
        "varchar" => {
            let chars =
                paren_number(&lower).ok_or_else(|| format!("no length in '{}'", type_str))?;
            let collation =
                collation.ok_or_else(|| format!("text column '{}' has no collation", type_str))?;
            ColumnKind::Varchar {
                max_bytes: chars * collation.maxlen,
                collation: Some(collation),
            }
        }
        "varbinary" => {
            let bytes =
                paren_number(&lower).ok_or_else(|| format!("no length in '{}'", type_str))?;
            ColumnKind::Varchar {
                max_bytes: bytes,
                collation: None,
            }
        }
        "char" => {
            let collation =
                collation.ok_or_else(|| format!("text column '{}' has no collation", type_str))?;
            ColumnKind::FixedString {
                collation: Some(collation),
            }
        }
        "binary" => ColumnKind::FixedString { collation: None },
        "enum" => ColumnKind::Enum {
            members: count_list_members(&lower),
        },
        "set" => ColumnKind::Set {
            members: count_list_members(&lower),
        },
        "bit" => ColumnKind::Bit,
        "tinyblob" | "blob" | "mediumblob" | "longblob" | "tinytext" | "text" | "mediumtext"
        | "longtext" => ColumnKind::Blob,
        _ => return Err(format!("unsupported column type '{}'", type_str)),
    };
    Ok(kind)
}

/// First number inside the type's parentheses, e.g. `varchar(16)` -> 16.
fn paren_number(type_str: &str) -> Option<u32> {
    let start = type_str.find('(')? + 1;
    let rest = &type_str[start..];
    let end = rest.find([',', ')'])?;
    rest[..end].trim().parse().ok()
}

/// Number of quoted members in an `enum(...)`/`set(...)` declaration.
/// Handles commas and doubled quotes inside members.
fn count_list_members(type_str: &str) -> u16 {
    let mut count = 0u16;
    let mut in_quote = false;
    let mut chars = type_str.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if in_quote {
                if chars.peek() == Some(&'\'') {
                    chars.next(); // doubled quote inside a member
                } else {
                    in_quote = false;
                    count += 1;
                }
            } else {
                in_quote = true;
            }
        }
    }
    count
}
