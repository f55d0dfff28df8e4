//! Secondary SQL connection for introspection.
//!
//! The replication connection speaks the dump protocol and cannot read
//! ordinary result sets, so every `SHOW`/`SELECT` used for discovery runs on
//! a short-lived `mysql_async` connection instead: version and binlog-format
//! checks, slave-host enumeration, `SHOW MASTER STATUS`, column and
//! collation introspection.

use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Row};
use std::collections::HashSet;
use tracing::debug;

use crate::common::{BinlogPosition, RelayError, Result};

/// One row of `SHOW FULL COLUMNS`: the fields schema discovery consumes.
#[derive(Debug, Clone)]
pub struct FullColumn {
    pub field: String,
    pub type_str: String,
    pub collation: Option<String>,
}

/// Connection settings for the metadata session.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
}

/// The introspection connection.
pub struct MetadataConnection {
    conn: Conn,
}

impl MetadataConnection {
    pub async fn connect(config: &MetadataConfig) -> Result<Self> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(config.password.clone());

        let conn = Conn::new(opts)
            .await
            .map_err(|e| RelayError::replication(format!("metadata connection failed: {}", e)))?;

        debug!("metadata connection established to {}:{}", config.host, config.port);
        Ok(Self { conn })
    }

    /// `SELECT VERSION()`
    pub async fn server_version(&mut self) -> Result<String> {
        let version: Option<String> = self
            .conn
            .query_first("SELECT VERSION()")
            .await
            .map_err(|e| RelayError::replication(format!("SELECT VERSION() failed: {}", e)))?;
        version.ok_or_else(|| RelayError::config("could not SELECT VERSION()"))
    }

    /// `SHOW GLOBAL VARIABLES LIKE 'binlog_format'`
    pub async fn binlog_format(&mut self) -> Result<String> {
        let row: Option<Row> = self
            .conn
            .query_first("SHOW GLOBAL VARIABLES LIKE 'binlog_format'")
            .await
            .map_err(|e| {
                RelayError::replication(format!("binlog_format query failed: {}", e))
            })?;
        row.and_then(|r| r.get::<String, usize>(1))
            .ok_or_else(|| {
                RelayError::config("could not SHOW GLOBAL VARIABLES LIKE 'binlog_format'")
            })
    }

    /// Server ids already taken by registered replicas (`SHOW SLAVE HOSTS`).
    pub async fn replica_server_ids(&mut self) -> Result<HashSet<u32>> {
        let rows: Vec<Row> = self
            .conn
            .query("SHOW SLAVE HOSTS")
            .await
            .map_err(|e| RelayError::replication(format!("SHOW SLAVE HOSTS failed: {}", e)))?;

        let mut ids = HashSet::with_capacity(rows.len());
        for row in rows {
            let id: u32 = row.get(0).ok_or_else(|| {
                RelayError::config("SHOW SLAVE HOSTS did not return 'Server_id'")
            })?;
            ids.insert(id);
        }
        Ok(ids)
    }

    /// The primary's current binlog frontier (`SHOW MASTER STATUS`).
    pub async fn master_status(&mut self) -> Result<BinlogPosition> {
        let row: Option<Row> = self
            .conn
            .query_first("SHOW MASTER STATUS")
            .await
            .map_err(|e| RelayError::replication(format!("SHOW MASTER STATUS failed: {}", e)))?;

        let row = row.ok_or_else(|| {
            RelayError::config(
                "SHOW MASTER STATUS returned no rows; binary logging may be disabled",
            )
        })?;
        let file: String = row
            .get(0)
            .ok_or_else(|| RelayError::config("SHOW MASTER STATUS did not return 'File'"))?;
        let pos: u64 = row
            .get(1)
            .ok_or_else(|| RelayError::config("SHOW MASTER STATUS did not return 'Position'"))?;

        Ok(BinlogPosition::new(file, pos as u32))
    }

    /// `SHOW FULL COLUMNS FROM db.table`, reduced to name/type/collation.
    pub async fn full_columns(&mut self, db: &str, table: &str) -> Result<Vec<FullColumn>> {
        let query = format!("SHOW FULL COLUMNS FROM `{}`.`{}`", db, table);
        let rows: Vec<Row> = self
            .conn
            .query(query)
            .await
            .map_err(|e| {
                RelayError::schema(format!(
                    "SHOW FULL COLUMNS FROM {}.{} failed: {}",
                    db, table, e
                ))
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let field: String = row.get(0).ok_or_else(|| {
                RelayError::schema("SHOW FULL COLUMNS did not return 'Field'")
            })?;
            let type_str: String = row.get(1).ok_or_else(|| {
                RelayError::schema("SHOW FULL COLUMNS did not return 'Type'")
            })?;
            let collation: Option<String> = row.get(2).flatten();
            columns.push(FullColumn {
                field,
                type_str,
                collation,
            });
        }
        Ok(columns)
    }

    /// `SHOW CHARACTER SET` rows as `(charset, maxlen)`.
    pub async fn character_sets(&mut self) -> Result<Vec<(String, u32)>> {
        let rows: Vec<Row> = self
            .conn
            .query("SHOW CHARACTER SET")
            .await
            .map_err(|e| RelayError::schema(format!("SHOW CHARACTER SET failed: {}", e)))?;

        let mut sets = Vec::with_capacity(rows.len());
        for row in rows {
            let charset: String = row.get(0).ok_or_else(|| {
                RelayError::schema("SHOW CHARACTER SET did not return 'Charset'")
            })?;
            let maxlen: u32 = row.get(3).ok_or_else(|| {
                RelayError::schema("SHOW CHARACTER SET did not return 'Maxlen'")
            })?;
            sets.push((charset, maxlen));
        }
        Ok(sets)
    }

    /// `SHOW COLLATION` rows as `(collation, charset)`.
    pub async fn collations(&mut self) -> Result<Vec<(String, String)>> {
        let rows: Vec<Row> = self
            .conn
            .query("SHOW COLLATION")
            .await
            .map_err(|e| RelayError::schema(format!("SHOW COLLATION failed: {}", e)))?;

        let mut collations = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get(0).ok_or_else(|| {
                RelayError::schema("SHOW COLLATION did not return 'Collation'")
            })?;
            let charset: String = row.get(1).ok_or_else(|| {
                RelayError::schema("SHOW COLLATION did not return 'Charset'")
            })?;
            collations.push((name, charset));
        }
        Ok(collations)
    }

    pub async fn disconnect(self) {
        let _ = self.conn.disconnect().await;
    }
}
