//! # binlog-relay — stream a MySQL primary's row changes as typed values
//!
//! This library impersonates a replica of a MySQL (5.1.23+) primary: it
//! opens a replication session over the client protocol, consumes the
//! row-based binary log, decodes each row event into typed column values
//! against the table's introspected schema, and delivers the rows to
//! per-table callbacks. The replication position is tracked through a
//! pluggable state store so a consumer can resume at a precise log file and
//! offset after a restart.
//!
//! ## What it does
//!
//! - Replication handshake: version and binlog-format checks, slave
//!   registration, checksum negotiation, position bootstrap, dump request
//! - A read loop with reconnection, position advancement, and schema
//!   re-discovery when DDL touches a subscribed table
//! - A typed row-event decoder: TABLE_MAP plus WRITE/UPDATE/DELETE rows
//!   events (V1 and V2), column metadata, null bitmaps, temporal types in
//!   both the legacy and the 5.6.4+ packed layouts, per-event CRC32
//!   checksums
//!
//! ## What it does not do
//!
//! Statement-based or mixed binlog, GTID positioning, multi-source
//! replication, and applying SQL to a local store are out of scope.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use binlog_relay::common::FileStateStore;
//! use binlog_relay::mysql::{MySqlReplica, MySqlReplicaConfig};
//!
//! # async fn example() -> binlog_relay::common::Result<()> {
//! let state = Arc::new(FileStateStore::new("/var/lib/myapp/binlog-state.json").await?);
//! let config = MySqlReplicaConfig::new("db1.internal", "repl")
//!     .with_password("secret")
//!     .with_connect_retry(10);
//!
//! let mut replica = MySqlReplica::new(config, state);
//! replica.subscribe("shop", "item", |event| {
//!     println!("{:?}: {:?}", event.kind, event.after);
//! });
//! replica.on_xid(|server_id| println!("commit from server {}", server_id));
//!
//! // Blocks until the interrupt predicate returns true.
//! replica.run(|| false).await
//! # }
//! ```

pub mod common;
pub mod mysql;

pub use common::{
    BinlogPosition, CountingStats, FileStateStore, MemoryStateStore, RelayError,
    ReplicaStateStore, ReplicaStats, Result,
};
pub use mysql::{
    ColumnKind, ColumnValue, MySqlReplica, MySqlReplicaConfig, RowEvent, RowKind,
};
