//! MySQL replication: protocol client, binlog decoding, schema discovery,
//! and the replica state machine.
//!
//! # Architecture
//!
//! ```text
//! MySQL binlog -> ReplicationConnection -> event parser -> field decoders
//!                                                |
//!                         SchemaRegistry <- TABLE_MAP
//!                                                |
//!                                      per-table RowCallback
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use binlog_relay::common::MemoryStateStore;
//! use binlog_relay::mysql::{MySqlReplica, MySqlReplicaConfig};
//!
//! # async fn example() -> binlog_relay::common::Result<()> {
//! let config = MySqlReplicaConfig::new("localhost", "repl").with_password("secret");
//! let mut replica = MySqlReplica::new(config, Arc::new(MemoryStateStore::new()));
//!
//! replica.subscribe("shop", "item", |event| {
//!     println!("{:?} on {}.{}", event.kind, event.db, event.table);
//! });
//!
//! replica.run(|| false).await
//! # }
//! ```

pub mod client;
pub mod collation;
pub mod ddl;
pub mod event;
pub mod metadata;
pub mod protocol;
pub mod schema;
pub mod value;

pub use client::{ChecksumAlg, MySqlReplica, MySqlReplicaConfig};
pub use collation::{CollationCatalog, CollationInfo};
pub use event::{
    EventHeader, EventType, FormatDescriptionEvent, QueryEvent, RotateEvent, RowImagePair,
    RowKind, RowsEvent, TableMapEvent, XidEvent,
};
pub use schema::{
    Column, RowCallback, RowEvent, RowFilter, SchemaRegistry, TableKey, TableSchema, XidCallback,
};
pub use value::{ColumnKind, ColumnValue};
