//! The replication client: handshake, read loop, reconnection.
//!
//! [`MySqlReplica::run`] drives a state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Handshaking -> Streaming
//!                     ^                            |
//!                     |        (read error)        |
//!                     +------- Reconnecting <------+
//! ```
//!
//! Connecting is the retry loop in `connect_replication`; Handshaking is
//! `stream_session`'s prologue (checksum negotiation, position bootstrap,
//! dump request); Streaming is its packet loop. A read error ends the
//! session with a reconnect verdict, which loops back into Connecting and
//! re-enters the handshake — slave registration is not repeated. The
//! terminal Stopped state is reached when the caller's interrupt predicate
//! returns true.
//!
//! Error discipline (see `common::error`): configuration and schema errors
//! escape `run`; transport errors reconnect; an event that fails to decode
//! ticks the stats sink, pauses one second, and the loop continues.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::common::{BinlogPosition, RelayError, ReplicaStateStore, ReplicaStats, Result};

use super::collation::CollationCatalog;
use super::ddl::DdlWatcher;
use super::event::{
    self, EventHeader, EventType, FormatDescriptionEvent, QueryEvent, RotateEvent, RowKind,
    RowsEvent, TableMapEvent, XidEvent, EVENT_HEADER_LEN,
};
use super::metadata::{MetadataConfig, MetadataConnection};
use super::protocol::{error_code, BinlogPacket, ReplicationConnection, CR_SERVER_LOST};
use super::schema::{
    build_columns, RowCallback, RowEvent, RowFilter, SchemaRegistry, TableKey, TableSchema,
    XidCallback,
};

const ER_NET_PACKET_TOO_LARGE: u16 = 1153;
const ER_UNKNOWN_SYSTEM_VARIABLE: u16 = 1193;
const ER_MASTER_FATAL_ERROR_READING_BINLOG: u16 = 1236;

/// Replication works from 5.1.23 on.
const MIN_PRIMARY_VERSION: u32 = 50_123;
/// Temporal storage changed in 5.6.4.
const PACKED_TEMPORAL_VERSION: u32 = 50_604;

/// Negotiated per-event checksum algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlg {
    Off,
    Crc32,
}

/// Connection settings for the primary.
///
/// The `report_*` fields are what `COM_REGISTER_SLAVE` announces to the
/// primary; the defaults are the identity this library has always reported
/// and are not credentials.
#[derive(Clone)]
pub struct MySqlReplicaConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Seconds to sleep between connection attempts.
    pub connect_retry_secs: u64,
    /// Hostname reported in COM_REGISTER_SLAVE. Defaults to `$HOSTNAME`,
    /// falling back to `0.0.0.0`.
    pub report_host: Option<String>,
    pub report_user: String,
    pub report_password: String,
    pub report_port: u16,
}

impl std::fmt::Debug for MySqlReplicaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlReplicaConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("connect_retry_secs", &self.connect_retry_secs)
            .field("report_host", &self.report_host)
            .field("report_user", &self.report_user)
            .field("report_port", &self.report_port)
            .finish()
    }
}

impl Default for MySqlReplicaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            connect_retry_secs: 10,
            report_host: None,
            report_user: "begun_slave".to_string(),
            report_password: "begun_slave".to_string(),
            report_port: 0,
        }
    }
}

impl MySqlReplicaConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_retry(mut self, secs: u64) -> Self {
        self.connect_retry_secs = secs;
        self
    }

    pub fn with_report_host(mut self, host: impl Into<String>) -> Self {
        self.report_host = Some(host.into());
        self
    }

    pub fn with_report_identity(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
        port: u16,
    ) -> Self {
        self.report_user = user.into();
        self.report_password = password.into();
        self.report_port = port;
        self
    }
}

/// Everything the client knows about the primary it impersonates a replica
/// of. Mutated only by the read loop and the startup checks.
#[derive(Debug)]
struct MasterInfo {
    version: u32,
    is_old_storage: bool,
    master_ge56: bool,
    checksum_alg: ChecksumAlg,
    position: BinlogPosition,
}

impl Default for MasterInfo {
    fn default() -> Self {
        Self {
            version: 0,
            is_old_storage: true,
            master_ge56: false,
            checksum_alg: ChecksumAlg::Off,
            position: BinlogPosition::default(),
        }
    }
}

enum SessionEnd {
    Interrupted,
    Reconnect,
}

/// A client that impersonates a MySQL replica and delivers decoded row
/// changes to per-table callbacks.
pub struct MySqlReplica {
    config: MySqlReplicaConfig,
    state: Arc<dyn ReplicaStateStore>,
    stats: Option<Arc<dyn ReplicaStats>>,
    xid_callback: Option<XidCallback>,
    callbacks: HashMap<TableKey, RowCallback>,
    filters: HashMap<TableKey, RowFilter>,
    registry: SchemaRegistry,
    ddl: DdlWatcher,
    master: MasterInfo,
    server_id: u32,
    pending_rebuilds: Vec<TableKey>,
}

impl MySqlReplica {
    pub fn new(config: MySqlReplicaConfig, state: Arc<dyn ReplicaStateStore>) -> Self {
        Self {
            config,
            state,
            stats: None,
            xid_callback: None,
            callbacks: HashMap::new(),
            filters: HashMap::new(),
            registry: SchemaRegistry::new(),
            ddl: DdlWatcher::new(),
            master: MasterInfo::default(),
            server_id: 0,
            pending_rebuilds: Vec::new(),
        }
    }

    /// Register a row callback for `(db, table)`.
    pub fn subscribe(
        &mut self,
        db: impl Into<String>,
        table: impl Into<String>,
        callback: impl Fn(RowEvent<'_>) + Send + Sync + 'static,
    ) {
        self.callbacks
            .insert((db.into(), table.into()), Arc::new(callback));
    }

    /// Register a row callback plus a per-row filter for `(db, table)`.
    pub fn subscribe_filtered(
        &mut self,
        db: impl Into<String>,
        table: impl Into<String>,
        filter: impl Fn(&[super::value::ColumnValue]) -> bool + Send + Sync + 'static,
        callback: impl Fn(RowEvent<'_>) + Send + Sync + 'static,
    ) {
        let key = (db.into(), table.into());
        self.filters.insert(key.clone(), Arc::new(filter));
        self.callbacks.insert(key, Arc::new(callback));
    }

    /// Register a transaction-commit callback.
    pub fn on_xid(&mut self, callback: impl Fn(u32) + Send + Sync + 'static) {
        self.xid_callback = Some(Arc::new(callback));
    }

    /// Attach a stats sink.
    pub fn set_stats(&mut self, stats: Arc<dyn ReplicaStats>) {
        self.stats = Some(stats);
    }

    /// The current in-memory replication position.
    pub fn position(&self) -> &BinlogPosition {
        &self.master.position
    }

    /// The server id this replica registered under (0 before `run`).
    pub fn server_id(&self) -> u32 {
        self.server_id
    }

    /// The primary's version as `major*10000 + minor*100 + patch`
    /// (0 before `run`).
    pub fn master_version(&self) -> u32 {
        self.master.version
    }

    /// Stream the primary's binlog until `interrupt` returns true.
    ///
    /// Blocks for the life of the replication session. Only configuration
    /// and schema errors are returned; transport errors reconnect
    /// internally and event-local errors are ticked and skipped.
    pub async fn run<F>(&mut self, interrupt: F) -> Result<()>
    where
        F: Fn() -> bool,
    {
        info!(
            "initializing replication client for {}:{}",
            self.config.host, self.config.port
        );

        let mut meta = MetadataConnection::connect(&self.metadata_config()).await?;
        self.check_master_version(&mut meta).await?;
        self.check_master_binlog_format(&mut meta).await?;
        self.build_all_schemas(&mut meta).await?;
        self.generate_slave_id(&mut meta).await?;

        let mut conn = self.connect_replication(false).await;
        self.register_on_master(&mut conn).await?;

        let result = loop {
            match self.stream_session(&mut conn, &mut meta, &interrupt).await {
                Ok(SessionEnd::Interrupted) => break Ok(()),
                Ok(SessionEnd::Reconnect) => {
                    self.registry.clear_bindings();
                    conn = self.connect_replication(true).await;
                }
                Err(e) => break Err(e),
            }
        };

        warn!("binlog monitor stopped; binlog events are no longer consumed");
        conn.quit().await;
        meta.disconnect().await;
        result
    }

    fn metadata_config(&self) -> MetadataConfig {
        MetadataConfig {
            host: self.config.host.clone(),
            port: self.config.port,
            user: self.config.user.clone(),
            password: self.config.password.clone(),
        }
    }

    /// `SELECT VERSION()`: refuse anything older than 5.1.23 and derive the
    /// temporal storage format.
    async fn check_master_version(&mut self, meta: &mut MetadataConnection) -> Result<()> {
        let version_str = meta.server_version().await?;
        let version = validate_version(&version_str)?;
        self.master.version = version;
        self.master.is_old_storage = version < PACKED_TEMPORAL_VERSION;
        self.master.master_ge56 = version >= 50_600;
        info!(
            "primary version {} (old temporal storage: {})",
            version_str, self.master.is_old_storage
        );
        Ok(())
    }

    async fn check_master_binlog_format(&mut self, meta: &mut MetadataConnection) -> Result<()> {
        let format = meta.binlog_format().await?;
        validate_binlog_format(&format)
    }

    /// Discover schemas for every subscribed table.
    async fn build_all_schemas(&mut self, meta: &mut MetadataConnection) -> Result<()> {
        let catalog =
            CollationCatalog::from_rows(meta.character_sets().await?, meta.collations().await?)?;

        let keys: Vec<TableKey> = self.callbacks.keys().cloned().collect();
        for key in keys {
            info!("creating table structure for {}.{}", key.0, key.1);
            self.build_table(meta, &catalog, &key).await?;
        }
        Ok(())
    }

    /// Rebuild one table after DDL, re-attaching its callback and filter.
    /// The collation catalog is re-read: DDL may have introduced collations
    /// unseen at startup.
    async fn rebuild_table(&mut self, meta: &mut MetadataConnection, key: &TableKey) -> Result<()> {
        debug!("rebuilding database structure for {}.{}", key.0, key.1);
        let catalog =
            CollationCatalog::from_rows(meta.character_sets().await?, meta.collations().await?)?;
        self.build_table(meta, &catalog, key).await
    }

    async fn build_table(
        &mut self,
        meta: &mut MetadataConnection,
        catalog: &CollationCatalog,
        key: &TableKey,
    ) -> Result<()> {
        let rows = meta.full_columns(&key.0, &key.1).await?;
        let columns = build_columns(&rows, catalog, self.master.is_old_storage)?;
        self.registry.insert(TableSchema {
            db: key.0.clone(),
            name: key.1.clone(),
            columns,
            filter: self.filters.get(key).cloned(),
            callback: self.callbacks.get(key).cloned(),
        });
        Ok(())
    }

    /// Pick a server id that does not collide with any registered replica.
    async fn generate_slave_id(&mut self, meta: &mut MetadataConnection) -> Result<()> {
        let taken = meta.replica_server_ids().await?;
        self.server_id = pick_server_id(&taken, server_id_seed());
        debug!("generated server_id {}", self.server_id);
        Ok(())
    }

    async fn register_on_master(&mut self, conn: &mut ReplicationConnection) -> Result<()> {
        let hostname = self.config.report_host.clone().unwrap_or_else(|| {
            std::env::var("HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string())
        });
        conn.register_slave(
            self.server_id,
            &hostname,
            &self.config.report_user,
            &self.config.report_password,
            self.config.report_port,
        )
        .await
        .map_err(|e| RelayError::replication(format!("failed to register replica: {:#}", e)))
    }

    /// Connect to the primary, retrying every `connect_retry_secs` until it
    /// succeeds. Only the first failure is logged at error level; the
    /// eventual success is announced so log readers can pair them up.
    async fn connect_replication(&self, reconnect: bool) -> ReplicationConnection {
        let mut was_error = reconnect;
        loop {
            self.state.set_connecting().await;
            match ReplicationConnection::connect(
                &self.config.host,
                self.config.port,
                &self.config.user,
                self.config.password.as_deref(),
            )
            .await
            {
                Ok(conn) => {
                    if was_error {
                        info!(
                            "successfully connected to {}:{}",
                            self.config.host, self.config.port
                        );
                    }
                    return conn;
                }
                Err(e) => {
                    if !was_error {
                        error!(
                            "couldn't connect to mysql primary {}:{}: {:#}",
                            self.config.host, self.config.port, e
                        );
                        was_error = true;
                    }
                    trace!(
                        "retrying primary connection in {}s",
                        self.config.connect_retry_secs
                    );
                    sleep(Duration::from_secs(self.config.connect_retry_secs)).await;
                }
            }
        }
    }

    /// One dump session: handshake, position bootstrap, dump request, then
    /// the packet loop until interrupt or a read error.
    async fn stream_session<F>(
        &mut self,
        conn: &mut ReplicationConnection,
        meta: &mut MetadataConnection,
        interrupt: &F,
    ) -> Result<SessionEnd>
    where
        F: Fn() -> bool,
    {
        self.checksum_handshake(conn).await?;
        self.bootstrap_position(meta).await?;

        info!("starting from binlog position {}", self.master.position);
        conn.request_dump(
            self.server_id,
            &self.master.position.log_name,
            self.master.position.log_pos,
        )
        .await
        .map_err(|e| RelayError::replication(format!("error sending COM_BINLOG_DUMP: {:#}", e)))?;

        let mut packet_count: u64 = 0;
        while !interrupt() {
            self.state.set_state_processing(false).await;
            let packet = conn.read_binlog_packet().await;
            self.state.set_state_processing(true).await;

            let data = match packet {
                Ok(BinlogPacket::Event(data)) => data,
                Ok(BinlogPacket::EndOfData) => continue,
                Err(e) => {
                    match error_code(&e) {
                        ER_NET_PACKET_TOO_LARGE => error!(
                            "log entry on primary is longer than max_allowed_packet on this \
                             client: {:#}",
                            e
                        ),
                        ER_MASTER_FATAL_ERROR_READING_BINLOG => {
                            error!("fatal error reading binlog: {:#}", e)
                        }
                        CR_SERVER_LOST => {
                            warn!("lost connection to primary: {:#}", e);
                            // A caller-requested shutdown wins over reconnecting.
                            if interrupt() {
                                info!("interrupt requested; leaving read loop");
                                continue;
                            }
                        }
                        code => error!("error reading packet from primary (code {}): {:#}", code, e),
                    }
                    return Ok(SessionEnd::Reconnect);
                }
            };

            packet_count += 1;
            trace!("got event of {} bytes (packet {})", data.len(), packet_count);

            let body = match self.master.checksum_alg {
                ChecksumAlg::Crc32 => match event::verify_and_strip_checksum(&data) {
                    Ok(body) => body,
                    Err(e) => {
                        error!("{:#}; treating as read error", e);
                        return Ok(SessionEnd::Reconnect);
                    }
                },
                ChecksumAlg::Off => &data[..],
            };

            if let Err(e) = self.process_event(body).await {
                error!("error processing event: {:#}", e);
                if let Some(stats) = &self.stats {
                    stats.tick_error();
                }
                sleep(Duration::from_secs(1)).await;
                continue;
            }

            // DDL rebuilds run here, synchronously, between events.
            while let Some(key) = self.pending_rebuilds.pop() {
                if let Err(e) = self.rebuild_table(meta, &key).await {
                    error!("schema rebuild for {}.{} failed: {}", key.0, key.1, e);
                    if let Some(stats) = &self.stats {
                        stats.tick_error();
                    }
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }

        Ok(SessionEnd::Interrupted)
    }

    /// Negotiate per-event checksums on the dump connection. Idempotent:
    /// reconnects run it again and reach the same algorithm.
    async fn checksum_handshake(&mut self, conn: &mut ReplicationConnection) -> Result<()> {
        match conn
            .query_ok("SET @master_binlog_checksum = @@global.binlog_checksum")
            .await
        {
            Ok(()) => {
                let value = conn
                    .query_scalar("SELECT @master_binlog_checksum")
                    .await
                    .map_err(|e| {
                        RelayError::replication(format!(
                            "reading @master_binlog_checksum failed: {:#}",
                            e
                        ))
                    })?;
                self.master.checksum_alg = match value.as_deref() {
                    None => ChecksumAlg::Off,
                    Some(v) if v.eq_ignore_ascii_case("NONE") => ChecksumAlg::Off,
                    Some(v) if v.eq_ignore_ascii_case("CRC32") => ChecksumAlg::Crc32,
                    Some(other) => {
                        return Err(RelayError::config(format!(
                            "unknown binlog checksum algorithm '{}'",
                            other
                        )))
                    }
                };
            }
            Err(e) if error_code(&e) == ER_UNKNOWN_SYSTEM_VARIABLE => {
                debug!("primary has no binlog_checksum variable; checksums off");
                self.master.checksum_alg = ChecksumAlg::Off;
            }
            Err(e) => {
                return Err(RelayError::replication(format!(
                    "checksum handshake failed: {:#}",
                    e
                )))
            }
        }
        debug!("checksum handshake done: {:?}", self.master.checksum_alg);
        Ok(())
    }

    /// Resume from the stored frontier; with nothing stored, take the
    /// primary's current position and persist it before streaming.
    async fn bootstrap_position(&mut self, meta: &mut MetadataConnection) -> Result<()> {
        if let Some(saved) = self.state.load_master_info().await? {
            self.master.position = saved;
        } else {
            let status = meta.master_status().await?;
            self.master.position = status.clone();
            self.state
                .set_master_log_name_pos(&status.log_name, status.log_pos)
                .await?;
            self.state.save_master_info().await?;
        }
        Ok(())
    }

    /// Dispatch one event (common header already verified against the
    /// checksum). Errors here are event-local: the caller ticks and moves
    /// on.
    async fn process_event(&mut self, data: &[u8]) -> anyhow::Result<()> {
        let header = EventHeader::parse(data)?;
        let payload = &data[EVENT_HEADER_LEN..];

        if let EventType::Unknown(code) = header.event_type {
            trace!("skipping unknown event type {}", code);
            return Ok(());
        }

        if header.next_position != 0 {
            self.master.position.log_pos = header.next_position;
            self.state
                .set_last_event_time_pos(header.timestamp, header.next_position)
                .await;
        }

        // Malformed-timestamp guard: dispatch nothing but format
        // descriptions. The position above still advances.
        if (header.timestamp as i32) < 0 && header.event_type != EventType::FormatDescription {
            return Ok(());
        }

        match header.event_type {
            EventType::FormatDescription => {
                let fde = FormatDescriptionEvent::parse(payload)?;
                self.master.master_ge56 = fde.master_ge56();
                debug!(
                    "format description: binlog v{}, server {}",
                    fde.binlog_version, fde.server_version
                );
            }
            EventType::Rotate => {
                let rotate = RotateEvent::parse(payload)?;
                self.master.position =
                    BinlogPosition::new(rotate.next_log, rotate.position as u32);
                self.state
                    .set_master_log_name_pos(
                        &self.master.position.log_name,
                        self.master.position.log_pos,
                    )
                    .await?;
                info!("rotated to {}", self.master.position);
            }
            EventType::Xid => {
                let xid = XidEvent::parse(payload)?;
                self.state
                    .set_master_log_name_pos(
                        &self.master.position.log_name,
                        self.master.position.log_pos,
                    )
                    .await?;
                trace!("xid {} committed at {}", xid.xid, self.master.position);
                if let Some(callback) = &self.xid_callback {
                    callback(header.server_id);
                }
            }
            EventType::Query => {
                let query = QueryEvent::parse(payload)?;
                trace!("query event: {}", query.query);
                if let Some(table) = self.ddl.altered_table(&query.query) {
                    let key = (query.schema.clone(), table.to_string());
                    if self.callbacks.contains_key(&key) {
                        debug!(
                            "DDL on subscribed table {}.{}; scheduling schema rebuild",
                            key.0, key.1
                        );
                        self.pending_rebuilds.push(key);
                    }
                }
            }
            EventType::TableMap => {
                let table_map = TableMapEvent::parse(payload)?;
                trace!(
                    "table map: {}.{} (table_id={})",
                    table_map.schema_name,
                    table_map.table_name,
                    table_map.table_id
                );
                self.registry.bind(&table_map);
                if self.master.master_ge56 {
                    self.registry.apply_temporal_reset(&table_map);
                }
                if let Some(stats) = &self.stats {
                    stats.process_table_map(
                        table_map.table_id,
                        &table_map.schema_name,
                        &table_map.table_name,
                    );
                }
            }
            EventType::WriteRowsV1
            | EventType::WriteRowsV2
            | EventType::UpdateRowsV1
            | EventType::UpdateRowsV2
            | EventType::DeleteRowsV1
            | EventType::DeleteRowsV2 => {
                let rows = RowsEvent::parse(header.event_type, payload)?;
                self.dispatch_rows(&rows)?;
            }
            EventType::Stop | EventType::Unknown(_) => {}
        }

        Ok(())
    }

    /// Decode a rows event against its bound table and deliver each row.
    /// Events without a binding, and tables nobody subscribed to, are
    /// skipped.
    fn dispatch_rows(&self, rows: &RowsEvent) -> anyhow::Result<()> {
        let Some(binding) = self.registry.binding(rows.table_id) else {
            trace!("no table binding for table_id {}; skipping", rows.table_id);
            return Ok(());
        };
        let Some(schema) = self.registry.get(&binding.key) else {
            trace!(
                "table {}.{} not subscribed; skipping",
                binding.key.0,
                binding.key.1
            );
            return Ok(());
        };

        let decoded = event::decode_rows(rows, &schema.columns, &binding.column_metadata)?;
        let Some(callback) = &schema.callback else {
            return Ok(());
        };

        for pair in &decoded {
            let filter_image = match rows.kind {
                RowKind::Insert | RowKind::Update => pair.after.as_deref(),
                RowKind::Delete => pair.before.as_deref(),
            };
            if let (Some(filter), Some(image)) = (&schema.filter, filter_image) {
                if !filter(image) {
                    continue;
                }
            }
            callback(RowEvent {
                db: &schema.db,
                table: &schema.name,
                kind: rows.kind,
                columns: &schema.columns,
                before: pair.before.as_deref(),
                after: pair.after.as_deref(),
            });
        }

        Ok(())
    }
}

fn validate_version(version_str: &str) -> Result<u32> {
    let version = event::parse_server_version(version_str).ok_or_else(|| {
        RelayError::config(format!("got invalid primary version: {}", version_str))
    })?;
    if version < MIN_PRIMARY_VERSION {
        return Err(RelayError::config(format!(
            "primary version {} is older than 5.1.23",
            version_str
        )));
    }
    Ok(version)
}

fn validate_binlog_format(format: &str) -> Result<()> {
    if !format.eq_ignore_ascii_case("ROW") {
        return Err(RelayError::config(format!(
            "binlog_format must be ROW, primary reports {}",
            format
        )));
    }
    Ok(())
}

/// Seed for server-id generation: wall clock XOR (pid shifted high), the
/// same recipe the original replication tooling used.
fn server_id_seed() -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32;
    now ^ (std::process::id() << 16)
}

/// Linearly probe upward from the seed until the id collides with no
/// registered replica.
fn pick_server_id(taken: &HashSet<u32>, seed: u32) -> u32 {
    let mut id = seed;
    while taken.contains(&id) {
        id = id.wrapping_add(1);
    }
    id
}
