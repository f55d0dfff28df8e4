//! Binlog event parsing.
//!
//! Every event starts with the 19-byte common header (5.1+ format). The
//! post-header parsers here cover the events a row-replication client acts
//! on: FORMAT_DESCRIPTION, ROTATE, QUERY, XID, TABLE_MAP and the
//! WRITE/UPDATE/DELETE rows events in both their V1 and V2 forms. Anything
//! else is classified as unknown and skipped by the caller.
//!
//! When the dump session negotiated CRC32 checksums, the last four bytes of
//! every event are a little-endian CRC32 over the rest;
//! [`verify_and_strip_checksum`] validates and removes the trailer before
//! parsing.

use anyhow::{bail, Context, Result};
use bytes::Buf;
use std::io::Cursor;

use super::protocol::read_lenenc_int;
use super::schema::Column;
use super::value::ColumnValue;

/// Size of the common event header.
pub const EVENT_HEADER_LEN: usize = 19;

/// Binlog event types this client understands. Everything else maps to
/// `Unknown` and is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Query,
    Stop,
    Rotate,
    FormatDescription,
    Xid,
    TableMap,
    WriteRowsV1,
    UpdateRowsV1,
    DeleteRowsV1,
    WriteRowsV2,
    UpdateRowsV2,
    DeleteRowsV2,
    Unknown(u8),
}

impl EventType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            2 => EventType::Query,
            3 => EventType::Stop,
            4 => EventType::Rotate,
            15 => EventType::FormatDescription,
            16 => EventType::Xid,
            19 => EventType::TableMap,
            23 => EventType::WriteRowsV1,
            24 => EventType::UpdateRowsV1,
            25 => EventType::DeleteRowsV1,
            30 => EventType::WriteRowsV2,
            31 => EventType::UpdateRowsV2,
            32 => EventType::DeleteRowsV2,
            other => EventType::Unknown(other),
        }
    }

    pub fn is_row_event(&self) -> bool {
        matches!(
            self,
            EventType::WriteRowsV1
                | EventType::WriteRowsV2
                | EventType::UpdateRowsV1
                | EventType::UpdateRowsV2
                | EventType::DeleteRowsV1
                | EventType::DeleteRowsV2
        )
    }

    fn is_v2_row_event(&self) -> bool {
        matches!(
            self,
            EventType::WriteRowsV2 | EventType::UpdateRowsV2 | EventType::DeleteRowsV2
        )
    }
}

/// Wire column type codes as they appear in TABLE_MAP.
pub mod field_type {
    pub const DECIMAL: u8 = 0;
    pub const TINY: u8 = 1;
    pub const SHORT: u8 = 2;
    pub const LONG: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const DOUBLE: u8 = 5;
    pub const NULL: u8 = 6;
    pub const TIMESTAMP: u8 = 7;
    pub const LONGLONG: u8 = 8;
    pub const INT24: u8 = 9;
    pub const DATE: u8 = 10;
    pub const TIME: u8 = 11;
    pub const DATETIME: u8 = 12;
    pub const YEAR: u8 = 13;
    pub const NEWDATE: u8 = 14;
    pub const VARCHAR: u8 = 15;
    pub const BIT: u8 = 16;
    pub const TIMESTAMP2: u8 = 17;
    pub const DATETIME2: u8 = 18;
    pub const TIME2: u8 = 19;
    pub const JSON: u8 = 245;
    pub const NEWDECIMAL: u8 = 246;
    pub const ENUM: u8 = 247;
    pub const SET: u8 = 248;
    pub const TINY_BLOB: u8 = 249;
    pub const MEDIUM_BLOB: u8 = 250;
    pub const LONG_BLOB: u8 = 251;
    pub const BLOB: u8 = 252;
    pub const VAR_STRING: u8 = 253;
    pub const STRING: u8 = 254;
    pub const GEOMETRY: u8 = 255;
}

/// The 19-byte common event header.
#[derive(Debug, Clone)]
pub struct EventHeader {
    pub timestamp: u32,
    pub event_type: EventType,
    pub server_id: u32,
    pub event_length: u32,
    pub next_position: u32,
    pub flags: u16,
}

impl EventHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < EVENT_HEADER_LEN {
            bail!("event header too short: {} bytes", data.len());
        }

        let mut cursor = Cursor::new(data);
        let timestamp = cursor.get_u32_le();
        let event_type = EventType::from_u8(cursor.get_u8());
        let server_id = cursor.get_u32_le();
        let event_length = cursor.get_u32_le();
        let next_position = cursor.get_u32_le();
        let flags = cursor.get_u16_le();

        Ok(Self {
            timestamp,
            event_type,
            server_id,
            event_length,
            next_position,
            flags,
        })
    }
}

/// Validate the CRC32 trailer and return the event without it.
pub fn verify_and_strip_checksum(data: &[u8]) -> Result<&[u8]> {
    if data.len() < EVENT_HEADER_LEN + 4 {
        bail!("event too short to carry a checksum: {} bytes", data.len());
    }
    let (body, trailer) = data.split_at(data.len() - 4);
    let expected = u32::from_le_bytes(trailer.try_into().expect("4-byte split"));
    let computed = crc32fast::hash(body);
    if computed != expected {
        bail!(
            "event checksum mismatch: computed {:08x}, trailer {:08x}",
            computed,
            expected
        );
    }
    Ok(body)
}

/// Parse the major.minor.patch prefix of a server version string
/// (e.g. `"5.7.20-log"`) into `major*10000 + minor*100 + patch`.
pub fn parse_server_version(version: &str) -> Option<u32> {
    let mut parts = [0u32; 3];
    let mut index = 0;
    let mut current: Option<u32> = None;

    for ch in version.chars() {
        if let Some(digit) = ch.to_digit(10) {
            current = Some(current.unwrap_or(0).saturating_mul(10).saturating_add(digit));
        } else {
            match current.take() {
                Some(value) => {
                    parts[index] = value;
                    index += 1;
                    if index == 3 {
                        break;
                    }
                    if ch != '.' {
                        break;
                    }
                }
                None => return None,
            }
        }
    }
    if let (Some(value), true) = (current, index < 3) {
        parts[index] = value;
        index += 1;
    }
    if index < 3 {
        return None;
    }
    Some(parts[0] * 10_000 + parts[1] * 100 + parts[2])
}

/// FORMAT_DESCRIPTION post-header.
#[derive(Debug, Clone)]
pub struct FormatDescriptionEvent {
    pub binlog_version: u16,
    pub server_version: String,
    pub create_timestamp: u32,
    pub header_length: u8,
}

impl FormatDescriptionEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 + 50 + 4 + 1 {
            bail!("format description event too short: {} bytes", payload.len());
        }
        let mut cursor = Cursor::new(payload);
        let binlog_version = cursor.get_u16_le();

        let mut version_bytes = [0u8; 50];
        cursor.copy_to_slice(&mut version_bytes);
        let server_version = String::from_utf8_lossy(&version_bytes)
            .trim_end_matches('\0')
            .to_string();

        let create_timestamp = cursor.get_u32_le();
        let header_length = cursor.get_u8();

        Ok(Self {
            binlog_version,
            server_version,
            create_timestamp,
            header_length,
        })
    }

    /// Whether the primary that wrote this binlog is 5.6 or newer, which is
    /// when the packed temporal types can appear.
    pub fn master_ge56(&self) -> bool {
        parse_server_version(&self.server_version)
            .map(|v| v >= 50_600)
            .unwrap_or(false)
    }
}

/// ROTATE post-header: the next log file and the offset to resume at
/// (practically always 4).
#[derive(Debug, Clone)]
pub struct RotateEvent {
    pub position: u64,
    pub next_log: String,
}

impl RotateEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 8 {
            bail!("rotate event too short: {} bytes", payload.len());
        }
        let mut cursor = Cursor::new(payload);
        let position = cursor.get_u64_le();
        let next_log = String::from_utf8_lossy(&payload[8..])
            .trim_end_matches('\0')
            .to_string();
        Ok(Self { position, next_log })
    }
}

/// QUERY post-header, reduced to what the DDL watcher needs.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub schema: String,
    pub query: String,
}

impl QueryEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 13 {
            bail!("query event too short: {} bytes", payload.len());
        }
        let mut cursor = Cursor::new(payload);
        let _thread_id = cursor.get_u32_le();
        let _exec_time = cursor.get_u32_le();
        let schema_len = cursor.get_u8() as usize;
        let _error_code = cursor.get_u16_le();
        let status_vars_len = cursor.get_u16_le() as usize;

        let pos = cursor.position() as usize;
        let schema_start = pos + status_vars_len;
        let query_start = schema_start + schema_len + 1; // trailing NUL
        if payload.len() < query_start {
            bail!("query event truncated");
        }

        let schema = String::from_utf8_lossy(&payload[schema_start..schema_start + schema_len])
            .to_string();
        let query = String::from_utf8_lossy(&payload[query_start..]).to_string();

        Ok(Self { schema, query })
    }
}

/// XID post-header: the commit marker.
#[derive(Debug, Clone)]
pub struct XidEvent {
    pub xid: u64,
}

impl XidEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 8 {
            bail!("xid event too short: {} bytes", payload.len());
        }
        let mut cursor = Cursor::new(payload);
        Ok(Self {
            xid: cursor.get_u64_le(),
        })
    }
}

/// TABLE_MAP post-header: binds a numeric table id to `(db, table)` and
/// carries per-column wire types and metadata for the row events that
/// follow.
#[derive(Debug, Clone)]
pub struct TableMapEvent {
    pub table_id: u64,
    pub flags: u16,
    pub schema_name: String,
    pub table_name: String,
    pub column_count: usize,
    pub column_types: Vec<u8>,
    pub column_metadata: Vec<u16>,
    pub null_bitmap: Vec<u8>,
}

impl TableMapEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);

        let table_id = read_table_id(&mut cursor)?;
        need(&cursor, 2)?;
        let flags = cursor.get_u16_le();

        let schema_name = read_name(&mut cursor).context("table map schema name")?;
        let table_name = read_name(&mut cursor).context("table map table name")?;

        let column_count = read_lenenc_int(&mut cursor)? as usize;
        let mut column_types = vec![0u8; column_count];
        need(&cursor, column_count)?;
        cursor.copy_to_slice(&mut column_types);

        let _metadata_len = read_lenenc_int(&mut cursor)?;
        let column_metadata = parse_column_metadata(&column_types, &mut cursor)?;

        let bitmap_len = column_count.div_ceil(8);
        let mut null_bitmap = vec![0u8; bitmap_len];
        need(&cursor, bitmap_len)?;
        cursor.copy_to_slice(&mut null_bitmap);

        Ok(Self {
            table_id,
            flags,
            schema_name,
            table_name,
            column_count,
            column_types,
            column_metadata,
            null_bitmap,
        })
    }
}

/// Per-type TABLE_MAP metadata widths.
fn parse_column_metadata(column_types: &[u8], cursor: &mut Cursor<&[u8]>) -> Result<Vec<u16>> {
    use field_type::*;

    let mut metadata = Vec::with_capacity(column_types.len());
    for &col_type in column_types {
        let meta = match col_type {
            FLOAT | DOUBLE | JSON | GEOMETRY | TINY_BLOB | MEDIUM_BLOB | LONG_BLOB | BLOB => {
                need(cursor, 1)?;
                cursor.get_u8() as u16
            }
            VARCHAR | VAR_STRING | BIT => {
                need(cursor, 2)?;
                cursor.get_u16_le()
            }
            // Stored as (real_type, length) byte pair.
            STRING | ENUM | SET => {
                need(cursor, 2)?;
                cursor.get_u16()
            }
            NEWDECIMAL => {
                need(cursor, 2)?;
                let precision = cursor.get_u8() as u16;
                let scale = cursor.get_u8() as u16;
                (precision << 8) | scale
            }
            TIMESTAMP2 | DATETIME2 | TIME2 => {
                need(cursor, 1)?;
                cursor.get_u8() as u16
            }
            _ => 0,
        };
        metadata.push(meta);
    }
    Ok(metadata)
}

/// Kind of row change carried by a rows event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Insert,
    Update,
    Delete,
}

impl RowKind {
    fn from_event_type(event_type: EventType) -> Result<Self> {
        match event_type {
            EventType::WriteRowsV1 | EventType::WriteRowsV2 => Ok(RowKind::Insert),
            EventType::UpdateRowsV1 | EventType::UpdateRowsV2 => Ok(RowKind::Update),
            EventType::DeleteRowsV1 | EventType::DeleteRowsV2 => Ok(RowKind::Delete),
            other => bail!("not a rows event: {:?}", other),
        }
    }
}

/// A rows event with its bitmaps parsed and the packed row images kept raw;
/// [`decode_rows`] turns those into typed values against a table schema.
#[derive(Debug, Clone)]
pub struct RowsEvent {
    pub kind: RowKind,
    pub table_id: u64,
    pub flags: u16,
    pub column_count: usize,
    pub columns_present: Vec<u8>,
    /// Second bitmap for the after-image; UPDATE only.
    pub columns_present_after: Option<Vec<u8>>,
    pub rows_data: Vec<u8>,
}

impl RowsEvent {
    pub fn parse(event_type: EventType, payload: &[u8]) -> Result<Self> {
        let kind = RowKind::from_event_type(event_type)?;
        let mut cursor = Cursor::new(payload);

        let table_id = read_table_id(&mut cursor)?;
        need(&cursor, 2)?;
        let flags = cursor.get_u16_le();

        if event_type.is_v2_row_event() {
            need(&cursor, 2)?;
            let extra_len = cursor.get_u16_le() as usize;
            if extra_len > 2 {
                need(&cursor, extra_len - 2)?;
                cursor.advance(extra_len - 2);
            }
        }

        let column_count = read_lenenc_int(&mut cursor)? as usize;
        let bitmap_len = column_count.div_ceil(8);

        let mut columns_present = vec![0u8; bitmap_len];
        need(&cursor, bitmap_len)?;
        cursor.copy_to_slice(&mut columns_present);

        let columns_present_after = if kind == RowKind::Update {
            let mut bitmap = vec![0u8; bitmap_len];
            need(&cursor, bitmap_len)?;
            cursor.copy_to_slice(&mut bitmap);
            Some(bitmap)
        } else {
            None
        };

        let rows_data = payload[cursor.position() as usize..].to_vec();

        Ok(Self {
            kind,
            table_id,
            flags,
            column_count,
            columns_present,
            columns_present_after,
            rows_data,
        })
    }
}

/// One decoded row: before-image for DELETE, after-image for INSERT, both
/// for UPDATE. Images are indexed by schema column; columns absent from the
/// event bitmap come out as `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowImagePair {
    pub before: Option<Vec<ColumnValue>>,
    pub after: Option<Vec<ColumnValue>>,
}

/// Decode every row in the event against the schema columns, using the
/// TABLE_MAP `metadata` of the same `table_id`.
pub fn decode_rows(
    event: &RowsEvent,
    columns: &[Column],
    metadata: &[u16],
) -> Result<Vec<RowImagePair>> {
    let mut cursor = Cursor::new(event.rows_data.as_slice());
    let present_count = count_set_bits(&event.columns_present);
    let mut rows = Vec::new();

    while cursor.has_remaining() {
        if present_count == 0 {
            break;
        }
        match event.kind {
            RowKind::Insert => {
                let after = decode_image(
                    &mut cursor,
                    columns,
                    metadata,
                    &event.columns_present,
                    event.column_count,
                )?;
                rows.push(RowImagePair {
                    before: None,
                    after: Some(after),
                });
            }
            RowKind::Delete => {
                let before = decode_image(
                    &mut cursor,
                    columns,
                    metadata,
                    &event.columns_present,
                    event.column_count,
                )?;
                rows.push(RowImagePair {
                    before: Some(before),
                    after: None,
                });
            }
            RowKind::Update => {
                let before = decode_image(
                    &mut cursor,
                    columns,
                    metadata,
                    &event.columns_present,
                    event.column_count,
                )?;
                let after_bitmap = event
                    .columns_present_after
                    .as_deref()
                    .unwrap_or(&event.columns_present);
                let after = decode_image(
                    &mut cursor,
                    columns,
                    metadata,
                    after_bitmap,
                    event.column_count,
                )?;
                rows.push(RowImagePair {
                    before: Some(before),
                    after: Some(after),
                });
            }
        }
    }

    Ok(rows)
}

/// Decode one row image: a null bitmap sized to the present-column count,
/// then one value per present, non-null column.
fn decode_image(
    cursor: &mut Cursor<&[u8]>,
    columns: &[Column],
    metadata: &[u16],
    present: &[u8],
    column_count: usize,
) -> Result<Vec<ColumnValue>> {
    let present_count = count_set_bits(present);
    let null_len = present_count.div_ceil(8);
    need(cursor, null_len)?;
    let mut null_bitmap = vec![0u8; null_len];
    cursor.copy_to_slice(&mut null_bitmap);

    let mut values = Vec::with_capacity(column_count);
    let mut rank = 0;
    for i in 0..column_count {
        if !is_bit_set(present, i) {
            values.push(ColumnValue::Null);
            continue;
        }
        if is_bit_set(&null_bitmap, rank) {
            values.push(ColumnValue::Null);
        } else {
            let column = columns.get(i).ok_or_else(|| {
                anyhow::anyhow!(
                    "row event column {} has no schema column ({} known)",
                    i,
                    columns.len()
                )
            })?;
            let meta = metadata.get(i).copied().unwrap_or(0);
            let value = column
                .kind
                .decode(cursor, meta)
                .with_context(|| format!("column '{}'", column.name))?;
            values.push(value);
        }
        rank += 1;
    }

    Ok(values)
}

pub(crate) fn count_set_bits(bitmap: &[u8]) -> usize {
    bitmap.iter().map(|b| b.count_ones() as usize).sum()
}

pub(crate) fn is_bit_set(bitmap: &[u8], idx: usize) -> bool {
    let byte_idx = idx / 8;
    let bit_idx = idx % 8;
    byte_idx < bitmap.len() && (bitmap[byte_idx] & (1 << bit_idx)) != 0
}

fn need(cursor: &Cursor<&[u8]>, n: usize) -> Result<()> {
    if cursor.remaining() < n {
        bail!(
            "truncated event: need {} bytes, {} remaining",
            n,
            cursor.remaining()
        );
    }
    Ok(())
}

fn read_table_id(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    need(cursor, 6)?;
    let mut value = 0u64;
    for i in 0..6 {
        value |= (cursor.get_u8() as u64) << (i * 8);
    }
    Ok(value)
}

/// A length-prefixed, null-terminated name as used in TABLE_MAP.
fn read_name(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    need(cursor, 1)?;
    let len = cursor.get_u8() as usize;
    need(cursor, len + 1)?;
    let mut bytes = vec![0u8; len];
    cursor.copy_to_slice(&mut bytes);
    cursor.get_u8(); // null terminator
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mysql::value::ColumnKind;

    fn header_bytes(
        timestamp: u32,
        event_type: u8,
        server_id: u32,
        event_length: u32,
        next_position: u32,
    ) -> Vec<u8> {
        let mut data = Vec::with_capacity(EVENT_HEADER_LEN);
        data.extend_from_slice(&timestamp.to_le_bytes());
        data.push(event_type);
        data.extend_from_slice(&server_id.to_le_bytes());
        data.extend_from_slice(&event_length.to_le_bytes());
        data.extend_from_slice(&next_position.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data
    }

    fn sample_table_map_payload() -> Vec<u8> {
        // table_id=108, shop.item, [LONG, VARSTRING(meta 16)]
        let mut payload = Vec::new();
        payload.extend_from_slice(&108u64.to_le_bytes()[..6]);
        payload.extend_from_slice(&1u16.to_le_bytes()); // flags
        payload.push(4);
        payload.extend_from_slice(b"shop\0");
        payload.push(4);
        payload.extend_from_slice(b"item\0");
        payload.push(2); // column count
        payload.push(field_type::LONG);
        payload.push(field_type::VAR_STRING);
        payload.push(2); // metadata length
        payload.extend_from_slice(&16u16.to_le_bytes()); // varstring max bytes
        payload.push(0b10); // null bitmap: name nullable
        payload
    }

    fn item_columns() -> Vec<Column> {
        vec![
            Column::new("id", ColumnKind::Long { unsigned: true }),
            Column::new(
                "name",
                ColumnKind::Varchar {
                    max_bytes: 16,
                    collation: None,
                },
            ),
        ]
    }

    #[test]
    fn test_event_type_mapping() {
        assert_eq!(EventType::from_u8(15), EventType::FormatDescription);
        assert_eq!(EventType::from_u8(19), EventType::TableMap);
        assert_eq!(EventType::from_u8(30), EventType::WriteRowsV2);
        assert_eq!(EventType::from_u8(16), EventType::Xid);
        assert_eq!(EventType::from_u8(4), EventType::Rotate);
        assert_eq!(EventType::from_u8(200), EventType::Unknown(200));

        assert!(EventType::WriteRowsV1.is_row_event());
        assert!(EventType::DeleteRowsV2.is_row_event());
        assert!(!EventType::Query.is_row_event());
    }

    #[test]
    fn test_header_parse() {
        let data = header_bytes(1_700_000_000, 16, 7, 31, 1234);
        let header = EventHeader::parse(&data).unwrap();
        assert_eq!(header.timestamp, 1_700_000_000);
        assert_eq!(header.event_type, EventType::Xid);
        assert_eq!(header.server_id, 7);
        assert_eq!(header.event_length, 31);
        assert_eq!(header.next_position, 1234);
        assert_eq!(header.flags, 0);

        assert!(EventHeader::parse(&data[..10]).is_err());
    }

    #[test]
    fn test_checksum_verify_and_strip() {
        let mut event = header_bytes(0, 16, 1, 31, 500);
        event.extend_from_slice(&42u64.to_le_bytes());
        let crc = crc32fast::hash(&event);
        let mut with_trailer = event.clone();
        with_trailer.extend_from_slice(&crc.to_le_bytes());

        let stripped = verify_and_strip_checksum(&with_trailer).unwrap();
        assert_eq!(stripped, event.as_slice());

        // Corrupt one byte: the trailer no longer matches.
        let mut corrupted = with_trailer.clone();
        corrupted[5] ^= 0xFF;
        assert!(verify_and_strip_checksum(&corrupted).is_err());
    }

    #[test]
    fn test_parse_server_version() {
        assert_eq!(parse_server_version("5.7.20-log"), Some(50720));
        assert_eq!(parse_server_version("5.1.23"), Some(50123));
        assert_eq!(parse_server_version("8.0.33-0ubuntu0.22.04.2"), Some(80033));
        assert_eq!(parse_server_version("5.6.4-m7-log"), Some(50604));
        assert_eq!(parse_server_version("garbage"), None);
        assert_eq!(parse_server_version("5.7"), None);
    }

    #[test]
    fn test_format_description_master_ge56() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4u16.to_le_bytes());
        let mut version = [0u8; 50];
        version[..10].copy_from_slice(b"5.7.20-log");
        payload.extend_from_slice(&version);
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.push(EVENT_HEADER_LEN as u8);

        let fde = FormatDescriptionEvent::parse(&payload).unwrap();
        assert_eq!(fde.binlog_version, 4);
        assert_eq!(fde.server_version, "5.7.20-log");
        assert!(fde.master_ge56());

        let mut old = payload.clone();
        old[2..52].fill(0);
        old[2..8].copy_from_slice(b"5.5.40");
        let fde = FormatDescriptionEvent::parse(&old).unwrap();
        assert!(!fde.master_ge56());
    }

    #[test]
    fn test_rotate_parse() {
        let mut payload = 4u64.to_le_bytes().to_vec();
        payload.extend_from_slice(b"mysql-bin.000042");
        let rotate = RotateEvent::parse(&payload).unwrap();
        assert_eq!(rotate.position, 4);
        assert_eq!(rotate.next_log, "mysql-bin.000042");
    }

    #[test]
    fn test_query_parse() {
        let status_vars = [0u8, 1, 2]; // opaque, skipped
        let mut payload = Vec::new();
        payload.extend_from_slice(&99u32.to_le_bytes()); // thread id
        payload.extend_from_slice(&0u32.to_le_bytes()); // exec time
        payload.push(4); // schema length
        payload.extend_from_slice(&0u16.to_le_bytes()); // error code
        payload.extend_from_slice(&(status_vars.len() as u16).to_le_bytes());
        payload.extend_from_slice(&status_vars);
        payload.extend_from_slice(b"shop\0");
        payload.extend_from_slice(b"ALTER TABLE item ADD c INT");

        let query = QueryEvent::parse(&payload).unwrap();
        assert_eq!(query.schema, "shop");
        assert_eq!(query.query, "ALTER TABLE item ADD c INT");
    }

    #[test]
    fn test_xid_parse() {
        let payload = 7_777u64.to_le_bytes();
        assert_eq!(XidEvent::parse(&payload).unwrap().xid, 7_777);
        assert!(XidEvent::parse(&payload[..4]).is_err());
    }

    #[test]
    fn test_table_map_parse() {
        let tm = TableMapEvent::parse(&sample_table_map_payload()).unwrap();
        assert_eq!(tm.table_id, 108);
        assert_eq!(tm.schema_name, "shop");
        assert_eq!(tm.table_name, "item");
        assert_eq!(tm.column_count, 2);
        assert_eq!(tm.column_types, vec![field_type::LONG, field_type::VAR_STRING]);
        assert_eq!(tm.column_metadata, vec![0, 16]);
        assert_eq!(tm.null_bitmap, vec![0b10]);
    }

    #[test]
    fn test_string_metadata_is_big_endian_pair() {
        // One CHAR(20) column: metadata bytes are (real_type, length).
        let mut payload = Vec::new();
        payload.extend_from_slice(&9u64.to_le_bytes()[..6]);
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.push(1);
        payload.extend_from_slice(b"d\0");
        payload.push(1);
        payload.extend_from_slice(b"t\0");
        payload.push(1);
        payload.push(field_type::STRING);
        payload.push(2);
        payload.push(field_type::STRING); // real type
        payload.push(20); // length
        payload.push(0);

        let tm = TableMapEvent::parse(&payload).unwrap();
        assert_eq!(tm.column_metadata, vec![((field_type::STRING as u16) << 8) | 20]);
    }

    fn write_rows_payload(rows: &[&[u8]]) -> Vec<u8> {
        // V2 write-rows for table 108: both columns present.
        let mut payload = Vec::new();
        payload.extend_from_slice(&108u64.to_le_bytes()[..6]);
        payload.extend_from_slice(&0u16.to_le_bytes()); // flags
        payload.extend_from_slice(&2u16.to_le_bytes()); // extra data length (none)
        payload.push(2); // column count
        payload.push(0b11); // both columns present
        for row in rows {
            payload.extend_from_slice(row);
        }
        payload
    }

    #[test]
    fn test_write_rows_decode() {
        // Row: null bitmap 0, id=42, name="hi"
        let row: &[u8] = &[0x00, 0x2A, 0x00, 0x00, 0x00, 0x02, b'h', b'i'];
        let payload = write_rows_payload(&[row]);

        let event = RowsEvent::parse(EventType::WriteRowsV2, &payload).unwrap();
        assert_eq!(event.kind, RowKind::Insert);
        assert_eq!(event.table_id, 108);
        assert_eq!(event.column_count, 2);
        assert_eq!(event.columns_present, vec![0b11]);
        assert!(event.columns_present_after.is_none());

        let rows = decode_rows(&event, &item_columns(), &[0, 16]).unwrap();
        assert_eq!(rows.len(), 1);
        let after = rows[0].after.as_ref().unwrap();
        assert!(rows[0].before.is_none());
        assert_eq!(after[0], ColumnValue::UnsignedInt(42));
        assert_eq!(after[1], ColumnValue::Text(b"hi".to_vec()));
    }

    #[test]
    fn test_write_rows_decode_multiple_rows() {
        let row1: &[u8] = &[0x00, 0x01, 0x00, 0x00, 0x00, 0x01, b'a'];
        let row2: &[u8] = &[0x00, 0x02, 0x00, 0x00, 0x00, 0x01, b'b'];
        let payload = write_rows_payload(&[row1, row2]);

        let event = RowsEvent::parse(EventType::WriteRowsV2, &payload).unwrap();
        let rows = decode_rows(&event, &item_columns(), &[0, 16]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1].after.as_ref().unwrap()[1],
            ColumnValue::Text(b"b".to_vec())
        );
    }

    #[test]
    fn test_null_bitmap_skips_value_bytes() {
        // name is NULL: only id bytes follow the null bitmap.
        let row: &[u8] = &[0b10, 0x2A, 0x00, 0x00, 0x00];
        let payload = write_rows_payload(&[row]);

        let event = RowsEvent::parse(EventType::WriteRowsV2, &payload).unwrap();
        let rows = decode_rows(&event, &item_columns(), &[0, 16]).unwrap();
        let after = rows[0].after.as_ref().unwrap();
        assert_eq!(after[0], ColumnValue::UnsignedInt(42));
        assert_eq!(after[1], ColumnValue::Null);
    }

    #[test]
    fn test_present_bitmap_controls_consumption() {
        // Only column 0 present: null bitmap ranks over present columns only.
        let mut payload = Vec::new();
        payload.extend_from_slice(&108u64.to_le_bytes()[..6]);
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&2u16.to_le_bytes());
        payload.push(2);
        payload.push(0b01); // only id present
        payload.extend_from_slice(&[0x00, 0x07, 0x00, 0x00, 0x00]);

        let event = RowsEvent::parse(EventType::WriteRowsV2, &payload).unwrap();
        let rows = decode_rows(&event, &item_columns(), &[0, 16]).unwrap();
        let after = rows[0].after.as_ref().unwrap();
        assert_eq!(after[0], ColumnValue::UnsignedInt(7));
        assert_eq!(after[1], ColumnValue::Null);
    }

    #[test]
    fn test_update_rows_decode() {
        // V1 update: two bitmaps, then before+after images per row.
        let mut payload = Vec::new();
        payload.extend_from_slice(&108u64.to_le_bytes()[..6]);
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.push(2);
        payload.push(0b11); // before image columns
        payload.push(0b11); // after image columns
        // before: id=1, name="a"; after: id=1, name="b"
        payload.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01, b'a']);
        payload.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01, b'b']);

        let event = RowsEvent::parse(EventType::UpdateRowsV1, &payload).unwrap();
        assert_eq!(event.kind, RowKind::Update);
        assert!(event.columns_present_after.is_some());

        let rows = decode_rows(&event, &item_columns(), &[0, 16]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].before.as_ref().unwrap()[1],
            ColumnValue::Text(b"a".to_vec())
        );
        assert_eq!(
            rows[0].after.as_ref().unwrap()[1],
            ColumnValue::Text(b"b".to_vec())
        );
    }

    #[test]
    fn test_delete_rows_decode() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&108u64.to_le_bytes()[..6]);
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.push(2);
        payload.push(0b11);
        payload.extend_from_slice(&[0x00, 0x05, 0x00, 0x00, 0x00, 0x01, b'x']);

        let event = RowsEvent::parse(EventType::DeleteRowsV1, &payload).unwrap();
        let rows = decode_rows(&event, &item_columns(), &[0, 16]).unwrap();
        assert!(rows[0].after.is_none());
        assert_eq!(
            rows[0].before.as_ref().unwrap()[0],
            ColumnValue::UnsignedInt(5)
        );
    }

    #[test]
    fn test_rows_decode_truncated_is_error() {
        let row: &[u8] = &[0x00, 0x2A, 0x00]; // id cut short
        let payload = write_rows_payload(&[row]);
        let event = RowsEvent::parse(EventType::WriteRowsV2, &payload).unwrap();
        assert!(decode_rows(&event, &item_columns(), &[0, 16]).is_err());
    }

    #[test]
    fn test_bitmap_helpers() {
        assert_eq!(count_set_bits(&[0b1111_1111]), 8);
        assert_eq!(count_set_bits(&[0b1010_1010, 0b1]), 5);
        assert_eq!(count_set_bits(&[]), 0);

        let bitmap = [0b0000_0101, 0b0000_0001];
        assert!(is_bit_set(&bitmap, 0));
        assert!(!is_bit_set(&bitmap, 1));
        assert!(is_bit_set(&bitmap, 2));
        assert!(is_bit_set(&bitmap, 8));
        assert!(!is_bit_set(&bitmap, 9));
        assert!(!is_bit_set(&bitmap, 99));
    }
}
