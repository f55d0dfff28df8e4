//! Offline pipeline test: a synthesized binlog stream (with CRC32 trailers)
//! driven through the event parser, the schema registry, and the field
//! decoders, the same way the read loop wires them together.

use binlog_relay::mysql::event::{
    self, decode_rows, EventHeader, EventType, FormatDescriptionEvent, RotateEvent, RowsEvent,
    TableMapEvent, XidEvent, EVENT_HEADER_LEN,
};
use binlog_relay::mysql::schema::{build_columns, SchemaRegistry, TableSchema};
use binlog_relay::mysql::{CollationCatalog, ColumnValue, RowKind};
use binlog_relay::mysql::metadata::FullColumn;
use binlog_relay::BinlogPosition;

fn event_with_checksum(timestamp: u32, type_code: u8, next_position: u32, payload: &[u8]) -> Vec<u8> {
    let total = EVENT_HEADER_LEN + payload.len() + 4;
    let mut data = Vec::with_capacity(total);
    data.extend_from_slice(&timestamp.to_le_bytes());
    data.push(type_code);
    data.extend_from_slice(&1u32.to_le_bytes()); // server id
    data.extend_from_slice(&(total as u32).to_le_bytes());
    data.extend_from_slice(&next_position.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(payload);
    let crc = crc32fast::hash(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    data
}

fn format_description_payload(server_version: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&4u16.to_le_bytes());
    let mut version = [0u8; 50];
    version[..server_version.len()].copy_from_slice(server_version.as_bytes());
    payload.extend_from_slice(&version);
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.push(EVENT_HEADER_LEN as u8);
    payload
}

fn table_map_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&108u64.to_le_bytes()[..6]);
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.push(4);
    payload.extend_from_slice(b"shop\0");
    payload.push(4);
    payload.extend_from_slice(b"item\0");
    payload.push(2); // columns
    payload.push(3); // MYSQL_TYPE_LONG
    payload.push(253); // MYSQL_TYPE_VAR_STRING
    payload.push(2); // metadata block length
    payload.extend_from_slice(&16u16.to_le_bytes());
    payload.push(0b10); // name is nullable
    payload
}

fn write_rows_payload(rows: &[&[u8]]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&108u64.to_le_bytes()[..6]);
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&2u16.to_le_bytes()); // v2 extra data: none
    payload.push(2);
    payload.push(0b11);
    for row in rows {
        payload.extend_from_slice(row);
    }
    payload
}

/// The schema the primary would report for
/// `shop.item (id INT UNSIGNED, name VARCHAR(16))`.
fn item_schema() -> TableSchema {
    let catalog = CollationCatalog::from_rows(
        vec![("latin1".to_string(), 1)],
        vec![("latin1_swedish_ci".to_string(), "latin1".to_string())],
    )
    .unwrap();
    let columns = build_columns(
        &[
            FullColumn {
                field: "id".into(),
                type_str: "int(10) unsigned".into(),
                collation: None,
            },
            FullColumn {
                field: "name".into(),
                type_str: "varchar(16)".into(),
                collation: Some("latin1_swedish_ci".into()),
            },
        ],
        &catalog,
        false,
    )
    .unwrap();

    TableSchema {
        db: "shop".into(),
        name: "item".into(),
        columns,
        filter: None,
        callback: None,
    }
}

#[test]
fn insert_flows_through_parser_registry_and_decoders() {
    let mut registry = SchemaRegistry::new();
    registry.insert(item_schema());
    let mut position = BinlogPosition::new("mysql-bin.000001", 4);
    let mut published: Vec<BinlogPosition> = Vec::new();
    let mut delivered: Vec<(RowKind, Vec<ColumnValue>)> = Vec::new();

    let row: &[u8] = &[0x00, 0x2A, 0x00, 0x00, 0x00, 0x02, b'h', b'i'];
    let stream = vec![
        event_with_checksum(0, 15, 0, &format_description_payload("5.7.20-log")),
        event_with_checksum(1_700_000_000, 19, 500, &table_map_payload()),
        event_with_checksum(1_700_000_000, 30, 620, &write_rows_payload(&[row])),
        event_with_checksum(1_700_000_000, 16, 700, &77u64.to_le_bytes()),
    ];

    let mut master_ge56 = false;
    for raw in &stream {
        let body = event::verify_and_strip_checksum(raw).unwrap();
        let header = EventHeader::parse(body).unwrap();
        let payload = &body[EVENT_HEADER_LEN..];

        if header.next_position != 0 {
            position.log_pos = header.next_position;
        }

        match header.event_type {
            EventType::FormatDescription => {
                let fde = FormatDescriptionEvent::parse(payload).unwrap();
                master_ge56 = fde.master_ge56();
            }
            EventType::TableMap => {
                let table_map = TableMapEvent::parse(payload).unwrap();
                registry.bind(&table_map);
                if master_ge56 {
                    registry.apply_temporal_reset(&table_map);
                }
            }
            EventType::WriteRowsV2 => {
                let rows_event = RowsEvent::parse(header.event_type, payload).unwrap();
                let binding = registry.binding(rows_event.table_id).unwrap();
                let schema = registry.get(&binding.key).unwrap();
                for pair in
                    decode_rows(&rows_event, &schema.columns, &binding.column_metadata).unwrap()
                {
                    delivered.push((rows_event.kind, pair.after.unwrap()));
                }
            }
            EventType::Xid => {
                XidEvent::parse(payload).unwrap();
                published.push(position.clone());
            }
            other => panic!("unexpected event type in stream: {:?}", other),
        }
    }

    assert!(master_ge56);
    assert_eq!(delivered.len(), 1);
    let (kind, image) = &delivered[0];
    assert_eq!(*kind, RowKind::Insert);
    assert_eq!(image[0], ColumnValue::UnsignedInt(42));
    assert_eq!(image[1], ColumnValue::Text(b"hi".to_vec()));

    // The frontier was published once, at the commit, with the position the
    // write event advanced to.
    assert_eq!(
        published,
        vec![BinlogPosition::new("mysql-bin.000001", 700)]
    );
}

#[test]
fn corrupted_event_fails_checksum_validation() {
    let mut raw = event_with_checksum(1_700_000_000, 19, 500, &table_map_payload());
    let len = raw.len();
    raw[len - 10] ^= 0x01;
    assert!(event::verify_and_strip_checksum(&raw).is_err());
}

#[test]
fn rotate_resets_position_to_new_file_at_offset_4() {
    let mut payload = 4u64.to_le_bytes().to_vec();
    payload.extend_from_slice(b"mysql-bin.000002");
    let raw = event_with_checksum(0, 4, 0, &payload);

    let body = event::verify_and_strip_checksum(&raw).unwrap();
    let header = EventHeader::parse(body).unwrap();
    assert_eq!(header.event_type, EventType::Rotate);

    let rotate = RotateEvent::parse(&body[EVENT_HEADER_LEN..]).unwrap();
    let position = BinlogPosition::new(rotate.next_log, rotate.position as u32);
    assert_eq!(position, BinlogPosition::new("mysql-bin.000002", 4));
}
