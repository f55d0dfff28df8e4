//! Typed field decoders for row images.
//!
//! Every supported column maps to one [`ColumnKind`] variant carrying just
//! the metadata its wire form needs; [`ColumnKind::decode`] dispatches on the
//! variant and produces a [`ColumnValue`]. Temporal columns exist in two wire
//! layouts (the legacy pre-5.6.4 one and the packed big-endian one); which
//! applies is a per-column flag toggled from TABLE_MAP via
//! [`ColumnKind::reset_storage`].
//!
//! String decoders never transcode: text comes out as raw bytes, and the
//! column's [`CollationInfo`] tells the caller what those bytes mean.

use anyhow::{bail, Result};
use bytes::Buf;
use std::io::Cursor;

use super::collation::CollationInfo;

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    SignedInt(i64),
    UnsignedInt(u64),
    Float(f32),
    Double(f64),
    Date {
        year: u16,
        month: u8,
        day: u8,
    },
    Time {
        negative: bool,
        hours: u16,
        minutes: u8,
        seconds: u8,
        micros: u32,
    },
    DateTime {
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        micros: u32,
    },
    /// Seconds since epoch plus fractional microseconds.
    Timestamp {
        seconds: u32,
        micros: u32,
    },
    Year(u16),
    /// Raw text bytes; interpret against the column's collation.
    Text(Vec<u8>),
    Blob(Vec<u8>),
    /// 1-based index into the declared `enum(...)` list (0 = empty).
    Enum(u16),
    /// Bitset over the declared `set(...)` members.
    Set(u64),
    Bit(Vec<u8>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

/// Closed union of supported column types, one variant per wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Tiny { unsigned: bool },
    Short { unsigned: bool },
    Int24 { unsigned: bool },
    Long { unsigned: bool },
    LongLong { unsigned: bool },
    Float,
    Double,
    Year,
    Date,
    Timestamp { decimals: u8, old_storage: bool },
    Time { decimals: u8, old_storage: bool },
    DateTime { decimals: u8, old_storage: bool },
    /// VARCHAR/VARBINARY; `max_bytes` is the declared character length times
    /// the collation's maxlen and decides the width of the length prefix.
    Varchar {
        max_bytes: u32,
        collation: Option<CollationInfo>,
    },
    /// CHAR/BINARY; the on-wire length comes from TABLE_MAP metadata.
    FixedString { collation: Option<CollationInfo> },
    /// Number of declared members decides 1 or 2 value bytes.
    Enum { members: u16 },
    /// Number of declared members decides 1..8 value bytes.
    Set { members: u16 },
    Bit,
    /// BLOB/TEXT; the length-prefix width comes from TABLE_MAP metadata.
    Blob,
}

impl ColumnKind {
    /// Toggle between legacy and packed temporal layouts. No-op for
    /// non-temporal kinds.
    pub fn reset_storage(&mut self, old: bool) {
        match self {
            ColumnKind::Timestamp { old_storage, .. }
            | ColumnKind::Time { old_storage, .. }
            | ColumnKind::DateTime { old_storage, .. } => *old_storage = old,
            _ => {}
        }
    }

    /// The collation attached to this column, for text kinds.
    pub fn collation(&self) -> Option<&CollationInfo> {
        match self {
            ColumnKind::Varchar { collation, .. } | ColumnKind::FixedString { collation } => {
                collation.as_ref()
            }
            _ => None,
        }
    }

    /// Decode one value of this kind from a row image.
    ///
    /// `meta` is the TABLE_MAP metadata for the column; only kinds whose wire
    /// form depends on it (CHAR, BLOB, BIT) consult it.
    pub fn decode(&self, cur: &mut Cursor<&[u8]>, meta: u16) -> Result<ColumnValue> {
        match *self {
            ColumnKind::Tiny { unsigned } => {
                need(cur, 1)?;
                Ok(if unsigned {
                    ColumnValue::UnsignedInt(cur.get_u8() as u64)
                } else {
                    ColumnValue::SignedInt(cur.get_i8() as i64)
                })
            }
            ColumnKind::Short { unsigned } => {
                need(cur, 2)?;
                Ok(if unsigned {
                    ColumnValue::UnsignedInt(cur.get_u16_le() as u64)
                } else {
                    ColumnValue::SignedInt(cur.get_i16_le() as i64)
                })
            }
            ColumnKind::Int24 { unsigned } => {
                need(cur, 3)?;
                let raw = read_uint3_le(cur);
                Ok(if unsigned {
                    ColumnValue::UnsignedInt(raw as u64)
                } else {
                    // Sign-extend bit 23
                    let signed = if raw & 0x80_0000 != 0 {
                        (raw | 0xFF00_0000) as i32
                    } else {
                        raw as i32
                    };
                    ColumnValue::SignedInt(signed as i64)
                })
            }
            ColumnKind::Long { unsigned } => {
                need(cur, 4)?;
                Ok(if unsigned {
                    ColumnValue::UnsignedInt(cur.get_u32_le() as u64)
                } else {
                    ColumnValue::SignedInt(cur.get_i32_le() as i64)
                })
            }
            ColumnKind::LongLong { unsigned } => {
                need(cur, 8)?;
                Ok(if unsigned {
                    ColumnValue::UnsignedInt(cur.get_u64_le())
                } else {
                    ColumnValue::SignedInt(cur.get_i64_le())
                })
            }
            ColumnKind::Float => {
                need(cur, 4)?;
                Ok(ColumnValue::Float(cur.get_f32_le()))
            }
            ColumnKind::Double => {
                need(cur, 8)?;
                Ok(ColumnValue::Double(cur.get_f64_le()))
            }
            ColumnKind::Year => {
                need(cur, 1)?;
                Ok(ColumnValue::Year(cur.get_u8() as u16 + 1900))
            }
            ColumnKind::Date => {
                need(cur, 3)?;
                let packed = read_uint3_le(cur);
                Ok(ColumnValue::Date {
                    day: (packed & 0x1F) as u8,
                    month: ((packed >> 5) & 0x0F) as u8,
                    year: ((packed >> 9) & 0x7FFF) as u16,
                })
            }
            ColumnKind::Timestamp {
                decimals,
                old_storage,
            } => {
                if old_storage {
                    need(cur, 4)?;
                    Ok(ColumnValue::Timestamp {
                        seconds: cur.get_u32_le(),
                        micros: 0,
                    })
                } else {
                    need(cur, 4)?;
                    let seconds = cur.get_u32();
                    let micros = read_fractional(cur, decimals)?;
                    Ok(ColumnValue::Timestamp { seconds, micros })
                }
            }
            ColumnKind::Time {
                decimals,
                old_storage,
            } => {
                if old_storage {
                    need(cur, 3)?;
                    let packed = read_uint3_le(cur);
                    Ok(ColumnValue::Time {
                        negative: false,
                        hours: (packed / 10_000) as u16,
                        minutes: ((packed / 100) % 100) as u8,
                        seconds: (packed % 100) as u8,
                        micros: 0,
                    })
                } else {
                    need(cur, 3)?;
                    let packed = read_uint3_be(cur);
                    let negative = packed & 0x80_0000 == 0;
                    let value = if negative {
                        0x80_0000 - (packed & 0x7F_FFFF)
                    } else {
                        packed & 0x7F_FFFF
                    };
                    let micros = read_fractional(cur, decimals)?;
                    Ok(ColumnValue::Time {
                        negative,
                        hours: ((value >> 12) & 0x3FF) as u16,
                        minutes: ((value >> 6) & 0x3F) as u8,
                        seconds: (value & 0x3F) as u8,
                        micros,
                    })
                }
            }
            ColumnKind::DateTime {
                decimals,
                old_storage,
            } => {
                if old_storage {
                    need(cur, 8)?;
                    let packed = cur.get_u64_le();
                    Ok(ColumnValue::DateTime {
                        second: (packed % 100) as u8,
                        minute: ((packed / 100) % 100) as u8,
                        hour: ((packed / 10_000) % 100) as u8,
                        day: ((packed / 1_000_000) % 100) as u8,
                        month: ((packed / 100_000_000) % 100) as u8,
                        year: (packed / 10_000_000_000) as u16,
                        micros: 0,
                    })
                } else {
                    need(cur, 5)?;
                    let packed = read_uint5_be(cur);
                    let micros = read_fractional(cur, decimals)?;
                    let year_month = (packed >> 22) & 0x1_FFFF;
                    Ok(ColumnValue::DateTime {
                        year: (year_month / 13) as u16,
                        month: (year_month % 13) as u8,
                        day: ((packed >> 17) & 0x1F) as u8,
                        hour: ((packed >> 12) & 0x1F) as u8,
                        minute: ((packed >> 6) & 0x3F) as u8,
                        second: (packed & 0x3F) as u8,
                        micros,
                    })
                }
            }
            ColumnKind::Varchar { max_bytes, .. } => {
                let len = if max_bytes <= 255 {
                    need(cur, 1)?;
                    cur.get_u8() as usize
                } else {
                    need(cur, 2)?;
                    cur.get_u16_le() as usize
                };
                Ok(ColumnValue::Text(read_bytes(cur, len)?))
            }
            ColumnKind::FixedString { .. } => {
                // TABLE_MAP metadata: high byte real type, low byte max length.
                let max_len = meta & 0xFF;
                let len = if max_len < 256 {
                    need(cur, 1)?;
                    cur.get_u8() as usize
                } else {
                    need(cur, 2)?;
                    cur.get_u16_le() as usize
                };
                Ok(ColumnValue::Text(read_bytes(cur, len)?))
            }
            ColumnKind::Enum { members } => {
                let value = if members <= 255 {
                    need(cur, 1)?;
                    cur.get_u8() as u16
                } else {
                    need(cur, 2)?;
                    cur.get_u16_le()
                };
                Ok(ColumnValue::Enum(value))
            }
            ColumnKind::Set { members } => {
                let nbytes = ((members as usize).div_ceil(8)).clamp(1, 8);
                need(cur, nbytes)?;
                let mut value = 0u64;
                for i in 0..nbytes {
                    value |= (cur.get_u8() as u64) << (i * 8);
                }
                Ok(ColumnValue::Set(value))
            }
            ColumnKind::Bit => {
                // TABLE_MAP metadata: low byte = leftover bits, high byte =
                // whole bytes.
                let nbits = ((meta >> 8) as usize) * 8 + (meta & 0xFF) as usize;
                let len = nbits.div_ceil(8);
                Ok(ColumnValue::Bit(read_bytes(cur, len)?))
            }
            ColumnKind::Blob => {
                // TABLE_MAP metadata: width of the length prefix in bytes.
                let prefix = (meta as usize).clamp(1, 4);
                need(cur, prefix)?;
                let len = match prefix {
                    1 => cur.get_u8() as usize,
                    2 => cur.get_u16_le() as usize,
                    3 => read_uint3_le(cur) as usize,
                    _ => cur.get_u32_le() as usize,
                };
                Ok(ColumnValue::Blob(read_bytes(cur, len)?))
            }
        }
    }
}

fn need(cur: &Cursor<&[u8]>, n: usize) -> Result<()> {
    if cur.remaining() < n {
        bail!(
            "truncated row image: need {} bytes, {} remaining",
            n,
            cur.remaining()
        );
    }
    Ok(())
}

fn read_bytes(cur: &mut Cursor<&[u8]>, n: usize) -> Result<Vec<u8>> {
    need(cur, n)?;
    let mut buf = vec![0u8; n];
    cur.copy_to_slice(&mut buf);
    Ok(buf)
}

fn read_uint3_le(cur: &mut Cursor<&[u8]>) -> u32 {
    let b1 = cur.get_u8() as u32;
    let b2 = cur.get_u8() as u32;
    let b3 = cur.get_u8() as u32;
    b1 | (b2 << 8) | (b3 << 16)
}

fn read_uint3_be(cur: &mut Cursor<&[u8]>) -> u32 {
    let b1 = cur.get_u8() as u32;
    let b2 = cur.get_u8() as u32;
    let b3 = cur.get_u8() as u32;
    (b1 << 16) | (b2 << 8) | b3
}

fn read_uint5_be(cur: &mut Cursor<&[u8]>) -> u64 {
    let mut value = 0u64;
    for _ in 0..5 {
        value = (value << 8) | cur.get_u8() as u64;
    }
    value
}

/// Read the packed fractional-seconds tail: `ceil(decimals/2)` big-endian
/// bytes holding the value in units of `10^-decimals` seconds.
fn read_fractional(cur: &mut Cursor<&[u8]>, decimals: u8) -> Result<u32> {
    if decimals == 0 {
        return Ok(0);
    }
    let decimals = decimals.min(6);
    let nbytes = (decimals as usize).div_ceil(2);
    need(cur, nbytes)?;
    let mut value = 0u32;
    for _ in 0..nbytes {
        value = (value << 8) | cur.get_u8() as u32;
    }
    Ok(value * 10u32.pow(6 - decimals as u32))
}
