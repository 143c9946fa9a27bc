//! Binary codec for embedding collections.
//!
//! ## File format
//!
//! All multi-byte integers are big-endian.
//!
//! ```text
//! header:
//!   magic         4 bytes, b"HSEM"
//!   version       u32
//!   dimension     u32
//!   count         u32
//!   provider id   128 bytes, zero-padded UTF-8
//!   model id      128 bytes, zero-padded UTF-8
//! record (count times):
//!   code, label, description, group id, section id
//!                 each [u16 length][UTF-8 bytes]
//!   alt label     [u8 presence][string when present]   (version 2)
//!   alt description                                    (version 2)
//!   keywords      [u16 count][strings]                 (version 2)
//!   alt keywords  [u8 presence][list when present]     (version 2)
//!   vector        dimension × f32
//! ```
//!
//! Version 1 records carry only the five strings and the vector; version 2
//! adds the alt-language fields and keyword lists so that binary artifacts
//! hold the same fields as the textual ones. Encoding always writes
//! version 2; both versions decode.
//!
//! The two 128-byte header ids are truncated at a char boundary when longer;
//! every other field keeps its full length or fails to encode. Decoding
//! never reads past the buffer and ignores trailing bytes after the
//! declared record count.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::data::{CodeRecord, Collection, EmbeddedRecord};
use crate::error::{LinnaeaError, Result};

/// Magic bytes at the start of every artifact.
pub const MAGIC: [u8; 4] = *b"HSEM";

/// Legacy record layout: five strings and the vector.
pub const VERSION_BASIC: u32 = 1;

/// Current record layout: adds alt-language fields and keyword lists.
pub const VERSION_BILINGUAL: u32 = 2;

const ID_FIELD_LEN: usize = 128;
const HEADER_LEN: usize = 4 + 4 + 4 + 4 + ID_FIELD_LEN * 2;

/// Encode a collection into the binary artifact format.
///
/// The collection must be non-empty, its dimension and record count must
/// fit the u32 header fields, and every record vector must match the
/// collection dimension. Variable-length fields longer than a u16 length
/// prefix can describe are rejected rather than truncated.
pub fn encode(collection: &Collection) -> Result<Vec<u8>> {
    if collection.records.is_empty() {
        return Err(LinnaeaError::invalid_argument(
            "cannot encode an empty collection",
        ));
    }
    let dimension = u32::try_from(collection.dimension).map_err(|_| {
        LinnaeaError::invalid_argument(format!(
            "dimension {} exceeds the u32 header field",
            collection.dimension
        ))
    })?;
    let count = u32::try_from(collection.records.len()).map_err(|_| {
        LinnaeaError::invalid_argument(format!(
            "{} records exceed the u32 header field",
            collection.records.len()
        ))
    })?;
    for embedded in &collection.records {
        if embedded.vector.len() != collection.dimension {
            return Err(LinnaeaError::invalid_argument(format!(
                "record '{}' has vector length {}, expected dimension {}",
                embedded.record.code,
                embedded.vector.len(),
                collection.dimension
            )));
        }
    }

    let mut buf = Vec::with_capacity(encoded_len(collection));
    buf.extend_from_slice(&MAGIC);
    buf.write_u32::<BigEndian>(VERSION_BILINGUAL)?;
    buf.write_u32::<BigEndian>(dimension)?;
    buf.write_u32::<BigEndian>(count)?;
    write_fixed_id(&mut buf, &collection.provider_id);
    write_fixed_id(&mut buf, &collection.model_id);

    for embedded in &collection.records {
        let record = &embedded.record;
        write_string(&mut buf, &record.code)?;
        write_string(&mut buf, &record.label)?;
        write_string(&mut buf, &record.description)?;
        write_string(&mut buf, &record.group_id)?;
        write_string(&mut buf, &record.section_id)?;
        write_opt_string(&mut buf, record.label_alt.as_deref())?;
        write_opt_string(&mut buf, record.description_alt.as_deref())?;
        write_string_list(&mut buf, &record.keywords)?;
        write_opt_string_list(&mut buf, record.keywords_alt.as_deref())?;
        for value in &embedded.vector {
            buf.write_f32::<BigEndian>(*value)?;
        }
    }

    debug_assert_eq!(buf.len(), encoded_len(collection));
    Ok(buf)
}

/// Decode a binary artifact into a collection.
pub fn decode(data: &[u8]) -> Result<Collection> {
    let mut cursor = Cursor::new(data);

    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| LinnaeaError::truncated("header magic"))?;
    if magic != MAGIC {
        return Err(LinnaeaError::format_error(format!(
            "unrecognized magic bytes {:02x?}, expected {:02x?}",
            magic, MAGIC
        )));
    }

    let version = read_header_u32(&mut cursor, "version")?;
    if version != VERSION_BASIC && version != VERSION_BILINGUAL {
        return Err(LinnaeaError::UnsupportedVersion { version });
    }

    let dimension = read_header_u32(&mut cursor, "dimension")? as usize;
    let count = read_header_u32(&mut cursor, "record count")? as usize;
    let provider_id = read_fixed_id(&mut cursor, "provider id")?;
    let model_id = read_fixed_id(&mut cursor, "model id")?;

    // Lower bound before allocating: even a version 1 record carries five
    // length prefixes and the vector.
    let record_floor = 10u64 + dimension as u64 * 4;
    let remaining = data.len() as u64 - cursor.position();
    if (count as u64).saturating_mul(record_floor) > remaining {
        return Err(LinnaeaError::truncated(format!(
            "{count} records declared but only {remaining} bytes remain"
        )));
    }

    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        records.push(decode_record(&mut cursor, version, dimension, index)?);
    }

    Ok(Collection {
        provider_id,
        model_id,
        dimension,
        records,
    })
}

/// Exact encoded size of a collection, header included.
fn encoded_len(collection: &Collection) -> usize {
    let mut len = HEADER_LEN;
    for embedded in &collection.records {
        let record = &embedded.record;
        len += encoded_string_len(&record.code)
            + encoded_string_len(&record.label)
            + encoded_string_len(&record.description)
            + encoded_string_len(&record.group_id)
            + encoded_string_len(&record.section_id);
        len += 1 + record.label_alt.as_deref().map_or(0, encoded_string_len);
        len += 1 + record.description_alt.as_deref().map_or(0, encoded_string_len);
        len += encoded_list_len(&record.keywords);
        len += 1 + record.keywords_alt.as_deref().map_or(0, encoded_list_len);
        len += embedded.vector.len() * 4;
    }
    len
}

fn encoded_string_len(value: &str) -> usize {
    2 + value.len()
}

fn encoded_list_len(items: &[String]) -> usize {
    2 + items.iter().map(|item| encoded_string_len(item)).sum::<usize>()
}

/// Write a fixed 128-byte id field, zero-padded, truncated at a char
/// boundary when the value is longer.
fn write_fixed_id(buf: &mut Vec<u8>, value: &str) {
    let mut field = [0u8; ID_FIELD_LEN];
    let mut end = value.len().min(ID_FIELD_LEN);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&value.as_bytes()[..end]);
    buf.extend_from_slice(&field);
}

fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<()> {
    if value.len() > u16::MAX as usize {
        return Err(LinnaeaError::invalid_argument(format!(
            "string field of {} bytes exceeds the u16 length prefix",
            value.len()
        )));
    }
    buf.write_u16::<BigEndian>(value.len() as u16)?;
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn write_opt_string(buf: &mut Vec<u8>, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => {
            buf.write_u8(1)?;
            write_string(buf, value)
        }
        None => {
            buf.write_u8(0)?;
            Ok(())
        }
    }
}

fn write_string_list(buf: &mut Vec<u8>, items: &[String]) -> Result<()> {
    if items.len() > u16::MAX as usize {
        return Err(LinnaeaError::invalid_argument(format!(
            "keyword list of {} entries exceeds the u16 count prefix",
            items.len()
        )));
    }
    buf.write_u16::<BigEndian>(items.len() as u16)?;
    for item in items {
        write_string(buf, item)?;
    }
    Ok(())
}

fn write_opt_string_list(buf: &mut Vec<u8>, items: Option<&[String]>) -> Result<()> {
    match items {
        Some(items) => {
            buf.write_u8(1)?;
            write_string_list(buf, items)
        }
        None => {
            buf.write_u8(0)?;
            Ok(())
        }
    }
}

fn decode_record(
    cursor: &mut Cursor<&[u8]>,
    version: u32,
    dimension: usize,
    index: usize,
) -> Result<EmbeddedRecord> {
    let code = read_string(cursor, index, "code")?;
    let label = read_string(cursor, index, "label")?;
    let description = read_string(cursor, index, "description")?;
    let group_id = read_string(cursor, index, "group id")?;
    let section_id = read_string(cursor, index, "section id")?;

    let (label_alt, description_alt, keywords, keywords_alt) = if version >= VERSION_BILINGUAL {
        (
            read_opt_string(cursor, index, "alt label")?,
            read_opt_string(cursor, index, "alt description")?,
            read_string_list(cursor, index, "keywords")?,
            read_opt_string_list(cursor, index, "alt keywords")?,
        )
    } else {
        (None, None, Vec::new(), None)
    };

    let mut vector = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let value = cursor
            .read_f32::<BigEndian>()
            .map_err(|_| field_truncated(index, "vector"))?;
        vector.push(value);
    }

    Ok(EmbeddedRecord {
        record: CodeRecord {
            code,
            label,
            label_alt,
            description,
            description_alt,
            group_id,
            section_id,
            keywords,
            keywords_alt,
        },
        vector,
    })
}

fn read_header_u32(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u32> {
    cursor
        .read_u32::<BigEndian>()
        .map_err(|_| LinnaeaError::truncated(format!("header field '{field}'")))
}

/// Read a fixed 128-byte id field, treating the first NUL as the terminator.
fn read_fixed_id(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<String> {
    let mut buf = [0u8; ID_FIELD_LEN];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| LinnaeaError::truncated(format!("header field '{field}'")))?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(ID_FIELD_LEN);
    std::str::from_utf8(&buf[..end])
        .map(str::to_string)
        .map_err(|_| {
            LinnaeaError::format_error(format!("header field '{field}' is not valid UTF-8"))
        })
}

fn field_truncated(index: usize, field: &str) -> LinnaeaError {
    LinnaeaError::truncated(format!("record {index} field '{field}'"))
}

fn read_string(cursor: &mut Cursor<&[u8]>, index: usize, field: &str) -> Result<String> {
    let len = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| field_truncated(index, field))? as usize;
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| field_truncated(index, field))?;
    String::from_utf8(buf).map_err(|_| {
        LinnaeaError::format_error(format!(
            "record {index} field '{field}' is not valid UTF-8"
        ))
    })
}

fn read_flag(cursor: &mut Cursor<&[u8]>, index: usize, field: &str) -> Result<bool> {
    match cursor.read_u8().map_err(|_| field_truncated(index, field))? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(LinnaeaError::format_error(format!(
            "record {index} field '{field}' has invalid presence flag {other}"
        ))),
    }
}

fn read_opt_string(
    cursor: &mut Cursor<&[u8]>,
    index: usize,
    field: &str,
) -> Result<Option<String>> {
    if read_flag(cursor, index, field)? {
        Ok(Some(read_string(cursor, index, field)?))
    } else {
        Ok(None)
    }
}

fn read_string_list(
    cursor: &mut Cursor<&[u8]>,
    index: usize,
    field: &str,
) -> Result<Vec<String>> {
    let count = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| field_truncated(index, field))? as usize;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_string(cursor, index, field)?);
    }
    Ok(items)
}

fn read_opt_string_list(
    cursor: &mut Cursor<&[u8]>,
    index: usize,
    field: &str,
) -> Result<Option<Vec<String>>> {
    if read_flag(cursor, index, field)? {
        Ok(Some(read_string_list(cursor, index, field)?))
    } else {
        Ok(None)
    }
}
