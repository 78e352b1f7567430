use super::{ColumnType, FKEY_ID_WIDTH, TableId};
use crate::catalog::TableDef;
use crate::config::BoolEncoding;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeErr {
    #[error("Missing key \"{column}\" of type {column_type}, cannot insert into table")]
    MissingField {
        column: String,
        column_type: ColumnType,
    },
    #[error("Value \"{value}\" for key \"{column}\" is not a valid {column_type}, cannot insert into table")]
    InvalidValue {
        column: String,
        column_type: ColumnType,
        value: String,
    },
}

/// Encodes one row of `table` into a buffer of exactly `table.row_width()` bytes.
///
/// Columns are laid out back to back in catalog order. An absent or empty value is missing.
/// Strings longer than the column are clipped without error.
pub fn encode_row(
    table: &TableDef,
    values: &HashMap<String, String>,
    bools: BoolEncoding,
) -> Result<Vec<u8>, EncodeErr> {
    let mut row = vec![0u8; table.row_width()];
    let mut offset = 0;

    for column in table.columns.values() {
        let column_type = column.column_type;
        let value = match values.get(&column.id) {
            Some(v) if !v.is_empty() => v.as_str(),
            _ => {
                return Err(EncodeErr::MissingField {
                    column: column.id.clone(),
                    column_type,
                });
            }
        };
        let invalid = || EncodeErr::InvalidValue {
            column: column.id.clone(),
            column_type,
            value: value.to_string(),
        };

        let width = column_type.width();
        let slot = &mut row[offset..offset + width];
        match column_type {
            ColumnType::String32
            | ColumnType::String128
            | ColumnType::String256
            | ColumnType::String1024
            | ColumnType::String2048 => write_clipped(slot, value),
            ColumnType::Int => {
                let v: i64 = value.parse().map_err(|_| invalid())?;
                slot.copy_from_slice(&v.to_le_bytes());
            }
            ColumnType::Float64 => {
                let v: f64 = value.parse().map_err(|_| invalid())?;
                slot.copy_from_slice(&v.to_le_bytes());
            }
            ColumnType::Byte => {
                slot[0] = value.parse::<u8>().map_err(|_| invalid())?;
            }
            ColumnType::Boolean => slot[0] = bools.encode(value),
            ColumnType::Fkey => {
                let (id, name) = slot.split_at_mut(FKEY_ID_WIDTH);
                id.copy_from_slice(&TableId::of(value).0.to_le_bytes());
                write_clipped(name, value);
            }
        }
        offset += width;
    }

    Ok(row)
}

/// Left-justified copy of `value`'s bytes into `slot`; the rest of `slot` stays zero.
fn write_clipped(slot: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(slot.len());
    slot[..len].copy_from_slice(&bytes[..len]);
}
