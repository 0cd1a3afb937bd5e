//! Mapping for the S/4HANA warehouse storage-bin entity (OData V2 JSON).
//!
//! | Canonical            | OData column                        |
//! |----------------------|-------------------------------------|
//! | id, bin_number       | `StorageBin`                        |
//! | barcode              | `StorageBin` (no distinct field)    |
//! | location             | `Warehouse` + `" - "` + `StorageType` |
//! | capacity             | `MaximumCapacity`                   |
//! | current_stock        | `StockQuantity`                     |
//! | status               | `BlockingIndicator` (`""` / `"X"`)  |
//! | created_at           | `CreationDateTime`                  |
//! | last_updated         | `LastChangeDateTime`                |
//!
//! The mapping is lossy for `barcode`: after a round trip it always equals the
//! bin number. A location without the delimiter gains the `BULK` storage type.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::FieldMapper;
use crate::models::{Bin, BinStatus};
use crate::queries::bin_queries::odata_literal;
use crate::queries::BinField;
use crate::source::SourceError;

pub const LOCATION_DELIMITER: &str = " - ";
pub const DEFAULT_STORAGE_TYPE: &str = "BULK";
pub const BLOCKED: &str = "X";

const STORAGE_BIN: &str = "StorageBin";
const WAREHOUSE: &str = "Warehouse";
const STORAGE_TYPE: &str = "StorageType";
const BLOCKING_INDICATOR: &str = "BlockingIndicator";

/// Numeric value as the service may send it: JSON number or Edm.Decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdmNumber {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl EdmNumber {
    /// Coerces to a non-negative whole quantity. Fractional values are rejected.
    pub fn to_quantity(&self, column: &str) -> Result<u32, SourceError> {
        let decimal = match self {
            EdmNumber::Integer(value) => Decimal::from(*value),
            EdmNumber::Decimal(value) => Decimal::from_f64(*value).ok_or_else(|| {
                SourceError::Decode(format!("{column}: {value} is not a finite number"))
            })?,
            EdmNumber::Text(text) if text.trim().is_empty() => return Ok(0),
            EdmNumber::Text(text) => Decimal::from_str(text.trim()).map_err(|e| {
                SourceError::Decode(format!("{column}: '{text}' is not numeric ({e})"))
            })?,
        };

        if !decimal.fract().is_zero() {
            return Err(SourceError::Decode(format!(
                "{column}: {decimal} is not a whole quantity"
            )));
        }
        decimal
            .to_u32()
            .ok_or_else(|| SourceError::Decode(format!("{column}: {decimal} is out of range")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ODataBinRecord {
    pub storage_bin: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warehouse: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub storage_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_capacity: Option<EdmNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<EdmNumber>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub blocking_indicator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_date_time: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

pub fn compose_location(warehouse: &str, storage_type: &str) -> String {
    if storage_type.is_empty() {
        warehouse.to_string()
    } else {
        format!("{warehouse}{LOCATION_DELIMITER}{storage_type}")
    }
}

/// Splits on the first delimiter; the storage type defaults to `BULK`.
pub fn decompose_location(location: &str) -> (String, String) {
    match location.split_once(LOCATION_DELIMITER) {
        Some((warehouse, storage_type)) if !storage_type.is_empty() => {
            (warehouse.to_string(), storage_type.to_string())
        }
        Some((warehouse, _)) => (warehouse.to_string(), DEFAULT_STORAGE_TYPE.to_string()),
        None => (location.to_string(), DEFAULT_STORAGE_TYPE.to_string()),
    }
}

pub fn status_from_indicator(indicator: &str) -> BinStatus {
    if indicator.trim().is_empty() {
        BinStatus::Active
    } else {
        BinStatus::Inactive
    }
}

pub fn indicator_from_status(status: BinStatus) -> &'static str {
    match status {
        BinStatus::Active => "",
        BinStatus::Inactive => BLOCKED,
    }
}

/// Parses `/Date(1700000000000)/` (optionally with an offset suffix) or RFC 3339.
pub fn parse_edm_datetime(raw: &str) -> Result<DateTime<Utc>, SourceError> {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed
        .strip_prefix("/Date(")
        .and_then(|rest| rest.strip_suffix(")/"))
    {
        let millis_end = inner
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map(|(idx, _)| idx)
            .unwrap_or(inner.len());
        let millis: i64 = inner[..millis_end]
            .parse()
            .map_err(|_| SourceError::Decode(format!("invalid Edm.DateTime '{raw}'")))?;
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| SourceError::Decode(format!("Edm.DateTime out of range '{raw}'")));
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SourceError::Decode(format!("invalid Edm.DateTime '{raw}'")))
}

pub fn format_edm_datetime(value: &DateTime<Utc>) -> String {
    format!("/Date({})/", value.timestamp_millis())
}

/// The epoch stands in for a timestamp the service never sent; it is not written back.
fn written_datetime(value: &DateTime<Utc>) -> Option<String> {
    (*value != DateTime::<Utc>::default()).then(|| format_edm_datetime(value))
}

fn optional_datetime(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, SourceError> {
    match raw {
        Some(text) if !text.trim().is_empty() => parse_edm_datetime(text).map(Some),
        _ => Ok(None),
    }
}

fn quantity(value: Option<&EdmNumber>, column: &str) -> Result<u32, SourceError> {
    value.map_or(Ok(0), |number| number.to_quantity(column))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ODataBinMapper;

impl FieldMapper for ODataBinMapper {
    type Record = ODataBinRecord;

    fn to_canonical(&self, record: &ODataBinRecord) -> Result<Bin, SourceError> {
        if record.storage_bin.is_empty() {
            return Err(SourceError::Decode(format!(
                "record without {STORAGE_BIN}"
            )));
        }

        // Missing timestamps read as the epoch so repeated reads stay stable.
        let created_at = optional_datetime(record.creation_date_time.as_deref())?
            .unwrap_or_default();
        let last_updated =
            optional_datetime(record.last_change_date_time.as_deref())?.unwrap_or(created_at);

        Ok(Bin {
            id: record.storage_bin.clone(),
            bin_number: record.storage_bin.clone(),
            location: compose_location(&record.warehouse, &record.storage_type),
            capacity: quantity(record.maximum_capacity.as_ref(), "MaximumCapacity")?,
            current_stock: quantity(record.stock_quantity.as_ref(), "StockQuantity")?,
            status: status_from_indicator(&record.blocking_indicator),
            barcode: record.storage_bin.clone(),
            created_at,
            last_updated,
        })
    }

    fn to_source(&self, bin: &Bin) -> ODataBinRecord {
        let (warehouse, storage_type) = decompose_location(&bin.location);
        ODataBinRecord {
            storage_bin: bin.bin_number.clone(),
            warehouse,
            storage_type,
            maximum_capacity: Some(EdmNumber::Text(bin.capacity.to_string())),
            stock_quantity: Some(EdmNumber::Text(bin.current_stock.to_string())),
            blocking_indicator: indicator_from_status(bin.status).to_string(),
            creation_date_time: written_datetime(&bin.created_at),
            last_change_date_time: written_datetime(&bin.last_updated),
        }
    }

    fn filter_operand(&self, field: BinField) -> String {
        match field {
            BinField::Id | BinField::BinNumber | BinField::Barcode => STORAGE_BIN.to_string(),
            BinField::Location => format!(
                "concat(concat({WAREHOUSE},{}),{STORAGE_TYPE})",
                odata_literal(LOCATION_DELIMITER)
            ),
            BinField::Status => BLOCKING_INDICATOR.to_string(),
        }
    }

    fn encode_value(&self, field: BinField, value: &str) -> String {
        match field {
            BinField::Status => match BinStatus::from_str(value) {
                Ok(status) => indicator_from_status(status).to_string(),
                Err(_) => value.to_string(),
            },
            _ => value.to_string(),
        }
    }

    fn field_text(&self, record: &ODataBinRecord, field: BinField) -> Option<String> {
        let text = match field {
            BinField::Id | BinField::BinNumber | BinField::Barcode => record.storage_bin.clone(),
            BinField::Location => compose_location(&record.warehouse, &record.storage_type),
            BinField::Status => record.blocking_indicator.clone(),
        };
        Some(text)
    }
}
