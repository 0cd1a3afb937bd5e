use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FieldMapper;
use crate::models::{Bin, BinStatus};
use crate::queries::BinField;
use crate::source::SourceError;

/// Stored shape of a bin in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBinDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub bin_number: String,
    pub location: String,
    pub capacity: u32,
    pub current_stock: u32,
    pub status: BinStatus,
    #[serde(default)]
    pub barcode: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl LocalBinDocument {
    /// Barcode with the bin number fallback applied.
    pub fn effective_barcode(&self) -> &str {
        if self.barcode.is_empty() {
            &self.bin_number
        } else {
            &self.barcode
        }
    }
}

/// One document field per canonical field; the mapping is lossless.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBinMapper;

impl FieldMapper for LocalBinMapper {
    type Record = LocalBinDocument;

    fn to_canonical(&self, record: &LocalBinDocument) -> Result<Bin, SourceError> {
        Ok(Bin {
            id: record.id.clone(),
            bin_number: record.bin_number.clone(),
            location: record.location.clone(),
            capacity: record.capacity,
            current_stock: record.current_stock,
            status: record.status,
            barcode: record.effective_barcode().to_string(),
            created_at: record.created_at,
            last_updated: record.last_updated,
        })
    }

    fn to_source(&self, bin: &Bin) -> LocalBinDocument {
        LocalBinDocument {
            id: bin.id.clone(),
            bin_number: bin.bin_number.clone(),
            location: bin.location.clone(),
            capacity: bin.capacity,
            current_stock: bin.current_stock,
            status: bin.status,
            barcode: bin.barcode.clone(),
            created_at: bin.created_at,
            last_updated: bin.last_updated,
        }
    }

    fn filter_operand(&self, field: BinField) -> String {
        match field {
            BinField::Id => "_id",
            BinField::BinNumber => "bin_number",
            BinField::Location => "location",
            BinField::Barcode => "barcode",
            BinField::Status => "status",
        }
        .to_string()
    }

    fn field_text(&self, record: &LocalBinDocument, field: BinField) -> Option<String> {
        let text = match field {
            BinField::Id => record.id.clone(),
            BinField::BinNumber => record.bin_number.clone(),
            BinField::Location => record.location.clone(),
            BinField::Barcode => record.effective_barcode().to_string(),
            BinField::Status => record.status.to_string(),
        };
        Some(text)
    }
}
