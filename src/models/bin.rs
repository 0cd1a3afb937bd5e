use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::errors::ValidationError;

/// Operational status of a storage bin.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BinStatus {
    #[default]
    Active,
    Inactive,
}

impl BinStatus {
    pub fn is_active(self) -> bool {
        matches!(self, BinStatus::Active)
    }
}

/// Canonical warehouse bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Bin {
    pub id: String,
    pub bin_number: String,
    pub location: String,
    pub capacity: u32,
    pub current_stock: u32,
    pub status: BinStatus,
    /// Secondary lookup key; equals `bin_number` when none was supplied.
    pub barcode: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Fields accepted when creating a bin.
///
/// Everything is optional at the type level so that missing input surfaces as
/// [`ValidationError::MissingField`] instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewBin {
    pub bin_number: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub current_stock: Option<u32>,
    pub status: Option<BinStatus>,
    pub barcode: Option<String>,
}

impl NewBin {
    pub fn new(bin_number: impl Into<String>, location: impl Into<String>, capacity: u32) -> Self {
        Self {
            bin_number: Some(bin_number.into()),
            location: Some(location.into()),
            capacity: Some(capacity),
            ..Default::default()
        }
    }

    pub fn with_stock(mut self, current_stock: u32) -> Self {
        self.current_stock = Some(current_stock);
        self
    }

    pub fn with_status(mut self, status: BinStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Builds the candidate bin for a create. The id is left empty for the
    /// backing source to assign.
    pub fn into_bin(self, now: DateTime<Utc>) -> Result<Bin, ValidationError> {
        validate_required(&self)?;

        let bin_number = required_text(self.bin_number, "bin_number")?;
        let location = required_text(self.location, "location")?;
        let capacity = self
            .capacity
            .ok_or(ValidationError::MissingField("capacity"))?;
        let barcode = effective_barcode(self.barcode, &bin_number);

        Ok(Bin {
            id: String::new(),
            bin_number,
            location,
            capacity,
            current_stock: self.current_stock.unwrap_or(0),
            status: self.status.unwrap_or_default(),
            barcode,
            created_at: now,
            last_updated: now,
        })
    }
}

/// Fields accepted when updating a bin. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PartialBin {
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub current_stock: Option<u32>,
    pub status: Option<BinStatus>,
    pub barcode: Option<String>,
}

impl PartialBin {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.capacity.is_none()
            && self.current_stock.is_none()
            && self.status.is_none()
            && self.barcode.is_none()
    }

    /// Merges the supplied fields over `current`. Timestamps are left to the caller.
    pub fn apply(&self, current: &Bin) -> Bin {
        let mut merged = current.clone();

        if let Some(location) = &self.location {
            merged.location = location.clone();
        }
        if let Some(capacity) = self.capacity {
            merged.capacity = capacity;
        }
        if let Some(current_stock) = self.current_stock {
            merged.current_stock = current_stock;
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(barcode) = &self.barcode {
            merged.barcode = effective_barcode(Some(barcode.clone()), &merged.bin_number);
        }

        merged
    }
}

/// Aggregate figures over the bin set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BinStatistics {
    pub total_bins: u64,
    pub active_bins: u64,
    pub inactive_bins: u64,
    pub total_capacity: u64,
    pub total_stock: u64,
    pub utilization_percentage: f64,
}

impl BinStatistics {
    pub fn from_bins<'a>(bins: impl IntoIterator<Item = &'a Bin>) -> Self {
        let mut stats = BinStatistics::default();

        for bin in bins {
            stats.total_bins += 1;
            if bin.status.is_active() {
                stats.active_bins += 1;
            }
            stats.total_capacity += u64::from(bin.capacity);
            stats.total_stock += u64::from(bin.current_stock);
        }

        stats.inactive_bins = stats.total_bins - stats.active_bins;
        stats.utilization_percentage = utilization(stats.total_stock, stats.total_capacity);
        stats
    }
}

fn utilization(total_stock: u64, total_capacity: u64) -> f64 {
    if total_capacity == 0 {
        return 0.0;
    }
    let percentage = total_stock as f64 / total_capacity as f64 * 100.0;
    (percentage * 100.0).round() / 100.0
}

/// Rejects a bin whose stock exceeds its capacity.
pub fn validate(candidate: &Bin) -> Result<(), ValidationError> {
    if candidate.current_stock > candidate.capacity {
        return Err(ValidationError::StockExceedsCapacity {
            capacity: candidate.capacity,
            current_stock: candidate.current_stock,
        });
    }
    Ok(())
}

/// Checks the fields a create cannot do without, in declaration order.
pub fn validate_required(candidate: &NewBin) -> Result<(), ValidationError> {
    if is_blank(candidate.bin_number.as_deref()) {
        return Err(ValidationError::MissingField("bin_number"));
    }
    if is_blank(candidate.location.as_deref()) {
        return Err(ValidationError::MissingField("location"));
    }
    if candidate.capacity.is_none() {
        return Err(ValidationError::MissingField("capacity"));
    }
    Ok(())
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn effective_barcode(barcode: Option<String>, bin_number: &str) -> String {
    barcode
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| bin_number.to_string())
}
