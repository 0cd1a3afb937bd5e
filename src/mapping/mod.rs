//! Conversion between canonical bins and source-native records.

use crate::models::Bin;
use crate::queries::BinField;
use crate::source::SourceError;

pub mod local;
pub mod odata;

pub use local::{LocalBinDocument, LocalBinMapper};
pub use odata::{EdmNumber, ODataBinMapper, ODataBinRecord};

/// Stateless, bidirectional mapping for one source record shape.
///
/// Besides whole-record conversion, a mapper names the source expression
/// behind each canonical field and encodes canonical filter values, which is
/// what lets a source-agnostic [`crate::queries::Predicate`] be rendered or
/// evaluated against that source.
pub trait FieldMapper: Send + Sync {
    type Record;

    fn to_canonical(&self, record: &Self::Record) -> Result<Bin, SourceError>;

    fn to_source(&self, bin: &Bin) -> Self::Record;

    /// Source expression whose value is `field`, as written in an OData `$filter`.
    /// Fields spread over several columns compose them the way `to_canonical` does.
    fn filter_operand(&self, field: BinField) -> String;

    /// Encodes a canonical filter value in the source's convention.
    fn encode_value(&self, field: BinField, value: &str) -> String {
        let _ = field;
        value.to_string()
    }

    /// Value of `filter_operand(field)` on `record`, for in-process predicate evaluation.
    fn field_text(&self, record: &Self::Record, field: BinField) -> Option<String>;
}
