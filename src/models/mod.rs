pub mod bin;

pub use bin::{validate, validate_required, Bin, BinStatistics, BinStatus, NewBin, PartialBin};
