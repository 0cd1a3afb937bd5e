use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::mapping::FieldMapper;
use crate::models::BinStatus;

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Canonical bin fields that can appear in a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinField {
    Id,
    BinNumber,
    Location,
    Barcode,
    Status,
}

/// Fields covered by free-text search.
pub const SEARCH_FIELDS: [BinField; 3] = [BinField::BinNumber, BinField::Location, BinField::Barcode];

/// Caller-facing list request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<BinStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: BinStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn paginate(mut self, skip: i64, limit: i64) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }
}

/// Source-agnostic filter over canonical fields.
///
/// `Contains` is case-insensitive; `Equals` compares the encoded value exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Contains { field: BinField, needle: String },
    Equals { field: BinField, value: String },
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn contains(field: BinField, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field,
            needle: needle.into(),
        }
    }

    pub fn equals(field: BinField, value: impl Into<String>) -> Self {
        Predicate::Equals {
            field,
            value: value.into(),
        }
    }

    /// Evaluates the predicate against a source record in process.
    pub fn matches<M: FieldMapper>(&self, mapper: &M, record: &M::Record) -> bool {
        match self {
            Predicate::Contains { field, needle } => {
                let needle = mapper.encode_value(*field, needle).to_lowercase();
                mapper
                    .field_text(record, *field)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            }
            Predicate::Equals { field, value } => {
                let value = mapper.encode_value(*field, value);
                mapper.field_text(record, *field).as_deref() == Some(value.as_str())
            }
            Predicate::Any(predicates) => predicates.iter().any(|p| p.matches(mapper, record)),
            Predicate::All(predicates) => predicates.iter().all(|p| p.matches(mapper, record)),
        }
    }

    /// Renders the predicate as an OData V2 `$filter` expression.
    pub fn to_odata_filter<M: FieldMapper>(&self, mapper: &M) -> String {
        match self {
            Predicate::Contains { field, needle } => format!(
                "substringof({},tolower({}))",
                odata_literal(&mapper.encode_value(*field, needle).to_lowercase()),
                mapper.filter_operand(*field)
            ),
            Predicate::Equals { field, value } => format!(
                "{} eq {}",
                mapper.filter_operand(*field),
                odata_literal(&mapper.encode_value(*field, value))
            ),
            Predicate::Any(predicates) => join_clauses(
                predicates.iter().map(|p| p.to_odata_filter(mapper)).collect(),
                " or ",
            ),
            Predicate::All(predicates) => join_clauses(
                predicates.iter().map(|p| p.to_odata_filter(mapper)).collect(),
                " and ",
            ),
        }
    }
}

/// Quotes an OData string literal, doubling embedded single quotes.
pub fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn join_clauses(clauses: Vec<String>, separator: &str) -> String {
    let mut unique: Vec<String> = Vec::with_capacity(clauses.len());
    for clause in clauses {
        if !clause.is_empty() && !unique.contains(&clause) {
            unique.push(clause);
        }
    }

    match unique.len() {
        0 => String::new(),
        1 => unique.remove(0),
        _ => format!("({})", unique.join(separator)),
    }
}

/// Source-native query produced by the translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub offset: u64,
    pub page_size: u64,
    pub filter: Option<Predicate>,
}

impl SourceQuery {
    pub fn new(offset: u64, page_size: u64) -> Self {
        Self {
            offset,
            page_size,
            filter: None,
        }
    }

    /// Single-row lookup.
    pub fn first(filter: Predicate) -> Self {
        Self::new(0, 1).with_filter(filter)
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Turns a [`ListQuery`] into a [`SourceQuery`] under page-size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTranslator {
    default_page_size: i64,
    max_page_size: i64,
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl QueryTranslator {
    pub fn new(default_page_size: u32, max_page_size: u32) -> Self {
        Self {
            default_page_size: i64::from(default_page_size),
            max_page_size: i64::from(max_page_size),
        }
    }

    pub fn translate(&self, query: &ListQuery) -> Result<SourceQuery, ServiceError> {
        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(self.default_page_size);

        if skip < 0 {
            return Err(ServiceError::InvalidQuery(format!(
                "skip must be zero or greater, got {skip}"
            )));
        }
        if limit <= 0 {
            return Err(ServiceError::InvalidQuery(format!(
                "limit must be greater than zero, got {limit}"
            )));
        }
        if limit > self.max_page_size {
            return Err(ServiceError::InvalidQuery(format!(
                "limit must not exceed {}, got {limit}",
                self.max_page_size
            )));
        }

        let mut clauses = Vec::new();

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            clauses.push(Predicate::Any(
                SEARCH_FIELDS
                    .iter()
                    .map(|field| Predicate::contains(*field, search))
                    .collect(),
            ));
        }
        if let Some(status) = query.status {
            clauses.push(Predicate::equals(BinField::Status, status.as_ref()));
        }

        let filter = match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(Predicate::All(clauses)),
        };

        Ok(SourceQuery {
            offset: skip as u64,
            page_size: limit as u64,
            filter,
        })
    }
}
