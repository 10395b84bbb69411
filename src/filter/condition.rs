//! Filter conditions
//!
//! A user-defined `(column, operator, value)` predicate, as persisted under
//! `{namespace}-custom-filters`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Column filter operator
///
/// Serialized as its snake_case name. Names this version does not know are
/// kept as `Unknown` so a stored filter list written by a newer build still
/// loads; such conditions match every record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Contains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    Unknown(String),
}

impl Operator {
    /// Returns true if this operator compares against a value
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }

    /// Wire name of the operator
    pub fn as_str(&self) -> &str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::Unknown(name) => name,
        }
    }

    /// Display label for the operator
    pub fn label(&self) -> &str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::NotEquals => "does not equal",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::IsEmpty => "is empty",
            Self::IsNotEmpty => "is not empty",
            Self::Unknown(name) => name,
        }
    }

    /// All known operators in display order
    pub fn all() -> &'static [Operator] {
        &[
            Self::Contains,
            Self::Equals,
            Self::NotEquals,
            Self::StartsWith,
            Self::EndsWith,
            Self::IsEmpty,
            Self::IsNotEmpty,
        ]
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "contains" => Self::Contains,
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            _ => Self::Unknown(name),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Operator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Caller-generated identifier, unique within a table
    pub id: String,
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
}

impl FilterCondition {
    pub fn new(
        id: impl Into<String>,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Whether this condition takes part in filtering
    ///
    /// Requires a column and an operator; value-comparing operators also
    /// need a non-blank value. `is_empty`/`is_not_empty` stay active with an
    /// empty value. Inactive conditions are kept, just ignored.
    pub fn is_active(&self) -> bool {
        if self.column.trim().is_empty() || self.operator.as_str().is_empty() {
            return false;
        }
        !self.operator.requires_value() || !self.value.trim().is_empty()
    }

    /// Apply a partial update
    pub fn apply_patch(&mut self, patch: FilterPatch) {
        if let Some(column) = patch.column {
            self.column = column;
        }
        if let Some(operator) = patch.operator {
            self.operator = operator;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
    }
}

/// Partial update for an existing [`FilterCondition`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub column: Option<String>,
    pub operator: Option<Operator>,
    pub value: Option<String>,
}

impl FilterPatch {
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}
