use crate::error::Error;

use serde::{Deserialize, Serialize};
use std::{fmt, ops, str};

/// Comparison applied to the sort key of a [`Key`](crate::common::key::Key).
///
/// ```rust
/// use dynamodb_expr::common::operator::SortKeyOperator;
///
/// let operator: SortKeyOperator = "begins_with".parse().unwrap();
/// assert_eq!(operator, SortKeyOperator::BeginsWith);
/// assert!("~=".parse::<SortKeyOperator>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(into = "String", try_from = "String")]
pub enum SortKeyOperator {
    /// `=`
    Equals,
    /// `<=`
    LessThanOrEqual,
    /// `<`
    LessThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `>`
    GreaterThan,
    /// Inclusive range over a shared key prefix.
    Between,
    /// Prefix match.
    BeginsWith,
}

impl ops::Deref for SortKeyOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Equals => "=",
            Self::LessThanOrEqual => "<=",
            Self::LessThan => "<",
            Self::GreaterThanOrEqual => ">=",
            Self::GreaterThan => ">",
            Self::Between => "between",
            Self::BeginsWith => "begins_with",
        }
    }
}

impl fmt::Display for SortKeyOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}

impl str::FromStr for SortKeyOperator {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "=" | "equals" => Ok(Self::Equals),
            "<=" => Ok(Self::LessThanOrEqual),
            "<" => Ok(Self::LessThan),
            ">=" => Ok(Self::GreaterThanOrEqual),
            ">" => Ok(Self::GreaterThan),
            "between" => Ok(Self::Between),
            "begins_with" => Ok(Self::BeginsWith),
            other => Err(Error::UnsupportedOperator(other.to_string())),
        }
    }
}

impl TryFrom<String> for SortKeyOperator {
    type Error = Error;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token.parse()
    }
}

impl From<SortKeyOperator> for String {
    fn from(operator: SortKeyOperator) -> Self {
        operator.to_string()
    }
}
