//! Error type shared by every compiler stage and request.

use thiserror::Error;

/// Boxed error produced by an [`Execute`](crate::execute::Execute) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while compiling or executing a request.
#[derive(Debug, Error)]
pub enum Error {
    /// A sort-key operator is not part of the operator table.
    #[error("unsupported sort key operator ({0})")]
    UnsupportedOperator(String),

    /// An update directive names a function other than `list_append`, `increase` or `decrease`.
    #[error("unsupported function name ({0})")]
    UnsupportedFunction(String),

    /// An update directive does not have the `Fn:<function>:<field>` shape.
    #[error("unsupported function format ({0})")]
    MalformedFunctionDirective(String),

    /// A filter value marshals to something other than a string, boolean or number.
    #[error("unsupported value type for field {field}: {kind}")]
    UnsupportedValueType {
        /// The filtered field.
        field: String,
        /// The attribute kind the value marshaled to.
        kind: String,
    },

    /// A range literal is missing its `/` bound separator.
    #[error("malformed range ({0}), expected <low>/<high>")]
    MalformedRange(String),

    /// Two parts of one request bind the same value token to different values.
    #[error("value placeholder {0} bound to different values")]
    PlaceholderCollision(String),

    /// An update map compiles to no `SET` action.
    #[error("update has no fields to set")]
    EmptyUpdate,

    /// A point lookup matched no row.
    #[error("item not found ({0})")]
    NotFound(String),

    /// A record, key or continuation token could not be marshaled.
    #[error(transparent)]
    Marshal(#[from] serde_dynamo::Error),

    /// The store rejected or failed a request.
    #[error("execute error: {0}")]
    Execute(#[source] BoxError),

    /// The request was canceled or its deadline elapsed.
    #[error("request canceled")]
    Canceled,

    /// Draining pages stopped at the configured page cap.
    #[error("page limit of {max} exceeded")]
    PageLimitExceeded {
        /// The configured maximum number of pages.
        max: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
