use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::read;

use serde::Serialize;

/// Compiled scan request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanInput {
    /// Filter, projection, paging and placeholder tables.
    pub multiple_read_input: read::common::MultipleReadInput,
}

/// Scan operation.
///
/// ```rust
/// use dynamodb_expr::{common, read};
/// use serde_json::Value;
///
/// let scan: read::scan::Scan<Value> = read::scan::Scan {
///     multiple_read_args: read::common::MultipleReadArgs {
///         filter: vec![common::condition::Predicate {
///             field: "Deleted".to_string(),
///             kind: common::condition::PredicateKind::Exist,
///         }],
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
/// };
/// let input: read::scan::ScanInput = scan.try_into().unwrap();
/// assert_eq!(
///     input.multiple_read_input.filter_expression.as_deref(),
///     Some("attribute_exists(#Deleted)")
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan<T> {
    /// Table name, filter, selection and paging.
    pub multiple_read_args: read::common::MultipleReadArgs<T>,
}

impl<T: Serialize> TryFrom<Scan<T>> for ScanInput {
    type Error = Error;

    fn try_from(scan: Scan<T>) -> Result<Self> {
        let multiple_read_input: read::common::MultipleReadInput =
            scan.multiple_read_args.try_into()?;
        Ok(Self {
            multiple_read_input,
        })
    }
}

impl<T: Serialize> Scan<T> {
    /// Compile the scan into a lazy page sequence.
    pub fn into_pager<E: Execute>(
        self,
        executor: &E,
        cancellation: read::paginate::Cancellation,
    ) -> Result<read::paginate::Pager<'_, E>> {
        let scan: ScanInput = self.try_into()?;
        let request = read::paginate::PageRequest::Scan(scan);
        Ok(read::paginate::Pager::new(executor, request, cancellation))
    }
}
