//! Document identifiers.

use cdc_types::{canonical_number, ChangeRow};

use crate::error::{Result, SyncError};
use crate::registry::Replica;

/// Extract the document id of `row` from the replica's primary key column.
///
/// The key must be present and numeric; it is rendered canonically so
/// `42.0` and `42` both address document `"42"`.
pub fn resolve_key(row: &ChangeRow, replica: &Replica) -> Result<String> {
    let field = row.qualified_name(&replica.primary_key);
    let value = row
        .fields
        .get(&field)
        .ok_or_else(|| SyncError::MissingField {
            field: field.clone(),
        })?;

    value
        .content
        .as_f64()
        .map(canonical_number)
        .ok_or_else(|| SyncError::NonNumericKey {
            field,
            found: value.content.kind(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdc_types::FieldValue;

    #[test]
    fn test_numeric_key() {
        let row = ChangeRow::new("public", "orders").with_column("id", 42.0);
        assert_eq!(resolve_key(&row, &Replica::new("orders")).unwrap(), "42");
    }

    #[test]
    fn test_custom_primary_key() {
        let replica = Replica::new("orders").with_primary_key("order_no");
        let row = ChangeRow::new("sales", "orders")
            .with_column("id", 1.0)
            .with_column("order_no", 1001.0);
        assert_eq!(resolve_key(&row, &replica).unwrap(), "1001");
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let row = ChangeRow::new("public", "orders").with_column("title", "book");
        match resolve_key(&row, &Replica::new("orders")) {
            Err(SyncError::MissingField { field }) => assert_eq!(field, "public.orders.id"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_key_is_an_error() {
        let row = ChangeRow::new("public", "orders").with_column("id", "A-17");
        assert!(matches!(
            resolve_key(&row, &Replica::new("orders")),
            Err(SyncError::NonNumericKey { found: "text", .. })
        ));

        let row = ChangeRow::new("public", "orders").with_column("id", FieldValue::Null);
        assert!(matches!(
            resolve_key(&row, &Replica::new("orders")),
            Err(SyncError::NonNumericKey { found: "null", .. })
        ));
    }
}
