//! Flat documents as they are sent to the search index.

use crate::message::ChangeRow;
use crate::values::FieldValue;
use std::collections::BTreeMap;

/// A flat, index-ready document: unqualified column name to value.
pub type Document = BTreeMap<String, FieldValue>;

/// Strip the exact `namespace.relation.` prefix from a qualified field name.
///
/// Keys without that prefix are returned untouched, so column names that
/// themselves contain dots survive any number of passes.
pub fn unqualified_name<'a>(key: &'a str, namespace: &str, relation: &str) -> &'a str {
    key.strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_prefix(relation))
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|column| !column.is_empty())
        .unwrap_or(key)
}

/// Flatten a change row's qualified field map into a document.
pub fn flatten(row: &ChangeRow) -> Document {
    row.fields
        .iter()
        .map(|(key, field)| {
            (
                unqualified_name(key, &row.namespace, &row.rel_name).to_string(),
                field.content.clone(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Field;

    #[test]
    fn test_flatten_strips_prefix() {
        let row = ChangeRow::new("public", "orders")
            .with_column("id", 42.0)
            .with_column("title", "book")
            .with_column("paid", true)
            .with_column("note", FieldValue::Null);

        let doc = flatten(&row);

        assert_eq!(doc.len(), 4);
        assert_eq!(doc["id"], FieldValue::Number(42.0));
        assert_eq!(doc["title"], FieldValue::Text("book".to_string()));
        assert_eq!(doc["paid"], FieldValue::Bool(true));
        assert!(doc["note"].is_null());
    }

    /// Feed a flattened document back in as the fields of the same relation.
    fn refeed(row: &ChangeRow, doc: &Document) -> ChangeRow {
        let mut again = ChangeRow::new(row.namespace.clone(), row.rel_name.clone());
        again.fields = doc
            .iter()
            .map(|(k, v)| (k.clone(), Field::new(v.clone())))
            .collect();
        again
    }

    #[test]
    fn test_flatten_is_idempotent_with_dotted_columns() {
        let row = ChangeRow::new("public", "orders")
            .with_column("id", 1.0)
            .with_column("a.b", "one dot")
            .with_column("a.b.c", "two dots");

        let once = flatten(&row);
        let twice = flatten(&refeed(&row, &once));

        assert_eq!(once, twice);
        assert_eq!(once["a.b"], FieldValue::Text("one dot".to_string()));
        assert_eq!(once["a.b.c"], FieldValue::Text("two dots".to_string()));
    }

    #[test]
    fn test_foreign_prefix_is_kept() {
        let mut row = ChangeRow::new("public", "orders").with_column("id", 1.0);
        row.fields
            .insert("sales.orders.total".to_string(), Field::new(3.5));

        let doc = flatten(&row);

        assert!(doc.contains_key("id"));
        assert!(doc.contains_key("sales.orders.total"));
    }

    #[test]
    fn test_flatten_empty() {
        assert!(flatten(&ChangeRow::new("public", "orders")).is_empty());
    }

    #[test]
    fn test_unqualified_name() {
        assert_eq!(unqualified_name("public.orders.id", "public", "orders"), "id");
        assert_eq!(unqualified_name("public.orders.a.b.c", "public", "orders"), "a.b.c");
        assert_eq!(unqualified_name("id", "public", "orders"), "id");
        assert_eq!(unqualified_name("public.ordersx.id", "public", "orders"), "public.ordersx.id");
        assert_eq!(unqualified_name("public.orders.", "public", "orders"), "public.orders.");
    }
}
