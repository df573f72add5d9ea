//! CSV export of admin list views.

use serde_json::Value;

use super::{Record, ViewConfig};

fn escape(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Flattens a raw column value into a single cell. Lists are joined with
/// `", "`.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| cell(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

/// Renders `records` as CSV with a header row of column labels.
pub fn to_csv(config: &ViewConfig, records: &[Record]) -> String {
    let mut out = String::new();
    let header: Vec<String> = config
        .column_list
        .iter()
        .map(|c| escape(&config.label(c)))
        .collect();
    out.push_str(&header.join(","));
    out.push_str("\r\n");

    for record in records {
        let row: Vec<String> = config
            .column_list
            .iter()
            .map(|c| escape(&cell(record.values.get(*c))))
            .collect();
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;
    use crate::admin::views::ORDER_VIEW;

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_orders_csv() {
        let mut values = Map::new();
        values.insert("id".into(), json!(1));
        values.insert("user".into(), json!("someone@example.com"));
        values.insert("products".into(), json!(["Hat", "Boots"]));
        values.insert("total_cost".into(), json!(300));
        values.insert("paid".into(), json!(false));
        let records = vec![Record { id: 1, values }];

        let csv = to_csv(&ORDER_VIEW, &records);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ID,User,Products,Total Cost (Satoshi),Payment Status")
        );
        assert_eq!(
            lines.next(),
            Some("1,someone@example.com,\"Hat, Boots\",300,false")
        );
        assert_eq!(lines.next(), None);
    }
}
