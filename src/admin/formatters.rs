//! Column formatters for the admin list pages.

use serde_json::Value;

/// Formats a column value for display. Receives the raw JSON value.
pub type Formatter = fn(&Value) -> String;

/// `PAID`/`UNPAID` badge for an order's payment flag.
pub fn payment_status_formatter(value: &Value) -> String {
    let (class, text) = if value.as_bool().unwrap_or(false) {
        ("label-success", "PAID")
    } else {
        ("label-danger", "UNPAID")
    };
    format!(r#"<span class="label {class}">{text}</span>"#)
}

/// Thumbnail of the product image, or a placeholder text.
pub fn product_image_formatter(value: &Value) -> String {
    match value.as_str() {
        Some(image) if !image.is_empty() => {
            format!(r#"<img src="/static/images/{}">"#, urlencoding::encode(image))
        }
        _ => "No Image Available".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_status() {
        assert_eq!(
            payment_status_formatter(&json!(true)),
            r#"<span class="label label-success">PAID</span>"#
        );
        assert!(payment_status_formatter(&json!(false)).contains("UNPAID"));
        assert!(payment_status_formatter(&Value::Null).contains("label-danger"));
    }

    #[test]
    fn test_product_image() {
        assert_eq!(product_image_formatter(&Value::Null), "No Image Available");
        assert_eq!(product_image_formatter(&json!("")), "No Image Available");
        assert_eq!(
            product_image_formatter(&json!("3f2a.png")),
            r#"<img src="/static/images/3f2a.png">"#
        );
    }
}
