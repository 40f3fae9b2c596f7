use serde_json::Value;

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Make serialized JSON safe to embed inside a `<script>` element
pub fn escape_script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Render a feature property for display in a tooltip cell.
///
/// Missing and null values render as an empty string. Numbers are rounded
/// when `precision` is given, otherwise printed in shortest round-trip form.
pub fn display_value(value: Option<&Value>, precision: Option<usize>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match (n.as_f64(), precision) {
            (Some(f), Some(p)) if !n.is_i64() && !n.is_u64() => format!("{:.*}", p, f),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}
