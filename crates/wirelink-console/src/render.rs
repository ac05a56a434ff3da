//! Plain-text rendering of encoded values.

use wirelink_codec::{EncodedValue, Marker};

/// Render an encoded value for a text console.
#[must_use]
pub fn render(value: &EncodedValue) -> String {
    match value {
        EncodedValue::Null => "null".to_owned(),
        EncodedValue::Bool(b) => b.to_string(),
        EncodedValue::Number(n) => render_number(*n),
        EncodedValue::String(s) => format!("\"{s}\""),
        EncodedValue::Marker(marker) => render_marker(marker),
        EncodedValue::Array(items) => {
            let inner: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", inner.join(", "))
        }
        EncodedValue::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(key, member)| format!("{key}: {}", render(member)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn render_marker(marker: &Marker) -> String {
    match marker {
        Marker::ObjectStub { name } | Marker::Function { name } => name.clone(),
        Marker::Undefined => "undefined".to_owned(),
        Marker::Error { message } => format!("Error thrown on remote: {message}"),
        Marker::TruncatedString { intro } => format!("\"{intro}...\""),
    }
}

fn render_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
