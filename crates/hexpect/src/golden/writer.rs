//! Canonical golden file output.

use super::{GoldenBody, GoldenDocument};
use std::fmt;

pub(super) fn write_document(f: &mut fmt::Formatter<'_>, doc: &GoldenDocument) -> fmt::Result {
    writeln!(f, "{}", doc.status)?;

    if let Some(headers) = &doc.headers {
        writeln!(f, "--- headers{}", if doc.headers_exact { " exact" } else { "" })?;
        for (name, values) in headers.iter() {
            for value in values {
                writeln!(f, "{name}: {value}")?;
            }
        }
    }

    match &doc.body {
        Some(GoldenBody::Text(text)) => {
            writeln!(f, "--- body")?;
            if !text.is_empty() {
                writeln!(f, "{text}")?;
            }
        }
        Some(GoldenBody::Json(value)) => {
            writeln!(f, "--- body json{}", if doc.body_exact { " exact" } else { "" })?;
            let pretty = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
            writeln!(f, "{pretty}")?;
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_only() {
        assert_eq!(GoldenDocument::new(204).to_string(), "204\n");
    }

    #[test]
    fn test_canonical_layout() {
        let doc = GoldenDocument {
            status: 200,
            headers: Some([("Content-Type", "application/json"), ("X-Tag", "a"), ("x-tag", "b")].into_iter().collect()),
            headers_exact: true,
            body: Some(GoldenBody::Json(json!({"id": 1, "tags": ["a"]}))),
            body_exact: false,
        };
        let expected = "200\n\
            --- headers exact\n\
            Content-Type: application/json\n\
            X-Tag: a\n\
            X-Tag: b\n\
            --- body json\n\
            {\n  \"id\": 1,\n  \"tags\": [\n    \"a\"\n  ]\n}\n";
        assert_eq!(doc.to_string(), expected);
    }

    #[test]
    fn test_text_body() {
        let mut doc = GoldenDocument::new(500);
        doc.body = Some(GoldenBody::Text("internal\n\nerror".into()));
        assert_eq!(doc.to_string(), "500\n--- body\ninternal\n\nerror\n");
        assert_eq!(parse(&doc.to_string()).unwrap(), doc);
    }

    #[test]
    fn test_exact_json_body_round_trip() {
        let mut doc = GoldenDocument::new(200);
        doc.body = Some(GoldenBody::Json(json!([{"a": null}, 1.5, "x"])));
        doc.body_exact = true;
        let text = doc.to_string();
        assert!(text.contains("--- body json exact\n"));
        assert_eq!(parse(&text).unwrap(), doc);
    }
}
