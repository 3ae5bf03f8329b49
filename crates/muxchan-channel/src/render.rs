use std::collections::BTreeMap;
use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use crate::channel::Options;
use crate::error::Result;

/// Compact JSON with a space after `:` and `,`, e.g. `{"key": "value"}`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Render an options payload for display.
///
/// Top-level keys come out in sorted order, so equal options always render
/// identically.
pub fn render_options(options: &Options) -> Result<String> {
    let sorted: BTreeMap<&str, &serde_json::Value> =
        options.iter().map(|(key, value)| (key.as_str(), value)).collect();
    let mut out = Vec::with_capacity(64);
    let mut ser = Serializer::with_formatter(&mut out, SpacedFormatter);
    sorted.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn options(value: serde_json::Value) -> Options {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn renders_single_pair_with_spaces() {
        let rendered = render_options(&options(json!({"key": "value"}))).unwrap();
        assert_eq!(rendered, r#"{"key": "value"}"#);
    }

    #[test]
    fn renders_empty_object() {
        assert_eq!(render_options(&Options::new()).unwrap(), "{}");
    }

    #[test]
    fn renders_nested_values_in_key_order() {
        let rendered = render_options(&options(json!({
            "zeta": [1, 2, 3],
            "alpha": {"inner": true, "n": null},
        })))
        .unwrap();
        assert_eq!(
            rendered,
            r#"{"alpha": {"inner": true, "n": null}, "zeta": [1, 2, 3]}"#
        );
    }

    #[test]
    fn escapes_strings() {
        let rendered = render_options(&options(json!({"path": "a\"b\n"}))).unwrap();
        assert_eq!(rendered, r#"{"path": "a\"b\n"}"#);
    }
}
