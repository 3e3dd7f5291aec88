//! Dot-and-bracket path lookup into JSON documents (`a.b[0].c`).

use serde_json::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Resolve `path` against `root`.
///
/// Segments are separated by `.`; `[n]` indexes into arrays. A purely
/// numeric dotted segment also indexes arrays (`items.0.name`). Returns
/// `None` as soon as a segment does not resolve. An empty path yields
/// the root itself.
pub fn resolve<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = root;
    for segment in parse(path)? {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?)?,
            (Segment::Index(i), Value::Array(items)) => items.get(i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve `path` and render the value as a form-field string.
///
/// Strings are returned verbatim, numbers and booleans via their JSON
/// text, arrays and objects as compact JSON. `null` and missing values
/// yield `None`.
pub fn resolve_string(root: &Value, path: &str) -> Option<String> {
    resolve(root, path).and_then(value_to_field_string)
}

/// Render a JSON value the way a form field would hold it.
pub fn value_to_field_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn parse(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let (head, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !head.is_empty() {
            segments.push(Segment::Key(head));
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped.find(']')?;
            let index = stripped[..close].trim().parse::<usize>().ok()?;
            segments.push(Segment::Index(index));
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_keys() {
        let doc = json!({"data": {"auth": {"access_token": "abc"}}});
        assert_eq!(
            resolve(&doc, "data.auth.access_token"),
            Some(&json!("abc"))
        );
    }

    #[test]
    fn resolves_bracket_indexes() {
        let doc = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
        assert_eq!(resolve(&doc, "a.b[1].c"), Some(&json!(2)));
    }

    #[test]
    fn resolves_numeric_dotted_segment() {
        let doc = json!({"items": ["x", "y"]});
        assert_eq!(resolve(&doc, "items.1"), Some(&json!("y")));
    }

    #[test]
    fn resolves_consecutive_brackets() {
        let doc = json!({"grid": [[1, 2], [3, 4]]});
        assert_eq!(resolve(&doc, "grid[1][0]"), Some(&json!(3)));
    }

    #[test]
    fn missing_segment_is_none() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(resolve(&doc, "a.c"), None);
        assert_eq!(resolve(&doc, "a.b.c"), None);
    }

    #[test]
    fn malformed_bracket_is_none() {
        let doc = json!({"a": [1]});
        assert_eq!(resolve(&doc, "a[x]"), None);
        assert_eq!(resolve(&doc, "a[0"), None);
    }

    #[test]
    fn single_key_path() {
        let doc = json!({"token": "t"});
        assert_eq!(resolve_string(&doc, "token").as_deref(), Some("t"));
    }

    #[test]
    fn field_strings_from_scalars() {
        let doc = json!({"n": 42, "b": true, "z": null});
        assert_eq!(resolve_string(&doc, "n").as_deref(), Some("42"));
        assert_eq!(resolve_string(&doc, "b").as_deref(), Some("true"));
        assert_eq!(resolve_string(&doc, "z"), None);
    }
}
