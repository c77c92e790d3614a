//! Canonical JSON utilities (ea_io)
//! - Objects: keys sorted lexicographically (UTF-8 byte order)
//! - Arrays: order preserved (callers already emit rankings and seats in stable order)
//! - Output: compact, no trailing newline

use serde::Serialize;
use serde_json::Value;

use crate::IoResult;

/// Serialize any value to canonical JSON bytes.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> IoResult<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    to_canonical_json_bytes(&v)
}

/// Canonical bytes of an already-built `Value`.
pub fn to_canonical_json_bytes(v: &Value) -> IoResult<Vec<u8>> {
    let mut out = Vec::with_capacity(1024);
    write_canonical_value(v, &mut out)?;
    Ok(out)
}

fn write_canonical_value(v: &Value, out: &mut Vec<u8>) -> IoResult<()> {
    match v {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => serde_json::to_writer(&mut *out, s)?,
        Value::Array(arr) => {
            out.push(b'[');
            for (i, elem) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical_value(elem, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            for (i, (k, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, k)?;
                out.push(b':');
                write_canonical_value(val, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use ea_core::entities::PartyVotes;
    use ea_core::tokens::UnitId;
    use serde_json::json;

    #[test]
    fn objects_are_sorted_arrays_preserved() {
        let v = json!({
            "b": 1,
            "a": { "y": 1, "x": 2 },
            "arr": [ {"k":2,"j":1}, 3, "z" ]
        });
        let s = String::from_utf8(to_canonical_json_bytes(&v).unwrap()).unwrap();
        assert_eq!(s, r#"{"a":{"x":2,"y":1},"arr":[{"j":1,"k":2},3,"z"],"b":1}"#);
        assert!(!s.ends_with('\n'));
    }

    #[test]
    fn strings_are_escaped() {
        let v = json!({"name": "Lista \"Azul\"\n"});
        let s = String::from_utf8(to_canonical_json_bytes(&v).unwrap()).unwrap();
        assert_eq!(s, r#"{"name":"Lista \"Azul\"\n"}"#);
    }

    #[test]
    fn typed_values_use_their_wire_names() {
        let p = PartyVotes::new(UnitId::new("Partido Azul").unwrap(), 1200);
        let s = String::from_utf8(to_canonical_bytes(&p).unwrap()).unwrap();
        assert_eq!(s, r#"{"party":"Partido Azul","votes":1200}"#);
    }

    #[test]
    fn canonical_bytes_parse_back_to_same_value() {
        let v = json!({"z": [1, 2.5, -3], "a": null, "m": {"ñ": "Lista Ñ", "b": true}});
        let bytes = to_canonical_json_bytes(&v).unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_json_eq!(back, v);
        // Re-canonicalising is a fixed point.
        assert_eq!(to_canonical_json_bytes(&back).unwrap(), bytes);
    }
}
