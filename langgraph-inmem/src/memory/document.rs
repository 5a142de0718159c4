//! Stored document type.
//!
//! Values and checkpoint blobs are `serde_json::Value`: a tagged union of
//! null | bool | number | string | array of documents | object of string → document.

/// Structured, serializable document stored by the store and the saver.
pub type Document = serde_json::Value;

/// Size in bytes of the compact JSON encoding of `doc`.
pub fn encoded_len(doc: &Document) -> usize {
    serde_json::to_vec(doc).map(|v| v.len()).unwrap_or(0)
}

/// Deep equality with numeric comparison by value, so `1` and `1.0` are equal.
pub fn deep_eq(a: &Document, b: &Document) -> bool {
    use serde_json::Value;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (int_of(x), int_of(y)) {
            (Some(x), Some(y)) => x == y,
            (Some(i), None) => y.as_f64().map_or(false, |f| int_eq_float(i, f)),
            (None, Some(i)) => x.as_f64().map_or(false, |f| int_eq_float(i, f)),
            (None, None) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| deep_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).map_or(false, |w| deep_eq(v, w)))
        }
        _ => a == b,
    }
}

fn int_of(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Exact: integers above 2^53 are not widened to `f64` first.
fn int_eq_float(i: i128, f: f64) -> bool {
    f.fract() == 0.0 && f >= i128::MIN as f64 && f < i128::MAX as f64 && f as i128 == i
}
