//! Parameter plumbing shared by the server and the generated dispatch code.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::Error;

/// Whether the first non-whitespace byte of a message opens a JSON array,
/// i.e. the message is a batch.
pub fn is_array(message: &[u8]) -> bool {
    message
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[')
}

/// Convert a positional params array into a named object by zipping the
/// values against the method's JSON names in declaration order.
///
/// More values than names is InvalidParams; fewer is fine (trailing optional
/// arguments stay absent).
pub fn to_named(names: &[&str], values: Vec<Value>) -> Result<Value, Error> {
    if values.len() > names.len() {
        return Err(Error::invalid_params(format!(
            "invalid params number, expected {}, got {}",
            names.len(),
            values.len()
        )));
    }

    let mut object = Map::with_capacity(values.len());
    for (name, value) in names.iter().zip(values) {
        object.insert((*name).to_string(), value);
    }

    Ok(Value::Object(object))
}

/// Decode params into a generated args record. Absent or `null` params decode
/// as an empty object so that all-optional methods work without any params
/// member; any serde failure is surfaced as InvalidParams with the decoder's
/// message in `data`.
pub fn decode<T: DeserializeOwned>(params: Option<Value>) -> Result<T, Error> {
    let params = match params {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(params) => params,
    };

    serde_json::from_value(params).map_err(|err| Error::invalid_params(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn array_detection_skips_whitespace() {
        assert!(is_array(b" \t\n[{}]"));
        assert!(!is_array(b" {\"jsonrpc\": \"2.0\"}"));
        assert!(!is_array(b""));
    }

    #[test]
    fn zips_names_in_order() {
        let object = to_named(&["a", "b"], vec![json!(1), json!(24)]).unwrap();
        assert_eq!(object, json!({"a": 1, "b": 24}));
    }

    #[test]
    fn shorter_arrays_leave_trailing_names_absent() {
        let object = to_named(&["base", "exp"], vec![json!(3)]).unwrap();
        assert_eq!(object, json!({"base": 3}));
    }

    #[test]
    fn longer_arrays_are_invalid_params() {
        let err = to_named(&["a"], vec![json!(1), json!(2)]).unwrap_err();
        assert_eq!(err.code, crate::error::codes::INVALID_PARAMS);
        assert_eq!(err.data, Some(json!("invalid params number, expected 1, got 2")));
    }

    #[derive(Debug, Deserialize)]
    struct Args {
        base: f64,
        exp: Option<f64>,
    }

    #[test]
    fn decode_reports_type_mismatches() {
        let err = decode::<Args>(Some(json!({"base": "3"}))).unwrap_err();
        assert_eq!(err.message, "Invalid params");
        assert!(err.data.unwrap().as_str().unwrap().contains("base"));
    }

    #[test]
    fn decode_absent_params_as_empty_object() {
        assert!(decode::<Args>(None).is_err()); // base is required
        let args: Args = decode(Some(json!({"base": 3}))).unwrap();
        assert_eq!(args.base, 3.0);
        assert!(args.exp.is_none());
    }
}
