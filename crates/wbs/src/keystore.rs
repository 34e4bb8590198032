//! Keystore key-list handling.

use serde_json::Value;

use crate::{Error, Result};

/// Removes all whitespace so `"a, b"` addresses the same keys as `"a,b"`.
pub fn normalize_key_list(key_list: &str) -> String {
    key_list.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Fails with the first requested key, in request order, that the answer lacks.
pub fn ensure_keys_present(keys: &str, answer: &Value) -> Result<()> {
    for key in keys.split(',') {
        let present = answer
            .as_object()
            .map(|fields| fields.contains_key(key))
            .unwrap_or(false);
        if !present {
            return Err(Error::KeyNotFound(key.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_strips_spaces_and_tabs() {
        assert_eq!(normalize_key_list("a, b"), "a,b");
        assert_eq!(normalize_key_list(" db_host ,\tdb_user "), "db_host,db_user");
    }

    #[test]
    fn test_all_keys_present() {
        let answer = json!({"a": 1, "b": 2});
        assert!(ensure_keys_present("a,b", &answer).is_ok());
        assert!(ensure_keys_present("b", &answer).is_ok());
    }

    #[test]
    fn test_first_missing_key_is_reported() {
        let answer = json!({"a": 1, "b": 2});
        let err = ensure_keys_present("a,c,d", &answer).unwrap_err();
        assert_eq!(err.to_string(), "c not found");
        assert_eq!(err.status_code(), 605);
    }

    #[test]
    fn test_non_object_answer_has_no_keys() {
        let err = ensure_keys_present("a", &json!(["a"])).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(ref k) if k == "a"));
    }
}
