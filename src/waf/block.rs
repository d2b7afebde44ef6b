//! Optional single blocks serialized as zero-or-one element sequences.
//!
//! Configuration documents model "optional nested block" as a list holding at
//! most one element, so an absent block is `[]` rather than `null`. Use with
//! `#[serde(default, with = "block")]` on `Option<T>` fields.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    serializer.collect_seq(value.iter())
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    let items: Vec<T> = Vec::deserialize(deserializer)?;
    match items.len() {
        0 | 1 => Ok(items.into_iter().next()),
        n => Err(D::Error::invalid_length(n, &"at most one block")),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(default, with = "super")]
        inner: Option<u32>,
    }

    #[test]
    fn test_absent_block_is_empty_sequence() {
        let json = serde_json::to_value(Holder { inner: None }).unwrap();
        assert_eq!(json, serde_json::json!({ "inner": [] }));
    }

    #[test]
    fn test_present_block_is_single_element() {
        let json = serde_json::to_value(Holder { inner: Some(7) }).unwrap();
        assert_eq!(json, serde_json::json!({ "inner": [7] }));

        let back: Holder = serde_json::from_value(json).unwrap();
        assert_eq!(back.inner, Some(7));
    }

    #[test]
    fn test_missing_field_defaults_to_none() {
        let back: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(back.inner, None);
    }

    #[test]
    fn test_two_blocks_rejected() {
        let result: Result<Holder, _> = serde_json::from_str(r#"{"inner": [1, 2]}"#);
        assert!(result.is_err());
    }
}
