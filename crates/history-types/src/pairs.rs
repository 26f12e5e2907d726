//! Serde helper that writes a `BTreeMap` as an ordered list of `[key, value]` pairs.
//!
//! JSON objects only allow string keys and say nothing about ordering, so every
//! map in a persisted document goes through this module instead.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    V: Serialize,
    S: Serializer,
{
    serializer.collect_seq(map.iter())
}

pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
    let expected = pairs.len();
    let map: BTreeMap<K, V> = pairs.into_iter().collect();
    if map.len() != expected {
        return Err(D::Error::custom(format!(
            "duplicate keys in pair list ({} pairs, {} unique)",
            expected,
            map.len()
        )));
    }
    Ok(map)
}

/// Same as the parent module, for `Option<BTreeMap<..>>` fields.
pub mod option {
    use super::*;

    pub fn serialize<K, V, S>(map: &Option<BTreeMap<K, V>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        match map {
            Some(map) => serializer.serialize_some(&PairList(map)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<Option<BTreeMap<K, V>>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs: Option<Vec<(K, V)>> = Option::deserialize(deserializer)?;
        Ok(pairs.map(|pairs| pairs.into_iter().collect()))
    }

    struct PairList<'a, K, V>(&'a BTreeMap<K, V>);

    impl<K: Serialize, V: Serialize> Serialize for PairList<'_, K, V> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.0.iter())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::pairs")]
        map: BTreeMap<u32, String>,
    }

    #[test]
    fn map_is_written_as_pair_list() {
        let mut map = BTreeMap::new();
        map.insert(2, "b".to_string());
        map.insert(1, "a".to_string());
        let json = serde_json::to_string(&Holder { map }).unwrap();
        assert_eq!(json, r#"{"map":[[1,"a"],[2,"b"]]}"#);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result: Result<Holder, _> = serde_json::from_str(r#"{"map":[[1,"a"],[1,"b"]]}"#);
        assert!(result.is_err());
    }
}
