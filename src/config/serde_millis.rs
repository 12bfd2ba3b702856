//! Serialize `Duration` values as integer milliseconds.
//!
//! Config files are hand-edited; `"failover_delay": 2000` reads better than
//! serde's default `{ "secs": 2, "nanos": 0 }`.

use serde::{Deserialize, Deserializer, Serializer};
use std::collections::HashMap;
use std::time::Duration;

pub mod duration {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

pub mod duration_map {
    use super::*;
    use serde::ser::SerializeMap;

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, Duration>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = s.serialize_map(Some(map.len()))?;
        for (k, v) in map {
            out.serialize_entry(k, &(v.as_millis() as u64))?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<HashMap<String, Duration>, D::Error> {
        let raw = HashMap::<String, u64>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| (k, Duration::from_millis(v)))
            .collect())
    }
}
