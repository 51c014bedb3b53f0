//! The consensus-layer REST dialect renders every integer as a
//! JSON string (`"123"` rather than `123`), to dodge JS's 53-bit integer
//! ceiling. These small `serde_with`-style modules bridge that back to
//! native Rust integer/`Slot` types, the same pattern `eth2_serde_utils`
//! provides elsewhere in the consensus-client ecosystem.

pub mod quoted_u64 {
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map_err(D::Error::custom)
    }
}

pub mod quoted_u64_vec {
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .into_iter()
            .map(|s| s.parse::<u64>().map_err(D::Error::custom))
            .collect()
    }
}

pub mod quoted_slot {
    use crate::types::Slot;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Slot, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map(Slot::new).map_err(D::Error::custom)
    }
}
