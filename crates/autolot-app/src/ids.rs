// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(ListingId);

impl ListingId {
    /// Millisecond timestamp id, bumped past any value `taken` reports.
    pub fn fresh(now_millis: i128, taken: impl Fn(&ListingId) -> bool) -> Self {
        let mut candidate = now_millis.max(0);
        loop {
            let id = Self(candidate.to_string());
            if !taken(&id) {
                return id;
            }
            candidate += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ListingId;

    #[test]
    fn fresh_skips_taken_values() {
        let taken = [ListingId::from("100"), ListingId::from("101")];
        let id = ListingId::fresh(100, |candidate| taken.contains(candidate));
        assert_eq!(id.as_str(), "102");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let encoded = serde_json::to_string(&ListingId::from("7")).expect("encode id");
        assert_eq!(encoded, "\"7\"");
    }
}
