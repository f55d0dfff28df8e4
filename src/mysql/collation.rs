//! Collation catalog.
//!
//! Maps a collation name to its character set and the maximum bytes per
//! character. String columns need the maxlen to size their length prefix
//! (a `VARCHAR(100)` under utf8mb4 spans up to 400 bytes, so its rows carry
//! a 2-byte length), and callers need the charset to interpret the raw
//! bytes the decoder hands them.
//!
//! The catalog is built once per connect from `SHOW CHARACTER SET` and
//! `SHOW COLLATION` and is immutable afterwards.

use std::collections::HashMap;

use crate::common::{RelayError, Result};

/// A collation: name, character set, and maximum bytes per character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationInfo {
    pub name: String,
    pub charset: String,
    pub maxlen: u32,
}

/// Catalog of collations known to the primary.
#[derive(Debug, Default)]
pub struct CollationCatalog {
    map: HashMap<String, CollationInfo>,
}

impl CollationCatalog {
    /// Build the catalog from `SHOW CHARACTER SET` rows (`charset, maxlen`)
    /// and `SHOW COLLATION` rows (`collation, charset`).
    ///
    /// A collation referencing a charset absent from the charset rows is a
    /// fatal inconsistency.
    pub fn from_rows(
        charsets: Vec<(String, u32)>,
        collations: Vec<(String, String)>,
    ) -> Result<Self> {
        let charset_maxlen: HashMap<String, u32> = charsets.into_iter().collect();

        let mut map = HashMap::with_capacity(collations.len());
        for (name, charset) in collations {
            let maxlen = *charset_maxlen.get(&charset).ok_or_else(|| {
                RelayError::schema(format!(
                    "SHOW COLLATION returned charset not in SHOW CHARACTER SET \
                     (collation '{}', charset '{}')",
                    name, charset
                ))
            })?;
            map.insert(
                name.clone(),
                CollationInfo {
                    name,
                    charset,
                    maxlen,
                },
            );
        }

        Ok(Self { map })
    }

    pub fn get(&self, name: &str) -> Option<&CollationInfo> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
