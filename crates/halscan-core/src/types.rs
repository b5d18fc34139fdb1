//! Core type definitions

use serde::{Deserialize, Serialize};

/// Where a declaration lives relative to the translation unit being compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The primary source file of the TU
    MainFile,
    /// A header that belongs to the project (not the main file, not a system header)
    LocalHeader,
    /// A system or otherwise external header
    SystemHeader,
}

/// Success-cache entry: the value a function returns on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessValueRecord {
    /// Function name
    #[serde(rename = "func")]
    pub function: String,
    /// Integer value of the success enumerator
    #[serde(rename = "succ_val")]
    pub value: i64,
}

impl SuccessValueRecord {
    pub fn new(function: impl Into<String>, value: i64) -> Self {
        Self {
            function: function.into(),
            value,
        }
    }
}

/// API-cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRecord {
    #[serde(rename = "api")]
    pub name: String,
}

impl ApiRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The four persistent caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKind {
    SuccessValue,
    Api,
    Loop,
    StructName,
}

impl CacheKind {
    /// All caches in merge order
    pub const ALL: [CacheKind; 4] = [
        CacheKind::SuccessValue,
        CacheKind::Api,
        CacheKind::Loop,
        CacheKind::StructName,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::SuccessValue => "succ-ret",
            CacheKind::Api => "api",
            CacheKind::Loop => "loops",
            CacheKind::StructName => "periph-struct",
        }
    }
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CacheKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        CacheKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::Error::Config(format!("unknown cache kind: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_record_field_names() {
        let yaml = serde_yaml::to_string(&vec![SuccessValueRecord::new("HAL_Init", 0)]).unwrap();
        assert!(yaml.contains("func: HAL_Init"));
        assert!(yaml.contains("succ_val: 0"));
    }

    #[test]
    fn test_api_record_reads_llvm_yaml() {
        let text = "---\n- api:             HAL_UART_Init\n- api:             HAL_UART_DeInit\n...\n";
        let records: Vec<ApiRecord> = serde_yaml::from_str(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "HAL_UART_DeInit");
    }

    #[test]
    fn test_cache_kind_round_trip_names() {
        for kind in CacheKind::ALL {
            assert_eq!(kind.as_str().parse::<CacheKind>().unwrap(), kind);
        }
        assert!("bogus".parse::<CacheKind>().is_err());
    }
}
