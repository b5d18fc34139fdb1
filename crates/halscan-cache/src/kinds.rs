//! The four caches and how each folds persisted records into a TU's facts

use halscan_core::{ApiRecord, CacheKind, LoopSpan, SuccessValueRecord, TuFacts};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Shape and merge rule of one persistent cache
pub trait CacheSpec {
    const KIND: CacheKind;

    /// Element of the persisted YAML sequence
    type Record: Serialize + DeserializeOwned;

    /// Fold previously persisted records into this TU's facts
    fn fold(facts: &mut TuFacts, loaded: Vec<Self::Record>);

    /// Records to persist after folding
    fn records(facts: &TuFacts) -> Vec<Self::Record>;
}

/// `func` / `succ_val` records
pub struct SuccessCache;

impl CacheSpec for SuccessCache {
    const KIND: CacheKind = CacheKind::SuccessValue;
    type Record = SuccessValueRecord;

    // Persisted records were written first, so they win over anything this
    // TU inferred for the same name.
    fn fold(facts: &mut TuFacts, loaded: Vec<SuccessValueRecord>) {
        for record in loaded {
            facts.success.insert(record.function, record.value);
        }
    }

    fn records(facts: &TuFacts) -> Vec<SuccessValueRecord> {
        facts
            .success
            .iter()
            .map(|(name, value)| SuccessValueRecord::new(name.clone(), *value))
            .collect()
    }
}

/// `api` records
pub struct ApiCache;

impl CacheSpec for ApiCache {
    const KIND: CacheKind = CacheKind::Api;
    type Record = ApiRecord;

    fn fold(facts: &mut TuFacts, loaded: Vec<ApiRecord>) {
        for record in loaded {
            facts.declared.insert(record.name.clone());
            facts.defined.insert(record.name);
        }
    }

    fn records(facts: &TuFacts) -> Vec<ApiRecord> {
        facts.api_names().map(|name| ApiRecord::new(name.clone())).collect()
    }
}

/// Loop header spans
pub struct LoopCache;

impl CacheSpec for LoopCache {
    const KIND: CacheKind = CacheKind::Loop;
    type Record = LoopSpan;

    fn fold(facts: &mut TuFacts, loaded: Vec<LoopSpan>) {
        facts.loops.extend(loaded);
    }

    fn records(facts: &TuFacts) -> Vec<LoopSpan> {
        facts.loops.iter().cloned().collect()
    }
}

/// Bare sequence of peripheral struct names
pub struct StructNameCache;

impl CacheSpec for StructNameCache {
    const KIND: CacheKind = CacheKind::StructName;
    type Record = String;

    fn fold(facts: &mut TuFacts, loaded: Vec<String>) {
        facts.struct_names.extend(loaded);
    }

    fn records(facts: &TuFacts) -> Vec<String> {
        facts.struct_names.iter().cloned().collect()
    }
}
