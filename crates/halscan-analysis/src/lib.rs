//! halscan Analysis Engine
//!
//! Extracts HAL facts from one translation unit and merges them into the
//! build-wide caches:
//! - Enumerator registry
//! - Success return value inference and API classification
//! - Loop header spans
//! - Peripheral struct names from address-cast macros

pub mod enum_registry;
pub mod loops;
pub mod periph;
pub mod success;

pub use enum_registry::EnumRegistry;
pub use loops::LoopSpanCollector;
pub use periph::PeriphStructNameExtractor;
pub use success::SuccessValueInferencer;

use halscan_cache::{CacheError, CacheStore, MergeReport, SuccessCache};
use halscan_core::{CacheKind, Config, Result, TuFacts};
use halscan_frontend::{MacroExpansion, SourceResolver, TranslationUnit, TuDump};
use tracing::{debug, info};

/// Outcome of one TU
#[derive(Debug)]
pub struct TuReport {
    /// Facts after merging with the caches
    pub facts: TuFacts,
    /// Per-cache merge results, in cache order
    pub merges: Vec<(CacheKind, std::result::Result<MergeReport, CacheError>)>,
}

impl TuReport {
    /// Caches whose update was skipped
    pub fn failed(&self) -> impl Iterator<Item = CacheKind> + '_ {
        self.merges
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(kind, _)| *kind)
    }
}

/// Per-TU analyzer
///
/// Feed macro expansions while preprocessing runs, call [`Analyzer::analyze`]
/// once the tree is complete, and [`Analyzer::finish`] to merge.
pub struct Analyzer {
    config: Config,
    store: CacheStore,
    facts: TuFacts,
    loops: LoopSpanCollector,
    periph: PeriphStructNameExtractor,
}

impl Analyzer {
    /// Create an analyzer; fails when an output path is missing
    pub fn new(config: Config) -> Result<Self> {
        let store = CacheStore::new(config.outputs.clone(), config.lock.clone())?;
        Ok(Self {
            config,
            store,
            facts: TuFacts::new(),
            loops: LoopSpanCollector::new(),
            periph: PeriphStructNameExtractor::new(),
        })
    }

    pub fn facts(&self) -> &TuFacts {
        &self.facts
    }

    /// Macro expansion callback
    pub fn macro_expands(&mut self, expansion: &MacroExpansion) {
        self.periph.macro_expands(expansion);
    }

    /// Analyze the syntax tree of the TU
    pub fn analyze(&mut self, unit: &TranslationUnit) {
        if self.config.analysis.prime_success_cache {
            self.prime();
        }

        let registry = EnumRegistry::from_unit(unit);
        SuccessValueInferencer::new(&registry, &self.config.analysis).run(unit, &mut self.facts);
        self.loops.collect(unit);

        debug!(
            "Analyzed {}: {} success values, {} declared, {} defined, {} loops",
            unit.main_file,
            self.facts.success.len(),
            self.facts.declared.len(),
            self.facts.defined.len(),
            self.loops.ranges().len()
        );
    }

    /// Resolve loop spans and merge everything into the caches
    pub fn finish<R: SourceResolver>(mut self, resolver: &R) -> TuReport {
        self.facts.loops.extend(self.loops.resolve(resolver));
        self.facts.struct_names.extend(self.periph.into_names());

        let merges = self.store.merge_all(&mut self.facts);
        TuReport {
            facts: self.facts,
            merges,
        }
    }

    /// Load known success values so their functions are not analyzed again.
    ///
    /// Best effort and unlocked; the merge still decides what is persisted.
    fn prime(&mut self) {
        match self.store.peek::<SuccessCache>() {
            Ok(records) => {
                let count = records.len();
                for record in records {
                    self.facts.record_success(&record.function, record.value);
                }
                debug!("Primed {} known success values", count);
            }
            Err(err) => debug!("Cannot prime success values: {}", err),
        }
    }
}

/// Run a whole TU from a frontend dump
pub fn run_dump(config: Config, dump: &TuDump) -> Result<TuReport> {
    let mut analyzer = Analyzer::new(config)?;
    for expansion in &dump.macros {
        analyzer.macro_expands(expansion);
    }
    analyzer.analyze(&dump.unit);
    let report = analyzer.finish(&dump.locations);
    info!(
        "{}: {} success values, {} API names, {} loops, {} peripheral structs",
        dump.unit.main_file,
        report.facts.success.len(),
        report.facts.api_names().count(),
        report.facts.loops.len(),
        report.facts.struct_names.len()
    );
    Ok(report)
}
