//! the query path : from a sketch file to a ranked, filtered result set.
//!
//! One search resolves its namespaces, checks they are mutually compatible,
//! wires one filter chain per namespace into a shared collector, then drains
//! the comparator on a producer thread while the query thread pushes records
//! through the chains. The comparator is the dominant blocking point so it
//! runs under a deadline, and the caller can cancel at any time. Chains and
//! collector belong to one query and are never shared across queries.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use cpu_time::ProcessTime;
use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::comparator::SketchComparator;
use crate::error::HomError;
use crate::namespace::{check_compatibility, Implementation, Namespace};
use crate::sink::registry::FilterRegistry;
use crate::sink::{DistanceCollector, DistanceSink};
use crate::storage::Storage;
use crate::types::{DistanceRecord, NamespaceId, SequenceMetadata, SketchDbName, Token};

/// matches returned when the caller does not ask for a count
pub const DEFAULT_MAX_RESULTS: usize = 10;
/// hard ceiling on returned matches, larger requests are clamped
pub const MAX_RESULTS_CEILING: usize = 100;

// how often the drain loop wakes up to check deadline and cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(25);
// capacity of the producer channel
const CHANNEL_BOUND: usize = 256;

//==================================================================================

/// caller side cancellation handle. Cloneable, one clone goes to the caller,
/// the query observes the shared flag. Cancelling discards the in progress
/// collector, a canceled query returns no partial results.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
} // end of CancelToken

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
} // end of impl CancelToken

//==================================================================================

/// parameters of one search
pub struct SearchRequest {
    namespaces: Vec<NamespaceId>,
    sketch_file: PathBuf,
    token: Option<Token>,
    max_results: Option<usize>,
    strict: bool,
} // end of SearchRequest

impl SearchRequest {
    pub fn new(namespaces: Vec<NamespaceId>, sketch_file: &Path) -> Self {
        SearchRequest {
            namespaces,
            sketch_file: sketch_file.to_path_buf(),
            token: None,
            max_results: None,
            strict: true,
        }
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// opt out of strict sketch parameter matching. Incompatible targets are
    /// then skipped with a warning instead of failing the query.
    pub fn relaxed(mut self) -> Self {
        self.strict = false;
        self
    }
} // end of impl SearchRequest

//==================================================================================

/// one surviving match, the raw distance annotated with its stored metadata
#[derive(Clone, Debug)]
pub struct SequenceMatch {
    record: DistanceRecord,
    metadata: SequenceMetadata,
} // end of SequenceMatch

impl SequenceMatch {
    pub fn get_record(&self) -> &DistanceRecord {
        &self.record
    }

    pub fn get_metadata(&self) -> &SequenceMetadata {
        &self.metadata
    }
} // end of impl SequenceMatch

/// a ranked result set with the namespaces and implementation it came from
pub struct SearchResult {
    namespaces: Vec<Namespace>,
    implementation: Implementation,
    warnings: Vec<String>,
    matches: Vec<SequenceMatch>,
} // end of SearchResult

impl SearchResult {
    pub fn get_namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn get_implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn get_warnings(&self) -> &[String] {
        &self.warnings
    }

    /// matches, closest first
    pub fn get_matches(&self) -> &[SequenceMatch] {
        &self.matches
    }
} // end of impl SearchResult

//==================================================================================

/// the engine, one per process. Storage, comparator and filter registry are
/// read only collaborators shared by all concurrent queries.
pub struct SearchEngine {
    storage: Arc<dyn Storage>,
    comparator: Arc<dyn SketchComparator>,
    registry: Arc<FilterRegistry>,
    /// deadline for the comparator drain
    timeout: Duration,
} // end of SearchEngine

impl SearchEngine {
    pub fn new(
        storage: Arc<dyn Storage>,
        comparator: Arc<dyn SketchComparator>,
        registry: Arc<FilterRegistry>,
        timeout: Duration,
    ) -> Self {
        SearchEngine {
            storage,
            comparator,
            registry,
            timeout,
        }
    } // end of new

    /// run one search to completion
    pub fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancelToken,
    ) -> Result<SearchResult, HomError> {
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        //
        let max_results = match request.max_results {
            None => DEFAULT_MAX_RESULTS,
            Some(0) => {
                return Err(HomError::IllegalParameter(String::from(
                    "max results must be at least 1",
                )))
            }
            Some(n) => n.min(MAX_RESULTS_CEILING),
        };
        //
        // resolve and vet the namespace selection
        let unique: BTreeSet<&NamespaceId> = request.namespaces.iter().collect();
        let mut namespaces = Vec::with_capacity(unique.len());
        for id in unique {
            namespaces.push(self.storage.get_namespace(id)?);
        }
        check_compatibility(&namespaces)?;
        //
        // one chain per namespace, all ending in the shared collector
        let collector = DistanceCollector::new(max_results)?;
        let mut chains: HashMap<SketchDbName, Box<dyn DistanceSink>> = HashMap::new();
        let mut targets = Vec::with_capacity(namespaces.len());
        for ns in &namespaces {
            let chain = match ns.get_filter_id() {
                Some(filter_id) => {
                    let factory = self.registry.get(filter_id).ok_or_else(|| {
                        HomError::Configuration(format!(
                            "namespace {} references unconfigured filter {}",
                            ns.get_id().get(),
                            filter_id.get()
                        ))
                    })?;
                    factory.build(collector.as_sink(), request.token.as_ref())?
                }
                None => collector.as_sink(),
            };
            chains.insert(ns.get_db_name().clone(), chain);
            targets.push(
                self.comparator
                    .open_database(ns.get_db_name(), ns.get_sketch_location())?,
            );
        }
        //
        let stream =
            self.comparator
                .compute(&request.sketch_file, &targets, max_results, request.strict)?;
        let warnings = stream.warnings;
        let records = stream.records;
        //
        // drain the comparator from a producer thread so the deadline and the
        // cancel flag stay observable here
        let (tx, rx) = bounded(CHANNEL_BOUND);
        std::thread::spawn(move || {
            for item in records {
                if tx.send(item).is_err() {
                    // query side went away, stop producing
                    return;
                }
            }
        });
        let deadline = Instant::now() + self.timeout;
        loop {
            if cancel.is_canceled() {
                log::info!("search canceled by caller");
                return Err(HomError::Canceled);
            }
            if Instant::now() >= deadline {
                log::warn!("distance computation exceeded {} ms", self.timeout.as_millis());
                return Err(HomError::Timeout(self.timeout.as_millis()));
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(record)) => match chains.get_mut(record.get_db_name()) {
                    Some(chain) => chain.accept(record)?,
                    None => {
                        log::warn!(
                            "comparator returned a distance for unknown database {}, dropping",
                            record.get_db_name().get()
                        );
                    }
                },
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        for chain in chains.values_mut() {
            chain.flush()?;
        }
        //
        let matches = self.annotate(&namespaces, collector.snapshot())?;
        log::info!(
            "search over {} namespaces returned {} matches, sys time(s) {:.2e}, cpu time(s) {:.2e}",
            namespaces.len(),
            matches.len(),
            start_t.elapsed().unwrap_or_default().as_secs_f32(),
            cpu_start.elapsed().as_secs_f32()
        );
        Ok(SearchResult {
            namespaces,
            implementation: self.comparator.get_implementation(),
            warnings,
            matches,
        })
    } // end of search

    // join each surviving record with its metadata row, preserving rank order
    fn annotate(
        &self,
        namespaces: &[Namespace],
        records: Vec<DistanceRecord>,
    ) -> Result<Vec<SequenceMatch>, HomError> {
        // group wanted ids per namespace
        let by_db: HashMap<&SketchDbName, &Namespace> = namespaces
            .iter()
            .map(|ns| (ns.get_db_name(), ns))
            .collect();
        let mut wanted: HashMap<&SketchDbName, Vec<String>> = HashMap::new();
        for record in &records {
            if let Some(ns) = by_db.get(record.get_db_name()) {
                wanted
                    .entry(ns.get_db_name())
                    .or_default()
                    .push(record.get_sequence_id().to_string());
            }
        }
        // one storage round trip per namespace
        let mut metadata: HashMap<(SketchDbName, String), SequenceMetadata> = HashMap::new();
        for (db_name, ids) in wanted {
            let ns = by_db[db_name];
            let rows =
                self.storage
                    .get_sequence_metadata(ns.get_id(), ns.get_load_id(), &ids)?;
            for row in rows {
                metadata.insert((db_name.clone(), row.get_id().to_string()), row);
            }
        }
        //
        let mut matches = Vec::with_capacity(records.len());
        for record in records {
            let key = (record.get_db_name().clone(), record.get_sequence_id().to_string());
            let row = metadata.remove(&key).ok_or_else(|| HomError::NoSuchSequence {
                namespace: record.get_db_name().get().to_string(),
                load: String::from("current"),
                id: record.get_sequence_id().to_string(),
            })?;
            matches.push(SequenceMatch {
                record,
                metadata: row,
            });
        }
        Ok(matches)
    } // end of annotate
} // end of impl SearchEngine

//==================================================================================

// end of mod tests
