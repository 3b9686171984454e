//! the namespace bulk load engine.
//!
//! A load ingests one sketch database and its sequence metadata stream into
//! storage and republishes the namespace atomically at the end. The loader is
//! a linear state machine without retries, the operator re-invokes it on
//! failure : parse the descriptor, open the sketch database, enumerate ids on
//! both sides, vet ids against the namespace filter if one is declared, check
//! the two id sets agree exactly, persist metadata in batches, then replace
//! the namespace record as the single commit point.
//!
//! A failed load never moves the namespace pointer, but metadata batches
//! already written are not rolled back. They sit under the unpublished load
//! id, unreachable, until that load id is reused or cleaned up.

use std::collections::{BTreeSet, HashSet};
use std::io::{BufRead, Read};
use std::path::Path;
use std::time::SystemTime;

use chrono::Utc;
use cpu_time::ProcessTime;
use rayon::prelude::*;
use serde_json::Value;

use crate::comparator::SketchComparator;
use crate::error::HomError;
use crate::namespace::{Implementation, Namespace, SketchParams};
use crate::sink::registry::FilterRegistry;
use crate::storage::Storage;
use crate::types::{AuthSource, FilterId, LoadId, NamespaceId, SequenceMetadata, SketchDbName};

/// metadata rows are persisted in chunks of this size to bound memory.
/// Each chunk is stamped with its own capture timestamp, a deliberate
/// per batch time of write semantic.
pub const METADATA_BATCH_SIZE: usize = 100;

// at most this many offending ids are cited in an id mismatch error
const MAX_EXAMPLE_IDS: usize = 3;

//==================================================================================

/// the parsed namespace descriptor document (one json object)
#[derive(Clone, Debug)]
pub struct NamespaceDescriptor {
    id: NamespaceId,
    implementation: Implementation,
    sketch_params: SketchParams,
    source_db_id: String,
    data_source: Option<String>,
    description: Option<String>,
    filter_id: Option<FilterId>,
    auth_source: Option<AuthSource>,
} // end of NamespaceDescriptor

// field extraction helpers, errors name the offending key
fn descriptor_err(key: &str, what: &str) -> HomError {
    HomError::LoadParse(format!("key {} in namespace descriptor {}", key, what))
}

fn get_str(map: &serde_json::Map<String, Value>, key: &str) -> Result<String, HomError> {
    match map.get(key) {
        None | Some(Value::Null) => Err(descriptor_err(key, "is missing")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(descriptor_err(key, "is not a string")),
    }
}

fn get_opt_str(map: &serde_json::Map<String, Value>, key: &str) -> Result<Option<String>, HomError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(descriptor_err(key, "is not a string")),
    }
}

fn get_u32(map: &serde_json::Map<String, Value>, key: &str) -> Result<u32, HomError> {
    match map.get(key) {
        None | Some(Value::Null) => Err(descriptor_err(key, "is missing")),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| descriptor_err(key, "is not a positive integer")),
        Some(_) => Err(descriptor_err(key, "is not a positive integer")),
    }
}

fn get_opt_u32(map: &serde_json::Map<String, Value>, key: &str) -> Result<Option<u32>, HomError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        _ => get_u32(map, key).map(Some),
    }
}

impl NamespaceDescriptor {
    /// parse the descriptor document. Errors name the offending key.
    pub fn parse(reader: impl Read) -> Result<Self, HomError> {
        let root: Value = serde_json::from_reader(reader)
            .map_err(|e| HomError::LoadParse(format!("namespace descriptor is not valid json : {}", e)))?;
        let map = root
            .as_object()
            .ok_or_else(|| HomError::LoadParse(String::from("namespace descriptor is not a json object")))?;
        //
        let id = NamespaceId::new(&get_str(map, "id")?)
            .map_err(|e| descriptor_err("id", &format!("is invalid : {}", e)))?;
        let implementation = Implementation::new(
            &get_str(map, "implementation")?,
            &get_opt_str(map, "implementationversion")?.unwrap_or_default(),
        )
        .map_err(|e| descriptor_err("implementation", &format!("is invalid : {}", e)))?;
        let sketch_params = SketchParams::new(
            get_u32(map, "kmersize")?,
            get_u32(map, "sketchsize")?,
            get_opt_u32(map, "scaling")?,
        )
        .map_err(|e| descriptor_err("kmersize/sketchsize", &format!("is invalid : {}", e)))?;
        let source_db_id = get_str(map, "sourcedatabaseid")?;
        let data_source = get_opt_str(map, "datasource")?;
        let description = get_opt_str(map, "description")?;
        let filter_id = match get_opt_str(map, "filterid")? {
            Some(f) => Some(
                FilterId::new(&f).map_err(|e| descriptor_err("filterid", &format!("is invalid : {}", e)))?,
            ),
            None => None,
        };
        let auth_source = match get_opt_str(map, "authsource")? {
            Some(a) => Some(
                AuthSource::new(&a)
                    .map_err(|e| descriptor_err("authsource", &format!("is invalid : {}", e)))?,
            ),
            None => None,
        };
        Ok(NamespaceDescriptor {
            id,
            implementation,
            sketch_params,
            source_db_id,
            data_source,
            description,
            filter_id,
            auth_source,
        })
    } // end of parse

    pub fn get_id(&self) -> &NamespaceId {
        &self.id
    }

    pub fn get_filter_id(&self) -> Option<&FilterId> {
        self.filter_id.as_ref()
    }
} // end of impl NamespaceDescriptor

//==================================================================================

/// what a successful load reports back
#[derive(Clone, Debug)]
pub struct LoadReport {
    namespace: NamespaceId,
    load: LoadId,
    sequence_count: u64,
} // end of LoadReport

impl LoadReport {
    pub fn get_namespace(&self) -> &NamespaceId {
        &self.namespace
    }

    pub fn get_load(&self) -> &LoadId {
        &self.load
    }

    pub fn get_sequence_count(&self) -> u64 {
        self.sequence_count
    }
} // end of impl LoadReport

//==================================================================================

/// single writer batch loader. Not designed for concurrent loads against the
/// same namespace, queries running during a load see the old namespace until
/// the final replace.
pub struct NamespaceLoader<'a> {
    storage: &'a dyn Storage,
    comparator: &'a dyn SketchComparator,
    registry: &'a FilterRegistry,
} // end of NamespaceLoader

impl<'a> NamespaceLoader<'a> {
    pub fn new(
        storage: &'a dyn Storage,
        comparator: &'a dyn SketchComparator,
        registry: &'a FilterRegistry,
    ) -> Self {
        NamespaceLoader {
            storage,
            comparator,
            registry,
        }
    } // end of new

    /// run one load.
    /// `descriptor` is the namespace descriptor document, `metadata` the line
    /// oriented stream of sequence metadata, one json object per line.
    pub fn load(
        &self,
        load_id: &LoadId,
        sketch_location: &Path,
        descriptor: impl Read,
        metadata: impl BufRead,
    ) -> Result<LoadReport, HomError> {
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        //
        let descriptor = NamespaceDescriptor::parse(descriptor)?;
        log::info!(
            "loading namespace {} under load id {}",
            descriptor.id.get(),
            load_id.get()
        );
        //
        let implementation = self.comparator.get_implementation();
        if implementation.get_name() != descriptor.implementation.get_name() {
            return Err(HomError::LoadParse(format!(
                "descriptor declares implementation {} but the comparator is {}",
                descriptor.implementation.get_name(),
                implementation.get_name()
            )));
        }
        //
        let db_name = SketchDbName::new(descriptor.id.get())?;
        let db = self.comparator.open_database(&db_name, sketch_location)?;
        let sketch_ids = self.comparator.list_sequence_ids(&db)?;
        log::debug!("sketch database lists {} sequences", sketch_ids.len());
        //
        let metadata = parse_metadata_stream(metadata)?;
        //
        // the declared filter, if any, must be configured and must accept
        // every sketch id. Checked before anything is persisted.
        if let Some(filter_id) = &descriptor.filter_id {
            let factory = self.registry.get(filter_id).ok_or_else(|| {
                HomError::Configuration(format!(
                    "filter id specified but not configured : {}",
                    filter_id.get()
                ))
            })?;
            if let Some(descriptor_auth) = &descriptor.auth_source {
                if factory.get_auth_source() != Some(descriptor_auth) {
                    return Err(HomError::LoadParse(format!(
                        "key authsource in namespace descriptor disagrees with filter {}",
                        filter_id.get()
                    )));
                }
            }
            // smallest offending id so the failure is deterministic
            let bad = sketch_ids
                .par_iter()
                .filter(|id| !factory.validate_id(id.as_str()))
                .min();
            if let Some(bad) = bad {
                return Err(HomError::Filter(format!(
                    "sketch sequence id {} is not valid for filter {}",
                    bad,
                    filter_id.get()
                )));
            }
        }
        //
        let meta_ids: BTreeSet<String> = metadata.iter().map(|m| m.get_id().to_string()).collect();
        check_id_sets(&meta_ids, &sketch_ids)?;
        //
        // chunked persistence, one capture timestamp per batch
        for batch in metadata.chunks(METADATA_BATCH_SIZE) {
            self.storage
                .save_sequence_metadata(&descriptor.id, load_id, batch, Utc::now())?;
        }
        log::debug!("persisted {} metadata rows", metadata.len());
        //
        // the single commit point
        let auth_source = match &descriptor.filter_id {
            Some(filter_id) => self
                .registry
                .get(filter_id)
                .and_then(|f| f.get_auth_source().cloned()),
            None => descriptor.auth_source.clone(),
        };
        let mut namespace = Namespace::new(
            descriptor.id.clone(),
            descriptor.implementation.clone(),
            descriptor.sketch_params,
            db_name,
            sketch_location,
            &descriptor.source_db_id,
            load_id.clone(),
            sketch_ids.len() as u64,
            Utc::now(),
        );
        if let Some(auth) = auth_source {
            namespace = namespace.with_auth_source(auth);
        }
        if let Some(filter_id) = &descriptor.filter_id {
            namespace = namespace.with_filter_id(filter_id.clone());
        }
        if let Some(data_source) = &descriptor.data_source {
            namespace = namespace.with_data_source(data_source);
        }
        if let Some(description) = &descriptor.description {
            namespace = namespace.with_description(description);
        }
        self.storage.create_or_replace_namespace(&namespace)?;
        //
        let sys_t = start_t.elapsed().unwrap_or_default().as_secs_f32();
        log::info!(
            "namespace {} now at load {} with {} sequences, sys time(s) {:.2e}, cpu time(s) {:.2e}",
            descriptor.id.get(),
            load_id.get(),
            sketch_ids.len(),
            sys_t,
            cpu_start.elapsed().as_secs_f32()
        );
        Ok(LoadReport {
            namespace: descriptor.id,
            load: load_id.clone(),
            sequence_count: sketch_ids.len() as u64,
        })
    } // end of load
} // end of impl NamespaceLoader

//==================================================================================

// parse the line oriented metadata stream, line numbers are 1 based in errors.
// A sequence id appearing twice fails the load rather than letting the later
// line win, a duplicate in a load file is always an upstream extraction bug
fn parse_metadata_stream(reader: impl BufRead) -> Result<Vec<SequenceMetadata>, HomError> {
    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            HomError::LoadParse(format!("could not read metadata line {} : {}", lineno + 1, e))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SequenceMetadata = serde_json::from_str(&line).map_err(|e| {
            HomError::LoadParse(format!("malformed metadata line {} : {}", lineno + 1, e))
        })?;
        if !seen.insert(record.get_id().to_string()) {
            return Err(HomError::LoadParse(format!(
                "duplicate sequence id {} at metadata line {}",
                record.get_id(),
                lineno + 1
            )));
        }
        records.push(record);
    }
    Ok(records)
} // end of parse_metadata_stream

// the two id sets must agree exactly. On mismatch up to MAX_EXAMPLE_IDS
// examples are cited in lexicographic order, naming the offending source.
fn check_id_sets(meta_ids: &BTreeSet<String>, sketch_ids: &BTreeSet<String>) -> Result<(), HomError> {
    let extra_meta: Vec<&String> = meta_ids.difference(sketch_ids).collect();
    if !extra_meta.is_empty() {
        return Err(HomError::LoadParse(format!(
            "sequence ids in the metadata file have no match in the sketch database : {}",
            cite_examples(&extra_meta)
        )));
    }
    let extra_sketch: Vec<&String> = sketch_ids.difference(meta_ids).collect();
    if !extra_sketch.is_empty() {
        return Err(HomError::LoadParse(format!(
            "sequence ids in the sketch database have no match in the metadata file : {}",
            cite_examples(&extra_sketch)
        )));
    }
    Ok(())
} // end of check_id_sets

// BTreeSet difference iterates in sorted order, so sampling is deterministic
fn cite_examples(ids: &[&String]) -> String {
    let examples: Vec<&str> = ids.iter().take(MAX_EXAMPLE_IDS).map(|s| s.as_str()).collect();
    if ids.len() > MAX_EXAMPLE_IDS {
        format!("{} and {} more", examples.join(", "), ids.len() - MAX_EXAMPLE_IDS)
    } else {
        examples.join(", ")
    }
} // end of cite_examples

//==================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::comparator::{DistanceStream, SketchDatabase};
    use crate::sink::registry::{FilterConfig, FilterCollaborators, KBASE_FILTER};
    use crate::sink::workspace::WorkspaceLister;
    use crate::storage::MemoryStorage;
    use crate::types::Token;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // a comparator scripted with a fixed id set per database name
    pub(crate) struct FixedComparator {
        pub ids: HashMap<String, BTreeSet<String>>,
        pub implementation: Implementation,
    }

    impl FixedComparator {
        pub fn with_ids(ids: &[&str]) -> Self {
            let mut map = HashMap::new();
            map.insert(
                String::from("myns"),
                ids.iter().map(|s| s.to_string()).collect(),
            );
            FixedComparator {
                ids: map,
                implementation: Implementation::new("mash", "2.0").unwrap(),
            }
        }
    }

    impl SketchComparator for FixedComparator {
        fn get_implementation(&self) -> Implementation {
            self.implementation.clone()
        }

        fn open_database(
            &self,
            name: &SketchDbName,
            location: &Path,
        ) -> Result<SketchDatabase, HomError> {
            let ids = self
                .ids
                .get(name.get())
                .ok_or_else(|| HomError::InvalidSketch(format!("no database {}", name.get())))?;
            Ok(SketchDatabase::new(name.clone(), location, ids.len() as u64))
        }

        fn list_sequence_ids(&self, db: &SketchDatabase) -> Result<BTreeSet<String>, HomError> {
            Ok(self.ids[db.get_name().get()].clone())
        }

        fn compute(
            &self,
            _query_sketch: &Path,
            _targets: &[SketchDatabase],
            _max_results: usize,
            _strict: bool,
        ) -> Result<DistanceStream, HomError> {
            Ok(DistanceStream {
                warnings: Vec::new(),
                records: Box::new(std::iter::empty()),
            })
        }
    } // end of impl SketchComparator for FixedComparator

    fn descriptor(extra: &str) -> String {
        format!(
            r#"{{"id":"myns","implementation":"mash","implementationversion":"2.0",
                "kmersize":21,"sketchsize":1000,"sourcedatabaseid":"refseq"{}}}"#,
            extra
        )
    }

    fn metadata_lines(ids: &[&str]) -> String {
        ids.iter()
            .map(|id| format!(r#"{{"id":"{}","sourceid":"src_{}"}}"#, id, id))
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn run_load(
        comparator: &FixedComparator,
        storage: &MemoryStorage,
        registry: &FilterRegistry,
        load_id: &str,
        descriptor_doc: &str,
        metadata: &str,
    ) -> Result<LoadReport, HomError> {
        let loader = NamespaceLoader::new(storage, comparator, registry);
        loader.load(
            &LoadId::new(load_id).unwrap(),
            Path::new("/data/sketches/myns.msh"),
            Cursor::new(descriptor_doc.to_string()),
            Cursor::new(metadata.to_string()),
        )
    }

    #[test]
    fn test_successful_load_publishes_namespace() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["s1", "s2"]);
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        let report = run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(r#","description":"test ns","datasource":"KBase""#),
            &metadata_lines(&["s1", "s2"]),
        )
        .unwrap();
        assert_eq!(report.get_sequence_count(), 2);
        //
        let ns = storage.get_namespace(&NamespaceId::new("myns").unwrap()).unwrap();
        assert_eq!(ns.get_load_id().get(), "v1");
        assert_eq!(ns.get_seq_count(), 2);
        assert_eq!(ns.get_description(), Some("test ns"));
        assert_eq!(ns.get_data_source(), Some("KBase"));
        assert_eq!(
            storage.count_rows(ns.get_id(), ns.get_load_id()),
            2
        );
    }

    #[test]
    fn test_metadata_extra_ids_named_as_file() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["a", "b", "d"]);
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        let err = run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(""),
            &metadata_lines(&["a", "b", "c"]),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("metadata file have no match in the sketch database : c"), "{}", msg);
        // nothing was persisted, nothing was published
        assert!(matches!(
            storage.get_namespace(&NamespaceId::new("myns").unwrap()),
            Err(HomError::NoSuchNamespace(_))
        ));
        assert_eq!(
            storage.count_rows(&NamespaceId::new("myns").unwrap(), &LoadId::new("v1").unwrap()),
            0
        );
    }

    #[test]
    fn test_sketch_extra_ids_named_as_database_sorted_capped() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["a", "z4", "z3", "z2", "z1"]);
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        let err = run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(""),
            &metadata_lines(&["a"]),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sketch database have no match in the metadata file"), "{}", msg);
        // three examples in lexicographic order, remainder counted
        assert!(msg.contains("z1, z2, z3 and 1 more"), "{}", msg);
    }

    #[test]
    fn test_unconfigured_filter_fails_before_persistence() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["1_1_1"]);
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        let err = run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(r#","filterid":"kbase""#),
            &metadata_lines(&["1_1_1"]),
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("filter id specified but not configured : kbase"),
            "{}",
            err
        );
        assert_eq!(
            storage.count_rows(&NamespaceId::new("myns").unwrap(), &LoadId::new("v1").unwrap()),
            0
        );
    }

    struct OpenLister;

    impl WorkspaceLister for OpenLister {
        fn list_workspaces(&self, _token: Option<&Token>) -> Result<BTreeSet<i64>, HomError> {
            Ok(BTreeSet::new())
        }
    }

    fn kbase_registry() -> FilterRegistry {
        let collaborators = FilterCollaborators {
            workspace_lister: Some(Arc::new(OpenLister)),
        };
        let cfg = FilterConfig {
            name: String::from(KBASE_FILTER),
            config: HashMap::new(),
        };
        FilterRegistry::from_config(&[cfg], &collaborators).unwrap()
    }

    #[test]
    fn test_filter_vets_sketch_ids() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["1_1_1", "not_an_upa"]);
        let storage = MemoryStorage::new();
        let registry = kbase_registry();
        let err = run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(r#","filterid":"kbase""#),
            &metadata_lines(&["1_1_1", "not_an_upa"]),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not_an_upa"), "{}", msg);
        assert!(msg.contains("not valid for filter kbase"), "{}", msg);
    }

    #[test]
    fn test_filter_valid_ids_load_and_set_auth_source() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["1_1_1", "2_1_1"]);
        let storage = MemoryStorage::new();
        let registry = kbase_registry();
        run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(r#","filterid":"kbase""#),
            &metadata_lines(&["1_1_1", "2_1_1"]),
        )
        .unwrap();
        let ns = storage.get_namespace(&NamespaceId::new("myns").unwrap()).unwrap();
        assert_eq!(ns.get_filter_id().map(|f| f.get()), Some("kbase"));
        // auth source inherited from the filter
        assert_eq!(ns.get_auth_source().map(|a| a.get()), Some("kbase"));
    }

    #[test]
    fn test_descriptor_missing_key_named() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["s1"]);
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        let doc = r#"{"id":"myns","implementation":"mash","sketchsize":1000,"sourcedatabaseid":"refseq"}"#;
        let err = run_load(&comparator, &storage, &registry, "v1", doc, "").unwrap_err();
        assert!(err.to_string().contains("key kmersize"), "{}", err);
        // wrong implementation is caught too
        let doc = descriptor("").replace("mash", "sourmash");
        let err = run_load(&comparator, &storage, &registry, "v1", &doc, "").unwrap_err();
        assert!(err.to_string().contains("sourmash"), "{}", err);
    }

    #[test]
    fn test_malformed_metadata_line_numbered() {
        log_init_test();
        let comparator = FixedComparator::with_ids(&["s1", "s2"]);
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        let metadata = format!("{}\nthis is not json\n", metadata_lines(&["s1"]));
        let err = run_load(&comparator, &storage, &registry, "v1", &descriptor(""), &metadata)
            .unwrap_err();
        assert!(err.to_string().contains("metadata line 2"), "{}", err);
        // duplicate ids are also reported with their line
        let metadata = metadata_lines(&["s1", "s2", "s1"]);
        let err = run_load(&comparator, &storage, &registry, "v1", &descriptor(""), &metadata)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate sequence id s1 at metadata line 3"), "{}", err);
    }

    #[test]
    fn test_reload_leaves_orphaned_rows() {
        log_init_test();
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        let ns_id = NamespaceId::new("myns").unwrap();
        //
        let comparator = FixedComparator::with_ids(&["s1", "s2"]);
        run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(""),
            &metadata_lines(&["s1", "s2"]),
        )
        .unwrap();
        //
        let comparator = FixedComparator::with_ids(&["s1", "s3"]);
        run_load(
            &comparator,
            &storage,
            &registry,
            "v2",
            &descriptor(""),
            &metadata_lines(&["s1", "s3"]),
        )
        .unwrap();
        //
        let ns = storage.get_namespace(&ns_id).unwrap();
        assert_eq!(ns.get_load_id().get(), "v2");
        assert_eq!(ns.get_seq_count(), 2);
        // rows of the first load are still there, just unreferenced
        let v1 = LoadId::new("v1").unwrap();
        assert_eq!(storage.count_rows(&ns_id, &v1), 2);
        assert!(storage.row_timestamp(&ns_id, &v1, "s2").is_some());
    }

    #[test]
    fn test_batches_get_own_timestamps() {
        log_init_test();
        // 2 batches : 150 ids
        let ids: Vec<String> = (0..150).map(|i| format!("s{:03}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
        let comparator = FixedComparator::with_ids(&id_refs);
        let storage = MemoryStorage::new();
        let registry = FilterRegistry::new();
        run_load(
            &comparator,
            &storage,
            &registry,
            "v1",
            &descriptor(""),
            &metadata_lines(&id_refs),
        )
        .unwrap();
        let ns_id = NamespaceId::new("myns").unwrap();
        let v1 = LoadId::new("v1").unwrap();
        assert_eq!(storage.count_rows(&ns_id, &v1), 150);
        // rows within one batch share a timestamp
        let t_first = storage.row_timestamp(&ns_id, &v1, "s000").unwrap();
        let t_mid = storage.row_timestamp(&ns_id, &v1, "s050").unwrap();
        assert_eq!(t_first, t_mid);
        // the second batch cannot be older than the first
        let t_last = storage.row_timestamp(&ns_id, &v1, "s149").unwrap();
        assert!(t_last >= t_first);
    }
} // end of mod tests
