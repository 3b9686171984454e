//! the distance sink chain.
//!
//! A query builds a strict linear chain of sinks : zero or more authorization
//! filters wired front to back, ending in the terminal [DistanceCollector].
//! A stage either forwards a record downstream, silently drops it (the record
//! is well formed but not applicable to the caller, this is policy and not a
//! fault) or raises a filter error for a malformed record.
//! A chain is built for one query, used by one thread and discarded.

pub mod registry;
pub mod workspace;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::HomError;
use crate::ranked::{BoundedRankedSet, RankDirection};
use crate::types::DistanceRecord;

/// one stage of the chain.
///
/// `accept` takes ownership of the record. If the record passes the stage it
/// must be forwarded to the downstream sink, a rejection short circuits
/// without error. `flush` signals end of stream for stages buffering state,
/// stateless filters implement it as a no-op forwarding the call downstream.
pub trait DistanceSink {
    fn accept(&mut self, record: DistanceRecord) -> Result<(), HomError>;

    fn flush(&mut self) -> Result<(), HomError>;
} // end of trait DistanceSink

//==================================================================================

/// terminal collector of a chain, ranking records into a [BoundedRankedSet].
///
/// Cloning yields a handle onto the same underlying set, so the query engine
/// keeps one handle to read results while the chain owns another as its last
/// stage. Handles are confined to the query thread.
#[derive(Clone)]
pub struct DistanceCollector {
    inner: Rc<RefCell<BoundedRankedSet<DistanceRecord>>>,
} // end of DistanceCollector

impl DistanceCollector {
    /// a collector retaining the `max_results` closest records
    pub fn new(max_results: usize) -> Result<Self, HomError> {
        let set = BoundedRankedSet::new(max_results, RankDirection::Ascending)?;
        Ok(DistanceCollector {
            inner: Rc::new(RefCell::new(set)),
        })
    } // end of new

    /// a boxed handle usable as the tail of a chain
    pub fn as_sink(&self) -> Box<dyn DistanceSink> {
        Box::new(self.clone())
    }

    /// current best records, closest first
    pub fn snapshot(&self) -> Vec<DistanceRecord> {
        self.inner.borrow().snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
} // end of impl DistanceCollector

impl DistanceSink for DistanceCollector {
    fn accept(&mut self, record: DistanceRecord) -> Result<(), HomError> {
        log::trace!(
            "collector got distance {:.3e} for {} in {}",
            record.get_distance(),
            record.get_sequence_id(),
            record.get_db_name().get()
        );
        self.inner.borrow_mut().insert(record);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), HomError> {
        Ok(())
    }
} // end of impl DistanceSink for DistanceCollector

//==================================================================================

// end of mod tests
