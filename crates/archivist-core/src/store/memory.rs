use std::collections::{BTreeMap, HashMap};

use super::{halt_read_date, SessionStore, StoreResult};
use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{
    Annotation, AnnotationId, AnnotationQuery, AnnotationRecord, AnnotationStatus, Bar,
    BarBucket, BarFilter, BarId, NewBar, TradeDay, TradeDayId, TradeDayKey,
};

/// In-memory session store
///
/// HashMap/BTreeMap-backed storage with the same uniqueness rules as the
/// SQLite schema. Not thread-safe; designed for single-threaded use in
/// tests and dry runs. `atomically` snapshots the whole store and restores
/// it when the closure fails.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    trade_days: HashMap<TradeDayId, TradeDay>,
    trade_day_keys: HashMap<TradeDayKey, TradeDayId>,
    bars: BTreeMap<(BarBucket, i64), Bar>,
    annotations: BTreeMap<AnnotationId, Annotation>,
    next_trade_day_id: TradeDayId,
    next_bar_id: BarId,
    next_annotation_id: AnnotationId,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of anchors stored
    pub fn trade_day_count(&self) -> usize {
        self.trade_days.len()
    }

    /// Number of bars stored, halted included
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    /// Number of annotations stored, every status included
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    fn anchor(&self, id: TradeDayId) -> StoreResult<&TradeDay> {
        self.trade_days.get(&id).ok_or_else(|| {
            ExError::new(ExErrorKind::ConstraintViolation)
                .with_op("memory_store")
                .with_entity_id(id.to_string())
                .with_message("trade day reference does not exist")
        })
    }
}

impl SessionStore for MemoryStore {
    fn upsert_trade_day(&mut self, key: &TradeDayKey) -> StoreResult<(TradeDay, bool)> {
        if let Some(id) = self.trade_day_keys.get(key) {
            return Ok((self.anchor(*id)?.clone(), false));
        }

        self.next_trade_day_id += 1;
        let trade_day = TradeDay {
            id: self.next_trade_day_id,
            symbol: key.symbol.clone(),
            session_date: key.session_date,
            source: key.source.clone(),
        };
        self.trade_day_keys.insert(key.clone(), trade_day.id);
        self.trade_days.insert(trade_day.id, trade_day.clone());
        Ok((trade_day, true))
    }

    fn find_trade_day(&self, key: &TradeDayKey) -> StoreResult<Option<TradeDay>> {
        Ok(self
            .trade_day_keys
            .get(key)
            .and_then(|id| self.trade_days.get(id))
            .cloned())
    }

    fn find_bar(&self, bucket: &BarBucket, timestamp: i64) -> StoreResult<Option<Bar>> {
        Ok(self.bars.get(&(bucket.clone(), timestamp)).cloned())
    }

    fn insert_bar(&mut self, bar: &NewBar) -> StoreResult<BarId> {
        let session_date = match bar.trade_day_id {
            Some(id) => Some(self.anchor(id)?.session_date),
            None => None,
        };

        let key = (bar.bucket(), bar.timestamp);
        if self.bars.contains_key(&key) {
            return Err(ExError::new(ExErrorKind::ConstraintViolation)
                .with_op("insert_bar")
                .with_timestamp(bar.timestamp)
                .with_message("bar already exists in bucket"));
        }

        self.next_bar_id += 1;
        let stored = Bar {
            id: self.next_bar_id,
            trade_day_id: bar.trade_day_id,
            session_date,
            symbol: bar.symbol.clone(),
            source: bar.source.clone(),
            timeframe: bar.timeframe.clone(),
            timestamp: bar.timestamp,
            ohlcv: bar.ohlcv,
            halted: bar.halted(),
            raw: bar.raw.clone(),
        };
        self.bars.insert(key, stored);
        Ok(self.next_bar_id)
    }

    fn query_bars(&self, filter: &BarFilter) -> StoreResult<Vec<Bar>> {
        let mut bars: Vec<Bar> = self
            .bars
            .values()
            .filter(|b| b.symbol == filter.symbol && b.source == filter.source)
            .filter(|b| {
                if b.halted {
                    filter.include_halt
                        && halt_read_date(b.timestamp).is_some_and(|d| filter.contains_date(d))
                } else {
                    b.session_date.is_some_and(|d| filter.contains_date(d))
                }
            })
            .cloned()
            .collect();
        bars.sort_by_key(|b| (b.timestamp, b.id));
        Ok(bars)
    }

    fn get_annotation(&self, id: AnnotationId) -> StoreResult<Option<Annotation>> {
        Ok(self.annotations.get(&id).cloned())
    }

    fn insert_annotation(&mut self, record: &AnnotationRecord) -> StoreResult<AnnotationId> {
        let anchor = self.anchor(record.trade_day_id)?.clone();
        if let Some(parent) = record.supersedes_id {
            if !self.annotations.contains_key(&parent) {
                return Err(ExError::new(ExErrorKind::ConstraintViolation)
                    .with_op("insert_annotation")
                    .with_entity_id(parent.to_string())
                    .with_message("supersedes reference does not exist"));
            }
        }

        self.next_annotation_id += 1;
        let annotation = Annotation {
            id: self.next_annotation_id,
            trade_day_id: anchor.id,
            symbol: anchor.symbol,
            session_date: anchor.session_date,
            annotation_type: record.annotation_type,
            content: record.content.clone(),
            tags: record.tags.clone(),
            provenance: record.provenance,
            created_at: record.created_at,
            supersedes_id: record.supersedes_id,
            status: record.status,
        };
        self.annotations.insert(annotation.id, annotation);
        Ok(self.next_annotation_id)
    }

    fn update_annotation_status(
        &mut self,
        id: AnnotationId,
        expected: AnnotationStatus,
        new: AnnotationStatus,
    ) -> StoreResult<bool> {
        match self.annotations.get_mut(&id) {
            Some(annotation) if annotation.status == expected => {
                annotation.status = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn query_annotations(&self, query: &AnnotationQuery) -> StoreResult<Vec<Annotation>> {
        let mut annotations: Vec<Annotation> = self
            .annotations
            .values()
            .filter(|a| a.symbol == query.symbol)
            .filter(|a| a.session_date >= query.start && a.session_date <= query.end)
            .filter(|a| query.status.matches(a.status))
            .filter(|a| query.annotation_type.map_or(true, |t| a.annotation_type == t))
            .cloned()
            .collect();
        annotations.sort_by_key(|a| (a.session_date, a.created_at, a.id));
        Ok(annotations)
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self = snapshot;
                Err(err)
            }
        }
    }
}
