//! Storage for CFR regrets and strategies.
//!
//! This module provides thread-safe storage for cumulative regrets and
//! strategy sums. Every candidate action has its own information-set key, so
//! each table maps a key straight to a scalar.
//!
//! ## Persistence format
//!
//! A table is written as two maps, regrets first. Each map is a size header
//! line followed by that many `key value` lines:
//!
//! ```text
//! 2
//! K:1:4:0:0:3 12.5
//! K:0:4:0:0:3 -3.25
//! 1
//! K:1:4:0:0:3 0.75
//! ```
//!
//! Values are written with Rust's shortest round-trip float formatting, so a
//! reloaded table reproduces every probability bit for bit.

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::cfr::error::TableError;
use crate::games::gin_rummy::info_key::InfoKey;
use crate::games::gin_rummy::state::DecisionKind;

type KeyMap = DashMap<InfoKey, f64, FxBuildHasher>;

fn new_map() -> KeyMap {
    DashMap::with_hasher(FxBuildHasher)
}

/// Thread-safe storage for regrets and strategy sums.
///
/// This struct manages the core data structures used by CFR:
/// - **Regrets**: Cumulative counterfactual regret per action key
/// - **Strategy sums**: Cumulative reach-weighted action probability per key
///
/// Updates go through `DashMap` entries, so each read-increment-write is
/// atomic for its key while different keys update concurrently.
#[derive(Debug)]
pub struct RegretTable {
    sum_regret: KeyMap,
    sum_strategy: KeyMap,
}

impl Default for RegretTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegretTable {
    /// Create new empty storage.
    pub fn new() -> Self {
        Self {
            sum_regret: new_map(),
            sum_strategy: new_map(),
        }
    }

    /// Cumulative regret of `key` (0 if unseen).
    pub fn regret(&self, key: &InfoKey) -> f64 {
        self.sum_regret.get(key).map(|v| *v).unwrap_or(0.0)
    }

    /// Cumulative strategy weight of `key` (0 if unseen).
    pub fn strategy(&self, key: &InfoKey) -> f64 {
        self.sum_strategy.get(key).map(|v| *v).unwrap_or(0.0)
    }

    /// Add `delta` to the cumulative regret of `key`.
    pub fn add_regret(&self, key: InfoKey, delta: f64) {
        *self.sum_regret.entry(key).or_insert(0.0) += delta;
    }

    /// Add `delta` to the cumulative strategy weight of `key`.
    pub fn add_strategy(&self, key: InfoKey, delta: f64) {
        *self.sum_strategy.entry(key).or_insert(0.0) += delta;
    }

    /// Regret-matching strategy over `keys`.
    ///
    /// The strategy is proportional to positive regrets. If all regrets are
    /// non-positive, returns a uniform strategy.
    pub fn current_strategy(&self, keys: &[InfoKey]) -> Vec<f64> {
        let values: Vec<f64> = keys.iter().map(|k| self.regret(k).max(0.0)).collect();
        proportional(&values)
    }

    /// Average strategy over `keys` (Nash equilibrium approximation).
    pub fn average_strategy(&self, keys: &[InfoKey]) -> Vec<f64> {
        let values: Vec<f64> = keys.iter().map(|k| self.strategy(k).max(0.0)).collect();
        proportional(&values)
    }

    /// Number of distinct keys with a regret or strategy entry.
    pub fn len(&self) -> usize {
        let strategy_only = self
            .sum_strategy
            .iter()
            .filter(|e| !self.sum_regret.contains_key(e.key()))
            .count();
        self.sum_regret.len() + strategy_only
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.sum_regret.is_empty() && self.sum_strategy.is_empty()
    }

    /// Sum over keys of positive cumulative regret.
    pub fn total_positive_regret(&self) -> f64 {
        self.sum_regret.iter().map(|e| e.value().max(0.0)).sum()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.sum_regret.clear();
        self.sum_strategy.clear();
    }

    /// Write both maps in the text persistence format.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), TableError> {
        write_map(writer, &self.sum_regret)?;
        write_map(writer, &self.sum_strategy)?;
        Ok(())
    }

    /// Read both maps written by [`RegretTable::save`] without installing them.
    pub fn read<R: BufRead>(reader: &mut Lines<R>) -> Result<TableExport, TableError> {
        let regrets = read_map(reader)?;
        let strategies = read_map(reader)?;
        Ok(TableExport {
            regrets,
            strategies,
        })
    }

    /// Export storage to serializable format.
    pub fn export(&self) -> TableExport {
        TableExport {
            regrets: sorted_entries(&self.sum_regret),
            strategies: sorted_entries(&self.sum_strategy),
        }
    }

    /// Import storage from serialized format.
    pub fn import(&self, data: TableExport) {
        self.clear();
        for (k, v) in data.regrets {
            self.sum_regret.insert(k, v);
        }
        for (k, v) in data.strategies {
            self.sum_strategy.insert(k, v);
        }
    }
}

impl Clone for RegretTable {
    fn clone(&self) -> Self {
        let table = Self::new();
        table.import(self.export());
        table
    }
}

/// Normalize non-negative weights; uniform when they sum to zero.
fn proportional(values: &[f64]) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter().map(|&v| v / sum).collect()
    } else {
        vec![1.0 / values.len() as f64; values.len()]
    }
}

fn sorted_entries(map: &KeyMap) -> Vec<(InfoKey, f64)> {
    let mut entries: Vec<(InfoKey, f64)> = map.iter().map(|e| (*e.key(), *e.value())).collect();
    entries.sort_by_cached_key(|(k, _)| k.to_string());
    entries
}

fn write_map<W: Write>(writer: &mut W, map: &KeyMap) -> Result<(), TableError> {
    let entries = sorted_entries(map);
    writeln!(writer, "{}", entries.len())?;
    for (key, value) in entries {
        writeln!(writer, "{} {}", key, value)?;
    }
    Ok(())
}

/// Line reader that tracks line numbers for error messages.
pub struct Lines<R> {
    inner: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            inner: reader.lines(),
            line: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, TableError> {
        match self.inner.next() {
            Some(line) => {
                self.line += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }
}

fn read_map<R: BufRead>(reader: &mut Lines<R>) -> Result<Vec<(InfoKey, f64)>, TableError> {
    let header = reader.next_line()?.ok_or(TableError::BadHeader)?;
    let expected: usize = header.trim().parse().map_err(|_| TableError::BadHeader)?;

    let mut entries = Vec::with_capacity(expected);
    for found in 0..expected {
        let content = reader
            .next_line()?
            .ok_or(TableError::Truncated { expected, found })?;
        let bad = || TableError::BadEntry {
            line: reader.line,
            content: content.clone(),
        };
        let (key, value) = content.trim().split_once(' ').ok_or_else(bad)?;
        let key: InfoKey = key.parse().map_err(|_| bad())?;
        let value: f64 = value.trim().parse().map_err(|_| bad())?;
        entries.push((key, value));
    }
    Ok(entries)
}

/// Average strategies of the binary draw and knock decisions, taken at one
/// point during training.
///
/// Each decision is stored as the probability of its "yes" action (take the
/// face-up card, knock).
#[derive(Debug, Clone, Default)]
pub struct StrategySnapshot {
    probs: FxHashMap<InfoKey, f64>,
}

impl StrategySnapshot {
    /// Number of decisions captured.
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    /// True if no decision has been visited yet.
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Probability of the "yes" action of `key`'s decision, if captured.
    pub fn probability(&self, key: &InfoKey) -> Option<f64> {
        let (yes, _) = key.paired()?;
        self.probs.get(&yes).copied()
    }

    fn capture(&mut self, table: &RegretTable) {
        let weights: FxHashMap<InfoKey, f64> = table
            .sum_strategy
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        for key in weights.keys() {
            let Some((yes, no)) = key.paired() else { continue };
            if self.probs.contains_key(&yes) {
                continue;
            }
            let w_yes = weights.get(&yes).copied().unwrap_or(0.0).max(0.0);
            let w_no = weights.get(&no).copied().unwrap_or(0.0).max(0.0);
            let p = proportional(&[w_yes, w_no])[0];
            self.probs.insert(yes, p);
        }
    }
}

/// Serializable export format for a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableExport {
    /// Cumulative regrets.
    pub regrets: Vec<(InfoKey, f64)>,
    /// Cumulative strategy sums.
    pub strategies: Vec<(InfoKey, f64)>,
}

/// One [`RegretTable`] per decision kind, shared by every walk.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    /// Draw decisions.
    pub draw: RegretTable,
    /// Discard decisions.
    pub discard: RegretTable,
    /// Knock decisions.
    pub knock: RegretTable,
}

impl Tables {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for a decision kind.
    pub fn for_kind(&self, kind: DecisionKind) -> &RegretTable {
        match kind {
            DecisionKind::Draw => &self.draw,
            DecisionKind::Discard => &self.discard,
            DecisionKind::Knock => &self.knock,
        }
    }

    /// Table that owns `key`.
    pub fn for_key(&self, key: &InfoKey) -> &RegretTable {
        self.for_kind(key.kind())
    }

    fn all(&self) -> [&RegretTable; 3] {
        [&self.draw, &self.discard, &self.knock]
    }

    /// Total number of keys across all tables.
    pub fn num_info_sets(&self) -> usize {
        self.all().iter().map(|t| t.len()).sum()
    }

    /// Mean positive regret per key per iteration.
    ///
    /// Starts high and falls as the strategies stop improving.
    pub fn average_regret(&self, iterations: u64) -> f64 {
        let keys = self.num_info_sets();
        if iterations == 0 || keys == 0 {
            return f64::INFINITY;
        }
        let total: f64 = self.all().iter().map(|t| t.total_positive_regret()).sum();
        total / keys as f64 / iterations as f64
    }

    /// Capture the average strategies of every binary decision.
    pub fn snapshot_strategies(&self) -> StrategySnapshot {
        let mut snapshot = StrategySnapshot::default();
        snapshot.capture(&self.draw);
        snapshot.capture(&self.knock);
        snapshot
    }

    /// Convergence Indicator: how far the average strategies moved since
    /// `snapshot`.
    ///
    /// `CI = 100 · mean(Σ_actions |p_new - p_old|)` over the binary
    /// decisions seen so far. Decisions missing from the snapshot are compared
    /// with uniform. Lower is better; a fully settled strategy reads near 0.
    pub fn calculate_ci(&self, snapshot: &StrategySnapshot) -> f64 {
        let current = self.snapshot_strategies();
        if current.is_empty() {
            return f64::INFINITY;
        }
        let total: f64 = current
            .probs
            .iter()
            .map(|(key, &p)| {
                let old = snapshot.probs.get(key).copied().unwrap_or(0.5);
                2.0 * (p - old).abs()
            })
            .sum();
        100.0 * total / current.len() as f64
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        for table in self.all() {
            table.clear();
        }
    }

    /// Write draw, discard and knock tables in order.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), TableError> {
        for table in self.all() {
            table.save(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read tables written by [`Tables::save`].
    ///
    /// Every section is parsed before any table is replaced, so a malformed
    /// file leaves the current contents untouched.
    pub fn load<R: BufRead>(&self, reader: R) -> Result<(), TableError> {
        let mut lines = Lines::new(reader);
        let data = TablesExport {
            draw: RegretTable::read(&mut lines)?,
            discard: RegretTable::read(&mut lines)?,
            knock: RegretTable::read(&mut lines)?,
        };
        self.import(data);
        log::debug!("loaded {} information-set keys", self.num_info_sets());
        Ok(())
    }

    /// Export all tables.
    pub fn export(&self) -> TablesExport {
        TablesExport {
            draw: self.draw.export(),
            discard: self.discard.export(),
            knock: self.knock.export(),
        }
    }

    /// Import all tables.
    pub fn import(&self, data: TablesExport) {
        self.draw.import(data.draw);
        self.discard.import(data.discard);
        self.knock.import(data.knock);
    }
}

/// Serializable export of [`Tables`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesExport {
    /// Draw table.
    pub draw: TableExport,
    /// Discard table.
    pub discard: TableExport,
    /// Knock table.
    pub knock: TableExport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::gin_rummy::info_key::{DrawKey, KnockKey};
    use std::io::Cursor;
    use std::sync::Arc;

    fn knock_keys(deadwood: u8) -> [InfoKey; 2] {
        let base = KnockKey {
            knock: true,
            deadwood,
            gin: deadwood == 0,
            opp_known: 1,
            turns_left: 3,
        };
        [
            InfoKey::Knock(base),
            InfoKey::Knock(KnockKey {
                knock: false,
                ..base
            }),
        ]
    }

    fn draw_key() -> InfoKey {
        InfoKey::Draw(DrawKey {
            first_round: false,
            take: true,
            improvement: 4,
            completes_meld: true,
            turns_left: 2,
        })
    }

    #[test]
    fn test_unseen_keys_are_uniform() {
        let table = RegretTable::new();
        let keys = knock_keys(4);
        assert_eq!(table.current_strategy(&keys), vec![0.5, 0.5]);
        assert_eq!(table.average_strategy(&keys), vec![0.5, 0.5]);
    }

    #[test]
    fn test_regret_matching() {
        let table = RegretTable::new();
        let keys = knock_keys(4);
        table.add_regret(keys[0], 3.0);
        table.add_regret(keys[1], 1.0);
        assert_eq!(table.current_strategy(&keys), vec![0.75, 0.25]);

        table.add_regret(keys[1], -5.0);
        assert_eq!(table.current_strategy(&keys), vec![1.0, 0.0]);

        table.add_regret(keys[0], -10.0);
        assert_eq!(table.current_strategy(&keys), vec![0.5, 0.5]);
    }

    #[test]
    fn test_concurrent_updates_are_atomic() {
        let table = Arc::new(RegretTable::new());
        let key = knock_keys(2)[0];
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        table.add_regret(key, 1.0);
                        table.add_strategy(key, 0.5);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(table.regret(&key), 8000.0);
        assert_eq!(table.strategy(&key), 4000.0);
    }

    #[test]
    fn test_text_round_trip_is_bit_identical() {
        let tables = Tables::new();
        for dw in 0..6u8 {
            let keys = knock_keys(dw);
            tables.knock.add_regret(keys[0], 0.1 * dw as f64 - 0.3);
            tables.knock.add_regret(keys[1], 1.0 / 3.0 + dw as f64);
            tables.knock.add_strategy(keys[0], 2.0f64.sqrt() * dw as f64);
            tables.knock.add_strategy(keys[1], 1e-17 + dw as f64 / 7.0);
        }

        let mut buf = Vec::new();
        tables.save(&mut buf).unwrap();
        let loaded = Tables::new();
        loaded.load(Cursor::new(buf)).unwrap();

        assert_eq!(loaded.num_info_sets(), tables.num_info_sets());
        for dw in 0..6u8 {
            let keys = knock_keys(dw);
            let a = tables.knock.current_strategy(&keys);
            let b = loaded.knock.current_strategy(&keys);
            assert_eq!(a.iter().map(|p| p.to_bits()).collect::<Vec<_>>(),
                       b.iter().map(|p| p.to_bits()).collect::<Vec<_>>());
            let a = tables.knock.average_strategy(&keys);
            let b = loaded.knock.average_strategy(&keys);
            assert_eq!(a.iter().map(|p| p.to_bits()).collect::<Vec<_>>(),
                       b.iter().map(|p| p.to_bits()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_text_format_layout() {
        let table = RegretTable::new();
        let keys = knock_keys(4);
        table.add_regret(keys[0], 12.5);
        table.add_strategy(keys[0], 0.75);
        let mut buf = Vec::new();
        table.save(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "1\nK:1:4:0:1:3 12.5\n1\nK:1:4:0:1:3 0.75\n");
    }

    #[test]
    fn test_load_errors() {
        let tables = Tables::new();
        assert!(matches!(
            tables.load(Cursor::new("x\n")),
            Err(TableError::BadHeader)
        ));
        assert!(matches!(
            tables.load(Cursor::new("2\nK:1:4:0:1:3 1.0\n")),
            Err(TableError::Truncated { expected: 2, found: 1 })
        ));
        assert!(matches!(
            tables.load(Cursor::new("1\nK:1:4:0:1:3 abc\n")),
            Err(TableError::BadEntry { line: 2, .. })
        ));
    }

    #[test]
    fn test_failed_load_keeps_tables() {
        let tables = Tables::new();
        let keys = knock_keys(5);
        tables.draw.add_regret(draw_key(), 2.0);
        tables.knock.add_regret(keys[0], 7.0);

        // Draw section parses, discard header does not.
        let result = tables.load(Cursor::new("0\n0\nnot-a-header\n"));
        assert!(matches!(result, Err(TableError::BadHeader)));
        assert_eq!(tables.draw.len(), 1);
        assert_eq!(tables.draw.regret(&draw_key()), 2.0);
        assert_eq!(tables.knock.regret(&keys[0]), 7.0);

        let truncated = "0\n0\n0\n0\n1\nK:1:5:0:1:3 1.0\n";
        assert!(tables.load(Cursor::new(truncated)).is_err());
        assert_eq!(tables.knock.regret(&keys[0]), 7.0);
        assert_eq!(tables.num_info_sets(), 2);
    }

    #[test]
    fn test_len_counts_distinct_keys() {
        let table = RegretTable::new();
        let keys = knock_keys(2);
        table.add_regret(keys[0], 1.0);
        table.add_strategy(keys[1], 1.0);
        assert_eq!(table.len(), 2);

        table.add_strategy(keys[0], 1.0);
        assert_eq!(table.len(), 2);
        table.add_regret(keys[1], -1.0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_json_export_import() {
        let tables = Tables::new();
        let keys = knock_keys(1);
        tables.knock.add_regret(keys[1], 2.5);
        let json = serde_json::to_string(&tables.export()).unwrap();
        let back: TablesExport = serde_json::from_str(&json).unwrap();
        let loaded = Tables::new();
        loaded.import(back);
        assert_eq!(loaded.knock.regret(&keys[1]), 2.5);
    }

    #[test]
    fn test_convergence_indicator() {
        let tables = Tables::new();
        assert_eq!(tables.calculate_ci(&StrategySnapshot::default()), f64::INFINITY);

        let keys = knock_keys(3);
        tables.knock.add_strategy(keys[0], 3.0);
        tables.knock.add_strategy(keys[1], 1.0);
        let snapshot = tables.snapshot_strategies();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.probability(&keys[1]), Some(0.75));
        assert_eq!(tables.calculate_ci(&snapshot), 0.0);

        // From uniform to 0.75 on a fresh snapshot.
        assert_eq!(tables.calculate_ci(&StrategySnapshot::default()), 50.0);

        tables.knock.add_strategy(keys[1], 4.0);
        // 3 / 8 now
        assert_eq!(tables.calculate_ci(&snapshot), 75.0);
    }
}
