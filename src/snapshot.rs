// 💾 Snapshot persistence - JSON mirror of the consolidated store
// Definitions come first so that loading can re-register every identity
// before month records are resolved against it. Earnings are derived and
// never written.

use crate::calendar::Period;
use crate::error::Result;
use crate::items::{ExpenseItem, Kind, SalesItem};
use crate::store::{ConsolidatedStore, RawRecord, Scenario, ScenarioLedger, SeriesMap, Settings, StoreBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// DOCUMENT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub settings: Settings,

    /// Per unit, in registration order
    #[serde(default)]
    pub definitions: Vec<UnitDefinitions>,

    #[serde(default)]
    pub plan: BTreeMap<String, UnitRecords>,

    #[serde(default)]
    pub actual: BTreeMap<String, UnitRecords>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitDefinitions {
    pub unit: String,
    #[serde(default)]
    pub sales: Vec<SalesItem>,
    #[serde(default)]
    pub expenses: Vec<ExpenseItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRecords {
    #[serde(default)]
    pub sales: BTreeMap<Period, Vec<RecordRow>>,
    #[serde(default)]
    pub expenses: BTreeMap<Period, Vec<RecordRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    /// Identity tuple fields: `[name]` or `[group, account, category]`
    pub label: Vec<String>,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_value: Option<f64>,
}

impl SnapshotDocument {
    pub fn from_store(store: &ConsolidatedStore) -> Self {
        let definitions = store
            .registry
            .units()
            .map(|unit| UnitDefinitions {
                unit: unit.to_string(),
                sales: store.registry.sales_items(unit).cloned().collect(),
                expenses: store.registry.expense_items(unit).cloned().collect(),
            })
            .collect();

        SnapshotDocument {
            settings: store.settings.clone(),
            definitions,
            plan: ledger_records(&store.plan),
            actual: ledger_records(&store.actual),
        }
    }

    /// Queue definitions, then records, into a builder
    pub fn into_builder(self) -> StoreBuilder {
        let mut builder = StoreBuilder::new();
        builder.set_settings(self.settings);
        for definitions in self.definitions {
            builder.register_unit(&definitions.unit);
            for item in definitions.sales {
                builder.define(&definitions.unit, item);
            }
            for item in definitions.expenses {
                builder.define(&definitions.unit, item);
            }
        }

        for (scenario, units) in [(Scenario::Plan, self.plan), (Scenario::Actual, self.actual)] {
            for (unit, records) in units {
                for (kind, months) in [(Kind::Sales, records.sales), (Kind::Expense, records.expenses)] {
                    for (period, rows) in months {
                        for row in rows {
                            builder.add_record(RawRecord {
                                scenario,
                                unit: unit.clone(),
                                kind,
                                period,
                                label: row.label,
                                value: row.value,
                                rest_value: row.rest_value,
                            });
                        }
                    }
                }
            }
        }
        builder
    }
}

fn ledger_records(ledger: &ScenarioLedger) -> BTreeMap<String, UnitRecords> {
    ledger
        .units()
        .map(|(unit, unit_ledger)| {
            let records = UnitRecords {
                sales: series_records(&unit_ledger.sales),
                expenses: series_records(&unit_ledger.expenses),
            };
            (unit.to_string(), records)
        })
        .collect()
}

fn series_records(series: &SeriesMap) -> BTreeMap<Period, Vec<RecordRow>> {
    series
        .iter()
        .map(|(period, month)| {
            let rows = month
                .rows()
                .iter()
                .filter_map(|obs| {
                    Some(RecordRow {
                        label: obs.item.as_ref()?.fields(),
                        value: obs.value,
                        rest_value: obs.rest_value,
                    })
                })
                .collect();
            (*period, rows)
        })
        .collect()
}

// ============================================================================
// FILE I/O
// ============================================================================

pub fn save_snapshot(path: &Path, store: &ConsolidatedStore) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let document = SnapshotDocument::from_store(store);
    let json = serde_json::to_string_pretty(&document)?;
    fs::write(path, json)?;
    info!("Saved snapshot to {}", path.display());
    Ok(())
}

/// Builder seeded from the snapshot; a missing file yields an empty builder
pub fn load_snapshot(path: &Path) -> Result<StoreBuilder> {
    if !path.exists() {
        debug!("no snapshot at {}, starting empty", path.display());
        return Ok(StoreBuilder::new());
    }
    let content = fs::read_to_string(path)?;
    let document: SnapshotDocument = serde_json::from_str(&content)?;
    let builder = document.into_builder();
    info!(
        "Loaded snapshot {} ({} records)",
        path.display(),
        builder.record_count()
    );
    Ok(builder)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AggregationEngine;
    use crate::calendar::YearMonth;
    use crate::items::{CostBehavior, ItemKey};
    use crate::observation::Observation;

    fn period(m: u32) -> Period {
        Period::Month(YearMonth::new(2024, m).unwrap())
    }

    fn sample_store() -> ConsolidatedStore {
        let mut b = StoreBuilder::new();
        b.define("Shared", ExpenseItem::new("Office", "Rent", "Facilities"));
        b.define("Retail", SalesItem::new("Store sales"));
        b.define(
            "Retail",
            ExpenseItem::new("Office", "Rent", "Facilities")
                .with_ratio(1.0)
                .with_fixval(CostBehavior::Fixed),
        );
        let mut store = b.build();
        store
            .merge(
                Scenario::Plan,
                "Shared",
                Kind::Expense,
                period(4),
                [Observation::new(ItemKey::expense("Office", "Rent", "Facilities"), Some(120.0))],
            )
            .unwrap();
        store
            .merge(
                Scenario::Actual,
                "Retail",
                Kind::Sales,
                period(5),
                [Observation::new(ItemKey::sales("Store sales"), Some(80.5))],
            )
            .unwrap();
        AggregationEngine::new().update(&mut store).unwrap();
        store
    }

    #[test]
    fn test_document_round_trip_reproduces_store() {
        let store = sample_store();
        let json = serde_json::to_string(&SnapshotDocument::from_store(&store)).unwrap();
        let document: SnapshotDocument = serde_json::from_str(&json).unwrap();
        let mut reloaded = document.into_builder().build();
        AggregationEngine::new().update(&mut reloaded).unwrap();

        assert_eq!(reloaded.plan, store.plan);
        assert_eq!(reloaded.actual, store.actual);
        assert_eq!(reloaded.settings, store.settings);
        assert_eq!(reloaded.registry.count(), store.registry.count());
    }

    #[test]
    fn test_document_keeps_remainder_and_skips_earnings() {
        let document = SnapshotDocument::from_store(&sample_store());
        let shared = &document.plan["Shared"].expenses[&period(4)];
        assert_eq!(shared[0].rest_value, Some(0.0));
        assert_eq!(shared[0].label, vec!["Office", "Rent", "Facilities"]);

        let json = serde_json::to_string(&document).unwrap();
        assert!(json.contains("\"2024/04\""));
        assert!(!json.contains("Earnings"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshot.json");
        let store = sample_store();
        save_snapshot(&path, &store).unwrap();

        let reloaded = load_snapshot(&path).unwrap().build();
        assert_eq!(reloaded.actual, {
            let mut expected = store.actual.clone();
            for (_, ledger) in expected.units_mut() {
                ledger.earnings.clear();
            }
            expected
        });
    }

    #[test]
    fn test_missing_file_gives_empty_builder() {
        let dir = tempfile::tempdir().unwrap();
        let builder = load_snapshot(&dir.path().join("absent.json")).unwrap();
        assert_eq!(builder.record_count(), 0);
        assert_eq!(builder.build().registry.count(), 0);
    }
}
