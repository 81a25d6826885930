// 🗃️ Consolidated store - plan/actual × unit × kind × month
// Built in one pass by StoreBuilder; every registered unit gets a ledger in
// both scenarios, even when it has no data yet.

use crate::calendar::{Period, DEFAULT_SETTLEMENT_MONTH};
use crate::error::{PlannerError, Result};
use crate::items::{ItemIdentity, Kind};
use crate::observation::{MonthlySeries, Observation};
use crate::registry::{LabelQuery, LabelRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Label of the synthetic earnings row/series
pub const EARNINGS_LABEL: &str = "Earnings";

// ============================================================================
// SCENARIO & SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Plan,
    Actual,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::Plan, Scenario::Actual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Plan => "plan",
            Scenario::Actual => "actual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Month that closes the fiscal year (1-12)
    pub settlement_month: u32,

    /// Pseudo-unit whose expenses are apportioned to the other units
    pub shared_unit: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            settlement_month: DEFAULT_SETTLEMENT_MONTH,
            shared_unit: "Shared".to_string(),
        }
    }
}

// ============================================================================
// LEDGERS
// ============================================================================

pub type SeriesMap = BTreeMap<Period, MonthlySeries>;

/// All months of one unit in one scenario
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitLedger {
    pub sales: SeriesMap,
    pub expenses: SeriesMap,

    /// Derived by the aggregation engine, never read from input
    pub earnings: SeriesMap,
}

impl UnitLedger {
    pub fn series(&self, kind: Kind) -> &SeriesMap {
        match kind {
            Kind::Sales => &self.sales,
            Kind::Expense => &self.expenses,
        }
    }

    pub fn series_mut(&mut self, kind: Kind) -> &mut SeriesMap {
        match kind {
            Kind::Sales => &mut self.sales,
            Kind::Expense => &mut self.expenses,
        }
    }

    pub fn month(&self, kind: Kind, period: &Period) -> Option<&MonthlySeries> {
        self.series(kind).get(period)
    }

    /// Merge observations into the month, creating it when absent
    pub fn merge_month(
        &mut self,
        kind: Kind,
        period: Period,
        rows: impl IntoIterator<Item = Observation>,
    ) {
        self.series_mut(kind)
            .entry(period)
            .or_insert_with(|| MonthlySeries::new(period))
            .merge(rows);
    }

    /// Months carrying sales or expense data, in order
    pub fn periods(&self) -> BTreeSet<Period> {
        self.sales.keys().chain(self.expenses.keys()).copied().collect()
    }
}

/// One scenario (plan or actual) across every unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioLedger {
    units: BTreeMap<String, UnitLedger>,
}

impl ScenarioLedger {
    pub fn unit(&self, unit: &str) -> Option<&UnitLedger> {
        self.units.get(unit)
    }

    pub fn unit_mut(&mut self, unit: &str) -> Option<&mut UnitLedger> {
        self.units.get_mut(unit)
    }

    pub fn ensure_unit(&mut self, unit: &str) -> &mut UnitLedger {
        self.units.entry(unit.to_string()).or_default()
    }

    pub fn units(&self) -> impl Iterator<Item = (&str, &UnitLedger)> {
        self.units.iter().map(|(name, ledger)| (name.as_str(), ledger))
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = (&str, &mut UnitLedger)> {
        self.units.iter_mut().map(|(name, ledger)| (name.as_str(), ledger))
    }
}

// ============================================================================
// CONSOLIDATED STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct ConsolidatedStore {
    pub settings: Settings,
    pub registry: LabelRegistry,
    pub plan: ScenarioLedger,
    pub actual: ScenarioLedger,
}

impl ConsolidatedStore {
    pub fn scenario(&self, scenario: Scenario) -> &ScenarioLedger {
        match scenario {
            Scenario::Plan => &self.plan,
            Scenario::Actual => &self.actual,
        }
    }

    pub fn scenario_mut(&mut self, scenario: Scenario) -> &mut ScenarioLedger {
        match scenario {
            Scenario::Plan => &mut self.plan,
            Scenario::Actual => &mut self.actual,
        }
    }

    /// Merge resolved observations into one unit/kind/month
    pub fn merge(
        &mut self,
        scenario: Scenario,
        unit: &str,
        kind: Kind,
        period: Period,
        rows: impl IntoIterator<Item = Observation>,
    ) -> Result<()> {
        if !self.registry.contains_unit(unit) {
            return Err(PlannerError::UnknownUnit {
                unit: unit.to_string(),
            });
        }
        self.scenario_mut(scenario)
            .ensure_unit(unit)
            .merge_month(kind, period, rows);
        Ok(())
    }
}

// ============================================================================
// STORE BUILDER
// ============================================================================

/// A month record as persisted, before its label is resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub scenario: Scenario,
    pub unit: String,
    pub kind: Kind,
    pub period: Period,
    pub label: Vec<String>,
    pub value: Option<f64>,
    pub rest_value: Option<f64>,
}

/// Collects definitions and raw records, then resolves them all at once
/// against the final registry
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    settings: Settings,
    units: Vec<String>,
    definitions: Vec<(String, ItemIdentity)>,
    records: Vec<RawRecord>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        StoreBuilder::default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn register_unit(&mut self, unit: &str) {
        if !self.units.iter().any(|u| u == unit) {
            self.units.push(unit.to_string());
        }
    }

    /// Queue an identity; later definitions of the same key win
    pub fn define(&mut self, unit: &str, identity: impl Into<ItemIdentity>) {
        self.register_unit(unit);
        self.definitions.push((unit.to_string(), identity.into()));
    }

    pub fn add_record(&mut self, record: RawRecord) {
        self.records.push(record);
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Produce the store. Records whose label does not resolve are dropped.
    pub fn build(self) -> ConsolidatedStore {
        let mut registry = LabelRegistry::new();
        for unit in &self.units {
            registry.register_unit(unit);
        }
        for (unit, identity) in self.definitions {
            registry.add(&unit, identity);
        }

        let mut plan = ScenarioLedger::default();
        let mut actual = ScenarioLedger::default();
        for unit in registry.units() {
            plan.ensure_unit(unit);
            actual.ensure_unit(unit);
        }

        let mut store = ConsolidatedStore {
            settings: self.settings,
            registry,
            plan,
            actual,
        };

        let mut dropped = 0usize;
        for record in self.records {
            let query = LabelQuery::from_fields(record.kind, &record.label);
            let Some(key) = store.registry.resolve(&record.unit, &query).map(|id| id.key()) else {
                debug!(
                    "dropping {} record {:?} for unit '{}' ({}): label not registered",
                    record.kind.as_str(),
                    record.label,
                    record.unit,
                    record.period
                );
                dropped += 1;
                continue;
            };
            let observation = Observation {
                item: Some(key),
                value: record.value,
                rest_value: record.rest_value,
            };
            store
                .scenario_mut(record.scenario)
                .ensure_unit(&record.unit)
                .merge_month(record.kind, record.period, [observation]);
        }
        if dropped > 0 {
            debug!("{} snapshot records did not resolve", dropped);
        }
        store
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ExpenseItem, ItemKey, SalesItem};
    use crate::calendar::YearMonth;

    fn april() -> Period {
        Period::Month(YearMonth::new(2024, 4).unwrap())
    }

    fn record(unit: &str, kind: Kind, label: &[&str], value: f64) -> RawRecord {
        RawRecord {
            scenario: Scenario::Plan,
            unit: unit.to_string(),
            kind,
            period: april(),
            label: label.iter().map(|s| s.to_string()).collect(),
            value: Some(value),
            rest_value: None,
        }
    }

    #[test]
    fn test_build_creates_empty_ledgers_for_every_unit() {
        let mut builder = StoreBuilder::new();
        builder.register_unit("Shared");
        builder.define("Retail", SalesItem::new("Store sales"));
        let store = builder.build();

        for scenario in Scenario::ALL {
            assert!(store.scenario(scenario).unit("Shared").is_some());
            assert!(store.scenario(scenario).unit("Retail").is_some());
        }
        assert!(store.plan.unit("Retail").unwrap().sales.is_empty());
    }

    #[test]
    fn test_build_resolves_and_drops_records() {
        let mut builder = StoreBuilder::new();
        builder.define("Retail", SalesItem::new("Store sales"));
        builder.define("Retail", ExpenseItem::new("Office", "Rent", "Facilities"));
        builder.add_record(record("Retail", Kind::Sales, &["Store sales"], 100.0));
        builder.add_record(record("Retail", Kind::Sales, &["Retired line"], 5.0));
        builder.add_record(record("Retail", Kind::Expense, &["Office", "Rent", "Facilities"], 40.0));
        builder.add_record(record("Ghost", Kind::Sales, &["Store sales"], 1.0));
        let store = builder.build();

        let ledger = store.plan.unit("Retail").unwrap();
        assert_eq!(ledger.month(Kind::Sales, &april()).unwrap().len(), 1);
        assert_eq!(ledger.month(Kind::Expense, &april()).unwrap().total(), 40.0);
        assert!(store.plan.unit("Ghost").is_none());
    }

    #[test]
    fn test_redefinition_updates_attributes_for_existing_observations() {
        let mut builder = StoreBuilder::new();
        builder.define("Retail", ExpenseItem::new("Office", "Rent", "Facilities").with_ratio(0.2));
        builder.add_record(record("Retail", Kind::Expense, &["Office", "Rent", "Facilities"], 40.0));
        builder.define("Retail", ExpenseItem::new("Office", "Rent", "Facilities").with_ratio(0.8));
        let store = builder.build();

        let key = ItemKey::expense("Office", "Rent", "Facilities");
        let identity = store.registry.lookup("Retail", &key).unwrap();
        assert_eq!(identity.as_expense().unwrap().ratio, Some(0.8));
        let obs = store
            .plan
            .unit("Retail")
            .unwrap()
            .month(Kind::Expense, &april())
            .unwrap()
            .find(&key)
            .unwrap();
        assert_eq!(obs.value, Some(40.0));
    }

    #[test]
    fn test_merge_into_unknown_unit_fails() {
        let mut store = StoreBuilder::new().build();
        let result = store.merge(Scenario::Actual, "Retail", Kind::Sales, april(), Vec::new());
        assert!(matches!(result, Err(PlannerError::UnknownUnit { .. })));
    }
}
