// 🧮 Aggregation Engine - apportionment, earnings and rollups
// Shared expenses are split across units by configured ratios that must sum
// to exactly 1 per account:
//
//   consumer_value = shared_value × ratio      for every consuming unit
//   shared rest_value = 0                      (everything is distributed)
//
// Earnings and rollups are derived after apportionment, month by month.

use crate::calendar::Period;
use crate::error::{PlannerError, Result};
use crate::items::{CostBehavior, ItemKey, Kind};
use crate::layout::{LabeledValue, RowLabel};
use crate::observation::{MonthlySeries, Observation};
use crate::registry::LabelRegistry;
use crate::store::{ConsolidatedStore, Scenario, ScenarioLedger, UnitLedger, EARNINGS_LABEL};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Default tolerance when checking that ratios sum to 1
pub const RATIO_TOLERANCE: f64 = 1e-7;

/// Decimal places kept by the variable-expense ratio
const RATIO_SCALE: f64 = 10_000.0;

// ============================================================================
// APPORTIONMENT PLAN
// ============================================================================

/// One consuming unit's share of an account
#[derive(Debug, Clone, PartialEq)]
pub struct Share {
    pub unit: String,
    pub key: ItemKey,
    pub ratio: f64,
}

/// Validated shares, per account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApportionmentPlan {
    shares: BTreeMap<String, Vec<Share>>,
}

impl ApportionmentPlan {
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.shares.keys().map(String::as_str)
    }

    pub fn shares(&self, account: &str) -> &[Share] {
        self.shares.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_apportioned(&self, account: &str) -> bool {
        self.shares.contains_key(account)
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

// ============================================================================
// SUMMARIES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApportionmentSummary {
    /// Accounts with configured shares
    pub accounts: usize,

    /// (shared observation, month) pairs that were redistributed
    pub redistributed: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub apportionment: ApportionmentSummary,

    /// Unit-months with derived earnings
    pub earnings_months: usize,
}

// ============================================================================
// ROLLUPS
// ============================================================================

/// Labeled monthly totals ready for a report sub-table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rollup {
    /// Row labels in first-seen order
    pub labels: Vec<RowLabel>,
    pub months: BTreeMap<Period, Vec<LabeledValue>>,
}

impl Rollup {
    fn add(&mut self, period: Period, label: &str, value: f64) {
        let label = RowLabel::single(label);
        if !self.labels.contains(&label) {
            self.labels.push(label.clone());
        }
        let column = self.months.entry(period).or_default();
        match column.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => *entry.value.get_or_insert(0.0) += value,
            None => column.push(LabeledValue::new(label, Some(value))),
        }
    }

    /// Column for a header token; `None` for unknown or marker tokens
    pub fn column(&self, token: &str) -> Option<Vec<LabeledValue>> {
        let period: Period = token.parse().ok()?;
        self.months.get(&period).cloned()
    }

    pub fn value(&self, period: &Period, label: &str) -> Option<f64> {
        self.months
            .get(period)?
            .iter()
            .find(|entry| entry.label.fields() == [label])
            .and_then(|entry| entry.value)
    }
}

/// Fixed/variable split of one unit plus the variable-expense ratio
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixvalRollup {
    pub totals: Rollup,

    /// Variable expenses ÷ sales, truncated to 4 decimals; only months with
    /// positive sales
    pub variable_ratio: BTreeMap<Period, f64>,
}

/// Company-wide view of one scenario
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consolidation {
    /// Sales by item name
    pub sales: Rollup,

    /// Expenses by group
    pub expenses: Rollup,

    /// Grand total sales minus grand total expenses
    pub earnings: BTreeMap<Period, f64>,
}

/// Variable ratio policy: truncate, never round
pub fn truncate_ratio(numerator: f64, denominator: f64) -> f64 {
    (numerator / denominator * RATIO_SCALE).trunc() / RATIO_SCALE
}

// ============================================================================
// AGGREGATION ENGINE
// ============================================================================

pub struct AggregationEngine {
    /// Allowed distance between a ratio total and 1
    tolerance: f64,
}

impl AggregationEngine {
    pub fn new() -> Self {
        AggregationEngine {
            tolerance: RATIO_TOLERANCE,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        AggregationEngine { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Apportion shared expenses, then derive earnings. Fails before touching
    /// the store when any account's ratios do not sum to 1.
    pub fn update(&self, store: &mut ConsolidatedStore) -> Result<UpdateSummary> {
        let apportionment = self.apportion_shared_expenses(store)?;
        let earnings_months = self.derive_earnings(store);
        Ok(UpdateSummary {
            apportionment,
            earnings_months,
        })
    }

    // ------------------------------------------------------------------------
    // Apportionment
    // ------------------------------------------------------------------------

    /// Collect every ratio configured on a non-shared unit and check that each
    /// account's ratios sum to 1
    pub fn apportionment_plan(&self, registry: &LabelRegistry, shared_unit: &str) -> Result<ApportionmentPlan> {
        let mut shares: BTreeMap<String, Vec<Share>> = BTreeMap::new();
        for unit in registry.units().filter(|u| *u != shared_unit) {
            for item in registry.expense_items(unit) {
                if let Some(ratio) = item.ratio {
                    shares.entry(item.account.clone()).or_default().push(Share {
                        unit: unit.to_string(),
                        key: ItemKey::expense(item.group.as_str(), item.account.as_str(), item.category.as_str()),
                        ratio,
                    });
                }
            }
        }

        for (account, account_shares) in &shares {
            let residual = account_shares.iter().fold(1.0_f64, |rest, share| rest - share.ratio);
            if residual.abs() > self.tolerance {
                return Err(PlannerError::RatioMismatch {
                    account: account.clone(),
                    total: 1.0 - residual,
                });
            }
        }
        Ok(ApportionmentPlan { shares })
    }

    /// Redistribute the shared unit's apportioned accounts to the consuming
    /// units, in both scenarios
    pub fn apportion_shared_expenses(&self, store: &mut ConsolidatedStore) -> Result<ApportionmentSummary> {
        let shared_unit = store.settings.shared_unit.clone();
        let plan = self.apportionment_plan(&store.registry, &shared_unit)?;
        let mut summary = ApportionmentSummary {
            accounts: plan.shares.len(),
            redistributed: 0,
        };
        if plan.is_empty() {
            return Ok(summary);
        }

        for scenario in Scenario::ALL {
            let ledger = store.scenario_mut(scenario);
            let origin = take_shared_amounts(ledger, &shared_unit, &plan);
            summary.redistributed += origin.values().map(BTreeMap::len).sum::<usize>();

            for (period, accounts) in origin {
                for (account, value) in accounts {
                    for share in plan.shares(&account) {
                        ledger
                            .ensure_unit(&share.unit)
                            .expenses
                            .entry(period)
                            .or_insert_with(|| MonthlySeries::new(period))
                            .entry(&share.key)
                            .value = Some(value * share.ratio);
                    }
                }
            }
            debug!("{}: apportioned shared expenses", scenario.as_str());
        }

        info!(
            "Apportioned {} accounts across {} shared unit-months",
            summary.accounts, summary.redistributed
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------------
    // Earnings
    // ------------------------------------------------------------------------

    /// Per unit and month: sales total − expense total, stored as a single
    /// "Earnings" observation. Returns the number of unit-months written.
    pub fn derive_earnings(&self, store: &mut ConsolidatedStore) -> usize {
        let mut written = 0;
        for scenario in Scenario::ALL {
            for (_, ledger) in store.scenario_mut(scenario).units_mut() {
                ledger.earnings = unit_earnings(ledger);
                written += ledger.earnings.len();
            }
        }
        written
    }

    // ------------------------------------------------------------------------
    // Rollups
    // ------------------------------------------------------------------------

    /// Expenses of one unit split into fixed and variable costs
    pub fn fixval_rollup(&self, store: &ConsolidatedStore, scenario: Scenario, unit: &str) -> FixvalRollup {
        let mut rollup = FixvalRollup {
            totals: Rollup {
                labels: CostBehavior::ALL.iter().map(|b| RowLabel::single(b.label())).collect(),
                months: BTreeMap::new(),
            },
            ..FixvalRollup::default()
        };
        let Some(ledger) = store.scenario(scenario).unit(unit) else {
            return rollup;
        };

        for period in ledger.periods().into_iter().filter(|p| !p.is_fiscal_year_end()) {
            let mut variable: Option<f64> = None;
            if let Some(series) = ledger.expenses.get(&period) {
                for (key, value) in valued(series) {
                    let behavior = store
                        .registry
                        .lookup(unit, key)
                        .and_then(|identity| identity.as_expense())
                        .and_then(|item| item.fixval);
                    if let Some(behavior) = behavior {
                        rollup.totals.add(period, behavior.label(), value);
                        if behavior == CostBehavior::Variable {
                            *variable.get_or_insert(0.0) += value;
                        }
                    }
                }
            }

            let Some(variable) = variable else {
                continue;
            };
            let sales = ledger.sales.get(&period).map_or(0.0, MonthlySeries::total);
            if sales > 0.0 {
                rollup.variable_ratio.insert(period, truncate_ratio(variable, sales));
            }
        }
        rollup
    }

    /// Expenses of one unit summed by category; categories follow the
    /// registry's definition order
    pub fn category_rollup(&self, store: &ConsolidatedStore, scenario: Scenario, unit: &str) -> Rollup {
        let mut rollup = Rollup::default();
        for item in store.registry.expense_items(unit) {
            let label = RowLabel::single(item.category.as_str());
            if !rollup.labels.contains(&label) {
                rollup.labels.push(label);
            }
        }
        let Some(ledger) = store.scenario(scenario).unit(unit) else {
            return rollup;
        };

        for (period, series) in ledger.expenses.iter().filter(|(p, _)| !p.is_fiscal_year_end()) {
            for (key, value) in valued(series) {
                if let ItemKey::Expense { category, .. } = key {
                    rollup.add(*period, category, value);
                }
            }
        }
        rollup
    }

    /// Roll every unit into one company-wide view. The shared unit contributes
    /// its remainder wherever apportionment recorded one.
    pub fn consolidate(&self, store: &ConsolidatedStore, scenario: Scenario) -> Consolidation {
        let mut consolidation = Consolidation::default();
        let ledger = store.scenario(scenario);

        for unit in store.registry.units() {
            for item in store.registry.sales_items(unit) {
                push_label(&mut consolidation.sales, &item.name);
            }
            for item in store.registry.expense_items(unit) {
                push_label(&mut consolidation.expenses, &item.group);
            }
        }

        let mut sales_total: BTreeMap<Period, f64> = BTreeMap::new();
        let mut expense_total: BTreeMap<Period, f64> = BTreeMap::new();
        for unit in store.registry.units() {
            let Some(unit_ledger) = ledger.unit(unit) else {
                continue;
            };
            for (period, series) in months(unit_ledger, Kind::Sales) {
                for (key, value) in valued(series) {
                    if let ItemKey::Sales { name } = key {
                        consolidation.sales.add(*period, name, value);
                        *sales_total.entry(*period).or_default() += value;
                    }
                }
            }
            for (period, series) in months(unit_ledger, Kind::Expense) {
                for obs in series.rows() {
                    let (Some(ItemKey::Expense { group, .. }), Some(value)) =
                        (obs.item.as_ref(), obs.consolidated_value())
                    else {
                        continue;
                    };
                    consolidation.expenses.add(*period, group, value);
                    *expense_total.entry(*period).or_default() += value;
                }
            }
        }

        let periods: BTreeSet<Period> = sales_total.keys().chain(expense_total.keys()).copied().collect();
        for period in periods {
            let sales = sales_total.get(&period).copied().unwrap_or(0.0);
            let expenses = expense_total.get(&period).copied().unwrap_or(0.0);
            consolidation.earnings.insert(period, sales - expenses);
        }
        consolidation
    }

    /// Accounts whose shared-unit rows are redistributed, for report shading
    pub fn apportioned_accounts(&self, store: &ConsolidatedStore) -> BTreeSet<String> {
        match self.apportionment_plan(&store.registry, &store.settings.shared_unit) {
            Ok(plan) => plan.accounts().map(str::to_string).collect(),
            Err(_) => BTreeSet::new(),
        }
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Zero the shared unit's remainder for apportioned accounts and return the
/// amounts to distribute, per month and account
fn take_shared_amounts(
    ledger: &mut ScenarioLedger,
    shared_unit: &str,
    plan: &ApportionmentPlan,
) -> BTreeMap<Period, BTreeMap<String, f64>> {
    let mut origin: BTreeMap<Period, BTreeMap<String, f64>> = BTreeMap::new();
    let Some(shared) = ledger.unit_mut(shared_unit) else {
        return origin;
    };

    for (period, series) in shared.expenses.iter_mut() {
        if period.is_fiscal_year_end() {
            continue;
        }
        for obs in series.rows_mut() {
            let Some(account) = obs.item.as_ref().and_then(ItemKey::account) else {
                continue;
            };
            let Some(value) = obs.value else {
                continue;
            };
            if !plan.is_apportioned(account) {
                continue;
            }
            let account = account.to_string();
            obs.rest_value = Some(0.0);
            *origin.entry(*period).or_default().entry(account).or_default() += value;
        }
    }
    origin
}

fn unit_earnings(ledger: &UnitLedger) -> BTreeMap<Period, MonthlySeries> {
    ledger
        .periods()
        .into_iter()
        .filter(|period| !period.is_fiscal_year_end())
        .filter_map(|period| {
            let sales = ledger.sales.get(&period);
            let expenses = ledger.expenses.get(&period);
            // Blank months stay blank
            if !sales.is_some_and(MonthlySeries::has_values) && !expenses.is_some_and(MonthlySeries::has_values) {
                return None;
            }
            let sales = sales.map_or(0.0, MonthlySeries::total);
            let expenses = expenses.map_or(0.0, MonthlySeries::total);
            let row = Observation::new(ItemKey::sales(EARNINGS_LABEL), Some(sales - expenses));
            Some((period, MonthlySeries::from_observations(period, [row])))
        })
        .collect()
}

fn months(ledger: &UnitLedger, kind: Kind) -> impl Iterator<Item = (&Period, &MonthlySeries)> {
    ledger.series(kind).iter().filter(|(period, _)| !period.is_fiscal_year_end())
}

fn valued(series: &MonthlySeries) -> impl Iterator<Item = (&ItemKey, f64)> {
    series
        .rows()
        .iter()
        .filter_map(|obs| Some((obs.item.as_ref()?, obs.value?)))
}

fn push_label(rollup: &mut Rollup, label: &str) {
    let label = RowLabel::single(label);
    if !rollup.labels.contains(&label) {
        rollup.labels.push(label);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::YearMonth;
    use crate::items::{ExpenseItem, SalesItem};
    use crate::store::{RawRecord, StoreBuilder};

    fn month(m: u32) -> Period {
        Period::Month(YearMonth::new(2024, m).unwrap())
    }

    fn rec(unit: &str, kind: Kind, label: &[&str], period: Period, value: f64) -> RawRecord {
        RawRecord {
            scenario: Scenario::Plan,
            unit: unit.to_string(),
            kind,
            period,
            label: label.iter().map(|s| s.to_string()).collect(),
            value: Some(value),
            rest_value: None,
        }
    }

    const RENT: [&str; 3] = ["Office", "Rent", "Facilities"];

    /// Shared rent split 60/40 between Retail and Wholesale
    fn builder(retail_ratio: f64, wholesale_ratio: f64) -> StoreBuilder {
        let mut b = StoreBuilder::new();
        b.define("Shared", ExpenseItem::new("Office", "Rent", "Facilities"));
        b.define("Retail", SalesItem::new("Store sales"));
        b.define(
            "Retail",
            ExpenseItem::new("Office", "Rent", "Facilities")
                .with_ratio(retail_ratio)
                .with_fixval(CostBehavior::Fixed),
        );
        b.define(
            "Retail",
            ExpenseItem::new("Stock", "Purchases", "Goods").with_fixval(CostBehavior::Variable),
        );
        b.define("Wholesale", SalesItem::new("Bulk sales"));
        b.define(
            "Wholesale",
            ExpenseItem::new("Office", "Rent", "Facilities").with_ratio(wholesale_ratio),
        );
        b.add_record(rec("Shared", Kind::Expense, &RENT, month(4), 1000.0));
        b.add_record(rec("Shared", Kind::Expense, &RENT, month(5), 500.0));
        b.add_record(rec("Retail", Kind::Sales, &["Store sales"], month(4), 1000.0));
        b.add_record(rec("Retail", Kind::Expense, &["Stock", "Purchases", "Goods"], month(4), 333.0));
        b.add_record(rec("Wholesale", Kind::Sales, &["Bulk sales"], month(4), 2000.0));
        b
    }

    fn rent_value(store: &ConsolidatedStore, unit: &str, period: Period) -> Option<f64> {
        store
            .plan
            .unit(unit)?
            .expenses
            .get(&period)?
            .find(&ItemKey::expense("Office", "Rent", "Facilities"))?
            .value
    }

    #[test]
    fn test_apportionment_conserves_shared_amount() {
        let mut store = builder(0.6, 0.4).build();
        let engine = AggregationEngine::new();
        let summary = engine.apportion_shared_expenses(&mut store).unwrap();

        assert_eq!(summary.accounts, 1);
        assert_eq!(summary.redistributed, 2);
        for (period, origin) in [(month(4), 1000.0), (month(5), 500.0)] {
            let retail = rent_value(&store, "Retail", period).unwrap();
            let wholesale = rent_value(&store, "Wholesale", period).unwrap();
            assert!((retail + wholesale - origin).abs() < 1e-9);

            let shared = store.plan.unit("Shared").unwrap().expenses.get(&period).unwrap();
            assert_eq!(shared.rows()[0].rest_value, Some(0.0));
            assert_eq!(shared.rows()[0].value, Some(origin));
        }
        assert!((rent_value(&store, "Retail", month(4)).unwrap() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_mismatch_is_fatal_and_names_account() {
        let mut store = builder(0.6, 0.3).build();
        let before = store.plan.clone();
        let err = AggregationEngine::new().update(&mut store).unwrap_err();

        match &err {
            PlannerError::RatioMismatch { account, total } => {
                assert_eq!(account, "Rent");
                assert!((total - 0.9).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("0.90000"));
        assert_eq!(store.plan, before);
    }

    #[test]
    fn test_ratio_within_tolerance_passes() {
        let store = builder(0.6, 0.4 + 1e-9).build();
        let plan = AggregationEngine::new()
            .apportionment_plan(&store.registry, "Shared")
            .unwrap();
        assert_eq!(plan.shares("Rent").len(), 2);
        assert!(plan.shares("Salaries").is_empty());
    }

    #[test]
    fn test_months_without_shared_entry_untouched() {
        let mut b = builder(0.6, 0.4);
        b.add_record(rec("Retail", Kind::Expense, &RENT, month(6), 77.0));
        let mut store = b.build();
        AggregationEngine::new().apportion_shared_expenses(&mut store).unwrap();
        assert_eq!(rent_value(&store, "Retail", month(6)), Some(77.0));
    }

    #[test]
    fn test_earnings_sum_all_sales() {
        let mut b = builder(0.6, 0.4);
        b.define("Retail", SalesItem::new("Online sales"));
        b.add_record(rec("Retail", Kind::Sales, &["Online sales"], month(4), 500.0));
        let mut store = b.build();
        let summary = AggregationEngine::new().update(&mut store).unwrap();
        assert!(summary.earnings_months > 0);

        // 1000 + 500 sales, 333 purchases + 600 apportioned rent
        let earnings = store.plan.unit("Retail").unwrap().earnings.get(&month(4)).unwrap();
        assert!((earnings.total() - 567.0).abs() < 1e-9);
        assert!(earnings.find(&ItemKey::sales(EARNINGS_LABEL)).is_some());
    }

    #[test]
    fn test_earnings_skip_blank_months() {
        let mut store = builder(0.6, 0.4).build();
        // A blank row, as left behind by reading an empty sheet column
        store
            .merge(
                Scenario::Plan,
                "Wholesale",
                Kind::Sales,
                month(6),
                [Observation::new(ItemKey::sales("Bulk sales"), None)],
            )
            .unwrap();
        AggregationEngine::new().update(&mut store).unwrap();

        let wholesale = store.plan.unit("Wholesale").unwrap();
        assert!(wholesale.sales.contains_key(&month(6)));
        assert!(!wholesale.earnings.contains_key(&month(6)));
        // May only holds apportioned rent, which is a value
        assert!(wholesale.earnings.contains_key(&month(5)));
    }

    #[test]
    fn test_variable_ratio_truncates() {
        assert_eq!(truncate_ratio(333.0, 1000.0), 0.333);
        assert_eq!(truncate_ratio(2.0, 3.0), 0.6666);
        assert_eq!(truncate_ratio(99_999.0, 100_000.0), 0.9999);
    }

    #[test]
    fn test_fixval_rollup() {
        let mut store = builder(0.6, 0.4).build();
        let engine = AggregationEngine::new();
        engine.update(&mut store).unwrap();
        let rollup = engine.fixval_rollup(&store, Scenario::Plan, "Retail");

        assert_eq!(rollup.totals.labels.len(), 2);
        assert_eq!(rollup.totals.value(&month(4), "Variable costs"), Some(333.0));
        assert!((rollup.totals.value(&month(4), "Fixed costs").unwrap() - 600.0).abs() < 1e-9);
        assert_eq!(rollup.variable_ratio.get(&month(4)), Some(&0.333));
        // May has apportioned rent but no sales: no ratio
        assert!(rollup.variable_ratio.get(&month(5)).is_none());
    }

    #[test]
    fn test_variable_ratio_needs_variable_costs() {
        let mut b = builder(0.6, 0.4);
        b.add_record(rec("Retail", Kind::Sales, &["Store sales"], month(6), 800.0));
        b.add_record(rec("Retail", Kind::Sales, &["Store sales"], month(7), 800.0));
        b.add_record(rec("Retail", Kind::Expense, &["Stock", "Purchases", "Goods"], month(7), 0.0));
        let mut store = b.build();
        let engine = AggregationEngine::new();
        engine.update(&mut store).unwrap();
        let rollup = engine.fixval_rollup(&store, Scenario::Plan, "Retail");

        // Sales without any variable cost row: no ratio
        assert!(rollup.variable_ratio.get(&month(6)).is_none());
        // A zero variable cost still counts
        assert_eq!(rollup.variable_ratio.get(&month(7)), Some(&0.0));
    }

    #[test]
    fn test_category_rollup_follows_definition_order() {
        let mut store = builder(0.6, 0.4).build();
        let engine = AggregationEngine::new();
        engine.update(&mut store).unwrap();
        let rollup = engine.category_rollup(&store, Scenario::Plan, "Retail");

        assert_eq!(rollup.labels, vec![RowLabel::single("Facilities"), RowLabel::single("Goods")]);
        assert_eq!(rollup.value(&month(4), "Goods"), Some(333.0));
        assert_eq!(rollup.column("2024/04").map(|c| c.len()), Some(2));
        assert!(rollup.column("2024.03 settlement").is_none());
    }

    #[test]
    fn test_consolidation_uses_remainder() {
        let mut store = builder(0.6, 0.4).build();
        let engine = AggregationEngine::new();
        engine.update(&mut store).unwrap();
        let consolidated = engine.consolidate(&store, Scenario::Plan);

        // Shared contributes 0, consumers 600 + 400
        assert!((consolidated.expenses.value(&month(4), "Office").unwrap() - 1000.0).abs() < 1e-9);
        assert_eq!(consolidated.expenses.value(&month(4), "Stock"), Some(333.0));
        assert_eq!(consolidated.sales.value(&month(4), "Bulk sales"), Some(2000.0));
        let earnings = consolidated.earnings.get(&month(4)).copied().unwrap();
        assert!((earnings - (3000.0 - 1333.0)).abs() < 1e-9);
    }

    #[test]
    fn test_update_is_repeatable() {
        let mut store = builder(0.6, 0.4).build();
        let engine = AggregationEngine::new();
        engine.update(&mut store).unwrap();
        let first = store.plan.clone();
        engine.update(&mut store).unwrap();
        assert_eq!(store.plan, first);
    }
}
