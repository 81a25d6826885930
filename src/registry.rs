// 📚 Label Registry - canonical item identities per business unit
// Raw (sheet, label) tuples are resolved back to registered identities here.
//
// Unresolved labels are not an error: callers drop the observation.

use crate::error::{PlannerError, Result};
use crate::items::{ExpenseItem, ItemIdentity, ItemKey, Kind, SalesItem};

// ============================================================================
// LABEL QUERY
// ============================================================================

/// Fields to match against registered identities. `None` fields are not
/// compared, so a query may name any subset of an expense triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelQuery<'a> {
    Name(&'a str),
    Expense {
        group: Option<&'a str>,
        account: Option<&'a str>,
        category: Option<&'a str>,
    },
}

impl<'a> LabelQuery<'a> {
    /// Query on the full expense triple
    pub fn expense(group: &'a str, account: &'a str, category: &'a str) -> Self {
        LabelQuery::Expense {
            group: Some(group),
            account: Some(account),
            category: Some(category),
        }
    }

    /// Query on the account only
    pub fn account(account: &'a str) -> Self {
        LabelQuery::Expense {
            group: None,
            account: Some(account),
            category: None,
        }
    }

    /// Build the query that matches a row label read from a sheet
    pub fn from_fields(kind: Kind, fields: &'a [String]) -> Self {
        let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");
        match kind {
            Kind::Sales => LabelQuery::Name(field(0)),
            Kind::Expense => LabelQuery::expense(field(0), field(1), field(2)),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            LabelQuery::Name(_) => Kind::Sales,
            LabelQuery::Expense { .. } => Kind::Expense,
        }
    }

    pub fn matches(&self, identity: &ItemIdentity) -> bool {
        fn same(wanted: Option<&str>, actual: &str) -> bool {
            wanted.map_or(true, |w| w == actual)
        }

        match (self, identity) {
            (LabelQuery::Name(name), ItemIdentity::Sales(item)) => item.name == *name,
            (
                LabelQuery::Expense {
                    group,
                    account,
                    category,
                },
                ItemIdentity::Expense(item),
            ) => {
                same(*group, &item.group)
                    && same(*account, &item.account)
                    && same(*category, &item.category)
            }
            _ => false,
        }
    }
}

// ============================================================================
// UNIT LABELS
// ============================================================================

/// Definitions of one business unit, in registration order
#[derive(Debug, Clone, Default)]
struct UnitLabels {
    name: String,
    sales: Vec<ItemIdentity>,
    expenses: Vec<ItemIdentity>,
}

impl UnitLabels {
    fn items(&self, kind: Kind) -> &[ItemIdentity] {
        match kind {
            Kind::Sales => &self.sales,
            Kind::Expense => &self.expenses,
        }
    }

    fn items_mut(&mut self, kind: Kind) -> &mut Vec<ItemIdentity> {
        match kind {
            Kind::Sales => &mut self.sales,
            Kind::Expense => &mut self.expenses,
        }
    }
}

// ============================================================================
// LABEL REGISTRY
// ============================================================================

/// Registry of every item identity, per business unit and kind.
///
/// Run-scoped: rebuilt from the snapshot and the configuration on every run.
/// Units and items keep the order in which they were first registered.
#[derive(Debug, Clone, Default)]
pub struct LabelRegistry {
    units: Vec<UnitLabels>,
}

impl LabelRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        LabelRegistry { units: Vec::new() }
    }

    /// Make a unit known even if it has no items yet
    pub fn register_unit(&mut self, unit: &str) {
        if self.unit(unit).is_none() {
            self.units.push(UnitLabels {
                name: unit.to_string(),
                ..UnitLabels::default()
            });
        }
    }

    /// Register an identity.
    ///
    /// Identities with a blank key field are ignored. Re-registering an
    /// existing key replaces its attributes in place (last write wins).
    /// Returns true when the registry changed.
    pub fn add(&mut self, unit: &str, identity: impl Into<ItemIdentity>) -> bool {
        let identity = identity.into();
        if !identity.has_key_fields() {
            return false;
        }
        self.register_unit(unit);

        let kind = identity.kind();
        let Some(labels) = self.units.iter_mut().find(|u| u.name == unit) else {
            return false;
        };
        let items = labels.items_mut(kind);
        match items.iter_mut().find(|existing| **existing == identity) {
            Some(existing) => *existing = identity,
            None => items.push(identity),
        }
        true
    }

    /// All identities of a unit/kind; an unknown unit is a configuration gap
    pub fn get_all(&self, unit: &str, kind: Kind) -> Result<&[ItemIdentity]> {
        self.unit(unit)
            .map(|labels| labels.items(kind))
            .ok_or_else(|| PlannerError::UnknownUnit {
                unit: unit.to_string(),
            })
    }

    /// First identity matching every field named in the query
    pub fn resolve(&self, unit: &str, query: &LabelQuery<'_>) -> Option<&ItemIdentity> {
        self.unit(unit)?
            .items(query.kind())
            .iter()
            .find(|identity| query.matches(identity))
    }

    /// Exact lookup by identity tuple
    pub fn lookup(&self, unit: &str, key: &ItemKey) -> Option<&ItemIdentity> {
        self.unit(unit)?
            .items(key.kind())
            .iter()
            .find(|identity| identity.key() == *key)
    }

    pub fn contains_unit(&self, unit: &str) -> bool {
        self.unit(unit).is_some()
    }

    /// Unit names in registration order
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.name.as_str())
    }

    pub fn sales_items<'a>(&'a self, unit: &str) -> impl Iterator<Item = &'a SalesItem> + 'a {
        self.unit(unit)
            .into_iter()
            .flat_map(|labels| labels.sales.iter())
            .filter_map(ItemIdentity::as_sales)
    }

    pub fn expense_items<'a>(&'a self, unit: &str) -> impl Iterator<Item = &'a ExpenseItem> + 'a {
        self.unit(unit)
            .into_iter()
            .flat_map(|labels| labels.expenses.iter())
            .filter_map(ItemIdentity::as_expense)
    }

    /// Total number of registered identities
    pub fn count(&self) -> usize {
        self.units
            .iter()
            .map(|u| u.sales.len() + u.expenses.len())
            .sum()
    }

    fn unit(&self, unit: &str) -> Option<&UnitLabels> {
        self.units.iter().find(|u| u.name == unit)
    }
}

// ============================================================================
// TESTS
// ============================================================================
