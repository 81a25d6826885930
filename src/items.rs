// 🏷️ Item identities - sales line items and expense triples
// Identity is the key tuple; memo, fixval and ratio are attributes that may change

use crate::layout::RowLabel;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

// ============================================================================
// KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Sales,
    Expense,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Sales => "sales",
            Kind::Expense => "expense",
        }
    }
}

// ============================================================================
// COST BEHAVIOR (fixval)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostBehavior {
    Fixed,
    Variable,
}

impl CostBehavior {
    /// Row order of the fixed/variable analysis table
    pub const ALL: [CostBehavior; 2] = [CostBehavior::Fixed, CostBehavior::Variable];

    pub fn label(&self) -> &'static str {
        match self {
            CostBehavior::Fixed => "Fixed costs",
            CostBehavior::Variable => "Variable costs",
        }
    }
}

// ============================================================================
// ITEM KEY (identity tuple)
// ============================================================================

/// The identity tuple of an item. Equality, hashing and ordering are defined
/// on these fields only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKey {
    Sales {
        name: String,
    },
    Expense {
        group: String,
        account: String,
        category: String,
    },
}

impl ItemKey {
    pub fn sales(name: impl Into<String>) -> Self {
        ItemKey::Sales { name: name.into() }
    }

    pub fn expense(
        group: impl Into<String>,
        account: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        ItemKey::Expense {
            group: group.into(),
            account: account.into(),
            category: category.into(),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            ItemKey::Sales { .. } => Kind::Sales,
            ItemKey::Expense { .. } => Kind::Expense,
        }
    }

    /// Key fields in row-label order
    pub fn fields(&self) -> Vec<String> {
        match self {
            ItemKey::Sales { name } => vec![name.clone()],
            ItemKey::Expense {
                group,
                account,
                category,
            } => vec![group.clone(), account.clone(), category.clone()],
        }
    }

    pub fn row_label(&self) -> RowLabel {
        RowLabel::new(self.fields())
    }

    pub fn account(&self) -> Option<&str> {
        match self {
            ItemKey::Expense { account, .. } => Some(account),
            ItemKey::Sales { .. } => None,
        }
    }
}

// ============================================================================
// ITEM DEFINITIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesItem {
    pub name: String,
    #[serde(default)]
    pub memo: String,
}

impl SalesItem {
    pub fn new(name: impl Into<String>) -> Self {
        SalesItem {
            name: name.into(),
            memo: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub group: String,
    pub account: String,
    pub category: String,

    /// Fixed or variable cost; items without one stay out of that rollup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixval: Option<CostBehavior>,

    /// Share of the shared unit's amount for this account (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,

    #[serde(default)]
    pub memo: String,
}

impl ExpenseItem {
    pub fn new(
        group: impl Into<String>,
        account: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        ExpenseItem {
            group: group.into(),
            account: account.into(),
            category: category.into(),
            fixval: None,
            ratio: None,
            memo: String::new(),
        }
    }

    /// Builder: set fixed/variable classification
    pub fn with_fixval(mut self, fixval: CostBehavior) -> Self {
        self.fixval = Some(fixval);
        self
    }

    /// Builder: set apportionment ratio
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }
}

// ============================================================================
// ITEM IDENTITY
// ============================================================================

#[derive(Debug, Clone)]
pub enum ItemIdentity {
    Sales(SalesItem),
    Expense(ExpenseItem),
}

impl ItemIdentity {
    pub fn key(&self) -> ItemKey {
        match self {
            ItemIdentity::Sales(item) => ItemKey::sales(item.name.as_str()),
            ItemIdentity::Expense(item) => ItemKey::expense(
                item.group.as_str(),
                item.account.as_str(),
                item.category.as_str(),
            ),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            ItemIdentity::Sales(_) => Kind::Sales,
            ItemIdentity::Expense(_) => Kind::Expense,
        }
    }

    /// False when the field that names the item is blank
    pub fn has_key_fields(&self) -> bool {
        match self {
            ItemIdentity::Sales(item) => !item.name.trim().is_empty(),
            ItemIdentity::Expense(item) => !item.account.trim().is_empty(),
        }
    }

    pub fn as_sales(&self) -> Option<&SalesItem> {
        match self {
            ItemIdentity::Sales(item) => Some(item),
            ItemIdentity::Expense(_) => None,
        }
    }

    pub fn as_expense(&self) -> Option<&ExpenseItem> {
        match self {
            ItemIdentity::Expense(item) => Some(item),
            ItemIdentity::Sales(_) => None,
        }
    }
}

impl PartialEq for ItemIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ItemIdentity {}

impl Hash for ItemIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<SalesItem> for ItemIdentity {
    fn from(item: SalesItem) -> Self {
        ItemIdentity::Sales(item)
    }
}

impl From<ExpenseItem> for ItemIdentity {
    fn from(item: ExpenseItem) -> Self {
        ItemIdentity::Expense(item)
    }
}

// ============================================================================
// TESTS
// ============================================================================
