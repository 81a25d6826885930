// 🧾 Monthly observations - one month of labeled values for a unit/kind
// Merge replaces observations with the same identity tuple and appends the rest.

use crate::calendar::Period;
use crate::items::ItemKey;
use crate::layout::LabeledValue;
use serde::{Deserialize, Serialize};

// ============================================================================
// OBSERVATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Identity tuple; `None` when the source label could not be resolved
    pub item: Option<ItemKey>,

    pub value: Option<f64>,

    /// Unapportioned remainder, recorded on the shared unit only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_value: Option<f64>,
}

impl Observation {
    pub fn new(item: ItemKey, value: Option<f64>) -> Self {
        Observation {
            item: Some(item),
            value,
            rest_value: None,
        }
    }

    /// Observation whose label did not resolve against the registry
    pub fn unresolved(value: Option<f64>) -> Self {
        Observation {
            item: None,
            value,
            rest_value: None,
        }
    }

    /// Amount that counts toward company-wide totals: the remainder when one
    /// was recorded, the raw value otherwise
    pub fn consolidated_value(&self) -> Option<f64> {
        self.value.map(|value| self.rest_value.unwrap_or(value))
    }
}

// ============================================================================
// MONTHLY SERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub period: Period,
    rows: Vec<Observation>,
}

impl MonthlySeries {
    pub fn new(period: Period) -> Self {
        MonthlySeries {
            period,
            rows: Vec::new(),
        }
    }

    /// Build a series, applying the same rules as `merge`
    pub fn from_observations(
        period: Period,
        rows: impl IntoIterator<Item = Observation>,
    ) -> Self {
        let mut series = MonthlySeries::new(period);
        series.merge(rows);
        series
    }

    /// Merge without duplicating identities.
    ///
    /// Observations without an identity are dropped, never stored.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Observation>) {
        for row in incoming {
            let Some(key) = row.item.as_ref() else {
                continue;
            };
            match self.rows.iter().position(|r| r.item.as_ref() == Some(key)) {
                Some(idx) => self.rows[idx] = row,
                None => self.rows.push(row),
            }
        }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Observation] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, key: &ItemKey) -> Option<&Observation> {
        self.rows.iter().find(|r| r.item.as_ref() == Some(key))
    }

    /// Observation for `key`, created with no value when absent
    pub fn entry(&mut self, key: &ItemKey) -> &mut Observation {
        let idx = match self.rows.iter().position(|r| r.item.as_ref() == Some(key)) {
            Some(idx) => idx,
            None => {
                self.rows.push(Observation::new(key.clone(), None));
                self.rows.len() - 1
            }
        };
        &mut self.rows[idx]
    }

    /// Sum of every observation that carries a value
    pub fn total(&self) -> f64 {
        self.rows.iter().filter_map(|r| r.value).sum()
    }

    /// Whether any observation carries a value
    pub fn has_values(&self) -> bool {
        self.rows.iter().any(|r| r.value.is_some())
    }

    /// Rows for the layout engine; rows lacking an identity or a value are
    /// left out
    pub fn labeled_values(&self) -> Vec<LabeledValue> {
        self.rows
            .iter()
            .filter_map(|r| {
                let key = r.item.as_ref()?;
                r.value.map(|value| LabeledValue::new(key.row_label(), Some(value)))
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
