//! Normalization of caller supplied valuation, flow and income series.
//!
//! Upstream code hands over its data in whichever shape it happens to hold: a lookup
//! function, a sorted map or a loose collection of `DateAmount`s. Each shape is
//! resolved exactly once, when a request is built, into the canonical form the
//! calculators work with.

use crate::error::AnalyticsError;
use chrono::{Days, NaiveDate};
use core_types::DateAmount;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

/// A caller provided valuation lookup. `None` means "no sample for that date".
pub type ValueLookup = Arc<dyn Fn(NaiveDate) -> Option<Decimal> + Send + Sync>;

/// The accepted shapes for an asset valuation series.
#[derive(Clone)]
pub enum AssetValuesInput {
    /// Used as-is, without range restriction or validation.
    Lookup(ValueLookup),
    /// Lookups delegate to the map.
    Map(BTreeMap<NaiveDate, Decimal>),
    /// Entries outside the request range are dropped; same-dated entries must agree.
    Samples(Vec<DateAmount>),
    /// A series already sanitized by another request.
    Resolved(AssetValueSeries),
}

impl Default for AssetValuesInput {
    fn default() -> Self {
        AssetValuesInput::Map(BTreeMap::new())
    }
}

impl fmt::Debug for AssetValuesInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetValuesInput::Lookup(_) => f.write_str("Lookup(<fn>)"),
            AssetValuesInput::Map(map) => f.debug_tuple("Map").field(map).finish(),
            AssetValuesInput::Samples(samples) => f.debug_tuple("Samples").field(samples).finish(),
            AssetValuesInput::Resolved(series) => f.debug_tuple("Resolved").field(series).finish(),
        }
    }
}

impl From<BTreeMap<NaiveDate, Decimal>> for AssetValuesInput {
    fn from(map: BTreeMap<NaiveDate, Decimal>) -> Self {
        AssetValuesInput::Map(map)
    }
}

impl From<Vec<DateAmount>> for AssetValuesInput {
    fn from(samples: Vec<DateAmount>) -> Self {
        AssetValuesInput::Samples(samples)
    }
}

impl From<AssetValueSeries> for AssetValuesInput {
    fn from(series: AssetValueSeries) -> Self {
        AssetValuesInput::Resolved(series)
    }
}

/// The accepted shapes for a flow or income series.
#[derive(Debug, Clone)]
pub enum FlowsInput {
    /// Sub-mapped to the request range.
    Map(BTreeMap<NaiveDate, Decimal>),
    /// Entries outside the request range are dropped; same-dated entries are summed.
    Samples(Vec<DateAmount>),
}

impl Default for FlowsInput {
    fn default() -> Self {
        FlowsInput::Map(BTreeMap::new())
    }
}

impl From<BTreeMap<NaiveDate, Decimal>> for FlowsInput {
    fn from(map: BTreeMap<NaiveDate, Decimal>) -> Self {
        FlowsInput::Map(map)
    }
}

impl From<Vec<DateAmount>> for FlowsInput {
    fn from(samples: Vec<DateAmount>) -> Self {
        FlowsInput::Samples(samples)
    }
}

/// Canonical valuation series: an optional lookup closure plus a sorted sample map.
///
/// Cloning is cheap; the samples are shared between all requests derived from
/// the same input.
#[derive(Clone, Default)]
pub struct AssetValueSeries {
    lookup: Option<ValueLookup>,
    samples: Arc<BTreeMap<NaiveDate, Decimal>>,
}

impl fmt::Debug for AssetValueSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetValueSeries")
            .field("lookup", &self.lookup.as_ref().map(|_| "<fn>"))
            .field("samples", &self.samples)
            .finish()
    }
}

impl AssetValueSeries {
    /// Resolves `input` for a request covering `[start_incl, end_incl]`.
    pub fn resolve(
        input: AssetValuesInput,
        start_incl: NaiveDate,
        end_incl: NaiveDate,
    ) -> Result<Self, AnalyticsError> {
        match input {
            AssetValuesInput::Lookup(lookup) => Ok(Self {
                lookup: Some(lookup),
                samples: Arc::default(),
            }),
            AssetValuesInput::Map(map) => {
                if let Some((date, value)) = map.iter().find(|(_, v)| **v < Decimal::ZERO) {
                    return Err(AnalyticsError::InvalidArgument(format!(
                        "asset value must not be negative: {value} on {date}"
                    )));
                }
                Ok(Self {
                    lookup: None,
                    samples: Arc::new(map),
                })
            }
            AssetValuesInput::Samples(samples) => {
                let first = day_before(start_incl)?;
                let mut map = BTreeMap::new();
                for sample in samples {
                    if sample.date < first || sample.date > end_incl {
                        continue;
                    }
                    if sample.amount < Decimal::ZERO {
                        return Err(AnalyticsError::InvalidArgument(format!(
                            "asset value must not be negative: {} on {}",
                            sample.amount, sample.date
                        )));
                    }
                    match map.entry(sample.date) {
                        Entry::Vacant(slot) => {
                            slot.insert(sample.amount);
                        }
                        Entry::Occupied(existing) if *existing.get() == sample.amount => {}
                        Entry::Occupied(existing) => {
                            return Err(AnalyticsError::InvalidArgument(format!(
                                "conflicting asset values on {}: {} and {}",
                                sample.date,
                                existing.get(),
                                sample.amount
                            )));
                        }
                    }
                }
                Ok(Self {
                    lookup: None,
                    samples: Arc::new(map),
                })
            }
            AssetValuesInput::Resolved(series) => Ok(series),
        }
    }

    /// The valuation sample at `date`, if one exists.
    pub fn value(&self, date: NaiveDate) -> Option<Decimal> {
        match &self.lookup {
            Some(lookup) => lookup(date),
            None => self.samples.get(&date).copied(),
        }
    }

    /// All dates in `[from, to]` carrying a valuation sample, ascending.
    ///
    /// A lookup function cannot be enumerated, so every day of the range is probed.
    pub fn sample_dates(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        if from > to {
            return Vec::new();
        }
        match &self.lookup {
            Some(lookup) => from
                .iter_days()
                .take_while(|d| *d <= to)
                .filter(|d| lookup(*d).is_some())
                .collect(),
            None => self.samples.range(from..=to).map(|(d, _)| *d).collect(),
        }
    }
}

/// Resolves a flow or income series to a date-unique map restricted to `[start_incl, end_incl]`.
pub fn resolve_flows(
    input: FlowsInput,
    start_incl: NaiveDate,
    end_incl: NaiveDate,
) -> BTreeMap<NaiveDate, Decimal> {
    match input {
        FlowsInput::Map(map) => {
            if start_incl > end_incl {
                return BTreeMap::new();
            }
            map.range(start_incl..=end_incl).map(|(d, v)| (*d, *v)).collect()
        }
        FlowsInput::Samples(samples) => {
            let mut map = BTreeMap::new();
            for sample in samples
                .into_iter()
                .filter(|s| s.date >= start_incl && s.date <= end_incl)
            {
                *map.entry(sample.date).or_insert(Decimal::ZERO) += sample.amount;
            }
            map
        }
    }
}

/// Sum of all amounts dated in `[from, to]`.
pub fn sum_between(series: &BTreeMap<NaiveDate, Decimal>, from: NaiveDate, to: NaiveDate) -> Decimal {
    if from > to {
        return Decimal::ZERO;
    }
    series.range(from..=to).map(|(_, v)| *v).sum()
}

pub(crate) fn day_before(date: NaiveDate) -> Result<NaiveDate, AnalyticsError> {
    date.checked_sub_days(Days::new(1))
        .ok_or_else(|| AnalyticsError::InvalidArgument(format!("date out of range: {date}")))
}
