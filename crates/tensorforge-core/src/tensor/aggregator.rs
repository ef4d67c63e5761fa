//! Reduce aggregators.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensorError};

/// How the cells along reduced dimensions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Aggregator {
    Avg,
    Count,
    Max,
    Min,
    Prod,
    Sum,
}

impl Aggregator {
    pub const ALL: [Aggregator; 6] = [
        Aggregator::Avg,
        Aggregator::Count,
        Aggregator::Max,
        Aggregator::Min,
        Aggregator::Prod,
        Aggregator::Sum,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Aggregator::Avg => "avg",
            Aggregator::Count => "count",
            Aggregator::Max => "max",
            Aggregator::Min => "min",
            Aggregator::Prod => "prod",
            Aggregator::Sum => "sum",
        }
    }

    pub(crate) fn accumulator(self) -> Accumulator {
        Accumulator {
            aggregator: self,
            value: match self {
                Aggregator::Prod => 1.0,
                Aggregator::Max => f64::NEG_INFINITY,
                Aggregator::Min => f64::INFINITY,
                _ => 0.0,
            },
            count: 0,
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Aggregator::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown aggregator '{}'", s))
    }
}

/// Running state of one output cell of a reduce.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Accumulator {
    aggregator: Aggregator,
    value: f64,
    count: usize,
}

impl Accumulator {
    #[inline]
    pub(crate) fn add(&mut self, value: f64) {
        self.count += 1;
        match self.aggregator {
            Aggregator::Avg | Aggregator::Sum => self.value += value,
            Aggregator::Count => {}
            Aggregator::Max => self.value = self.value.max(value),
            Aggregator::Min => self.value = self.value.min(value),
            Aggregator::Prod => self.value *= value,
        }
    }

    /// The aggregate; sum, prod and count have an identity for no cells.
    pub(crate) fn finish(&self) -> Result<f64> {
        match self.aggregator {
            Aggregator::Sum | Aggregator::Prod => Ok(self.value),
            Aggregator::Count => Ok(self.count as f64),
            _ if self.count == 0 => Err(TensorError::EmptyAggregation {
                aggregator: self.aggregator,
            }),
            Aggregator::Avg => Ok(self.value / self.count as f64),
            Aggregator::Max | Aggregator::Min => Ok(self.value),
        }
    }
}
