//! Turns an optimal [`SolveResult`] back into an item → bin assignment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::Bottleneck;
use crate::error::DecodeError;
use crate::model::AssignmentModel;
use crate::solver::SolveResult;

/// Indicator values above this count as "placed".
pub const NONZERO_TOLERANCE: f64 = 1e-6;

/// Relative slack allowed between the engine's `W` and the realized bottleneck.
const BOTTLENECK_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Item identifier → bin identifier.
    pub assignment: BTreeMap<String, String>,
    /// Heaviest bin load (lightest for maximin).
    pub bottleneck: f64,
    /// Bin identifier → summed item weight. Every bin appears, empty ones with 0.
    pub loads: BTreeMap<String, f64>,
}

impl Solution {
    pub fn bin_of(&self, item: &str) -> Option<&str> {
        self.assignment.get(item).map(String::as_str)
    }

    /// Items in `bin`, in identifier order.
    pub fn items_in<'a>(&'a self, bin: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.assignment
            .iter()
            .filter(move |(_, b)| b.as_str() == bin)
            .map(|(item, _)| item.as_str())
    }
}

/// Decode `result` against the model it was solved from.
///
/// Each item must have exactly one non-zero indicator. Loads are summed from
/// the input weights, and the bottleneck derived from them has to agree with
/// the engine's `W`.
pub fn decode(result: &SolveResult, model: &AssignmentModel) -> Result<Solution, DecodeError> {
    if !result.is_optimal() {
        return Err(DecodeError::NotOptimal {
            status: result.status(),
        });
    }

    let bins = model.bins();
    let mut assignment = BTreeMap::new();
    let mut loads: Vec<f64> = vec![0.0; bins.len()];

    for (i, item) in model.items().iter().enumerate() {
        let n = placed_bin(result, model, i)?;
        loads[n] += item.weight;
        assignment.insert(item.id.clone(), bins[n].id.clone());
    }

    let realized = match model.direction() {
        Bottleneck::Minimax => loads.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Bottleneck::Maximin => loads.iter().copied().fold(f64::INFINITY, f64::min),
    };
    let var = model.bottleneck_var();
    let reported = result.value(var).ok_or(DecodeError::MissingValue(var))?;
    if (reported - realized).abs() > BOTTLENECK_TOLERANCE * realized.abs().max(1.0) {
        return Err(DecodeError::BottleneckMismatch { reported, realized });
    }

    debug!(
        items = assignment.len(),
        bottleneck = realized,
        "decoded assignment"
    );

    Ok(Solution {
        assignment,
        bottleneck: realized,
        loads: bins
            .iter()
            .zip(loads)
            .map(|(bin, load)| (bin.id.clone(), load))
            .collect(),
    })
}

/// Position of the single bin holding item `i`.
fn placed_bin(
    result: &SolveResult,
    model: &AssignmentModel,
    i: usize,
) -> Result<usize, DecodeError> {
    let mut placed = Vec::new();
    for n in 0..model.bins().len() {
        let var = model.assign_var(i, n);
        let value = result.value(var).ok_or(DecodeError::MissingValue(var))?;
        if value.abs() > NONZERO_TOLERANCE {
            placed.push(n);
        }
    }

    let item = &model.items()[i].id;
    match placed.as_slice() {
        [n] => Ok(*n),
        [] => Err(DecodeError::Unassigned { item: item.clone() }),
        _ => Err(DecodeError::MultipleBins {
            item: item.clone(),
            bins: placed
                .iter()
                .map(|&n| model.bins()[n].id.clone())
                .collect(),
        }),
    }
}
