//! Replica planning
//!
//! Scaling up fills holes left by earlier removals before appending new
//! indices. Scaling down keeps the lowest indices and removes the rest.

use crate::error::{IchijikuError, Result};
use std::collections::BTreeSet;

/// Parse a `SERVICE=NUM` scale argument
pub fn parse_scale_arg(arg: &str) -> Result<(String, usize)> {
    let invalid = || {
        IchijikuError::Config(format!(
            "Invalid scale argument '{}', expected SERVICE=NUM",
            arg
        ))
    };

    let (name, count) = arg.split_once('=').ok_or_else(invalid)?;
    if name.is_empty() {
        return Err(invalid());
    }
    let count = count.trim().parse().map_err(|_| invalid())?;

    Ok((name.to_string(), count))
}

/// Create/remove operations needed to reach a replica count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalePlan {
    /// Indices of containers to create
    pub to_create: BTreeSet<u32>,
    /// Indices of containers to remove
    pub to_remove: BTreeSet<u32>,
}

impl ScalePlan {
    /// Returns true if nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_remove.is_empty()
    }
}

/// Plan how to go from the current indices to `target` replicas
///
/// `indices` must be sorted ascending and free of duplicates. Fails when the
/// index space is used up before `target` replicas are placed.
pub fn compute_scale_plan(indices: &[u32], target: usize) -> Result<ScalePlan> {
    let mut plan = ScalePlan::default();
    let current = indices.len();

    if target > current {
        let mut left = target - current;
        let mut expected = Some(1u32);

        for &index in indices {
            while left > 0 {
                match expected {
                    Some(candidate) if candidate < index => {
                        plan.to_create.insert(candidate);
                        expected = Some(candidate + 1);
                        left -= 1;
                    }
                    _ => break,
                }
            }
            if left == 0 {
                break;
            }
            expected = index.checked_add(1);
        }

        while left > 0 {
            let next = expected.ok_or_else(|| {
                IchijikuError::Config(format!(
                    "No container index left to scale to {} replicas",
                    target
                ))
            })?;
            plan.to_create.insert(next);
            expected = next.checked_add(1);
            left -= 1;
        }
    } else if target < current {
        plan.to_remove.extend(indices[target..].iter().copied());
    }

    Ok(plan)
}
