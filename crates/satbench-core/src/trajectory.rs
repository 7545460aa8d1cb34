//! Trajectory equivalence checks between solver runs.
//!
//! Used to confirm that a refactored solver build still takes the same
//! search path as the reference build: two runs are behaviorally equivalent
//! when their incumbent trajectories agree on objective, restart counter,
//! and conflicts-until-restart at every index of the common prefix. Solution
//! times are deliberately ignored (they differ between machines), and runs
//! truncated at different points still compare equal when the overlap
//! agrees.

use crate::error::{CompareError, CompareResult};
use crate::record::{BatchResult, SolutionEvent};

/// Compare two trajectories over their common prefix.
pub fn same_trajectory(a: &[SolutionEvent], b: &[SolutionEvent]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| {
        x.objective == y.objective
            && x.restart_counter == y.restart_counter
            && x.conflicts_until_restart == y.conflicts_until_restart
    })
}

/// Compare two batches run for run.
///
/// The batches must cover the same instances with the same number of runs
/// per instance; anything else means the experiment setups differ and the
/// comparison would be meaningless. Returns `Ok(false)` at the first pair
/// of runs whose trajectories disagree.
pub fn same_batch_trajectories(a: &BatchResult, b: &BatchResult) -> CompareResult<bool> {
    let only_a: Vec<&String> = a.keys().filter(|k| !b.contains_key(k.as_str())).collect();
    let only_b: Vec<&String> = b.keys().filter(|k| !a.contains_key(k.as_str())).collect();
    if !only_a.is_empty() || !only_b.is_empty() {
        return Err(CompareError::InstanceSetMismatch {
            detail: format!("only in first batch: {only_a:?}, only in second batch: {only_b:?}"),
        });
    }

    for (instance, runs_a) in a {
        let runs_b = &b[instance];
        if runs_a.len() != runs_b.len() {
            return Err(CompareError::RunCountMismatch {
                instance: instance.clone(),
                left: runs_a.len(),
                right: runs_b.len(),
            });
        }
        for (run_a, run_b) in runs_a.iter().zip(runs_b.iter()) {
            if !same_trajectory(&run_a.solutions, &run_b.solutions) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
