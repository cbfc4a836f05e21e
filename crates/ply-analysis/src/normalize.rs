use std::collections::HashMap;

use ply_core::flow::{Flow, Step, Subflow, SubflowPhase, START_PATH};

/// Produces the canonical form of a flow: subflows ordered by lifecycle
/// phase, and each step collection linearized from its start step.
///
/// Takes the flow by value and returns the normalized flow, so a parsed
/// document shared between callers is never mutated in place.
///
/// Step collections without a start step are left in document order; this is
/// a recoverable condition, not an error. Steps unreachable from start are
/// dropped, and links whose target id does not exist are skipped.
/// Normalizing an already-normalized flow yields the identical step order.
pub fn normalize(mut flow: Flow) -> Flow {
    flow.subflows
        .sort_by(|sub1, sub2| phase_rank(sub1).cmp(&phase_rank(sub2)).then_with(|| sub1.id.cmp(&sub2.id)));

    flow.steps = linearize(flow.steps);
    for subflow in &mut flow.subflows {
        subflow.steps = linearize(std::mem::take(&mut subflow.steps));
    }
    flow
}

/// Before subflows sort first, After subflows last, untagged in between.
/// Ties are broken by id in [`normalize`], so equal-phase order is
/// deterministic.
fn phase_rank(subflow: &Subflow) -> u8 {
    match subflow.phase() {
        Some(SubflowPhase::Before) => 0,
        None => 1,
        Some(SubflowPhase::After) => 2,
    }
}

/// Reorders a step collection into depth-first traversal order from its
/// start step.
///
/// At each step, links are followed in document order; this fixes the
/// relative order of sibling branches in the output. A visited set guards
/// against cycles, so every reachable step appears exactly once.
fn linearize(steps: Vec<Step>) -> Vec<Step> {
    let Some(start) = steps.iter().position(|step| step.path == START_PATH) else {
        return steps;
    };

    let index_by_id: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(index, step)| (step.id.as_str(), index))
        .collect();

    let mut visited = vec![false; steps.len()];
    let mut order = Vec::with_capacity(steps.len());
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        if visited[index] {
            continue;
        }
        visited[index] = true;
        order.push(index);
        // Reverse push so the first link's branch is walked first.
        for link in steps[index].links.iter().rev() {
            if let Some(&target) = index_by_id.get(link.to.as_str()) {
                stack.push(target);
            }
        }
    }

    let mut slots: Vec<Option<Step>> = steps.into_iter().map(Some).collect();
    order
        .into_iter()
        .map(|index| slots[index].take().unwrap()) // indices in order are unique
        .collect()
}
