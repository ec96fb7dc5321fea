use anyhow::{anyhow, bail, Result};
use indexmap::IndexSet;
use rayon::prelude::*;

/// Hard cap on the padded estimated alphabet; past it, factorial enumeration
/// of the relabelings stops being reasonable.
pub const MAX_DISAGREEMENT_CLASSES: usize = 8;

/// Minimum fraction of mismatched labels over all one-to-one relabelings of
/// the estimated classes (sentinel-padded when fewer) onto the true classes;
/// `normalized` divides by the score of the best constant labeling.
pub fn minimum_disagreement(
    true_labels: &[i64],
    estimated_labels: &[i64],
    normalized: bool,
) -> Result<f64> {
    minimum_disagreement_with(true_labels, estimated_labels, fraction_mismatched, normalized)
}

/// `minimum_disagreement` under a caller-supplied disagreement function,
/// used for both the search and the normalization baseline.
pub fn minimum_disagreement_with<F>(
    true_labels: &[i64],
    estimated_labels: &[i64],
    score: F,
    normalized: bool,
) -> Result<f64>
where
    F: Fn(&[i64], &[i64]) -> f64 + Sync,
{
    if true_labels.len() != estimated_labels.len() {
        bail!(
            "label sequences differ in length: {} true vs {} estimated",
            true_labels.len(),
            estimated_labels.len()
        );
    }
    if true_labels.is_empty() {
        bail!("cannot score empty label sequences");
    }

    let true_classes = distinct(true_labels);
    let estimated_classes = distinct(estimated_labels);

    let largest = true_labels
        .iter()
        .chain(estimated_labels)
        .copied()
        .max()
        .unwrap_or(0);
    let sentinel = largest
        .checked_add(1)
        .ok_or_else(|| anyhow!("label values leave no room for a padding sentinel"))?;

    let mut padded = estimated_classes;
    while padded.len() < true_classes.len() {
        padded.push(sentinel);
    }
    if padded.len() > MAX_DISAGREEMENT_CLASSES {
        bail!(
            "{} estimated classes exceed the enumeration cap of {}",
            padded.len(),
            MAX_DISAGREEMENT_CLASSES
        );
    }

    let assignments = permutations_of_length(&padded, true_classes.len());
    let best = assignments
        .par_iter()
        .map(|assignment| {
            let relabeled = relabel(estimated_labels, assignment, &true_classes, sentinel);
            score(true_labels, &relabeled)
        })
        .reduce(|| f64::INFINITY, f64::min);

    if normalized {
        let mut baseline = f64::INFINITY;
        for &class in &true_classes {
            let constant = vec![class; true_labels.len()];
            baseline = baseline.min(score(true_labels, &constant));
        }
        if baseline <= 0.0 {
            bail!("normalization baseline is zero: a constant labeling already matches the true labels");
        }
        return Ok(best / baseline);
    }
    Ok(best)
}

fn fraction_mismatched(a: &[i64], b: &[i64]) -> f64 {
    let mismatched = a.iter().zip(b).filter(|(x, y)| x != y).count();
    mismatched as f64 / a.len() as f64
}

fn distinct(labels: &[i64]) -> Vec<i64> {
    let mut seen: IndexSet<i64> = IndexSet::new();
    for &label in labels {
        seen.insert(label);
    }
    seen.into_iter().collect()
}

// Positions whose estimated label is assignment[k] become true class k;
// everything else becomes the sentinel.
fn relabel(estimated: &[i64], assignment: &[i64], true_classes: &[i64], sentinel: i64) -> Vec<i64> {
    let mut relabeled = vec![sentinel; estimated.len()];
    for (slot, &source) in assignment.iter().enumerate() {
        let target = true_classes[slot];
        for (position, &label) in estimated.iter().enumerate() {
            if label == source {
                relabeled[position] = target;
            }
        }
    }
    relabeled
}

fn permutations_of_length(items: &[i64], k: usize) -> Vec<Vec<i64>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(k);
    let mut used = vec![false; items.len()];
    extend_permutation(items, k, &mut current, &mut used, &mut out);
    out
}

fn extend_permutation(
    items: &[i64],
    k: usize,
    current: &mut Vec<i64>,
    used: &mut Vec<bool>,
    out: &mut Vec<Vec<i64>>,
) {
    if current.len() == k {
        out.push(current.clone());
        return;
    }
    for index in 0..items.len() {
        if used[index] {
            continue;
        }
        used[index] = true;
        current.push(items[index]);
        extend_permutation(items, k, current, used, out);
        current.pop();
        used[index] = false;
    }
}
