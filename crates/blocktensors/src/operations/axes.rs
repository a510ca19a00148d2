//! Queries over axis identifiers.
//!
//! Callers attach an identifier to every axis of a tensor (any `PartialEq`
//! type). These helpers route axes into contraction and SVD groupings.

/// Positions of axes of `a` whose identifier does not occur in `b`.
///
/// ```
/// use blocktensors::operations::uncommon_axes;
///
/// assert_eq!(uncommon_axes(&["l", "s", "r"], &["r", "t"]), vec![0, 1]);
/// ```
pub fn uncommon_axes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<usize> {
    a.iter()
        .enumerate()
        .filter(|(_, id)| !b.contains(*id))
        .map(|(i, _)| i)
        .collect()
}

/// Position pairs `(i, j)` with `a[i] == b[j]`, in the order of `a`.
///
/// Each axis of `b` is matched at most once.
pub fn common_axes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<(usize, usize)> {
    let mut used = vec![false; b.len()];
    let mut pairs = Vec::new();
    for (i, id) in a.iter().enumerate() {
        if let Some(j) = (0..b.len()).find(|&j| !used[j] && b[j] == *id) {
            used[j] = true;
            pairs.push((i, j));
        }
    }
    pairs
}

/// Contraction labels for two tensors from their axis identifiers.
///
/// Shared axes get negative labels `-1, -2, ..` in order of `a`; free axes
/// get positive labels `1, 2, ..`, those of `a` first. The contraction
/// output is therefore ordered free-`a` then free-`b`.
///
/// ```
/// use blocktensors::operations::contraction_labels;
///
/// let (la, lb) = contraction_labels(&['i', 'j', 'k'], &['k', 'l', 'j']);
/// assert_eq!(la, vec![1, -1, -2]);
/// assert_eq!(lb, vec![-2, 2, -1]);
/// ```
pub fn contraction_labels<T: PartialEq>(a: &[T], b: &[T]) -> (Vec<i32>, Vec<i32>) {
    let mut labels_a = vec![0i32; a.len()];
    let mut labels_b = vec![0i32; b.len()];
    let mut next_contracted = -1;
    for (i, j) in common_axes(a, b) {
        labels_a[i] = next_contracted;
        labels_b[j] = next_contracted;
        next_contracted -= 1;
    }
    let mut next_free = 1;
    for label in labels_a.iter_mut().chain(labels_b.iter_mut()) {
        if *label == 0 {
            *label = next_free;
            next_free += 1;
        }
    }
    (labels_a, labels_b)
}
