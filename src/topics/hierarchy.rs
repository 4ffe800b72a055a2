//! Agglomerative clustering of topics and dendrogram layout.

/// One merge step. Leaves are `0..n`; the cluster created by merge `k`
/// gets id `n + k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Average-linkage clustering over a symmetric distance matrix.
///
/// Each step merges the closest pair of active clusters (lowest ids first
/// on ties), with the distance between clusters the mean of their
/// pairwise leaf distances.
pub fn average_linkage(dist: &[Vec<f64>]) -> Vec<Merge> {
    let n = dist.len();
    if n < 2 {
        return Vec::new();
    }
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut active: Vec<usize> = (0..n).collect();
    let mut merges = Vec::with_capacity(n - 1);

    let linkage = |a: &[usize], b: &[usize]| -> f64 {
        let total: f64 = a.iter().flat_map(|i| b.iter().map(move |j| dist[*i][*j])).sum();
        total / (a.len() * b.len()) as f64
    };

    while active.len() > 1 {
        let mut best = (0, 1, f64::INFINITY);
        for x in 0..active.len() {
            for y in x + 1..active.len() {
                let d = linkage(&members[active[x]], &members[active[y]]);
                if d < best.2 {
                    best = (x, y, d);
                }
            }
        }
        let (x, y, distance) = best;
        let (left, right) = (active[x], active[y]);
        let mut merged = members[left].clone();
        merged.extend_from_slice(&members[right]);
        merges.push(Merge {
            left,
            right,
            distance,
            size: merged.len(),
        });
        members.push(merged);

        active.remove(y);
        active.remove(x);
        active.push(members.len() - 1);
    }
    merges
}

/// Plot geometry for a dendrogram.
#[derive(Debug, Clone, Default)]
pub struct Dendrogram {
    /// Leaf ids left to right.
    pub leaf_order: Vec<usize>,
    /// Leaf x positions, parallel to `leaf_order`.
    pub leaf_positions: Vec<f64>,
    /// One U-shaped link per merge: four `(x, y)` points.
    pub links: Vec<[(f64, f64); 4]>,
}

/// Lay out `merges` over `n` leaves, leaves at `x = 5, 15, 25, ...`.
pub fn dendrogram(merges: &[Merge], n: usize) -> Dendrogram {
    if n == 0 {
        return Dendrogram::default();
    }
    let mut leaf_order = Vec::with_capacity(n);
    let mut stack = vec![n + merges.len() - 1];
    while let Some(node) = stack.pop() {
        if node < n {
            leaf_order.push(node);
        } else {
            let m = &merges[node - n];
            stack.push(m.right);
            stack.push(m.left);
        }
    }

    let mut x = vec![0.0; n + merges.len()];
    let mut height = vec![0.0; n + merges.len()];
    let leaf_positions: Vec<f64> = (0..n).map(|rank| 5.0 + 10.0 * rank as f64).collect();
    for (rank, leaf) in leaf_order.iter().enumerate() {
        x[*leaf] = leaf_positions[rank];
    }

    let mut links = Vec::with_capacity(merges.len());
    for (k, m) in merges.iter().enumerate() {
        let (xl, yl) = (x[m.left], height[m.left]);
        let (xr, yr) = (x[m.right], height[m.right]);
        links.push([(xl, yl), (xl, m.distance), (xr, m.distance), (xr, yr)]);
        x[n + k] = (xl + xr) / 2.0;
        height[n + k] = m.distance;
    }

    Dendrogram {
        leaf_order,
        leaf_positions,
        links,
    }
}
