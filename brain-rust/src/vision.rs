//! Write-back interface for an external vision module.
//!
//! Camera capture and model inference live outside the brain; what arrives
//! here are projected ground-frame detections. This module provides the two
//! pieces the navigation core depends on:
//!
//! - [`match_detections`]: assign detected points to expected waypoint
//!   positions by minimising the summed squared distance. Exhaustive over
//!   permutations (and subsets when the list lengths differ), which is
//!   factorial: fine for the eight-node track, a known hotspot beyond it.
//! - [`SceneUpdate::apply`]: fold one frame's worth of sightings into the
//!   graph in a single call, so callers can make the whole update atomic by
//!   holding the graph owner's lock around it.
//!
//! Flags are re-derived from scratch on every update: a waypoint seen clear
//! comes back into play, one hidden behind a pylon leaves the graph together
//! with its incident edges, and every segment whose straight line crosses an
//! obstacle's ground ellipse is marked obstructed.

use crate::network::{Network, NodeLabel};

// ── Scene updates ─────────────────────────────────────────────────────────────

/// What the detector saw standing on a waypoint position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// The waypoint itself, clear
    Node,
    /// A pylon occupying the waypoint
    Pylon,
}

/// Projected ground shadow of an obstacle, axis-aligned.
#[derive(Debug, Clone, Copy)]
pub struct GroundEllipse {
    pub x: f64,
    pub y: f64,
    pub rx: f64,
    pub ry: f64,
}

/// One camera frame reduced to graph terms.
#[derive(Debug, Clone, Default)]
pub struct SceneUpdate {
    pub sightings: Vec<(NodeLabel, Sighting)>,
    pub obstacles: Vec<GroundEllipse>,
}

impl SceneUpdate {
    /// Fold this frame into the graph. Call under the graph owner's lock.
    pub fn apply(&self, network: &mut Network) {
        // clean slate: this frame is the complete current truth
        let labels: Vec<NodeLabel> = network.nodes().iter().map(|n| n.label).collect();
        for label in labels {
            if let Ok(node) = network.node_mut(label) {
                node.disabled = false;
            }
        }
        let pairs: Vec<(NodeLabel, NodeLabel)> =
            network.edges().iter().map(|e| (e.a, e.b)).collect();
        for (a, b) in &pairs {
            if let Ok(edge) = network.edge_mut(*a, *b) {
                edge.disabled = false;
                edge.obstructed = false;
            }
        }

        for (label, sighting) in &self.sightings {
            if *sighting == Sighting::Pylon {
                if let Ok(node) = network.node_mut(*label) {
                    node.disabled = true;
                }
                for (a, b) in pairs.iter().filter(|(a, b)| *a == *label || *b == *label) {
                    if let Ok(edge) = network.edge_mut(*a, *b) {
                        edge.disabled = true;
                    }
                }
            }
        }

        for (a, b) in &pairs {
            let (pa, pb) = match (network.node(*a), network.node(*b)) {
                (Ok(na), Ok(nb)) => ((na.x, na.y), (nb.x, nb.y)),
                _ => continue,
            };
            let crossed = self
                .obstacles
                .iter()
                .any(|ellipse| segment_crosses_ellipse(pa, pb, ellipse));
            if crossed {
                if let Ok(edge) = network.edge_mut(*a, *b) {
                    edge.obstructed = true;
                }
            }
        }
    }
}

/// Whether the segment `a`→`b` passes through the ellipse.
pub fn segment_crosses_ellipse(a: (f64, f64), b: (f64, f64), ellipse: &GroundEllipse) -> bool {
    if ellipse.rx <= 0.0 || ellipse.ry <= 0.0 {
        return false;
    }
    // scale the ellipse to a unit circle and measure the distance from its
    // centre to the scaled segment
    let ax = (a.0 - ellipse.x) / ellipse.rx;
    let ay = (a.1 - ellipse.y) / ellipse.ry;
    let bx = (b.0 - ellipse.x) / ellipse.rx;
    let by = (b.1 - ellipse.y) / ellipse.ry;

    let dx = bx - ax;
    let dy = by - ay;
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        ((-ax * dx - ay * dy) / length_sq).clamp(0.0, 1.0)
    };
    let px = ax + t * dx;
    let py = ay + t * dy;
    (px * px + py * py).sqrt() <= 1.0
}

// ── Detection matching ────────────────────────────────────────────────────────

/// A point in the graph's ground frame with the detector's identity string.
#[derive(Debug, Clone)]
pub struct Projected {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// One assignment in a matching; an absent side means the point found no
/// partner.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub detected: Option<String>,
    pub expected: Option<String>,
}

/// Minimum-sum-of-squared-distances assignment between detected and expected
/// positions. Unequal list lengths are handled by trying every subset of the
/// longer list; leftover points come back unpaired.
pub fn match_detections(detected: &[Projected], expected: &[Projected]) -> Vec<Match> {
    if detected.is_empty() && expected.is_empty() {
        return Vec::new();
    }

    let (short, long, detected_is_long) = if detected.len() <= expected.len() {
        (detected, expected, false)
    } else {
        (expected, detected, true)
    };

    let mut best_cost = f64::INFINITY;
    let mut best: Vec<(usize, usize)> = Vec::new(); // (short index, long index)

    for_each_combination(long.len(), short.len(), &mut |chosen| {
        for_each_permutation(chosen.len(), &mut |order| {
            let mut cost = 0.0;
            for (si, &oi) in order.iter().enumerate() {
                let p = &short[si];
                let q = &long[chosen[oi]];
                cost += (p.x - q.x).powi(2) + (p.y - q.y).powi(2);
            }
            if cost < best_cost {
                best_cost = cost;
                best = order
                    .iter()
                    .enumerate()
                    .map(|(si, &oi)| (si, chosen[oi]))
                    .collect();
            }
        });
    });

    let mut matches: Vec<Match> = Vec::new();
    for &(si, li) in &best {
        let (d, e) = if detected_is_long {
            (long[li].id.clone(), short[si].id.clone())
        } else {
            (short[si].id.clone(), long[li].id.clone())
        };
        matches.push(Match {
            detected: Some(d),
            expected: Some(e),
        });
    }
    // leftovers from the longer list come back unpaired
    for (li, point) in long.iter().enumerate() {
        if !best.iter().any(|&(_, matched)| matched == li) {
            matches.push(if detected_is_long {
                Match {
                    detected: Some(point.id.clone()),
                    expected: None,
                }
            } else {
                Match {
                    detected: None,
                    expected: Some(point.id.clone()),
                }
            });
        }
    }
    matches
}

/// Call `f` with every k-subset of `0..n`, in index order.
fn for_each_combination(n: usize, k: usize, f: &mut impl FnMut(&[usize])) {
    fn recurse(
        n: usize,
        k: usize,
        next: usize,
        current: &mut Vec<usize>,
        f: &mut impl FnMut(&[usize]),
    ) {
        if current.len() == k {
            f(current);
            return;
        }
        for i in next..n {
            current.push(i);
            recurse(n, k, i + 1, current, f);
            current.pop();
        }
    }
    let mut current = Vec::with_capacity(k);
    recurse(n, k, 0, &mut current, f);
}

/// Call `f` with every permutation of `0..n`.
fn for_each_permutation(n: usize, f: &mut impl FnMut(&[usize])) {
    fn recurse(items: &mut Vec<usize>, k: usize, f: &mut impl FnMut(&[usize])) {
        if k == items.len() {
            f(items);
            return;
        }
        for i in k..items.len() {
            items.swap(k, i);
            recurse(items, k + 1, f);
            items.swap(k, i);
        }
    }
    let mut items: Vec<usize> = (0..n).collect();
    recurse(&mut items, 0, f);
}
