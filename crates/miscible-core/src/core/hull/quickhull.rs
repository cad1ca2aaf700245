use super::HullError;
use nalgebra::{DMatrix, DVector};
use slotmap::{SlotMap, new_key_type};
use std::collections::BTreeMap;

/// Points closer than this to a facet plane count as lying on it.
pub(super) const PLANE_EPSILON: f64 = 1e-10;

/// Minimum residual for a point to extend an affine basis.
const AFFINE_EPSILON: f64 = 1e-9;

/// Relative size of a cofactor normal below which a facet is considered flat.
const NORMAL_EPSILON: f64 = 1e-12;

new_key_type! {
    struct FacetId;
}

/// A (d-1)-simplex on the boundary of the hull with its outward unit normal.
#[derive(Debug, Clone)]
pub(super) struct Facet {
    pub vertices: Vec<usize>,
    pub normal: DVector<f64>,
    pub offset: f64,
    outside: Vec<usize>,
}

impl Facet {
    fn through(
        points: &[DVector<f64>],
        vertices: Vec<usize>,
        interior: &DVector<f64>,
    ) -> Result<Self, HullError> {
        let mut normal =
            hyperplane_normal(points, &vertices).ok_or(HullError::NumericalInstability)?;
        let mut offset = normal.dot(&points[vertices[0]]);
        if normal.dot(interior) - offset > 0.0 {
            normal = -normal;
            offset = -offset;
        }
        Ok(Self {
            vertices,
            normal,
            offset,
            outside: Vec::new(),
        })
    }

    /// Signed distance, positive outside the hull.
    #[inline]
    pub fn distance(&self, point: &DVector<f64>) -> f64 {
        self.normal.dot(point) - self.offset
    }

    fn farthest_outside(&self, points: &[DVector<f64>]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &p in &self.outside {
            let dist = self.distance(&points[p]);
            if best.is_none_or(|(_, b)| dist > b) {
                best = Some((p, dist));
            }
        }
        best.map(|(p, _)| p)
    }
}

/// Unit normal of the hyperplane through `vertices` from the cofactors of its edge matrix.
fn hyperplane_normal(points: &[DVector<f64>], vertices: &[usize]) -> Option<DVector<f64>> {
    let origin = &points[vertices[0]];
    let d = origin.len();
    if d < 2 || vertices.len() != d {
        return None;
    }

    let mut edges = DMatrix::<f64>::zeros(d - 1, d);
    let mut scale = 1.0;
    for (row, &v) in vertices[1..].iter().enumerate() {
        let edge = &points[v] - origin;
        scale *= edge.norm();
        edges.set_row(row, &edge.transpose());
    }

    let normal = DVector::from_iterator(
        d,
        (0..d).map(|j| {
            let minor = edges.clone().remove_column(j).determinant();
            if j % 2 == 0 { minor } else { -minor }
        }),
    );
    let norm = normal.norm();
    if norm > NORMAL_EPSILON * scale {
        Some(normal / norm)
    } else {
        None
    }
}

/// Greedily selects up to `limit + 1` affinely independent points.
///
/// Starts from the lexicographically smallest point and repeatedly adds the point
/// farthest from the affine span of the current selection (Gram-Schmidt).
pub(super) fn affinely_independent(points: &[DVector<f64>], limit: usize) -> Vec<usize> {
    let Some(first) = (0..points.len()).min_by(|&a, &b| {
        points[a]
            .as_slice()
            .partial_cmp(points[b].as_slice())
            .unwrap_or(std::cmp::Ordering::Equal)
    }) else {
        return Vec::new();
    };

    let origin = &points[first];
    let mut selected = vec![first];
    let mut basis: Vec<DVector<f64>> = Vec::new();
    while basis.len() < limit {
        let mut best: Option<(usize, f64, DVector<f64>)> = None;
        for (i, point) in points.iter().enumerate() {
            let mut residual = point - origin;
            for direction in &basis {
                let projection = residual.dot(direction);
                residual -= direction * projection;
            }
            let norm = residual.norm();
            if best.as_ref().is_none_or(|(_, b, _)| norm > *b) {
                best = Some((i, norm, residual));
            }
        }
        match best {
            Some((i, norm, residual)) if norm > AFFINE_EPSILON => {
                selected.push(i);
                basis.push(residual / norm);
            }
            _ => break,
        }
    }
    selected
}

fn assign_outside(
    facets: &mut SlotMap<FacetId, Facet>,
    targets: &[FacetId],
    candidates: impl IntoIterator<Item = usize>,
    points: &[DVector<f64>],
) {
    for p in candidates {
        let mut best: Option<(FacetId, f64)> = None;
        for &id in targets {
            let dist = facets[id].distance(&points[p]);
            if dist > PLANE_EPSILON && best.is_none_or(|(_, b)| dist > b) {
                best = Some((id, dist));
            }
        }
        if let Some((id, _)) = best {
            facets[id].outside.push(p);
        }
    }
}

fn without(vertices: &[usize], skip: usize) -> Vec<usize> {
    vertices
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != skip)
        .map(|(_, &v)| v)
        .collect()
}

/// Full convex hull of `points` in d dimensions (d >= 2).
///
/// Facets are kept in a slot arena and processed in arena order, horizon ridges in
/// sorted order, so the output depends only on the input.
pub(super) fn quickhull(points: &[DVector<f64>]) -> Result<Vec<Facet>, HullError> {
    let d = points.first().map_or(0, |p| p.len());
    let simplex = affinely_independent(points, d);
    if d < 2 || simplex.len() < d + 1 {
        return Err(HullError::Degenerate {
            dimension: d,
            required: d + 1,
            found: simplex.len(),
        });
    }

    let interior = simplex
        .iter()
        .fold(DVector::<f64>::zeros(d), |acc, &i| acc + &points[i])
        / (d + 1) as f64;

    let mut facets: SlotMap<FacetId, Facet> = SlotMap::with_key();
    for skip in 0..simplex.len() {
        let mut vertices = without(&simplex, skip);
        vertices.sort_unstable();
        facets.insert(Facet::through(points, vertices, &interior)?);
    }
    let initial: Vec<FacetId> = facets.keys().collect();
    assign_outside(
        &mut facets,
        &initial,
        (0..points.len()).filter(|i| !simplex.contains(i)),
        points,
    );

    loop {
        let Some(eye) = facets
            .values()
            .find(|facet| !facet.outside.is_empty())
            .and_then(|facet| facet.farthest_outside(points))
        else {
            break;
        };

        let visible: Vec<FacetId> = facets
            .iter()
            .filter(|(_, facet)| facet.distance(&points[eye]) > PLANE_EPSILON)
            .map(|(id, _)| id)
            .collect();

        let mut ridges: BTreeMap<Vec<usize>, usize> = BTreeMap::new();
        let mut orphans = Vec::new();
        for id in visible {
            if let Some(facet) = facets.remove(id) {
                for skip in 0..facet.vertices.len() {
                    *ridges.entry(without(&facet.vertices, skip)).or_insert(0) += 1;
                }
                orphans.extend(facet.outside.into_iter().filter(|&p| p != eye));
            }
        }

        let mut created = Vec::new();
        for (mut vertices, count) in ridges {
            if count != 1 {
                continue;
            }
            vertices.push(eye);
            vertices.sort_unstable();
            created.push(facets.insert(Facet::through(points, vertices, &interior)?));
        }
        assign_outside(&mut facets, &created, orphans, points);
    }

    Ok(facets.into_iter().map(|(_, facet)| facet).collect())
}
