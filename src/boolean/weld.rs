//! Cleanup of raw kernel output: vertex welding, degenerate and duplicate
//! triangle removal, T-junction repair, and compaction.

use std::collections::{HashMap, HashSet};

use glam::{DVec3, Vec3};

use crate::{flat::FlatMesh, triangulate::triangulate_polygon};

/// Distance from an edge, relative to its length, under which a vertex counts
/// as lying on the edge when the weld tolerance is smaller.
const ON_EDGE_RELATIVE: f64 = 1e-6;

/// Each pass can expose new open edges, so the repair runs a few times.
const T_JUNCTION_PASSES: usize = 4;

fn cell_of(p: DVec3, cell_size: f64) -> (i64, i64, i64) {
    let c = (p / cell_size).floor();
    (c.x as i64, c.y as i64, c.z as i64)
}

/// Map every vertex to a representative within `tolerance` of it, using a
/// spatial hash with cells twice the tolerance.
pub(super) fn weld_map(points: &[DVec3], tolerance: f64) -> Vec<u32> {
    let mut remap: Vec<u32> = (0..points.len() as u32).collect();
    if !(tolerance > 0.0) {
        // Exact matches only.
        let mut seen: HashMap<[u64; 3], u32> = HashMap::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            let key = p.to_array().map(|x| {
                let x = if x == 0.0 { 0.0f64 } else { x };
                x.to_bits()
            });
            remap[i] = *seen.entry(key).or_insert(i as u32);
        }
        return remap;
    }
    let cell_size = tolerance * 2.0;
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        let (cx, cy, cz) = cell_of(*p, cell_size);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if let Some(j) = candidates
                        .iter()
                        .find(|j| points[**j as usize].distance(*p) < tolerance)
                    {
                        found = Some(*j);
                        break 'search;
                    }
                }
            }
        }
        match found {
            Some(j) => remap[i] = j,
            // Only representatives go into the grid.
            None => grid.entry((cx, cy, cz)).or_default().push(i as u32),
        }
    }
    remap
}

/// Canonical rotation of a triangle, smallest index first, keeping the winding.
fn rotate_min_first([a, b, c]: [u32; 3]) -> [u32; 3] {
    if a <= b && a <= c {
        [a, b, c]
    } else if b <= a && b <= c {
        [b, c, a]
    } else {
        [c, a, b]
    }
}

/// Parameter of `p` along the edge from `a` to `b`, if it lies strictly
/// inside the edge within `tolerance`.
fn on_edge(p: DVec3, a: DVec3, b: DVec3, tolerance: f64) -> Option<f64> {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= tolerance * tolerance {
        return None;
    }
    if p.distance(a) < tolerance || p.distance(b) < tolerance {
        return None;
    }
    let t = ab.dot(p - a) / len2;
    if t <= 0.0 || t >= 1.0 {
        return None;
    }
    let tol = tolerance.max(ON_EDGE_RELATIVE * len2.sqrt());
    (p.distance(a + ab * t) <= tol).then_some(t)
}

/// Split triangle edges at vertices lying on them, so that neighbouring
/// triangles meet corner to corner. The kernel cuts polygons independently,
/// leaving vertices in the middle of the edges of the triangles next to them.
///
/// Such an edge has no opposite partner, so only open edges are examined, and
/// only the endpoints of open edges are candidates for splitting. Split
/// triangles are triangulated again without the collinear corners.
pub(super) fn split_t_junctions(
    points: &[DVec3],
    mut tris: Vec<[u32; 3]>,
    tolerance: f64,
) -> Vec<[u32; 3]> {
    for _ in 0..T_JUNCTION_PASSES {
        let directed: HashSet<(u32, u32)> = tris
            .iter()
            .flat_map(|[a, b, c]| [(*a, *b), (*b, *c), (*c, *a)])
            .collect();
        let open: Vec<(u32, u32)> = directed
            .iter()
            .filter(|(a, b)| !directed.contains(&(*b, *a)))
            .copied()
            .collect();
        let mut candidates: Vec<u32> = open.iter().flat_map(|(a, b)| [*a, *b]).collect();
        candidates.sort_unstable();
        candidates.dedup();
        let mut splits: HashMap<(u32, u32), Vec<(f64, u32)>> = HashMap::new();
        for &(a, b) in &open {
            let (pa, pb) = (points[a as usize], points[b as usize]);
            let (lo, hi) = (pa.min(pb) - tolerance, pa.max(pb) + tolerance);
            let mut on: Vec<(f64, u32)> = candidates
                .iter()
                .filter(|v| **v != a && **v != b)
                .filter_map(|v| {
                    let p = points[*v as usize];
                    if p.cmplt(lo).any() || p.cmpgt(hi).any() {
                        return None;
                    }
                    on_edge(p, pa, pb, tolerance).map(|t| (t, *v))
                })
                .collect();
            if on.is_empty() {
                continue;
            }
            on.sort_by(|x, y| x.0.total_cmp(&y.0));
            splits.insert((a, b), on);
        }
        if splits.is_empty() {
            break;
        }
        let before = tris.len();
        let mut out = Vec::with_capacity(before + splits.len() * 2);
        for tri in tris {
            let [a, b, c] = tri;
            if [(a, b), (b, c), (c, a)]
                .iter()
                .all(|e| !splits.contains_key(e))
            {
                out.push(tri);
                continue;
            }
            let mut poly = Vec::with_capacity(6);
            for (x, y) in [(a, b), (b, c), (c, a)] {
                poly.push(x);
                if let Some(on) = splits.get(&(x, y)) {
                    poly.extend(on.iter().map(|(_, v)| *v));
                }
            }
            let flat: Vec<Vec3> = poly.iter().map(|v| points[*v as usize].as_vec3()).collect();
            out.extend(
                triangulate_polygon(&flat)
                    .into_iter()
                    .map(|t| rotate_min_first(t.map(|i| poly[i]))),
            );
        }
        tracing::debug!(
            "Split {} edges at T-junctions, {before} triangles became {}",
            splits.len(),
            out.len()
        );
        tris = out;
    }
    tris
}

/// Weld, drop triangles that collapse or fall under `min_area`, drop repeated
/// triangles, remove pairs of opposite facing coincident triangles, split
/// edges at T-junctions, and discard unused vertices. Normals and uvs are
/// dropped; the caller recomputes normals.
pub(super) fn clean(raw: &FlatMesh, tolerance: f64, min_area: f64) -> FlatMesh {
    let points: Vec<DVec3> = raw.points().map(|p| p.as_dvec3()).collect();
    let remap = weld_map(&points, tolerance);
    let mut tris: Vec<[u32; 3]> = Vec::with_capacity(raw.num_triangles());
    let mut index: HashMap<[u32; 3], usize> = HashMap::new();
    let mut dropped = 0usize;
    for tri in raw.triangles() {
        let [a, b, c] = tri.map(|i| remap[i as usize]);
        if a == b || b == c || c == a {
            dropped += 1;
            continue;
        }
        let [pa, pb, pc] = [a, b, c].map(|i| points[i as usize]);
        if (pb - pa).cross(pc - pa).length() * 0.5 < min_area {
            dropped += 1;
            continue;
        }
        let key = rotate_min_first([a, b, c]);
        if index.contains_key(&key) {
            dropped += 1;
            continue;
        }
        let opposite = rotate_min_first([a, c, b]);
        if let Some(j) = index.remove(&opposite) {
            // Two coincident faces with opposite orientation enclose no
            // volume.
            tris[j] = [u32::MAX; 3];
            dropped += 2;
            continue;
        }
        index.insert(key, tris.len());
        tris.push(key);
    }
    tris.retain(|t| t[0] != u32::MAX);
    let tris = split_t_junctions(&points, tris, tolerance.max(f64::EPSILON));
    let mut compact: Vec<Option<u32>> = vec![None; points.len()];
    let mut positions = Vec::new();
    let mut indices = Vec::with_capacity(tris.len() * 3);
    for tri in &tris {
        for &v in tri {
            let i = match compact[v as usize] {
                Some(i) => i,
                None => {
                    let i = (positions.len() / 3) as u32;
                    positions.extend_from_slice(&raw.position(v as usize).to_array());
                    compact[v as usize] = Some(i);
                    i
                }
            };
            indices.push(i);
        }
    }
    if dropped > 0 {
        tracing::debug!("Dropped {dropped} degenerate or duplicate triangles");
    }
    FlatMesh::new(positions, indices)
}

#[cfg(test)]
mod test {
    use super::{clean, split_t_junctions, weld_map};
    use crate::flat::FlatMesh;
    use glam::{DVec3, Vec3, vec3};
    use std::collections::HashSet;

    /// Directed edges without an opposite partner.
    fn open_edges(tris: &[[u32; 3]]) -> usize {
        let directed: HashSet<(u32, u32)> = tris
            .iter()
            .flat_map(|[a, b, c]| [(*a, *b), (*b, *c), (*c, *a)])
            .collect();
        directed
            .iter()
            .filter(|(a, b)| !directed.contains(&(*b, *a)))
            .count()
    }

    #[test]
    fn t_weld_map() {
        let points = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0 + 1e-7, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 1e-7),
        ];
        assert_eq!(weld_map(&points, 1e-5), vec![0, 1, 1, 0]);
        assert_eq!(weld_map(&points, 0.0), vec![0, 1, 2, 3]);
    }

    #[test]
    fn t_clean_soup() {
        let cube = FlatMesh::cube(Vec3::ZERO, 1.0);
        let points: Vec<Vec3> = cube
            .indices
            .iter()
            .map(|i| cube.position(*i as usize))
            .collect();
        let mut soup = FlatMesh::from_points(&points, (0..36).collect());
        // A repeated triangle and a sliver.
        soup.append(&FlatMesh::from_points(
            &[points[0], points[1], points[2]],
            vec![0, 1, 2],
        ));
        soup.append(&FlatMesh::from_points(
            &[points[0], points[1], points[0].lerp(points[1], 0.5)],
            vec![0, 1, 2],
        ));
        let cleaned = clean(&soup, 1e-5, 1e-12);
        assert_eq!(cleaned.num_vertices(), 8);
        assert_eq!(cleaned.num_triangles(), 12);
        cleaned.validate().expect("Invalid buffer");
    }

    #[test]
    fn t_clean_removes_opposite_pairs() {
        let p = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)];
        let mesh = FlatMesh::from_points(&p, vec![0, 1, 2, 0, 2, 1]);
        let cleaned = clean(&mesh, 1e-5, 0.0);
        assert_eq!(cleaned.num_triangles(), 0);
        assert_eq!(cleaned.num_vertices(), 0);
    }

    #[test]
    fn t_split_t_junctions() {
        /*
         * 2 ------- 3
         * | \     / |
         * |    4    |
         * | /  |  \ |
         * 0 -- 5 -- 1
         *  \       /
         *      6
         *
         * The triangle below has its top edge running from 1 to 0 and does
         * not know about 5.
         */
        let points = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
            DVec3::new(2.0, 2.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, -1.0, 0.0),
        ];
        let tris = vec![
            [0, 5, 4],
            [5, 1, 4],
            [1, 3, 4],
            [3, 2, 4],
            [2, 0, 4],
            [1, 0, 6],
        ];
        assert_eq!(open_edges(&tris), 8);
        let fixed = split_t_junctions(&points, tris, 1e-9);
        assert_eq!(fixed.len(), 7);
        assert!(fixed.iter().any(|t| t.contains(&5) && t.contains(&6)));
        // Only the outer boundary is left open.
        assert_eq!(open_edges(&fixed), 5);
    }

    #[test]
    fn t_split_ignores_vertices_off_the_edge() {
        let points = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(1.0, 1e-3, 0.0),
            DVec3::new(1.0, 1.0, 1.0),
        ];
        let tris = vec![[0, 1, 2], [0, 3, 4]];
        assert_eq!(split_t_junctions(&points, tris.clone(), 1e-5), tris);
    }
}
