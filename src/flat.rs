use glam::{Mat4, Vec2, Vec3, vec3};

use crate::{error::Error, math::Aabb};

/// Flat indexed triangle buffer, the interchange format with renderers, the
/// CSG kernel and the modifier stack.
///
/// `positions` and `normals` have a stride of 3, `uvs` a stride of 2. Every
/// three entries of `indices` make a counter-clockwise triangle.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatMesh {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub uvs: Option<Vec<f32>>,
    pub indices: Vec<u32>,
    pub bounds: Option<Aabb>,
}

impl FlatMesh {
    pub fn new(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        FlatMesh {
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn from_points(points: &[Vec3], indices: Vec<u32>) -> Self {
        Self::new(points.iter().flat_map(|p| p.to_array()).collect(), indices)
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Check the buffer invariants: strides, index range, and the lengths of
    /// the optional attributes.
    pub fn validate(&self) -> Result<(), Error> {
        if self.positions.len() % 3 != 0 {
            return Err(Error::InvalidBuffer(format!(
                "position count {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidBuffer(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let nverts = self.num_vertices();
        if let Some(i) = self.indices.iter().find(|i| **i as usize >= nverts) {
            return Err(Error::InvalidBuffer(format!(
                "index {i} is out of range for {nverts} vertices"
            )));
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(Error::InvalidBuffer(format!(
                    "{} normal components for {} position components",
                    normals.len(),
                    self.positions.len()
                )));
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != nverts * 2 {
                return Err(Error::InvalidBuffer(format!(
                    "{} uv components for {nverts} vertices",
                    uvs.len()
                )));
            }
        }
        Ok(())
    }

    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    pub fn set_position(&mut self, i: usize, p: Vec3) {
        self.positions[i * 3..i * 3 + 3].copy_from_slice(&p.to_array());
    }

    pub fn points(&self) -> impl Iterator<Item = Vec3> + use<'_> {
        self.positions.chunks_exact(3).map(Vec3::from_slice)
    }

    pub fn normal(&self, i: usize) -> Option<Vec3> {
        self.normals
            .as_ref()
            .map(|n| Vec3::from_slice(&n[i * 3..i * 3 + 3]))
    }

    pub fn uv(&self, i: usize) -> Option<Vec2> {
        self.uvs.as_ref().map(|uv| Vec2::from_slice(&uv[i * 2..i * 2 + 2]))
    }

    pub fn triangle(&self, i: usize) -> [u32; 3] {
        [
            self.indices[i * 3],
            self.indices[i * 3 + 1],
            self.indices[i * 3 + 2],
        ]
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + use<'_> {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Unnormalized normal of a triangle, twice its area long.
    pub fn triangle_area_normal(&self, i: usize) -> Vec3 {
        let [a, b, c] = self.triangle(i).map(|v| self.position(v as usize));
        (b - a).cross(c - a)
    }

    /// Volume enclosed by the triangles, positive when they wind
    /// counter-clockwise seen from outside. Only meaningful for closed meshes.
    pub fn signed_volume(&self) -> f32 {
        self.triangles()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.position(i as usize));
                a.dot(b.cross(c))
            })
            .sum::<f32>()
            / 6.0
    }

    /// Recompute vertex normals as area weighted averages of the normals of
    /// the triangles using each vertex.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.num_vertices()];
        for i in 0..self.num_triangles() {
            let n = self.triangle_area_normal(i);
            for v in self.triangle(i) {
                normals[v as usize] += n;
            }
        }
        self.normals = Some(
            normals
                .into_iter()
                .flat_map(|n| n.normalize_or_zero().to_array())
                .collect(),
        );
    }

    pub fn compute_bounds(&mut self) -> Option<Aabb> {
        self.bounds = Aabb::from_points(self.points());
        self.bounds
    }

    /// A copy with all positions transformed. Normals are transformed with the
    /// inverse transpose. A transform that mirrors space also reverses the
    /// triangle winding so the faces keep pointing outward.
    pub fn transformed(&self, xform: &Mat4) -> FlatMesh {
        let positions = self
            .points()
            .flat_map(|p| xform.transform_point3(p).to_array())
            .collect();
        let normal_xform = xform.inverse().transpose();
        let normals = self.normals.as_ref().map(|normals| {
            normals
                .chunks_exact(3)
                .flat_map(|n| {
                    normal_xform
                        .transform_vector3(Vec3::from_slice(n))
                        .normalize_or_zero()
                        .to_array()
                })
                .collect()
        });
        let mut indices = self.indices.clone();
        if xform.determinant() < 0.0 {
            for tri in indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
        let mut out = FlatMesh {
            positions,
            normals,
            uvs: self.uvs.clone(),
            indices,
            bounds: None,
        };
        out.compute_bounds();
        out
    }

    /// Append another buffer, offsetting its indices. Optional attributes are
    /// kept only if both buffers have them.
    pub fn append(&mut self, other: &FlatMesh) {
        let offset = self.num_vertices() as u32;
        self.normals = match (self.normals.take(), &other.normals) {
            (Some(mut a), Some(b)) => {
                a.extend_from_slice(b);
                Some(a)
            }
            _ => None,
        };
        self.uvs = match (self.uvs.take(), &other.uvs) {
            (Some(mut a), Some(b)) => {
                a.extend_from_slice(b);
                Some(a)
            }
            _ => None,
        };
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
        self.bounds = match (self.bounds, other.bounds) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
    }

    /// Reverse the winding of every triangle and flip the normals.
    pub fn flip(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        if let Some(normals) = self.normals.as_mut() {
            normals.iter_mut().for_each(|n| *n = -*n);
        }
    }

    /// Axis aligned cube with 8 shared corners and 12 outward facing
    /// triangles.
    pub fn cube(center: Vec3, size: f32) -> FlatMesh {
        let h = size * 0.5;
        let corners: Vec<Vec3> = (0..8u32)
            .map(|i| {
                center
                    + vec3(
                        if i & 1 == 0 { -h } else { h },
                        if i & 2 == 0 { -h } else { h },
                        if i & 4 == 0 { -h } else { h },
                    )
            })
            .collect();
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 3, 0, 3, 1, // -z
            4, 5, 7, 4, 7, 6, // +z
            0, 1, 5, 0, 5, 4, // -y
            2, 6, 7, 2, 7, 3, // +y
            0, 4, 6, 0, 6, 2, // -x
            1, 3, 7, 1, 7, 5, // +x
        ];
        let mut mesh = FlatMesh::from_points(&corners, indices);
        mesh.compute_normals();
        mesh.compute_bounds();
        mesh
    }
}

#[cfg(test)]
mod test {
    use super::FlatMesh;
    use crate::{error::Error, macros::assert_f32_eq, macros::assert_vec_eq};
    use glam::{Mat4, Vec3, vec3};

    #[test]
    fn t_cube() {
        let cube = FlatMesh::cube(Vec3::ZERO, 2.0);
        cube.validate().expect("Invalid cube");
        assert_eq!(cube.num_vertices(), 8);
        assert_eq!(cube.num_triangles(), 12);
        assert_f32_eq!(cube.signed_volume(), 8.0, 1e-5);
        let bounds = cube.bounds.expect("Missing bounds");
        assert_eq!(bounds.min, vec3(-1.0, -1.0, -1.0));
        // Corner normals point away from the center.
        for i in 0..8 {
            let n = cube.normal(i).expect("Missing normals");
            assert!(n.dot(cube.position(i)) > 0.0);
        }
    }

    #[test]
    fn t_validate() {
        let mut mesh = FlatMesh::new(vec![0.0; 9], vec![0, 1, 3]);
        assert!(matches!(mesh.validate(), Err(Error::InvalidBuffer(_))));
        mesh.indices = vec![0, 1];
        assert!(matches!(mesh.validate(), Err(Error::InvalidBuffer(_))));
        mesh.indices = vec![0, 1, 2];
        assert!(mesh.validate().is_ok());
        mesh.uvs = Some(vec![0.0; 4]);
        assert!(matches!(mesh.validate(), Err(Error::InvalidBuffer(_))));
    }

    #[test]
    fn t_mirror_transform_keeps_orientation() {
        let cube = FlatMesh::cube(vec3(2.0, 0.0, 0.0), 1.0);
        let mirrored = cube.transformed(&Mat4::from_scale(vec3(-1.0, 1.0, 1.0)));
        assert_f32_eq!(mirrored.signed_volume(), 1.0, 1e-5);
        assert_vec_eq!(
            mirrored.bounds.expect("Missing bounds").center(),
            vec3(-2.0, 0.0, 0.0)
        );
    }

    #[test]
    fn t_append() {
        let mut a = FlatMesh::cube(Vec3::ZERO, 1.0);
        let b = FlatMesh::cube(vec3(3.0, 0.0, 0.0), 1.0);
        a.append(&b);
        assert_eq!(a.num_vertices(), 16);
        assert_eq!(a.num_triangles(), 24);
        assert_eq!(*a.indices.iter().max().expect("No indices"), 15);
        assert!(a.normals.is_some());
        assert_eq!(a.bounds.expect("Missing bounds").max.x, 3.5);
        a.validate().expect("Invalid buffer");
    }
}
