use glam::{Vec3, vec3};

use crate::{element::VH, error::Error, mesh::QMesh};

impl QMesh {
    /// Makes a box with the following topology, spanning from the min point to
    /// the max point.
    ///
    ///  ```text
    ///       7-----------6
    ///      /|          /|
    ///     / |         / |
    ///    4-----------5  |
    ///    |  |        |  |
    ///    |  3--------|--2
    ///    | /         | /
    ///    |/          |/
    ///    0-----------1
    ///  ```
    pub fn quad_box(min: Vec3, max: Vec3) -> Result<Self, Error> {
        const FACES: [[u32; 4]; 6] = [
            [0, 3, 2, 1],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
            [4, 5, 6, 7],
        ];
        let mut qbox = Self::with_capacity(8, 6);
        for i in 0..8u32 {
            // Bits of the corner index, with 2 and 3 swapped so the bottom
            // ring winds around.
            let x = matches!(i % 4, 1 | 2);
            let y = matches!(i % 4, 2 | 3);
            let z = i >= 4;
            qbox.add_vertex(vec3(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            ));
        }
        for face in FACES {
            let verts = face.map(VH::from);
            qbox.add_face(&verts)?;
        }
        Ok(qbox)
    }

    /// Box with quadrilateral faces spanning from the origin to (1, 1, 1).
    pub fn unit_box() -> Result<Self, Error> {
        Self::quad_box(Vec3::ZERO, Vec3::ONE)
    }

    /// Flat grid of `nx` by `ny` square quads of the given size in the XY
    /// plane, facing +Z, with the first vertex at the origin. Vertex `(i, j)`
    /// has index `i + j * (nx + 1)`.
    pub fn quad_grid(nx: usize, ny: usize, size: f32) -> Result<Self, Error> {
        if nx == 0 || ny == 0 {
            return Err(Error::InvalidParameter(format!(
                "grid must have at least one cell, got {nx}x{ny}"
            )));
        }
        let mut grid = Self::with_capacity((nx + 1) * (ny + 1), nx * ny);
        for j in 0..=ny {
            for i in 0..=nx {
                grid.add_vertex(vec3(i as f32 * size, j as f32 * size, 0.0));
            }
        }
        let vert = |i: usize, j: usize| VH::from((i + j * (nx + 1)) as u32);
        for j in 0..ny {
            for i in 0..nx {
                grid.add_face(&[
                    vert(i, j),
                    vert(i + 1, j),
                    vert(i + 1, j + 1),
                    vert(i, j + 1),
                ])?;
            }
        }
        Ok(grid)
    }

    /// Regular tetrahedron centered at the origin with its vertices at the
    /// given distance from the center.
    pub fn tetrahedron(radius: f32) -> Result<Self, Error> {
        let s = radius / 3.0f32.sqrt();
        let mut mesh = Self::with_capacity(4, 4);
        let [a, b, c, d] = [
            vec3(s, s, s),
            vec3(s, -s, -s),
            vec3(-s, s, -s),
            vec3(-s, -s, s),
        ]
        .map(|p| mesh.add_vertex(p));
        mesh.add_tri_face(a, b, c)?;
        mesh.add_tri_face(a, c, d)?;
        mesh.add_tri_face(a, d, b)?;
        mesh.add_tri_face(b, d, c)?;
        Ok(mesh)
    }

    /// A single, isolated triangle.
    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Result<Self, Error> {
        let mut mesh = Self::with_capacity(3, 1);
        let verts = mesh.add_vertices(&[a, b, c]);
        mesh.add_face(&verts)?;
        Ok(mesh)
    }
}

#[cfg(test)]
mod test {
    use crate::{macros::assert_f32_eq, mesh::QMesh};
    use glam::vec3;

    #[test]
    fn t_primitives_are_valid() {
        for mesh in [
            QMesh::unit_box().expect("Cannot create box"),
            QMesh::quad_grid(4, 3, 0.5).expect("Cannot create grid"),
            QMesh::tetrahedron(1.0).expect("Cannot create tetrahedron"),
            QMesh::triangle(
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            )
            .expect("Cannot create triangle"),
        ] {
            mesh.check_topology().expect("Topological errors found");
        }
    }

    #[test]
    fn t_closed_primitives_face_outward() {
        let qbox = QMesh::unit_box().expect("Cannot create box");
        assert_f32_eq!(qbox.volume(), 1.0, 1e-6);
        let tet = QMesh::tetrahedron(1.0).expect("Cannot create tetrahedron");
        assert!(tet.volume() > 0.0);
        for f in tet.faces() {
            let c = tet.face_centroid(f);
            assert!(tet.face_normal(f).dot(c) > 0.0);
        }
    }

    #[test]
    fn t_grid_layout() {
        let grid = QMesh::quad_grid(3, 2, 2.0).expect("Cannot create grid");
        assert_eq!(grid.num_vertices(), 12);
        assert_eq!(grid.num_faces(), 6);
        assert_eq!(grid.point(11.into()), vec3(6.0, 4.0, 0.0));
        for f in grid.faces() {
            assert_eq!(grid.face_normal(f), vec3(0.0, 0.0, 1.0));
        }
        assert!(QMesh::quad_grid(0, 2, 1.0).is_err());
    }
}
