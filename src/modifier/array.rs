use glam::{Mat4, Vec3};

use crate::{error::Error, flat::FlatMesh};

/// How the copies of an array modifier are placed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayMode {
    /// Copy `i` is translated by `i * offset`.
    Linear { offset: Vec3 },
    /// Copies are rotated around the Z axis at evenly spaced angles.
    Circular,
}

impl ArrayMode {
    fn transform(&self, copy: usize, count: usize) -> Mat4 {
        match self {
            ArrayMode::Linear { offset } => Mat4::from_translation(*offset * copy as f32),
            ArrayMode::Circular => {
                Mat4::from_rotation_z(std::f32::consts::TAU * copy as f32 / count as f32)
            }
        }
    }
}

pub(super) fn array(mesh: &FlatMesh, count: usize, mode: ArrayMode) -> Result<FlatMesh, Error> {
    if count == 0 {
        return Err(Error::InvalidParameter(
            "array needs at least one copy".into(),
        ));
    }
    if let ArrayMode::Linear { offset } = mode {
        if !offset.is_finite() {
            return Err(Error::InvalidParameter(format!("array offset {offset}")));
        }
    }
    let mut out = mesh.clone();
    for i in 1..count {
        out.append(&mesh.transformed(&mode.transform(i, count)));
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{ArrayMode, array};
    use crate::{flat::FlatMesh, macros::assert_f32_eq};
    use approx::assert_abs_diff_eq;
    use glam::{Vec3, vec3};

    #[test]
    fn t_linear_copies() {
        let cube = FlatMesh::cube(Vec3::ZERO, 1.0);
        let out = array(
            &cube,
            4,
            ArrayMode::Linear {
                offset: vec3(0.0, 0.0, 1.5),
            },
        )
        .expect("Cannot apply array");
        assert_eq!(out.num_vertices(), 32);
        assert_eq!(out.num_triangles(), 48);
        for i in 0..8 {
            assert_abs_diff_eq!(
                out.position(24 + i),
                cube.position(i) + vec3(0.0, 0.0, 4.5),
                epsilon = 1e-5
            );
        }
        assert_f32_eq!(out.signed_volume(), 4.0, 1e-4);
        out.validate().expect("Invalid output");
    }

    #[test]
    fn t_circular_copies_keep_radius() {
        let cube = FlatMesh::cube(vec3(3.0, 0.0, 0.0), 1.0);
        let out = array(&cube, 4, ArrayMode::Circular).expect("Cannot apply array");
        assert_eq!(out.num_vertices(), 32);
        for copy in 0..4 {
            let center = (0..8)
                .map(|i| out.position(copy * 8 + i))
                .sum::<Vec3>()
                / 8.0;
            assert_f32_eq!(center.truncate().length(), 3.0, 1e-5);
            assert_f32_eq!(center.z, 0.0, 1e-6);
        }
        // The second copy sits a quarter turn away.
        let second = (8..16).map(|i| out.position(i)).sum::<Vec3>() / 8.0;
        assert_abs_diff_eq!(second, vec3(0.0, 3.0, 0.0), epsilon = 1e-5);
        assert_f32_eq!(out.signed_volume(), 4.0, 1e-4);
    }

    #[test]
    fn t_single_copy_and_zero_count() {
        let cube = FlatMesh::cube(Vec3::ZERO, 1.0);
        let out = array(&cube, 1, ArrayMode::Circular).expect("Cannot apply array");
        assert_eq!(out, cube);
        assert!(array(&cube, 0, ArrayMode::Circular).is_err());
    }
}
