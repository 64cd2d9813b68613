use glam::Vec3;

use crate::{error::Error, flat::FlatMesh};

const TABLE_SIZE: usize = 256;

/// Seeded lattice value noise in `[-1, 1]`.
///
/// Random values are attached to the integer lattice and blended with a
/// smoothstep between the eight corners of the cell containing the sample.
/// The same seed always produces the same field.
#[derive(Debug, Clone)]
pub struct ValueNoise {
    perm: [u8; TABLE_SIZE],
    values: [f32; TABLE_SIZE],
}

impl ValueNoise {
    pub fn new(seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut perm = [0u8; TABLE_SIZE];
        for (i, p) in perm.iter_mut().enumerate() {
            *p = i as u8;
        }
        rng.shuffle(&mut perm);
        let mut values = [0f32; TABLE_SIZE];
        for v in values.iter_mut() {
            *v = rng.f32() * 2.0 - 1.0;
        }
        ValueNoise { perm, values }
    }

    fn lattice(&self, x: i32, y: i32, z: i32) -> f32 {
        let hash = |h: usize, c: i32| self.perm[(h + (c & 0xff) as usize) & 0xff] as usize;
        self.values[hash(hash(hash(0, x), y), z)]
    }

    pub fn sample(&self, p: Vec3) -> f32 {
        let cell = p.floor();
        let f = p - cell;
        let s = f * f * (Vec3::splat(3.0) - 2.0 * f);
        let (x, y, z) = (cell.x as i32, cell.y as i32, cell.z as i32);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let edge = |dy: i32, dz: i32| {
            lerp(
                self.lattice(x, y + dy, z + dz),
                self.lattice(x + 1, y + dy, z + dz),
                s.x,
            )
        };
        let face = |dz: i32| lerp(edge(0, dz), edge(1, dz), s.y);
        lerp(face(0), face(1), s.z)
    }
}

/// Move every vertex along its normal by `strength` times the noise sampled
/// at the position scaled by `scale`.
pub(super) fn displace(
    mesh: &FlatMesh,
    strength: f32,
    scale: f32,
    seed: u64,
) -> Result<FlatMesh, Error> {
    if !strength.is_finite() || !scale.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "displace strength {strength} with scale {scale}"
        )));
    }
    let noise = ValueNoise::new(seed);
    let mut out = mesh.clone();
    if out.normals.is_none() {
        out.compute_normals();
    }
    for i in 0..out.num_vertices() {
        let p = out.position(i);
        let n = out.normal(i).unwrap_or_default();
        out.set_position(i, p + n * (strength * noise.sample(p * scale)));
    }
    Ok(out)
}
