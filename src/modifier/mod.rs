//! Non-destructive modifier stack over flat triangle buffers.
//!
//! Modifiers never touch the half-edge layer. Each one reads a [`FlatMesh`]
//! and produces a new one, and the stack feeds the output of every enabled
//! modifier into the next.
//!
//! ```
//! use glam::Vec3;
//! use qmesh::{ArrayMode, FlatMesh, Modifier, ModifierKind, ModifierStack};
//!
//! let mut stack = ModifierStack::new();
//! stack.push(Modifier::new(
//!     "row",
//!     ModifierKind::Array {
//!         count: 3,
//!         mode: ArrayMode::Linear { offset: Vec3::X * 2.0 },
//!     },
//! ));
//! stack.push(Modifier::new("smooth", ModifierKind::Subdivision { levels: 1 }));
//! let out = stack.apply(&FlatMesh::cube(Vec3::ZERO, 1.0)).unwrap();
//! assert_eq!(out.num_triangles(), 3 * 12 * 4);
//! ```

mod array;
mod displace;
mod mirror;
mod solidify;
mod subdivide;

use glam::Vec3;

use crate::{error::Error, flat::FlatMesh};

pub use array::ArrayMode;
pub use displace::ValueNoise;

/// Coordinate axis, used as the normal of the mirror plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// The generative transform of a modifier and its parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierKind {
    /// Reflect a copy of the mesh across the plane `axis = offset`.
    Mirror {
        axis: Axis,
        offset: f32,
        /// Mirrored vertices within this distance of the plane are welded to
        /// their originals. Zero disables welding.
        merge_threshold: f32,
    },
    Array { count: usize, mode: ArrayMode },
    /// Thicken the surface into a shell.
    Solidify { thickness: f32, offset: f32 },
    /// Push vertices along their normals by a procedural noise field.
    Displace { strength: f32, scale: f32, seed: u64 },
    /// Loop subdivision, applied `levels` times.
    Subdivision { levels: usize },
}

impl ModifierKind {
    pub fn apply(&self, mesh: &FlatMesh) -> Result<FlatMesh, Error> {
        let mut out = match self {
            ModifierKind::Mirror {
                axis,
                offset,
                merge_threshold,
            } => mirror::mirror(mesh, *axis, *offset, *merge_threshold)?,
            ModifierKind::Array { count, mode } => array::array(mesh, *count, *mode)?,
            ModifierKind::Solidify { thickness, offset } => {
                solidify::solidify(mesh, *thickness, *offset)?
            }
            ModifierKind::Displace {
                strength,
                scale,
                seed,
            } => displace::displace(mesh, *strength, *scale, *seed)?,
            ModifierKind::Subdivision { levels } => subdivide::subdivide(mesh, *levels),
        };
        out.compute_normals();
        out.compute_bounds();
        Ok(out)
    }

    /// Lower case name of the variant, used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            ModifierKind::Mirror { .. } => "mirror",
            ModifierKind::Array { .. } => "array",
            ModifierKind::Solidify { .. } => "solidify",
            ModifierKind::Displace { .. } => "displace",
            ModifierKind::Subdivision { .. } => "subdivision",
        }
    }
}

/// A named entry of the stack that can be switched off without removing it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifier {
    pub name: String,
    pub enabled: bool,
    pub kind: ModifierKind,
}

impl Modifier {
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Modifier {
            name: name.into(),
            enabled: true,
            kind,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Evaluate the modifiers in order on top of `base`.
///
/// Disabled modifiers are skipped. The base mesh is never modified; with no
/// enabled modifiers the result is a copy of it.
pub fn apply_modifier_stack(modifiers: &[Modifier], base: &FlatMesh) -> Result<FlatMesh, Error> {
    base.validate()?;
    let mut mesh = base.clone();
    for m in modifiers.iter().filter(|m| m.enabled) {
        mesh = m.kind.apply(&mesh)?;
        tracing::debug!(
            "Applied {} modifier '{}': {} vertices, {} triangles",
            m.kind.label(),
            m.name,
            mesh.num_vertices(),
            mesh.num_triangles()
        );
    }
    Ok(mesh)
}

/// Ordered list of modifiers.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModifierStack {
    modifiers: Vec<Modifier>,
}

impl ModifierStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Modifier> {
        self.modifiers.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.iter()
    }

    pub fn push(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    fn check_index(&self, i: usize) -> Result<(), Error> {
        if i < self.modifiers.len() {
            Ok(())
        } else {
            Err(Error::InvalidParameter(format!(
                "modifier index {i} is out of range for a stack of {}",
                self.modifiers.len()
            )))
        }
    }

    pub fn remove(&mut self, i: usize) -> Result<Modifier, Error> {
        self.check_index(i)?;
        Ok(self.modifiers.remove(i))
    }

    pub fn set_enabled(&mut self, i: usize, enabled: bool) -> Result<(), Error> {
        self.check_index(i)?;
        self.modifiers[i].enabled = enabled;
        Ok(())
    }

    pub fn swap(&mut self, i: usize, j: usize) -> Result<(), Error> {
        self.check_index(i)?;
        self.check_index(j)?;
        self.modifiers.swap(i, j);
        Ok(())
    }

    /// Move the modifier at `i` one place towards the front. Moving the first
    /// modifier up does nothing.
    pub fn move_up(&mut self, i: usize) -> Result<(), Error> {
        self.check_index(i)?;
        if i > 0 {
            self.modifiers.swap(i - 1, i);
        }
        Ok(())
    }

    /// Move the modifier at `i` one place towards the back. Moving the last
    /// modifier down does nothing.
    pub fn move_down(&mut self, i: usize) -> Result<(), Error> {
        self.check_index(i)?;
        if i + 1 < self.modifiers.len() {
            self.modifiers.swap(i, i + 1);
        }
        Ok(())
    }

    pub fn apply(&self, base: &FlatMesh) -> Result<FlatMesh, Error> {
        apply_modifier_stack(&self.modifiers, base)
    }
}

impl FromIterator<Modifier> for ModifierStack {
    fn from_iter<T: IntoIterator<Item = Modifier>>(iter: T) -> Self {
        ModifierStack {
            modifiers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{
        ArrayMode, Axis, Modifier, ModifierKind, ModifierStack, apply_modifier_stack,
    };
    use crate::{error::Error, flat::FlatMesh, macros::assert_f32_eq};
    use glam::{Vec3, vec3};

    fn array(count: usize) -> ModifierKind {
        ModifierKind::Array {
            count,
            mode: ArrayMode::Linear {
                offset: vec3(2.0, 0.0, 0.0),
            },
        }
    }

    fn mirror_x(offset: f32) -> ModifierKind {
        ModifierKind::Mirror {
            axis: Axis::X,
            offset,
            merge_threshold: 0.0,
        }
    }

    #[test]
    fn t_array_of_box() {
        let base = FlatMesh::cube(Vec3::ZERO, 1.0);
        let enabled = [Modifier::new("array", array(3))];
        let out = apply_modifier_stack(&enabled, &base).expect("Cannot apply stack");
        assert_eq!(out.num_vertices(), 24);
        assert_eq!(out.num_triangles(), 36);
        let disabled = [Modifier::new("array", array(3)).with_enabled(false)];
        let out = apply_modifier_stack(&disabled, &base).expect("Cannot apply stack");
        assert_eq!(out.num_vertices(), 8);
        assert_eq!(out, base);
    }

    #[test]
    fn t_stack_does_not_touch_base() {
        let base = FlatMesh::cube(Vec3::ZERO, 1.0);
        let copy = base.clone();
        let stack: ModifierStack = [
            Modifier::new("mirror", mirror_x(2.0)),
            Modifier::new("smooth", ModifierKind::Subdivision { levels: 1 }),
        ]
        .into_iter()
        .collect();
        let out = stack.apply(&base).expect("Cannot apply stack");
        assert_eq!(base, copy);
        assert_eq!(out.num_triangles(), 12 * 2 * 4);
        out.validate().expect("Invalid output");
        assert!(out.normals.is_some());
        assert!(out.bounds.is_some());
    }

    #[test]
    fn t_order_matters() {
        let base = FlatMesh::cube(Vec3::ZERO, 1.0);
        let mut stack = ModifierStack::new();
        stack.push(Modifier::new("array", array(2)));
        stack.push(Modifier::new("mirror", mirror_x(0.0)));
        let a = stack.apply(&base).expect("Cannot apply stack");
        stack.move_up(1).expect("Cannot move");
        assert_eq!(stack.get(0).map(|m| m.name.as_str()), Some("mirror"));
        let b = stack.apply(&base).expect("Cannot apply stack");
        assert_eq!(a.num_triangles(), b.num_triangles());
        let (ba, bb) = (
            a.bounds.expect("Missing bounds"),
            b.bounds.expect("Missing bounds"),
        );
        // Array then mirror spans [-2.5, 2.5], mirror then array [-0.5, 2.5].
        assert_f32_eq!(ba.min.x, -2.5, 1e-6);
        assert_f32_eq!(bb.min.x, -0.5, 1e-6);
        assert_f32_eq!(bb.max.x, 2.5, 1e-6);
    }

    #[test]
    fn t_reorder_edges_are_noops() {
        let mut stack = ModifierStack::new();
        stack.push(Modifier::new("a", array(2)));
        stack.push(Modifier::new("b", mirror_x(0.0)));
        stack.push(Modifier::new("c", ModifierKind::Subdivision { levels: 1 }));
        let before = stack.clone();
        stack.move_up(0).expect("Cannot move");
        stack.move_down(2).expect("Cannot move");
        assert_eq!(stack, before);
        stack.move_down(0).expect("Cannot move");
        let names: Vec<&str> = stack.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        stack.swap(0, 2).expect("Cannot swap");
        let names: Vec<&str> = stack.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
        assert!(matches!(stack.move_up(3), Err(Error::InvalidParameter(_))));
        assert!(stack.swap(0, 5).is_err());
    }

    #[test]
    fn t_remove_and_toggle() {
        let mut stack = ModifierStack::new();
        stack.push(Modifier::new("a", array(2)));
        stack.push(Modifier::new("b", array(3)));
        stack.set_enabled(1, false).expect("Cannot toggle");
        let out = stack
            .apply(&FlatMesh::cube(Vec3::ZERO, 1.0))
            .expect("Cannot apply stack");
        assert_eq!(out.num_vertices(), 16);
        let removed = stack.remove(0).expect("Cannot remove");
        assert_eq!(removed.name, "a");
        assert_eq!(stack.len(), 1);
        assert!(stack.remove(1).is_err());
        assert!(stack.set_enabled(4, true).is_err());
    }

    #[test]
    fn t_invalid_base_and_parameters() {
        let base = FlatMesh::new(vec![0.0; 9], vec![0, 1, 5]);
        let stack = [Modifier::new("array", array(2))];
        assert!(matches!(
            apply_modifier_stack(&stack, &base),
            Err(Error::InvalidBuffer(_))
        ));
        let cube = FlatMesh::cube(Vec3::ZERO, 1.0);
        assert!(matches!(
            apply_modifier_stack(&[Modifier::new("array", array(0))], &cube),
            Err(Error::InvalidParameter(_))
        ));
        // A failing modifier that is disabled does not run.
        let out = apply_modifier_stack(
            &[Modifier::new("array", array(0)).with_enabled(false)],
            &cube,
        )
        .expect("Cannot apply stack");
        assert_eq!(out, cube);
    }
}
