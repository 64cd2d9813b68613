use std::{io::BufRead, path::Path};

use glam::Vec3;

use crate::{element::VH, error::Error, flat::FlatMesh, mesh::QMesh};

fn load_models(path: &Path, options: &tobj::LoadOptions) -> Result<Vec<tobj::Model>, Error> {
    let (models, _) =
        tobj::load_obj(path, options).map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
    Ok(models)
}

fn parse_models(
    reader: &mut impl BufRead,
    options: &tobj::LoadOptions,
) -> Result<Vec<tobj::Model>, Error> {
    // Materials are not used, so material libraries are never opened.
    let (models, _) = tobj::load_obj_buf(reader, options, |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
    Ok(models)
}

fn polygon_options() -> tobj::LoadOptions {
    tobj::LoadOptions::default()
}

fn triangle_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

fn build_qmesh(models: Vec<tobj::Model>) -> Result<QMesh, Error> {
    let (nverts, nfaces) = models
        .iter()
        .fold((0usize, 0usize), |(nverts, nfaces), model| {
            let msh = &model.mesh;
            (
                nverts + msh.positions.len() / 3,
                nfaces + msh.face_arities.len().max(msh.indices.len() / 3),
            )
        });
    let mut outmesh = QMesh::with_capacity(nverts, nfaces);
    let mut fvs = Vec::new();
    for model in models {
        let mesh = model.mesh;
        if mesh.positions.len() % 3 != 0 {
            return Err(Error::InvalidBuffer(format!(
                "model '{}' has {} coordinates",
                model.name,
                mesh.positions.len()
            )));
        }
        let points: Vec<Vec3> = mesh.positions.chunks_exact(3).map(Vec3::from_slice).collect();
        let vertices = outmesh.add_vertices(&points);
        // Without arities every face is a triangle.
        let arities: Vec<usize> = if mesh.face_arities.is_empty() {
            vec![3; mesh.indices.len() / 3]
        } else {
            mesh.face_arities.iter().map(|a| *a as usize).collect()
        };
        let mut start = 0usize;
        for size in arities {
            let indices = mesh
                .indices
                .get(start..start + size)
                .ok_or_else(|| Error::InvalidBuffer(format!("model '{}' is truncated", model.name)))?;
            start += size;
            fvs.clear();
            for i in indices {
                let v: VH = *vertices
                    .get(*i as usize)
                    .ok_or_else(|| Error::InvalidBuffer(format!("index {i} is out of range")))?;
                fvs.push(v);
            }
            outmesh.add_face(&fvs)?;
        }
    }
    tracing::debug!(
        "Loaded obj with {} vertices and {} faces",
        outmesh.num_vertices(),
        outmesh.num_faces()
    );
    Ok(outmesh)
}

fn build_flat(models: Vec<tobj::Model>) -> Result<FlatMesh, Error> {
    let mut out = FlatMesh::default();
    let mut first = true;
    for model in models {
        let mesh = model.mesh;
        let nverts = mesh.positions.len() / 3;
        let part = FlatMesh {
            normals: (mesh.normals.len() == nverts * 3).then_some(mesh.normals),
            uvs: (mesh.texcoords.len() == nverts * 2).then_some(mesh.texcoords),
            ..FlatMesh::new(mesh.positions, mesh.indices)
        };
        part.validate()?;
        if first {
            out = part;
            first = false;
        } else {
            out.append(&part);
        }
    }
    if out.normals.is_none() {
        out.compute_normals();
    }
    out.compute_bounds();
    Ok(out)
}

impl QMesh {
    /// Load the polygons of an OBJ file, keeping n-gons intact.
    pub fn load_obj(path: &Path) -> Result<Self, Error> {
        build_qmesh(load_models(path, &polygon_options())?)
    }

    pub fn parse_obj(text: &str) -> Result<Self, Error> {
        build_qmesh(parse_models(&mut text.as_bytes(), &polygon_options())?)
    }
}

impl FlatMesh {
    /// Load an OBJ file as a triangulated buffer. Normals and texture
    /// coordinates are kept when the file has them for every vertex; missing
    /// normals are computed.
    pub fn load_obj(path: &Path) -> Result<Self, Error> {
        build_flat(load_models(path, &triangle_options())?)
    }

    pub fn parse_obj(text: &str) -> Result<Self, Error> {
        build_flat(parse_models(&mut text.as_bytes(), &triangle_options())?)
    }
}

#[cfg(test)]
mod test {
    use crate::{error::Error, flat::FlatMesh, macros::assert_f32_eq, mesh::QMesh};

    const PYRAMID: &str = "\
o pyramid
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0.5 0.5 1
f 1 4 3 2
f 1 2 5
f 2 3 5
f 3 4 5
f 4 1 5
";

    #[test]
    fn t_parse_polygons() {
        let mesh = QMesh::parse_obj(PYRAMID).expect("Cannot parse obj");
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 5);
        assert_eq!(mesh.face_valence(0.into()), 4);
        assert_f32_eq!(mesh.volume(), 1.0 / 3.0, 1e-5);
        assert!(mesh
            .edges()
            .iter()
            .all(|e| !mesh.is_boundary_edge(e.key).unwrap()));
        mesh.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_parse_triangles() {
        let flat = FlatMesh::parse_obj(PYRAMID).expect("Cannot parse obj");
        assert_eq!(flat.num_vertices(), 5);
        assert_eq!(flat.num_triangles(), 6);
        assert!(flat.normals.is_some());
        assert!(flat.uvs.is_none());
        assert_f32_eq!(flat.signed_volume(), 1.0 / 3.0, 1e-5);
        flat.validate().expect("Invalid buffer");
    }

    #[test]
    fn t_parse_errors() {
        assert!(matches!(
            QMesh::parse_obj("v 0 0 0\nf 1 2 3\n"),
            Err(Error::ObjLoadFailed(_)) | Err(Error::InvalidBuffer(_))
        ));
        assert!(matches!(
            QMesh::load_obj(std::path::Path::new("does/not/exist.obj")),
            Err(Error::ObjLoadFailed(_))
        ));
    }
}
