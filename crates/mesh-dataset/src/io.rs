//! Mesh file I/O for OBJ, STL, PLY, and VTK formats.
//!
//! Loading is a pure function of file contents: every loader produces a
//! [`Mesh`] which is then checked by [`validate_mesh_data`] so that a
//! structurally corrupt file (out-of-range index, NaN coordinate, field of
//! the wrong length) fails with a load error instead of reaching the
//! pipeline.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

use crate::error::{MeshError, MeshResult};
use crate::types::{Field, FieldValues, Mesh};
use crate::validate::{ValidationOptions, validate_mesh_data};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Stl,
    Ply,
    /// Legacy `.vtk` or XML `.vtp`/`.vtu`.
    Vtk,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "obj" => Some(MeshFormat::Obj),
                "stl" => Some(MeshFormat::Stl),
                "ply" => Some(MeshFormat::Ply),
                "vtk" | "vtp" | "vtu" => Some(MeshFormat::Vtk),
                _ => None,
            })
    }

    /// Whether [`save_mesh`] can write this format.
    pub fn can_write(&self) -> bool {
        !matches!(self, MeshFormat::Vtk)
    }
}

fn unsupported(path: &Path) -> MeshError {
    MeshError::unsupported_format(path.extension().and_then(|e| e.to_str()).map(String::from))
}

/// Load a mesh from file, auto-detecting format from extension.
pub fn load_mesh(path: &Path) -> MeshResult<Mesh> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;

    if !path.exists() {
        return Err(MeshError::io_read(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        ));
    }

    debug!("Loading mesh from {:?} (format: {:?})", path, format);

    let mesh = match format {
        MeshFormat::Obj => load_obj(path)?,
        MeshFormat::Stl => load_stl(path)?,
        MeshFormat::Ply => load_ply(path)?,
        MeshFormat::Vtk => load_vtk(path)?,
    };

    if mesh.vertices.is_empty() {
        return Err(MeshError::empty_mesh(format!(
            "{} contains no vertices",
            path.display()
        )));
    }

    validate_mesh_data(&mesh, &ValidationOptions::default())?;

    info!(
        vertices = mesh.vertex_count(),
        cells = mesh.face_count(),
        fields = ?mesh.field_names(),
        "Loaded {:?}",
        path
    );
    if mesh.faces.is_empty() {
        debug!("{:?} has no cells, treating as a point set", path);
    }

    Ok(mesh)
}

/// Load mesh from OBJ file, keeping polygons intact.
fn load_obj(path: &Path) -> MeshResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: false,
            single_index: false,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
    )
    .map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    // Merge all models into a single mesh
    let mut mesh = Mesh::new();

    for model in &models {
        let obj_mesh = &model.mesh;
        let vertex_offset = mesh.vertices.len() as u32;

        for chunk in obj_mesh.positions.chunks_exact(3) {
            mesh.vertices.push(Point3::new(
                chunk[0] as f64,
                chunk[1] as f64,
                chunk[2] as f64,
            ));
        }

        if obj_mesh.face_arities.is_empty() {
            for chunk in obj_mesh.indices.chunks_exact(3) {
                mesh.faces
                    .push(chunk.iter().map(|&i| i + vertex_offset).collect());
            }
        } else {
            let mut start = 0usize;
            for &arity in &obj_mesh.face_arities {
                let end = start + arity as usize;
                let Some(face) = obj_mesh.indices.get(start..end) else {
                    return Err(MeshError::parse_error(
                        path,
                        format!("model '{}' face list is truncated", model.name),
                    ));
                };
                mesh.faces
                    .push(face.iter().map(|&i| i + vertex_offset).collect());
                start = end;
            }
        }

        debug!(
            "OBJ model '{}': {} vertices, {} faces",
            model.name,
            obj_mesh.positions.len() / 3,
            mesh.faces.len()
        );
    }

    Ok(mesh)
}

/// Load mesh from STL file (binary or ASCII).
fn load_stl(path: &Path) -> MeshResult<Mesh> {
    let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    let stl =
        stl_io::read_stl(&mut reader).map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices
            .push(Point3::new(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64));
    }
    for face in &stl.faces {
        mesh.faces.push(face.vertices.iter().map(|&i| i as u32).collect());
    }

    debug!(
        "STL loaded: {} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.faces.len()
    );

    Ok(mesh)
}

/// Load mesh from PLY file (ASCII or binary).
///
/// `vertex` elements must carry `x`, `y`, `z`; any other scalar vertex
/// property becomes a point field of the same name. `face` elements use a
/// `vertex_indices` (or `vertex_index`) list, and their scalar properties
/// become cell fields.
fn load_ply(path: &Path) -> MeshResult<Mesh> {
    use ply_rs::parser::Parser;
    use ply_rs::ply::{DefaultElement, Property};

    let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| MeshError::parse_error(path, format!("PLY parse error: {:?}", e)))?;

    let mut mesh = Mesh::new();
    let mut point_fields: Vec<(String, Vec<f64>)> = Vec::new();

    if let Some(vertices) = ply.payload.get("vertex") {
        let extra: Vec<String> = ply
            .header
            .elements
            .get("vertex")
            .map(|def| {
                def.properties
                    .iter()
                    .filter(|(k, prop)| {
                        !matches!(k.as_str(), "x" | "y" | "z")
                            && matches!(prop.data_type, ply_rs::ply::PropertyType::Scalar(_))
                    })
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        point_fields = extra
            .into_iter()
            .map(|name| (name, Vec::with_capacity(vertices.len())))
            .collect();

        for element in vertices {
            let x = ply_scalar(element.get("x"), "x", path)?;
            let y = ply_scalar(element.get("y"), "y", path)?;
            let z = ply_scalar(element.get("z"), "z", path)?;
            mesh.vertices.push(Point3::new(x, y, z));

            for (name, values) in &mut point_fields {
                values.push(ply_scalar(element.get(name.as_str()), name, path)?);
            }
        }
    }

    let mut cell_fields: Vec<(String, Vec<f64>)> = Vec::new();
    if let Some(faces) = ply.payload.get("face") {
        let extra: Vec<String> = ply
            .header
            .elements
            .get("face")
            .map(|def| {
                def.properties
                    .iter()
                    .filter(|(_, prop)| {
                        matches!(prop.data_type, ply_rs::ply::PropertyType::Scalar(_))
                    })
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        cell_fields = extra
            .into_iter()
            .map(|name| (name, Vec::with_capacity(faces.len())))
            .collect();

        for (face_index, element) in faces.iter().enumerate() {
            let indices = element
                .get("vertex_indices")
                .or_else(|| element.get("vertex_index"));

            let face: Vec<u32> = match indices {
                Some(Property::ListInt(list)) => list.iter().map(|&i| i as u32).collect(),
                Some(Property::ListUInt(list)) => list.clone(),
                Some(Property::ListUChar(list)) => list.iter().map(|&i| i as u32).collect(),
                Some(Property::ListUShort(list)) => list.iter().map(|&i| i as u32).collect(),
                Some(Property::ListShort(list)) => list.iter().map(|&i| i as u32).collect(),
                _ => {
                    return Err(MeshError::parse_error(
                        path,
                        format!("face {} has no vertex index list", face_index),
                    ));
                }
            };
            mesh.faces.push(face);

            for (name, values) in &mut cell_fields {
                values.push(ply_scalar(element.get(name.as_str()), name, path)?);
            }
        }
    }

    for (name, values) in point_fields {
        mesh.set_point_field(Field::scalar(name, values));
    }
    for (name, values) in cell_fields {
        mesh.set_cell_field(Field::scalar(name, values));
    }

    debug!(
        "PLY loaded: {} vertices, {} faces, {} fields",
        mesh.vertices.len(),
        mesh.faces.len(),
        mesh.point_data.len() + mesh.cell_data.len()
    );

    Ok(mesh)
}

/// Helper to extract a scalar value from a PLY property.
fn ply_scalar(prop: Option<&ply_rs::ply::Property>, name: &str, path: &Path) -> MeshResult<f64> {
    use ply_rs::ply::Property;

    match prop {
        Some(Property::Float(v)) => Ok(*v as f64),
        Some(Property::Double(v)) => Ok(*v),
        Some(Property::Int(v)) => Ok(*v as f64),
        Some(Property::UInt(v)) => Ok(*v as f64),
        Some(Property::Short(v)) => Ok(*v as f64),
        Some(Property::UShort(v)) => Ok(*v as f64),
        Some(Property::Char(v)) => Ok(*v as f64),
        Some(Property::UChar(v)) => Ok(*v as f64),
        _ => Err(MeshError::parse_error(
            path,
            format!("missing or non-scalar PLY property: {}", name),
        )),
    }
}

/// Load mesh from a VTK file (legacy, or XML PolyData/UnstructuredGrid).
///
/// PolyData polygons and triangle strips become cells. For unstructured
/// grids, surface cells are kept as-is and volumetric cells contribute the
/// faces on the boundary of the grid. Point and cell attribute arrays are
/// carried as fields; cell fields follow the cell that produced each face.
fn load_vtk(path: &Path) -> MeshResult<Mesh> {
    use vtkio::Vtk;
    use vtkio::model::{DataSet, Piece};

    let vtk = Vtk::import(path)
        .map_err(|e| MeshError::parse_error(path, format!("VTK parse error: {:?}", e)))?;

    let mut mesh = Mesh::new();

    match vtk.data {
        DataSet::PolyData { pieces, .. } => {
            for piece in pieces {
                let Piece::Inline(piece) = piece else {
                    return Err(MeshError::parse_error(
                        path,
                        "PolyData pieces must be stored inline",
                    ));
                };
                append_poly_piece(&mut mesh, *piece, path)?;
            }
        }
        DataSet::UnstructuredGrid { pieces, .. } => {
            for piece in pieces {
                let Piece::Inline(piece) = piece else {
                    return Err(MeshError::parse_error(
                        path,
                        "UnstructuredGrid pieces must be stored inline",
                    ));
                };
                append_grid_piece(&mut mesh, *piece, path)?;
            }
        }
        _ => {
            return Err(MeshError::parse_error(
                path,
                "only POLYDATA and UNSTRUCTURED_GRID datasets are supported",
            ));
        }
    }

    debug!(
        "VTK loaded: {} vertices, {} cells, fields {:?}",
        mesh.vertices.len(),
        mesh.faces.len(),
        mesh.field_names()
    );

    Ok(mesh)
}

/// A VTK cell list flattened into per-cell index lists.
fn vtk_cells(numbers: &vtkio::model::VertexNumbers, path: &Path) -> MeshResult<Vec<Vec<u32>>> {
    use vtkio::model::VertexNumbers;

    let mut cells = Vec::new();
    match numbers {
        VertexNumbers::Legacy {
            num_cells,
            vertices,
        } => {
            let mut i = 0usize;
            while i < vertices.len() {
                let n = vertices[i] as usize;
                let Some(cell) = vertices.get(i + 1..i + 1 + n) else {
                    return Err(MeshError::parse_error(path, "cell list is truncated"));
                };
                cells.push(cell.to_vec());
                i += 1 + n;
            }
            if cells.len() != *num_cells as usize {
                return Err(MeshError::parse_error(
                    path,
                    format!("expected {} cells, found {}", num_cells, cells.len()),
                ));
            }
        }
        VertexNumbers::XML {
            connectivity,
            offsets,
        } => {
            let mut start = 0usize;
            for &end in offsets {
                let end = end as usize;
                let Some(cell) = connectivity.get(start..end) else {
                    return Err(MeshError::parse_error(path, "cell offsets out of range"));
                };
                cells.push(cell.iter().map(|&i| i as u32).collect());
                start = end;
            }
        }
    }
    Ok(cells)
}

fn vtk_points(buffer: &vtkio::model::IOBuffer, path: &Path) -> MeshResult<Vec<Point3<f64>>> {
    let coords = buffer
        .clone()
        .cast_into::<f64>()
        .ok_or_else(|| MeshError::parse_error(path, "point coordinates are not numeric"))?;
    if coords.len() % 3 != 0 {
        return Err(MeshError::parse_error(
            path,
            format!("point buffer has {} values, not a multiple of 3", coords.len()),
        ));
    }
    Ok(coords
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Raw attribute arrays of one piece: (name, components, values).
fn vtk_attributes(
    attributes: &[vtkio::model::Attribute],
    count: usize,
) -> MeshResult<Vec<(String, usize, Vec<f64>)>> {
    use vtkio::model::Attribute;

    let mut arrays: Vec<(&str, &vtkio::model::IOBuffer)> = Vec::new();
    for attribute in attributes {
        match attribute {
            Attribute::DataArray(array) => arrays.push((&array.name, &array.data)),
            Attribute::Field { data_array, .. } => {
                arrays.extend(data_array.iter().map(|a| (a.name.as_str(), &a.data)));
            }
        }
    }

    let mut out = Vec::with_capacity(arrays.len());
    for (name, buffer) in arrays {
        let Some(values) = buffer.clone().cast_into::<f64>() else {
            warn!("Skipping non-numeric VTK array '{}'", name);
            continue;
        };
        if count == 0 || values.len() % count != 0 {
            return Err(MeshError::FieldLengthMismatch {
                name: name.to_string(),
                expected: count,
                actual: values.len(),
            });
        }
        out.push((name.to_string(), values.len() / count, values));
    }
    Ok(out)
}

/// Turn raw attribute arrays into fields, gathering elements by `select`.
fn vtk_fields(raw: Vec<(String, usize, Vec<f64>)>, select: &[usize]) -> Vec<Field> {
    let mut fields = Vec::with_capacity(raw.len());
    for (name, components, values) in raw {
        let field = match components {
            1 => Field::scalar(name, select.iter().map(|&i| values[i]).collect()),
            3 => Field::vector(
                name,
                select
                    .iter()
                    .map(|&i| Vector3::new(values[3 * i], values[3 * i + 1], values[3 * i + 2]))
                    .collect(),
            ),
            n => {
                debug!("Skipping VTK array '{}' with {} components", name, n);
                continue;
            }
        };
        fields.push(field);
    }
    fields
}

/// Append fields to `mesh`, concatenating with same-named fields from earlier pieces.
fn merge_fields(target: &mut Vec<Field>, incoming: Vec<Field>, first_piece: bool) {
    if first_piece {
        *target = incoming;
        return;
    }
    for field in target.iter_mut() {
        let Some(other) = incoming.iter().find(|f| f.name == field.name) else {
            continue;
        };
        match (&mut field.values, &other.values) {
            (FieldValues::Scalar(a), FieldValues::Scalar(b)) => a.extend_from_slice(b),
            (FieldValues::Vector(a), FieldValues::Vector(b)) => a.extend_from_slice(b),
            _ => {}
        }
    }
}

fn append_poly_piece(
    mesh: &mut Mesh,
    piece: vtkio::model::PolyDataPiece,
    path: &Path,
) -> MeshResult<()> {
    let first_piece = mesh.vertices.is_empty();
    let offset = mesh.vertices.len() as u32;
    let points = vtk_points(&piece.points, path)?;
    let point_count = points.len();

    // Cell data is ordered verts, lines, polys, strips.
    let skipped = [&piece.verts, &piece.lines]
        .into_iter()
        .flatten()
        .map(|v| vtk_cells(v, path).map(|c| c.len()))
        .sum::<MeshResult<usize>>()?;
    let polys = match &piece.polys {
        Some(v) => vtk_cells(v, path)?,
        None => Vec::new(),
    };
    let strips = match &piece.strips {
        Some(v) => vtk_cells(v, path)?,
        None => Vec::new(),
    };
    let total_cells = skipped + polys.len() + strips.len();

    let mut faces = Vec::with_capacity(polys.len());
    let mut source_cell = Vec::with_capacity(polys.len());
    for (i, poly) in polys.into_iter().enumerate() {
        faces.push(poly);
        source_cell.push(skipped + i);
    }
    let strip_base = source_cell.len() + skipped;
    for (i, strip) in strips.into_iter().enumerate() {
        for k in 0..strip.len().saturating_sub(2) {
            let tri = if k % 2 == 0 {
                vec![strip[k], strip[k + 1], strip[k + 2]]
            } else {
                vec![strip[k + 1], strip[k], strip[k + 2]]
            };
            faces.push(tri);
            source_cell.push(strip_base + i);
        }
    }

    let identity: Vec<usize> = (0..point_count).collect();
    let point_fields = vtk_fields(
        vtk_attributes(&piece.data.point, point_count)?,
        &identity,
    );
    let cell_fields = vtk_fields(
        vtk_attributes(&piece.data.cell, total_cells)?,
        &source_cell,
    );

    mesh.vertices.extend(points);
    mesh.faces.extend(
        faces
            .into_iter()
            .map(|f| f.into_iter().map(|i| i + offset).collect::<Vec<u32>>()),
    );
    merge_fields(&mut mesh.point_data, point_fields, first_piece);
    merge_fields(&mut mesh.cell_data, cell_fields, first_piece);
    Ok(())
}

/// Local faces of a volumetric VTK cell, outward winding.
fn volumetric_faces(kind: vtkio::model::CellType, cell: &[u32]) -> Option<Vec<Vec<u32>>> {
    use vtkio::model::CellType;

    let local: &[&[usize]] = match kind {
        CellType::Tetra => &[&[0, 2, 1], &[0, 1, 3], &[1, 2, 3], &[0, 3, 2]],
        CellType::Pyramid => &[&[0, 3, 2, 1], &[0, 1, 4], &[1, 2, 4], &[2, 3, 4], &[3, 0, 4]],
        CellType::Wedge => &[&[0, 1, 2], &[3, 5, 4], &[0, 3, 4, 1], &[1, 4, 5, 2], &[2, 5, 3, 0]],
        CellType::Hexahedron => &[
            &[0, 3, 2, 1],
            &[4, 5, 6, 7],
            &[0, 1, 5, 4],
            &[1, 2, 6, 5],
            &[2, 3, 7, 6],
            &[3, 0, 4, 7],
        ],
        CellType::Voxel => &[
            &[0, 2, 3, 1],
            &[4, 5, 7, 6],
            &[0, 1, 5, 4],
            &[1, 3, 7, 5],
            &[3, 2, 6, 7],
            &[2, 0, 4, 6],
        ],
        _ => return None,
    };
    let needed = local.iter().flat_map(|f| f.iter()).max().map_or(0, |m| m + 1);
    if cell.len() < needed {
        return None;
    }
    Some(
        local
            .iter()
            .map(|f| f.iter().map(|&i| cell[i]).collect())
            .collect(),
    )
}

fn append_grid_piece(
    mesh: &mut Mesh,
    piece: vtkio::model::UnstructuredGridPiece,
    path: &Path,
) -> MeshResult<()> {
    use vtkio::model::CellType;

    let first_piece = mesh.vertices.is_empty();
    let offset = mesh.vertices.len() as u32;
    let points = vtk_points(&piece.points, path)?;
    let point_count = points.len();
    let cells = vtk_cells(&piece.cells.cell_verts, path)?;
    if cells.len() != piece.cells.types.len() {
        return Err(MeshError::parse_error(
            path,
            format!(
                "{} cells but {} cell types",
                cells.len(),
                piece.cells.types.len()
            ),
        ));
    }

    let mut faces: Vec<Vec<u32>> = Vec::new();
    let mut source_cell: Vec<usize> = Vec::new();
    // Volumetric faces keyed by sorted indices; a face seen twice is interior.
    let mut boundary: HashMap<Vec<u32>, Option<(Vec<u32>, usize)>> = HashMap::new();
    let mut boundary_order: Vec<Vec<u32>> = Vec::new();

    for (cell_index, (cell, kind)) in cells.iter().zip(&piece.cells.types).enumerate() {
        match kind {
            CellType::Triangle | CellType::Quad | CellType::Polygon => {
                faces.push(cell.clone());
                source_cell.push(cell_index);
            }
            CellType::Pixel if cell.len() == 4 => {
                faces.push(vec![cell[0], cell[1], cell[3], cell[2]]);
                source_cell.push(cell_index);
            }
            CellType::TriangleStrip => {
                for k in 0..cell.len().saturating_sub(2) {
                    let tri = if k % 2 == 0 {
                        vec![cell[k], cell[k + 1], cell[k + 2]]
                    } else {
                        vec![cell[k + 1], cell[k], cell[k + 2]]
                    };
                    faces.push(tri);
                    source_cell.push(cell_index);
                }
            }
            other => {
                let Some(cell_faces) = volumetric_faces(*other, cell) else {
                    continue;
                };
                for face in cell_faces {
                    let mut key = face.clone();
                    key.sort_unstable();
                    match boundary.get_mut(&key) {
                        Some(slot) => *slot = None,
                        None => {
                            boundary_order.push(key.clone());
                            boundary.insert(key, Some((face, cell_index)));
                        }
                    }
                }
            }
        }
    }

    for key in &boundary_order {
        if let Some(Some((face, cell_index))) = boundary.remove(key) {
            faces.push(face);
            source_cell.push(cell_index);
        }
    }

    let identity: Vec<usize> = (0..point_count).collect();
    let point_fields = vtk_fields(
        vtk_attributes(&piece.data.point, point_count)?,
        &identity,
    );
    let cell_fields = vtk_fields(
        vtk_attributes(&piece.data.cell, cells.len())?,
        &source_cell,
    );

    mesh.vertices.extend(points);
    mesh.faces.extend(
        faces
            .into_iter()
            .map(|f| f.into_iter().map(|i| i + offset).collect::<Vec<u32>>()),
    );
    merge_fields(&mut mesh.point_data, point_fields, first_piece);
    merge_fields(&mut mesh.cell_data, cell_fields, first_piece);
    Ok(())
}

/// Save mesh to file, auto-detecting format from extension.
pub fn save_mesh(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;

    match format {
        MeshFormat::Obj => save_obj(mesh, path),
        MeshFormat::Stl => save_stl(mesh, path),
        MeshFormat::Ply => save_ply(mesh, path),
        MeshFormat::Vtk => Err(unsupported(path)),
    }
}

/// Save mesh to STL file (binary). Polygons are fan-triangulated and fields dropped.
pub fn save_stl(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|tri| {
            let n = tri.normal_unnormalized();
            let n = if n.norm() > 0.0 { n.normalize() } else { n };
            let vertex = |p: Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(tri.v0), vertex(tri.v1), vertex(tri.v2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter())
        .map_err(|e| MeshError::io_write(path, std::io::Error::other(e.to_string())))?;
    writer.flush().map_err(|e| MeshError::io_write(path, e))?;

    info!("Saved {} triangles to {:?}", triangles.len(), path);
    Ok(())
}

/// Save mesh to OBJ file, preserving vertex order and polygon cells.
///
/// OBJ has no place for fields, so they are not written.
pub fn save_obj(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    write_obj(mesh, &mut writer).map_err(|e| MeshError::io_write(path, e))?;
    writer.flush().map_err(|e| MeshError::io_write(path, e))?;

    info!(
        "Saved {} vertices and {} faces to {:?}",
        mesh.vertices.len(),
        mesh.faces.len(),
        path
    );
    Ok(())
}

fn write_obj(mesh: &Mesh, writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(writer, "# OBJ file exported by mesh-dataset")?;
    writeln!(writer, "# Vertices: {}", mesh.vertices.len())?;
    writeln!(writer, "# Faces: {}", mesh.faces.len())?;
    writeln!(writer)?;

    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    writeln!(writer)?;

    for face in &mesh.faces {
        // OBJ uses 1-based indexing
        write!(writer, "f")?;
        for &i in face {
            write!(writer, " {}", i + 1)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Save mesh to PLY file (ASCII).
///
/// Scalar point fields are written as extra `vertex` properties and scalar
/// cell fields as extra `face` properties, so they survive a reload.
pub fn save_ply(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    use ply_rs::ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    };
    use ply_rs::writer::Writer;

    let scalar = |name: &str| {
        PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Double))
    };
    let point_fields: Vec<(&str, &[f64])> = scalar_fields(&mesh.point_data);
    let cell_fields: Vec<(&str, &[f64])> = scalar_fields(&mesh.cell_data);

    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex_def.properties.add(scalar(axis));
    }
    for (name, _) in &point_fields {
        vertex_def.properties.add(scalar(name));
    }
    vertex_def.count = mesh.vertices.len();
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    for (name, _) in &cell_fields {
        face_def.properties.add(scalar(name));
    }
    face_def.count = mesh.faces.len();
    ply.header.elements.add(face_def);

    let mut vertices_payload: Vec<DefaultElement> = Vec::with_capacity(mesh.vertices.len());
    for (i, v) in mesh.vertices.iter().enumerate() {
        let mut element = DefaultElement::new();
        element.insert("x".to_string(), Property::Double(v.x));
        element.insert("y".to_string(), Property::Double(v.y));
        element.insert("z".to_string(), Property::Double(v.z));
        for (name, values) in &point_fields {
            element.insert(name.to_string(), Property::Double(values[i]));
        }
        vertices_payload.push(element);
    }
    ply.payload.insert("vertex".to_string(), vertices_payload);

    let mut faces_payload: Vec<DefaultElement> = Vec::with_capacity(mesh.faces.len());
    for (i, face) in mesh.faces.iter().enumerate() {
        let mut element = DefaultElement::new();
        element.insert(
            "vertex_indices".to_string(),
            Property::ListInt(face.iter().map(|&v| v as i32).collect()),
        );
        for (name, values) in &cell_fields {
            element.insert(name.to_string(), Property::Double(values[i]));
        }
        faces_payload.push(element);
    }
    ply.payload.insert("face".to_string(), faces_payload);

    ply.make_consistent().map_err(|e| {
        MeshError::io_write(
            path,
            std::io::Error::other(format!("PLY consistency error: {:?}", e)),
        )
    })?;

    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);
    Writer::new()
        .write_ply(&mut writer, &mut ply)
        .map_err(|e| MeshError::io_write(path, e))?;
    writer.flush().map_err(|e| MeshError::io_write(path, e))?;

    info!(
        "Saved {} vertices and {} faces to {:?} (PLY ASCII)",
        mesh.vertices.len(),
        mesh.faces.len(),
        path
    );
    Ok(())
}

fn scalar_fields(fields: &[Field]) -> Vec<(&str, &[f64])> {
    fields
        .iter()
        .filter_map(|f| match f.values.as_scalar() {
            Some(values) => Some((f.name.as_str(), values)),
            None => {
                debug!("PLY output skips vector field '{}'", f.name);
                None
            }
        })
        .collect()
}
