//! Wavefront OBJ/MTL loader producing flat, renderable triangle geometry.
//!
//! - Parses the polygonal subset of ASCII OBJ: `v`, `vt`, `vn`, `f`,
//!   `mtllib`, `usemtl`. Grouping (`o`/`g`), smoothing groups, curves and
//!   free-form geometry are ignored.
//! - Faces are fan-triangulated around their first vertex; every face
//!   corner becomes its own output vertex (no sharing across faces), so the
//!   result uploads verbatim as an interleaved vertex buffer plus a `u32`
//!   triangle-list index buffer.
//! - Corners without a `vn` reference receive the face normal
//!   `normalize(cross(v1 - v0, v2 - v0))` computed from the face's first
//!   three corners; corners that referenced a normal keep it.
//! - Corners without a `vt` reference receive the sentinel texcoord
//!   `(-1, -1)`, which renderers treat as "use the vertex color, skip the
//!   texture sample".
//! - Vertex color comes from the active material's diffuse (`Kd`); faces
//!   with no material are pure red so unassigned geometry is visible.
//! - MTL libraries are resolved relative to the OBJ file. The first
//!   material (in definition order) with a `map_Kd` supplies the mesh's
//!   single texture path. Unreadable MTL files log a warning and parsing
//!   continues without them.
//! - An axis-aligned bounding box is tracked over all referenced positions;
//!   `center_offset = -(min + max) / 2` translates the box center to the
//!   origin without touching the raw vertex data.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use thiserror::Error;

/// Texcoord sentinel meaning "no texture sample, use the vertex color".
pub const UNTEXTURED: [f32; 2] = [-1.0, -1.0];

/// Color assigned to faces with no material, loud on purpose.
pub const NO_MATERIAL_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

/// One interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
    pub color: [f32; 3],
}

/// Flat triangle geometry for a single mesh file.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    /// Triangle list. Every index is < `vertices.len()`; the count is a
    /// multiple of 3.
    pub indices: Vec<u32>,
    /// Diffuse texture referenced by the file's materials, if any.
    pub texture: Option<PathBuf>,
    /// Translation moving the bounding-box center to the origin.
    pub center_offset: Vec3,
}

impl Geometry {
    /// `true` if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected {expected}")]
    Syntax { line: usize, expected: &'static str },

    #[error("line {line}: {kind} reference {reference} out of range")]
    Reference {
        line: usize,
        kind: &'static str,
        reference: i32,
    },

    #[error("line {line}: face needs at least 3 vertices")]
    DegenerateFace { line: usize },
}

/// Reads and parses one OBJ file. Material libraries and texture paths are
/// resolved relative to the file's directory.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Geometry, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_obj(&text, base_dir)
}

struct Material {
    name: String,
    diffuse: [f32; 3],
    diffuse_map: Option<String>,
}

/// Parse OBJ text. This is the single source of truth for parsing; `load`
/// is a thin file wrapper around it. `base_dir` anchors `mtllib` and
/// texture paths.
pub fn parse_obj(text: &str, base_dir: &Path) -> Result<Geometry, LoadError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();

    let mut materials: Vec<Material> = Vec::new();
    let mut active_material: Option<usize> = None;

    let mut out = Geometry::default();
    let mut bbox_min = Vec3::splat(f32::INFINITY);
    let mut bbox_max = Vec3::splat(f32::NEG_INFINITY);

    for (line_num, raw) in text.lines().enumerate() {
        let line_num = line_num + 1;

        // Everything after '#' is a comment.
        let line = raw.split('#').next().unwrap_or("");
        let mut parts = line.split_whitespace();

        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => positions.push(parse_vec3(&mut parts, line_num)?),
            "vn" => normals.push(parse_vec3(&mut parts, line_num)?),
            "vt" => texcoords.push(parse_vec2(&mut parts, line_num)?),

            "f" => {
                let corners: Vec<&str> = parts.collect();
                if corners.len() < 3 {
                    return Err(LoadError::DegenerateFace { line: line_num });
                }

                let base = out.vertices.len() as u32;

                // Fan triangulation anchored at the first corner.
                for v in 2..corners.len() {
                    out.indices.push(base);
                    out.indices.push(base + v as u32 - 1);
                    out.indices.push(base + v as u32);
                }

                let color = active_material
                    .map(|m| materials[m].diffuse)
                    .unwrap_or(NO_MATERIAL_COLOR);

                // Corners that referenced no normal; fixed up after the
                // whole face has been emitted.
                let mut missing_normals: Vec<usize> = Vec::new();

                for corner in &corners {
                    let refs = CornerRefs::parse(corner, line_num)?;

                    let position = positions[resolve(refs.v, positions.len(), "v", line_num)?];
                    bbox_min = bbox_min.min(position);
                    bbox_max = bbox_max.max(position);

                    let normal = match refs.vn {
                        Some(r) => normals[resolve(r, normals.len(), "vn", line_num)?],
                        None => {
                            missing_normals.push(out.vertices.len());
                            Vec3::ZERO
                        }
                    };

                    let texcoord = match refs.vt {
                        Some(r) => texcoords[resolve(r, texcoords.len(), "vt", line_num)?],
                        None => UNTEXTURED,
                    };

                    out.vertices.push(Vertex {
                        position: position.to_array(),
                        normal: normal.to_array(),
                        texcoord,
                        color,
                    });
                }

                if !missing_normals.is_empty() {
                    // Face normal from the first three corners. Degenerate
                    // faces yield a zero normal rather than NaN.
                    let a = Vec3::from(out.vertices[base as usize].position);
                    let b = Vec3::from(out.vertices[base as usize + 1].position);
                    let c = Vec3::from(out.vertices[base as usize + 2].position);
                    let normal = (b - a).cross(c - a).normalize_or_zero().to_array();

                    for i in missing_normals {
                        out.vertices[i].normal = normal;
                    }
                }
            }

            "mtllib" => {
                for name in parts {
                    parse_mtl(&base_dir.join(name), &mut materials);
                }
            }

            "usemtl" => {
                active_material = parts
                    .next()
                    .and_then(|name| materials.iter().position(|m| m.name == name));
                if active_material.is_none() {
                    log::warn!("line {line_num}: usemtl names an unknown material");
                }
            }

            // o, g, s, and anything else: no effect on the flat geometry.
            _ => {}
        }
    }

    if bbox_min.x.is_finite() {
        out.center_offset = -(bbox_min + bbox_max) / 2.0;
    }

    out.texture = materials
        .iter()
        .find_map(|m| m.diffuse_map.as_ref().map(|t| base_dir.join(t)));

    Ok(out)
}

/// `v`, `v/vt`, `v//vn`, or `v/vt/vn` reference numbers of one face corner.
struct CornerRefs {
    v: i32,
    vt: Option<i32>,
    vn: Option<i32>,
}

impl CornerRefs {
    fn parse(corner: &str, line: usize) -> Result<Self, LoadError> {
        let mut fields = corner.split('/');

        let v = fields
            .next()
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or(LoadError::Syntax {
                line,
                expected: "face corner `v[/vt][/vn]`",
            })?;

        let vt = match fields.next() {
            None | Some("") => None,
            Some(s) => Some(s.parse::<i32>().map_err(|_| LoadError::Syntax {
                line,
                expected: "integer vt reference",
            })?),
        };

        let vn = match fields.next() {
            None | Some("") => None,
            Some(s) => Some(s.parse::<i32>().map_err(|_| LoadError::Syntax {
                line,
                expected: "integer vn reference",
            })?),
        };

        Ok(Self { v, vt, vn })
    }
}

/// Turns a 1-based (or negative, relative) OBJ reference number into a
/// 0-based index, rejecting zero and anything out of range.
fn resolve(reference: i32, len: usize, kind: &'static str, line: usize) -> Result<usize, LoadError> {
    let err = LoadError::Reference {
        line,
        kind,
        reference,
    };

    let index = if reference > 0 {
        reference as i64 - 1
    } else if reference < 0 {
        len as i64 + reference as i64
    } else {
        return Err(err);
    };

    if index < 0 || index as usize >= len {
        return Err(err);
    }

    Ok(index as usize)
}

fn parse_f32<'a, I: Iterator<Item = &'a str>>(parts: &mut I, line: usize, expected: &'static str) -> Result<f32, LoadError> {
    parts
        .next()
        .and_then(|s| s.parse::<f32>().ok())
        .ok_or(LoadError::Syntax { line, expected })
}

fn parse_vec3<'a, I: Iterator<Item = &'a str>>(parts: &mut I, line: usize) -> Result<Vec3, LoadError> {
    let x = parse_f32(parts, line, "3 floats")?;
    let y = parse_f32(parts, line, "3 floats")?;
    let z = parse_f32(parts, line, "3 floats")?;
    Ok(Vec3::new(x, y, z))
}

fn parse_vec2<'a, I: Iterator<Item = &'a str>>(parts: &mut I, line: usize) -> Result<[f32; 2], LoadError> {
    let u = parse_f32(parts, line, "2 floats")?;
    let v = parse_f32(parts, line, "2 floats")?;
    Ok([u, v])
}

/// Parses an MTL library into `materials`, appending in definition order.
/// Only `newmtl`, `Kd`, and `map_Kd` matter here; a missing or unreadable
/// file is a warning, not an error.
fn parse_mtl(path: &Path, materials: &mut Vec<Material>) {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("skipping material library {}: {err}", path.display());
            return;
        }
    };

    for raw in text.lines() {
        let line = raw.split('#').next().unwrap_or("");
        let mut parts = line.split_whitespace();

        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "newmtl" => {
                let name = parts.next().unwrap_or("").to_string();
                materials.push(Material {
                    name,
                    diffuse: [0.8, 0.8, 0.8],
                    diffuse_map: None,
                });
            }

            "Kd" => {
                let r = parts.next().and_then(|s| s.parse::<f32>().ok());
                let g = parts.next().and_then(|s| s.parse::<f32>().ok());
                let b = parts.next().and_then(|s| s.parse::<f32>().ok());

                if let (Some(last), (Some(r), Some(g), Some(b))) =
                    (materials.last_mut(), (r, g, b))
                {
                    last.diffuse = [r, g, b];
                }
            }

            "map_Kd" => {
                if let (Some(last), Some(name)) = (materials.last_mut(), parts.next()) {
                    last.diffuse_map = Some(name.to_string());
                }
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EPS: f32 = 1e-6;

    fn parse(text: &str) -> Geometry {
        parse_obj(text, Path::new(".")).unwrap()
    }

    #[test]
    fn quad_fan_triangulates_to_two_triangles() {
        let geo = parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        );

        assert_eq!(geo.vertices.len(), 4);
        assert_eq!(geo.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn ngon_fan_shares_the_first_corner() {
        let geo = parse(
            "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 2 0\nv -1 1 0\nf 1 2 3 4 5 6\n",
        );

        // N-gon => N-2 triangles, each anchored at the face's first vertex.
        assert_eq!(geo.triangle_count(), 4);
        for tri in geo.indices.chunks(3) {
            assert_eq!(tri[0], 0);
        }
    }

    #[test]
    fn missing_normals_get_the_face_normal() {
        let geo = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");

        // CCW quad in the XY plane faces +Z.
        for vert in &geo.vertices {
            assert_eq!(vert.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn partial_normals_only_fill_the_missing_corners() {
        let geo = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nf 1//1 2 3\n",
        );

        assert_eq!(geo.vertices[0].normal, [1.0, 0.0, 0.0]);
        assert_eq!(geo.vertices[1].normal, [0.0, 0.0, 1.0]);
        assert_eq!(geo.vertices[2].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_texcoords_use_the_sentinel() {
        let geo = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nf 1/1 2 3\n",
        );

        assert_eq!(geo.vertices[0].texcoord, [0.5, 0.5]);
        assert_eq!(geo.vertices[1].texcoord, UNTEXTURED);
        assert_eq!(geo.vertices[2].texcoord, UNTEXTURED);
    }

    #[test]
    fn no_material_means_red() {
        let geo = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");

        for vert in &geo.vertices {
            assert_eq!(vert.color, NO_MATERIAL_COLOR);
        }
    }

    #[test]
    fn center_offset_recents_the_bounding_box() {
        let geo = parse(
            "v 1 2 3\nv 5 2 3\nv 5 8 3\nv 1 8 13\nf 1 2 3 4\n",
        );

        // -(min + max) / 2 over the referenced positions.
        assert!((geo.center_offset - Vec3::new(-3.0, -5.0, -8.0)).length() < EPS);

        // Applying it moves the bbox center to the origin.
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for vert in &geo.vertices {
            let p = Vec3::from(vert.position) + geo.center_offset;
            min = min.min(p);
            max = max.max(p);
        }
        assert!(((min + max) / 2.0).length() < EPS);
    }

    #[test]
    fn negative_references_resolve_relative_to_the_end() {
        let geo = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n");

        assert_eq!(geo.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(geo.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn out_of_range_reference_fails() {
        let result = parse_obj("v 0 0 0\nf 1 2 3\n", Path::new("."));
        assert!(matches!(
            result,
            Err(LoadError::Reference { kind: "v", reference: 2, .. })
        ));
    }

    #[test]
    fn zero_reference_fails() {
        let result = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n", Path::new("."));
        assert!(matches!(result, Err(LoadError::Reference { .. })));
    }

    #[test]
    fn face_with_two_corners_fails() {
        let result = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n", Path::new("."));
        assert!(matches!(result, Err(LoadError::DegenerateFace { line: 3 })));
    }

    #[test]
    fn empty_input_is_a_valid_empty_geometry() {
        let geo = parse("");
        assert!(geo.is_empty());
        assert_eq!(geo.center_offset, Vec3::ZERO);

        // Unknown keywords and comments are fine too.
        let geo = parse("# comment\no thing\ng group\ns off\n");
        assert!(geo.is_empty());
    }

    #[test]
    fn materials_color_faces_and_surface_the_first_texture() {
        let dir = tempfile::tempdir().unwrap();

        let mtl_path = dir.path().join("scene.mtl");
        let mut mtl = fs::File::create(&mtl_path).unwrap();
        writeln!(mtl, "newmtl plain\nKd 0.1 0.2 0.3").unwrap();
        writeln!(mtl, "newmtl painted\nKd 1 1 1\nmap_Kd skin.png").unwrap();

        let obj_path = dir.path().join("scene.obj");
        let mut obj = fs::File::create(&obj_path).unwrap();
        writeln!(obj, "mtllib scene.mtl").unwrap();
        writeln!(obj, "v 0 0 0\nv 1 0 0\nv 0 1 0").unwrap();
        writeln!(obj, "usemtl plain\nf 1 2 3").unwrap();

        let geo = load(&obj_path).unwrap();

        assert_eq!(geo.vertices[0].color, [0.1, 0.2, 0.3]);
        // First material with a map wins, resolved next to the OBJ.
        assert_eq!(geo.texture, Some(dir.path().join("skin.png")));
    }

    #[test]
    fn missing_material_library_is_skipped() {
        let geo = parse("mtllib nope.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");

        assert_eq!(geo.vertices[0].color, NO_MATERIAL_COLOR);
        assert_eq!(geo.texture, None);
    }

    #[test]
    fn load_reports_missing_files() {
        assert!(matches!(load("does-not-exist.obj"), Err(LoadError::Io { .. })));
    }
}
