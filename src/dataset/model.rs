//! Object models (triangle meshes) and the shared, load-once model store.
//!
//! Models are read from PLY files, ASCII or binary little-endian. Only vertex
//! positions and face index lists are kept; polygons are triangulated as fans.
use log::{debug, info};
use nalgebra::Vector3;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::params::DatasetParams;
use crate::error::{InputKind, StatsError};

/// Triangle mesh in model coordinates (millimetres).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub vertices: Vec<Vector3<f64>>,
    pub faces: Vec<[u32; 3]>,
}

impl Model {
    pub fn load_ply(path: &Path) -> Result<Self, StatsError> {
        let bytes = fs::read(path).map_err(|e| StatsError::missing(InputKind::Model, path, e))?;
        parse_ply(&bytes).map_err(|reason| StatsError::missing(InputKind::Model, path, reason))
    }

    /// Axis-aligned bounds `(min, max)` of the vertices.
    pub fn bounds(&self) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.inf(v), hi.sup(v))
        }))
    }
}

/// Models keyed by object id. Built once before any scene is processed and
/// shared read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct ModelStore {
    models: HashMap<u32, Arc<Model>>,
}

impl ModelStore {
    /// Load the model of every object id of the dataset.
    ///
    /// Returns an empty store when the dataset declares no model template.
    pub fn load(params: &DatasetParams) -> Result<Self, StatsError> {
        let mut models = HashMap::new();
        for obj_id in params.obj_ids() {
            let Some(path) = params.model_path(obj_id)? else {
                break;
            };
            let model = Model::load_ply(&path)?;
            debug!(
                "loaded model obj_id={} vertices={} faces={} bounds={:?}",
                obj_id,
                model.vertices.len(),
                model.faces.len(),
                model.bounds()
            );
            models.insert(obj_id, Arc::new(model));
        }
        info!("loaded {} object models for '{}'", models.len(), params.name);
        Ok(Self { models })
    }

    pub fn from_models(models: impl IntoIterator<Item = (u32, Model)>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|(id, m)| (id, Arc::new(m)))
                .collect(),
        }
    }

    pub fn get(&self, obj_id: u32) -> Option<&Arc<Model>> {
        self.models.get(&obj_id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Result<Self, String> {
        Ok(match name {
            "char" | "int8" => Scalar::I8,
            "uchar" | "uint8" => Scalar::U8,
            "short" | "int16" => Scalar::I16,
            "ushort" | "uint16" => Scalar::U16,
            "int" | "int32" => Scalar::I32,
            "uint" | "uint32" => Scalar::U32,
            "float" | "float32" => Scalar::F32,
            "double" | "float64" => Scalar::F64,
            other => return Err(format!("unsupported PLY type '{other}'")),
        })
    }

    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }
}

#[derive(Clone, Debug)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List { name: String, count: Scalar, item: Scalar },
}

#[derive(Clone, Debug)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

enum Body<'a> {
    Ascii(std::str::SplitAsciiWhitespace<'a>),
    Binary { bytes: &'a [u8], pos: usize },
}

impl Body<'_> {
    fn read(&mut self, ty: Scalar) -> Result<f64, String> {
        match self {
            Body::Ascii(tokens) => tokens
                .next()
                .ok_or_else(|| "unexpected end of PLY data".to_string())?
                .parse::<f64>()
                .map_err(|e| format!("invalid PLY value: {e}")),
            Body::Binary { bytes, pos } => {
                let n = ty.size();
                let chunk = bytes
                    .get(*pos..*pos + n)
                    .ok_or_else(|| "unexpected end of PLY data".to_string())?;
                *pos += n;
                let mut buf = [0u8; 8];
                buf[..n].copy_from_slice(chunk);
                Ok(match ty {
                    Scalar::I8 => f64::from(buf[0] as i8),
                    Scalar::U8 => f64::from(buf[0]),
                    Scalar::I16 => f64::from(i16::from_le_bytes([buf[0], buf[1]])),
                    Scalar::U16 => f64::from(u16::from_le_bytes([buf[0], buf[1]])),
                    Scalar::I32 => f64::from(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
                    Scalar::U32 => f64::from(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
                    Scalar::F32 => f64::from(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
                    Scalar::F64 => f64::from_le_bytes(buf),
                })
            }
        }
    }
}

const END_HEADER: &[u8] = b"end_header";

fn parse_ply(bytes: &[u8]) -> Result<Model, String> {
    let header_end = bytes
        .windows(END_HEADER.len())
        .position(|w| w == END_HEADER)
        .ok_or_else(|| "missing end_header".to_string())?;
    let body_start = bytes[header_end..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| header_end + i + 1)
        .unwrap_or(bytes.len());
    let header = std::str::from_utf8(&bytes[..header_end])
        .map_err(|_| "PLY header is not valid UTF-8".to_string())?;
    let (format, elements) = parse_header(header)?;

    let mut body = match format {
        Format::Ascii => Body::Ascii(
            std::str::from_utf8(&bytes[body_start..])
                .map_err(|_| "ASCII PLY body is not valid UTF-8".to_string())?
                .split_ascii_whitespace(),
        ),
        Format::BinaryLittleEndian => Body::Binary {
            bytes: &bytes[body_start..],
            pos: 0,
        },
    };

    let mut model = Model::default();
    for element in &elements {
        match element.name.as_str() {
            "vertex" => read_vertices(&mut body, element, &mut model)?,
            "face" => read_faces(&mut body, element, &mut model)?,
            _ => skip_element(&mut body, element)?,
        }
    }
    let n = model.vertices.len() as u32;
    if let Some(face) = model.faces.iter().find(|f| f.iter().any(|&i| i >= n)) {
        return Err(format!("face {face:?} references a missing vertex"));
    }
    Ok(model)
}

fn parse_header(header: &str) -> Result<(Format, Vec<Element>), String> {
    let mut lines = header.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err("not a PLY file".to_string());
    }
    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] | ["comment", ..] | ["obj_info", ..] => {}
            ["format", "ascii", _] => format = Some(Format::Ascii),
            ["format", "binary_little_endian", _] => format = Some(Format::BinaryLittleEndian),
            ["format", other, ..] => return Err(format!("unsupported PLY format '{other}'")),
            ["element", name, count] => elements.push(Element {
                name: name.to_string(),
                count: count
                    .parse()
                    .map_err(|_| format!("invalid element count '{count}'"))?,
                properties: Vec::new(),
            }),
            ["property", "list", count, item, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| "property before element".to_string())?;
                element.properties.push(Property::List {
                    name: name.to_string(),
                    count: Scalar::parse(count)?,
                    item: Scalar::parse(item)?,
                });
            }
            ["property", ty, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| "property before element".to_string())?;
                element.properties.push(Property::Scalar {
                    name: name.to_string(),
                    ty: Scalar::parse(ty)?,
                });
            }
            _ => return Err(format!("unrecognized PLY header line '{line}'")),
        }
    }
    let format = format.ok_or_else(|| "missing PLY format line".to_string())?;
    Ok((format, elements))
}

fn read_vertices(body: &mut Body, element: &Element, model: &mut Model) -> Result<(), String> {
    let axis = |axis: &str| {
        element.properties.iter().position(
            |p| matches!(p, Property::Scalar { name, .. } if name == axis),
        )
    };
    let (Some(ix), Some(iy), Some(iz)) = (axis("x"), axis("y"), axis("z")) else {
        return Err("vertex element lacks x/y/z".to_string());
    };
    let mut values = vec![0.0; element.properties.len()];
    for _ in 0..element.count {
        for (slot, prop) in values.iter_mut().zip(&element.properties) {
            *slot = match prop {
                Property::Scalar { ty, .. } => body.read(*ty)?,
                Property::List { count, item, .. } => {
                    skip_list(body, *count, *item)?;
                    0.0
                }
            };
        }
        model
            .vertices
            .push(Vector3::new(values[ix], values[iy], values[iz]));
    }
    Ok(())
}

fn read_faces(body: &mut Body, element: &Element, model: &mut Model) -> Result<(), String> {
    let mut indices: Vec<u32> = Vec::new();
    for _ in 0..element.count {
        for prop in &element.properties {
            match prop {
                Property::List { name, count, item }
                    if name == "vertex_indices" || name == "vertex_index" =>
                {
                    let n = body.read(*count)? as usize;
                    indices.clear();
                    for _ in 0..n {
                        indices.push(body.read(*item)? as u32);
                    }
                    for k in 1..n.saturating_sub(1) {
                        model.faces.push([indices[0], indices[k], indices[k + 1]]);
                    }
                }
                Property::List { count, item, .. } => skip_list(body, *count, *item)?,
                Property::Scalar { ty, .. } => {
                    body.read(*ty)?;
                }
            }
        }
    }
    Ok(())
}

fn skip_list(body: &mut Body, count: Scalar, item: Scalar) -> Result<(), String> {
    let n = body.read(count)? as usize;
    for _ in 0..n {
        body.read(item)?;
    }
    Ok(())
}

fn skip_element(body: &mut Body, element: &Element) -> Result<(), String> {
    for _ in 0..element.count {
        for prop in &element.properties {
            match prop {
                Property::Scalar { ty, .. } => {
                    body.read(*ty)?;
                }
                Property::List { count, item, .. } => skip_list(body, *count, *item)?,
            }
        }
    }
    Ok(())
}
