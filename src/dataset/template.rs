//! Path templates such as `test/{scene:02}/depth/{im:04}.png`.
//!
//! A placeholder is `{name}` or `{name:0N}` (zero-padded to `N` characters).
//! Templates are parsed once and validated against the set of fields the
//! caller will provide.
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

use crate::error::StatsError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field { name: String, width: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    pieces: Vec<Piece>,
}

impl PathTemplate {
    pub fn parse(source: &str) -> Result<Self, StatsError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }
            let mut inner = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(ch) => inner.push(ch),
                    None => {
                        return Err(StatsError::InvalidConfig(format!(
                            "unterminated placeholder in path template '{source}'"
                        )))
                    }
                }
            }
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(parse_field(source, &inner)?);
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }

    /// Placeholder names in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Field { name, .. } => Some(name.as_str()),
            Piece::Literal(_) => None,
        })
    }

    /// Fail unless every placeholder is one of `allowed`.
    pub fn ensure_fields(&self, allowed: &[&str]) -> Result<(), StatsError> {
        match self.fields().find(|f| !allowed.contains(f)) {
            Some(unknown) => Err(StatsError::InvalidConfig(format!(
                "path template '{}' uses unknown placeholder '{{{unknown}}}' (allowed: {})",
                self.source,
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Fail unless every name in `required` appears as a placeholder.
    pub fn require_fields(&self, required: &[&str]) -> Result<(), StatsError> {
        match required.iter().find(|r| !self.fields().any(|f| f == **r)) {
            Some(missing) => Err(StatsError::InvalidConfig(format!(
                "path template '{}' must contain '{{{missing}}}'",
                self.source
            ))),
            None => Ok(()),
        }
    }

    /// Check placeholders against the fields a caller provides and the
    /// ones that keep its output paths distinct.
    pub fn check_fields(&self, allowed: &[&str], required: &[&str]) -> Result<(), StatsError> {
        self.ensure_fields(allowed)?;
        self.require_fields(required)
    }

    /// Substitute placeholders with the given values.
    pub fn render(&self, fields: &PathFields) -> Result<PathBuf, StatsError> {
        let mut out = String::with_capacity(self.source.len() + 8);
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Field { name, width } => {
                    let value = fields.value(name).ok_or_else(|| {
                        StatsError::InvalidConfig(format!(
                            "no value for placeholder '{{{name}}}' in '{}'",
                            self.source
                        ))
                    })?;
                    let width = *width;
                    out.push_str(&format!("{value:0>width$}"));
                }
            }
        }
        Ok(PathBuf::from(out))
    }
}

/// Values available to path templates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PathFields {
    pub scene: Option<u32>,
    pub im: Option<u32>,
    pub obj: Option<u32>,
    pub gt: Option<usize>,
    pub delta: Option<f32>,
}

impl PathFields {
    pub fn scene(scene: u32) -> Self {
        Self {
            scene: Some(scene),
            ..Self::default()
        }
    }

    pub fn image(scene: u32, im: u32) -> Self {
        Self {
            im: Some(im),
            ..Self::scene(scene)
        }
    }

    pub fn instance(scene: u32, im: u32, gt: usize) -> Self {
        Self {
            gt: Some(gt),
            ..Self::image(scene, im)
        }
    }

    pub fn object(obj: u32) -> Self {
        Self {
            obj: Some(obj),
            ..Self::default()
        }
    }

    pub fn with_delta(self, delta: f32) -> Self {
        Self {
            delta: Some(delta),
            ..self
        }
    }

    fn value(&self, name: &str) -> Option<String> {
        match name {
            "scene" => self.scene.map(|v| v.to_string()),
            "im" => self.im.map(|v| v.to_string()),
            "obj" => self.obj.map(|v| v.to_string()),
            "gt" => self.gt.map(|v| v.to_string()),
            "delta" => self.delta.map(|v| v.to_string()),
            _ => None,
        }
    }
}

fn parse_field(source: &str, inner: &str) -> Result<Piece, StatsError> {
    let (name, fmt_spec) = match inner.split_once(':') {
        Some((n, f)) => (n, Some(f)),
        None => (inner, None),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StatsError::InvalidConfig(format!(
            "invalid placeholder '{{{inner}}}' in path template '{source}'"
        )));
    }
    let width = match fmt_spec {
        None => 0,
        Some(f) => f
            .strip_prefix('0')
            .unwrap_or(f)
            .parse::<usize>()
            .map_err(|_| {
                StatsError::InvalidConfig(format!(
                    "invalid width '{f}' in path template '{source}'"
                ))
            })?,
    };
    Ok(Piece::Field {
        name: name.to_string(),
        width,
    })
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for PathTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        PathTemplate::parse(&source).map_err(serde::de::Error::custom)
    }
}
