use std::collections::HashSet;
use std::f32::consts::PI;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use roxmltree::{Document, Node};

const DEFAULT_SCALE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
}

#[derive(Debug, Clone)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentError {}

/// Where one named model sits in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDef {
    /// Identity name; also names `model/<name>.gltf`, `audio/<name>.wav` and `textures/<name>.png`.
    pub name: String,
    pub position: Vec3,
    /// Radians about +Y, before the model's own base rotation.
    pub heading: f32,
    pub scale: f32,
    pub sound: bool,
}

pub fn compile_placement_roster(path: &Path) -> Result<Vec<PlacementDef>, ContentError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_placement_roster(path, &raw)
}

pub fn parse_placement_roster(
    file_path: &Path,
    raw: &str,
) -> Result<Vec<PlacementDef>, ContentError> {
    let doc = Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut seen_names = HashSet::<String>::new();
    let mut defs = Vec::<PlacementDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "PlacementDef" {
            return Err(error_at_node(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; expected <PlacementDef>",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        let def = parse_placement_def(file_path, &doc, child)?;
        if !seen_names.insert(def.name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateDef,
                format!("duplicate PlacementDef '{}'", def.name),
                file_path,
                &doc,
                child,
            ));
        }
        defs.push(def);
    }

    Ok(defs)
}

fn parse_placement_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<PlacementDef, ContentError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut name: Option<String> = None;
    let mut position: Option<Vec3> = None;
    let mut heading: Option<f32> = None;
    let mut scale: Option<f32> = None;
    let mut sound: Option<bool> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <PlacementDef>", field_name),
                file_path,
                doc,
                field,
            ));
        }

        let value = required_text(file_path, doc, field, &field_name)?;
        let invalid = |message: String| {
            error_at_node(ContentErrorCode::InvalidValue, message, file_path, doc, field)
        };
        match field_name.as_str() {
            "name" => {
                if !is_asset_safe_name(&value) {
                    return Err(invalid(format!(
                        "name '{}' may only contain ASCII letters, digits, '_' and '-'",
                        value
                    )));
                }
                name = Some(value);
            }
            "position" => {
                let parsed = parse_vec3(&value).ok_or_else(|| {
                    invalid(format!(
                        "position '{}' must be three finite numbers separated by spaces",
                        value
                    ))
                })?;
                position = Some(parsed);
            }
            "heading" => {
                let parsed = parse_angle(&value).ok_or_else(|| {
                    invalid(format!(
                        "heading '{}' must be a number of radians or a multiple of pi such as pi/3",
                        value
                    ))
                })?;
                heading = Some(parsed);
            }
            "scale" => {
                let parsed = value
                    .parse::<f32>()
                    .ok()
                    .filter(|parsed| parsed.is_finite() && *parsed > 0.0)
                    .ok_or_else(|| invalid("scale must be finite and > 0".to_string()))?;
                scale = Some(parsed);
            }
            "sound" => {
                let parsed = match value.as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(invalid(format!(
                            "invalid sound '{}'; allowed values: true, false",
                            value
                        )))
                    }
                };
                sound = Some(parsed);
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <PlacementDef>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(name) = name else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            "missing required field <name> in <PlacementDef>".to_string(),
            file_path,
            doc,
            node,
        ));
    };
    let Some(position) = position else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            "missing required field <position> in <PlacementDef>".to_string(),
            file_path,
            doc,
            node,
        ));
    };

    Ok(PlacementDef {
        name,
        position,
        heading: heading.unwrap_or(0.0),
        scale: scale.unwrap_or(DEFAULT_SCALE),
        sound: sound.unwrap_or(true),
    })
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentError {
    let pos = doc.text_pos_at(node.range().start);
    ContentError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

fn is_asset_safe_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn parse_vec3(value: &str) -> Option<Vec3> {
    let parts = value
        .split_whitespace()
        .map(|part| part.parse::<f32>().ok().filter(|parsed| parsed.is_finite()))
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

/// Accepts plain radians (`0.5`) or `[coefficient]pi[/divisor]` (`pi/3`, `-pi/6`, `1.3pi`).
fn parse_angle(value: &str) -> Option<f32> {
    let value = value.trim();
    let Some(pi_index) = value.find("pi") else {
        return value.parse::<f32>().ok().filter(|parsed| parsed.is_finite());
    };

    let coefficient = match value[..pi_index].trim() {
        "" | "+" => 1.0,
        "-" => -1.0,
        text => text.trim_end_matches('*').trim().parse::<f32>().ok()?,
    };
    let rest = value[pi_index + 2..].trim();
    let divisor = if rest.is_empty() {
        1.0
    } else {
        rest.strip_prefix('/')?.trim().parse::<f32>().ok()?
    };
    if divisor == 0.0 {
        return None;
    }
    Some(coefficient * PI / divisor).filter(|angle| angle.is_finite())
}
