//! Element definitions and their in-memory payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest number of dimensions an element may declare.
pub const MAX_DIMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Float64,
    Int32,
    Char,
}

impl ElementType {
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Float64 => "float64",
            ElementType::Int32 => "int32",
            ElementType::Char => "char",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name, type and shape of an element.
///
/// `dims` is empty for a scalar. For `Char` elements `dims` is the shape of
/// the string array and `width` the byte width of each string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDef {
    pub name: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: usize,
    #[serde(default)]
    pub dims: Vec<usize>,
}

fn is_zero(v: &usize) -> bool {
    *v == 0
}

impl ElementDef {
    pub fn float64(name: impl Into<String>, dims: &[usize]) -> Self {
        Self {
            name: name.into(),
            element_type: ElementType::Float64,
            width: 0,
            dims: dims.to_vec(),
        }
    }

    pub fn int32(name: impl Into<String>, dims: &[usize]) -> Self {
        Self {
            name: name.into(),
            element_type: ElementType::Int32,
            width: 0,
            dims: dims.to_vec(),
        }
    }

    pub fn chars(name: impl Into<String>, width: usize, dims: &[usize]) -> Self {
        Self {
            name: name.into(),
            element_type: ElementType::Char,
            width,
            dims: dims.to_vec(),
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of values (strings for `Char`), saturating at `usize::MAX`.
    pub fn value_count(&self) -> usize {
        self.checked_value_count().unwrap_or(usize::MAX)
    }

    /// Payload size in bytes, saturating at `usize::MAX`.
    pub fn byte_len(&self) -> usize {
        self.checked_byte_len().unwrap_or(usize::MAX)
    }

    fn checked_value_count(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
    }

    fn checked_byte_len(&self) -> Option<usize> {
        let per_value = match self.element_type {
            ElementType::Float64 => 8,
            ElementType::Int32 => 4,
            ElementType::Char => self.width,
        };
        self.checked_value_count()?.checked_mul(per_value)
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("element name is empty".into());
        }
        if self.dims.len() > MAX_DIMS {
            return Err(format!(
                "element '{}' declares {} dimensions, at most {MAX_DIMS} are supported",
                self.name,
                self.dims.len()
            ));
        }
        if self.dims.contains(&0) {
            return Err(format!("element '{}' has a zero-sized dimension", self.name));
        }
        if self.element_type == ElementType::Char && self.width == 0 {
            return Err(format!("string element '{}' has width 0", self.name));
        }
        if self.checked_byte_len().is_none() {
            return Err(format!(
                "element '{}' shape {:?} is too large to address",
                self.name, self.dims
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ElementData {
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Char(Vec<u8>),
}

impl ElementData {
    pub(crate) fn zeroed(def: &ElementDef) -> Self {
        let n = def.value_count();
        match def.element_type {
            ElementType::Float64 => ElementData::Float64(vec![0.0; n]),
            ElementType::Int32 => ElementData::Int32(vec![0; n]),
            ElementType::Char => ElementData::Char(vec![b' '; n * def.width]),
        }
    }

    pub(crate) fn element_type(&self) -> ElementType {
        match self {
            ElementData::Float64(_) => ElementType::Float64,
            ElementData::Int32(_) => ElementType::Int32,
            ElementData::Char(_) => ElementType::Char,
        }
    }

    pub(crate) fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            ElementData::Float64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ElementData::Int32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ElementData::Char(v) => v.clone(),
        }
    }

    pub(crate) fn from_le_bytes(def: &ElementDef, bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != def.byte_len() {
            return Err(format!(
                "element '{}' has {} bytes on disk, expected {}",
                def.name,
                bytes.len(),
                def.byte_len()
            ));
        }
        Ok(match def.element_type {
            ElementType::Float64 => ElementData::Float64(
                bytes
                    .chunks_exact(8)
                    .map(|c| {
                        let mut b = [0u8; 8];
                        b.copy_from_slice(c);
                        f64::from_le_bytes(b)
                    })
                    .collect(),
            ),
            ElementType::Int32 => ElementData::Int32(
                bytes
                    .chunks_exact(4)
                    .map(|c| {
                        let mut b = [0u8; 4];
                        b.copy_from_slice(c);
                        i32::from_le_bytes(b)
                    })
                    .collect(),
            ),
            ElementType::Char => ElementData::Char(bytes.to_vec()),
        })
    }
}

/// Numeric value types an element can hold.
pub(crate) trait Numeric: Copy {
    const TYPE: ElementType;

    fn values(data: &ElementData) -> Option<&[Self]>;
    fn values_mut(data: &mut ElementData) -> Option<&mut [Self]>;
}

impl Numeric for f64 {
    const TYPE: ElementType = ElementType::Float64;

    fn values(data: &ElementData) -> Option<&[Self]> {
        match data {
            ElementData::Float64(v) => Some(v),
            _ => None,
        }
    }

    fn values_mut(data: &mut ElementData) -> Option<&mut [Self]> {
        match data {
            ElementData::Float64(v) => Some(v),
            _ => None,
        }
    }
}

impl Numeric for i32 {
    const TYPE: ElementType = ElementType::Int32;

    fn values(data: &ElementData) -> Option<&[Self]> {
        match data {
            ElementData::Int32(v) => Some(v),
            _ => None,
        }
    }

    fn values_mut(data: &mut ElementData) -> Option<&mut [Self]> {
        match data {
            ElementData::Int32(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_lengths() {
        assert_eq!(ElementDef::float64("A", &[]).byte_len(), 8);
        assert_eq!(ElementDef::int32("B", &[3, 2]).byte_len(), 24);
        assert_eq!(ElementDef::chars("C", 12, &[4]).byte_len(), 48);
    }

    #[test]
    fn definitions_are_checked() {
        assert!(ElementDef::float64("A", &[1, 1, 1, 1, 1, 1]).check().is_err());
        assert!(ElementDef::float64("A", &[3, 0]).check().is_err());
        assert!(ElementDef::chars("S", 0, &[2]).check().is_err());
        assert!(ElementDef::float64(" ", &[2]).check().is_err());
        assert!(ElementDef::float64("A", &[1, 2, 3, 4, 5]).check().is_ok());
    }

    #[test]
    fn oversized_shapes_saturate_and_fail_the_check() {
        let huge = ElementDef::float64("A", &[usize::MAX, 2]);
        assert_eq!(huge.value_count(), usize::MAX);
        assert_eq!(huge.byte_len(), usize::MAX);
        assert!(huge.check().unwrap_err().contains("too large"));
        let wide = ElementDef::chars("S", usize::MAX, &[2]);
        assert!(wide.check().is_err());
        assert!(ElementData::from_le_bytes(&huge, &[0; 16]).is_err());
    }

    #[test]
    fn payload_bytes_are_little_endian() {
        let def = ElementDef::int32("I", &[2]);
        let data = ElementData::Int32(vec![1, -2]);
        let bytes = data.to_le_bytes();
        assert_eq!(&bytes[..4], &[1, 0, 0, 0]);
        assert_eq!(ElementData::from_le_bytes(&def, &bytes).unwrap(), data);
        assert!(ElementData::from_le_bytes(&def, &bytes[..7]).is_err());
    }
}
