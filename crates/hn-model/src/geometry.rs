//! Pipe path geometry.
//!
//! A pipe path is described one of four ways; the `Geometry Type`
//! selection says which one is authoritative. Switching recomputes the
//! other tables, their `Path Length` columns and the total `Length` from
//! the authoritative one.

use std::fmt;
use std::str::FromStr;

use hn_core::{ItemId, Tolerances, UnitDimension, nearly_equal, prefix_difference, prefix_sum};
use nalgebra::{Vector2, Vector3};
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::item::Item;
use crate::network::Network;
use crate::node::ELEVATION;
use crate::table::ColumnSpec;

pub const GEOMETRY_TYPE: &str = "Geometry Type";
pub const LENGTH: &str = "Length";
pub const PROFILE: &str = "Profile";
pub const COORDINATES: &str = "Coordinates";
pub const INCREMENTS: &str = "Increments";
pub const PATH_LENGTH: &str = "Path Length";

const PROFILE_COLUMNS: [&str; 2] = ["Distance", "Height"];
const COORDINATE_COLUMNS: [&str; 3] = ["X", "Y", "Z"];
const INCREMENT_COLUMNS: [&str; 3] = ["dX", "dY", "dZ"];

/// Path representation, numbered as the `Geometry Type` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryRepr {
    /// Total length plus the connected nodes' elevations.
    LengthElevation = 1,
    /// Horizontal distance / height pairs ("l-h").
    DistanceHeight = 2,
    /// Absolute coordinates ("xyz").
    Absolute = 3,
    /// Start point then per-row deltas ("xyz dif").
    Incremental = 4,
}

impl GeometryRepr {
    pub fn from_selection(selection: usize) -> Option<Self> {
        match selection {
            1 => Some(GeometryRepr::LengthElevation),
            2 => Some(GeometryRepr::DistanceHeight),
            3 => Some(GeometryRepr::Absolute),
            4 => Some(GeometryRepr::Incremental),
            _ => None,
        }
    }

    pub fn selection(self) -> usize {
        self as usize
    }
}

impl fmt::Display for GeometryRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeometryRepr::LengthElevation => "length-elevation",
            GeometryRepr::DistanceHeight => "l-h",
            GeometryRepr::Absolute => "xyz",
            GeometryRepr::Incremental => "xyz-dif",
        };
        f.write_str(s)
    }
}

impl FromStr for GeometryRepr {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "le" | "length-elevation" | "length" => Ok(GeometryRepr::LengthElevation),
            "lh" | "l-h" | "profile" => Ok(GeometryRepr::DistanceHeight),
            "xyz" | "absolute" => Ok(GeometryRepr::Absolute),
            "xyz-dif" | "xyz dif" | "incremental" => Ok(GeometryRepr::Incremental),
            other => Err(ModelError::invalid(
                "",
                format!("unknown geometry representation '{other}'"),
            )),
        }
    }
}

/// Cumulative 3-D path length, `s[0] = 0`.
pub fn path_lengths(points: &[Vector3<f64>]) -> Vec<f64> {
    let mut s = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += (p - points[i - 1]).norm();
        }
        s.push(acc);
    }
    s
}

/// Cumulative path length over distance/height pairs.
pub fn planar_path_lengths(distance: &[f64], height: &[f64]) -> Vec<f64> {
    let pts: Vec<Vector2<f64>> = distance
        .iter()
        .zip(height)
        .map(|(&d, &h)| Vector2::new(d, h))
        .collect();
    let mut s = Vec::with_capacity(pts.len());
    let mut acc = 0.0;
    for (i, p) in pts.iter().enumerate() {
        if i > 0 {
            acc += (p - pts[i - 1]).norm();
        }
        s.push(acc);
    }
    s
}

/// The path in the x-z plane (y = 0).
pub fn profile_to_points(distance: &[f64], height: &[f64]) -> Vec<Vector3<f64>> {
    distance
        .iter()
        .zip(height)
        .map(|(&d, &h)| Vector3::new(d, 0.0, h))
        .collect()
}

/// Horizontal distance accumulated from the first point, and height.
pub fn points_to_profile(points: &[Vector3<f64>]) -> (Vec<f64>, Vec<f64>) {
    let mut distance = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            let q = points[i - 1];
            acc += Vector2::new(p.x - q.x, p.y - q.y).norm();
        }
        distance.push(acc);
    }
    (distance, points.iter().map(|p| p.z).collect())
}

/// Two-row profile for a straight pipe of `length` between end elevations.
pub fn length_elevation_to_profile(
    length: f64,
    z_start: f64,
    z_end: f64,
) -> ModelResult<(Vec<f64>, Vec<f64>)> {
    let dz = z_end - z_start;
    if length < dz.abs() && !nearly_equal(length, dz.abs(), Tolerances::geometric()) {
        return Err(ModelError::invalid(
            "",
            format!("length {length} is shorter than the elevation change {}", dz.abs()),
        ));
    }
    let run = (length * length - dz * dz).max(0.0).sqrt();
    Ok((vec![0.0, run], vec![z_start, z_end]))
}

fn axes(points: &[Vector3<f64>]) -> [Vec<f64>; 3] {
    [
        points.iter().map(|p| p.x).collect(),
        points.iter().map(|p| p.y).collect(),
        points.iter().map(|p| p.z).collect(),
    ]
}

fn from_axes(x: &[f64], y: &[f64], z: &[f64]) -> Vec<Vector3<f64>> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((&x, &y), &z)| Vector3::new(x, y, z))
        .collect()
}

fn read_columns<const N: usize>(
    item: &Item,
    table: &str,
    columns: [&str; N],
) -> ModelResult<Vec<Vec<f64>>> {
    let t = item.property(table)?.table()?;
    let mut out = Vec::with_capacity(N);
    for c in columns {
        out.push(t.floats(c)?.to_vec());
    }
    let n = out[0].len();
    if out.iter().any(|c| c.len() != n) {
        return Err(ModelError::invalid(
            &item.qualified_name(),
            format!("'{table}' columns differ in length"),
        ));
    }
    Ok(out)
}

fn write_columns(
    item: &mut Item,
    table: &str,
    columns: &[&str],
    data: Vec<Vec<f64>>,
    path: &[f64],
) -> ModelResult<()> {
    let property = item.property_mut(table)?;
    let key = property.key();
    let t = property.table_mut()?;
    for (c, values) in columns.iter().zip(data) {
        t.add_column(ColumnSpec::float(*c, UnitDimension::Length, key));
        t.set_floats(c, values)?;
    }
    t.add_column(ColumnSpec::float(PATH_LENGTH, UnitDimension::Length, key));
    t.set_floats(PATH_LENGTH, path.to_vec())
}

/// Recompute the pipe's geometry from the authoritative representation and
/// make `target` authoritative.
///
/// `end_elevations` is only read when the path is given by length and
/// elevation. Returns `Ok(false)` when the authoritative table has fewer
/// than two rows.
pub fn reconcile(
    item: &mut Item,
    target: GeometryRepr,
    end_elevations: Option<(f64, f64)>,
) -> ModelResult<bool> {
    let name = item.qualified_name();
    let selection = item
        .property(GEOMETRY_TYPE)?
        .selection()
        .and_then(GeometryRepr::from_selection)
        .ok_or_else(|| ModelError::invalid(&name, "unrecognised geometry type"))?;

    let points = match selection {
        GeometryRepr::LengthElevation => {
            let length = item.get_scalar(LENGTH)?;
            let (z0, z1) = end_elevations.ok_or_else(|| ModelError::NotConnected {
                item: name.clone(),
                what: "end node elevations".into(),
            })?;
            let (d, h) =
                length_elevation_to_profile(length, z0, z1).map_err(|e| e.in_item(&name))?;
            profile_to_points(&d, &h)
        }
        GeometryRepr::DistanceHeight => {
            let cols = read_columns(item, PROFILE, PROFILE_COLUMNS)?;
            profile_to_points(&cols[0], &cols[1])
        }
        GeometryRepr::Absolute => {
            let cols = read_columns(item, COORDINATES, COORDINATE_COLUMNS)?;
            from_axes(&cols[0], &cols[1], &cols[2])
        }
        GeometryRepr::Incremental => {
            let cols = read_columns(item, INCREMENTS, INCREMENT_COLUMNS)?;
            from_axes(
                &prefix_sum(&cols[0]),
                &prefix_sum(&cols[1]),
                &prefix_sum(&cols[2]),
            )
        }
    };
    if points.len() < 2 {
        debug!(item = %name, rows = points.len(), "geometry not switched");
        return Ok(false);
    }

    let path = if selection == GeometryRepr::DistanceHeight {
        let xz: Vec<f64> = points.iter().map(|p| p.x).collect();
        let z: Vec<f64> = points.iter().map(|p| p.z).collect();
        planar_path_lengths(&xz, &z)
    } else {
        path_lengths(&points)
    };

    // Length is bound checked; try it before any table is touched
    let total = path.last().copied().unwrap_or(0.0);
    item.property(LENGTH)?
        .clone()
        .set_scalar(total)
        .map_err(|e| e.in_item(&name))?;

    // The authoritative table keeps its data and only gains the path column.
    let [x, y, z] = axes(&points);
    let (d, h) = points_to_profile(&points);
    let derived = [
        (GeometryRepr::DistanceHeight, PROFILE, &PROFILE_COLUMNS[..], vec![d, h]),
        (
            GeometryRepr::Absolute,
            COORDINATES,
            &COORDINATE_COLUMNS[..],
            vec![x.clone(), y.clone(), z.clone()],
        ),
        (
            GeometryRepr::Incremental,
            INCREMENTS,
            &INCREMENT_COLUMNS[..],
            vec![
                prefix_difference(&x),
                prefix_difference(&y),
                prefix_difference(&z),
            ],
        ),
    ];
    for (repr, table, columns, data) in derived {
        let data = if repr == selection { Vec::new() } else { data };
        write_columns(item, table, columns, data, &path)?;
    }

    item.set_scalar(LENGTH, total)?;
    item.set_scalar(GEOMETRY_TYPE, target.selection() as f64)?;
    debug!(item = %name, from = %selection, to = %target, length = total, "geometry switched");
    Ok(true)
}

impl Network {
    /// Switch a pipe's geometry representation, reading end elevations from
    /// the nodes at connect points 1 and 2 when they are needed.
    pub fn switch_pipe_geometry(&mut self, id: ItemId, target: GeometryRepr) -> ModelResult<bool> {
        let item = self.item(id)?;
        let needs_elevations = item
            .property(GEOMETRY_TYPE)?
            .selection()
            .and_then(GeometryRepr::from_selection)
            == Some(GeometryRepr::LengthElevation);
        let elevations = if needs_elevations {
            let start = self.connected_node(id, 1)?;
            let end = self.connected_node(id, 2)?;
            Some((
                self.item(start)?.get_scalar(ELEVATION)?,
                self.item(end)?.get_scalar(ELEVATION)?,
            ))
        } else {
            None
        };
        reconcile(self.item_mut(id)?, target, elevations)
    }
}
