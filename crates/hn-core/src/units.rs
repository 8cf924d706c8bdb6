// hn-core/src/units.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use uom::si::f64::{
    Area as UomArea, DynamicViscosity as UomDynamicViscosity, Length as UomLength,
    MassDensity as UomMassDensity, MassRate as UomMassRate, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    Velocity as UomVelocity, Volume as UomVolume, VolumeRate as UomVolumeRate,
};

use crate::{CoreError, CoreResult};

/// Physical dimension a property value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitDimension {
    Dimensionless,
    Length,
    Area,
    Volume,
    Velocity,
    Pressure,
    Temperature,
    Time,
    MassFlow,
    VolumeFlow,
    Density,
    Viscosity,
}

impl UnitDimension {
    pub const ALL: [UnitDimension; 12] = [
        UnitDimension::Dimensionless,
        UnitDimension::Length,
        UnitDimension::Area,
        UnitDimension::Volume,
        UnitDimension::Velocity,
        UnitDimension::Pressure,
        UnitDimension::Temperature,
        UnitDimension::Time,
        UnitDimension::MassFlow,
        UnitDimension::VolumeFlow,
        UnitDimension::Density,
        UnitDimension::Viscosity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UnitDimension::Dimensionless => "Dimensionless",
            UnitDimension::Length => "Length",
            UnitDimension::Area => "Area",
            UnitDimension::Volume => "Volume",
            UnitDimension::Velocity => "Velocity",
            UnitDimension::Pressure => "Pressure",
            UnitDimension::Temperature => "Temperature",
            UnitDimension::Time => "Time",
            UnitDimension::MassFlow => "MassFlow",
            UnitDimension::VolumeFlow => "VolumeFlow",
            UnitDimension::Density => "Density",
            UnitDimension::Viscosity => "Viscosity",
        }
    }

    /// Display units accepted for this dimension; the first is SI.
    pub fn units(self) -> Vec<UnitDef> {
        use uom::si::{
            area, dynamic_viscosity, length, mass_density, mass_rate, pressure,
            thermodynamic_temperature as temp, time, velocity, volume, volume_rate,
        };

        match self {
            UnitDimension::Dimensionless => vec![
                UnitDef::linear("-", |v| v),
                UnitDef::linear("%", |v| v / 100.0),
            ],
            UnitDimension::Length => vec![
                UnitDef::linear("m", |v| UomLength::new::<length::meter>(v).value),
                UnitDef::linear("mm", |v| UomLength::new::<length::millimeter>(v).value),
                UnitDef::linear("cm", |v| UomLength::new::<length::centimeter>(v).value),
                UnitDef::linear("km", |v| UomLength::new::<length::kilometer>(v).value),
                UnitDef::linear("ft", |v| UomLength::new::<length::foot>(v).value),
                UnitDef::linear("in", |v| UomLength::new::<length::inch>(v).value),
            ],
            UnitDimension::Area => vec![
                UnitDef::linear("m2", |v| UomArea::new::<area::square_meter>(v).value),
                UnitDef::linear("mm2", |v| UomArea::new::<area::square_millimeter>(v).value),
                UnitDef::linear("ft2", |v| UomArea::new::<area::square_foot>(v).value),
                UnitDef::linear("in2", |v| UomArea::new::<area::square_inch>(v).value),
            ],
            UnitDimension::Volume => vec![
                UnitDef::linear("m3", |v| UomVolume::new::<volume::cubic_meter>(v).value),
                UnitDef::linear("l", |v| UomVolume::new::<volume::liter>(v).value),
                UnitDef::linear("ft3", |v| UomVolume::new::<volume::cubic_foot>(v).value),
                UnitDef::linear("gal", |v| UomVolume::new::<volume::gallon>(v).value),
            ],
            UnitDimension::Velocity => vec![
                UnitDef::linear("m/s", |v| {
                    UomVelocity::new::<velocity::meter_per_second>(v).value
                }),
                UnitDef::linear("ft/s", |v| {
                    UomVelocity::new::<velocity::foot_per_second>(v).value
                }),
                UnitDef::linear("km/h", |v| {
                    UomVelocity::new::<velocity::kilometer_per_hour>(v).value
                }),
            ],
            UnitDimension::Pressure => vec![
                UnitDef::linear("Pa", |v| UomPressure::new::<pressure::pascal>(v).value),
                UnitDef::linear("kPa", |v| UomPressure::new::<pressure::kilopascal>(v).value),
                UnitDef::linear("MPa", |v| UomPressure::new::<pressure::megapascal>(v).value),
                UnitDef::linear("bar", |v| UomPressure::new::<pressure::bar>(v).value),
                UnitDef::linear("psi", |v| {
                    UomPressure::new::<pressure::pound_force_per_square_inch>(v).value
                }),
            ],
            UnitDimension::Temperature => vec![
                UnitDef::linear("K", |v| {
                    UomThermodynamicTemperature::new::<temp::kelvin>(v).value
                }),
                UnitDef::linear("degC", |v| {
                    UomThermodynamicTemperature::new::<temp::degree_celsius>(v).value
                }),
                UnitDef::linear("degF", |v| {
                    UomThermodynamicTemperature::new::<temp::degree_fahrenheit>(v).value
                }),
            ],
            UnitDimension::Time => vec![
                UnitDef::linear("s", |v| UomTime::new::<time::second>(v).value),
                UnitDef::linear("min", |v| UomTime::new::<time::minute>(v).value),
                UnitDef::linear("h", |v| UomTime::new::<time::hour>(v).value),
            ],
            UnitDimension::MassFlow => vec![
                UnitDef::linear("kg/s", |v| {
                    UomMassRate::new::<mass_rate::kilogram_per_second>(v).value
                }),
                UnitDef::linear("g/s", |v| {
                    UomMassRate::new::<mass_rate::gram_per_second>(v).value
                }),
            ],
            UnitDimension::VolumeFlow => vec![
                UnitDef::linear("m3/s", |v| {
                    UomVolumeRate::new::<volume_rate::cubic_meter_per_second>(v).value
                }),
                UnitDef::linear("l/s", |v| {
                    UomVolumeRate::new::<volume_rate::liter_per_second>(v).value
                }),
                UnitDef::linear("ft3/s", |v| {
                    UomVolumeRate::new::<volume_rate::cubic_foot_per_second>(v).value
                }),
            ],
            UnitDimension::Density => vec![
                UnitDef::linear("kg/m3", |v| {
                    UomMassDensity::new::<mass_density::kilogram_per_cubic_meter>(v).value
                }),
                UnitDef::linear("g/cm3", |v| {
                    UomMassDensity::new::<mass_density::gram_per_cubic_centimeter>(v).value
                }),
            ],
            UnitDimension::Viscosity => vec![
                UnitDef::linear("Pa.s", |v| {
                    UomDynamicViscosity::new::<dynamic_viscosity::pascal_second>(v).value
                }),
                UnitDef::linear("cP", |v| {
                    UomDynamicViscosity::new::<dynamic_viscosity::centipoise>(v).value
                }),
            ],
        }
    }

    pub fn si_unit(self) -> UnitDef {
        // every dimension lists its SI unit first
        self.units()
            .into_iter()
            .next()
            .unwrap_or_else(|| UnitDef::linear("-", |v| v))
    }
}

impl fmt::Display for UnitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UnitDimension {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitDimension::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownDimension {
                name: s.to_string(),
            })
    }
}

/// A display unit: `si = display * factor + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDef {
    pub name: String,
    pub factor: f64,
    pub offset: f64,
}

impl UnitDef {
    fn linear(name: &str, to_si: impl Fn(f64) -> f64) -> Self {
        let offset = to_si(0.0);
        Self {
            name: name.to_string(),
            factor: to_si(1.0) - offset,
            offset,
        }
    }

    pub fn to_si(&self, display: f64) -> f64 {
        display * self.factor + self.offset
    }

    pub fn from_si(&self, si: f64) -> f64 {
        (si - self.offset) / self.factor
    }
}

/// Case-wide choice of display unit per dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTable {
    units: BTreeMap<UnitDimension, UnitDef>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::si()
    }
}

impl UnitTable {
    /// All dimensions in SI.
    pub fn si() -> Self {
        let units = UnitDimension::ALL
            .iter()
            .map(|&d| (d, d.si_unit()))
            .collect();
        Self { units }
    }

    /// Select the display unit for a dimension by name.
    pub fn set(&mut self, dimension: UnitDimension, unit: &str) -> CoreResult<()> {
        let def = dimension
            .units()
            .into_iter()
            .find(|u| u.name == unit)
            .ok_or_else(|| CoreError::UnknownUnit {
                dimension: dimension.to_string(),
                unit: unit.to_string(),
            })?;
        self.units.insert(dimension, def);
        Ok(())
    }

    pub fn unit(&self, dimension: UnitDimension) -> UnitDef {
        self.units
            .get(&dimension)
            .cloned()
            .unwrap_or_else(|| dimension.si_unit())
    }

    /// Multiplicative factor from display unit to SI.
    pub fn factor(&self, dimension: UnitDimension) -> f64 {
        self.unit(dimension).factor
    }

    pub fn to_si(&self, dimension: UnitDimension, display: f64) -> f64 {
        self.unit(dimension).to_si(display)
    }

    pub fn from_si(&self, dimension: UnitDimension, si: f64) -> f64 {
        self.unit(dimension).from_si(si)
    }

    /// Dimensions whose display unit differs from SI, with the unit name.
    pub fn non_si(&self) -> Vec<(UnitDimension, String)> {
        self.units
            .iter()
            .filter(|(d, u)| u.name != d.si_unit().name)
            .map(|(d, u)| (*d, u.name.clone()))
            .collect()
    }
}
