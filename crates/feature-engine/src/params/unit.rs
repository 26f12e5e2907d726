use serde::{Deserialize, Serialize};

/// Display unit attached to a parameter. Expressions always combine raw values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    Unitless,
    Millimeter,
    Centimeter,
    Meter,
    Inch,
    Degree,
    Radian,
}

impl Unit {
    /// Convert to the base unit of the quantity: millimeters for lengths,
    /// radians for angles.
    pub fn to_base(self, value: f64) -> f64 {
        match self {
            Unit::Unitless | Unit::Millimeter | Unit::Radian => value,
            Unit::Centimeter => value * 10.0,
            Unit::Meter => value * 1000.0,
            Unit::Inch => value * 25.4,
            Unit::Degree => value.to_radians(),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Unitless => "",
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::Inch => "in",
            Unit::Degree => "deg",
            Unit::Radian => "rad",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_conversions() {
        assert_eq!(Unit::Inch.to_base(2.0), 50.8);
        assert_eq!(Unit::Meter.to_base(0.5), 500.0);
        assert!((Unit::Degree.to_base(180.0) - std::f64::consts::PI).abs() < 1e-15);
    }
}
