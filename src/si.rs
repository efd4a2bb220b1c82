// src/si.rs
//
// Minimal SI unit bookkeeping for field queries.
//
// A unit is a scale factor relative to the SI base unit of its dimension,
// e.g. the nanometre is SiUnit { factor: 1e-9, dims: length }. Field values
// are stored internally in base SI units; converting to a requested unit
// divides by its factor, and the dimension exponents let us reject
// conversions between incompatible quantities instead of silently
// mis-scaling them.

use std::fmt;
use std::ops::{Div, Mul};

/// SI dimension exponents (only the base units this code needs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub metre: i8,
    pub kilogram: i8,
    pub second: i8,
    pub ampere: i8,
}

impl Dimensions {
    pub const NONE: Dimensions = Dimensions {
        metre: 0,
        kilogram: 0,
        second: 0,
        ampere: 0,
    };
}

/// A physical unit: scale factor times a product of SI base units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiUnit {
    pub factor: f64,
    pub dims: Dimensions,
}

impl SiUnit {
    pub const fn new(factor: f64, dims: Dimensions) -> Self {
        Self { factor, dims }
    }

    pub const fn dimensionless() -> Self {
        Self::new(1.0, Dimensions::NONE)
    }

    pub const fn metre() -> Self {
        Self::new(
            1.0,
            Dimensions {
                metre: 1,
                kilogram: 0,
                second: 0,
                ampere: 0,
            },
        )
    }

    pub const fn ampere() -> Self {
        Self::new(
            1.0,
            Dimensions {
                metre: 0,
                kilogram: 0,
                second: 0,
                ampere: 1,
            },
        )
    }

    /// A/m, for magnetisation and magnetic field strength.
    pub const fn ampere_per_metre() -> Self {
        Self::new(
            1.0,
            Dimensions {
                metre: -1,
                kilogram: 0,
                second: 0,
                ampere: 1,
            },
        )
    }

    /// A/m², the magnetic charge density of the BEM formulation.
    pub const fn ampere_per_metre2() -> Self {
        Self::new(
            1.0,
            Dimensions {
                metre: -2,
                kilogram: 0,
                second: 0,
                ampere: 1,
            },
        )
    }

    /// Same dimensions, rescaled factor (e.g. `metre().scaled(1e-9)` is the nanometre).
    pub fn scaled(self, s: f64) -> Self {
        Self::new(self.factor * s, self.dims)
    }

    /// Integer power of the unit.
    pub fn powi(self, n: i8) -> Self {
        Self::new(
            self.factor.powi(n as i32),
            Dimensions {
                metre: self.dims.metre * n,
                kilogram: self.dims.kilogram * n,
                second: self.dims.second * n,
                ampere: self.dims.ampere * n,
            },
        )
    }

    /// True if both units measure the same physical quantity.
    pub fn compatible(&self, other: &SiUnit) -> bool {
        self.dims == other.dims
    }

    /// A value expressed in this unit, in base SI units.
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.factor
    }

    /// A base-SI value expressed in this unit.
    pub fn from_si(&self, value_si: f64) -> f64 {
        value_si / self.factor
    }

    /// Convert a value in this unit into `to`. None if the dimensions differ.
    pub fn convert(&self, value: f64, to: &SiUnit) -> Option<f64> {
        if !self.compatible(to) {
            return None;
        }
        Some(value * self.factor / to.factor)
    }
}

impl Mul for SiUnit {
    type Output = SiUnit;
    fn mul(self, rhs: SiUnit) -> SiUnit {
        SiUnit::new(
            self.factor * rhs.factor,
            Dimensions {
                metre: self.dims.metre + rhs.dims.metre,
                kilogram: self.dims.kilogram + rhs.dims.kilogram,
                second: self.dims.second + rhs.dims.second,
                ampere: self.dims.ampere + rhs.dims.ampere,
            },
        )
    }
}

impl Div for SiUnit {
    type Output = SiUnit;
    fn div(self, rhs: SiUnit) -> SiUnit {
        self * rhs.powi(-1)
    }
}

impl fmt::Display for SiUnit {
    /// Renders e.g. "A/m", "A/m^2", "1e-9 m", "1" (dimensionless).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.factor != 1.0 {
            write!(f, "{:e} ", self.factor)?;
        }

        let parts = [
            ("m", self.dims.metre),
            ("kg", self.dims.kilogram),
            ("s", self.dims.second),
            ("A", self.dims.ampere),
        ];

        let mut num = String::new();
        let mut den = String::new();
        for (sym, exp) in parts {
            if exp > 0 {
                if !num.is_empty() {
                    num.push(' ');
                }
                num.push_str(sym);
                if exp > 1 {
                    num.push_str(&format!("^{}", exp));
                }
            } else if exp < 0 {
                if !den.is_empty() {
                    den.push(' ');
                }
                den.push_str(sym);
                if exp < -1 {
                    den.push_str(&format!("^{}", -exp));
                }
            }
        }

        if num.is_empty() {
            num.push('1');
        }
        if den.is_empty() {
            write!(f, "{}", num)
        } else {
            write!(f, "{}/{}", num, den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_between_compatible_units_rescales() {
        let a_per_m = SiUnit::ampere_per_metre();
        let ka_per_m = a_per_m.scaled(1e3);

        // 1e6 A/m is 1000 kA/m.
        let v = a_per_m.convert(1.0e6, &ka_per_m).unwrap();
        assert!((v - 1000.0).abs() < 1e-9, "got {}", v);

        // And back.
        let w = ka_per_m.convert(v, &a_per_m).unwrap();
        assert!((w - 1.0e6).abs() < 1e-6, "got {}", w);
    }

    #[test]
    fn conversion_between_incompatible_units_is_rejected() {
        let phi_unit = SiUnit::ampere();
        let rho_unit = SiUnit::ampere_per_metre2();
        assert!(phi_unit.convert(1.0, &rho_unit).is_none());
    }

    #[test]
    fn unit_algebra_builds_derived_dimensions() {
        let built = SiUnit::ampere() / SiUnit::metre().powi(2);
        assert!(built.compatible(&SiUnit::ampere_per_metre2()));
        assert!((built.factor - 1.0).abs() < 1e-15);

        let h_times_length = SiUnit::ampere_per_metre() * SiUnit::metre();
        assert!(h_times_length.compatible(&SiUnit::ampere()));
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(SiUnit::ampere_per_metre().to_string(), "A/m");
        assert_eq!(SiUnit::ampere_per_metre2().to_string(), "A/m^2");
        assert_eq!(SiUnit::metre().scaled(1e-9).to_string(), "1e-9 m");
        assert_eq!(SiUnit::dimensionless().to_string(), "1");
    }
}
