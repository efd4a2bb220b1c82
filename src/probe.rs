// src/probe.rs
//
// Line probe: sample a set of fields along a coordinate axis on a uniform
// grid and emit one table row per grid point. Fields that are undefined at
// a point (outside the meshed region) contribute a sentinel value instead,
// independently per field; a vector field is substituted as a whole, never
// component by component.

use std::io::{self, Write};

use crate::fields::{FieldSource, FieldValue};
use crate::si::SiUnit;
use crate::table::TableWriter;

/// Sentinel written for undefined samples. Small enough to be obvious in
/// plots and impossible as a physical field value at these scales.
pub const DEFAULT_SENTINEL: f64 = 1e-99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Label of the coordinate column for a probe along this axis.
    pub fn coord_label(&self) -> &'static str {
        match self {
            Axis::X => "x_coords",
            Axis::Y => "y_coords",
            Axis::Z => "z_coords",
        }
    }
}

/// A uniform sampling grid along one axis, `lo..=hi` steps of `step` in
/// units of `pos_unit`. Coordinates are derived from the integer index
/// (i * step, never accumulated), so the grid carries no floating point
/// drift and rows come out in strictly ascending order.
pub struct LineProbe {
    pub lo: i64,
    pub hi: i64,
    pub step: f64,
    pub pos_unit: SiUnit,
    pub axis: Axis,
    pub sentinel: f64,
}

/// One sampled row: the coordinate (in probe units) and the flattened
/// field values in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub coord: f64,
    pub values: Vec<f64>,
}

impl LineProbe {
    pub fn new(axis: Axis, lo: i64, hi: i64, step: f64, pos_unit: SiUnit) -> Self {
        Self {
            lo,
            hi,
            step,
            pos_unit,
            axis,
            sentinel: DEFAULT_SENTINEL,
        }
    }

    pub fn along_x(lo: i64, hi: i64, step: f64, pos_unit: SiUnit) -> Self {
        Self::new(Axis::X, lo, hi, step, pos_unit)
    }

    pub fn with_sentinel(mut self, sentinel: f64) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Number of rows the probe will emit (0 when hi < lo).
    pub fn n_rows(&self) -> usize {
        if self.hi < self.lo {
            0
        } else {
            (self.hi - self.lo + 1) as usize
        }
    }

    /// Coordinate of grid index `i` in probe units.
    pub fn coord(&self, i: i64) -> f64 {
        i as f64 * self.step
    }

    /// Position of grid index `i` in metres.
    pub fn position_m(&self, i: i64) -> [f64; 3] {
        let mut p = [0.0; 3];
        p[self.axis.index()] = self.pos_unit.to_si(self.coord(i));
        p
    }

    /// Sample all sources at grid index `i`. Undefined fields contribute
    /// `sentinel` once per component.
    pub fn sample_row(&self, i: i64, sources: &[&dyn FieldSource]) -> SampleRow {
        let pos = self.position_m(i);
        let mut values = Vec::new();
        for src in sources {
            match src.probe(pos) {
                Some(v) => {
                    debug_assert!(
                        v.kind() == src.kind(),
                        "source '{}' returned a {:?} value but declares {:?}",
                        src.name(),
                        v.kind(),
                        src.kind()
                    );
                    match v {
                        FieldValue::Scalar(s) => values.push(s),
                        FieldValue::Vector(v) => values.extend_from_slice(&v),
                    }
                }
                None => {
                    for _ in 0..src.kind().components() {
                        values.push(self.sentinel);
                    }
                }
            }
        }
        SampleRow {
            coord: self.coord(i),
            values,
        }
    }
}

/// Run the probe over all grid points and write the rows to `out`.
/// Returns the number of rows written. The caller builds the writer with
/// matching column labels and calls `finish` afterwards.
pub fn run_probe<W: Write>(
    probe: &LineProbe,
    sources: &[&dyn FieldSource],
    out: &mut TableWriter<W>,
) -> io::Result<usize> {
    let mut n = 0;
    for i in probe.lo..=probe.hi {
        let row = probe.sample_row(i, sources);
        out.write_row(row.coord, &row.values)?;
        n += 1;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldKind;
    use crate::table::{column_labels, TableWriter};

    struct Uniform {
        name: &'static str,
        v: FieldValue,
    }

    impl FieldSource for Uniform {
        fn name(&self) -> &str {
            self.name
        }
        fn kind(&self) -> FieldKind {
            self.v.kind()
        }
        fn unit(&self) -> SiUnit {
            SiUnit::dimensionless()
        }
        fn probe(&self, _pos_m: [f64; 3]) -> Option<FieldValue> {
            Some(self.v)
        }
    }

    struct Nowhere {
        name: &'static str,
        kind: FieldKind,
    }

    impl FieldSource for Nowhere {
        fn name(&self) -> &str {
            self.name
        }
        fn kind(&self) -> FieldKind {
            self.kind
        }
        fn unit(&self) -> SiUnit {
            SiUnit::dimensionless()
        }
        fn probe(&self, _pos_m: [f64; 3]) -> Option<FieldValue> {
            None
        }
    }

    /// Vector field defined only inside a ball around the origin.
    struct InsideRadius {
        radius_m: f64,
    }

    impl FieldSource for InsideRadius {
        fn name(&self) -> &str {
            "h"
        }
        fn kind(&self) -> FieldKind {
            FieldKind::Vector
        }
        fn unit(&self) -> SiUnit {
            SiUnit::ampere_per_metre()
        }
        fn probe(&self, p: [f64; 3]) -> Option<FieldValue> {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            if r <= self.radius_m {
                Some(FieldValue::Vector([1.0, 2.0, 3.0]))
            } else {
                None
            }
        }
    }

    #[test]
    fn rows_come_out_in_ascending_coordinate_order() {
        let probe = LineProbe::along_x(-3, 5, 0.1, SiUnit::dimensionless());
        assert_eq!(probe.n_rows(), 9);
        let mut prev = f64::NEG_INFINITY;
        for i in probe.lo..=probe.hi {
            let c = probe.coord(i);
            assert!(c > prev, "coord {} after {} is not ascending", c, prev);
            prev = c;
        }
        assert!((probe.coord(-3) + 0.3).abs() < 1e-15);
        assert!((probe.coord(5) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn undefined_vector_field_is_substituted_as_a_whole() {
        let probe = LineProbe::along_x(0, 0, 1.0, SiUnit::dimensionless());
        let missing = Nowhere {
            name: "h",
            kind: FieldKind::Vector,
        };
        let row = probe.sample_row(0, &[&missing]);
        assert_eq!(row.values, vec![DEFAULT_SENTINEL; 3]);
    }

    #[test]
    fn substitution_is_independent_per_field() {
        let probe = LineProbe::along_x(0, 0, 1.0, SiUnit::dimensionless());
        let present = Uniform {
            name: "phi",
            v: FieldValue::Scalar(42.0),
        };
        let missing = Nowhere {
            name: "rho",
            kind: FieldKind::Scalar,
        };
        let row = probe.sample_row(0, &[&missing, &present]);
        assert_eq!(row.values, vec![DEFAULT_SENTINEL, 42.0]);
    }

    #[test]
    fn custom_sentinel_replaces_the_default() {
        let probe =
            LineProbe::along_x(0, 0, 1.0, SiUnit::dimensionless()).with_sentinel(-7.25);
        let missing = Nowhere {
            name: "rho",
            kind: FieldKind::Scalar,
        };
        let row = probe.sample_row(0, &[&missing]);
        assert_eq!(row.values, vec![-7.25]);
    }

    #[test]
    fn ball_shaped_domain_yields_defined_rows_only_near_the_centre() {
        // Grid from -10.0 to 10.0 in steps of 0.1 (metre positions), field
        // defined within radius 1.05: indices -10..=10 hit it, so 21 of the
        // 201 rows carry real values.
        let probe = LineProbe::along_x(-100, 100, 0.1, SiUnit::metre());
        let ball = InsideRadius { radius_m: 1.05 };
        let mut defined = 0;
        for i in probe.lo..=probe.hi {
            let row = probe.sample_row(i, &[&ball]);
            assert_eq!(row.values.len(), 3);
            if row.values[0] != DEFAULT_SENTINEL {
                defined += 1;
                assert_eq!(row.values, vec![1.0, 2.0, 3.0]);
            }
        }
        assert_eq!(defined, 21, "expected 21 in-ball rows");
    }

    #[test]
    fn empty_range_writes_header_only() {
        let probe = LineProbe::along_x(1, 0, 0.1, SiUnit::dimensionless());
        assert_eq!(probe.n_rows(), 0);
        let present = Uniform {
            name: "phi",
            v: FieldValue::Scalar(1.0),
        };
        let sources: [&dyn FieldSource; 1] = [&present];
        let labels = column_labels(probe.axis.coord_label(), &sources);

        let mut buf: Vec<u8> = Vec::new();
        let mut t = TableWriter::from_writer(&mut buf, &labels).unwrap();
        let n = run_probe(&probe, &sources, &mut t).unwrap();
        t.finish().unwrap();

        assert_eq!(n, 0);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "x_coords\tphi\n");
    }

    #[test]
    fn probe_output_is_byte_identical_across_runs() {
        let probe = LineProbe::along_x(-20, 20, 0.1, SiUnit::metre());
        let ball = InsideRadius { radius_m: 1.05 };
        let phi = Uniform {
            name: "phi",
            v: FieldValue::Scalar(0.5),
        };
        let sources: [&dyn FieldSource; 2] = [&ball, &phi];
        let labels = column_labels(probe.axis.coord_label(), &sources);

        let run = || -> Vec<u8> {
            let mut buf: Vec<u8> = Vec::new();
            let mut t = TableWriter::from_writer(&mut buf, &labels).unwrap();
            run_probe(&probe, &sources, &mut t).unwrap();
            t.finish().unwrap();
            buf
        };
        let a = run();
        let b = run();
        assert!(!a.is_empty());
        assert_eq!(a, b, "repeated runs must produce identical bytes");
    }
}
