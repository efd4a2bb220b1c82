// src/table.rs
//
// Tab-separated table output for probe sweeps. The header carries exactly
// one label per data column, every numeric cell is rendered with the same
// fixed 6-decimal format, and a row is written with a single write so the
// file never contains a partial row.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::fields::FieldSource;

/// Header labels for a probe table: the coordinate column followed by one
/// label per field component, in source order.
pub fn column_labels(coord_label: &str, sources: &[&dyn FieldSource]) -> Vec<String> {
    let mut labels = vec![coord_label.to_string()];
    for src in sources {
        labels.extend(src.labels());
    }
    labels
}

fn fmt_cell(v: f64) -> String {
    format!("{:.6}", v)
}

pub struct TableWriter<W: Write> {
    w: W,
    columns: usize,
}

impl TableWriter<BufWriter<File>> {
    /// Create the table file and write its header line.
    pub fn create<P: AsRef<Path>>(path: P, labels: &[String]) -> io::Result<Self> {
        let f = File::create(path)?;
        Self::from_writer(BufWriter::new(f), labels)
    }
}

impl<W: Write> TableWriter<W> {
    /// Wrap an existing writer; the header line goes out immediately.
    pub fn from_writer(mut w: W, labels: &[String]) -> io::Result<Self> {
        if labels.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "table needs at least the coordinate column",
            ));
        }
        let mut header = labels.join("\t");
        header.push('\n');
        w.write_all(header.as_bytes())?;
        Ok(Self {
            w,
            columns: labels.len(),
        })
    }

    /// Write one row: the coordinate followed by the field values. The
    /// value count must match the header, one per data column.
    pub fn write_row(&mut self, coord: f64, values: &[f64]) -> io::Result<()> {
        if values.len() + 1 != self.columns {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "row has {} values but the table has {} data columns",
                    values.len(),
                    self.columns - 1
                ),
            ));
        }
        let mut line = fmt_cell(coord);
        for v in values {
            line.push('\t');
            line.push_str(&fmt_cell(*v));
        }
        line.push('\n');
        self.w.write_all(line.as_bytes())
    }

    /// Flush and close the table. Dropping the writer would flush too but
    /// silently discard any error; call this to surface it.
    pub fn finish(mut self) -> io::Result<()> {
        self.w.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldKind, FieldValue};
    use crate::si::SiUnit;

    struct Named {
        name: &'static str,
        kind: FieldKind,
    }

    impl FieldSource for Named {
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

    #[test]
    fn header_has_one_label_per_component() {
        let m = Named {
            name: "m",
            kind: FieldKind::Vector,
        };
        let phi = Named {
            name: "phi",
            kind: FieldKind::Scalar,
        };
        let sources: [&dyn FieldSource; 2] = [&m, &phi];
        let labels = column_labels("x_coords", &sources);
        assert_eq!(labels, vec!["x_coords", "m_x", "m_y", "m_z", "phi"]);
    }

    #[test]
    fn cells_use_fixed_six_decimal_format() {
        assert_eq!(fmt_cell(1.0e6), "1000000.000000");
        assert_eq!(fmt_cell(-332635.621585), "-332635.621585");
        // The sentinel underflows the fixed format to a plain zero.
        assert_eq!(fmt_cell(1e-99), "0.000000");
        assert_eq!(fmt_cell(0.1 * 7.0), "0.700000");
    }

    #[test]
    fn rows_and_header_produce_exact_bytes() {
        let labels: Vec<String> = ["x_coords", "phi"].iter().map(|s| s.to_string()).collect();
        let mut buf: Vec<u8> = Vec::new();
        let mut t = TableWriter::from_writer(&mut buf, &labels).unwrap();
        t.write_row(-0.1, &[1e-99]).unwrap();
        t.write_row(0.0, &[123456.5]).unwrap();
        t.finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "x_coords\tphi\n-0.100000\t0.000000\n0.000000\t123456.500000\n"
        );
    }

    #[test]
    fn row_arity_must_match_the_header() {
        let labels: Vec<String> = ["x_coords", "rho", "phi"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut buf: Vec<u8> = Vec::new();
        let mut t = TableWriter::from_writer(&mut buf, &labels).unwrap();
        let err = t.write_row(0.0, &[1.0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let msg = err.to_string();
        assert!(msg.contains("1 values"), "unexpected message: {}", msg);
        assert!(msg.contains("2 data columns"), "unexpected message: {}", msg);
    }

    #[test]
    fn table_without_rows_is_just_the_header() {
        let labels: Vec<String> = ["x_coords"].iter().map(|s| s.to_string()).collect();
        let mut buf: Vec<u8> = Vec::new();
        let t = TableWriter::from_writer(&mut buf, &labels).unwrap();
        t.finish().unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "x_coords\n");
    }
}
