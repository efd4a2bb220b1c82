// src/fields.rs
//
// The sampling side of the crate talks to fields through `FieldSource`:
// a named quantity that can be probed at an arbitrary point in space and
// may be undefined there (outside the meshed region, before a solve, ...).
// Undefined is always `None`, never a numeric stand-in; substituting a
// sentinel for table output is the probe layer's job.

use crate::si::SiUnit;

/// Tensor rank of a field as far as tabulation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Vector,
}

impl FieldKind {
    /// Number of table columns a value of this kind occupies.
    pub fn components(&self) -> usize {
        match self {
            FieldKind::Scalar => 1,
            FieldKind::Vector => 3,
        }
    }
}

/// A single sampled value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    Vector([f64; 3]),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Scalar(_) => FieldKind::Scalar,
            FieldValue::Vector(_) => FieldKind::Vector,
        }
    }
}

/// Anything a line probe can sample.
pub trait FieldSource {
    /// Short name used to derive column labels, e.g. "m" or "phi".
    fn name(&self) -> &str;

    fn kind(&self) -> FieldKind;

    /// Unit the probed values are expressed in.
    fn unit(&self) -> SiUnit;

    /// Value at a position given in metres, or None where the field is
    /// not defined.
    fn probe(&self, pos_m: [f64; 3]) -> Option<FieldValue>;

    /// Column labels this source contributes, one per component. Vector
    /// fields get `_x`/`_y`/`_z` suffixes.
    fn labels(&self) -> Vec<String> {
        match self.kind() {
            FieldKind::Scalar => vec![self.name().to_string()],
            FieldKind::Vector => ["x", "y", "z"]
                .iter()
                .map(|c| format!("{}_{}", self.name(), c))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl FieldSource for Flat {
        fn name(&self) -> &str {
            "h_demag"
        }
        fn kind(&self) -> FieldKind {
            FieldKind::Vector
        }
        fn unit(&self) -> SiUnit {
            SiUnit::ampere_per_metre()
        }
        fn probe(&self, _pos_m: [f64; 3]) -> Option<FieldValue> {
            Some(FieldValue::Vector([0.0, 0.0, -1.0]))
        }
    }

    #[test]
    fn vector_labels_get_component_suffixes() {
        let f = Flat;
        assert_eq!(f.labels(), vec!["h_demag_x", "h_demag_y", "h_demag_z"]);
        assert_eq!(f.kind().components(), 3);
    }

    #[test]
    fn value_kind_matches_variant() {
        assert_eq!(FieldValue::Scalar(2.5).kind(), FieldKind::Scalar);
        assert_eq!(FieldValue::Vector([1.0, 0.0, 0.0]).kind(), FieldKind::Vector);
        assert_eq!(FieldKind::Scalar.components(), 1);
    }
}
