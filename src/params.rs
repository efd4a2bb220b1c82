// src/params.rs

/// Vacuum permeability in SI units (T m / A).
pub const MU0: f64 = 4.0e-7 * std::f64::consts::PI;

/// Material parameters attached to a mesh region.
pub struct Material {
    pub name: String,     // region label, e.g. "Py"
    pub ms: f64,          // saturation magnetisation (A/m)
    pub a_ex: f64,        // exchange coupling (J/m)
}

impl Material {
    pub fn new(name: &str, ms: f64, a_ex: f64) -> Self {
        Self {
            name: name.to_string(),
            ms,
            a_ex,
        }
    }
}
