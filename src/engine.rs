// src/engine.rs
//
// Simulation facade: owns the mesh, the material table and the nodal field
// data, and exposes the fields for probing, querying and export. The demag
// solve itself sits behind the `FieldSolution` trait; this module only
// evaluates a solution at the nodes and interpolates from there, so probes
// see exactly what the exported files contain.
//
// Call order is load_mesh (or set_mesh), set_magnetization, compute_fields,
// then query/probe/save. Probing ahead of that order is not an error, the
// field is simply undefined (None).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;

use crate::fields::{FieldKind, FieldSource, FieldValue};
use crate::mesh::Mesh;
use crate::params::{Material, MU0};
use crate::si::SiUnit;
use crate::vec3::{normalize, scale};

/// Provider of the demagnetising solution, evaluated pointwise in space.
/// Implementations must be safe to call from parallel nodal fills.
pub trait FieldSolution: Send + Sync {
    /// Demagnetising field at `pos_m` (A/m).
    fn h_demag(&self, pos_m: [f64; 3]) -> [f64; 3];

    /// Volume magnetic charge density -div M at `pos_m` (A/m^2).
    fn rho(&self, pos_m: [f64; 3]) -> f64;

    /// Magnetic scalar potential at `pos_m` (A).
    fn phi(&self, pos_m: [f64; 3]) -> f64;
}

/// The fields a simulation can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimField {
    M,
    HDemag,
    Rho,
    Phi,
}

impl SimField {
    pub fn name(&self) -> &'static str {
        match self {
            SimField::M => "m",
            SimField::HDemag => "h_demag",
            SimField::Rho => "rho",
            SimField::Phi => "phi",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            SimField::M | SimField::HDemag => FieldKind::Vector,
            SimField::Rho | SimField::Phi => FieldKind::Scalar,
        }
    }

    /// Base SI unit the field is stored in.
    pub fn si_unit(&self) -> SiUnit {
        match self {
            SimField::M | SimField::HDemag => SiUnit::ampere_per_metre(),
            SimField::Rho => SiUnit::ampere_per_metre2(),
            SimField::Phi => SiUnit::ampere(),
        }
    }

    pub fn all() -> [SimField; 4] {
        [SimField::M, SimField::HDemag, SimField::Rho, SimField::Phi]
    }
}

/// Volume-integrated quantities of the current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub e_demag: f64,     // J
    pub m_avg: [f64; 3],  // volume average of M (A/m)
    pub volume: f64,      // m^3
}

pub struct Simulation {
    pub name: String,
    solver: Box<dyn FieldSolution>,
    mesh: Option<Mesh>,
    materials: Vec<Material>,
    node_material: Vec<Option<usize>>,
    m: Vec<[f64; 3]>,
    h_demag: Vec<[f64; 3]>,
    rho: Vec<f64>,
    phi: Vec<f64>,
    m_set: bool,
    fields_computed: bool,
    summary: Option<Summary>,
}

impl Simulation {
    pub fn new(name: &str, solver: Box<dyn FieldSolution>) -> Self {
        Self {
            name: name.to_string(),
            solver,
            mesh: None,
            materials: Vec::new(),
            node_material: Vec::new(),
            m: Vec::new(),
            h_demag: Vec::new(),
            rho: Vec::new(),
            phi: Vec::new(),
            m_set: false,
            fields_computed: false,
            summary: None,
        }
    }

    fn mesh_ref(&self) -> &Mesh {
        match &self.mesh {
            Some(m) => m,
            None => panic!("simulation '{}' has no mesh loaded", self.name),
        }
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Load an ASCII nmesh file. `unit_length` is the length the file's
    /// coordinates are expressed in, e.g. `SiUnit::metre().scaled(1e-9)`.
    pub fn load_mesh<P: AsRef<Path>>(
        &mut self,
        path: P,
        materials: Vec<Material>,
        unit_length: SiUnit,
    ) -> io::Result<()> {
        assert!(
            unit_length.compatible(&SiUnit::metre()),
            "load_mesh: unit_length {} is not a length",
            unit_length
        );
        let mesh = Mesh::load_nmesh(path, unit_length.factor)?;
        self.set_mesh(mesh, materials)
    }

    /// Attach a mesh built in memory. Region tag k of the mesh selects
    /// materials[k - 1]; a tag without a material is rejected.
    pub fn set_mesh(&mut self, mesh: Mesh, materials: Vec<Material>) -> io::Result<()> {
        for &tag in mesh.regions() {
            if tag < 1 || tag as usize > materials.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "mesh region {} has no material ({} material(s) supplied)",
                        tag,
                        materials.len()
                    ),
                ));
            }
        }
        let n = mesh.n_nodes();
        self.node_material = mesh
            .node_regions()
            .iter()
            .map(|r| r.map(|tag| (tag - 1) as usize))
            .collect();
        self.mesh = Some(mesh);
        self.materials = materials;
        self.m = vec![[0.0; 3]; n];
        self.h_demag = vec![[0.0; 3]; n];
        self.rho = vec![0.0; n];
        self.phi = vec![0.0; n];
        self.m_set = false;
        self.fields_computed = false;
        self.summary = None;
        Ok(())
    }

    /// Set the magnetisation from a direction function of position (metres)
    /// and material name. The direction is normalised and scaled by the
    /// material's Ms; nodes outside every region stay at zero.
    pub fn set_magnetization<F: Fn([f64; 3], &str) -> [f64; 3]>(&mut self, dir: F) {
        let mesh = match &self.mesh {
            Some(m) => m,
            None => panic!("set_magnetization: load a mesh first"),
        };
        let mut m = vec![[0.0; 3]; mesh.n_nodes()];
        for (i, &p) in mesh.nodes().iter().enumerate() {
            if let Some(mi) = self.node_material[i] {
                let mat = &self.materials[mi];
                m[i] = scale(normalize(dir(p, &mat.name)), mat.ms);
            }
        }
        self.m = m;
        self.m_set = true;
        self.fields_computed = false;
        self.summary = None;
    }

    /// Evaluate the solver at every node. Nodal fills run in parallel;
    /// the per-node values do not depend on evaluation order.
    pub fn compute_fields(&mut self) {
        let mesh = match &self.mesh {
            Some(m) => m,
            None => panic!("compute_fields: load a mesh first"),
        };
        assert!(
            self.m_set,
            "compute_fields: set the magnetisation before computing fields"
        );
        let solver = self.solver.as_ref();
        let h: Vec<[f64; 3]> = mesh.nodes().par_iter().map(|&p| solver.h_demag(p)).collect();
        let rho: Vec<f64> = mesh.nodes().par_iter().map(|&p| solver.rho(p)).collect();
        let phi: Vec<f64> = mesh.nodes().par_iter().map(|&p| solver.phi(p)).collect();
        self.h_demag = h;
        self.rho = rho;
        self.phi = phi;
        self.fields_computed = true;
        self.summary = None;
    }

    /// Integrate energy and averages over the mesh and cache the result.
    ///
    /// Uses the exact P1 quadratures per tetrahedron,
    ///   int u v dV = V/20 (sum_i u_i v_i + (sum_i u_i)(sum_i v_i)),
    ///   int u   dV = V/4 sum_i u_i,
    /// and a sequential accumulation so the summary is reproducible.
    pub fn update_energies(&mut self) -> Summary {
        assert!(
            self.fields_computed,
            "update_energies: compute the fields first"
        );
        let mesh = self.mesh_ref();
        let mut mh_int = 0.0;
        let mut m_int = [0.0; 3];
        let mut vol = 0.0;
        for ti in 0..mesh.n_tets() {
            let t = mesh.tets()[ti];
            let v = mesh.tet_volume(ti);
            vol += v;
            for c in 0..3 {
                let mu = [self.m[t[0]][c], self.m[t[1]][c], self.m[t[2]][c], self.m[t[3]][c]];
                let hu = [
                    self.h_demag[t[0]][c],
                    self.h_demag[t[1]][c],
                    self.h_demag[t[2]][c],
                    self.h_demag[t[3]][c],
                ];
                let su: f64 = mu.iter().sum();
                let sh: f64 = hu.iter().sum();
                let prod: f64 = (0..4).map(|k| mu[k] * hu[k]).sum();
                mh_int += v / 20.0 * (prod + su * sh);
                m_int[c] += v / 4.0 * su;
            }
        }
        let s = Summary {
            e_demag: -0.5 * MU0 * mh_int,
            m_avg: scale(m_int, 1.0 / vol),
            volume: vol,
        };
        self.summary = Some(s);
        s
    }

    // -------- queries --------

    /// Sample a field at a point given in metres, in base SI units.
    /// None when no mesh is loaded, the point is outside the mesh, or the
    /// field has not been computed yet.
    pub fn probe_field(&self, field: SimField, pos_m: [f64; 3]) -> Option<FieldValue> {
        let mesh = self.mesh.as_ref()?;
        let available = match field {
            SimField::M => self.m_set,
            _ => self.fields_computed,
        };
        if !available {
            return None;
        }
        match field {
            SimField::M => mesh.sample_vector(pos_m, &self.m).map(FieldValue::Vector),
            SimField::HDemag => mesh
                .sample_vector(pos_m, &self.h_demag)
                .map(FieldValue::Vector),
            SimField::Rho => mesh.sample_scalar(pos_m, &self.rho).map(FieldValue::Scalar),
            SimField::Phi => mesh.sample_scalar(pos_m, &self.phi).map(FieldValue::Scalar),
        }
    }

    fn pos_to_metres(pos: [f64; 3], pos_unit: SiUnit) -> [f64; 3] {
        assert!(
            pos_unit.compatible(&SiUnit::metre()),
            "query: position unit {} is not a length",
            pos_unit
        );
        [
            pos_unit.to_si(pos[0]),
            pos_unit.to_si(pos[1]),
            pos_unit.to_si(pos[2]),
        ]
    }

    /// Sample a scalar field at `pos` (in `pos_unit`), returning the value
    /// expressed in `value_unit`. None where the field is undefined.
    pub fn query_scalar_field(
        &self,
        field: SimField,
        pos: [f64; 3],
        pos_unit: SiUnit,
        value_unit: SiUnit,
    ) -> Option<f64> {
        assert!(
            field.kind() == FieldKind::Scalar,
            "query_scalar_field: '{}' is a vector field",
            field.name()
        );
        assert!(
            value_unit.compatible(&field.si_unit()),
            "query: unit {} cannot express field '{}'",
            value_unit,
            field.name()
        );
        match self.probe_field(field, Self::pos_to_metres(pos, pos_unit))? {
            FieldValue::Scalar(v) => Some(value_unit.from_si(v)),
            FieldValue::Vector(_) => unreachable!("scalar field returned a vector"),
        }
    }

    /// Vector counterpart of `query_scalar_field`.
    pub fn query_vector_field(
        &self,
        field: SimField,
        pos: [f64; 3],
        pos_unit: SiUnit,
        value_unit: SiUnit,
    ) -> Option<[f64; 3]> {
        assert!(
            field.kind() == FieldKind::Vector,
            "query_vector_field: '{}' is a scalar field",
            field.name()
        );
        assert!(
            value_unit.compatible(&field.si_unit()),
            "query: unit {} cannot express field '{}'",
            value_unit,
            field.name()
        );
        match self.probe_field(field, Self::pos_to_metres(pos, pos_unit))? {
            FieldValue::Vector(v) => Some([
                value_unit.from_si(v[0]),
                value_unit.from_si(v[1]),
                value_unit.from_si(v[2]),
            ]),
            FieldValue::Scalar(_) => unreachable!("vector field returned a scalar"),
        }
    }

    /// Borrow a field as a probe source reporting values in `value_unit`.
    pub fn field_source(&self, field: SimField, value_unit: SiUnit) -> SimFieldSource<'_> {
        assert!(
            value_unit.compatible(&field.si_unit()),
            "field '{}' cannot be expressed in {}",
            field.name(),
            value_unit
        );
        SimFieldSource {
            sim: self,
            field,
            unit: value_unit,
        }
    }

    // -------- exports --------

    fn nodal_available(&self, field: SimField) -> io::Result<&Mesh> {
        let mesh = self.mesh.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("simulation '{}' has no mesh loaded", self.name),
            )
        })?;
        let ok = match field {
            SimField::M => self.m_set,
            _ => self.fields_computed,
        };
        if !ok {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("field '{}' has not been computed yet", field.name()),
            ));
        }
        Ok(mesh)
    }

    fn write_field<W: Write>(&self, field: SimField, w: &mut W) -> io::Result<()> {
        let mesh = self.nodal_available(field)?;
        writeln!(w, "# field: {}", field.name())?;
        writeln!(w, "# unit: {}", field.si_unit())?;
        writeln!(w, "# nodes: {}", mesh.n_nodes())?;
        let cols = match field.kind() {
            FieldKind::Scalar => format!("x y z {}", field.name()),
            FieldKind::Vector => format!("x y z {0}_x {0}_y {0}_z", field.name()),
        };
        writeln!(w, "# columns: {}", cols)?;
        for (i, p) in mesh.nodes().iter().enumerate() {
            write!(w, "{:.10e} {:.10e} {:.10e}", p[0], p[1], p[2])?;
            match field {
                SimField::M => {
                    let v = self.m[i];
                    writeln!(w, " {:.10e} {:.10e} {:.10e}", v[0], v[1], v[2])?;
                }
                SimField::HDemag => {
                    let v = self.h_demag[i];
                    writeln!(w, " {:.10e} {:.10e} {:.10e}", v[0], v[1], v[2])?;
                }
                SimField::Rho => writeln!(w, " {:.10e}", self.rho[i])?,
                SimField::Phi => writeln!(w, " {:.10e}", self.phi[i])?,
            }
        }
        Ok(())
    }

    /// Write one nodal field as a plain text table with a small header.
    pub fn save_field<P: AsRef<Path>>(&self, field: SimField, path: P) -> io::Result<()> {
        let f = File::create(path)?;
        let mut w = BufWriter::new(f);
        self.write_field(field, &mut w)?;
        w.flush()
    }

    fn write_snapshot<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mesh = self.nodal_available(SimField::HDemag)?;
        writeln!(w, "# vtk DataFile Version 2.0")?;
        writeln!(w, "{} fields", self.name)?;
        writeln!(w, "ASCII")?;
        writeln!(w, "DATASET UNSTRUCTURED_GRID")?;
        writeln!(w, "POINTS {} double", mesh.n_nodes())?;
        for p in mesh.nodes() {
            writeln!(w, "{:.10e} {:.10e} {:.10e}", p[0], p[1], p[2])?;
        }
        writeln!(w, "CELLS {} {}", mesh.n_tets(), 5 * mesh.n_tets())?;
        for t in mesh.tets() {
            writeln!(w, "4 {} {} {} {}", t[0], t[1], t[2], t[3])?;
        }
        writeln!(w, "CELL_TYPES {}", mesh.n_tets())?;
        for _ in 0..mesh.n_tets() {
            // 10 is the VTK cell type id of the linear tetrahedron.
            writeln!(w, "10")?;
        }
        writeln!(w, "POINT_DATA {}", mesh.n_nodes())?;
        writeln!(w, "VECTORS m double")?;
        for v in &self.m {
            writeln!(w, "{:.10e} {:.10e} {:.10e}", v[0], v[1], v[2])?;
        }
        writeln!(w, "VECTORS h_demag double")?;
        for v in &self.h_demag {
            writeln!(w, "{:.10e} {:.10e} {:.10e}", v[0], v[1], v[2])?;
        }
        writeln!(w, "SCALARS rho double 1")?;
        writeln!(w, "LOOKUP_TABLE default")?;
        for v in &self.rho {
            writeln!(w, "{:.10e}", v)?;
        }
        writeln!(w, "SCALARS phi double 1")?;
        writeln!(w, "LOOKUP_TABLE default")?;
        for v in &self.phi {
            writeln!(w, "{:.10e}", v)?;
        }
        Ok(())
    }

    /// Write all nodal fields on the mesh as a legacy ASCII VTK file.
    pub fn save_snapshot_all_fields<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let f = File::create(path)?;
        let mut w = BufWriter::new(f);
        self.write_snapshot(&mut w)?;
        w.flush()
    }

    fn write_summary<W: Write>(s: &Summary, w: &mut W) -> io::Result<()> {
        writeln!(w, "e_demag\tm_avg_x\tm_avg_y\tm_avg_z\tvolume")?;
        writeln!(w, "J\tA/m\tA/m\tA/m\tm^3")?;
        writeln!(
            w,
            "{:e}\t{:e}\t{:e}\t{:e}\t{:e}",
            s.e_demag, s.m_avg[0], s.m_avg[1], s.m_avg[2], s.volume
        )
    }

    /// Write `<dir>/<name>_dat.ndt` with the integrated quantities
    /// (names, units and values lines). Computes them if not yet cached.
    pub fn save_summary_table<P: AsRef<Path>>(&mut self, dir: P) -> io::Result<()> {
        let s = match self.summary {
            Some(s) => s,
            None => self.update_energies(),
        };
        let path = dir.as_ref().join(format!("{}_dat.ndt", self.name));
        let f = File::create(path)?;
        let mut w = BufWriter::new(f);
        Self::write_summary(&s, &mut w)?;
        w.flush()
    }
}

/// A simulation field viewed as a probe source, converting each sample
/// from base SI into the requested unit.
pub struct SimFieldSource<'a> {
    sim: &'a Simulation,
    field: SimField,
    unit: SiUnit,
}

impl FieldSource for SimFieldSource<'_> {
    fn name(&self) -> &str {
        self.field.name()
    }

    fn kind(&self) -> FieldKind {
        self.field.kind()
    }

    fn unit(&self) -> SiUnit {
        self.unit
    }

    fn probe(&self, pos_m: [f64; 3]) -> Option<FieldValue> {
        match self.sim.probe_field(self.field, pos_m)? {
            FieldValue::Scalar(v) => Some(FieldValue::Scalar(self.unit.from_si(v))),
            FieldValue::Vector(v) => Some(FieldValue::Vector([
                self.unit.from_si(v[0]),
                self.unit.from_si(v[1]),
                self.unit.from_si(v[2]),
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::UniformBall;
    use crate::table::column_labels;

    const MS: f64 = 1.0e6;
    const RADIUS: f64 = 1.0;

    fn materials() -> Vec<Material> {
        vec![Material::new("Py", MS, 13e-12)]
    }

    fn ball_sim() -> Simulation {
        let mut sim = Simulation::new(
            "sphere",
            Box::new(UniformBall::new(RADIUS, [MS, 0.0, 0.0])),
        );
        sim.set_mesh(Mesh::lattice_ball(RADIUS, 6), materials())
            .unwrap();
        sim.set_magnetization(|_p, _mat| [1.0, 0.0, 0.0]);
        sim.compute_fields();
        sim
    }

    #[test]
    fn magnetisation_query_honours_the_requested_unit() {
        let sim = ball_sim();
        let a_per_m = SiUnit::ampere_per_metre();
        let m = sim
            .query_vector_field(SimField::M, [0.0, 0.0, 0.0], SiUnit::metre(), a_per_m)
            .unwrap();
        assert!((m[0] - MS).abs() < 1e-6 * MS, "m_x = {}", m[0]);
        assert!(m[1].abs() < 1e-9 * MS && m[2].abs() < 1e-9 * MS);

        let ka_per_m = a_per_m.scaled(1e3);
        let m_k = sim
            .query_vector_field(SimField::M, [0.0, 0.0, 0.0], SiUnit::metre(), ka_per_m)
            .unwrap();
        assert!((m_k[0] - 1000.0).abs() < 1e-6, "m_x in kA/m = {}", m_k[0]);
    }

    #[test]
    fn queries_outside_the_mesh_are_undefined() {
        let sim = ball_sim();
        let out = sim.query_scalar_field(
            SimField::Phi,
            [2.0 * RADIUS, 0.0, 0.0],
            SiUnit::metre(),
            SiUnit::ampere(),
        );
        assert!(out.is_none());
    }

    #[test]
    fn fields_are_undefined_before_their_stage_has_run() {
        let mut sim = Simulation::new(
            "sphere",
            Box::new(UniformBall::new(RADIUS, [MS, 0.0, 0.0])),
        );
        sim.set_mesh(Mesh::lattice_ball(RADIUS, 4), materials())
            .unwrap();
        // No magnetisation yet: even M is undefined.
        assert!(sim.probe_field(SimField::M, [0.0; 3]).is_none());

        sim.set_magnetization(|_p, _mat| [1.0, 0.0, 0.0]);
        assert!(sim.probe_field(SimField::M, [0.0; 3]).is_some());
        // Derived fields stay undefined until compute_fields.
        assert!(sim.probe_field(SimField::HDemag, [0.0; 3]).is_none());
        assert!(sim.probe_field(SimField::Phi, [0.0; 3]).is_none());

        sim.compute_fields();
        assert!(sim.probe_field(SimField::HDemag, [0.0; 3]).is_some());
    }

    #[test]
    fn probe_header_has_exactly_one_label_per_column() {
        let sim = ball_sim();
        let a_per_m = SiUnit::ampere_per_metre();
        let srcs = [
            sim.field_source(SimField::M, a_per_m),
            sim.field_source(SimField::HDemag, a_per_m),
            sim.field_source(SimField::Rho, SiUnit::ampere_per_metre2()),
            sim.field_source(SimField::Phi, SiUnit::ampere()),
        ];
        let sources: Vec<&dyn FieldSource> = srcs.iter().map(|s| s as &dyn FieldSource).collect();
        let labels = column_labels("x_coords", &sources);
        assert_eq!(
            labels,
            vec![
                "x_coords", "m_x", "m_y", "m_z", "h_demag_x", "h_demag_y", "h_demag_z", "rho",
                "phi"
            ]
        );
    }

    #[test]
    fn interior_demag_field_is_minus_a_third_of_m() {
        let sim = ball_sim();
        let h = sim
            .query_vector_field(
                SimField::HDemag,
                [0.1, 0.0, 0.0],
                SiUnit::metre(),
                SiUnit::ampere_per_metre(),
            )
            .unwrap();
        assert!(
            (h[0] + MS / 3.0).abs() < 1e-6 * MS,
            "h_x = {}, want {}",
            h[0],
            -MS / 3.0
        );
        assert!(h[1].abs() < 1e-9 * MS && h[2].abs() < 1e-9 * MS);
    }

    #[test]
    fn demag_energy_of_the_uniform_ball_matches_the_closed_form() {
        // With H = -M/3 everywhere inside the hull, the energy integral is
        // exactly mu0 Ms^2 V / 6 over the meshed volume.
        let mut sim = ball_sim();
        let s = sim.update_energies();
        let want = MU0 * MS * MS * s.volume / 6.0;
        assert!(
            (s.e_demag - want).abs() < 1e-9 * want,
            "e_demag = {}, want {}",
            s.e_demag,
            want
        );
        assert!((s.m_avg[0] - MS).abs() < 1e-6 * MS);
        assert!(s.m_avg[1].abs() < 1e-9 * MS && s.m_avg[2].abs() < 1e-9 * MS);
        assert!(s.volume > 0.0);
    }

    #[test]
    fn region_without_a_material_is_rejected() {
        let mesh = Mesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            vec![[0, 1, 2, 3]],
            vec![2],
        )
        .unwrap();
        let mut sim = Simulation::new(
            "bad",
            Box::new(UniformBall::new(RADIUS, [MS, 0.0, 0.0])),
        );
        let err = sim.set_mesh(mesh, materials()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn snapshot_uses_the_legacy_vtk_layout() {
        let sim = ball_sim();
        let mut buf: Vec<u8> = Vec::new();
        sim.write_snapshot(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("# vtk DataFile Version 2.0"));
        assert_eq!(lines.next(), Some("sphere fields"));
        assert_eq!(lines.next(), Some("ASCII"));
        assert_eq!(lines.next(), Some("DATASET UNSTRUCTURED_GRID"));
        let n = sim.mesh().unwrap().n_nodes();
        let m = sim.mesh().unwrap().n_tets();
        assert_eq!(lines.next(), Some(format!("POINTS {} double", n).as_str()));
        assert!(text.contains(&format!("CELLS {} {}", m, 5 * m)));
        assert!(text.contains(&format!("CELL_TYPES {}", m)));
        assert!(text.contains(&format!("POINT_DATA {}", n)));
        assert!(text.contains("VECTORS m double"));
        assert!(text.contains("VECTORS h_demag double"));
        assert!(text.contains("SCALARS rho double 1"));
        assert!(text.contains("SCALARS phi double 1"));
    }

    #[test]
    fn summary_table_has_names_units_and_values_lines() {
        let mut sim = ball_sim();
        let s = sim.update_energies();
        let mut buf: Vec<u8> = Vec::new();
        Simulation::write_summary(&s, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "e_demag\tm_avg_x\tm_avg_y\tm_avg_z\tvolume");
        assert_eq!(lines[1], "J\tA/m\tA/m\tA/m\tm^3");
        assert_eq!(lines[2].split('\t').count(), 5);
    }

    #[test]
    fn field_source_converts_samples_into_its_unit() {
        let sim = ball_sim();
        let ka_per_m = SiUnit::ampere_per_metre().scaled(1e3);
        let src = sim.field_source(SimField::M, ka_per_m);
        match src.probe([0.0; 3]).unwrap() {
            FieldValue::Vector(v) => {
                assert!((v[0] - 1000.0).abs() < 1e-6, "m_x in kA/m = {}", v[0]);
            }
            FieldValue::Scalar(_) => panic!("m must probe as a vector"),
        }
        assert!(src.probe([2.0 * RADIUS, 0.0, 0.0]).is_none());
    }
}
