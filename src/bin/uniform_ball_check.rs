// src/bin/uniform_ball_check.rs
//
// Accuracy check of the probe pipeline against the closed-form solution
// of the uniformly magnetised ball: build a lattice ball mesh, fill the
// nodes from the analytic solution, then sample along a skew radial ray
// and compare the interpolated values with the closed form evaluated at
// the same points.
//
// On this configuration the nodal data reproduces the closed form exactly
// (the interior field is constant and phi is linear, both exact under P1
// interpolation), so the reported deviations should sit at rounding level.
// Growth of these numbers after a refactor points at the sampling path,
// not at the physics.
//
// Usage:
//   cargo run --release --bin uniform_ball_check
//   cargo run --release --bin uniform_ball_check -- radius=1.0 div=12 points=400

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use fembem_probe::analytic::UniformBall;
use fembem_probe::engine::{SimField, Simulation};
use fembem_probe::fields::FieldValue;
use fembem_probe::mesh::Mesh;
use fembem_probe::params::{Material, MU0};
use fembem_probe::vec3::scale;

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Defaults
    let mut radius: f64 = 1.0;
    let mut divisions: usize = 8;
    let mut ms: f64 = 1.0e6;
    let mut n_points: usize = 200;
    let mut out_dir = "out/uniform_ball_check".to_string();

    for arg in args.iter().skip(1) {
        if arg == "-h" || arg == "--help" || arg == "help" {
            eprintln!(
                "Usage:\n  cargo run --release --bin uniform_ball_check -- [radius=VAL] [div=N] [ms=VAL] [points=N] [out=DIR]"
            );
            return Ok(());
        }
        if let Some(v) = arg.strip_prefix("radius=") {
            radius = v.parse::<f64>().unwrap_or(radius);
            continue;
        }
        if let Some(v) = arg.strip_prefix("div=") {
            divisions = v.parse::<usize>().unwrap_or(divisions);
            continue;
        }
        if let Some(v) = arg.strip_prefix("ms=") {
            ms = v.parse::<f64>().unwrap_or(ms);
            continue;
        }
        if let Some(v) = arg.strip_prefix("points=") {
            n_points = v.parse::<usize>().unwrap_or(n_points);
            continue;
        }
        if let Some(v) = arg.strip_prefix("out=") {
            out_dir = v.to_string();
            continue;
        }
        eprintln!("Warning: ignoring unknown argument '{arg}'");
    }

    let reference = UniformBall::new(radius, [ms, 0.0, 0.0]);
    let mut sim = Simulation::new(
        "uniform_ball_check",
        Box::new(UniformBall::new(radius, [ms, 0.0, 0.0])),
    );
    sim.set_mesh(
        Mesh::lattice_ball(radius, divisions),
        vec![Material::new("Py", ms, 13e-12)],
    )?;
    sim.set_magnetization(|_p, _mat| [1.0, 0.0, 0.0]);
    sim.compute_fields();

    let n_nodes = match sim.mesh() {
        Some(m) => m.n_nodes(),
        None => 0,
    };

    // Skew unit ray, chosen off the lattice axes so the comparison crosses
    // tetrahedra at awkward angles.
    let u = [0.6, 0.48, 0.64];

    create_dir_all(&out_dir)?;
    let csv_path = PathBuf::from(&out_dir).join("radial_check.csv");
    let mut w = BufWriter::new(File::create(&csv_path)?);
    writeln!(
        w,
        "t,defined,hx_sim,hy_sim,hz_sim,hx_ref,hy_ref,hz_ref,phi_sim,phi_ref"
    )?;

    let mut n_defined = 0usize;
    let mut defined_up_to: f64 = 0.0;
    let mut max_dh: f64 = 0.0;
    let mut max_dphi: f64 = 0.0;

    let denom = n_points.saturating_sub(1).max(1) as f64;
    for k in 0..n_points {
        let t = 2.0 * radius * (k as f64) / denom;
        let p = scale(u, t);

        let h_sim = sim.probe_field(SimField::HDemag, p);
        let phi_sim = sim.probe_field(SimField::Phi, p);

        let h_ref = reference.h_demag_at(p);
        let phi_ref = reference.phi_at(p);

        match (h_sim, phi_sim) {
            (Some(FieldValue::Vector(h)), Some(FieldValue::Scalar(phi))) => {
                n_defined += 1;
                defined_up_to = t;
                for c in 0..3 {
                    let d = (h[c] - h_ref[c]).abs();
                    if d > max_dh {
                        max_dh = d;
                    }
                }
                let dphi = (phi - phi_ref).abs();
                if dphi > max_dphi {
                    max_dphi = dphi;
                }
                writeln!(
                    w,
                    "{:.16e},1,{:.16e},{:.16e},{:.16e},{:.16e},{:.16e},{:.16e},{:.16e},{:.16e}",
                    t, h[0], h[1], h[2], h_ref[0], h_ref[1], h_ref[2], phi, phi_ref
                )?;
            }
            _ => {
                writeln!(
                    w,
                    "{:.16e},0,,,,{:.16e},{:.16e},{:.16e},,{:.16e}",
                    t, h_ref[0], h_ref[1], h_ref[2], phi_ref
                )?;
            }
        }
    }
    w.flush()?;

    let summary = sim.update_energies();
    let e_ref = MU0 * ms * ms * summary.volume / 6.0;
    let e_rel = (summary.e_demag - e_ref).abs() / e_ref;

    let h_scale = ms / 3.0;
    let phi_scale = ms * radius / 3.0;

    println!("Uniform ball check:");
    println!(
        "  mesh: lattice ball, radius = {}, div = {}, nodes = {}",
        radius, divisions, n_nodes
    );
    println!("  ray : [{}, {}, {}] (unit), {} points in [0, 2R]", u[0], u[1], u[2], n_points);
    println!(
        "  defined points : {} of {} (up to r = {:.6})",
        n_defined, n_points, defined_up_to
    );
    println!(
        "  max|dh|        = {:.6e} A/m   (rel {:.6e} vs Ms/3)",
        max_dh,
        max_dh / h_scale
    );
    println!(
        "  max|dphi|      = {:.6e} A     (rel {:.6e} vs Ms R/3)",
        max_dphi,
        max_dphi / phi_scale
    );
    println!(
        "  e_demag        = {:.6e} J vs closed form {:.6e} J (rel {:.6e})",
        summary.e_demag, e_ref, e_rel
    );
    println!("  csv            : {}", csv_path.to_string_lossy());

    Ok(())
}
