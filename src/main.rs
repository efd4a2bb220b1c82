// src/main.rs
//
// This binary probes the demagnetising solution of a uniformly magnetised
// sphere along the x axis and exports the results (table, nodal fields,
// VTK snapshot, summary, plots).
//
// Outputs from this driver are written to `runs/` (or the directory
// specified via `out=`) and are not committed to version control.
//
// NOTE:
// The accuracy comparison against the closed-form solution is implemented
// as a dedicated executable under `src/bin/`.
//
// Examples:
//
//   cargo run --release
//       -> built-in ball mesh of radius 1 (nm), probe from -10 to 10 nm
//          in steps of 0.1 nm.
//
//   cargo run --release -- mesh=sphere.nmesh lo=-1000 hi=1000 step=0.1
//       -> load a mesh file and sweep a longer probe line.
//
//   cargo run --release -- radius=2.0 div=12 sentinel=0.0 run=coarse
//       -> coarser built-in ball, custom sentinel and run id.
//
// Typical outputs (per run directory):
//   runs/<run_id>/
//     ├── config.json
//     ├── probe_rho_phi.dat
//     ├── m_initial.nvf
//     ├── sphere_dat.ndt
//     ├── fields_snapshot.vtk
//     ├── probe_h_demag.png
//     └── probe_phi.png

use std::env;
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use fembem_probe::analytic::UniformBall;
use fembem_probe::config::{
    MaterialConfig, MeshConfig, OutputConfig, ProbeConfig, RunConfig, RunInfo,
};
use fembem_probe::engine::{SimField, Simulation};
use fembem_probe::fields::FieldSource;
use fembem_probe::mesh::Mesh;
use fembem_probe::params::{Material, MU0};
use fembem_probe::probe::{run_probe, LineProbe, DEFAULT_SENTINEL};
use fembem_probe::si::SiUnit;
use fembem_probe::table::{column_labels, TableWriter};
use fembem_probe::visualisation::{save_h_demag_plot, save_scalar_profile_plot};

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run --release -- [mesh=FILE.nmesh] [lo=N] [hi=N] [step=VAL]
             [radius=VAL] [div=N] [ms=VAL] [aex=VAL] [unitlen=VAL]
             [sentinel=VAL] [out=DIR] [run=RUN_ID]

Notes:
  - Without mesh=..., a ball-shaped lattice mesh of the given radius is
    built in memory. The radius and the probe coordinates are in units
    of unitlen metres (default 1e-9, i.e. nanometres).
  - The probe samples m, h_demag, rho and phi along x at lo..=hi steps
    of 'step' and writes one table row per grid point. Where a field is
    undefined (outside the mesh) the sentinel value is written instead.
"#
    );
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_run_id(source_tag: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0));
    let ts = format!("{}{:03}", now.as_secs(), now.subsec_millis());
    format!("{}_{}_probe", ts, source_tag)
}

fn unique_run_dir(out_root: &str, run_id: &str) -> PathBuf {
    let base = PathBuf::from(out_root);
    let mut dir = base.join(run_id);
    if !dir.exists() {
        return dir;
    }
    for k in 1..1000 {
        let cand = base.join(format!("{}_{}", run_id, k));
        if !cand.exists() {
            dir = cand;
            break;
        }
    }
    dir
}

fn main() -> std::io::Result<()> {
    let argv: Vec<String> = env::args().collect();

    // Defaults reproduce the unit-ball sweep.
    let mut mesh_path: Option<String> = None;
    let mut lo: i64 = -100;
    let mut hi: i64 = 100;
    let mut step: f64 = 0.1;
    let mut radius: f64 = 1.0;
    let mut divisions: usize = 8;
    let mut ms: f64 = 1.0e6;
    let mut aex: f64 = 13e-12;
    let mut unit_len_m: f64 = 1e-9;
    let mut sentinel: f64 = DEFAULT_SENTINEL;

    // Output controls
    let mut out_root_override: Option<String> = None;
    let mut run_id_override: Option<String> = None;

    for arg in argv.iter().skip(1) {
        if arg == "-h" || arg == "--help" || arg == "help" {
            print_usage();
            return Ok(());
        }

        if let Some(v) = arg.strip_prefix("mesh=") {
            mesh_path = Some(v.to_string());
            continue;
        }
        if let Some(v) = arg.strip_prefix("lo=") {
            lo = v.parse::<i64>().unwrap_or(lo);
            continue;
        }
        if let Some(v) = arg.strip_prefix("hi=") {
            hi = v.parse::<i64>().unwrap_or(hi);
            continue;
        }
        if let Some(v) = arg.strip_prefix("step=") {
            step = v.parse::<f64>().unwrap_or(step);
            continue;
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
        if let Some(v) = arg.strip_prefix("aex=") {
            aex = v.parse::<f64>().unwrap_or(aex);
            continue;
        }
        if let Some(v) = arg.strip_prefix("unitlen=") {
            unit_len_m = v.parse::<f64>().unwrap_or(unit_len_m);
            continue;
        }
        if let Some(v) = arg.strip_prefix("sentinel=") {
            if let Ok(val) = v.trim().parse::<f64>() {
                sentinel = val;
            } else {
                eprintln!("Warning: could not parse sentinel value '{v}', ignoring");
            }
            continue;
        }

        if let Some(v) = arg.strip_prefix("out=") {
            out_root_override = Some(v.to_string());
            continue;
        }
        if let Some(v) = arg.strip_prefix("run=") {
            run_id_override = Some(v.to_string());
            continue;
        }

        eprintln!("Warning: ignoring unknown argument '{arg}'");
    }

    // -------- output directory setup --------
    let out_root = out_root_override.unwrap_or_else(|| "runs".to_string());
    create_dir_all(&out_root)?;

    let source_tag = match &mesh_path {
        Some(p) => PathBuf::from(p)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "mesh".to_string()),
        None => "ball".to_string(),
    };
    let mut run_id = run_id_override.unwrap_or_else(|| default_run_id(&source_tag));
    run_id = sanitize_run_id(&run_id);

    let run_dir = unique_run_dir(&out_root, &run_id);
    create_dir_all(&run_dir)?;

    // -------- simulation setup --------
    let unit_length = SiUnit::metre().scaled(unit_len_m);
    let radius_m = unit_length.to_si(radius);
    let materials = vec![Material::new("Py", ms, aex)];

    let mut sim = Simulation::new(
        "sphere",
        Box::new(UniformBall::new(radius_m, [ms, 0.0, 0.0])),
    );
    let mesh_source = match &mesh_path {
        Some(p) => {
            sim.load_mesh(p, materials, unit_length)?;
            p.clone()
        }
        None => {
            sim.set_mesh(Mesh::lattice_ball(radius_m, divisions), materials)?;
            format!("lattice ball radius={} div={}", radius, divisions)
        }
    };
    let (n_nodes, n_tets) = match sim.mesh() {
        Some(m) => (m.n_nodes(), m.n_tets()),
        None => (0, 0),
    };

    // -------------------------------------------------
    // Write config.json
    // -------------------------------------------------
    let run_config = RunConfig {
        mesh: MeshConfig {
            source: mesh_source.clone(),
            nodes: n_nodes,
            tets: n_tets,
            unit_length_m: unit_len_m,
        },
        material: MaterialConfig {
            name: "Py".to_string(),
            ms,
            a_ex: aex,
        },
        probe: ProbeConfig {
            lo,
            hi,
            step,
            axis: "x".to_string(),
            sentinel,
        },
        outputs: OutputConfig {
            table: "probe_rho_phi.dat".to_string(),
            snapshot: "fields_snapshot.vtk".to_string(),
            field_m: "m_initial.nvf".to_string(),
            summary: "sphere_dat.ndt".to_string(),
            plot_h_demag: "probe_h_demag.png".to_string(),
            plot_phi: "probe_phi.png".to_string(),
        },
        run: RunInfo {
            binary: "fembem-probe".to_string(),
            run_id: run_id.clone(),
            git_commit: None,
            timestamp_utc: None,
        },
    };
    run_config.write_to_dir(&run_dir)?;

    println!("--- fembem-probe run config ---");
    println!("run_dir: {}", run_dir.to_string_lossy());
    println!(
        "mesh:   {} (nodes={} tets={} unit_length={:e} m)",
        mesh_source, n_nodes, n_tets, unit_len_m
    );
    println!("mat:    Py Ms={:.3e} A/m  A={:.3e} J/m", ms, aex);
    println!(
        "solver: uniform ball, radius={} ({:.3e} m), M along +x",
        radius, radius_m
    );
    println!(
        "probe:  axis=x lo={} hi={} step={} sentinel={:e}",
        lo, hi, step, sentinel
    );
    println!("-------------------------------");

    println!("Initial magnetisation: uniform +x");
    sim.set_magnetization(|_pos, _mat| [1.0, 0.0, 0.0]);

    sim.compute_fields();
    println!("Computed nodal fields on {} nodes.", n_nodes);

    let summary = sim.update_energies();
    if mesh_path.is_none() {
        // For the built-in ball the interior field is exactly -M/3.
        let closed_form = MU0 * ms * ms * summary.volume / 6.0;
        println!(
            "e_demag = {:.6e} J (uniform-ball closed form {:.6e} J)",
            summary.e_demag, closed_form
        );
    } else {
        println!("e_demag = {:.6e} J", summary.e_demag);
    }
    println!(
        "<M> = [{:.3e}, {:.3e}, {:.3e}] A/m, V = {:.6e} m^3",
        summary.m_avg[0], summary.m_avg[1], summary.m_avg[2], summary.volume
    );

    sim.save_field(SimField::M, run_dir.join("m_initial.nvf"))?;
    sim.save_summary_table(&run_dir)?;

    // -------- probe sweep --------
    // Fields in canonical column order, probed in their base SI units.
    let srcs: Vec<_> = SimField::all()
        .iter()
        .map(|&f| sim.field_source(f, f.si_unit()))
        .collect();
    let sources: Vec<&dyn FieldSource> = srcs.iter().map(|s| s as &dyn FieldSource).collect();

    let probe = LineProbe::along_x(lo, hi, step, unit_length).with_sentinel(sentinel);
    let table_path = run_dir.join("probe_rho_phi.dat");
    let labels = column_labels(probe.axis.coord_label(), &sources);
    let mut table = TableWriter::create(&table_path, &labels)?;
    let n_rows = run_probe(&probe, &sources, &mut table)?;
    table.finish()?;
    println!(
        "probe:  wrote {} rows to {}",
        n_rows,
        table_path.to_string_lossy()
    );

    sim.save_snapshot_all_fields(run_dir.join("fields_snapshot.vtk"))?;

    // -------- plots (defined probe points only) --------
    let x_label = if (unit_len_m - 1e-9).abs() < 1e-21 {
        "x (nm)".to_string()
    } else {
        format!("x (units of {:e} m)", unit_len_m)
    };

    let a_per_m = SiUnit::ampere_per_metre();
    let mut h_coords: Vec<f64> = Vec::new();
    let mut h_vals: Vec<[f64; 3]> = Vec::new();
    let mut phi_coords: Vec<f64> = Vec::new();
    let mut phi_vals: Vec<f64> = Vec::new();
    for i in probe.lo..=probe.hi {
        let p = probe.position_m(i);
        if let Some(h) = sim.query_vector_field(SimField::HDemag, p, SiUnit::metre(), a_per_m) {
            h_coords.push(probe.coord(i));
            h_vals.push(h);
        }
        if let Some(v) = sim.query_scalar_field(SimField::Phi, p, SiUnit::metre(), SiUnit::ampere())
        {
            phi_coords.push(probe.coord(i));
            phi_vals.push(v);
        }
    }

    let _ = save_h_demag_plot(
        &h_coords,
        &h_vals,
        &x_label,
        run_dir.join("probe_h_demag.png").to_str().unwrap(),
    );
    let _ = save_scalar_profile_plot(
        &phi_coords,
        &phi_vals,
        "phi (A)",
        &x_label,
        run_dir.join("probe_phi.png").to_str().unwrap(),
    );

    println!("Done. Outputs in {}", run_dir.to_string_lossy());
    Ok(())
}
