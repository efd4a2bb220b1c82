use serde::Serialize;
use serde_json;
use std::fs::File;
use std::path::Path;

#[derive(Serialize)]
pub struct RunConfig {
    pub mesh: MeshConfig,
    pub material: MaterialConfig,
    pub probe: ProbeConfig,
    pub outputs: OutputConfig,
    pub run: RunInfo,
}

#[derive(Serialize)]
pub struct MeshConfig {
    /// Mesh file path, or a description of the built-in fixture.
    pub source: String,
    pub nodes: usize,
    pub tets: usize,
    pub unit_length_m: f64,
}

#[derive(Serialize)]
pub struct MaterialConfig {
    pub name: String,
    pub ms: f64,
    pub a_ex: f64,
}

#[derive(Serialize)]
pub struct ProbeConfig {
    pub lo: i64,
    pub hi: i64,
    pub step: f64,
    pub axis: String,
    pub sentinel: f64,
}

#[derive(Serialize)]
pub struct OutputConfig {
    pub table: String,
    pub snapshot: String,
    pub field_m: String,
    pub summary: String,
    pub plot_h_demag: String,
    pub plot_phi: String,
}

#[derive(Serialize)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,

    // Optional provenance (can be filled later)
    pub git_commit: Option<String>,
    pub timestamp_utc: Option<String>,
}

impl RunConfig {
    pub fn write_to_dir(&self, out_dir: &Path) -> std::io::Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
