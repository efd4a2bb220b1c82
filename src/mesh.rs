// src/mesh.rs
//
// Tetrahedral mesh with linear (P1) nodal data: point location by
// barycentric coordinates, interpolation of nodal scalars/vectors, and a
// reader for the ASCII nmesh format. Node coordinates are stored in
// metres; file readers apply the unit length scale on load.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::vec3::{cross, dot, sub};

// Barycentric coordinates this far below zero still count as inside, so
// points on shared faces and on the hull boundary land in a tetrahedron.
const BARY_EPS: f64 = -1e-10;

pub struct Mesh {
    nodes: Vec<[f64; 3]>,   // metres
    tets: Vec<[usize; 4]>,
    regions: Vec<i32>,      // one region tag per tetrahedron
    bbox_min: [f64; 3],
    bbox_max: [f64; 3],
}

// -------- geometry helpers --------

/// Six times the signed volume of the tetrahedron (a, b, c, d).
fn tet_volume6(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    dot(sub(b, a), cross(sub(c, a), sub(d, a)))
}

fn compute_bbox(nodes: &[[f64; 3]]) -> ([f64; 3], [f64; 3]) {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for n in nodes {
        for k in 0..3 {
            lo[k] = lo[k].min(n[k]);
            hi[k] = hi[k].max(n[k]);
        }
    }
    (lo, hi)
}

// -------- parse helpers --------

fn parse_err(lineno: usize, msg: String) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("nmesh line {}: {}", lineno, msg),
    )
}

fn parse_usize(tok: &str, lineno: usize, what: &str) -> io::Result<usize> {
    tok.parse()
        .map_err(|_| parse_err(lineno, format!("bad {} '{}'", what, tok)))
}

fn parse_i32(tok: &str, lineno: usize, what: &str) -> io::Result<i32> {
    tok.parse()
        .map_err(|_| parse_err(lineno, format!("bad {} '{}'", what, tok)))
}

fn parse_f64(tok: &str, lineno: usize, what: &str) -> io::Result<f64> {
    tok.parse()
        .map_err(|_| parse_err(lineno, format!("bad {} '{}'", what, tok)))
}

/// Next non-empty, non-comment line, with its 1-based line number.
fn next_content_line<B: BufRead>(
    lines: &mut io::Lines<B>,
    lineno: &mut usize,
) -> io::Result<Option<String>> {
    for line in lines {
        let line = line?;
        *lineno += 1;
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        return Ok(Some(t.to_string()));
    }
    Ok(None)
}

impl Mesh {
    pub fn new(nodes: Vec<[f64; 3]>, tets: Vec<[usize; 4]>, regions: Vec<i32>) -> io::Result<Self> {
        if nodes.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "mesh has no nodes",
            ));
        }
        if regions.len() != tets.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "mesh has {} tetrahedra but {} region tags",
                    tets.len(),
                    regions.len()
                ),
            ));
        }
        for (i, t) in tets.iter().enumerate() {
            for &v in t {
                if v >= nodes.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "tetrahedron {} references node {} but the mesh has {} nodes",
                            i,
                            v,
                            nodes.len()
                        ),
                    ));
                }
            }
        }
        let (bbox_min, bbox_max) = compute_bbox(&nodes);
        Ok(Self {
            nodes,
            tets,
            regions,
            bbox_min,
            bbox_max,
        })
    }

    // -------- accessors --------

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_tets(&self) -> usize {
        self.tets.len()
    }

    pub fn nodes(&self) -> &[[f64; 3]] {
        &self.nodes
    }

    pub fn tets(&self) -> &[[usize; 4]] {
        &self.tets
    }

    pub fn regions(&self) -> &[i32] {
        &self.regions
    }

    pub fn bbox(&self) -> ([f64; 3], [f64; 3]) {
        (self.bbox_min, self.bbox_max)
    }

    /// Volume of tetrahedron `ti` in m^3.
    pub fn tet_volume(&self, ti: usize) -> f64 {
        let t = self.tets[ti];
        tet_volume6(
            self.nodes[t[0]],
            self.nodes[t[1]],
            self.nodes[t[2]],
            self.nodes[t[3]],
        )
        .abs()
            / 6.0
    }

    /// Total mesh volume in m^3.
    pub fn volume(&self) -> f64 {
        (0..self.tets.len()).map(|ti| self.tet_volume(ti)).sum()
    }

    /// Region tag per node: the tag of the first tetrahedron that uses the
    /// node, None for nodes no tetrahedron references.
    pub fn node_regions(&self) -> Vec<Option<i32>> {
        let mut out = vec![None; self.nodes.len()];
        for (t, reg) in self.tets.iter().zip(self.regions.iter()) {
            for &v in t {
                if out[v].is_none() {
                    out[v] = Some(*reg);
                }
            }
        }
        out
    }

    // -------- point location and interpolation --------

    /// Barycentric coordinates of `p` in tetrahedron `ti`, or None if the
    /// tetrahedron is degenerate.
    fn barycentric(&self, ti: usize, p: [f64; 3]) -> Option<[f64; 4]> {
        let [ia, ib, ic, id] = self.tets[ti];
        let (a, b, c, d) = (self.nodes[ia], self.nodes[ib], self.nodes[ic], self.nodes[id]);
        let v6 = tet_volume6(a, b, c, d);
        if v6.abs() < f64::MIN_POSITIVE * 64.0 {
            return None;
        }
        Some([
            tet_volume6(p, b, c, d) / v6,
            tet_volume6(a, p, c, d) / v6,
            tet_volume6(a, b, p, d) / v6,
            tet_volume6(a, b, c, p) / v6,
        ])
    }

    /// Find the tetrahedron containing `p` (metres). Returns the tet index
    /// and barycentric weights, or None if `p` lies outside the mesh.
    pub fn locate(&self, p: [f64; 3]) -> Option<(usize, [f64; 4])> {
        for k in 0..3 {
            // Pad the early-out box a little wider than the barycentric
            // tolerance so it never rejects a point the tets would accept.
            let pad = 1e-9 * (self.bbox_max[k] - self.bbox_min[k]);
            if p[k] < self.bbox_min[k] - pad || p[k] > self.bbox_max[k] + pad {
                return None;
            }
        }
        for ti in 0..self.tets.len() {
            if let Some(l) = self.barycentric(ti, p) {
                if l.iter().all(|&li| li >= BARY_EPS) {
                    return Some((ti, l));
                }
            }
        }
        None
    }

    /// Linear interpolation of a nodal scalar inside tetrahedron `ti`.
    pub fn interp_scalar(&self, ti: usize, bary: [f64; 4], nodal: &[f64]) -> f64 {
        let t = self.tets[ti];
        (0..4).map(|k| bary[k] * nodal[t[k]]).sum()
    }

    /// Linear interpolation of a nodal vector inside tetrahedron `ti`.
    pub fn interp_vector(&self, ti: usize, bary: [f64; 4], nodal: &[[f64; 3]]) -> [f64; 3] {
        let t = self.tets[ti];
        let mut v = [0.0; 3];
        for k in 0..4 {
            for c in 0..3 {
                v[c] += bary[k] * nodal[t[k]][c];
            }
        }
        v
    }

    /// Sample a nodal scalar field at `p`, None outside the mesh.
    pub fn sample_scalar(&self, p: [f64; 3], nodal: &[f64]) -> Option<f64> {
        let (ti, l) = self.locate(p)?;
        Some(self.interp_scalar(ti, l, nodal))
    }

    /// Sample a nodal vector field at `p`, None outside the mesh.
    pub fn sample_vector(&self, p: [f64; 3], nodal: &[[f64; 3]]) -> Option<[f64; 3]> {
        let (ti, l) = self.locate(p)?;
        Some(self.interp_vector(ti, l, nodal))
    }

    // -------- readers and fixtures --------

    /// Read an ASCII nmesh file. Node coordinates in the file are
    /// multiplied by `unit_length_m` to give metres. Sections after the
    /// simplex block (surfaces, periodicity) are ignored.
    pub fn from_nmesh_reader<R: BufRead>(r: R, unit_length_m: f64) -> io::Result<Self> {
        let mut lines = r.lines();
        let mut lineno = 0usize;

        let head = next_content_line(&mut lines, &mut lineno)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty nmesh file"))?;
        let n_nodes = parse_usize(&head, lineno, "node count")?;

        let mut nodes = Vec::with_capacity(n_nodes);
        for _ in 0..n_nodes {
            let line = next_content_line(&mut lines, &mut lineno)?.ok_or_else(|| {
                parse_err(lineno, format!("expected {} node lines", n_nodes))
            })?;
            let toks: Vec<&str> = line.split_whitespace().collect();
            if toks.len() < 3 {
                return Err(parse_err(
                    lineno,
                    format!("node line has {} fields, expected 3 coordinates", toks.len()),
                ));
            }
            let x = parse_f64(toks[0], lineno, "node coordinate")?;
            let y = parse_f64(toks[1], lineno, "node coordinate")?;
            let z = parse_f64(toks[2], lineno, "node coordinate")?;
            nodes.push([x * unit_length_m, y * unit_length_m, z * unit_length_m]);
        }

        let head = next_content_line(&mut lines, &mut lineno)?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "nmesh file ends before simplex count")
        })?;
        let n_tets = parse_usize(&head, lineno, "simplex count")?;

        let mut tets = Vec::with_capacity(n_tets);
        let mut regions = Vec::with_capacity(n_tets);
        for _ in 0..n_tets {
            let line = next_content_line(&mut lines, &mut lineno)?.ok_or_else(|| {
                parse_err(lineno, format!("expected {} simplex lines", n_tets))
            })?;
            let toks: Vec<&str> = line.split_whitespace().collect();
            if toks.len() < 5 {
                return Err(parse_err(
                    lineno,
                    format!(
                        "simplex line has {} fields, expected region and 4 node indices",
                        toks.len()
                    ),
                ));
            }
            let reg = parse_i32(toks[0], lineno, "region tag")?;
            let mut t = [0usize; 4];
            for k in 0..4 {
                t[k] = parse_usize(toks[1 + k], lineno, "node index")?;
            }
            regions.push(reg);
            tets.push(t);
        }

        Mesh::new(nodes, tets, regions)
    }

    pub fn load_nmesh<P: AsRef<Path>>(path: P, unit_length_m: f64) -> io::Result<Self> {
        let f = File::open(&path)?;
        Self::from_nmesh_reader(BufReader::new(f), unit_length_m)
    }

    /// Build a ball-shaped test mesh on a regular lattice: the cube
    /// circumscribing the ball is cut into `divisions`^3 cells, each cell
    /// into 6 tetrahedra, and only tetrahedra whose 4 vertices lie inside
    /// the ball are kept. The hull is therefore a strict subset of the
    /// ball. All tetrahedra carry region tag 1.
    pub fn lattice_ball(radius_m: f64, divisions: usize) -> Self {
        assert!(radius_m > 0.0, "lattice_ball: radius must be positive");
        assert!(divisions > 0, "lattice_ball: divisions must be positive");

        // 6-tetrahedra decomposition of the unit cube around its main
        // diagonal (0,0,0)-(1,1,1).
        const KUHN: [[[usize; 3]; 4]; 6] = [
            [[0, 0, 0], [1, 0, 0], [1, 1, 0], [1, 1, 1]],
            [[0, 0, 0], [1, 0, 0], [1, 0, 1], [1, 1, 1]],
            [[0, 0, 0], [0, 1, 0], [1, 1, 0], [1, 1, 1]],
            [[0, 0, 0], [0, 1, 0], [0, 1, 1], [1, 1, 1]],
            [[0, 0, 0], [0, 0, 1], [1, 0, 1], [1, 1, 1]],
            [[0, 0, 0], [0, 0, 1], [0, 1, 1], [1, 1, 1]],
        ];

        let h = 2.0 * radius_m / divisions as f64;
        let coord = |i: usize| -> f64 { -radius_m + i as f64 * h };
        let inside = |p: [f64; 3]| -> bool {
            (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt() <= radius_m * (1.0 + 1e-12)
        };

        let mut node_id = std::collections::HashMap::new();
        let mut nodes: Vec<[f64; 3]> = Vec::new();
        let mut tets = Vec::new();

        for ix in 0..divisions {
            for iy in 0..divisions {
                for iz in 0..divisions {
                    for corners in &KUHN {
                        let ps: Vec<[f64; 3]> = corners
                            .iter()
                            .map(|c| [coord(ix + c[0]), coord(iy + c[1]), coord(iz + c[2])])
                            .collect();
                        if !ps.iter().all(|&p| inside(p)) {
                            continue;
                        }
                        let mut t = [0usize; 4];
                        for (k, c) in corners.iter().enumerate() {
                            let key = (ix + c[0], iy + c[1], iz + c[2]);
                            t[k] = *node_id.entry(key).or_insert_with(|| {
                                nodes.push(ps[k]);
                                nodes.len() - 1
                            });
                        }
                        tets.push(t);
                    }
                }
            }
        }

        let regions = vec![1; tets.len()];
        let (bbox_min, bbox_max) = compute_bbox(&nodes);
        Self {
            nodes,
            tets,
            regions,
            bbox_min,
            bbox_max,
        }
    }
}
