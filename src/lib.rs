// src/lib.rs

pub mod analytic;
pub mod config;
pub mod engine;
pub mod fields;
pub mod mesh;
pub mod params;
pub mod probe;
pub mod si;
pub mod table;
pub mod vec3;
pub mod visualisation;
