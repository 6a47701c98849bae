pub mod generate;

pub use generate::{generate_heatmap, generate_heatmap_json, GenerateRequest, GenerateResponse};
