//! services/kitchen/src/bin/openapi.rs
//!
//! Writes the kitchen API's OpenAPI document for client generation.
//! Usage: `openapi [OUTPUT_PATH]`, defaulting to `openapi.json`.

use kitchen_lib::{error::ApiError, web::rest::ApiDoc};
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), ApiError> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let document = ApiDoc::openapi();
    let json = document.to_pretty_json().map_err(|e| {
        ApiError::Internal(format!("Could not render the OpenAPI document: {}", e))
    })?;
    std::fs::write(&output, json)?;

    println!(
        "Wrote {} API paths to {}",
        document.paths.paths.len(),
        output.display()
    );
    Ok(())
}
