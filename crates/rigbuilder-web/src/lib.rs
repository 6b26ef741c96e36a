//! Rigbuilder Web - browser PC configurator
//!
//! Renders the product model with Bevy, lets shoppers toggle parts and check
//! out a snapshot, and gives the catalog admin a mesh assignment screen.

mod app;
mod capture;
mod notices;
mod storage;
mod sync;
mod ui;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    app::run();
}
