pub mod headless;

#[cfg(feature = "wasm")]
pub mod web;
