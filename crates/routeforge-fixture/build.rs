use std::path::PathBuf;

use routeforge_codegen::{Generator, GeneratorConfig};

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("set by cargo"));
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("set by cargo"));

    let config = GeneratorConfig {
        sources: vec![manifest_dir.join("src")],
        output: Some(out_dir.join("endpoints.rs")),
        rerun_if_changed: true,
        ..Default::default()
    };
    if let Err(err) = Generator::new(config).run() {
        panic!("endpoint generation failed: {err}");
    }
}
