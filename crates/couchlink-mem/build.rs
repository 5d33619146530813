use std::env;
use std::fs;
use std::path::Path;

include!("../build_common.rs");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let crate_dir = env::var("CARGO_MANIFEST_DIR")?;
    render_readme_for_rustdoc(Path::new(&crate_dir))
}
