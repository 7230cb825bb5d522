use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

// Stages the corridor textures next to the build output so a web bundle can
// serve them from `<origin>/assets/`.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let textures = manifest_dir.join("assets");
    if !textures.is_dir() {
        println!("cargo:warning=no assets/ directory, the corridor will render untextured");
        return Ok(());
    }

    let copy_options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy_items(&[textures], env::var("OUT_DIR")?, &copy_options)?;

    Ok(())
}
