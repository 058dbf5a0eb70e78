use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

// Must match `Config::font_path`, relative to assets/.
const FONT: &str = "fonts/Montserrat-Bold.ttf";

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.join(FONT).exists() {
        println!("cargo:warning=assets/{FONT} is missing, labels will use the embedded DejaVu Sans Bold");
    }
    if !assets_src.exists() {
        return Ok(());
    }

    // wasm bundlers pick the assets up from OUT_DIR
    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], out_dir, &copy_options)?;
    Ok(())
}
