//! `dosprobe fixture check FILE` -- validate a watch-image fixture.
//!
//! A fixture is only useful if its snapshot decodes and has exactly the
//! dimensions of its region; anything else can never match a frame.

use std::path::Path;

use anyhow::{bail, Context, Result};

use dosprobe_harness::WatchImage;

/// Run `dosprobe fixture check FILE`.
pub fn check(path: &Path) -> Result<()> {
    println!("{}", describe(path)?);
    Ok(())
}

fn describe(path: &Path) -> Result<String> {
    let image = WatchImage::load(path)
        .with_context(|| format!("failed to load fixture {}", path.display()))?;
    let region = image.region();
    let decoded = image
        .decode()
        .with_context(|| format!("fixture {} has an undecodable snapshot", path.display()))?;

    if decoded.width != region.sw || decoded.height != region.sh {
        bail!(
            "fixture {} snapshot is {}x{} but its region is {}x{}",
            path.display(),
            decoded.width,
            decoded.height,
            region.sw,
            region.sh
        );
    }

    let opaque = decoded.rgba.chunks_exact(4).filter(|px| px[3] == 0xFF).count();
    Ok(format!(
        "{}: ok\n  region:  {}x{} at ({}, {})\n  pixels:  {} ({} opaque)\n  encoded: {} bytes",
        path.display(),
        region.sw,
        region.sh,
        region.sx,
        region.sy,
        decoded.rgba.len() / 4,
        opaque,
        image.image_data().len()
    ))
}
