//! Detect a file's format and dump its contents.
//!
//! Archives are extracted entry by entry; image files have each raw pixel
//! payload written next to a one-line description. Phyre files named like
//! models or shaders are skipped.
//!
//! ```text
//! cargo run --example extract -- data.mpk out/
//! RUST_LOG=assetkit=trace cargo run --example extract -- tex.dds.phyre out/
//! ```

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use assetkit::ByteCursor;
use assetkit::container::{ContainerFormat, extract};
use assetkit::formats::phyre;
use assetkit::image::ImageFormat;
use assetkit::registry::{Decoded, FormatRegistry};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Args {
    /// File to decode.
    input: PathBuf,
    /// Directory receiving the extracted files.
    output: PathBuf,
}

fn set_up_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}

/// Keep only plain path components so entries cannot escape `root`.
fn output_path(root: &Path, name: &str) -> Option<PathBuf> {
    let relative: PathBuf = Path::new(&name.replace('\\', "/"))
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    (!relative.as_os_str().is_empty()).then(|| root.join(relative))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    set_up_tracing();
    let args = Args::parse();

    let mut cursor = ByteCursor::new(File::open(&args.input)?)?;
    let registry = FormatRegistry::with_builtin();
    let input_name = args.input.to_string_lossy();
    if let Some(entry) = registry.detect(&mut cursor)?
        && entry.name == "Phyre"
        && phyre::is_non_texture_path(&input_name)
    {
        info!(input = %input_name, "skipping Phyre model or shader");
        return Ok(());
    }
    let decoded = registry.open(&mut cursor)?;
    fs::create_dir_all(&args.output)?;

    match decoded {
        Decoded::Container(archive) => {
            for element in archive.elements() {
                let Some(path) = output_path(&args.output, &element.name) else {
                    warn!(name = %element.name, "skipping entry without a usable name");
                    continue;
                };
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, extract(&mut cursor, element)?)?;
                info!(name = %element.name, size = element.size, "extracted");
            }
        }
        Decoded::Images(images) => {
            for index in 0..images.image_count() {
                let image = images.image(index)?;
                let path = args.output.join(format!("{index}.{}.raw", image.format));
                fs::write(&path, &image.data)?;
                println!(
                    "{index}: {}x{} {} ({:?}, {:?}, swizzled: {}) -> {}",
                    image.width,
                    image.height,
                    image.format,
                    image.endian,
                    image.orientation,
                    image.swizzled,
                    path.display()
                );
                if !image.is_complete() {
                    warn!(index, "pixel data shorter than the image dimensions");
                }
            }
        }
    }
    Ok(())
}
