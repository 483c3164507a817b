//! **assetkit** - read-only decoders for console game archive and texture
//! formats.
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::gpda`]  | GPDA - name-table archive (PS3 `.dat`) |
//! | [`formats::mpk`]   | MPK - versioned archive with fixed-width paths |
//! | [`formats::pac`]   | PAC - headerless 16-bit image bundle (Dreamcast) |
//! | [`formats::phyre`] | Phyre - descriptor-table driven texture (PS3/PS4) |
//!
//! # Usage
//! ```no_run
//! use std::fs::File;
//!
//! use assetkit::ByteCursor;
//! use assetkit::container::extract;
//! use assetkit::registry::{Decoded, FormatRegistry};
//!
//! fn main() -> assetkit::Result<()> {
//!     let mut cursor = ByteCursor::new(File::open("data.mpk")?)?;
//!     let registry = FormatRegistry::with_builtin();
//!     if let Decoded::Container(archive) = registry.open(&mut cursor)? {
//!         for element in archive.elements() {
//!             let bytes = extract(&mut cursor, element)?;
//!             println!("{} ({} bytes)", element.name, bytes.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod container;
pub mod cursor;
pub mod error;
pub mod formats;
pub mod image;
pub mod registry;

pub use cursor::{ByteCursor, Endian};
pub use error::{Error, Result};
