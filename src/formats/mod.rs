//! Decoders for console game archive and texture formats.
//!
//! Each submodule targets one format. All decoders follow the same
//! conventions:
//!
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] through
//!   [`ByteCursor`] - pass a [`std::fs::File`], a [`std::io::Cursor`], or
//!   anything else that implements both traits.
//! * **One open, one immutable result** - [`Decode::decode`] reads the
//!   headers and tables in on-disk order and returns a value that is never
//!   mutated afterwards.
//! * **Archives are metadata only** - [`gpda::Gpda`] and [`mpk::Mpk`] list
//!   byte ranges; use [`crate::container::ContainerReader`] to read them.
//! * **Images stop at raw pixels** - [`pac::Pac`] and [`phyre::Phyre`]
//!   produce [`crate::image::ImageRequest`]s for an external pixel engine.
//!
//! ## Format overview
//!
//! | Module    | Format | Detection | Description |
//! |-----------|--------|-----------|-------------|
//! | [`gpda`]  | GPDA   | `"GPDA64BY"` | Archive with a length-prefixed name table |
//! | [`mpk`]   | MPK    | `"MPK\0"`    | Versioned archive with fixed-width paths |
//! | [`pac`]   | PAC    | probe        | Headerless bundle of 16-bit images |
//! | [`phyre`] | Phyre  | `"PHYR"` / `"RYHP"` | Descriptor-table driven texture |

use std::io::{Read, Seek};

use crate::Result;
use crate::cursor::ByteCursor;

pub mod gpda;
pub mod mpk;
pub mod pac;
pub mod phyre;

/// A format that can be decoded from the start of a byte source.
pub trait Decode: Sized {
    /// Decode from `cursor`, which must be positioned at offset 0.
    fn decode<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Self>;
}
