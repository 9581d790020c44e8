//! exifrw is a native Rust crate that reads the EXIF block of JPEG files and writes it back.
//!
//! The JPEG stream is split into its segments and scan data, the EXIF block carried by the
//! first `Exif` APP1 segment is decoded into its three directories (IFD-0, the Exif SubIFD
//! and the thumbnail directory IFD-1), and the whole file can be written back. An
//! unmodified file comes out byte for byte identical, including the layout of the EXIF
//! block: directories, out-of-line values, gaps and the thumbnail keep their offsets.
//!
//! The crate contains a sample binary called 'exifrwtool' that accepts files as arguments
//! and lists their tags. Run it with
//!
//!
//! `cargo run [--write] [image file 1] [image file 2] ...`
//!
//!
//! To learn to use this crate, start by the documentation of function `parse_file()`,
//! and the struct `ExifData` that is returned by the parser.
//!
//! ```no_run
//! use exifrw::IfdKind;
//!
//! let file_name = "foo.jpg";
//! match exifrw::parse_file(&file_name) {
//!     Ok(data) => {
//!         if let Some(exif) = &data.exif {
//!             for (kind, ifd) in exif.directories() {
//!                 for entry in ifd.entries() {
//!                     println!("{} {:#06x}: {:?}", kind, entry.tag(), entry.value());
//!                 }
//!             }
//!             println!("Orientation: {:?}", exif.value(IfdKind::Ifd0, 0x0112));
//!         }
//!         data.write_file("foo.copy.jpg").unwrap();
//!     }
//!     Err(e) => {
//!         print!("Error in {}: {}", &file_name, e)
//!     }
//! }
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

mod lowlevel;
mod types;
pub use self::types::*;
mod types_impl;
mod ifdformat;
pub use self::ifdformat::*;
mod marker;
pub use self::marker::*;
mod jpeg;
pub use self::jpeg::*;
mod tags;
pub use self::tags::*;
mod tiff;
pub use self::tiff::*;
mod exif;
pub use self::exif::*;

/// Decoder state built once and shared by every file it parses: the marker registry,
/// the tag dictionary and the configuration.
#[derive(Clone, Debug)]
pub struct Parser {
    markers: MarkerRegistry,
    tags: TagDictionary,
    config: ParserConfig,
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Parser {
            markers: MarkerRegistry::new(),
            tags: TagDictionary::new(),
            config,
        }
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub fn tags(&self) -> &TagDictionary {
        &self.tags
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a byte buffer that should contain a JPEG image.
    ///
    /// Logs warnings.
    pub fn parse_buffer(&self, contents: &[u8]) -> ExifResult {
        let (res, warnings) = self.parse_buffer_quiet(contents);
        warnings.into_iter().for_each(|w| log::warn!("{}", w));
        res
    }

    /// Parse a byte buffer that should contain a JPEG image.
    ///
    /// Only a broken JPEG stream is an error. An EXIF block that cannot be decoded is
    /// skipped with a warning in favour of the next one, and is written back unchanged.
    /// Returns warnings alongside result.
    pub fn parse_buffer_quiet(&self, contents: &[u8]) -> (ExifResult, Vec<String>) {
        let mut warnings = vec![];
        let image = match JpegImage::decode(&self.markers, contents) {
            Ok(image) => image,
            Err(e) => return (Err(e), warnings),
        };

        let (exif_segment, exif) = match image.find_exif(&self.config, &mut warnings) {
            Some((index, exif)) => (Some(index), Some(exif)),
            None => (None, None),
        };
        if self.config.validate_tags {
            if let Some(exif) = &exif {
                warnings.extend(exif.validate(&self.tags));
            }
        }

        (
            Ok(ExifData {
                image,
                exif,
                exif_segment,
            }),
            warnings,
        )
    }

    /// Try to read and parse an open file that is expected to contain an image
    pub fn read_file(&self, f: &mut File) -> ExifResult {
        f.seek(SeekFrom::Start(0))?;

        let mut contents: Vec<u8> = Vec::new();
        f.read_to_end(&mut contents)?;
        self.parse_buffer(&contents)
    }

    /// Opens an image (passed as a file name), tries to read and parse it.
    pub fn parse_file<P: AsRef<Path>>(&self, fname: P) -> ExifResult {
        self.read_file(&mut File::open(fname)?)
    }
}

/// Parse a byte buffer that should contain a JPEG image, with the default parser.
///
/// Logs warnings.
pub fn parse_buffer(contents: &[u8]) -> ExifResult {
    Parser::new().parse_buffer(contents)
}

/// Parse a byte buffer that should contain a JPEG image, with the default parser.
///
/// Returns warnings alongside result.
pub fn parse_buffer_quiet(contents: &[u8]) -> (ExifResult, Vec<String>) {
    Parser::new().parse_buffer_quiet(contents)
}

/// Try to read and parse an open file that is expected to contain an image
pub fn read_file(f: &mut File) -> ExifResult {
    Parser::new().read_file(f)
}

/// Opens an image (passed as a file name), tries to read and parse it.
pub fn parse_file<P: AsRef<Path>>(fname: P) -> ExifResult {
    Parser::new().parse_file(fname)
}
