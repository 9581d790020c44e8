use super::exif::ExifContainer;
use super::jpeg::JpegImage;
use std::fmt;
use std::io;
use std::result::Result;
use thiserror::Error;

/// The value of the Exif header.
pub const EXIF_HEADER: &[u8] = &[b'E', b'x', b'i', b'f', 0x00, 0x00];
pub(crate) const INTEL_TIFF_HEADER: &[u8] = &[b'I', b'I', 0x2a, 0x00];
pub(crate) const MOTOROLA_TIFF_HEADER: &[u8] = &[b'M', b'M', 0x00, 0x2a];
/// Size of the TIFF header: byte order signature, magic number and offset to IFD-0.
pub(crate) const TIFF_HEADER_LEN: usize = 8;
/// Size of one directory entry.
pub(crate) const IFD_ENTRY_LEN: usize = 12;
/// Size of the value/offset field of a directory entry.
pub(crate) const DATA_WIDTH: usize = 4;
/// Tag of the IFD-0 entry that points to the Exif SubIFD.
pub const EXIF_OFFSET_TAG: u16 = 0x8769;

/// Byte ordering of the multi-byte integers of an EXIF block.
///
/// It is fixed once per block, by the two-byte signature that opens the TIFF header.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ByteAlign {
    /// Most significant byte first ("MM")
    Motorola,
    /// Least significant byte first ("II")
    Intel,
}

impl ByteAlign {
    pub fn is_little_endian(self) -> bool {
        self == ByteAlign::Intel
    }
}

/// Top-level structure returned by the buffer and file parsers: the scanned JPEG
/// container, plus the decoded EXIF block if the image carries a usable one.
#[derive(Clone, Debug, PartialEq)]
pub struct ExifData {
    /// Segments and scan data of the image, always available once the stream scanned
    pub image: JpegImage,
    /// Decoded EXIF block. `None` when no APP1 segment carries one that decodes
    /// (the reasons are reported as warnings).
    pub exif: Option<ExifContainer>,
    /// Index in `image.segments()` of the APP1 segment `exif` was decoded from, and
    /// that it replaces when the image is written back
    pub exif_segment: Option<usize>,
}

/// Knobs of the EXIF decoder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum number of directories followed through next-directory links
    pub max_chain_length: usize,
    /// Compare decoded entries against the tag dictionary and report mismatches
    pub validate_tags: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_chain_length: 8,
            validate_tags: true,
        }
    }
}

/// Possible fatal errors that may happen when an image is parsed or written.
#[derive(Debug, Error)]
pub enum ExifError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Malformed JPEG stream at byte {offset}: {reason}")]
    MalformedStream { offset: usize, reason: String },

    #[error("Malformed EXIF block: {0}")]
    MalformedExif(String),

    #[error("Buffer truncated: {length} bytes at offset {offset}, only {available} available")]
    TruncatedBuffer {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("Segment payload of {0} bytes does not fit a JPEG length field")]
    SegmentTooLarge(usize),

    #[error("Tag {tag:#06x} not found in {kind}")]
    TagNotFound { kind: IfdKind, tag: u16 },

    #[error("Value of tag {tag:#06x} needs {needed} bytes, its slot holds {available}")]
    ValueDoesNotFit {
        tag: u16,
        needed: usize,
        available: usize,
    },

    #[error("Value of tag {tag:#06x} at offset {offset:#x} is shared with another entry")]
    SharedValue { tag: u16, offset: u32 },

    #[error("Tag {tag:#06x} carries {found} bytes, format and count require {expected}")]
    FormatMismatch {
        tag: u16,
        expected: usize,
        found: usize,
    },
}

impl ExifError {
    pub(crate) fn stream<S: Into<String>>(offset: usize, reason: S) -> Self {
        ExifError::MalformedStream {
            offset,
            reason: reason.into(),
        }
    }
}

/// Enumeration that represents the possible data formats of an IFD entry.
///
/// Any enumeration item can be cast to u16 to get the low-level format code
/// as defined by the TIFF format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IfdFormat {
    U8 = 1,
    Ascii = 2,
    U16 = 3,
    U32 = 4,
    URational = 5,
    I8 = 6,
    Undefined = 7, // u8
    I16 = 8,
    I32 = 9,
    IRational = 10,
    F32 = 11,
    F64 = 12,
}

/// The three directories a JPEG EXIF block is made of. Tag ids are only meaningful
/// together with the directory they were found in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IfdKind {
    /// Primary image directory (IFD-0)
    Ifd0,
    /// Exif SubIFD, reached through the ExifOffset tag of IFD-0
    Exif,
    /// Thumbnail directory (IFD-1), linked from IFD-0
    Ifd1,
}

impl fmt::Display for IfdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            IfdKind::Ifd0 => "IFD-0",
            IfdKind::Exif => "Exif SubIFD",
            IfdKind::Ifd1 => "IFD-1",
        })
    }
}

/// Structure that represents a parsed IFD entry of a TIFF image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfdEntry {
    /// IFD tag value, may or not be an EXIF tag
    pub(crate) tag: u16,
    /// IFD data format
    pub(crate) format: IfdFormat,
    /// Number of items, each one in the data format specified by format
    pub(crate) count: u32,
    /// Raw value field of the entry. When the data does not fit in it,
    /// it holds the offset of the data instead.
    pub(crate) ifd_data: [u8; DATA_WIDTH],
    /// Offset of the data when it lives outside the directory, relative to the TIFF header
    pub(crate) offset: Option<u32>,
    /// Raw data as a vector of bytes. Length is sizeof(format) * count.
    pub(crate) data: Vec<u8>,
    /// Byte order of the block the entry belongs to
    pub(crate) align: ByteAlign,
}

/// Image File Directory: a list of entries plus the link to the next directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ifd {
    /// Position of the entry count, relative to the TIFF header
    pub(crate) offset: u32,
    pub(crate) entries: Vec<IfdEntry>,
    /// Offset of the next directory in the chain, 0 if none
    pub(crate) next_ifd_offset: u32,
}

/// A pending write into the serialized buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Patch {
    /// Position in the buffer where the data goes.
    pub offset: usize,
    /// The bytes to write there.
    pub data: Vec<u8>,
}

impl Patch {
    pub fn new(offset: usize, data: &[u8]) -> Patch {
        Patch {
            offset,
            data: data.to_vec(),
        }
    }
}

/// Tag value enumeration. It works as a variant type. Each value is
/// actually a vector because many EXIF tags are collections of values.
/// Exif tags with single values are represented as single-item vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagValue {
    /// Array of unsigned byte integers
    U8(Vec<u8>),
    /// ASCII string, cut at the first NUL. (The standard specifies 7-bit ASCII,
    /// other bytes are replaced.)
    Ascii(String),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    /// Array of bytes with opaque internal structure. Used by manufacturer-specific
    /// tags, version tags, user comments, etc.
    Undefined(Vec<u8>),
    /// Rational and floating-point data, passed through untouched together with the
    /// format it was declared with.
    Raw(IfdFormat, Vec<u8>),
}

/// Type returned by image file parsing
pub type ExifResult = Result<ExifData, ExifError>;
