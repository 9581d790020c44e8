//! JPEG marker codes.
//!
//! A marker is the byte that follows `0xFF` at a segment boundary. Most markers
//! open a length-prefixed segment; a few stand alone and carry nothing.

use std::fmt;

/// Whether a marker is followed by a length field and a payload
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MarkerCategory {
    /// No length, no payload (SOI, EOI, RSTn, TEM)
    Standalone,
    /// Length-prefixed segment
    Segment,
}

/// A marker code together with its category. Two markers are equal when their codes are.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Marker {
    code: u8,
    category: MarkerCategory,
}

impl Marker {
    /// Start of image
    pub const SOI: Marker = Marker::new(0xd8);
    /// End of image
    pub const EOI: Marker = Marker::new(0xd9);
    /// Start of scan
    pub const SOS: Marker = Marker::new(0xda);
    /// Application segment 1, where EXIF lives
    pub const APP1: Marker = Marker::new(0xe1);

    pub const fn new(code: u8) -> Marker {
        Marker {
            code,
            category: category_of(code),
        }
    }

    pub fn code(self) -> u8 {
        self.code
    }

    pub fn category(self) -> MarkerCategory {
        self.category
    }

    pub fn is_standalone(self) -> bool {
        self.category == MarkerCategory::Standalone
    }

    /// The two bytes that introduce the marker in a stream
    pub fn bytes(self) -> [u8; 2] {
        [0xff, self.code]
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FF{:02X}", self.code)
    }
}

const fn category_of(code: u8) -> MarkerCategory {
    match code {
        0x01 | 0xd0..=0xd9 => MarkerCategory::Standalone,
        _ => MarkerCategory::Segment,
    }
}

/// Registry entry for one marker code
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MarkerInfo {
    pub marker: Marker,
    pub abbreviation: &'static str,
    pub description: &'static str,
}

impl MarkerInfo {
    pub fn category(&self) -> MarkerCategory {
        self.marker.category()
    }
}

impl fmt::Display for MarkerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.abbreviation, self.description)
    }
}

/// Lookup table covering all 256 marker codes
#[derive(Clone, Debug)]
pub struct MarkerRegistry {
    table: Vec<MarkerInfo>,
}

impl Default for MarkerRegistry {
    fn default() -> Self {
        MarkerRegistry::new()
    }
}

impl MarkerRegistry {
    pub fn new() -> Self {
        let table = (0..=u8::MAX)
            .map(|code| {
                let (abbreviation, description) = describe(code);
                MarkerInfo {
                    marker: Marker::new(code),
                    abbreviation,
                    description,
                }
            })
            .collect();
        MarkerRegistry { table }
    }

    pub fn classify(&self, code: u8) -> &MarkerInfo {
        &self.table[code as usize]
    }

    pub fn marker(&self, code: u8) -> Marker {
        self.classify(code).marker
    }

    /// Find a marker by its abbreviation, e.g. "APP1" or "SOS"
    pub fn find(&self, abbreviation: &str) -> Option<Marker> {
        self.table
            .iter()
            .find(|info| info.abbreviation.eq_ignore_ascii_case(abbreviation))
            .map(|info| info.marker)
    }
}

fn describe(code: u8) -> (&'static str, &'static str) {
    match code {
        0x00 | 0xff => ("INV", "Invalid"),
        0x01 => ("TEM", "For temporary private use in arithmetic coding"),
        0x02..=0xbf => ("RES", "Reserved"),
        // Start of frame markers, non-differential, Huffman coding
        0xc0 => ("SOF0", "Baseline DCT"),
        0xc1 => ("SOF1", "Extended sequential DCT"),
        0xc2 => ("SOF2", "Progressive DCT"),
        0xc3 => ("SOF3", "Lossless (sequential)"),
        0xc4 => ("DHT", "Define Huffman table(s)"),
        // Start of frame markers, differential, Huffman coding
        0xc5 => ("SOF5", "Differential sequential DCT"),
        0xc6 => ("SOF6", "Differential progressive DCT"),
        0xc7 => ("SOF7", "Differential lossless (sequential)"),
        // Start of frame markers, non-differential, arithmetic coding
        0xc8 => ("JPG", "Reserved for JPEG extensions"),
        0xc9 => ("SOF9", "Extended sequential DCT"),
        0xca => ("SOF10", "Progressive DCT"),
        0xcb => ("SOF11", "Lossless (sequential)"),
        0xcc => ("DAC", "Define arithmetic coding conditioning(s)"),
        // Start of frame markers, differential, arithmetic coding
        0xcd => ("SOF13", "Differential sequential DCT"),
        0xce => ("SOF14", "Differential progressive DCT"),
        0xcf => ("SOF15", "Differential lossless (sequential)"),
        0xd0 => ("RST0", "Restart with modulo 8 count 0"),
        0xd1 => ("RST1", "Restart with modulo 8 count 1"),
        0xd2 => ("RST2", "Restart with modulo 8 count 2"),
        0xd3 => ("RST3", "Restart with modulo 8 count 3"),
        0xd4 => ("RST4", "Restart with modulo 8 count 4"),
        0xd5 => ("RST5", "Restart with modulo 8 count 5"),
        0xd6 => ("RST6", "Restart with modulo 8 count 6"),
        0xd7 => ("RST7", "Restart with modulo 8 count 7"),
        0xd8 => ("SOI", "Start of image"),
        0xd9 => ("EOI", "End of image"),
        0xda => ("SOS", "Start of scan"),
        0xdb => ("DQT", "Define quantization table(s)"),
        0xdc => ("DNL", "Define number of lines"),
        0xdd => ("DRI", "Define restart interval"),
        0xde => ("DHP", "Define hierarchical progression"),
        0xdf => ("EXP", "Expand reference component(s)"),
        0xe0 => ("APP0", "Application segment 0"),
        0xe1 => ("APP1", "Application segment 1"),
        0xe2 => ("APP2", "Application segment 2"),
        0xe3 => ("APP3", "Application segment 3"),
        0xe4 => ("APP4", "Application segment 4"),
        0xe5 => ("APP5", "Application segment 5"),
        0xe6 => ("APP6", "Application segment 6"),
        0xe7 => ("APP7", "Application segment 7"),
        0xe8 => ("APP8", "Application segment 8"),
        0xe9 => ("APP9", "Application segment 9"),
        0xea => ("APP10", "Application segment 10"),
        0xeb => ("APP11", "Application segment 11"),
        0xec => ("APP12", "Application segment 12"),
        0xed => ("APP13", "Application segment 13"),
        0xee => ("APP14", "Application segment 14"),
        0xef => ("APP15", "Application segment 15"),
        0xf0 => ("JPG0", "Reserved for JPEG extension 0"),
        0xf1 => ("JPG1", "Reserved for JPEG extension 1"),
        0xf2 => ("JPG2", "Reserved for JPEG extension 2"),
        0xf3 => ("JPG3", "Reserved for JPEG extension 3"),
        0xf4 => ("JPG4", "Reserved for JPEG extension 4"),
        0xf5 => ("JPG5", "Reserved for JPEG extension 5"),
        0xf6 => ("JPG6", "Reserved for JPEG extension 6"),
        0xf7 => ("JPG7", "Reserved for JPEG extension 7"),
        0xf8 => ("JPG8", "Reserved for JPEG extension 8"),
        0xf9 => ("JPG9", "Reserved for JPEG extension 9"),
        0xfa => ("JPG10", "Reserved for JPEG extension 10"),
        0xfb => ("JPG11", "Reserved for JPEG extension 11"),
        0xfc => ("JPG12", "Reserved for JPEG extension 12"),
        0xfd => ("JPG13", "Reserved for JPEG extension 13"),
        0xfe => ("COM", "Comment"),
    }
}
