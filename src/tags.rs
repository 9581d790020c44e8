//! Dictionary of known EXIF tags.
//!
//! The same numeric id means different things in different directories, so there is
//! one table per directory kind. The dictionary only annotates and validates: decoding
//! always follows the format and count found in the entry itself.

use super::types::*;
use std::collections::HashMap;

/// Number of components a tag is expected to carry
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentCount {
    Fixed(u32),
    /// Strings, blobs and lists whose length depends on the image
    Any,
}

/// Dictionary entry
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TagDescriptor {
    pub id: u16,
    pub format: IfdFormat,
    pub count: ComponentCount,
    pub name: &'static str,
}

impl TagDescriptor {
    /// Descriptor reported for ids missing from the dictionary
    pub fn unknown(id: u16) -> TagDescriptor {
        TagDescriptor {
            id,
            format: IfdFormat::Undefined,
            count: ComponentCount::Fixed(1),
            name: "UNDEFINED",
        }
    }
}

use self::ComponentCount::{Any, Fixed};
use crate::types::IfdFormat::*;

// Tags used by IFD-0 (main image)
const IFD0_TAGS: &[(u16, IfdFormat, ComponentCount, &str)] = &[
    (0x00fe, U32, Fixed(1), "NewSubfileType"),
    (0x00ff, U16, Fixed(1), "SubfileType"),
    (0x010e, Ascii, Any, "ImageDescription"),
    (0x010f, Ascii, Any, "Make"),
    (0x0110, Ascii, Any, "Model"),
    (0x0112, U16, Fixed(1), "Orientation"),
    (0x011a, URational, Fixed(1), "XResolution"),
    (0x011b, URational, Fixed(1), "YResolution"),
    (0x0128, U16, Fixed(1), "ResolutionUnit"),
    (0x012d, U16, Fixed(768), "TransferFunction"),
    (0x0131, Ascii, Any, "Software"),
    (0x0132, Ascii, Fixed(20), "DateTime"),
    (0x013b, Ascii, Any, "Artist"),
    (0x013d, U16, Fixed(1), "Predictor"),
    (0x013e, URational, Fixed(2), "WhitePoint"),
    (0x013f, URational, Fixed(6), "PrimaryChromaticities"),
    (0x0142, U16, Fixed(1), "TileWidth"),
    (0x0143, U16, Fixed(1), "TileLength"),
    (0x0144, U32, Any, "TileOffsets"),
    (0x0145, U16, Any, "TileByteCounts"),
    (0x014a, U32, Any, "SubIFDs"),
    (0x015b, Undefined, Any, "JPEGTables"),
    (0x0211, URational, Fixed(3), "YCbCrCoefficients"),
    (0x0213, U16, Fixed(1), "YCbCrPositioning"),
    (0x0214, URational, Fixed(6), "ReferenceBlackWhite"),
    (0x828d, U16, Fixed(2), "CFARepeatPatternDim"),
    (0x828e, U8, Any, "CFAPattern"),
    (0x828f, URational, Fixed(1), "BatteryLevel"),
    (0x8298, Ascii, Any, "Copyright"),
    (0x83bb, U32, Any, "IPTC/NAA"),
    (0x8769, U32, Fixed(1), "ExifOffset"),
    (0x8773, Undefined, Any, "InterColorProfile"),
    (0x8825, U32, Fixed(1), "GPSInfo"),
    (0x8829, U16, Fixed(1), "Interlace"),
    (0x9216, U8, Fixed(4), "TIFF/EPStandardID"),
];

// Tags used by the Exif SubIFD
const EXIF_TAGS: &[(u16, IfdFormat, ComponentCount, &str)] = &[
    (0x829a, URational, Fixed(1), "ExposureTime"),
    (0x829d, URational, Fixed(1), "FNumber"),
    (0x8822, U16, Fixed(1), "ExposureProgram"),
    (0x8824, Ascii, Any, "SpectralSensitivity"),
    (0x8827, U16, Any, "ISOSpeedRatings"),
    (0x8828, Undefined, Any, "OECF"),
    (0x882a, I16, Fixed(1), "TimeZoneOffset"),
    (0x882b, U16, Fixed(1), "SelfTimerMode"),
    (0x9000, Undefined, Fixed(4), "ExifVersion"),
    (0x9003, Ascii, Fixed(20), "DateTimeOriginal"),
    (0x9004, Ascii, Fixed(20), "DateTimeDigitized"),
    (0x9101, Undefined, Fixed(4), "ComponentConfiguration"),
    (0x9102, URational, Fixed(1), "CompressedBitsPerPixel"),
    (0x9201, IRational, Fixed(1), "ShutterSpeedValue"),
    (0x9202, URational, Fixed(1), "ApertureValue"),
    (0x9203, IRational, Fixed(1), "BrightnessValue"),
    (0x9204, IRational, Fixed(1), "ExposureBiasValue"),
    (0x9205, URational, Fixed(1), "MaxApertureValue"),
    (0x9206, URational, Fixed(1), "SubjectDistance"),
    (0x9207, U16, Fixed(1), "MeteringMode"),
    (0x9208, U16, Fixed(1), "LightSource"),
    (0x9209, U16, Fixed(1), "Flash"),
    (0x920a, URational, Fixed(1), "FocalLength"),
    (0x920b, URational, Fixed(1), "FlashEnergy"),
    (0x920c, Undefined, Any, "SpatialFrequencyResponse"),
    (0x920d, Undefined, Any, "Noise"),
    (0x9211, U32, Fixed(1), "ImageNumber"),
    (0x9212, Ascii, Fixed(1), "SecurityClassification"),
    (0x9213, Ascii, Any, "ImageHistory"),
    (0x9214, U16, Any, "SubjectArea"),
    (0x9215, URational, Fixed(1), "ExposureIndex"),
    (0x927c, Undefined, Any, "MakerNote"),
    (0x9286, Undefined, Any, "UserComment"),
    (0x9290, Ascii, Any, "SubSecTime"),
    (0x9291, Ascii, Any, "SubSecTimeOriginal"),
    (0x9292, Ascii, Any, "SubSecTimeDigitized"),
    (0xa000, Undefined, Fixed(4), "FlashPixVersion"),
    (0xa001, U16, Fixed(1), "ColorSpace"),
    (0xa002, U32, Fixed(1), "ExifImageWidth"),
    (0xa003, U32, Fixed(1), "ExifImageHeight"),
    (0xa004, Ascii, Fixed(13), "RelatedSoundFile"),
    (0xa005, U32, Fixed(1), "ExifInteroperabilityOffset"),
    (0xa20b, URational, Fixed(1), "FlashEnergy"),
    (0xa20c, Undefined, Any, "SpatialFrequencyResponse"),
    (0xa20e, URational, Fixed(1), "FocalPlaneXResolution"),
    (0xa20f, URational, Fixed(1), "FocalPlaneYResolution"),
    (0xa210, U16, Fixed(1), "FocalPlaneResolutionUnit"),
    (0xa214, U16, Fixed(2), "SubjectLocation"),
    (0xa215, URational, Fixed(1), "ExposureIndex"),
    (0xa217, U16, Fixed(1), "SensingMethod"),
    (0xa300, Undefined, Fixed(1), "FileSource"),
    (0xa301, Undefined, Fixed(1), "SceneType"),
    (0xa302, Undefined, Any, "CFAPattern"),
    (0xa401, U16, Fixed(1), "CustomRendered"),
    (0xa402, U16, Fixed(1), "ExposureMode"),
    (0xa403, U16, Fixed(1), "WhiteBalance"),
    (0xa404, URational, Fixed(1), "DigitalZoomRatio"),
    (0xa405, U16, Fixed(1), "FocalLengthIn35mmFilm"),
    (0xa406, U16, Fixed(1), "SceneCaptureType"),
    (0xa407, U16, Fixed(1), "GainControl"),
    (0xa408, U16, Fixed(1), "Contrast"),
    (0xa409, U16, Fixed(1), "Saturation"),
    (0xa40a, U16, Fixed(1), "Sharpness"),
    (0xa40b, Undefined, Any, "DeviceSettingDescription"),
    (0xa40c, U16, Fixed(1), "SubjectDistanceRange"),
    (0xa420, Ascii, Fixed(33), "ImageUniqueID"),
];

// Tags used by IFD-1 (thumbnail image)
const IFD1_TAGS: &[(u16, IfdFormat, ComponentCount, &str)] = &[
    (0x0100, U32, Fixed(1), "ImageWidth"),
    (0x0101, U32, Fixed(1), "ImageLength"),
    (0x0102, U16, Fixed(3), "BitsPerSample"),
    (0x0103, U16, Fixed(1), "Compression"),
    (0x0106, U16, Fixed(1), "PhotometricInterpretation"),
    (0x0111, U32, Any, "StripOffsets"),
    (0x0115, U16, Fixed(1), "SamplesPerPixel"),
    (0x0116, U32, Fixed(1), "RowsPerStrip"),
    (0x0117, U32, Any, "StripByteCounts"),
    (0x011a, URational, Fixed(1), "XResolution"),
    (0x011b, URational, Fixed(1), "YResolution"),
    (0x011c, U16, Fixed(1), "PlanarConfiguration"),
    (0x0128, U16, Fixed(1), "ResolutionUnit"),
    (0x0201, U32, Fixed(1), "JpegIFOffset"),
    (0x0202, U32, Fixed(1), "JpegIFByteCount"),
    (0x0211, URational, Fixed(3), "YCbCrCoefficients"),
    (0x0212, U16, Fixed(2), "YCbCrSubSampling"),
    (0x0213, U16, Fixed(1), "YCbCrPositioning"),
    (0x0214, URational, Fixed(6), "ReferenceBlackWhite"),
];

fn table(rows: &[(u16, IfdFormat, ComponentCount, &'static str)]) -> HashMap<u16, TagDescriptor> {
    rows.iter()
        .map(|&(id, format, count, name)| {
            (
                id,
                TagDescriptor {
                    id,
                    format,
                    count,
                    name,
                },
            )
        })
        .collect()
}

/// Known tags, one table per directory kind
#[derive(Clone, Debug)]
pub struct TagDictionary {
    ifd0: HashMap<u16, TagDescriptor>,
    exif: HashMap<u16, TagDescriptor>,
    ifd1: HashMap<u16, TagDescriptor>,
}

impl Default for TagDictionary {
    fn default() -> Self {
        TagDictionary::new()
    }
}

impl TagDictionary {
    pub fn new() -> Self {
        TagDictionary {
            ifd0: table(IFD0_TAGS),
            exif: table(EXIF_TAGS),
            ifd1: table(IFD1_TAGS),
        }
    }

    fn table(&self, kind: IfdKind) -> &HashMap<u16, TagDescriptor> {
        match kind {
            IfdKind::Ifd0 => &self.ifd0,
            IfdKind::Exif => &self.exif,
            IfdKind::Ifd1 => &self.ifd1,
        }
    }

    pub fn lookup(&self, kind: IfdKind, id: u16) -> Option<&TagDescriptor> {
        self.table(kind).get(&id)
    }

    /// Like `lookup`, but unknown ids resolve to `TagDescriptor::unknown`
    pub fn resolve(&self, kind: IfdKind, id: u16) -> TagDescriptor {
        self.lookup(kind, id)
            .copied()
            .unwrap_or_else(|| TagDescriptor::unknown(id))
    }

    /// Compare an entry against its descriptor, describing each mismatch.
    /// Unknown tags are never reported.
    pub fn check(&self, kind: IfdKind, entry: &IfdEntry) -> Vec<String> {
        let mut warnings = vec![];
        let desc = match self.lookup(kind, entry.tag()) {
            Some(desc) => desc,
            None => return warnings,
        };

        if desc.format != entry.format() {
            warnings.push(format!(
                "{} tag {:#06x} ({}), expected format {}, found {}",
                kind,
                desc.id,
                desc.name,
                desc.format,
                entry.format()
            ));
        }
        if let Fixed(n) = desc.count {
            // An ASCII field may legitimately be shorter than its nominal size
            if entry.count() != n && desc.format != IfdFormat::Ascii {
                warnings.push(format!(
                    "{} tag {:#06x} ({}), expected count {}, found {}",
                    kind,
                    desc.id,
                    desc.name,
                    n,
                    entry.count()
                ));
            }
        }
        warnings
    }
}
