//! JPEG container scanning and writing.
//!
//! A JPEG file is a sequence of segments, each introduced by `0xFF` and a marker byte.
//! Standalone markers (SOI, EOI, RSTn) carry nothing; all others are followed by a
//! big-endian length that counts itself, and `length - 2` payload bytes. After the
//! start-of-scan segment comes the entropy-coded image data, which runs up to the
//! end-of-image marker and is kept as an opaque block. Whatever follows end-of-image
//! (padding, appended videos) is kept as an opaque trailer.

use super::exif::ExifContainer;
use super::marker::{Marker, MarkerRegistry};
use super::types::*;

/// Largest payload that fits a segment length field (the field counts itself)
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

/// One marker plus its payload. The payload is empty for standalone markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    marker: Marker,
    payload: Vec<u8>,
}

impl Segment {
    pub fn new(marker: Marker, payload: Vec<u8>) -> Segment {
        Segment { marker, payload }
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Append the wire form of the segment to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), ExifError> {
        out.extend_from_slice(&self.marker.bytes());
        if self.marker.is_standalone() {
            return Ok(());
        }
        if self.payload.len() > MAX_SEGMENT_PAYLOAD {
            return Err(ExifError::SegmentTooLarge(self.payload.len()));
        }
        out.extend_from_slice(&((self.payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(())
    }
}

/// State of the segment scanner
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// Between segments, expecting `0xFF`
    Default,
    /// After `0xFF`, expecting the marker code
    Marker,
    /// Reading the two length bytes
    Size,
    /// Reading the payload
    Data,
    /// Past the start-of-scan segment, collecting image data
    Stream,
    /// Past the end-of-image marker, collecting trailing bytes
    Trailer,
}

/// Byte-at-a-time scanner that splits a JPEG stream into segments
#[derive(Debug)]
pub struct Scanner<'r> {
    registry: &'r MarkerRegistry,
    state: ScanState,
    /// Number of bytes fed so far
    position: usize,
    /// Marker of the segment being read, with the payload collected so far
    current: Option<(Marker, Vec<u8>)>,
    /// First length byte, once seen
    size_high: Option<u8>,
    /// Declared segment length, including the two length bytes
    size: usize,
    /// Bytes of the current segment consumed, including the two length bytes
    consumed: usize,
    segments: Vec<Segment>,
    scan_data: Vec<u8>,
    trailer: Vec<u8>,
}

impl<'r> Scanner<'r> {
    pub fn new(registry: &'r MarkerRegistry) -> Self {
        Scanner {
            registry,
            state: ScanState::Default,
            position: 0,
            current: None,
            size_high: None,
            size: 0,
            consumed: 0,
            segments: Vec::new(),
            scan_data: Vec::new(),
            trailer: Vec::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Segments completed so far
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn feed_all(&mut self, bytes: &[u8]) -> Result<(), ExifError> {
        match self.state {
            ScanState::Stream => self.scan_data.extend_from_slice(bytes),
            ScanState::Trailer => self.trailer.extend_from_slice(bytes),
            _ => {
                for (i, &byte) in bytes.iter().enumerate() {
                    self.feed(byte)?;
                    if matches!(self.state, ScanState::Stream | ScanState::Trailer) {
                        return self.feed_all(&bytes[i + 1..]);
                    }
                }
                return Ok(());
            }
        }
        self.position += bytes.len();
        Ok(())
    }

    pub fn feed(&mut self, byte: u8) -> Result<(), ExifError> {
        let at = self.position;
        self.position += 1;
        match self.state {
            ScanState::Default => {
                if byte != 0xff {
                    return Err(ExifError::stream(
                        at,
                        format!("expected a marker, found {:#04x}", byte),
                    ));
                }
                self.state = ScanState::Marker;
            }
            ScanState::Marker => {
                if byte == 0x00 || byte == 0xff {
                    return Err(ExifError::stream(
                        at,
                        format!("invalid marker code {:#04x}", byte),
                    ));
                }
                let marker = self.registry.marker(byte);
                if marker.is_standalone() {
                    self.segments.push(Segment::new(marker, Vec::new()));
                    self.state = if marker == Marker::EOI {
                        ScanState::Trailer
                    } else {
                        ScanState::Default
                    };
                } else {
                    self.current = Some((marker, Vec::new()));
                    self.size_high = None;
                    self.state = ScanState::Size;
                }
            }
            ScanState::Size => match self.size_high.take() {
                None => self.size_high = Some(byte),
                Some(high) => {
                    self.size = usize::from(u16::from_be_bytes([high, byte]));
                    if self.size < 2 {
                        return Err(ExifError::stream(
                            at,
                            format!("segment length {} is shorter than its own field", self.size),
                        ));
                    }
                    self.consumed = 2;
                    self.state = ScanState::Data;
                    if self.size == 2 {
                        self.finish_segment();
                    }
                }
            },
            ScanState::Data => {
                if let Some((_, payload)) = self.current.as_mut() {
                    payload.push(byte);
                }
                self.consumed += 1;
                if self.consumed == self.size {
                    self.finish_segment();
                }
            }
            ScanState::Stream => self.scan_data.push(byte),
            ScanState::Trailer => self.trailer.push(byte),
        }
        Ok(())
    }

    fn finish_segment(&mut self) {
        if let Some((marker, payload)) = self.current.take() {
            self.state = if marker == Marker::SOS {
                ScanState::Stream
            } else {
                ScanState::Default
            };
            self.segments.push(Segment::new(marker, payload));
        }
    }

    /// Close the stream and build the image
    pub fn finish(mut self) -> Result<JpegImage, ExifError> {
        match self.state {
            ScanState::Default | ScanState::Trailer => (),
            ScanState::Marker | ScanState::Size | ScanState::Data => {
                return Err(ExifError::stream(
                    self.position,
                    format!("stream ends inside a segment ({:?})", self.state),
                ));
            }
            ScanState::Stream => {
                // Stuffing keeps FF D9 out of entropy-coded data, so the first one ends it
                let end = self
                    .scan_data
                    .windows(2)
                    .position(|w| w == Marker::EOI.bytes())
                    .ok_or_else(|| {
                        ExifError::stream(
                            self.position,
                            "scan data is not terminated by an end-of-image marker",
                        )
                    })?;
                self.trailer = self.scan_data.split_off(end + 2);
                self.scan_data.truncate(end);
                self.segments.push(Segment::new(Marker::EOI, Vec::new()));
            }
        }
        log::debug!(
            "Scanned {} segments, {} bytes of scan data, {} bytes after end-of-image",
            self.segments.len(),
            self.scan_data.len(),
            self.trailer.len()
        );
        Ok(JpegImage {
            segments: self.segments,
            scan_data: self.scan_data,
            trailer: self.trailer,
        })
    }
}

/// A scanned JPEG file: its segments in order, the entropy-coded data that
/// follows the start-of-scan segment, and any bytes after end-of-image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JpegImage {
    segments: Vec<Segment>,
    scan_data: Vec<u8>,
    trailer: Vec<u8>,
}

impl JpegImage {
    /// Scan a whole JPEG file held in memory
    pub fn decode(registry: &MarkerRegistry, contents: &[u8]) -> Result<JpegImage, ExifError> {
        let mut scanner = Scanner::new(registry);
        scanner.feed_all(contents)?;
        scanner.finish()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn scan_data(&self) -> &[u8] {
        &self.scan_data
    }

    /// Bytes found after the end-of-image marker
    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }

    /// All segments introduced by `marker`, in file order
    pub fn segments_with(&self, marker: Marker) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.marker == marker)
    }

    pub fn segment_count(&self, marker: Marker) -> usize {
        self.segments_with(marker).count()
    }

    /// APP1 segments whose payload opens with the Exif header, with their index
    pub fn exif_segments(&self) -> impl Iterator<Item = (usize, &Segment)> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.marker == Marker::APP1 && s.payload.starts_with(EXIF_HEADER))
    }

    /// Decode the first APP1 segment that carries a usable EXIF block, and return it
    /// with the index of its segment.
    ///
    /// Segments without the Exif header are skipped silently. Segments that have the
    /// header but do not decode are skipped too, with one warning each.
    pub fn find_exif(
        &self,
        config: &ParserConfig,
        warnings: &mut Vec<String>,
    ) -> Option<(usize, ExifContainer)> {
        for (index, segment) in self.exif_segments() {
            match ExifContainer::decode_with(segment.payload(), config) {
                Ok(Some(exif)) => return Some((index, exif)),
                Ok(None) => (),
                Err(e) => warnings.push(format!(
                    "Skipping undecodable EXIF block in segment {}: {}",
                    index, e
                )),
            }
        }
        None
    }

    /// Write the image back. When `exif` is given, its container replaces the payload
    /// of the segment at the given index; everything else is copied as scanned.
    pub fn encode(&self, exif: Option<(usize, &ExifContainer)>) -> Result<Vec<u8>, ExifError> {
        let mut out = Vec::with_capacity(
            self.scan_data.len()
                + self.trailer.len()
                + self.segments.iter().map(|s| s.payload.len() + 4).sum::<usize>(),
        );
        for (i, segment) in self.segments.iter().enumerate() {
            match exif {
                Some((index, exif)) if index == i => exif.to_segment()?.write_to(&mut out)?,
                _ => segment.write_to(&mut out)?,
            }
            if segment.marker == Marker::SOS {
                out.extend_from_slice(&self.scan_data);
            }
        }
        out.extend_from_slice(&self.trailer);
        Ok(out)
    }
}
