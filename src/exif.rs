//! The EXIF block of an APP1 segment.
//!
//! Layout of the payload: the `Exif\0\0` signature, then a TIFF area made of an 8-byte
//! header, IFD-0 (which links to IFD-1 and points to the Exif SubIFD), the three
//! directories' out-of-line tag data, and a trailing opaque thumbnail. Every offset in
//! the TIFF area is relative to its first byte.
//!
//! Encoding writes everything back at the offsets it was read from, so an unmodified
//! container reproduces its payload byte for byte.

use super::jpeg::{Segment, MAX_SEGMENT_PAYLOAD};
use super::lowlevel::*;
use super::marker::Marker;
use super::tags::TagDictionary;
use super::tiff::*;
use super::types::*;
use std::collections::HashSet;

/// A decoded EXIF block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExifContainer {
    align: ByteAlign,
    ifd0_offset: u32,
    ifd0: Ifd,
    exif: Ifd,
    ifd1: Ifd,
    /// Bytes before the thumbnail that no directory or tag data accounts for
    /// (other sub-directories, maker note internals, padding)
    filler: Vec<Patch>,
    /// Where the thumbnail starts in the TIFF area
    thumbnail_offset: usize,
    thumbnail: Vec<u8>,
}

impl ExifContainer {
    /// Decode an APP1 payload with the default configuration.
    ///
    /// Returns `Ok(None)` when the payload does not open with the Exif signature.
    pub fn decode(payload: &[u8]) -> Result<Option<ExifContainer>, ExifError> {
        ExifContainer::decode_with(payload, &ParserConfig::default())
    }

    pub fn decode_with(
        payload: &[u8],
        config: &ParserConfig,
    ) -> Result<Option<ExifContainer>, ExifError> {
        if !payload.starts_with(EXIF_HEADER) {
            return Ok(None);
        }
        let contents = &payload[EXIF_HEADER.len()..];

        let preamble = read_bytes(contents, 0, TIFF_HEADER_LEN)?;
        let align = if &preamble[..4] == INTEL_TIFF_HEADER {
            ByteAlign::Intel
        } else if &preamble[..4] == MOTOROLA_TIFF_HEADER {
            ByteAlign::Motorola
        } else {
            return Err(ExifError::MalformedExif(format!(
                "bad byte order preamble {:02x} {:02x} {:02x} {:02x}",
                preamble[0], preamble[1], preamble[2], preamble[3]
            )));
        };
        let ifd0_offset = read_u32(contents, 4, align)?;
        log::debug!("EXIF block: {:?} byte order, IFD-0 at {:#x}", align, ifd0_offset);

        let mut chain = walk_chain(contents, ifd0_offset, align, config)?.into_iter();
        let (ifd0, ifd1) = match (chain.next(), chain.next()) {
            (Some(ifd0), Some(ifd1)) => (ifd0, ifd1),
            _ => {
                return Err(ExifError::MalformedExif(
                    "IFD-0 does not link to a thumbnail directory".to_string(),
                ))
            }
        };
        if chain.len() > 0 {
            log::warn!(
                "Ignoring {} directories chained after IFD-1, their bytes are kept as they are",
                chain.len()
            );
        }

        let pointer = ifd0.get(EXIF_OFFSET_TAG).ok_or_else(|| {
            ExifError::MalformedExif("IFD-0 has no pointer to the Exif SubIFD".to_string())
        })?;
        let exif_offset = pointer
            .value()?
            .to_i64(0)
            .and_then(|o| u32::try_from(o).ok())
            .ok_or_else(|| {
                ExifError::MalformedExif(format!(
                    "Exif SubIFD pointer has format {} and count {}",
                    pointer.format(),
                    pointer.count()
                ))
            })?;
        log::debug!("Exif SubIFD at {:#x}", exif_offset);
        let exif = decode_ifd(contents, exif_offset as usize, align)?;

        let covered = covered_ranges(&[&ifd0, &exif, &ifd1]);
        let thumbnail_offset = covered
            .iter()
            .map(|&(_, end)| end)
            .max()
            .unwrap_or(TIFF_HEADER_LEN)
            .min(contents.len());
        let filler = filler_spans(contents, &covered, thumbnail_offset);
        log::debug!(
            "{} filler spans, thumbnail of {} bytes at {:#x}",
            filler.len(),
            contents.len() - thumbnail_offset,
            thumbnail_offset
        );

        Ok(Some(ExifContainer {
            align,
            ifd0_offset,
            ifd0,
            exif,
            ifd1,
            filler,
            thumbnail_offset,
            thumbnail: contents[thumbnail_offset..].to_vec(),
        }))
    }

    /// Serialize the block, signature included, ready to become an APP1 payload.
    ///
    /// Directories and out-of-line values go back to their recorded offsets; gaps are
    /// restored from the filler spans and are zero everywhere else.
    pub fn encode(&self) -> Vec<u8> {
        let mut tiff = vec![0u8; self.thumbnail_offset];

        let mut header = self.preamble().to_vec();
        header.extend(write_u32(self.ifd0_offset, self.align));
        let mut patches = vec![Patch {
            offset: 0,
            data: header,
        }];
        patches.extend(self.filler.iter().cloned());
        for (_, ifd) in self.directories() {
            patches.push(Patch {
                offset: ifd.offset as usize,
                data: encode_ifd(ifd, self.align),
            });
            for entry in &ifd.entries {
                if let Some(offset) = entry.offset {
                    patches.push(Patch::new(offset as usize, &entry.data));
                }
            }
        }

        for patch in &patches {
            let end = patch.offset + patch.data.len();
            if end > tiff.len() {
                tiff.resize(end, 0);
            }
            for (place, byte) in tiff.iter_mut().skip(patch.offset).zip(patch.data.iter()) {
                *place = *byte;
            }
        }

        let mut serialized = Vec::with_capacity(EXIF_HEADER.len() + tiff.len() + self.thumbnail.len());
        serialized.extend_from_slice(EXIF_HEADER);
        serialized.extend(tiff);
        serialized.extend_from_slice(&self.thumbnail);
        serialized
    }

    /// Wrap the encoded block in an APP1 segment
    pub fn to_segment(&self) -> Result<Segment, ExifError> {
        let payload = self.encode();
        if payload.len() > MAX_SEGMENT_PAYLOAD {
            return Err(ExifError::SegmentTooLarge(payload.len()));
        }
        Ok(Segment::new(Marker::APP1, payload))
    }

    fn preamble(&self) -> &'static [u8] {
        match self.align {
            ByteAlign::Intel => INTEL_TIFF_HEADER,
            ByteAlign::Motorola => MOTOROLA_TIFF_HEADER,
        }
    }

    pub fn byte_align(&self) -> ByteAlign {
        self.align
    }

    /// Offset of IFD-0 as written in the TIFF header (normally 8)
    pub fn ifd0_offset(&self) -> u32 {
        self.ifd0_offset
    }

    pub fn directory(&self, kind: IfdKind) -> &Ifd {
        match kind {
            IfdKind::Ifd0 => &self.ifd0,
            IfdKind::Exif => &self.exif,
            IfdKind::Ifd1 => &self.ifd1,
        }
    }

    fn directory_mut(&mut self, kind: IfdKind) -> &mut Ifd {
        match kind {
            IfdKind::Ifd0 => &mut self.ifd0,
            IfdKind::Exif => &mut self.exif,
            IfdKind::Ifd1 => &mut self.ifd1,
        }
    }

    /// The three directories in decoding order: IFD-0, Exif SubIFD, IFD-1
    pub fn directories(&self) -> impl Iterator<Item = (IfdKind, &Ifd)> {
        [IfdKind::Ifd0, IfdKind::Exif, IfdKind::Ifd1]
            .into_iter()
            .map(move |kind| (kind, self.directory(kind)))
    }

    /// Opaque bytes that follow the directories and their data
    pub fn thumbnail(&self) -> &[u8] {
        &self.thumbnail
    }

    pub fn entry(&self, kind: IfdKind, tag: u16) -> Option<&IfdEntry> {
        self.directory(kind).get(tag)
    }

    pub fn value(&self, kind: IfdKind, tag: u16) -> Result<TagValue, ExifError> {
        self.entry(kind, tag)
            .ok_or(ExifError::TagNotFound { kind, tag })?
            .value()
    }

    /// Replace the value of an existing tag. `data` must already be in the block's
    /// byte order. Values longer than four bytes must fit the space the tag had, and
    /// that space must not hold the value of another entry too.
    pub fn set_value(
        &mut self,
        kind: IfdKind,
        tag: u16,
        format: IfdFormat,
        count: u32,
        data: &[u8],
    ) -> Result<(), ExifError> {
        if kind == IfdKind::Ifd0 && tag == EXIF_OFFSET_TAG {
            return Err(ExifError::MalformedExif(
                "the Exif SubIFD pointer cannot be rewritten".to_string(),
            ));
        }
        let entry = self
            .entry(kind, tag)
            .ok_or(ExifError::TagNotFound { kind, tag })?;
        if let (Some(offset), true) = (entry.offset, data.len() > DATA_WIDTH) {
            let start = offset as usize;
            let end = start + entry.data.len();
            let shared = self.directories().any(|(_, ifd)| {
                ifd.entries.iter().any(|other| {
                    !std::ptr::eq(other, entry)
                        && other.offset.map_or(false, |o| {
                            (o as usize) < end && start < o as usize + other.data.len()
                        })
                })
            });
            if shared {
                return Err(ExifError::SharedValue { tag, offset });
            }
        }

        self.directory_mut(kind)
            .get_mut(tag)
            .ok_or(ExifError::TagNotFound { kind, tag })?
            .set_value(format, count, data)
    }

    /// Compare every entry with the dictionary and describe the mismatches
    pub fn validate(&self, tags: &TagDictionary) -> Vec<String> {
        self.directories()
            .flat_map(|(kind, ifd)| ifd.entries.iter().flat_map(move |e| tags.check(kind, e)))
            .collect()
    }
}

/// Follow next-directory links from IFD-0 until a zero link, a loop, or the
/// configured limit
fn walk_chain(
    contents: &[u8],
    first: u32,
    align: ByteAlign,
    config: &ParserConfig,
) -> Result<Vec<Ifd>, ExifError> {
    let mut chain: Vec<Ifd> = Vec::new();
    let mut seen = HashSet::new();
    let mut offset = first;
    while offset != 0 {
        if !seen.insert(offset) {
            return Err(ExifError::MalformedExif(format!(
                "directory chain loops back to {:#x}",
                offset
            )));
        }
        if chain.len() == config.max_chain_length {
            log::warn!(
                "Directory chain longer than {}, not following {:#x}",
                config.max_chain_length,
                offset
            );
            break;
        }
        log::debug!("Directory {} of the chain at {:#x}", chain.len(), offset);
        let ifd = decode_ifd(contents, offset as usize, align)?;
        offset = ifd.next_ifd_offset;
        chain.push(ifd);
    }
    Ok(chain)
}

/// Byte ranges of the TIFF area that the header, the directories and their
/// out-of-line data account for, sorted by start
fn covered_ranges(dirs: &[&Ifd]) -> Vec<(usize, usize)> {
    let mut ranges = vec![(0, TIFF_HEADER_LEN)];
    for ifd in dirs {
        let start = ifd.offset as usize;
        ranges.push((start, start + ifd.byte_len()));
        for entry in &ifd.entries {
            if let Some(offset) = entry.offset {
                ranges.push((offset as usize, offset as usize + entry.data.len()));
            }
        }
    }
    ranges.sort_unstable();
    ranges
}

/// Collect the non-zero bytes of `contents[..end]` that fall outside `covered`
fn filler_spans(contents: &[u8], covered: &[(usize, usize)], end: usize) -> Vec<Patch> {
    let mut spans = vec![];
    let mut cursor = 0;
    let mut push_gap = |from: usize, to: usize| {
        let gap = &contents[from..to];
        if gap.iter().any(|&b| b != 0) {
            spans.push(Patch::new(from, gap));
        }
    };
    for &(start, stop) in covered {
        let start = start.min(end);
        if start > cursor {
            push_gap(cursor, start);
        }
        cursor = cursor.max(stop.min(end));
    }
    if end > cursor {
        push_gap(cursor, end);
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds TIFF areas entry by entry, in either byte order
    struct Builder {
        align: ByteAlign,
        out: Vec<u8>,
    }

    impl Builder {
        fn new(align: ByteAlign) -> Self {
            let mut out = EXIF_HEADER.to_vec();
            out.extend_from_slice(match align {
                ByteAlign::Intel => INTEL_TIFF_HEADER,
                ByteAlign::Motorola => MOTOROLA_TIFF_HEADER,
            });
            out.extend(write_u32(8, align));
            Builder { align, out }
        }
        fn u16(&mut self, v: u16) -> &mut Self {
            self.out.extend(write_u16(v, self.align));
            self
        }
        fn u32(&mut self, v: u32) -> &mut Self {
            self.out.extend(write_u32(v, self.align));
            self
        }
        fn raw(&mut self, v: &[u8]) -> &mut Self {
            self.out.extend_from_slice(v);
            self
        }
        fn entry(&mut self, tag: u16, format: u16, count: u32, field: [u8; 4]) -> &mut Self {
            self.u16(tag).u16(format).u32(count).raw(&field)
        }
        fn entry_at(&mut self, tag: u16, format: u16, count: u32, offset: u32) -> &mut Self {
            self.u16(tag).u16(format).u32(count).u32(offset)
        }
        fn finish(&self) -> Vec<u8> {
            self.out.clone()
        }
    }

    /// IFD-0 (3 entries) at 8, Exif SubIFD (2 entries) at 50, IFD-1 (1 entry) at 80,
    /// a gap with a foreign byte, Make/UserComment data, then the thumbnail.
    fn sample(align: ByteAlign) -> Vec<u8> {
        let mut b = Builder::new(align);
        // IFD-0: 2 + 3*12 + 4 = 42 bytes, ends at 50
        b.u16(3)
            .entry_at(0x010f, 2, 6, 100)
            .entry(0x0112, 3, 1, [0; 4])
            .entry_at(EXIF_OFFSET_TAG, 4, 1, 50)
            .u32(80);
        // Patch the Orientation value in the right byte order
        let value = write_u16(6, align);
        let at = EXIF_HEADER.len() + 8 + 2 + 12 + 8;
        b.out[at..at + 2].copy_from_slice(&value);
        // Exif SubIFD: 2 + 2*12 + 4 = 30 bytes, ends at 80
        b.u16(2)
            .entry(0x9000, 7, 4, *b"0220")
            .entry_at(0x9286, 7, 8, 106)
            .u32(0);
        // IFD-1: 2 + 12 + 4 = 18 bytes, ends at 98
        b.u16(1).entry(0x0103, 3, 1, [0; 4]).u32(0);
        // Gap 98..100 holding a stray byte
        b.raw(&[0x00, 0x5a]);
        // Out-of-line data 100..114
        b.raw(b"Canon\0").raw(b"ASCII\0\0\0");
        // Thumbnail
        b.raw(&[0xff, 0xd8, 0x01, 0x02, 0xff, 0xd9]);
        b.finish()
    }

    #[test]
    fn test_round_trip_both_orders() {
        for align in [ByteAlign::Intel, ByteAlign::Motorola] {
            let payload = sample(align);
            let exif = ExifContainer::decode(&payload).unwrap().unwrap();
            assert_eq!(exif.byte_align(), align);
            assert_eq!(exif.ifd0_offset(), 8);
            assert_eq!(exif.directory(IfdKind::Ifd0).len(), 3);
            assert_eq!(exif.directory(IfdKind::Exif).offset(), 50);
            assert_eq!(exif.directory(IfdKind::Ifd1).offset(), 80);
            assert_eq!(exif.thumbnail(), &[0xff, 0xd8, 0x01, 0x02, 0xff, 0xd9]);
            assert_eq!(exif.value(IfdKind::Ifd0, 0x0112).unwrap(), TagValue::U16(vec![6]));
            assert_eq!(
                exif.value(IfdKind::Ifd0, 0x010f).unwrap().as_str(),
                Some("Canon")
            );
            assert_eq!(exif.encode(), payload);
        }
    }

    #[test]
    fn test_gap_is_kept() {
        let payload = sample(ByteAlign::Intel);
        let exif = ExifContainer::decode(&payload).unwrap().unwrap();
        assert_eq!(exif.filler, vec![Patch::new(98, &[0x00, 0x5a])]);
    }

    #[test]
    fn test_not_exif() {
        assert_eq!(ExifContainer::decode(b"http://ns.adobe.com/xap/1.0/\0").unwrap(), None);
        assert_eq!(ExifContainer::decode(b"").unwrap(), None);
    }

    #[test]
    fn test_bad_preamble() {
        let mut payload = sample(ByteAlign::Intel);
        payload[6] = b'X';
        assert!(matches!(
            ExifContainer::decode(&payload),
            Err(ExifError::MalformedExif(_))
        ));
        assert!(matches!(
            ExifContainer::decode(b"Exif\0\0II*"),
            Err(ExifError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_single_directory_chain() {
        let mut b = Builder::new(ByteAlign::Motorola);
        b.u16(1).entry_at(EXIF_OFFSET_TAG, 4, 1, 26).u32(0);
        b.u16(0).u32(0);
        match ExifContainer::decode(&b.finish()) {
            Err(ExifError::MalformedExif(msg)) => assert!(msg.contains("thumbnail")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_exif_pointer() {
        let mut b = Builder::new(ByteAlign::Motorola);
        b.u16(1).entry(0x0112, 3, 1, [0, 1, 0, 0]).u32(26);
        b.u16(0).u32(0);
        match ExifContainer::decode(&b.finish()) {
            Err(ExifError::MalformedExif(msg)) => assert!(msg.contains("Exif SubIFD")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_chain_loop() {
        let mut b = Builder::new(ByteAlign::Intel);
        b.u16(0).u32(8);
        assert!(matches!(
            ExifContainer::decode(&b.finish()),
            Err(ExifError::MalformedExif(_))
        ));
    }

    #[test]
    fn test_chain_limit() {
        let mut b = Builder::new(ByteAlign::Intel);
        b.u16(1).entry_at(EXIF_OFFSET_TAG, 4, 1, 32).u32(26);
        b.u16(0).u32(32);
        b.u16(0).u32(0);
        let payload = b.finish();
        let config = ParserConfig {
            max_chain_length: 2,
            ..ParserConfig::default()
        };
        let exif = ExifContainer::decode_with(&payload, &config).unwrap().unwrap();
        assert_eq!(exif.directory(IfdKind::Ifd1).offset(), 26);
        assert_eq!(exif.encode(), payload);
    }

    #[test]
    fn test_edit_then_encode() {
        let payload = sample(ByteAlign::Motorola);
        let mut exif = ExifContainer::decode(&payload).unwrap().unwrap();
        exif.set_value(IfdKind::Ifd0, 0x010f, IfdFormat::Ascii, 6, b"Nikon\0")
            .unwrap();
        exif.set_value(IfdKind::Ifd0, 0x0112, IfdFormat::U16, 1, &[0, 1])
            .unwrap();

        let encoded = exif.encode();
        assert_eq!(encoded.len(), payload.len());
        let again = ExifContainer::decode(&encoded).unwrap().unwrap();
        assert_eq!(again.value(IfdKind::Ifd0, 0x010f).unwrap().as_str(), Some("Nikon"));
        assert_eq!(again.value(IfdKind::Ifd0, 0x0112).unwrap(), TagValue::U16(vec![1]));
        assert_eq!(again.thumbnail(), exif.thumbnail());
    }

    #[test]
    fn test_edit_errors() {
        let mut exif = ExifContainer::decode(&sample(ByteAlign::Intel)).unwrap().unwrap();
        assert!(matches!(
            exif.set_value(IfdKind::Ifd1, 0x0112, IfdFormat::U16, 1, &[1, 0]),
            Err(ExifError::TagNotFound { kind: IfdKind::Ifd1, tag: 0x0112 })
        ));
        assert!(matches!(
            exif.set_value(IfdKind::Ifd0, 0x010f, IfdFormat::Ascii, 9, b"Olympus!\0"),
            Err(ExifError::ValueDoesNotFit { .. })
        ));
        assert!(exif
            .set_value(IfdKind::Ifd0, EXIF_OFFSET_TAG, IfdFormat::U32, 1, &[0; 4])
            .is_err());
    }

    #[test]
    fn test_edit_shared_value() {
        // Make and Model both point at the same six bytes
        let mut b = Builder::new(ByteAlign::Intel);
        b.u16(3)
            .entry_at(0x010f, 2, 6, 62)
            .entry_at(0x0110, 2, 6, 62)
            .entry_at(EXIF_OFFSET_TAG, 4, 1, 50)
            .u32(56);
        b.u16(0).u32(0);
        b.u16(0).u32(0);
        b.raw(b"Canon\0");
        let payload = b.finish();
        let mut exif = ExifContainer::decode(&payload).unwrap().unwrap();
        assert_eq!(exif.encode(), payload);

        match exif.set_value(IfdKind::Ifd0, 0x010f, IfdFormat::Ascii, 6, b"Nikon\0") {
            Err(ExifError::SharedValue {
                tag: 0x010f,
                offset: 62,
            }) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(exif.encode(), payload);

        // Moving Model inline frees the slot for Make
        exif.set_value(IfdKind::Ifd0, 0x0110, IfdFormat::Ascii, 3, b"LG\0")
            .unwrap();
        exif.set_value(IfdKind::Ifd0, 0x010f, IfdFormat::Ascii, 6, b"Nikon\0")
            .unwrap();
        let again = ExifContainer::decode(&exif.encode()).unwrap().unwrap();
        assert_eq!(again.value(IfdKind::Ifd0, 0x010f).unwrap().as_str(), Some("Nikon"));
        assert_eq!(again.value(IfdKind::Ifd0, 0x0110).unwrap().as_str(), Some("LG"));
    }

    #[test]
    fn test_validate() {
        let exif = ExifContainer::decode(&sample(ByteAlign::Intel)).unwrap().unwrap();
        assert!(exif.validate(&TagDictionary::new()).is_empty());

        let mut b = Builder::new(ByteAlign::Intel);
        b.u16(2)
            .entry(0x0112, 4, 1, [1, 0, 0, 0])
            .entry_at(EXIF_OFFSET_TAG, 4, 1, 38)
            .u32(44);
        b.u16(0).u32(0);
        b.u16(0).u32(0);
        let exif = ExifContainer::decode(&b.finish()).unwrap().unwrap();
        let warnings = exif.validate(&TagDictionary::new());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Orientation"));
    }

    #[test]
    fn test_to_segment() {
        let payload = sample(ByteAlign::Intel);
        let exif = ExifContainer::decode(&payload).unwrap().unwrap();
        let segment = exif.to_segment().unwrap();
        assert_eq!(segment.marker(), Marker::APP1);
        assert_eq!(segment.payload(), &payload[..]);
    }
}
