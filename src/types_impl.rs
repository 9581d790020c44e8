use super::ifdformat::tag_value_new;
use super::lowlevel::*;
use super::types::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

impl ExifData {
    /// Write the image back, with the EXIF block re-encoded from `exif`.
    ///
    /// Without a decoded block every Exif APP1 segment is copied as it was read.
    pub fn serialize(&self) -> Result<Vec<u8>, ExifError> {
        self.image.encode(self.exif_segment.zip(self.exif.as_ref()))
    }

    pub fn write_file<P: AsRef<Path>>(&self, fname: P) -> Result<(), ExifError> {
        let contents = self.serialize()?;
        File::create(fname)?.write_all(&contents)?;
        Ok(())
    }
}

impl IfdEntry {
    pub fn tag(&self) -> u16 {
        self.tag
    }

    pub fn format(&self) -> IfdFormat {
        self.format
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// The value bytes, exactly `length()` of them, in the block's byte order
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Offset of the data when it is stored outside the directory
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    /// The raw 4-byte value field as it appears in the directory
    pub fn ifd_data(&self) -> [u8; DATA_WIDTH] {
        self.ifd_data
    }

    pub fn align(&self) -> ByteAlign {
        self.align
    }

    /// Total length of the whole IFD entry (element count x element size)
    #[inline]
    pub fn length(&self) -> usize {
        self.format.size() * (self.count as usize)
    }

    /// Returns true if data is contained within the IFD structure, false when
    /// data can be found elsewhere in the image (and IFD structure contains the
    /// data offset, instead of data).
    #[inline]
    pub fn in_ifd(&self) -> bool {
        self.length() <= DATA_WIDTH
    }

    /// Casts the value field into an offset. Only meaningful for pointer tags
    /// (ExifOffset and friends) and for entries whose data lives outside the directory.
    pub fn data_as_offset(&self) -> u32 {
        let mut bytes = self.ifd_data;
        reverse_if_little_endian(&mut bytes, self.align);
        u32::from_be_bytes(bytes)
    }

    /// Interpret the raw data according to the entry's format
    pub fn value(&self) -> Result<TagValue, ExifError> {
        tag_value_new(self)
    }

    /// Replace the value of the entry, keeping its place in the block.
    ///
    /// Values of up to four bytes go into the value field. Longer values are written
    /// into the slot the entry already had outside the directory, and only if they fit.
    pub(crate) fn set_value(
        &mut self,
        format: IfdFormat,
        count: u32,
        data: &[u8],
    ) -> Result<(), ExifError> {
        let expected = format.size() * count as usize;
        if data.len() != expected {
            return Err(ExifError::FormatMismatch {
                tag: self.tag,
                expected,
                found: data.len(),
            });
        }

        if expected <= DATA_WIDTH {
            let mut field = [0; DATA_WIDTH];
            field[..expected].copy_from_slice(data);
            self.ifd_data = field;
            self.offset = None;
        } else {
            let available = if self.offset.is_some() { self.length() } else { 0 };
            if expected > available {
                return Err(ExifError::ValueDoesNotFit {
                    tag: self.tag,
                    needed: expected,
                    available,
                });
            }
        }

        self.format = format;
        self.count = count;
        self.data = data.to_vec();
        Ok(())
    }
}

impl Ifd {
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn entries(&self) -> &[IfdEntry] {
        &self.entries
    }

    pub fn next_ifd_offset(&self) -> u32 {
        self.next_ifd_offset
    }

    /// Get entry by tag
    pub fn get(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub(crate) fn get_mut(&mut self, tag: u16) -> Option<&mut IfdEntry> {
        self.entries.iter_mut().find(|e| e.tag == tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the serialized directory: count, entries and next-directory link
    pub fn byte_len(&self) -> usize {
        2 + self.entries.len() * IFD_ENTRY_LEN + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_entry() -> IfdEntry {
        IfdEntry {
            tag: 0x010f,
            format: IfdFormat::Ascii,
            count: 6,
            ifd_data: [0, 0, 0, 0x26],
            offset: Some(0x26),
            data: b"Canon\0".to_vec(),
            align: ByteAlign::Motorola,
        }
    }

    #[test]
    fn test_inline_boundary() {
        let mut e = long_entry();
        e.format = IfdFormat::U16;
        e.count = 2;
        assert_eq!(e.length(), 4);
        assert!(e.in_ifd());
        e.format = IfdFormat::U8;
        e.count = 5;
        assert!(!e.in_ifd());
    }

    #[test]
    fn test_data_as_offset() {
        let mut e = long_entry();
        assert_eq!(e.data_as_offset(), 0x26);
        e.align = ByteAlign::Intel;
        e.ifd_data = [0x26, 0, 0, 0];
        assert_eq!(e.data_as_offset(), 0x26);
    }

    #[test]
    fn test_set_value_in_slot() {
        let mut e = long_entry();
        e.set_value(IfdFormat::Ascii, 5, b"Sony\0").unwrap();
        assert_eq!(e.offset(), Some(0x26));
        assert_eq!(e.data(), b"Sony\0");
        assert_eq!(e.count(), 5);
    }

    #[test]
    fn test_set_value_inline() {
        let mut e = long_entry();
        e.set_value(IfdFormat::Ascii, 3, b"LG\0").unwrap();
        assert_eq!(e.offset(), None);
        assert_eq!(e.ifd_data(), [b'L', b'G', 0, 0]);
    }

    #[test]
    fn test_set_value_too_long() {
        let mut e = long_entry();
        match e.set_value(IfdFormat::Ascii, 8, b"Olympus\0") {
            Err(ExifError::ValueDoesNotFit {
                needed: 8,
                available: 6,
                ..
            }) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(e.data(), b"Canon\0");
    }

    #[test]
    fn test_set_value_wrong_length() {
        let mut e = long_entry();
        assert!(matches!(
            e.set_value(IfdFormat::U16, 2, &[1, 2, 3]),
            Err(ExifError::FormatMismatch { expected: 4, found: 3, .. })
        ));
    }
}
