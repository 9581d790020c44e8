use super::lowlevel::*;
use super::types::*;

/// Decode one directory: entry count, 12-byte entries, next-directory offset.
///
/// `offset` and every data offset found in the entries are relative to the start of
/// `contents`, which must be the TIFF area (the EXIF payload minus its signature).
/// Values longer than four bytes are copied out of `contents`; a value pointing past
/// the end of the buffer fails the whole directory.
pub fn decode_ifd(contents: &[u8], offset: usize, align: ByteAlign) -> Result<Ifd, ExifError> {
    let count = read_u16(contents, offset, align)?;
    let table = offset + 2;
    // The whole table has to be there before any entry is looked at
    read_bytes(contents, table, count as usize * IFD_ENTRY_LEN + 4)?;

    let mut entries = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let pos = table + i * IFD_ENTRY_LEN;
        let tag = read_u16(contents, pos, align)?;
        let code = read_u16(contents, pos + 2, align)?;
        let format = IfdFormat::new(code).ok_or_else(|| {
            ExifError::MalformedExif(format!(
                "tag {:#06x} at {} has unknown format code {}",
                tag, pos, code
            ))
        })?;
        let count = read_u32(contents, pos + 4, align)?;
        let mut ifd_data = [0; DATA_WIDTH];
        ifd_data.copy_from_slice(read_bytes(contents, pos + 8, DATA_WIDTH)?);

        let mut entry = IfdEntry {
            tag,
            format,
            count,
            ifd_data,
            offset: None,
            data: Vec::new(),
            align,
        };
        let length = (count as u64)
            .checked_mul(format.size() as u64)
            .and_then(|l| usize::try_from(l).ok())
            .ok_or_else(|| {
                ExifError::MalformedExif(format!("tag {:#06x} has an absurd count {}", tag, count))
            })?;
        if entry.in_ifd() {
            entry.data = ifd_data[..length].to_vec();
        } else {
            let data_offset = entry.data_as_offset();
            entry.data = read_bytes(contents, data_offset as usize, length)?.to_vec();
            entry.offset = Some(data_offset);
        }

        log::trace!(
            "{:#x}: tag {:#06x} {} x{} {}",
            pos,
            tag,
            format,
            count,
            match entry.offset {
                Some(o) => format!("at {:#x}", o),
                None => "inline".to_string(),
            }
        );
        entries.push(entry);
    }

    let next_ifd_offset = read_u32(contents, table + count as usize * IFD_ENTRY_LEN, align)?;
    Ok(Ifd {
        offset: offset as u32,
        entries,
        next_ifd_offset,
    })
}

/// Serialize a directory as it sits in the TIFF area. Entries whose data lives
/// elsewhere only get their offset written here; placing the data is up to the caller.
pub fn encode_ifd(ifd: &Ifd, align: ByteAlign) -> Vec<u8> {
    let mut out = Vec::with_capacity(ifd.byte_len());
    out.extend(write_u16(ifd.entries.len() as u16, align));
    for entry in &ifd.entries {
        out.extend(write_u16(entry.tag, align));
        out.extend(write_u16(entry.format.code(), align));
        out.extend(write_u32(entry.count, align));
        match entry.offset {
            Some(offset) => out.extend(write_u32(offset, align)),
            None => out.extend_from_slice(&entry.ifd_data),
        }
    }
    out.extend(write_u32(ifd.next_ifd_offset, align));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Big-endian directory at offset 8 with one inline SHORT and one 6-byte ASCII
    /// stored at offset 38, right after the directory.
    fn motorola_area() -> Vec<u8> {
        let mut v = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        v.extend([0x00, 0x02]);
        v.extend([0x01, 0x12, 0x00, 0x03, 0, 0, 0, 1, 0x00, 0x06, 0x00, 0x00]);
        v.extend([0x01, 0x0f, 0x00, 0x02, 0, 0, 0, 6, 0, 0, 0, 38]);
        v.extend([0, 0, 0, 0]);
        v.extend(b"Canon\0");
        v
    }

    #[test]
    fn test_decode_motorola() {
        let area = motorola_area();
        let ifd = decode_ifd(&area, 8, ByteAlign::Motorola).unwrap();
        assert_eq!(ifd.len(), 2);
        assert_eq!(ifd.next_ifd_offset(), 0);
        assert_eq!(ifd.byte_len(), 30);

        let orientation = ifd.get(0x0112).unwrap();
        assert!(orientation.in_ifd());
        assert_eq!(orientation.offset(), None);
        assert_eq!(orientation.value().unwrap(), TagValue::U16(vec![6]));

        let make = ifd.get(0x010f).unwrap();
        assert_eq!(make.offset(), Some(38));
        assert_eq!(make.value().unwrap().as_str(), Some("Canon"));

        assert_eq!(encode_ifd(&ifd, ByteAlign::Motorola), area[8..38].to_vec());
    }

    #[test]
    fn test_decode_intel() {
        let area = [
            b'I', b'I', 0x2a, 0x00, 0x08, 0x00, 0x00, 0x00, //
            0x01, 0x00, // one entry
            0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x01, 0x00, 0x00,
            0x1a, 0x00, 0x00, 0x00, // next directory
        ];
        let ifd = decode_ifd(&area, 8, ByteAlign::Intel).unwrap();
        assert_eq!(ifd.entries()[0].value().unwrap(), TagValue::U16(vec![258]));
        assert_eq!(ifd.next_ifd_offset(), 0x1a);
        assert_eq!(encode_ifd(&ifd, ByteAlign::Intel), area[8..].to_vec());
    }

    #[test]
    fn test_four_bytes_inline_five_external() {
        let mut area = vec![0u8; 8];
        area.extend([0x00, 0x02]);
        area.extend([0x90, 0x00, 0x00, 0x07, 0, 0, 0, 4, b'0', b'2', b'2', b'0']);
        area.extend([0x92, 0x86, 0x00, 0x07, 0, 0, 0, 5, 0, 0, 0, 38]);
        area.extend([0, 0, 0, 0]);
        area.extend([1, 2, 3, 4, 5]);
        let ifd = decode_ifd(&area, 8, ByteAlign::Motorola).unwrap();
        assert_eq!(ifd.entries()[0].offset(), None);
        assert_eq!(ifd.entries()[0].data(), b"0220");
        assert_eq!(ifd.entries()[1].offset(), Some(38));
        assert_eq!(ifd.entries()[1].data(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unknown_format() {
        let mut area = motorola_area();
        area[13] = 13;
        assert!(matches!(
            decode_ifd(&area, 8, ByteAlign::Motorola),
            Err(ExifError::MalformedExif(_))
        ));
    }

    #[test]
    fn test_truncated() {
        let area = motorola_area();
        // Data of the ASCII entry cut short
        assert!(matches!(
            decode_ifd(&area[..40], 8, ByteAlign::Motorola),
            Err(ExifError::TruncatedBuffer { offset: 38, length: 6, .. })
        ));
        // Entry table cut short
        assert!(matches!(
            decode_ifd(&area[..20], 8, ByteAlign::Motorola),
            Err(ExifError::TruncatedBuffer { .. })
        ));
        assert!(decode_ifd(&area, 100, ByteAlign::Motorola).is_err());
    }
}
