use super::lowlevel::*;
use super::types::*;
use std::fmt;
use std::fmt::Display;

pub(crate) struct NumArray<'a, T>(&'a [T]);

impl<'a, T> NumArray<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        NumArray(items)
    }
}

impl<T: Display> Display for NumArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, number) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", number)?;
        }
        Ok(())
    }
}

impl IfdFormat {
    /// Convert an IFD format code to the IfdFormat enumeration
    pub fn new(code: u16) -> Option<IfdFormat> {
        Some(match code {
            1 => IfdFormat::U8,
            2 => IfdFormat::Ascii,
            3 => IfdFormat::U16,
            4 => IfdFormat::U32,
            5 => IfdFormat::URational,
            6 => IfdFormat::I8,
            7 => IfdFormat::Undefined,
            8 => IfdFormat::I16,
            9 => IfdFormat::I32,
            10 => IfdFormat::IRational,
            11 => IfdFormat::F32,
            12 => IfdFormat::F64,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns the size of an individual element (e.g. U8=1, U16=2...)
    pub fn size(self) -> usize {
        match self {
            IfdFormat::U8 | IfdFormat::Ascii | IfdFormat::I8 | IfdFormat::Undefined => 1,
            IfdFormat::U16 | IfdFormat::I16 => 2,
            IfdFormat::U32 | IfdFormat::I32 | IfdFormat::F32 => 4,
            IfdFormat::URational | IfdFormat::IRational | IfdFormat::F64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IfdFormat::I8 | IfdFormat::I16 | IfdFormat::I32)
    }

    pub fn description(self) -> &'static str {
        match self {
            IfdFormat::U8 => "Unsigned Byte",
            IfdFormat::Ascii => "ASCII String",
            IfdFormat::U16 => "Unsigned Short",
            IfdFormat::U32 => "Unsigned Long",
            IfdFormat::URational => "Unsigned Rational",
            IfdFormat::I8 => "Signed Byte",
            IfdFormat::Undefined => "Undefined",
            IfdFormat::I16 => "Signed Short",
            IfdFormat::I32 => "Signed Long",
            IfdFormat::IRational => "Signed Rational",
            IfdFormat::F32 => "Single Float",
            IfdFormat::F64 => "Double Float",
        }
    }
}

impl fmt::Display for IfdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Convert a IfdEntry into a TagValue
pub fn tag_value_new(f: &IfdEntry) -> Result<TagValue, ExifError> {
    let width = f.format.size();
    Ok(match f.format {
        IfdFormat::Ascii => {
            let end = f.data.iter().position(|&b| b == 0).unwrap_or(f.data.len());
            TagValue::Ascii(String::from_utf8_lossy(&f.data[..end]).into_owned())
        }
        IfdFormat::U8 => TagValue::U8(read_bytes(&f.data, 0, f.count as usize)?.to_vec()),
        IfdFormat::U16 => TagValue::U16(
            read_uint_array(f.count, width, &f.data, f.align)?
                .into_iter()
                .map(|v| v as u16)
                .collect(),
        ),
        IfdFormat::U32 => TagValue::U32(
            read_uint_array(f.count, width, &f.data, f.align)?
                .into_iter()
                .map(|v| v as u32)
                .collect(),
        ),
        IfdFormat::I8 => TagValue::I8(
            read_int_array(f.count, width, &f.data, f.align)?
                .into_iter()
                .map(|v| v as i8)
                .collect(),
        ),
        IfdFormat::I16 => TagValue::I16(
            read_int_array(f.count, width, &f.data, f.align)?
                .into_iter()
                .map(|v| v as i16)
                .collect(),
        ),
        IfdFormat::I32 => TagValue::I32(
            read_int_array(f.count, width, &f.data, f.align)?
                .into_iter()
                .map(|v| v as i32)
                .collect(),
        ),
        IfdFormat::Undefined => TagValue::Undefined(f.data.clone()),
        IfdFormat::URational | IfdFormat::IRational | IfdFormat::F32 | IfdFormat::F64 => {
            TagValue::Raw(f.format, f.data.clone())
        }
    })
}

impl TagValue {
    /// Get value as an integer
    /// Out of bounds indexes and non-integer types return `None`
    pub fn to_i64(&self, index: usize) -> Option<i64> {
        match *self {
            TagValue::U8(ref v) => v.get(index).cloned().map(From::from),
            TagValue::U16(ref v) => v.get(index).cloned().map(From::from),
            TagValue::U32(ref v) => v.get(index).cloned().map(From::from),
            TagValue::I8(ref v) => v.get(index).cloned().map(From::from),
            TagValue::I16(ref v) => v.get(index).cloned().map(From::from),
            TagValue::I32(ref v) => v.get(index).cloned().map(From::from),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            TagValue::Ascii(ref s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TagValue::Ascii(ref s) => f.write_str(s),
            TagValue::U8(ref a) => write!(f, "{}", NumArray::new(&a[..])),
            TagValue::U16(ref a) => write!(f, "{}", NumArray::new(&a[..])),
            TagValue::U32(ref a) => write!(f, "{}", NumArray::new(&a[..])),
            TagValue::I8(ref a) => write!(f, "{}", NumArray::new(&a[..])),
            TagValue::I16(ref a) => write!(f, "{}", NumArray::new(&a[..])),
            TagValue::I32(ref a) => write!(f, "{}", NumArray::new(&a[..])),
            TagValue::Undefined(ref a) => write!(f, "{}", NumArray::new(&a[..])),
            TagValue::Raw(format, ref a) => write!(f, "<{} bytes of {}>", a.len(), format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(format: IfdFormat, count: u32, data: &[u8], align: ByteAlign) -> IfdEntry {
        IfdEntry {
            tag: 0x0100,
            format,
            count,
            ifd_data: [0; DATA_WIDTH],
            offset: None,
            data: data.to_vec(),
            align,
        }
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(IfdFormat::new(0), None);
        assert_eq!(IfdFormat::new(13), None);
        for code in 1..=12 {
            assert_eq!(IfdFormat::new(code).map(IfdFormat::code), Some(code));
        }
        assert_eq!(IfdFormat::URational.size(), 8);
        assert!(IfdFormat::I16.is_signed());
        assert!(!IfdFormat::U16.is_signed());
    }

    #[test]
    fn test_ascii_stops_at_nul() {
        let e = entry(IfdFormat::Ascii, 8, b"Canon\0\0x", ByteAlign::Intel);
        assert_eq!(tag_value_new(&e).unwrap(), TagValue::Ascii("Canon".to_string()));
        let e = entry(IfdFormat::Ascii, 3, b"abc", ByteAlign::Intel);
        assert_eq!(tag_value_new(&e).unwrap().as_str(), Some("abc"));
    }

    #[test]
    fn test_unsigned_values() {
        let e = entry(IfdFormat::U16, 2, &[0x00, 0x01, 0xff, 0xff], ByteAlign::Motorola);
        assert_eq!(tag_value_new(&e).unwrap(), TagValue::U16(vec![1, 0xffff]));
        let e = entry(IfdFormat::U32, 1, &[0x08, 0, 0, 0], ByteAlign::Intel);
        assert_eq!(tag_value_new(&e).unwrap().to_i64(0), Some(8));
    }

    #[test]
    fn test_signed_values_are_sign_extended() {
        let e = entry(IfdFormat::I16, 2, &[0xff, 0xfe, 0x00, 0x05], ByteAlign::Motorola);
        assert_eq!(tag_value_new(&e).unwrap(), TagValue::I16(vec![-2, 5]));
        let e = entry(IfdFormat::I8, 2, &[0x80, 0x7f], ByteAlign::Intel);
        assert_eq!(tag_value_new(&e).unwrap(), TagValue::I8(vec![-128, 127]));
        let e = entry(IfdFormat::I32, 1, &[0xff, 0xff, 0xff, 0xff], ByteAlign::Intel);
        assert_eq!(tag_value_new(&e).unwrap().to_i64(0), Some(-1));
    }

    #[test]
    fn test_rationals_pass_through() {
        let data = [0, 0, 0, 72, 0, 0, 0, 1];
        let e = entry(IfdFormat::URational, 1, &data, ByteAlign::Motorola);
        assert_eq!(
            tag_value_new(&e).unwrap(),
            TagValue::Raw(IfdFormat::URational, data.to_vec())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(TagValue::U16(vec![1, 2, 3]).to_string(), "1, 2, 3");
        assert_eq!(TagValue::Ascii("x".into()).to_string(), "x");
        assert_eq!(
            TagValue::Raw(IfdFormat::F64, vec![0; 8]).to_string(),
            "<8 bytes of Double Float>"
        );
    }
}
