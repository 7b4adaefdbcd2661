//! Field descriptors, decoded values and the byte codec between them.

use std::fmt;

use crate::{ByteOrder, RegionHandle, SimError};

/// Integer widths accepted for signed and unsigned fields.
pub const INTEGER_WIDTHS: [usize; 4] = [1, 2, 4, 8];

/// How a field's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum FieldKind {
    /// Two's-complement signed integer of 1, 2, 4 or 8 bytes.
    Signed,
    /// Unsigned integer of 1, 2, 4 or 8 bytes.
    Unsigned,
    /// Fixed-length character sequence, terminated early by a zero byte.
    Chars,
    /// Fixed-length raw byte sequence.
    Bytes,
}

impl FieldKind {
    /// Returns `true` when `width` is legal for this kind.
    #[must_use]
    pub fn accepts_width(self, width: usize) -> bool {
        match self {
            Self::Signed | Self::Unsigned => INTEGER_WIDTHS.contains(&width),
            Self::Chars | Self::Bytes => width > 0,
        }
    }

    /// Short lowercase label used in listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Signed => "signed",
            Self::Unsigned => "unsigned",
            Self::Chars => "chars",
            Self::Bytes => "bytes",
        }
    }
}

/// Stable identifier of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    /// Returns the declaration index of this field.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A named, typed sub-range of a region's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Owning region.
    pub region: RegionHandle,
    /// Field name, unique within its region.
    pub name: String,
    /// Byte offset from the region base.
    pub offset: usize,
    /// Byte width.
    pub width: usize,
    /// Decode kind.
    pub kind: FieldKind,
}

impl Field {
    /// Exclusive region-relative end offset.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Returns `true` when the two fields share at least one byte of the same region.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.region == other.region && self.offset < other.end() && other.offset < self.end()
    }
}

/// A field's logical value.
///
/// Equality is logical: integers compare numerically and sequences compare
/// by content, so differing raw bytes that decode alike compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum FieldValue {
    /// Decoded signed integer.
    Signed(i64),
    /// Decoded unsigned integer.
    Unsigned(u64),
    /// Character bytes up to the first zero byte.
    Chars(Vec<u8>),
    /// Raw bytes for the full field width.
    Bytes(Vec<u8>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed(value) => write!(f, "{value}"),
            Self::Unsigned(value) => write!(f, "{value} ({value:#x})"),
            Self::Chars(bytes) => write!(f, "\"{}\"", bytes.escape_ascii()),
            Self::Bytes(bytes) => {
                let hex: Vec<String> = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
                write!(f, "[{}]", hex.join(" "))
            }
        }
    }
}

/// Assembles an unsigned integer from `bytes` in the given order.
#[must_use]
pub fn decode_unsigned(bytes: &[u8], order: ByteOrder) -> u64 {
    let fold = |acc: u64, byte: &u8| (acc << 8) | u64::from(*byte);
    match order {
        ByteOrder::Big => bytes.iter().fold(0, fold),
        ByteOrder::Little => bytes.iter().rev().fold(0, fold),
    }
}

/// Sign-extends the low `width` bytes of `raw`; `width` must be in `1..=8`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub(crate) const fn sign_extend(raw: u64, width: usize) -> i64 {
    let shift = 64 - (width as u32) * 8;
    ((raw << shift) as i64) >> shift
}

/// Serializes the low `width` bytes of `raw`; `width` must be in `1..=8`.
#[must_use]
pub(crate) fn encode_unsigned(raw: u64, width: usize, order: ByteOrder) -> Vec<u8> {
    let little = raw.to_le_bytes();
    let mut bytes = little[..width].to_vec();
    if order == ByteOrder::Big {
        bytes.reverse();
    }
    bytes
}

fn check_width(field: &Field) -> Result<(), SimError> {
    if field.kind.accepts_width(field.width) {
        Ok(())
    } else {
        Err(SimError::InvalidFieldWidth {
            field: field.name.clone(),
            width: field.width,
        })
    }
}

/// Interprets a field's current bytes according to its kind.
///
/// # Errors
///
/// Returns [`SimError::InvalidFieldWidth`] when the field's width is illegal
/// for its kind.
pub fn decode_field(field: &Field, bytes: &[u8], order: ByteOrder) -> Result<FieldValue, SimError> {
    check_width(field)?;
    Ok(match field.kind {
        FieldKind::Signed => FieldValue::Signed(sign_extend(
            decode_unsigned(bytes, order),
            field.width,
        )),
        FieldKind::Unsigned => FieldValue::Unsigned(decode_unsigned(bytes, order)),
        FieldKind::Chars => {
            let len = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
            FieldValue::Chars(bytes[..len].to_vec())
        }
        FieldKind::Bytes => FieldValue::Bytes(bytes.to_vec()),
    })
}

/// Produces exactly `field.width` bytes holding `value`.
///
/// Integer values are range-checked against the field width. Signed and
/// unsigned values are interchangeable when they fit; sequences shorter than
/// the width are zero-padded.
///
/// # Errors
///
/// Returns [`SimError::InvalidFieldWidth`] when the field's width is illegal
/// for its kind, and [`SimError::ValueMismatch`] when `value` is out of range,
/// too long, or of a sequence kind for an integer field (or vice versa).
pub fn encode_field(
    field: &Field,
    value: &FieldValue,
    order: ByteOrder,
) -> Result<Vec<u8>, SimError> {
    check_width(field)?;
    let mismatch = |reason: String| SimError::ValueMismatch {
        field: field.name.clone(),
        reason,
    };
    let bits = u32::try_from(field.width * 8).unwrap_or(u32::MAX);

    match field.kind {
        FieldKind::Signed | FieldKind::Unsigned => {
            let wide = match value {
                FieldValue::Signed(v) => i128::from(*v),
                FieldValue::Unsigned(v) => i128::from(*v),
                FieldValue::Chars(_) | FieldValue::Bytes(_) => {
                    return Err(mismatch(format!(
                        "{} field cannot hold {value}",
                        field.kind.label()
                    )));
                }
            };
            let (min, max) = if field.kind == FieldKind::Signed {
                (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
            } else {
                (0, (1_i128 << bits) - 1)
            };
            if wide < min || wide > max {
                return Err(mismatch(format!(
                    "{wide} outside {} range {min}..={max}",
                    field.kind.label()
                )));
            }
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let raw = wide as u64;
            Ok(encode_unsigned(raw, field.width, order))
        }
        FieldKind::Chars | FieldKind::Bytes => {
            let (FieldValue::Chars(bytes) | FieldValue::Bytes(bytes)) = value else {
                return Err(mismatch(format!(
                    "{} field cannot hold {value}",
                    field.kind.label()
                )));
            };
            if bytes.len() > field.width {
                return Err(mismatch(format!(
                    "{} bytes exceed width {}",
                    bytes.len(),
                    field.width
                )));
            }
            let mut out = bytes.clone();
            out.resize(field.width, 0);
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        decode_field, decode_unsigned, encode_field, sign_extend, Field, FieldKind, FieldValue,
    };
    use crate::{AddressSpace, ByteOrder, SimError};

    fn field(kind: FieldKind, width: usize) -> Field {
        let mut space = AddressSpace::default();
        let region = space.register_region("r", 16).expect("region");
        Field {
            region,
            name: "f".into(),
            offset: 0,
            width,
            kind,
        }
    }

    #[rstest]
    #[case::le_i32(FieldKind::Signed, ByteOrder::Little, &[0x2A, 0, 0, 0], FieldValue::Signed(42))]
    #[case::be_i32(FieldKind::Signed, ByteOrder::Big, &[0, 0, 0, 0x2A], FieldValue::Signed(42))]
    #[case::negative_i16(FieldKind::Signed, ByteOrder::Little, &[0xFE, 0xFF], FieldValue::Signed(-2))]
    #[case::i8_min(FieldKind::Signed, ByteOrder::Big, &[0x80], FieldValue::Signed(-128))]
    #[case::u16_be(FieldKind::Unsigned, ByteOrder::Big, &[0x12, 0x34], FieldValue::Unsigned(0x1234))]
    #[case::u64_le(
        FieldKind::Unsigned,
        ByteOrder::Little,
        &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
        FieldValue::Unsigned(u64::MAX)
    )]
    #[case::chars_stop_at_nul(FieldKind::Chars, ByteOrder::Little, b"bob\0zz", FieldValue::Chars(b"bob".to_vec()))]
    #[case::chars_fill_width(FieldKind::Chars, ByteOrder::Little, b"alice", FieldValue::Chars(b"alice".to_vec()))]
    #[case::bytes_keep_nul(FieldKind::Bytes, ByteOrder::Little, &[0, 1, 0], FieldValue::Bytes(vec![0, 1, 0]))]
    fn decode_interprets_bytes_per_kind(
        #[case] kind: FieldKind,
        #[case] order: ByteOrder,
        #[case] bytes: &[u8],
        #[case] expected: FieldValue,
    ) {
        assert_eq!(decode_field(&field(kind, bytes.len()), bytes, order), Ok(expected));
    }

    #[rstest]
    #[case::signed_zero(FieldKind::Signed, 0)]
    #[case::signed_three(FieldKind::Signed, 3)]
    #[case::signed_nine(FieldKind::Signed, 9)]
    #[case::unsigned_sixteen(FieldKind::Unsigned, 16)]
    #[case::chars_zero(FieldKind::Chars, 0)]
    fn codec_rejects_illegal_widths(#[case] kind: FieldKind, #[case] width: usize) {
        let bad = field(kind, width);
        let bytes = vec![0xFF; width];
        let rejected = || SimError::InvalidFieldWidth {
            field: "f".into(),
            width,
        };
        assert_eq!(decode_field(&bad, &bytes, ByteOrder::Little), Err(rejected()));
        assert_eq!(
            encode_field(&bad, &FieldValue::Signed(1), ByteOrder::Little),
            Err(rejected())
        );
    }

    #[test]
    fn sign_extension_respects_width() {
        assert_eq!(sign_extend(0xFF, 1), -1);
        assert_eq!(sign_extend(0x7F, 1), 127);
        assert_eq!(sign_extend(0xFFFF_FFFF, 4), -1);
        assert_eq!(sign_extend(u64::MAX, 8), -1);
    }

    #[test]
    fn byte_order_is_applied_when_assembling() {
        assert_eq!(decode_unsigned(&[1, 2], ByteOrder::Little), 0x0201);
        assert_eq!(decode_unsigned(&[1, 2], ByteOrder::Big), 0x0102);
    }

    #[test]
    fn encode_range_checks_integers() {
        let age = field(FieldKind::Signed, 1);
        assert_eq!(
            encode_field(&age, &FieldValue::Signed(-128), ByteOrder::Little),
            Ok(vec![0x80])
        );
        assert!(matches!(
            encode_field(&age, &FieldValue::Signed(128), ByteOrder::Little),
            Err(SimError::ValueMismatch { .. })
        ));

        let count = field(FieldKind::Unsigned, 2);
        assert_eq!(
            encode_field(&count, &FieldValue::Signed(0x1234), ByteOrder::Big),
            Ok(vec![0x12, 0x34])
        );
        assert!(encode_field(&count, &FieldValue::Signed(-1), ByteOrder::Big).is_err());
    }

    #[test]
    fn encode_pads_sequences_and_rejects_overlong() {
        let name = field(FieldKind::Chars, 5);
        assert_eq!(
            encode_field(&name, &FieldValue::Chars(b"bob".to_vec()), ByteOrder::Little),
            Ok(b"bob\0\0".to_vec())
        );
        assert!(encode_field(&name, &FieldValue::Chars(b"robert".to_vec()), ByteOrder::Little)
            .is_err());
        assert!(encode_field(&name, &FieldValue::Signed(1), ByteOrder::Little).is_err());
    }

    #[test]
    fn kinds_validate_widths() {
        assert!(FieldKind::Signed.accepts_width(4));
        assert!(!FieldKind::Signed.accepts_width(3));
        assert!(!FieldKind::Unsigned.accepts_width(16));
        assert!(FieldKind::Chars.accepts_width(24));
        assert!(!FieldKind::Bytes.accepts_width(0));
    }

    #[test]
    fn display_renders_each_kind() {
        assert_eq!(FieldValue::Signed(-3).to_string(), "-3");
        assert_eq!(FieldValue::Unsigned(255).to_string(), "255 (0xff)");
        assert_eq!(FieldValue::Chars(b"a\x01".to_vec()).to_string(), "\"a\\x01\"");
        assert_eq!(FieldValue::Bytes(vec![0xAB, 0]).to_string(), "[ab 00]");
    }
}
