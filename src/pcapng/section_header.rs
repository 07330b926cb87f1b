use nom::error::ParseError;
use nom::IResult;

use crate::endianness::{ByteOrder, PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;
use crate::sniff::BOM_MAGIC;

/// Minimum length of a Section Header Block
pub const SHB_MIN_LEN: usize = 28;
/// Bytes of a Section Header Block up to and including the section length
pub const SHB_FIXED_LEN: usize = 24;

/// The Section Header Block (SHB) identifies the beginning of a section of the capture file.
///
/// The Section Header Block does not contain data but it rather identifies a list of blocks
/// (interfaces, packets) that are logically correlated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionHeaderBlock {
    pub order: ByteOrder,
    pub major_version: u16,
    pub minor_version: u16,
    /// Length of the section in bytes, `-1` if unspecified
    pub section_len: i64,
}

/// Byte order of a section from its byte-order magic, as written in the file
pub fn section_byte_order(bom: [u8; 4]) -> Option<ByteOrder> {
    match u32::from_be_bytes(bom) {
        BOM_MAGIC => Some(ByteOrder::BigEndian),
        m if m.swap_bytes() == BOM_MAGIC => Some(ByteOrder::LittleEndian),
        _ => None,
    }
}

/// Parse the fixed part of a Section Header Block, starting at the byte-order magic
///
/// The byte order must already be known from the magic.
pub(crate) fn parse_section_header<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], SectionHeaderBlock, E> {
    let (i, _bom) = En::parse_u32(i)?;
    let (i, major_version) = En::parse_u16(i)?;
    let (i, minor_version) = En::parse_u16(i)?;
    let (i, section_len) = En::parse_i64(i)?;
    let block = SectionHeaderBlock {
        order: En::ORDER,
        major_version,
        minor_version,
        section_len,
    };
    Ok((i, block))
}

/// Parse the fixed part of a Section Header Block (little-endian)
pub fn parse_section_header_le(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError> {
    parse_section_header::<PcapLE, PcapError>(i)
}

/// Parse the fixed part of a Section Header Block (big-endian)
pub fn parse_section_header_be(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError> {
    parse_section_header::<PcapBE, PcapError>(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn section_header_both_orders() {
        let le = hex!("4D 3C 2B 1A 01 00 00 00 FF FF FF FF FF FF FF FF");
        let be = hex!("1A 2B 3C 4D 00 01 00 00 FF FF FF FF FF FF FF FF");
        assert_eq!(
            section_byte_order([le[0], le[1], le[2], le[3]]),
            Some(ByteOrder::LittleEndian)
        );
        assert_eq!(
            section_byte_order([be[0], be[1], be[2], be[3]]),
            Some(ByteOrder::BigEndian)
        );
        assert_eq!(section_byte_order([0, 1, 2, 3]), None);
        let (_, shb_le) = parse_section_header_le(&le).expect("le");
        let (_, shb_be) = parse_section_header_be(&be).expect("be");
        assert_eq!(shb_le.order, ByteOrder::LittleEndian);
        assert_eq!(shb_be.order, ByteOrder::BigEndian);
        for shb in [&shb_le, &shb_be] {
            assert_eq!(shb.major_version, 1);
            assert_eq!(shb.minor_version, 0);
            assert_eq!(shb.section_len, -1);
        }
    }
}
