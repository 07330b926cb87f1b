use nom::error::ParseError;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

use super::BLOCK_HEADER_LEN;

/// Offset of the packet data in a Simple Packet Block
pub const SPB_DATA_OFFSET: usize = BLOCK_HEADER_LEN + 4;
/// Minimum length of a Simple Packet Block
pub const SPB_MIN_LEN: usize = SPB_DATA_OFFSET + 4;

/// The Simple Packet Block (SPB) is a lightweight container for storing
/// the packets coming from the network.
///
/// It has no interface id (interface 0 of the section is implied) and no timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimplePacketHeader {
    /// Original packet length
    pub origlen: u32,
}

impl SimplePacketHeader {
    /// Number of captured bytes in a block of `block_len` bytes
    ///
    /// The data area may be padded, or the packet truncated to the snap length: the
    /// captured length is the smaller of the data area and the original length.
    pub fn caplen(&self, block_len: u32) -> u32 {
        let area = block_len.saturating_sub(SPB_MIN_LEN as u32);
        area.min(self.origlen)
    }
}

pub(crate) fn parse_simple_packet_header<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], SimplePacketHeader, E> {
    let (i, origlen) = En::parse_u32(i)?;
    Ok((i, SimplePacketHeader { origlen }))
}

/// Parse the original length of a Simple Packet Block (little-endian)
pub fn parse_simple_packet_header_le(
    i: &[u8],
) -> IResult<&[u8], SimplePacketHeader, PcapError> {
    parse_simple_packet_header::<PcapLE, PcapError>(i)
}

/// Parse the original length of a Simple Packet Block (big-endian)
pub fn parse_simple_packet_header_be(
    i: &[u8],
) -> IResult<&[u8], SimplePacketHeader, PcapError> {
    parse_simple_packet_header::<PcapBE, PcapError>(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caplen_is_trimmed() {
        let (_, h) = parse_simple_packet_header_be(&[0, 0, 0, 5]).expect("spb");
        assert_eq!(h.origlen, 5);
        // 8 bytes of data area, 3 of which are padding
        assert_eq!(h.caplen(24), 5);
        // snapped packet: the data area is shorter than the original
        let (_, h) = parse_simple_packet_header_le(&[100, 0, 0, 0]).expect("spb");
        assert_eq!(h.caplen(24), 8);
        assert_eq!(h.caplen(8), 0);
    }
}
