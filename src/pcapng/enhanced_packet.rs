use nom::error::ParseError;
use nom::IResult;
use rusticata_macros::align32;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::{ImportError, PcapError};

use super::{build_ts, BLOCK_HEADER_LEN};

/// Size of the packet sub-header of Enhanced and obsolete Packet Blocks
pub const PACKET_HEADER_LEN: usize = 20;
/// Offset of the packet data in the block
pub const PACKET_DATA_OFFSET: usize = BLOCK_HEADER_LEN + PACKET_HEADER_LEN;
/// Minimum length of an Enhanced Packet Block (no data, no options)
pub const EPB_MIN_LEN: usize = PACKET_DATA_OFFSET + 4;

/// The fixed part of an Enhanced Packet Block (EPB) or of an obsolete Packet Block (PB)
///
/// Both share the same layout, except that the Packet Block stores the interface id on 2
/// bytes followed by a 2-byte drop count.
///
/// The captured data follows, padded to 32 bits, then options and the trailing block
/// length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketBlockHeader {
    pub if_id: u32,
    /// Drop count (obsolete Packet Block only)
    pub drops: Option<u16>,
    pub ts_high: u32,
    pub ts_low: u32,
    /// Captured packet length
    pub caplen: u32,
    /// Original packet length
    pub origlen: u32,
}

impl PacketBlockHeader {
    /// Raw timestamp, in units of the interface resolution
    #[inline]
    pub fn timestamp(&self) -> u64 {
        build_ts(self.ts_high, self.ts_low)
    }

    /// Captured length rounded up to 32 bits
    #[inline]
    pub fn padded_caplen(&self) -> u64 {
        align32!(u64::from(self.caplen))
    }

    /// Check that the padded captured data fits in a block of `block_len` bytes
    pub fn check_fits(&self, block_len: u32) -> Result<(), ImportError> {
        if EPB_MIN_LEN as u64 + self.padded_caplen() > u64::from(block_len) {
            return Err(ImportError::CapturedLengthOverflow {
                caplen: self.caplen,
                block_len,
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_enhanced_packet_header<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], PacketBlockHeader, E> {
    let (i, if_id) = En::parse_u32(i)?;
    parse_packet_header_tail::<En, E>(i, if_id, None)
}

pub(crate) fn parse_packet_header<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], PacketBlockHeader, E> {
    let (i, if_id) = En::parse_u16(i)?;
    let (i, drops) = En::parse_u16(i)?;
    parse_packet_header_tail::<En, E>(i, u32::from(if_id), Some(drops))
}

fn parse_packet_header_tail<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
    if_id: u32,
    drops: Option<u16>,
) -> IResult<&'a [u8], PacketBlockHeader, E> {
    let (i, ts_high) = En::parse_u32(i)?;
    let (i, ts_low) = En::parse_u32(i)?;
    let (i, caplen) = En::parse_u32(i)?;
    let (i, origlen) = En::parse_u32(i)?;
    let header = PacketBlockHeader {
        if_id,
        drops,
        ts_high,
        ts_low,
        caplen,
        origlen,
    };
    Ok((i, header))
}

/// Parse the sub-header of an Enhanced Packet Block (little-endian)
pub fn parse_enhanced_packet_header_le(
    i: &[u8],
) -> IResult<&[u8], PacketBlockHeader, PcapError> {
    parse_enhanced_packet_header::<PcapLE, PcapError>(i)
}

/// Parse the sub-header of an Enhanced Packet Block (big-endian)
pub fn parse_enhanced_packet_header_be(
    i: &[u8],
) -> IResult<&[u8], PacketBlockHeader, PcapError> {
    parse_enhanced_packet_header::<PcapBE, PcapError>(i)
}

/// Parse the sub-header of an obsolete Packet Block (little-endian)
pub fn parse_packet_header_le(i: &[u8]) -> IResult<&[u8], PacketBlockHeader, PcapError> {
    parse_packet_header::<PcapLE, PcapError>(i)
}

/// Parse the sub-header of an obsolete Packet Block (big-endian)
pub fn parse_packet_header_be(i: &[u8]) -> IResult<&[u8], PacketBlockHeader, PcapError> {
    parse_packet_header::<PcapBE, PcapError>(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn epb_header_both_orders() {
        let le = hex!("02 00 00 00 97 C3 04 00 AA 47 CA 64 2E 00 00 00 40 00 00 00");
        let be = hex!("00 00 00 02 00 04 C3 97 64 CA 47 AA 00 00 00 2E 00 00 00 40");
        let (_, h_le) = parse_enhanced_packet_header_le(&le).expect("le");
        let (_, h_be) = parse_enhanced_packet_header_be(&be).expect("be");
        assert_eq!(h_le, h_be);
        assert_eq!(h_le.if_id, 2);
        assert_eq!(h_le.drops, None);
        assert_eq!(h_le.caplen, 46);
        assert_eq!(h_le.origlen, 64);
        assert_eq!(h_le.timestamp(), 1_340_954_905_298_858);
        assert_eq!(h_le.padded_caplen(), 48);
    }

    #[test]
    fn obsolete_packet_header() {
        let le = hex!("01 00 07 00 00 00 00 00 10 00 00 00 05 00 00 00 05 00 00 00");
        let (_, h) = parse_packet_header_le(&le).expect("pb");
        assert_eq!(h.if_id, 1);
        assert_eq!(h.drops, Some(7));
        assert_eq!(h.caplen, 5);
        assert_eq!(h.padded_caplen(), 8);
    }

    #[test]
    fn captured_length_must_fit() {
        let h = PacketBlockHeader {
            if_id: 0,
            drops: None,
            ts_high: 0,
            ts_low: 0,
            caplen: 5,
            origlen: 5,
        };
        assert!(h.check_fits(40).is_ok());
        assert!(matches!(
            h.check_fits(36),
            Err(ImportError::CapturedLengthOverflow {
                caplen: 5,
                block_len: 36
            })
        ));
        let huge = PacketBlockHeader {
            caplen: u32::MAX,
            ..h
        };
        assert!(huge.check_fits(u32::MAX & !3).is_err());
    }
}
