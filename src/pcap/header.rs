use nom::error::ParseError;
use nom::number::streaming::be_u32;
use nom::IResult;

use crate::endianness::{ByteOrder, PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;
use crate::linktype::Linktype;
use crate::sniff::legacy_magic;

/// Size of the global header
pub const PCAP_HEADER_LEN: usize = 24;

/// PCAP global header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcapHeader {
    /// File format and byte ordering, as written in the file (read big-endian).
    /// `0xa1b2c3d4` or `0xa1b23c4d`: fields are big-endian; `0xd4c3b2a1` or `0x4d3cb2a1`:
    /// fields are little-endian.
    pub magic_number: u32,
    /// Version major number (currently 2)
    pub version_major: u16,
    /// Version minor number (currently 4)
    pub version_minor: u16,
    /// The correction time in seconds between GMT (UTC) and the local timezone of the following packet header timestamps
    pub thiszone: i32,
    /// In theory, the accuracy of time stamps in the capture; in practice, all tools set it to 0
    pub sigfigs: u32,
    /// max len of captured packets, in octets
    pub snaplen: u32,
    /// Data link type
    pub network: Linktype,
    pub order: ByteOrder,
    /// Record timestamps carry nanoseconds instead of microseconds
    pub nanosecond: bool,
}

impl PcapHeader {
    pub const fn size(&self) -> usize {
        PCAP_HEADER_LEN
    }

    pub fn is_bigendian(&self) -> bool {
        self.order.is_big_endian()
    }

    pub fn is_nanosecond_precision(&self) -> bool {
        self.nanosecond
    }
}

fn parse_header_fields<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
    magic_number: u32,
    nanosecond: bool,
) -> IResult<&'a [u8], PcapHeader, E> {
    let (i, version_major) = En::parse_u16(i)?;
    let (i, version_minor) = En::parse_u16(i)?;
    let (i, thiszone) = En::parse_i32(i)?;
    let (i, sigfigs) = En::parse_u32(i)?;
    let (i, snaplen) = En::parse_u32(i)?;
    let (i, network) = En::parse_i32(i)?;
    let header = PcapHeader {
        magic_number,
        version_major,
        version_minor,
        thiszone,
        sigfigs,
        snaplen,
        network: Linktype(network),
        order: En::ORDER,
        nanosecond,
    };
    Ok((i, header))
}

/// Read the PCAP global header
///
/// The byte order is derived from the magic number, independently of any earlier format
/// detection.
pub fn parse_pcap_header(i: &[u8]) -> IResult<&[u8], PcapHeader, PcapError> {
    let (rem, magic_number) = be_u32(i)?;
    match legacy_magic(magic_number.to_be_bytes()) {
        Some((ByteOrder::BigEndian, nsec)) => {
            parse_header_fields::<PcapBE, _>(rem, magic_number, nsec)
        }
        Some((ByteOrder::LittleEndian, nsec)) => {
            parse_header_fields::<PcapLE, _>(rem, magic_number, nsec)
        }
        None => Err(nom::Err::Error(PcapError::HeaderNotRecognized)),
    }
}
