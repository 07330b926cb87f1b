use nom::error::ParseError;
use nom::IResult;
use rusticata_macros::newtype_enum;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

/// Section Header Block magic
pub const SHB_MAGIC: u32 = 0x0A0D_0D0A;
/// Interface Description Block magic
pub const IDB_MAGIC: u32 = 0x0000_0001;
/// Packet Block magic (obsolete)
pub const PB_MAGIC: u32 = 0x0000_0002;
/// Simple Packet Block magic
pub const SPB_MAGIC: u32 = 0x0000_0003;
/// Name Resolution Block magic
pub const NRB_MAGIC: u32 = 0x0000_0004;
/// Interface Statistic Block magic
pub const ISB_MAGIC: u32 = 0x0000_0005;
/// Enhanced Packet Block magic
pub const EPB_MAGIC: u32 = 0x0000_0006;
/// IRIG Timestamp Block magic
pub const IRIG_MAGIC: u32 = 0x0000_0007;
/// ARINC 429 in AFDX Encapsulation Information Block magic
pub const ARINC_MAGIC: u32 = 0x0000_0008;
/// Custom Block magic
pub const CB_MAGIC: u32 = 0x0000_0BAD;
/// Do-not-copy Custom Block magic
pub const DCB_MAGIC: u32 = 0x4000_0BAD;

/// Size of the common block header (type and total length)
pub const BLOCK_HEADER_LEN: usize = 8;
/// Header plus trailing total length
pub const BLOCK_OVERHEAD: usize = 12;

/// Type of a pcap-ng block
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct BlockType(pub u32);

newtype_enum! {
impl debug BlockType {
    SectionHeader = 0x0A0D_0D0A,
    InterfaceDescription = 1,
    Packet = 2,
    SimplePacket = 3,
    NameResolution = 4,
    InterfaceStatistics = 5,
    EnhancedPacket = 6,
    IrigTimestamp = 7,
    Arinc429 = 8,
    Custom = 0x0000_0BAD,
    CustomNoCopy = 0x4000_0BAD,
}
}

impl BlockType {
    /// Block types with the high bit set are reserved for local use
    #[inline]
    pub fn is_local(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Blocks carrying a captured frame
    #[inline]
    pub fn is_packet(self) -> bool {
        matches!(
            self,
            BlockType::Packet | BlockType::SimplePacket | BlockType::EnhancedPacket
        )
    }
}

/// Common header of every block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_type: BlockType,
    /// Total length of the block, header and trailer included
    pub block_len: u32,
}

impl BlockHeader {
    /// The length is a multiple of 4 and covers at least the header and trailer
    pub fn has_valid_length(&self) -> bool {
        self.block_len % 4 == 0 && self.block_len as usize >= BLOCK_OVERHEAD
    }
}

pub(crate) fn parse_block_header<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], BlockHeader, E> {
    let (i, block_type) = En::parse_u32(i)?;
    let (i, block_len) = En::parse_u32(i)?;
    let header = BlockHeader {
        block_type: BlockType(block_type),
        block_len,
    };
    Ok((i, header))
}

/// Parse a block header (little-endian)
pub fn parse_block_header_le(i: &[u8]) -> IResult<&[u8], BlockHeader, PcapError> {
    parse_block_header::<PcapLE, PcapError>(i)
}

/// Parse a block header (big-endian)
pub fn parse_block_header_be(i: &[u8]) -> IResult<&[u8], BlockHeader, PcapError> {
    parse_block_header::<PcapBE, PcapError>(i)
}
