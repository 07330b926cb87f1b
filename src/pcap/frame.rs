use nom::error::ParseError;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

/// Size of a record header
pub const PCAP_RECORD_HEADER_LEN: usize = 16;

/// Header of a legacy pcap record
///
/// The captured bytes (`caplen` of them) follow immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcapRecordHeader {
    /// The date and time when this packet was captured (seconds since epoch)
    pub ts_sec: u32,
    /// Microseconds (or nanoseconds, depending on the file magic) part of the timestamp
    pub ts_frac: u32,
    /// The number of bytes of packet data actually captured and saved in the file
    pub caplen: u32,
    /// The length of the packet as it appeared on the network when it was captured
    pub origlen: u32,
}

impl PcapRecordHeader {
    /// Timestamp in milliseconds since the Unix epoch
    ///
    /// `thiszone` is the GMT offset of the global header, in seconds.
    pub fn timestamp_millis(&self, thiszone: i32, nanosecond: bool) -> i64 {
        let frac_divisor = if nanosecond { 1_000_000 } else { 1_000 };
        (i64::from(self.ts_sec) + i64::from(thiszone)) * 1000
            + i64::from(self.ts_frac) / frac_divisor
    }

    /// Size of the record, header included
    #[inline]
    pub fn record_len(&self) -> u64 {
        PCAP_RECORD_HEADER_LEN as u64 + u64::from(self.caplen)
    }
}

pub(crate) fn parse_pcap_record_header<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], PcapRecordHeader, E> {
    let (i, ts_sec) = En::parse_u32(i)?;
    let (i, ts_frac) = En::parse_u32(i)?;
    let (i, caplen) = En::parse_u32(i)?;
    let (i, origlen) = En::parse_u32(i)?;
    let header = PcapRecordHeader {
        ts_sec,
        ts_frac,
        caplen,
        origlen,
    };
    Ok((i, header))
}

/// Read a PCAP record header (little-endian)
pub fn parse_pcap_record_header_le(i: &[u8]) -> IResult<&[u8], PcapRecordHeader, PcapError> {
    parse_pcap_record_header::<PcapLE, PcapError>(i)
}

/// Read a PCAP record header (big-endian)
pub fn parse_pcap_record_header_be(i: &[u8]) -> IResult<&[u8], PcapRecordHeader, PcapError> {
    parse_pcap_record_header::<PcapBE, PcapError>(i)
}
