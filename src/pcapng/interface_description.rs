use nom::error::ParseError;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::{ImportError, PcapError};
use crate::linktype::Linktype;

use super::{
    options_get, parse_options, timestamp_millis, ts_divisor_from_tsresol, OptionCode,
    PcapNgOption, BLOCK_OVERHEAD, DEFAULT_TS_DIVISOR,
};

/// Minimum length of an Interface Description Block (no options)
pub const IDB_MIN_LEN: usize = BLOCK_OVERHEAD + 8;

/// An Interface Description Block (IDB) is the container for information
/// describing an interface on which packet data is captured.
///
/// The body starts after the common block header and excludes the trailing length.
#[derive(Debug)]
pub struct InterfaceDescriptionBlock<'a> {
    pub linktype: Linktype,
    pub reserved: u16,
    pub snaplen: u32,
    pub options: Vec<PcapNgOption<'a>>,
    /// Raw `if_tsresol` value, if present
    pub if_tsresol: Option<u8>,
    /// `if_tsoffset` in seconds, 0 if absent
    pub if_tsoffset: i64,
}

impl<'a> InterfaceDescriptionBlock<'a> {
    /// Decode the interface time resolution, in units per second
    pub fn ts_divisor(&self) -> Result<u64, ImportError> {
        match self.if_tsresol {
            Some(v) => ts_divisor_from_tsresol(v),
            None => Ok(DEFAULT_TS_DIVISOR),
        }
    }

    /// Return the `if_name` option value, if present and valid UTF-8
    pub fn if_name(&self) -> Option<&str> {
        options_get(&self.options, OptionCode::IfName).and_then(|o| o.as_str())
    }
}

pub(crate) fn parse_interface_description<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], InterfaceDescriptionBlock<'a>, E> {
    let (i, linktype) = En::parse_u16(i)?;
    let (i, reserved) = En::parse_u16(i)?;
    let (i, snaplen) = En::parse_u32(i)?;
    let (i, options) = parse_options::<En, E>(i)?;
    let if_tsresol = options_get(&options, OptionCode::IfTsresol)
        .and_then(|o| o.value.first().copied());
    let if_tsoffset = match options_get(&options, OptionCode::IfTsoffset) {
        Some(o) if o.value.len() >= 8 => En::parse_i64::<E>(o.value)?.1,
        _ => 0,
    };
    let block = InterfaceDescriptionBlock {
        linktype: Linktype::from(linktype),
        reserved,
        snaplen,
        options,
        if_tsresol,
        if_tsoffset,
    };
    Ok((i, block))
}

/// Parse the body of an Interface Description Block (little-endian)
pub fn parse_interface_description_le(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock<'_>, PcapError> {
    parse_interface_description::<PcapLE, PcapError>(i)
}

/// Parse the body of an Interface Description Block (big-endian)
pub fn parse_interface_description_be(
    i: &[u8],
) -> IResult<&[u8], InterfaceDescriptionBlock<'_>, PcapError> {
    parse_interface_description::<PcapBE, PcapError>(i)
}

/// A declared capture interface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    /// Sequential number, in declaration order
    pub interface_id: u32,
    pub linktype: Linktype,
    pub snaplen: u32,
    /// Timestamp units per second
    pub ts_divisor: u64,
    /// Seconds added to every timestamp
    pub ts_offset: i64,
    pub name: Option<String>,
}

impl InterfaceDescriptor {
    pub fn new(
        interface_id: u32,
        idb: &InterfaceDescriptionBlock<'_>,
    ) -> Result<InterfaceDescriptor, ImportError> {
        Ok(InterfaceDescriptor {
            interface_id,
            linktype: idb.linktype,
            snaplen: idb.snaplen,
            ts_divisor: idb.ts_divisor()?,
            ts_offset: idb.if_tsoffset,
            name: idb.if_name().map(str::to_owned),
        })
    }

    /// Convert a raw timestamp of this interface to milliseconds since the Unix epoch
    #[inline]
    pub fn timestamp_millis(&self, ts: u64) -> i64 {
        timestamp_millis(ts, self.ts_divisor, self.ts_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn idb_without_options() {
        let body = hex!("01 00 00 00 FF FF 00 00");
        let (rem, idb) = parse_interface_description_le(&body).expect("idb");
        assert!(rem.is_empty());
        assert_eq!(idb.linktype, Linktype::ETHERNET);
        assert_eq!(idb.snaplen, 65535);
        assert_eq!(idb.if_tsresol, None);
        let desc = InterfaceDescriptor::new(0, &idb).expect("descriptor");
        assert_eq!(desc.ts_divisor, 1_000_000);
        assert_eq!(desc.timestamp_millis(1_500_000), 1_500);
    }

    #[test]
    fn idb_with_options_be() {
        // if_tsresol 0x86, if_tsoffset 100, if_name "lo"
        let body = hex!(
            "
00 71 00 00 00 00 FF FF
00 09 00 01 86 00 00 00
00 0E 00 08 00 00 00 00 00 00 00 64
00 02 00 02 6C 6F 00 00
00 00 00 00"
        );
        let (_, idb) = parse_interface_description_be(&body).expect("idb");
        assert_eq!(idb.linktype, Linktype::LINUX_SLL);
        assert_eq!(idb.if_tsresol, Some(0x86));
        assert_eq!(idb.if_tsoffset, 100);
        assert_eq!(idb.if_name(), Some("lo"));
        let desc = InterfaceDescriptor::new(3, &idb).expect("descriptor");
        assert_eq!(desc.interface_id, 3);
        assert_eq!(desc.ts_divisor, 64);
        assert_eq!(desc.name.as_deref(), Some("lo"));
        // 128 units of 1/64 s, plus 100 s
        assert_eq!(desc.timestamp_millis(128), 102_000);
    }

    #[test]
    fn idb_invalid_tsresol() {
        let body = hex!("01 00 00 00 FF FF 00 00 09 00 01 00 7F 00 00 00");
        let (_, idb) = parse_interface_description_le(&body).expect("idb");
        assert!(matches!(
            InterfaceDescriptor::new(0, &idb),
            Err(ImportError::InvalidTsresol(0x7f))
        ));
    }
}
