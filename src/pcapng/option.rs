use nom::bytes::streaming::take;
use nom::combinator::complete;
use nom::error::ParseError;
use nom::IResult;
use rusticata_macros::{align32, newtype_enum};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct OptionCode(pub u16);

newtype_enum! {
impl debug OptionCode {
    EndOfOpt = 0,
    Comment = 1,
    IfName = 2,
    IfDescription = 3,
    IfSpeed = 8,
    IfTsresol = 9,
    IfTzone = 10,
    IfTsoffset = 14,
}
}

/// An option of a pcap-ng block
///
/// Option codes are scoped to the block type: code 2 is `if_name` in an Interface
/// Description Block but `shb_hardware` in a Section Header Block.
#[derive(Debug)]
pub struct PcapNgOption<'a> {
    pub code: OptionCode,
    pub len: u16,
    /// Raw value, padding excluded
    pub value: &'a [u8],
}

impl<'a> PcapNgOption<'a> {
    #[inline]
    pub fn value(&self) -> &[u8] {
        self.value
    }

    /// Return the option value as UTF-8 text, without trailing NUL bytes
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value)
            .ok()
            .map(|s| s.trim_end_matches('\0'))
    }
}

pub(crate) fn parse_option<'i, En: PcapEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
) -> IResult<&'i [u8], PcapNgOption<'i>, E> {
    let (i, code) = En::parse_u16(i)?;
    let (i, len) = En::parse_u16(i)?;
    let (i, value) = take(len as usize)(i)?;
    // the padding of the last option may be cut by the end of the block
    let padding = (align32!(len as usize) - len as usize).min(i.len());
    let option = PcapNgOption {
        code: OptionCode(code),
        len,
        value,
    };
    Ok((&i[padding..], option))
}

/// Parse a list of options
///
/// Stops at the end-of-options marker, or when the input is exhausted. A truncated last
/// option is ignored.
pub(crate) fn parse_options<'i, En: PcapEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
) -> IResult<&'i [u8], Vec<PcapNgOption<'i>>, E> {
    let mut options = Vec::new();
    let mut rem = i;
    while !rem.is_empty() {
        let (i, option) = match complete(parse_option::<En, E>)(rem) {
            Ok(r) => r,
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        };
        rem = i;
        if option.code == OptionCode::EndOfOpt {
            break;
        }
        options.push(option);
    }
    Ok((rem, options))
}

/// Parse a list of options (little-endian)
pub fn parse_options_le(i: &[u8]) -> IResult<&[u8], Vec<PcapNgOption<'_>>, PcapError> {
    parse_options::<PcapLE, PcapError>(i)
}

/// Parse a list of options (big-endian)
pub fn parse_options_be(i: &[u8]) -> IResult<&[u8], Vec<PcapNgOption<'_>>, PcapError> {
    parse_options::<PcapBE, PcapError>(i)
}

/// First option with the given code
pub fn options_get<'a, 'o>(
    options: &'o [PcapNgOption<'a>],
    code: OptionCode,
) -> Option<&'o PcapNgOption<'a>> {
    options.iter().find(|opt| opt.code == code)
}
