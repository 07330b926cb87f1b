//! Capture format detection
//!
//! Only the first 12 bytes are inspected: the legacy pcap magic sits in bytes 0..4, the
//! pcap-ng byte-order magic of the first Section Header Block in bytes 8..12.
//! Sniffing never commits the caller to a read position; readers re-derive the byte order
//! from the headers themselves.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::endianness::ByteOrder;
use crate::pcapng::section_byte_order;

/// Number of bytes needed to recognize a capture file
pub const SNIFF_LEN: usize = 12;

/// Legacy pcap magic, microsecond timestamps
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
/// Legacy pcap magic, nanosecond timestamps
pub const PCAP_MAGIC_NSEC: u32 = 0xa1b2_3c4d;
/// Pcap-ng byte-order magic
pub const BOM_MAGIC: u32 = 0x1a2b_3c4d;

/// Family of a capture file
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FormatKind {
    LegacyPcap,
    PcapNg,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatKind::LegacyPcap => f.write_str("Pcap"),
            FormatKind::PcapNg => f.write_str("PcapNg"),
        }
    }
}

/// Result of format detection
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaptureFormat {
    LegacyPcap {
        order: ByteOrder,
        nanosecond: bool,
    },
    PcapNg {
        order: ByteOrder,
    },
}

impl CaptureFormat {
    pub fn kind(&self) -> FormatKind {
        match self {
            CaptureFormat::LegacyPcap { .. } => FormatKind::LegacyPcap,
            CaptureFormat::PcapNg { .. } => FormatKind::PcapNg,
        }
    }

    pub fn order(&self) -> ByteOrder {
        match *self {
            CaptureFormat::LegacyPcap { order, .. } | CaptureFormat::PcapNg { order } => order,
        }
    }
}

/// Byte order and precision from the 4 magic bytes of a legacy pcap header
pub(crate) fn legacy_magic(magic: [u8; 4]) -> Option<(ByteOrder, bool)> {
    // magic is compared as written in the file
    match u32::from_be_bytes(magic) {
        PCAP_MAGIC => Some((ByteOrder::BigEndian, false)),
        PCAP_MAGIC_NSEC => Some((ByteOrder::BigEndian, true)),
        m if m.swap_bytes() == PCAP_MAGIC => Some((ByteOrder::LittleEndian, false)),
        m if m.swap_bytes() == PCAP_MAGIC_NSEC => Some((ByteOrder::LittleEndian, true)),
        _ => None,
    }
}

/// Detect the capture format from the first bytes of a file
///
/// Returns `None` if fewer than [`SNIFF_LEN`] bytes are given, or if neither signature
/// matches.
pub fn sniff(i: &[u8]) -> Option<CaptureFormat> {
    if i.len() < SNIFF_LEN {
        return None;
    }
    if let Some((order, nanosecond)) = legacy_magic([i[0], i[1], i[2], i[3]]) {
        return Some(CaptureFormat::LegacyPcap { order, nanosecond });
    }
    section_byte_order([i[8], i[9], i[10], i[11]]).map(|order| CaptureFormat::PcapNg { order })
}

/// Detect the capture format of a seekable source
///
/// The position of `reader` is restored before returning, so the real parse can start
/// where the caller expects it.
pub fn sniff_reader<R: Read + Seek>(reader: &mut R) -> io::Result<Option<CaptureFormat>> {
    let start = reader.stream_position()?;
    let mut buf = [0u8; SNIFF_LEN];
    let mut len = 0;
    while len < SNIFF_LEN {
        match reader.read(&mut buf[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
            Err(e) => {
                reader.seek(SeekFrom::Start(start))?;
                return Err(e);
            }
        }
    }
    reader.seek(SeekFrom::Start(start))?;
    Ok(sniff(&buf[..len]))
}

/// Detect the capture format of a file
///
/// Files shorter than [`SNIFF_LEN`] bytes are not captures (`Ok(None)`).
pub fn sniff_path<P: AsRef<Path>>(path: P) -> io::Result<Option<CaptureFormat>> {
    let mut file = File::open(path)?;
    sniff_reader(&mut file)
}

/// Check that `path` is a capture file of the expected family
///
/// Never fails: missing, short or unreadable files are reported as `false`. If the file
/// carries the signature of the other family and `check_other` is set, an advisory is
/// logged suggesting the other importer.
pub fn validate_file_format<P: AsRef<Path>>(
    path: P,
    expected: FormatKind,
    check_other: bool,
) -> bool {
    let path = path.as_ref();
    match sniff_path(path) {
        Ok(Some(format)) if format.kind() == expected => true,
        Ok(Some(format)) => {
            if check_other {
                warn!(
                    "The file appears to be a {} file, not a {} file ({})",
                    format.kind(),
                    expected,
                    path.display()
                );
            }
            false
        }
        Ok(None) => false,
        Err(e) => {
            debug!("Could not sniff {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::io::Cursor;

    const PCAP_LE: &[u8] = &hex!("D4 C3 B2 A1 02 00 04 00 00 00 00 00");
    const PCAP_BE: &[u8] = &hex!("A1 B2 C3 D4 00 02 00 04 00 00 00 00");
    const PCAP_NSEC_LE: &[u8] = &hex!("4D 3C B2 A1 02 00 04 00 00 00 00 00");
    const PCAPNG_LE: &[u8] = &hex!("0A 0D 0D 0A 1C 00 00 00 4D 3C 2B 1A");
    const PCAPNG_BE: &[u8] = &hex!("0A 0D 0D 0A 00 00 00 1C 1A 2B 3C 4D");

    #[test]
    fn sniff_legacy() {
        assert_eq!(
            sniff(PCAP_LE),
            Some(CaptureFormat::LegacyPcap {
                order: ByteOrder::LittleEndian,
                nanosecond: false
            })
        );
        assert_eq!(
            sniff(PCAP_BE),
            Some(CaptureFormat::LegacyPcap {
                order: ByteOrder::BigEndian,
                nanosecond: false
            })
        );
        assert_eq!(
            sniff(PCAP_NSEC_LE),
            Some(CaptureFormat::LegacyPcap {
                order: ByteOrder::LittleEndian,
                nanosecond: true
            })
        );
    }

    #[test]
    fn sniff_pcapng() {
        assert_eq!(
            sniff(PCAPNG_LE),
            Some(CaptureFormat::PcapNg {
                order: ByteOrder::LittleEndian
            })
        );
        assert_eq!(
            sniff(PCAPNG_BE).map(|f| f.order()),
            Some(ByteOrder::BigEndian)
        );
    }

    #[test]
    fn sniff_short_or_garbage() {
        assert_eq!(sniff(&PCAP_LE[..11]), None);
        assert_eq!(sniff(&[]), None);
        assert_eq!(sniff(&[0x42; 12]), None);
    }

    #[test]
    fn sniff_reader_restores_position() {
        let mut data = vec![0xffu8; 3];
        data.extend_from_slice(PCAPNG_LE);
        let mut cursor = Cursor::new(data);
        cursor.set_position(3);
        let format = sniff_reader(&mut cursor).expect("sniff");
        assert_eq!(format.map(|f| f.kind()), Some(FormatKind::PcapNg));
        assert_eq!(cursor.position(), 3);
    }
}
