//! Legacy PCAP file format
//!
//! See <https://wiki.wireshark.org/Development/LibpcapFileFormat> for details.
//!
//! A file is a 24-byte global header followed by records, each made of a 16-byte header
//! and the captured bytes. The byte order of every field is given by the magic number of
//! the global header; all frames share the link type of the header.
//!
//! The binary structures are parsed with [`parse_pcap_header`] and
//! [`parse_pcap_record_header_le`] / [`parse_pcap_record_header_be`]. For streaming over
//! a file, use [`LegacyPcapReader`].

mod frame;
mod header;
mod reader;

pub use frame::*;
pub use header::*;
pub use reader::*;
