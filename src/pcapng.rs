//! PCAPNG file format
//!
//! See <https://github.com/pcapng/pcapng> for details.
//!
//! ## File format and parsing
//!
//! A capture file is organized in blocks. Blocks are organized in sections, each section
//! starting with a Section Header Block (SHB), and followed by blocks (interface description,
//! statistics, packets, etc.).
//! A file is usually composed of one section, but can contain multiple sections.
//!
//! Every block has the same framing: block type (4 bytes), total length (4 bytes), body,
//! total length again. The total length is a multiple of 4.
//!
//! ## Endianness
//!
//! The endianness of a block is indicated by the Section Header Block that started the section
//! containing this block. Since a file can contain several sections, a single file can contain
//! both endianness variants.
//!
//! ## Reading
//!
//! [`PcapNgReader`] walks the blocks of a file, keeps the table of declared interfaces and
//! returns captured frames from Enhanced, Simple and (obsolete) Packet Blocks. Blocks
//! without packet data are skipped without being buffered.

mod block;
mod enhanced_packet;
mod interface_description;
mod option;
mod reader;
mod section_header;
mod simple_packet;
mod time;

pub use block::*;
pub use enhanced_packet::*;
pub use interface_description::*;
pub use option::*;
pub use reader::*;
pub use section_header::*;
pub use simple_packet::*;
pub use time::*;
