use crate::endianness::ByteOrder;
use crate::error::ImportError;
use crate::handler::RawFrame;
use crate::linktype::Linktype;
use crate::sniff::FormatKind;

/// Something a capture reader found in the file
///
/// Sizes are in bytes of input and are used for progress accounting: summing `consumed`
/// and `block_len` over all events of a complete file gives the file size.
#[derive(Debug)]
pub enum ReaderEvent<'a> {
    /// A new pcap-ng section started
    Section {
        /// Number of the section, starting at 1
        section: u32,
        order: ByteOrder,
        /// Interface numbering restarts at 0 in this section
        reset_interfaces: bool,
        consumed: u64,
    },
    /// A capture interface was declared (the legacy pcap header declares interface 0)
    Interface {
        interface_id: u32,
        linktype: Linktype,
        consumed: u64,
    },
    /// A captured frame
    Frame {
        interface_id: u32,
        frame: RawFrame<'a>,
        /// Size of the record or block carrying the frame, headers and padding included
        block_len: u64,
    },
    /// A block without packet data, skipped
    Skipped { block_type: u32, consumed: u64 },
}

/// Pull-style reader over a capture file
///
/// Each call to [`next_event`](FrameReader::next_event) decodes exactly one record or
/// block. The frame data of a returned event borrows the reader's buffer, so the event
/// must be dropped before the next call.
///
/// `Ok(None)` means the end of the input was reached at a record or block boundary. After
/// an error, the reader is failed and only returns `Ok(None)`.
pub trait FrameReader {
    /// The capture format this reader decodes
    fn kind(&self) -> FormatKind;

    fn next_event(&mut self) -> Result<Option<ReaderEvent<'_>>, ImportError>;

    /// Absolute offset of the next unread byte
    fn position(&self) -> u64;

    /// Number of frames returned so far
    fn frames_read(&self) -> u64;
}
