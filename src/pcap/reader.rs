use std::io::Read;

use tracing::{debug, trace, warn};

use crate::cursor::ByteCursor;
use crate::endianness::ByteOrder;
use crate::error::ImportError;
use crate::handler::RawFrame;
use crate::linktype::Linktype;
use crate::pcap::{
    parse_pcap_header, parse_pcap_record_header_be, parse_pcap_record_header_le, PcapHeader,
    PcapRecordHeader, PCAP_HEADER_LEN, PCAP_RECORD_HEADER_LEN,
};
use crate::sniff::FormatKind;
use crate::traits::{FrameReader, ReaderEvent};

/// Default limit on the captured length of a single record
pub const DEFAULT_MAX_BLOCK_LEN: usize = 16 * 1024 * 1024;

#[derive(Clone, Copy, Debug)]
enum State {
    GlobalHeader,
    PacketHeader,
    PacketBody(PcapRecordHeader),
    Done,
    Failed,
}

enum Step {
    Header(Linktype),
    Frame(PcapRecordHeader),
}

/// Streaming reader over legacy pcap data
///
/// This reader is a streaming parser based on a circular buffer, which means memory
/// usage is constant, and that it can be used to parse huge files or infinite streams.
///
/// The first event is always [`ReaderEvent::Interface`] for interface 0, carrying the link
/// type of the global header. Every following event is a [`ReaderEvent::Frame`]. Running out
/// of data where a record header is expected ends the file normally; running out inside a
/// record is an error.
///
/// ## Example
///
/// ```rust
/// use pcap_import::{FrameReader, LegacyPcapReader, ReaderEvent};
///
/// # let data: &[u8] = &[
/// #     0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00, 0, 0, 0, 0, 0, 0, 0, 0,
/// #     0xff, 0xff, 0, 0, 0x01, 0, 0, 0,
/// # ];
/// let mut reader = LegacyPcapReader::new(65536, data);
/// let mut num_frames = 0;
/// while let Some(event) = reader.next_event().expect("corrupt capture") {
///     match event {
///         ReaderEvent::Interface { linktype, .. } => {
///             // select a dissector for linktype
///         }
///         ReaderEvent::Frame { frame, .. } => {
///             num_frames += 1;
///             let _bytes = frame.data;
///         }
///         _ => (),
///     }
/// }
/// assert_eq!(num_frames, 0);
/// ```
pub struct LegacyPcapReader<R>
where
    R: Read,
{
    cursor: ByteCursor<R>,
    state: State,
    header: Option<PcapHeader>,
    max_block_len: usize,
    /// Captured bytes handed out by the previous event, consumed on the next call
    pending: usize,
    frames: u64,
}

impl<R> LegacyPcapReader<R>
where
    R: Read,
{
    /// Creates a new `LegacyPcapReader<R>` with the provided buffer capacity.
    pub fn new(capacity: usize, reader: R) -> LegacyPcapReader<R> {
        LegacyPcapReader {
            cursor: ByteCursor::new(capacity, reader),
            state: State::GlobalHeader,
            header: None,
            max_block_len: DEFAULT_MAX_BLOCK_LEN,
            pending: 0,
            frames: 0,
        }
    }

    /// Records with a larger captured length are rejected with
    /// [`ImportError::BlockTooLarge`]
    pub fn with_max_block_len(mut self, max_block_len: usize) -> Self {
        self.max_block_len = max_block_len;
        self
    }

    /// The global header, once read
    pub fn header(&self) -> Option<&PcapHeader> {
        self.header.as_ref()
    }

    fn advance(&mut self) -> Result<Option<Step>, ImportError> {
        loop {
            match self.state {
                State::GlobalHeader => {
                    let data = self.cursor.read_exact(PCAP_HEADER_LEN)?;
                    let (_, header) =
                        parse_pcap_header(data).map_err(|e| ImportError::from_nom(e, 0))?;
                    self.cursor.consume(PCAP_HEADER_LEN);
                    debug!(
                        "Pcap header: version {}.{}, {:?}, link type {}, thiszone {}",
                        header.version_major,
                        header.version_minor,
                        header.order,
                        header.network,
                        header.thiszone
                    );
                    let linktype = header.network;
                    self.header = Some(header);
                    self.state = State::PacketHeader;
                    return Ok(Some(Step::Header(linktype)));
                }
                State::PacketHeader => {
                    if !self.cursor.fill(PCAP_RECORD_HEADER_LEN)? {
                        let left = self.cursor.available();
                        if left > 0 {
                            warn!(
                                "Ignoring {} trailing bytes at offset {}",
                                left,
                                self.cursor.position()
                            );
                        }
                        self.state = State::Done;
                        return Ok(None);
                    }
                    let offset = self.cursor.position();
                    let order = self
                        .header
                        .as_ref()
                        .map_or(ByteOrder::LittleEndian, |h| h.order);
                    let data = &self.cursor.data()[..PCAP_RECORD_HEADER_LEN];
                    let (_, rh) = match order {
                        ByteOrder::LittleEndian => parse_pcap_record_header_le(data),
                        ByteOrder::BigEndian => parse_pcap_record_header_be(data),
                    }
                    .map_err(|e| ImportError::from_nom(e, offset))?;
                    if rh.caplen as usize > self.max_block_len {
                        return Err(ImportError::BlockTooLarge {
                            len: u64::from(rh.caplen),
                            max: self.max_block_len,
                        });
                    }
                    self.cursor.consume(PCAP_RECORD_HEADER_LEN);
                    self.state = State::PacketBody(rh);
                }
                State::PacketBody(rh) => {
                    let caplen = rh.caplen as usize;
                    if !self.cursor.fill(caplen)? {
                        return Err(ImportError::UnexpectedEof(
                            self.cursor.position() + self.cursor.available() as u64,
                        ));
                    }
                    trace!("record: caplen {} origlen {}", rh.caplen, rh.origlen);
                    self.pending = caplen;
                    self.frames += 1;
                    self.state = State::PacketHeader;
                    return Ok(Some(Step::Frame(rh)));
                }
                State::Done | State::Failed => return Ok(None),
            }
        }
    }
}

impl<R> FrameReader for LegacyPcapReader<R>
where
    R: Read,
{
    fn kind(&self) -> FormatKind {
        FormatKind::LegacyPcap
    }

    fn next_event(&mut self) -> Result<Option<ReaderEvent<'_>>, ImportError> {
        if self.pending > 0 {
            self.cursor.consume(self.pending);
            self.pending = 0;
        }
        let step = match self.advance() {
            Ok(step) => step,
            Err(e) => {
                self.state = State::Failed;
                return Err(e);
            }
        };
        let event = match step {
            None => None,
            Some(Step::Header(linktype)) => Some(ReaderEvent::Interface {
                interface_id: 0,
                linktype,
                consumed: PCAP_HEADER_LEN as u64,
            }),
            Some(Step::Frame(rh)) => {
                let (thiszone, nanosecond) = self
                    .header
                    .as_ref()
                    .map_or((0, false), |h| (h.thiszone, h.nanosecond));
                let frame = RawFrame {
                    data: &self.cursor.data()[..rh.caplen as usize],
                    orig_len: rh.origlen,
                    timestamp_millis: rh.timestamp_millis(thiszone, nanosecond),
                    frame_index: self.frames,
                };
                Some(ReaderEvent::Frame {
                    interface_id: 0,
                    frame,
                    block_len: rh.record_len(),
                })
            }
        };
        Ok(event)
    }

    fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn frames_read(&self) -> u64 {
        self.frames
    }
}
