use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, trace, warn};

use crate::cursor::ByteCursor;
use crate::endianness::ByteOrder;
use crate::error::ImportError;
use crate::handler::RawFrame;
use crate::pcap::DEFAULT_MAX_BLOCK_LEN;
use crate::pcapng::*;
use crate::sniff::FormatKind;
use crate::traits::{FrameReader, ReaderEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Running,
    Done,
    Failed,
}

enum Step {
    Section {
        order: ByteOrder,
        reset: bool,
        consumed: u64,
    },
    Interface {
        index: usize,
        consumed: u64,
    },
    Frame {
        index: usize,
        data_offset: usize,
        caplen: usize,
        orig_len: u32,
        timestamp_millis: i64,
        block_len: u64,
    },
    Skipped {
        block_type: u32,
        consumed: u64,
    },
}

/// Streaming reader over pcap-ng data
///
/// This reader is a streaming parser based on a circular buffer, which means memory
/// usage is constant, and that it can be used to parse huge files or infinite streams.
/// Only blocks carrying a frame or an interface description are buffered; other blocks
/// are skipped by their declared length.
///
/// The first block must be a Section Header Block. Each section fixes the byte order of
/// the blocks that follow it. Interfaces are numbered in declaration order; by default the
/// numbering continues across sections (a packet block refers to interfaces of its own
/// section, and its id is translated). With
/// [`with_section_scoped_interfaces`](PcapNgReader::with_section_scoped_interfaces), the
/// table is reset by each section and numbering restarts at 0.
///
/// Blocks without packet data are reported as [`ReaderEvent::Skipped`]. Unknown block
/// types (other than local-use types, with the high bit set) end the import with an error.
pub struct PcapNgReader<R>
where
    R: Read,
{
    cursor: ByteCursor<R>,
    order: ByteOrder,
    interfaces: Vec<InterfaceDescriptor>,
    /// Index in `interfaces` of interface 0 of the current section
    section_base: usize,
    sections: u32,
    section_scoped: bool,
    max_block_len: usize,
    /// Part of the previous block handed out in an event, consumed on the next call
    pending_consume: usize,
    /// Rest of the previous block (padding, options, trailing length)
    pending_skip: u64,
    frames: u64,
    state: State,
}

impl<R> PcapNgReader<R>
where
    R: Read,
{
    /// Creates a new `PcapNgReader<R>` with the provided buffer capacity.
    pub fn new(capacity: usize, reader: R) -> PcapNgReader<R> {
        PcapNgReader {
            cursor: ByteCursor::new(capacity, reader),
            order: ByteOrder::BigEndian,
            interfaces: Vec::new(),
            section_base: 0,
            sections: 0,
            section_scoped: false,
            max_block_len: DEFAULT_MAX_BLOCK_LEN,
            pending_consume: 0,
            pending_skip: 0,
            frames: 0,
            state: State::Running,
        }
    }

    /// Section, interface and packet blocks with a larger total length are rejected with
    /// [`ImportError::BlockTooLarge`]. Skipped blocks are never buffered and have no limit.
    pub fn with_max_block_len(mut self, max_block_len: usize) -> Self {
        self.max_block_len = max_block_len;
        self
    }

    /// Reset the interface table at each Section Header Block
    pub fn with_section_scoped_interfaces(mut self, scoped: bool) -> Self {
        self.section_scoped = scoped;
        self
    }

    /// Every interface declared so far
    pub fn interfaces(&self) -> &[InterfaceDescriptor] {
        &self.interfaces
    }

    /// Interfaces declared in the current section
    pub fn section_interfaces(&self) -> &[InterfaceDescriptor] {
        &self.interfaces[self.section_base..]
    }

    /// Byte order of the current section
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Number of sections seen so far
    pub fn sections(&self) -> u32 {
        self.sections
    }

    fn finish_previous(&mut self) -> Result<(), ImportError> {
        if self.pending_consume > 0 {
            self.cursor.consume(self.pending_consume);
            self.pending_consume = 0;
        }
        if self.pending_skip > 0 {
            let n = self.pending_skip;
            self.pending_skip = 0;
            self.cursor.skip(n)?;
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<Step>, ImportError> {
        if self.state != State::Running {
            return Ok(None);
        }
        if !self.cursor.fill(BLOCK_HEADER_LEN)? {
            let left = self.cursor.available();
            if left == 0 {
                self.state = State::Done;
                return Ok(None);
            }
            return Err(ImportError::UnexpectedEof(
                self.cursor.position() + left as u64,
            ));
        }
        let offset = self.cursor.position();
        let data = &self.cursor.data()[..BLOCK_HEADER_LEN];
        let (_, header) = match self.order {
            ByteOrder::LittleEndian => parse_block_header_le(data),
            ByteOrder::BigEndian => parse_block_header_be(data),
        }
        .map_err(|e| ImportError::from_nom(e, offset))?;

        // the section header type is a palindrome, its length is checked once the byte
        // order is known
        if header.block_type == BlockType::SectionHeader {
            return self.read_section_header().map(Some);
        }
        if self.sections == 0 {
            return Err(ImportError::MissingSectionHeader(header.block_type.0));
        }
        if !header.has_valid_length() {
            return Err(ImportError::InvalidBlockLength {
                block_type: header.block_type.0,
                len: header.block_len,
            });
        }
        trace!(
            "block {:?} at offset {}, {} bytes",
            header.block_type,
            offset,
            header.block_len
        );

        let step = match header.block_type {
            BlockType::InterfaceDescription => self.read_interface_description(header)?,
            BlockType::EnhancedPacket | BlockType::Packet => self.read_packet_block(header)?,
            BlockType::SimplePacket => self.read_simple_packet(header)?,
            BlockType::NameResolution => {
                info!(
                    "Name Resolution Block not parsed ({} bytes at offset {})",
                    header.block_len, offset
                );
                self.skip_block(header)?
            }
            BlockType::InterfaceStatistics | BlockType::IrigTimestamp | BlockType::Arinc429 => {
                self.skip_block(header)?
            }
            BlockType::Custom | BlockType::CustomNoCopy => {
                warn!(
                    "PcapNg file contains unparsable data ({} bytes at offset {})",
                    header.block_len, offset
                );
                self.skip_block(header)?
            }
            t if t.is_local() => {
                debug!("Skipping local block type 0x{:08x}", t.0);
                self.skip_block(header)?
            }
            t => return Err(ImportError::UnknownBlockType(t.0)),
        };
        Ok(Some(step))
    }

    fn check_block_len(&self, block_len: u32) -> Result<(), ImportError> {
        if block_len as usize > self.max_block_len {
            return Err(ImportError::BlockTooLarge {
                len: u64::from(block_len),
                max: self.max_block_len,
            });
        }
        Ok(())
    }

    fn read_section_header(&mut self) -> Result<Step, ImportError> {
        let offset = self.cursor.position();
        let data = self.cursor.read_exact(BLOCK_HEADER_LEN + 4)?;
        let bom = [data[8], data[9], data[10], data[11]];
        let order = section_byte_order(bom)
            .ok_or_else(|| ImportError::BadByteOrderMagic(u32::from_be_bytes(bom)))?;
        let block_len = order.read_u32(data, 4);
        if block_len % 4 != 0 || (block_len as usize) < SHB_MIN_LEN {
            return Err(ImportError::InvalidBlockLength {
                block_type: SHB_MAGIC,
                len: block_len,
            });
        }
        self.check_block_len(block_len)?;

        let data = self.cursor.read_exact(SHB_FIXED_LEN)?;
        let fixed = &data[BLOCK_HEADER_LEN..SHB_FIXED_LEN];
        let (_, shb) = match order {
            ByteOrder::LittleEndian => parse_section_header_le(fixed),
            ByteOrder::BigEndian => parse_section_header_be(fixed),
        }
        .map_err(|e| ImportError::from_nom(e, offset))?;
        self.cursor.skip(u64::from(block_len))?;

        self.order = order;
        self.sections += 1;
        if self.section_scoped {
            self.interfaces.clear();
        }
        self.section_base = self.interfaces.len();
        debug!(
            "Section {} at offset {}: {:?}, version {}.{}",
            self.sections, offset, order, shb.major_version, shb.minor_version
        );
        Ok(Step::Section {
            order,
            reset: self.section_scoped,
            consumed: u64::from(block_len),
        })
    }

    fn read_interface_description(&mut self, header: BlockHeader) -> Result<Step, ImportError> {
        let block_len = header.block_len as usize;
        if block_len < IDB_MIN_LEN {
            return Err(ImportError::InvalidBlockLength {
                block_type: IDB_MAGIC,
                len: header.block_len,
            });
        }
        self.check_block_len(header.block_len)?;
        let offset = self.cursor.position();
        let data = self.cursor.read_exact(block_len)?;
        // the trailing length is not checked, as for the other block types
        let body = &data[BLOCK_HEADER_LEN..block_len - 4];
        let (_, idb) = match self.order {
            ByteOrder::LittleEndian => parse_interface_description_le(body),
            ByteOrder::BigEndian => parse_interface_description_be(body),
        }
        .map_err(|e| ImportError::from_nom(e, offset))?;
        let interface_id = self.interfaces.len() as u32;
        let descriptor = InterfaceDescriptor::new(interface_id, &idb)?;
        self.cursor.consume(block_len);

        debug!(
            "Interface {} ({}): link type {}, snaplen {}, {} units/s",
            interface_id,
            descriptor.name.as_deref().unwrap_or("unnamed"),
            descriptor.linktype,
            descriptor.snaplen,
            descriptor.ts_divisor
        );
        self.interfaces.push(descriptor);
        Ok(Step::Interface {
            index: interface_id as usize,
            consumed: block_len as u64,
        })
    }

    /// Translate an interface id of the current section to an index in the table
    fn resolve_interface(&self, if_id: u32) -> Result<usize, ImportError> {
        self.section_base
            .checked_add(if_id as usize)
            .filter(|&index| index < self.interfaces.len())
            .ok_or(ImportError::UndeclaredInterface(if_id))
    }

    fn read_packet_block(&mut self, header: BlockHeader) -> Result<Step, ImportError> {
        let block_len = header.block_len;
        if (block_len as usize) < EPB_MIN_LEN {
            return Err(ImportError::InvalidBlockLength {
                block_type: header.block_type.0,
                len: block_len,
            });
        }
        self.check_block_len(block_len)?;
        let offset = self.cursor.position();
        let data = self.cursor.read_exact(PACKET_DATA_OFFSET)?;
        let sub = &data[BLOCK_HEADER_LEN..PACKET_DATA_OFFSET];
        let (_, ph) = match (header.block_type, self.order) {
            (BlockType::Packet, ByteOrder::LittleEndian) => parse_packet_header_le(sub),
            (BlockType::Packet, ByteOrder::BigEndian) => parse_packet_header_be(sub),
            (_, ByteOrder::LittleEndian) => parse_enhanced_packet_header_le(sub),
            (_, ByteOrder::BigEndian) => parse_enhanced_packet_header_be(sub),
        }
        .map_err(|e| ImportError::from_nom(e, offset))?;
        ph.check_fits(block_len)?;
        let index = self.resolve_interface(ph.if_id)?;

        let caplen = ph.caplen as usize;
        let used = PACKET_DATA_OFFSET + caplen;
        self.cursor.read_exact(used)?;
        let timestamp_millis = self.interfaces[index].timestamp_millis(ph.timestamp());
        self.pending_consume = used;
        self.pending_skip = u64::from(block_len) - used as u64;
        self.frames += 1;
        Ok(Step::Frame {
            index,
            data_offset: PACKET_DATA_OFFSET,
            caplen,
            orig_len: ph.origlen,
            timestamp_millis,
            block_len: u64::from(block_len),
        })
    }

    fn read_simple_packet(&mut self, header: BlockHeader) -> Result<Step, ImportError> {
        let block_len = header.block_len;
        if (block_len as usize) < SPB_MIN_LEN {
            return Err(ImportError::InvalidBlockLength {
                block_type: SPB_MAGIC,
                len: block_len,
            });
        }
        self.check_block_len(block_len)?;
        let index = self.resolve_interface(0)?;
        let offset = self.cursor.position();
        let data = self.cursor.read_exact(SPB_DATA_OFFSET)?;
        let (_, sph) = match self.order {
            ByteOrder::LittleEndian => parse_simple_packet_header_le(&data[BLOCK_HEADER_LEN..]),
            ByteOrder::BigEndian => parse_simple_packet_header_be(&data[BLOCK_HEADER_LEN..]),
        }
        .map_err(|e| ImportError::from_nom(e, offset))?;

        let caplen = sph.caplen(block_len) as usize;
        let used = SPB_DATA_OFFSET + caplen;
        self.cursor.read_exact(used)?;
        self.pending_consume = used;
        self.pending_skip = u64::from(block_len) - used as u64;
        self.frames += 1;
        Ok(Step::Frame {
            index,
            data_offset: SPB_DATA_OFFSET,
            caplen,
            orig_len: sph.origlen,
            // no timestamp in this block
            timestamp_millis: wall_clock_millis(),
            block_len: u64::from(block_len),
        })
    }

    fn skip_block(&mut self, header: BlockHeader) -> Result<Step, ImportError> {
        let consumed = u64::from(header.block_len);
        self.cursor.skip(consumed)?;
        Ok(Step::Skipped {
            block_type: header.block_type.0,
            consumed,
        })
    }
}

fn wall_clock_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl<R> FrameReader for PcapNgReader<R>
where
    R: Read,
{
    fn kind(&self) -> FormatKind {
        FormatKind::PcapNg
    }

    fn next_event(&mut self) -> Result<Option<ReaderEvent<'_>>, ImportError> {
        let step = match self.finish_previous().and_then(|()| self.advance()) {
            Ok(step) => step,
            Err(e) => {
                self.state = State::Failed;
                return Err(e);
            }
        };
        let event = match step {
            None => None,
            Some(Step::Section {
                order,
                reset,
                consumed,
            }) => Some(ReaderEvent::Section {
                section: self.sections,
                order,
                reset_interfaces: reset,
                consumed,
            }),
            Some(Step::Interface { index, consumed }) => {
                let descriptor = &self.interfaces[index];
                Some(ReaderEvent::Interface {
                    interface_id: descriptor.interface_id,
                    linktype: descriptor.linktype,
                    consumed,
                })
            }
            Some(Step::Frame {
                index,
                data_offset,
                caplen,
                orig_len,
                timestamp_millis,
                block_len,
            }) => {
                let frame = RawFrame {
                    data: &self.cursor.data()[data_offset..data_offset + caplen],
                    orig_len,
                    timestamp_millis,
                    frame_index: self.frames,
                };
                Some(ReaderEvent::Frame {
                    interface_id: self.interfaces[index].interface_id,
                    frame,
                    block_len,
                })
            }
            Some(Step::Skipped {
                block_type,
                consumed,
            }) => Some(ReaderEvent::Skipped {
                block_type,
                consumed,
            }),
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
