//! Offline import of a capture file
//!
//! An [`Importer`] owns the handler registry and the configuration. Each call to
//! [`open`](Importer::open) sniffs the file, starts one worker thread decoding it, and
//! returns the consumer end of a bounded queue. The worker feeds every frame to the handler
//! bound to its interface; handlers push their records to the queue, and the worker blocks
//! whenever the queue is full.

use std::fs::File;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cursor::DEFAULT_BUFFER_CAPACITY;
use crate::error::{ImportError, ImportOutcome};
use crate::handler::{HandlerContext, HandlerRegistry, PacketHandler};
use crate::linktype::Linktype;
use crate::pcap::{LegacyPcapReader, DEFAULT_MAX_BLOCK_LEN};
use crate::pcapng::PcapNgReader;
use crate::queue::{
    packet_queue, CancelToken, PacketSink, PacketStream, DEFAULT_PUSH_POLL_INTERVAL,
    DEFAULT_QUEUE_CAPACITY,
};
use crate::sniff::{sniff_reader, FormatKind, SNIFF_LEN};
use crate::source::CaptureSource;
use crate::traits::{FrameReader, ReaderEvent};

/// Import settings
#[derive(Clone, Debug)]
pub struct ImportConfig {
    /// Number of records the queue holds before the worker blocks
    pub queue_capacity: usize,
    /// Initial size of the read buffer
    pub buffer_capacity: usize,
    /// Largest accepted record (legacy pcap) or block (pcap-ng)
    pub max_block_len: usize,
    /// Restart interface numbering at each pcap-ng section
    pub section_scoped_interfaces: bool,
    /// How often a producer blocked on a full queue checks for cancellation
    pub push_poll_interval: Duration,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_block_len: DEFAULT_MAX_BLOCK_LEN,
            section_scoped_interfaces: false,
            push_poll_interval: DEFAULT_PUSH_POLL_INTERVAL,
        }
    }
}

impl ImportConfig {
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    pub fn with_max_block_len(mut self, max_block_len: usize) -> Self {
        self.max_block_len = max_block_len;
        self
    }

    pub fn with_section_scoped_interfaces(mut self, scoped: bool) -> Self {
        self.section_scoped_interfaces = scoped;
        self
    }

    pub fn with_push_poll_interval(mut self, interval: Duration) -> Self {
        self.push_poll_interval = interval;
        self
    }
}

/// Starts imports of capture files
///
/// `T` is the record type produced by the handlers.
///
/// ```rust,no_run
/// use pcap_import::{HandlerContext, HandlerRegistry, ImportConfig, Importer, Linktype, PacketHandler, RawFrame};
///
/// let registry = HandlerRegistry::new().with(
///     Linktype::ETHERNET,
///     |ctx: HandlerContext<usize>| -> Box<dyn PacketHandler> {
///         let sink = ctx.sink;
///         Box::new(move |frame: &RawFrame<'_>| {
///             sink.push(frame.data.len());
///             0
///         })
///     },
/// );
/// let importer = Importer::new(registry, ImportConfig::default());
/// let stream = importer.open("capture.pcapng").expect("could not open capture");
/// let total: usize = stream.sum();
/// println!("{} bytes captured", total);
/// ```
pub struct Importer<T> {
    registry: Arc<HandlerRegistry<T>>,
    config: ImportConfig,
}

impl<T> Importer<T>
where
    T: Send + 'static,
{
    pub fn new(registry: HandlerRegistry<T>, config: ImportConfig) -> Importer<T> {
        Importer {
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry<T> {
        &self.registry
    }

    /// Sniff the file at `path` and start importing it
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<PacketStream<T>, ImportError> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        if size < SNIFF_LEN as u64 {
            return Err(ImportError::TooShort(size));
        }
        let format = sniff_reader(&mut file)?.ok_or(ImportError::HeaderNotRecognized)?;
        debug!("{}: {:?}", path.display(), format);
        self.open_reader(path, size, format.kind(), file)
    }

    /// Start importing `reader`, already known to be of format `kind`
    ///
    /// `size` is the expected number of bytes, used for progress.
    pub fn open_reader<P, R>(
        &self,
        path: P,
        size: u64,
        kind: FormatKind,
        reader: R,
    ) -> Result<PacketStream<T>, ImportError>
    where
        P: Into<PathBuf>,
        R: Read + Send + 'static,
    {
        let source = Arc::new(CaptureSource::new(path, size));
        let cancel = CancelToken::new();
        let (sink, mut stream) = packet_queue(
            self.config.queue_capacity,
            source.clone(),
            cancel.clone(),
            self.config.push_poll_interval,
        );
        let frame_reader: Box<dyn FrameReader + Send> = match kind {
            FormatKind::LegacyPcap => Box::new(
                LegacyPcapReader::new(self.config.buffer_capacity, reader)
                    .with_max_block_len(self.config.max_block_len),
            ),
            FormatKind::PcapNg => Box::new(
                PcapNgReader::new(self.config.buffer_capacity, reader)
                    .with_max_block_len(self.config.max_block_len)
                    .with_section_scoped_interfaces(self.config.section_scoped_interfaces),
            ),
        };

        let name = match source.path().file_name() {
            Some(name) => format!("pcap-import/{}", name.to_string_lossy()),
            None => "pcap-import".to_owned(),
        };
        let registry = self.registry.clone();
        let worker_source = source.clone();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || run_worker(frame_reader, registry, worker_source, sink, cancel))?;
        stream.set_worker(handle);
        Ok(stream)
    }
}

fn run_worker<T>(
    mut reader: Box<dyn FrameReader + Send>,
    registry: Arc<HandlerRegistry<T>>,
    source: Arc<CaptureSource>,
    sink: PacketSink<T>,
    cancel: CancelToken,
) {
    source.mark_started();
    info!(
        "Importing {} ({}, {} bytes)",
        source.path().display(),
        reader.kind(),
        source.size()
    );
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatch(reader.as_mut(), &registry, &source, &sink, &cancel)
    }))
    .unwrap_or(Err(ImportError::HandlerPanicked));

    match &result {
        Ok(()) => info!(
            "Import of {} complete: {} frames",
            source.path().display(),
            reader.frames_read()
        ),
        Err(ImportError::Cancelled) => info!(
            "Import of {} cancelled after {} frames",
            source.path().display(),
            reader.frames_read()
        ),
        Err(e) => error!(
            "Import of {} failed at offset {} after {} frames: {}",
            source.path().display(),
            reader.position(),
            reader.frames_read(),
            e
        ),
    }
    source.complete(ImportOutcome::from(result));
    drop(sink);
}

struct BoundInterface {
    linktype: Linktype,
    handler: Option<Box<dyn PacketHandler>>,
}

/// Drive `reader` to the end, feeding frames to the handlers of `registry`
///
/// A handler is created for each declared interface. A legacy pcap file whose link type has
/// no handler fails immediately; a pcap-ng interface without handler only fails once a
/// frame is captured on it.
///
/// `cancel` is checked before each record or block. Progress is recorded on `source` for
/// every byte read, except the bytes a handler reports as consumed.
pub fn dispatch<T>(
    reader: &mut dyn FrameReader,
    registry: &HandlerRegistry<T>,
    source: &Arc<CaptureSource>,
    sink: &PacketSink<T>,
    cancel: &CancelToken,
) -> Result<(), ImportError> {
    let kind = reader.kind();
    let mut interfaces: Vec<BoundInterface> = Vec::new();
    loop {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        let event = match reader.next_event()? {
            Some(event) => event,
            None => return Ok(()),
        };
        match event {
            ReaderEvent::Section {
                reset_interfaces,
                consumed,
                ..
            } => {
                if reset_interfaces {
                    interfaces.clear();
                }
                source.record_progress(consumed);
            }
            ReaderEvent::Interface {
                interface_id,
                linktype,
                consumed,
            } => {
                let ctx = HandlerContext {
                    source: source.clone(),
                    sink: sink.clone(),
                    linktype,
                    interface_id,
                };
                let handler = registry.create(ctx);
                if handler.is_none() {
                    if kind == FormatKind::LegacyPcap {
                        return Err(ImportError::NoHandler(linktype));
                    }
                    warn!(
                        "No handler for link type {} (interface {}); its frames cannot be imported",
                        linktype, interface_id
                    );
                }
                let index = interface_id as usize;
                if index >= interfaces.len() {
                    interfaces.resize_with(index + 1, || BoundInterface {
                        linktype: Linktype::default(),
                        handler: None,
                    });
                }
                interfaces[index] = BoundInterface { linktype, handler };
                source.record_progress(consumed);
            }
            ReaderEvent::Frame {
                interface_id,
                frame,
                block_len,
            } => {
                let bound = interfaces
                    .get_mut(interface_id as usize)
                    .ok_or(ImportError::UndeclaredInterface(interface_id))?;
                let handler = match bound.handler.as_mut() {
                    Some(handler) => handler,
                    None => return Err(ImportError::NoHandler(bound.linktype)),
                };
                let consumed = handler.handle(&frame) as u64;
                if consumed > block_len {
                    warn!(
                        "Handler reported {} bytes consumed for frame {} of {} bytes",
                        consumed, frame.frame_index, block_len
                    );
                }
                source.record_progress(block_len - consumed.min(block_len));
            }
            ReaderEvent::Skipped { consumed, .. } => source.record_progress(consumed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RawFrame;
    use crate::queue::Polled;
    use hex_literal::hex;

    const PCAP_LE: &[u8] = &hex!(
        "
D4 C3 B2 A1 02 00 04 00 00 00 00 00 00 00 00 00
FF FF 00 00 01 00 00 00
01 00 00 00 00 00 00 00 04 00 00 00 04 00 00 00
DE AD BE EF"
    );

    fn setup(
        size: u64,
    ) -> (
        Arc<CaptureSource>,
        PacketSink<u64>,
        PacketStream<u64>,
        CancelToken,
    ) {
        let source = Arc::new(CaptureSource::new("test.pcap", size));
        let cancel = CancelToken::new();
        let (sink, stream) = packet_queue(
            16,
            source.clone(),
            cancel.clone(),
            Duration::from_millis(5),
        );
        (source, sink, stream, cancel)
    }

    fn indices(consumed: usize) -> impl Fn(HandlerContext<u64>) -> Box<dyn PacketHandler> {
        move |ctx: HandlerContext<u64>| -> Box<dyn PacketHandler> {
            let sink = ctx.sink;
            let source = ctx.source;
            Box::new(move |frame: &RawFrame<'_>| {
                sink.push(frame.frame_index);
                source.record_progress(consumed as u64);
                consumed
            })
        }
    }

    #[test]
    fn progress_counts_every_byte_once() {
        for consumed in [0, 3, 20] {
            let (source, sink, stream, cancel) = setup(PCAP_LE.len() as u64);
            let registry = HandlerRegistry::new().with(Linktype::ETHERNET, indices(consumed));
            let mut reader = LegacyPcapReader::new(64, PCAP_LE);
            dispatch(&mut reader, &registry, &source, &sink, &cancel).expect("dispatch");
            assert_eq!(stream.poll(), Polled::Item(1));
            assert_eq!(source.progress(), 1.0);
        }
    }

    #[test]
    fn legacy_without_handler() {
        let (source, sink, _stream, cancel) = setup(PCAP_LE.len() as u64);
        let registry = HandlerRegistry::new().with(Linktype::RAW, indices(0));
        let mut reader = LegacyPcapReader::new(64, PCAP_LE);
        assert!(matches!(
            dispatch(&mut reader, &registry, &source, &sink, &cancel),
            Err(ImportError::NoHandler(Linktype::ETHERNET))
        ));
        assert_eq!(reader.frames_read(), 0);
    }

    #[test]
    fn cancelled_before_start() {
        let (source, sink, _stream, cancel) = setup(PCAP_LE.len() as u64);
        let registry = HandlerRegistry::new().with(Linktype::ETHERNET, indices(0));
        let mut reader = LegacyPcapReader::new(64, PCAP_LE);
        cancel.cancel();
        assert!(matches!(
            dispatch(&mut reader, &registry, &source, &sink, &cancel),
            Err(ImportError::Cancelled)
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn config_builders() {
        let config = ImportConfig::default()
            .with_queue_capacity(4)
            .with_max_block_len(1024)
            .with_section_scoped_interfaces(true);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.max_block_len, 1024);
        assert!(config.section_scoped_interfaces);
        assert_eq!(config.push_poll_interval, DEFAULT_PUSH_POLL_INTERVAL);
    }
}
