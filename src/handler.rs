//! Packet handlers and their registry
//!
//! A [`PacketHandler`] turns raw frames of one link type into records of the pipeline's
//! type `T` and pushes them to the queue. The importer creates one handler per capture
//! interface, through the [`HandlerFactory`] registered for the interface's link type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::linktype::Linktype;
use crate::queue::PacketSink;
use crate::source::CaptureSource;

/// Raw bytes of one captured frame
///
/// The data borrows the importer's read buffer and is only valid for the duration of
/// [`PacketHandler::handle`].
#[derive(Clone, Copy, Debug)]
pub struct RawFrame<'a> {
    /// Captured bytes (possibly truncated by the capturing tool)
    pub data: &'a [u8],
    /// Original length of the frame on the wire
    pub orig_len: u32,
    /// Milliseconds since the Unix epoch
    pub timestamp_millis: i64,
    /// Index of the frame in the file, starting at 1
    pub frame_index: u64,
}

/// Decoder for frames of a single interface
pub trait PacketHandler: Send {
    /// Decode one frame, pushing any number of records to the sink
    ///
    /// Returns the number of input bytes the handler consumed. A handler reporting consumed
    /// bytes is expected to record them itself through
    /// [`CaptureSource::record_progress`]; the importer records the rest of the block.
    fn handle(&mut self, frame: &RawFrame<'_>) -> usize;
}

impl<F> PacketHandler for F
where
    F: FnMut(&RawFrame<'_>) -> usize + Send,
{
    fn handle(&mut self, frame: &RawFrame<'_>) -> usize {
        self(frame)
    }
}

/// Everything a new handler is bound to
pub struct HandlerContext<T> {
    pub source: Arc<CaptureSource>,
    pub sink: PacketSink<T>,
    pub linktype: Linktype,
    /// Interface number, as assigned by the importer
    pub interface_id: u32,
}

/// Creates handlers for one link type
pub trait HandlerFactory<T>: Send + Sync {
    fn create(&self, ctx: HandlerContext<T>) -> Box<dyn PacketHandler>;
}

impl<T, F> HandlerFactory<T> for F
where
    F: Fn(HandlerContext<T>) -> Box<dyn PacketHandler> + Send + Sync,
{
    fn create(&self, ctx: HandlerContext<T>) -> Box<dyn PacketHandler> {
        self(ctx)
    }
}

/// Handler factories, keyed by link type
pub struct HandlerRegistry<T> {
    factories: HashMap<Linktype, Box<dyn HandlerFactory<T>>>,
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        HandlerRegistry {
            factories: HashMap::new(),
        }
    }
}

impl<T> HandlerRegistry<T> {
    pub fn new() -> HandlerRegistry<T> {
        HandlerRegistry::default()
    }

    /// Register `factory` for `linktype`, replacing any previous one
    pub fn register<F>(&mut self, linktype: Linktype, factory: F)
    where
        F: HandlerFactory<T> + 'static,
    {
        self.factories.insert(linktype, Box::new(factory));
    }

    /// Builder form of [`register`](HandlerRegistry::register)
    pub fn with<F>(mut self, linktype: Linktype, factory: F) -> Self
    where
        F: HandlerFactory<T> + 'static,
    {
        self.register(linktype, factory);
        self
    }

    pub fn get(&self, linktype: Linktype) -> Option<&dyn HandlerFactory<T>> {
        self.factories.get(&linktype).map(|f| f.as_ref())
    }

    pub fn contains(&self, linktype: Linktype) -> bool {
        self.factories.contains_key(&linktype)
    }

    /// Registered link types, in ascending order
    pub fn linktypes(&self) -> Vec<Linktype> {
        let mut v: Vec<_> = self.factories.keys().copied().collect();
        v.sort();
        v
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn create(&self, ctx: HandlerContext<T>) -> Option<Box<dyn PacketHandler>> {
        let factory = self.factories.get(&ctx.linktype)?;
        Some(factory.create(ctx))
    }
}

impl<T> fmt::Debug for HandlerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("linktypes", &self.linktypes())
            .finish()
    }
}
