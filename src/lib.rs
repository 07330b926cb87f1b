//! # PCAP and PCAPNG importer
//!
//! This crate imports offline capture files in the legacy pcap and pcap-ng formats, and feeds
//! the captured frames to user-supplied packet handlers, on a background thread.
//!
//! Both formats are supported in both byte orders, with nanosecond legacy files, pcap-ng
//! files with multiple sections and interfaces, and any timestamp resolution. Frames are
//! handed to handlers without copying (zero-copy) from a constant-size read buffer.
//!
//! The pieces are:
//!
//! - format detection, in [`sniff`](sniff/index.html);
//! - streaming readers for each format ([`LegacyPcapReader`], [`PcapNgReader`]), behind the
//!   [`FrameReader`] trait;
//! - a [`HandlerRegistry`] mapping each link type to a [`HandlerFactory`];
//! - a bounded queue ([`PacketSink`] / [`PacketStream`]) between the handlers and the
//!   consumer of their records, with back-pressure;
//! - the [`Importer`], tying everything together, and reporting progress and the final
//!   [`ImportOutcome`] through a shared [`CaptureSource`].
//!
//! # Example: importing a file
//!
//! ```rust,no_run
//! use pcap_import::*;
//!
//! fn ethernet(ctx: HandlerContext<(u64, usize)>) -> Box<dyn PacketHandler> {
//!     let sink = ctx.sink;
//!     Box::new(move |frame: &RawFrame<'_>| {
//!         sink.push((frame.frame_index, frame.data.len()));
//!         0
//!     })
//! }
//!
//! let registry = HandlerRegistry::new().with(Linktype::ETHERNET, ethernet);
//! let importer = Importer::new(registry, ImportConfig::default());
//! let mut stream = importer.open("assets/test001-le.pcapng").expect("open");
//! for (index, len) in &mut stream {
//!     println!("frame {}: {} bytes", index, len);
//! }
//! match stream.outcome() {
//!     Some(ImportOutcome::Failed(e)) => eprintln!("import failed: {}", e),
//!     _ => println!("done"),
//! }
//! ```
//!
//! # Example: reading frames directly
//!
//! The readers can be used without the importer. See [`LegacyPcapReader`] for an example.

pub mod cursor;
mod endianness;
mod error;
mod handler;
mod import;
mod linktype;
mod progress;
mod queue;
pub mod sniff;
mod source;
pub mod traits;

pub use endianness::ByteOrder;
pub use error::*;
pub use handler::*;
pub use import::*;
pub use linktype::*;
pub use progress::*;
pub use queue::*;
pub use sniff::{validate_file_format, CaptureFormat, FormatKind};
pub use source::*;
pub use traits::*;

pub mod pcap;
pub mod pcapng;
pub use pcap::{LegacyPcapReader, PcapHeader};
pub use pcapng::{InterfaceDescriptor, PcapNgReader};
