use std::fmt;
use std::io;

use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

use crate::linktype::Linktype;

/// Error type of the binary parsers
#[derive(Debug, PartialEq, Eq)]
pub enum PcapError {
    HeaderNotRecognized,
    NomError(ErrorKind),
}

impl<I> ParseError<I> for PcapError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        PcapError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        PcapError::NomError(kind)
    }
}

impl fmt::Display for PcapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PcapError::HeaderNotRecognized => write!(f, "Header not recognized as PCAP or PCAPNG"),
            PcapError::NomError(e) => write!(f, "Internal parser error {:?}", e),
        }
    }
}

impl std::error::Error for PcapError {}

/// Error terminating an import
///
/// Everything but `Cancelled` is fatal for the current file: records already queued stay
/// available, nothing after the failure point is produced.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("file format not recognized as PCAP or PCAPNG")]
    HeaderNotRecognized,

    #[error("file is too short to be a capture ({0} bytes)")]
    TooShort(u64),

    #[error("no handler is configured to process link type {0}")]
    NoHandler(Linktype),

    #[error("malformed data at offset {offset}: {kind:?}")]
    Malformed { offset: u64, kind: ErrorKind },

    #[error("invalid block length {len} (0x{len:x}) for block type 0x{block_type:08x}")]
    InvalidBlockLength { block_type: u32, len: u32 },

    #[error("block of {len} bytes exceeds the configured limit of {max} bytes")]
    BlockTooLarge { len: u64, max: usize },

    #[error("unknown block type: 0x{0:08x}")]
    UnknownBlockType(u32),

    #[error("first block is not a section header (type 0x{0:08x})")]
    MissingSectionHeader(u32),

    #[error("byte-order magic in section header is wrong (0x{0:08x})")]
    BadByteOrderMagic(u32),

    #[error("packet references undeclared interface {0}")]
    UndeclaredInterface(u32),

    #[error("unsupported timestamp resolution (0x{0:02x})")]
    InvalidTsresol(u8),

    #[error("captured length {caplen} does not fit in block of {block_len} bytes")]
    CapturedLengthOverflow { caplen: u32, block_len: u32 },

    #[error("unexpected end of file at offset {0}")]
    UnexpectedEof(u64),

    #[error("packet handler panicked")]
    HandlerPanicked,

    #[error("import cancelled")]
    Cancelled,
}

impl ImportError {
    /// Convert a parser failure on data known to be fully buffered
    pub(crate) fn from_nom(e: nom::Err<PcapError>, offset: u64) -> ImportError {
        match e {
            nom::Err::Incomplete(_) => ImportError::UnexpectedEof(offset),
            nom::Err::Error(PcapError::HeaderNotRecognized)
            | nom::Err::Failure(PcapError::HeaderNotRecognized) => {
                ImportError::HeaderNotRecognized
            }
            nom::Err::Error(PcapError::NomError(kind))
            | nom::Err::Failure(PcapError::NomError(kind)) => {
                ImportError::Malformed { offset, kind }
            }
        }
    }
}

/// Final state of an import, published once through the completion signal
#[derive(Debug)]
pub enum ImportOutcome {
    /// End of file reached at a record / block boundary
    Completed,
    /// Stopped through the cancellation token
    Cancelled,
    /// Stream corrupt or unreadable; records produced before the failure were kept
    Failed(ImportError),
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Completed)
    }

    pub fn error(&self) -> Option<&ImportError> {
        match self {
            ImportOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Result<(), ImportError>> for ImportOutcome {
    fn from(r: Result<(), ImportError>) -> Self {
        match r {
            Ok(()) => ImportOutcome::Completed,
            Err(ImportError::Cancelled) => ImportOutcome::Cancelled,
            Err(e) => ImportOutcome::Failed(e),
        }
    }
}
