//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy for one TIFF compression scheme
///
/// `expected_len` is the decoded size of the strip or tile as implied by the
/// image layout. Handlers never produce more than that, so a corrupt or
/// hostile chunk cannot inflate past the grid it belongs to.
pub trait CompressionHandler: Send + Sync {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>>;

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Name printed by `inspect` and in decode logs
    fn name(&self) -> &'static str;

    /// Compression tag value written for this method
    fn code(&self) -> u16;
}

/// Most a handler allocates before decoding; larger chunks grow as they decode
const PREALLOCATE_LIMIT: usize = 16 << 20;

/// Up-front capacity for a decoded chunk of `expected_len` bytes
pub(crate) fn initial_capacity(expected_len: usize) -> usize {
    expected_len.min(PREALLOCATE_LIMIT)
}
