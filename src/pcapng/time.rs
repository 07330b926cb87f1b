use crate::error::ImportError;

/// Timestamp units per second when `if_tsresol` is absent (microseconds)
pub const DEFAULT_TS_DIVISOR: u64 = 1_000_000;

/// Compute the timestamp resolution, in units per second
///
/// High bit set: the resolution is `2^(value & 0x7f)`. High bit clear: `10^value`.
/// Resolutions that do not fit in a `u64` are rejected.
pub fn ts_divisor_from_tsresol(ts_resol: u8) -> Result<u64, ImportError> {
    if ts_resol & 0x80 == 0 {
        // 10^19 is the largest power of 10 to fit in a u64
        if ts_resol > 19 {
            return Err(ImportError::InvalidTsresol(ts_resol));
        }
        Ok(10u64.pow(u32::from(ts_resol)))
    } else {
        let exp = ts_resol & 0x7f;
        if exp > 63 {
            return Err(ImportError::InvalidTsresol(ts_resol));
        }
        Ok(1u64 << exp)
    }
}

/// Convert a raw pcap-ng timestamp to milliseconds since the Unix epoch
///
/// `ts` is `(ts_high << 32) | ts_low`, in units of `1 / divisor` seconds. `offset` is the
/// `if_tsoffset` of the interface, in seconds. Values out of range saturate.
pub fn timestamp_millis(ts: u64, divisor: u64, offset: i64) -> i64 {
    let millis = u128::from(ts) * 1000 / u128::from(divisor.max(1));
    let millis = i64::try_from(millis).unwrap_or(i64::MAX);
    millis.saturating_add(offset.saturating_mul(1000))
}

/// Compose the two halves of a block timestamp
#[inline]
pub fn build_ts(ts_high: u32, ts_low: u32) -> u64 {
    (u64::from(ts_high) << 32) | u64::from(ts_low)
}
