//! EDID acquisition over I2C-over-AUX.
//!
//! Blocks 0 and 1 are read straight from the EDID slave in 16-byte chunks.
//! Blocks 2 and 3 sit behind the E-DDC segment pointer and are read into a
//! scratch buffer: they are scanned for timings but not kept. Every chunk is
//! retried a bounded number of times; giving up marks the read aborted and
//! whatever was captured is still used.
//!
//! Header and checksum problems are logged and never block bring-up: plenty
//! of converters ship slightly broken EDIDs that still work.
//!
//! A successful read is cached across connections together with a short
//! fingerprint (extension count, checksum, first timing descriptor). When
//! the same sink comes back only the fingerprint chunks are re-read.

use embedded_hal::delay::DelayNs;
use platform::{AuxChannel, AuxError};

use crate::config::RetryPolicy;
use crate::link::LinkBandwidth;

/// One EDID block.
pub const EDID_BLOCK_LEN: usize = 128;
/// Blocks kept in the EDID buffer.
pub const EDID_KEPT_BLOCKS: usize = 2;
/// EDID buffer size.
pub const EDID_BUF_LEN: usize = EDID_BLOCK_LEN * EDID_KEPT_BLOCKS;
/// Highest block index read (segments 0 and 1).
pub const EDID_MAX_BLOCKS: u8 = 4;
/// Fixed EDID header.
pub const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// EDID slave behind the sink.
pub const EDID_SLAVE: u8 = 0x50;
/// E-DDC segment pointer.
pub const SEGMENT_SLAVE: u8 = 0x30;

const CHUNK_LEN: usize = 16;
const EXTENSION_COUNT: usize = 0x7E;
const DTD_LEN: usize = 18;
const BASE_DTD_START: usize = 0x36;
const BASE_DTD_END: usize = 0x7E;
const CEA_EXTENSION_TAG: u8 = 0x02;

/// Result of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdidSummary {
    /// Extension count from block 0.
    pub extension_count: u8,
    /// Blocks read completely.
    pub blocks_read: u8,
    /// Block 0 started with the fixed header.
    pub header_ok: bool,
    /// Every completed block summed to zero.
    pub checksums_ok: bool,
    /// Largest detailed-timing pixel clock seen, in kHz.
    pub max_pixel_clock_khz: u32,
}

/// The read stopped early; the summary covers what was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Aborted(pub EdidSummary);

fn transfer<A: AuxChannel>(aux: &mut A, segment: u8, offset: u8, out: &mut [u8]) -> Result<(), AuxError> {
    if segment > 0 {
        aux.i2c_write(SEGMENT_SLAVE, &[segment])?;
    }
    aux.i2c_write(EDID_SLAVE, &[offset])?;
    aux.i2c_read(EDID_SLAVE, out)
}

/// Read one chunk with the configured retry bound. `false` when exhausted.
fn read_chunk<A: AuxChannel, D: DelayNs>(
    aux: &mut A,
    delay: &mut D,
    retry: &RetryPolicy,
    segment: u8,
    offset: u8,
    out: &mut [u8],
) -> bool {
    for attempt in 1..=retry.edid_chunk_retries {
        match transfer(aux, segment, offset, out) {
            Ok(()) => return true,
            Err(e) => trace!("EDID chunk {:#x}:{:#x} attempt {} failed: {:?}", segment, offset, attempt, e),
        }
        delay.delay_ms(retry.edid_backoff_ms);
    }
    warn!("EDID chunk {:#x}:{:#x} gave up after {} attempts", segment, offset, retry.edid_chunk_retries);
    false
}

/// Read block `index` into `block`. `false` if a chunk was abandoned.
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
fn read_block<A: AuxChannel, D: DelayNs>(
    aux: &mut A,
    delay: &mut D,
    retry: &RetryPolicy,
    index: u8,
    block: &mut [u8],
) -> bool {
    let segment = index / 2;
    let base = usize::from(index % 2) * EDID_BLOCK_LEN;
    for (i, chunk) in block.chunks_exact_mut(CHUNK_LEN).enumerate() {
        let offset = (base + i * CHUNK_LEN) as u8;
        if !read_chunk(aux, delay, retry, segment, offset, chunk) {
            return false;
        }
    }
    true
}

/// Sum of a block is zero.
#[must_use]
pub fn checksum_ok(block: &[u8]) -> bool {
    block.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0
}

/// Pixel clock of one detailed timing descriptor in kHz, `None` for
/// display descriptors.
fn dtd_pixel_clock_khz(dtd: &[u8]) -> Option<u32> {
    match dtd {
        [lo, hi, ..] => {
            let raw = u16::from_le_bytes([*lo, *hi]);
            (raw != 0).then(|| u32::from(raw).saturating_mul(10))
        }
        _ => None,
    }
}

/// Largest pixel clock among the detailed timings of one block.
#[must_use]
pub fn block_max_pixel_clock_khz(block: &[u8], index: u8) -> u32 {
    let descriptors = if index == 0 {
        block.get(BASE_DTD_START..BASE_DTD_END)
    } else if block.first() == Some(&CEA_EXTENSION_TAG) {
        let start = block.get(2).map_or(0, |&d| usize::from(d));
        if start < 4 {
            None
        } else {
            block.get(start..EDID_BLOCK_LEN.saturating_sub(1))
        }
    } else {
        None
    };
    descriptors
        .into_iter()
        .flat_map(|d| d.chunks_exact(DTD_LEN))
        .filter_map(dtd_pixel_clock_khz)
        .max()
        .unwrap_or(0)
}

/// Read the sink's EDID into `into`.
///
/// Best effort: on [`Aborted`] the buffer holds what was captured before the
/// failing chunk and the summary describes it.
pub fn read_edid<A: AuxChannel, D: DelayNs>(
    aux: &mut A,
    delay: &mut D,
    retry: &RetryPolicy,
    into: &mut [u8; EDID_BUF_LEN],
) -> Result<EdidSummary, Aborted> {
    *into = [0; EDID_BUF_LEN];
    let mut summary = EdidSummary {
        checksums_ok: true,
        ..EdidSummary::default()
    };
    let (kept0, kept1) = into.split_at_mut(EDID_BLOCK_LEN);

    if !read_block(aux, delay, retry, 0, kept0) {
        return Err(Aborted(summary));
    }
    summary.blocks_read = 1;
    summary.header_ok = kept0.starts_with(&EDID_HEADER);
    if summary.header_ok {
        debug!("EDID: good header");
    } else {
        warn!("EDID: bad header");
    }
    note_block(&mut summary, kept0, 0);

    summary.extension_count = kept0.get(EXTENSION_COUNT).copied().unwrap_or(0);
    let blocks = summary.extension_count.saturating_add(1).min(EDID_MAX_BLOCKS);

    let mut scratch = [0u8; EDID_BLOCK_LEN];
    for index in 1..blocks {
        let block: &mut [u8] = if index == 1 { &mut *kept1 } else { &mut scratch };
        if !read_block(aux, delay, retry, index, block) {
            return Err(Aborted(summary));
        }
        summary.blocks_read = summary.blocks_read.saturating_add(1);
        note_block(&mut summary, block, index);
    }

    info!(
        "EDID read: {} block(s), max pixel clock {} kHz",
        summary.blocks_read,
        summary.max_pixel_clock_khz
    );
    Ok(summary)
}

fn note_block(summary: &mut EdidSummary, block: &[u8], index: u8) {
    if checksum_ok(block) {
        debug!("EDID block {} checksum OK", index);
    } else {
        warn!("EDID block {} checksum error", index);
        summary.checksums_ok = false;
    }
    summary.max_pixel_clock_khz = summary
        .max_pixel_clock_khz
        .max(block_max_pixel_clock_khz(block, index));
}

/// Rate needed to carry `pixel_clock_khz` at 24 bpp on `lanes`, capped at
/// `sink_max`. `None` when no timing was found.
#[must_use]
pub fn bandwidth_hint(pixel_clock_khz: u32, lanes: u8, sink_max: LinkBandwidth) -> Option<LinkBandwidth> {
    if pixel_clock_khz == 0 {
        return None;
    }
    let required = u64::from(pixel_clock_khz).saturating_mul(24);
    let wanted = LinkBandwidth::min_for(required, lanes).unwrap_or(sink_max);
    Some(wanted.min(sink_max))
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Fingerprint bytes: extension count, checksum, first six DTD bytes.
pub type Fingerprint = [u8; 8];

/// Fingerprint of a full block 0.
#[must_use]
pub fn fingerprint_of(data: &[u8; EDID_BUF_LEN]) -> Fingerprint {
    let mut fp = [0u8; 8];
    let tail = data.get(EXTENSION_COUNT..EDID_BLOCK_LEN).unwrap_or(&[]);
    let dtd = data.get(BASE_DTD_START..BASE_DTD_START.saturating_add(6)).unwrap_or(&[]);
    for (dst, src) in fp.iter_mut().zip(tail.iter().chain(dtd)) {
        *dst = *src;
    }
    fp
}

/// Re-read only the chunks holding the fingerprint bytes.
fn read_fingerprint<A: AuxChannel, D: DelayNs>(
    aux: &mut A,
    delay: &mut D,
    retry: &RetryPolicy,
) -> Option<Fingerprint> {
    let mut dtd_chunk = [0u8; CHUNK_LEN];
    let mut tail_chunk = [0u8; CHUNK_LEN];
    if !read_chunk(aux, delay, retry, 0, 0x30, &mut dtd_chunk)
        || !read_chunk(aux, delay, retry, 0, 0x70, &mut tail_chunk)
    {
        return None;
    }
    let mut fp = [0u8; 8];
    let tail = tail_chunk.get(0x0E..).unwrap_or(&[]);
    let dtd = dtd_chunk.get(0x06..0x0C).unwrap_or(&[]);
    for (dst, src) in fp.iter_mut().zip(tail.iter().chain(dtd)) {
        *dst = *src;
    }
    Some(fp)
}

/// EDID kept across connections.
#[derive(Debug, Clone)]
pub struct EdidCache {
    data: [u8; EDID_BUF_LEN],
    fingerprint: Fingerprint,
    max_pixel_clock_khz: u32,
    valid: bool,
}

impl Default for EdidCache {
    fn default() -> Self {
        Self {
            data: [0; EDID_BUF_LEN],
            fingerprint: [0; 8],
            max_pixel_clock_khz: 0,
            valid: false,
        }
    }
}

impl EdidCache {
    /// Cached EDID, if any.
    #[must_use]
    pub fn data(&self) -> Option<&[u8; EDID_BUF_LEN]> {
        self.valid.then_some(&self.data)
    }

    /// Largest pixel clock of the cached EDID.
    #[must_use]
    pub fn max_pixel_clock_khz(&self) -> u32 {
        self.max_pixel_clock_khz
    }

    /// Forget the cached EDID.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Reuse the cache if the attached sink still matches it, otherwise read
    /// the EDID again. Returns the largest pixel clock in kHz.
    pub fn acquire<A: AuxChannel, D: DelayNs>(&mut self, aux: &mut A, delay: &mut D, retry: &RetryPolicy) -> u32 {
        if self.valid {
            match read_fingerprint(aux, delay, retry) {
                Some(fp) if fp == self.fingerprint => {
                    info!("EDID unchanged, reusing cached copy");
                    return self.max_pixel_clock_khz;
                }
                Some(_) => info!("EDID fingerprint changed, re-reading"),
                None => warn!("EDID fingerprint unreadable, re-reading"),
            }
            self.valid = false;
        }

        match read_edid(aux, delay, retry, &mut self.data) {
            Ok(summary) => {
                self.fingerprint = fingerprint_of(&self.data);
                self.max_pixel_clock_khz = summary.max_pixel_clock_khz;
                self.valid = true;
                summary.max_pixel_clock_khz
            }
            Err(Aborted(summary)) => {
                warn!("EDID read aborted after {} block(s), using partial data", summary.blocks_read);
                self.max_pixel_clock_khz = summary.max_pixel_clock_khz;
                summary.max_pixel_clock_khz
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // fixed-size test blocks
mod tests {
    use super::*;

    fn block0_with_dtd(pclk_10khz: u16) -> [u8; EDID_BUF_LEN] {
        let mut d = [0u8; EDID_BUF_LEN];
        d[..8].copy_from_slice(&EDID_HEADER);
        d[0x36..0x38].copy_from_slice(&pclk_10khz.to_le_bytes());
        let sum = d[..127].iter().fold(0u8, |a, b| a.wrapping_add(*b));
        d[127] = 0u8.wrapping_sub(sum);
        d
    }

    #[test]
    fn checksum_of_built_block_is_ok() {
        let d = block0_with_dtd(14_850);
        assert!(checksum_ok(&d[..128]));
        let mut bad = d;
        bad[10] ^= 1;
        assert!(!checksum_ok(&bad[..128]));
    }

    #[test]
    fn base_block_pixel_clock() {
        let d = block0_with_dtd(14_850);
        assert_eq!(block_max_pixel_clock_khz(&d[..128], 0), 148_500);
    }

    #[test]
    fn cea_extension_dtds_are_scanned() {
        let mut ext = [0u8; 128];
        ext[0] = CEA_EXTENSION_TAG;
        ext[2] = 0x20;
        ext[0x20..0x22].copy_from_slice(&7_425u16.to_le_bytes());
        ext[0x32..0x34].copy_from_slice(&29_700u16.to_le_bytes());
        assert_eq!(block_max_pixel_clock_khz(&ext, 1), 297_000);
        ext[0] = 0x70;
        assert_eq!(block_max_pixel_clock_khz(&ext, 1), 0);
    }

    #[test]
    fn hint_is_capped_by_sink() {
        assert_eq!(bandwidth_hint(0, 1, LinkBandwidth::Rate5G4), None);
        assert_eq!(
            bandwidth_hint(148_500, 1, LinkBandwidth::Rate5G4),
            Some(LinkBandwidth::Rate5G4)
        );
        assert_eq!(
            bandwidth_hint(148_500, 1, LinkBandwidth::Rate2G7),
            Some(LinkBandwidth::Rate2G7)
        );
        // 1.62 Gbps carries 1.296 Gbps per lane, exactly 54 MHz at 24 bpp.
        assert_eq!(
            bandwidth_hint(54_000, 1, LinkBandwidth::Rate5G4),
            Some(LinkBandwidth::Rate1G62)
        );
        assert_eq!(
            bandwidth_hint(65_000, 1, LinkBandwidth::Rate5G4),
            Some(LinkBandwidth::Rate2G7)
        );
    }

    #[test]
    fn fingerprint_covers_tail_and_first_dtd() {
        let d = block0_with_dtd(14_850);
        let fp = fingerprint_of(&d);
        assert_eq!(fp[0], d[0x7E]);
        assert_eq!(fp[1], d[0x7F]);
        assert_eq!(&fp[2..], &d[0x36..0x3C]);
    }
}
