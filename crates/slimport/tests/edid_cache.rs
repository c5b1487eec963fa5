//! EDID acquisition across reconnects.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use common::{bridge, tick_until};
use slimport::mock::{build_cea_extension, build_edid, SimChip};
use slimport::{CableType, LinkBandwidth, SystemState};

const CHUNKS_PER_BLOCK: u32 = 8;
const FINGERPRINT_CHUNKS: u32 = 2;

fn replug(b: &mut common::SimBridge) {
    b.hardware_mut().set_present(false);
    b.tick();
    assert_eq!(b.state(), SystemState::WaitCable);
    b.hardware_mut().set_present(true);
}

#[test]
fn same_sink_reuses_cached_edid() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    assert_eq!(b.hardware().edid_chunk_reads(), CHUNKS_PER_BLOCK);
    assert_eq!(b.edid_cache().max_pixel_clock_khz(), 148_500);

    replug(&mut b);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    assert_eq!(
        b.hardware().edid_chunk_reads(),
        CHUNKS_PER_BLOCK + FINGERPRINT_CHUNKS
    );
    assert_eq!(b.session().bandwidth_hint(), Some(LinkBandwidth::Rate5G4));
}

#[test]
fn different_sink_rereads_edid() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    replug(&mut b);
    b.hardware_mut().load_edid(&build_edid(14_850, 0, 2));
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(
        b.hardware().edid_chunk_reads(),
        2 * CHUNKS_PER_BLOCK + FINGERPRINT_CHUNKS
    );
    assert_eq!(b.edid_cache().data().unwrap()[0x0C], 2);
}

#[test]
fn extension_blocks_raise_the_pixel_clock() {
    let mut rom = [0u8; 256];
    rom[..128].copy_from_slice(&build_edid(7_425, 1, 1));
    rom[128..].copy_from_slice(&build_cea_extension(&[14_850, 2_700]));
    let mut chip = SimChip::displayport_sink();
    chip.load_edid(&rom);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.hardware().edid_chunk_reads(), 2 * CHUNKS_PER_BLOCK);
    assert_eq!(b.edid_cache().max_pixel_clock_khz(), 148_500);
    let data = b.edid_cache().data().unwrap();
    assert_eq!(data[128], 0x02);
}

#[test]
fn transient_chunk_failures_are_retried() {
    let mut chip = SimChip::displayport_sink();
    chip.fail_next_edid_reads(3);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.hardware().edid_chunk_reads(), CHUNKS_PER_BLOCK + 3);
    assert!(b.edid_cache().data().is_some());
}

#[test]
fn unreadable_edid_falls_back_to_sink_maximum() {
    let mut chip = SimChip::displayport_sink();
    chip.fail_next_edid_reads(1_000);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    let retries = u32::from(b.config().retry.edid_chunk_retries);
    assert_eq!(b.hardware().edid_chunk_reads(), retries);
    assert!(b.edid_cache().data().is_none());
    assert_eq!(b.session().bandwidth_hint(), None);
    assert_eq!(b.session().link().bandwidth(), Some(LinkBandwidth::Rate5G4));
}

#[test]
fn blocks_past_the_first_segment_use_the_segment_pointer() {
    let mut rom = [0u8; 512];
    rom[..128].copy_from_slice(&build_edid(7_425, 3, 1));
    rom[128..256].copy_from_slice(&build_cea_extension(&[7_425]));
    // Only reachable as segment 1, offset 0.
    rom[256..384].copy_from_slice(&build_cea_extension(&[14_850]));
    rom[384..].copy_from_slice(&build_cea_extension(&[2_700]));
    let mut chip = SimChip::displayport_sink();
    chip.load_edid(&rom);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.hardware().edid_chunk_reads(), 4 * CHUNKS_PER_BLOCK);
    assert_eq!(b.edid_cache().max_pixel_clock_khz(), 148_500);
    assert_eq!(b.session().bandwidth_hint(), Some(LinkBandwidth::Rate5G4));
    // Blocks 0 and 1 are kept.
    let data = b.edid_cache().data().unwrap();
    assert_eq!(data[0x7E], 3);
    assert_eq!(data[128], 0x02);
}

#[test]
fn cable_type_change_discards_cached_edid() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    assert_eq!(b.hardware().edid_chunk_reads(), CHUNKS_PER_BLOCK);

    // Same EDID behind a converter this time.
    replug(&mut b);
    *b.hardware_mut() = SimChip::hdmi_converter();
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.session().cable(), CableType::HdmiConverter);
    // Full read, no fingerprint check.
    assert_eq!(b.hardware().edid_chunk_reads(), CHUNKS_PER_BLOCK);
}
