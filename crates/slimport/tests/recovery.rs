//! Degradation and recovery paths: training step-down, symbol errors, HDCP
//! failures, lost alignment, AUX loss and audio that will not settle.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

mod common;

use common::{bridge, bridge_with, tick_until, ticks};
use platform::Device;
use slimport::dpcd;
use slimport::hdcp::HdcpState;
use slimport::mock::SimChip;
use slimport::registers::{infoframe_slot, rx_p0, tx_p0, tx_p2};
use slimport::{BridgeConfig, LinkBandwidth, SystemState};

#[test]
fn training_steps_down_after_repeated_failures() {
    let mut chip = SimChip::displayport_sink();
    chip.set_link_training_max_code(LinkBandwidth::Rate2G7.code());
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 40).is_some());

    // Three failed attempts at 5.4 Gbps, then one good one at 2.7 Gbps.
    assert_eq!(b.hardware().lt_arms(), 4);
    assert_eq!(b.session().link().bandwidth(), Some(LinkBandwidth::Rate2G7));
    // 1080p does not fit 2.7 Gbps x1 and the ceiling forbids going back up.
    assert!(b.session().video().downsampled());
}

#[test]
fn sink_limited_link_downsamples_and_rewrites_avi() {
    let mut chip = SimChip::displayport_sink();
    chip.set_dpcd(dpcd::MAX_LINK_RATE, &[LinkBandwidth::Rate2G7.code()]);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.hardware().lt_arms(), 1);
    assert!(b.session().video().downsampled());
    let chip = b.hardware();
    assert_ne!(chip.reg(Device::TxP2, tx_p2::VID_CTRL2) & tx_p2::DOWNSAMPLE_EN, 0);

    let pb1 = chip.reg(Device::TxP2, tx_p2::AVI_SLOT + 4);
    assert_eq!(pb1 & 0b0110_0000, 0b0010_0000, "AVI Y field is 4:2:2");
    let sum = (0..infoframe_slot::SLOT_LEN as u8)
        .map(|i| chip.reg(Device::TxP2, tx_p2::AVI_SLOT + i))
        .fold(0u8, u8::wrapping_add);
    assert_eq!(sum, 0, "AVI checksum recomputed");
}

#[test]
fn hdcp_failures_past_threshold_force_reset() {
    let mut chip = SimChip::displayport_sink();
    chip.set_hdcp_passes(false);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::HdcpAuth, 20).is_some());
    assert!(tick_until(&mut b, SystemState::WaitCable, 40).is_some());

    let threshold = u32::from(b.config().retry.hdcp_fail_threshold);
    assert_eq!(b.hardware().hdcp_arms(), threshold + 1);
    assert_eq!(b.hdcp_failures(), 0);
    assert!(!b.hardware().powered());
    assert_eq!(b.hardware().power_downs(), 2);
}

#[test]
fn hdcp_failures_below_threshold_keep_retrying() {
    let mut chip = SimChip::displayport_sink();
    chip.set_hdcp_passes(false);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::HdcpAuth, 20).is_some());
    ticks(&mut b, 2);
    assert_eq!(b.state(), SystemState::HdcpAuth);
    assert_eq!(b.hdcp_failures(), 2);
    assert_eq!(b.session().hdcp().state(), HdcpState::WaitingFinish);

    b.hardware_mut().set_hdcp_passes(true);
    assert!(tick_until(&mut b, SystemState::Playback, 10).is_some());
    assert_eq!(b.hdcp_failures(), 0);
    assert!(b.session().hdcp().encryption_enabled());
}

#[test]
fn link_integrity_loss_reauthenticates() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    let recoveries = b.top().recoveries();

    b.hardware_mut()
        .raise(Device::TxP2, tx_p2::COMMON_INT2, tx_p2::HDCP_LINK_CHK_FAIL);
    b.tick();
    assert_eq!(b.state(), SystemState::HdcpAuth);
    assert_eq!(b.top().recoveries(), recoveries + 1);
    assert_eq!(b.hardware().reg(Device::TxP0, tx_p0::HDCP_CTRL0) & tx_p0::ENC_EN, 0);

    assert!(tick_until(&mut b, SystemState::Playback, 10).is_some());
    assert_eq!(b.hardware().hdcp_arms(), 2);
    assert_eq!(b.hardware().lt_arms(), 1);
    assert!(b.session().hdcp().encryption_enabled());
}

#[test]
fn topology_overflow_keeps_encryption_off_and_video_muted() {
    let mut chip = SimChip::displayport_sink();
    chip.set_dpcd(dpcd::BINFO, &[dpcd::BINFO_MAX_DEVS_EXCEEDED, 0x00]);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    let hdcp = b.session().hdcp();
    assert!(hdcp.topology_limited());
    assert!(!hdcp.encryption_enabled());
    assert_ne!(b.hardware().reg(Device::TxP2, tx_p2::VID_CTRL1) & tx_p2::VIDEO_MUTE, 0);
}

#[test]
fn lost_alignment_with_same_sink_retrains() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    b.hardware_mut().set_lane_aligned(false);
    b.tick();
    assert_eq!(b.state(), SystemState::LinkTraining);

    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    assert_eq!(b.hardware().lt_arms(), 2);
    assert_eq!(b.hardware().hdcp_arms(), 2);
}

#[test]
fn lost_alignment_with_silent_sink_forces_reset() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    let chip = b.hardware_mut();
    chip.set_lane_aligned(false);
    chip.set_dpcd(dpcd::DPCD_REV, &[0x00]);
    b.tick();
    assert_eq!(b.state(), SystemState::WaitCable);
    assert!(!b.hardware().powered());
    assert_eq!(b.hardware().lt_arms(), 1);
}

#[test]
fn aux_loss_in_playback_forces_reset() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    b.hardware_mut().set_aux_fault(true);
    b.tick();
    assert_eq!(b.state(), SystemState::WaitCable);
    assert!(!b.hardware().powered());
}

#[test]
fn input_clock_change_reconfigures_video() {
    let mut b = bridge(SimChip::displayport_sink());
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    b.hardware_mut().raise(Device::RxP0, rx_p0::RX_INT1, rx_p0::CKDT_CHG);
    b.tick();
    assert_eq!(b.state(), SystemState::VideoOutput);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    assert_eq!(b.hardware().lt_arms(), 1);
}

#[test]
fn audio_without_agreeing_interrupts_never_unmutes() {
    let mut chip = SimChip::displayport_sink();
    chip.set_audio_streaming(false);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::AudioOutput, 20).is_some());

    // CTS and samples on alternate ticks: never both in one tick.
    for i in 0..6 {
        let bit = if i % 2 == 0 {
            rx_p0::CTS_RCV
        } else {
            rx_p0::AUDIO_RCV
        };
        b.hardware_mut().raise(Device::RxP0, rx_p0::RX_INT3, bit);
        b.tick();
    }
    assert_eq!(b.state(), SystemState::AudioOutput);
    assert_eq!(b.hardware().reg(Device::TxP2, tx_p2::AUD_CTRL) & tx_p2::AUD_EN, 0);

    b.hardware_mut().set_audio_streaming(true);
    assert!(tick_until(&mut b, SystemState::Playback, 3).is_some());
    assert_ne!(b.hardware().reg(Device::TxP2, tx_p2::AUD_CTRL) & tx_p2::AUD_EN, 0);
}

#[test]
fn dvi_input_skips_audio() {
    let mut chip = SimChip::displayport_sink();
    chip.set_reg(Device::RxP0, rx_p0::HDMI_STATUS, 0);
    chip.set_audio_streaming(false);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    assert!(!b.session().video().hdmi_input());
    assert_eq!(b.hardware().reg(Device::TxP2, tx_p2::AUD_CTRL) & tx_p2::AUD_EN, 0);
}

#[test]
fn sink_rate_drop_between_attempts_is_followed() {
    let mut config = BridgeConfig::default();
    config.policy.skip_edid = true;
    let mut chip = SimChip::displayport_sink();
    chip.set_input_pixel_clock_khz(74_250);
    chip.set_link_training_max_code(LinkBandwidth::Rate2G7.code());
    let mut b = bridge_with(chip, config);

    b.tick();
    assert_eq!(b.hardware().lt_arms(), 1);
    assert_eq!(
        b.hardware().reg(Device::TxP0, tx_p0::LINK_BW_SET),
        LinkBandwidth::Rate5G4.code()
    );
    // The sink lowers its advertised rate while the first attempt fails.
    b.hardware_mut()
        .set_dpcd(dpcd::MAX_LINK_RATE, &[LinkBandwidth::Rate2G7.code()]);

    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    // No further attempts at 5.4 Gbps before the rate check.
    assert_eq!(b.hardware().lt_arms(), 2);
    assert_eq!(b.session().link().bandwidth(), Some(LinkBandwidth::Rate2G7));
    assert!(!b.session().video().downsampled());
}

#[test]
fn pre_emphasis_bump_is_kept_when_it_helps() {
    let mut chip = SimChip::displayport_sink();
    chip.set_symbol_errors([0x20, 0x04, 0x04, 0x04]);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.hardware().pre_emphasis_level(), 1);
    assert_eq!(b.hardware().lt_arms(), 1);
    assert_eq!(b.hardware().fifo_resets(), 0);
}

#[test]
fn pre_emphasis_bump_is_reverted_when_it_hurts() {
    let mut chip = SimChip::displayport_sink();
    chip.set_symbol_errors([0x20, 0x40, 0x40, 0x40]);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.hardware().pre_emphasis_level(), 0);
    assert_eq!(b.hardware().lt_arms(), 1);
}

#[test]
fn chronic_symbol_errors_clear_after_a_fifo_reset() {
    let mut chip = SimChip::displayport_sink();
    chip.set_symbol_errors([0x200; 4]);
    chip.set_fifo_reset_clears_errors(true);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());

    assert_eq!(b.hardware().fifo_resets(), 1);
    assert_eq!(b.hardware().lt_arms(), 2);
    assert_eq!(b.session().link().bandwidth(), Some(LinkBandwidth::Rate5G4));
    assert_eq!(b.session().link().fifo_resets(), 0);
}

#[test]
fn chronic_symbol_errors_step_down_then_force_reset() {
    let mut chip = SimChip::displayport_sink();
    chip.set_symbol_errors([0x200; 4]);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::WaitCable, 60).is_some());

    // Every rate gets its FIFO resets, the slowest one gives up.
    let per_rate = u32::from(b.config().retry.fifo_resets_per_rate);
    assert_eq!(b.hardware().lt_arms(), 3 * per_rate);
    assert_eq!(b.hardware().fifo_resets(), 3 * per_rate);
    assert!(!b.hardware().powered());
    assert_eq!(b.hardware().power_downs(), 2);
}

#[test]
fn downstream_video_never_ready_forces_reset() {
    let mut chip = SimChip::hdmi_converter();
    chip.set_downstream_video_ready(false);
    let mut b = bridge(chip);
    assert!(tick_until(&mut b, SystemState::WaitCable, 20).is_some());

    assert_eq!(b.hardware().lt_arms(), 1);
    assert_eq!(b.hardware().hdcp_arms(), 0);
    assert!(!b.hardware().powered());

    b.hardware_mut().set_downstream_video_ready(true);
    assert!(tick_until(&mut b, SystemState::Playback, 20).is_some());
    assert_eq!(b.hardware().hdcp_arms(), 1);
    assert!(b.session().hdcp().encryption_enabled());
}
