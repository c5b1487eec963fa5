//! Video datapath configuration.
//!
//! Waits for a stable HDMI input and a stable transmitter stream, measures
//! the pixel clock from the link's M/N values, and decides whether the
//! stream fits the trained link. A stream that does not fit first asks for
//! a faster link; when no faster rate is allowed it is down-sampled from
//! 4:4:4 to 4:2:2.

use embedded_hal::delay::DelayNs;
use platform::Hardware;

use crate::detect::CableType;
use crate::infoframe::{self, ColorFormat, Colorimetry, InfoFrame, InfoFrameKind};
use crate::link::{LinkBandwidth, LinkTrainer};
use crate::registers::{rx_p0, tx_p0, tx_p2};
use crate::session::Ctx;
use crate::state::{Outcome, SystemState};
use crate::Result;

/// Video output sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VideoOutputState {
    /// Waiting for TMDS clock and sync on the HDMI input.
    #[default]
    WaitInputStable,
    /// Waiting for the transmitter to lock onto the stream.
    WaitTxStable,
    /// Measure the stream and configure the datapath.
    CheckVideoInfo,
    /// Video unmuted.
    Finish,
}

/// Bits per pixel for the DEEP_COLOR field.
#[must_use]
pub const fn bits_per_pixel(deep_color: u8) -> u8 {
    match deep_color & 0x03 {
        0 | 1 => 24,
        2 => 30,
        _ => 36,
    }
}

/// Link payload needed for `pixel_clock_khz` at `bpp`, in kbit/s.
/// 4:2:2 carries two thirds of the 4:4:4 bits.
#[must_use]
pub fn required_kbps(pixel_clock_khz: u32, bpp: u8, downsampled: bool) -> u64 {
    let full = u64::from(pixel_clock_khz).saturating_mul(u64::from(bpp));
    if downsampled {
        full.saturating_mul(2).checked_div(3).unwrap_or(full)
    } else {
        full
    }
}

/// Pick the CSC matrix: explicit colorimetry wins, otherwise SD video
/// codes use BT.601 and everything else BT.709.
#[must_use]
pub fn uses_bt709(avi: Option<&InfoFrame>) -> bool {
    avi.is_some_and(|f| match f.colorimetry() {
        Colorimetry::Bt709 => true,
        Colorimetry::Bt601 => false,
        Colorimetry::NoData | Colorimetry::Extended => !infoframe::is_sd_vic(f.vic()),
    })
}

/// Video output configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VideoOutput {
    state: VideoOutputState,
    tx_wait_ticks: u8,
    hdmi_input: bool,
    downsampled: bool,
    configured: bool,
    pixel_clock_khz: u32,
}

impl VideoOutput {
    /// Current sub-state.
    #[must_use]
    pub const fn state(&self) -> VideoOutputState {
        self.state
    }

    /// The input carries HDMI (and therefore audio) rather than DVI.
    #[must_use]
    pub const fn hdmi_input(&self) -> bool {
        self.hdmi_input
    }

    /// 4:2:2 down-sampling is active.
    #[must_use]
    pub const fn downsampled(&self) -> bool {
        self.downsampled
    }

    /// Output is configured and infoframes are being forwarded.
    #[must_use]
    pub const fn configured(&self) -> bool {
        self.configured
    }

    /// Last measured pixel clock.
    #[must_use]
    pub const fn pixel_clock_khz(&self) -> u32 {
        self.pixel_clock_khz
    }

    /// Back to `WaitInputStable`.
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    /// Run as many sub-states as complete immediately.
    ///
    /// `limit` is the fastest rate link training may use; `bw_hint` is set
    /// when the stream needs a faster link than the one trained.
    pub(crate) fn step<H: Hardware, D: DelayNs>(
        &mut self,
        ctx: &mut Ctx<'_, H, D>,
        cable: CableType,
        link: &LinkTrainer,
        limit: LinkBandwidth,
        bw_hint: &mut Option<LinkBandwidth>,
    ) -> Result<Outcome> {
        loop {
            match self.state {
                VideoOutputState::WaitInputStable => {
                    let status = ctx.hw.read(rx_p0::DEV, rx_p0::SYS_STATUS)?;
                    let stable = rx_p0::CKDT | rx_p0::SCDT;
                    if status & stable != stable {
                        trace!("HDMI input not stable ({:#x})", status);
                        return Ok(Outcome::Continue);
                    }
                    self.hdmi_input = ctx.hw.read(rx_p0::DEV, rx_p0::HDMI_STATUS)? & rx_p0::HDMI_MODE != 0;
                    ctx.hw.set_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_EN)?;
                    debug!("{} input stable", if self.hdmi_input { "HDMI" } else { "DVI" });
                    self.tx_wait_ticks = 0;
                    self.state = VideoOutputState::WaitTxStable;
                }
                VideoOutputState::WaitTxStable => {
                    if ctx.hw.read(tx_p0::DEV, tx_p0::SYS_CTRL3)? & tx_p0::STRM_VALID != 0 {
                        self.state = VideoOutputState::CheckVideoInfo;
                        continue;
                    }
                    self.tx_wait_ticks = self.tx_wait_ticks.saturating_add(1);
                    if self.tx_wait_ticks > ctx.config.retry.tx_stable_ticks {
                        warn!("transmitter stream not stable after {} ticks", self.tx_wait_ticks);
                        return Ok(Outcome::Retry);
                    }
                    return Ok(Outcome::Continue);
                }
                VideoOutputState::CheckVideoInfo => return self.check_video_info(ctx, cable, link, limit, bw_hint),
                VideoOutputState::Finish => return Ok(Outcome::Advance),
            }
        }
    }

    fn check_video_info<H: Hardware, D: DelayNs>(
        &mut self,
        ctx: &mut Ctx<'_, H, D>,
        cable: CableType,
        link: &LinkTrainer,
        limit: LinkBandwidth,
        bw_hint: &mut Option<LinkBandwidth>,
    ) -> Result<Outcome> {
        let bw = link.bandwidth().unwrap_or(LinkBandwidth::Rate1G62);
        let lanes = link.lanes().max(1);

        let m = read_u24(ctx.hw, tx_p0::M_VID_0)?;
        let n = read_u24(ctx.hw, tx_p0::N_VID_0)?;
        let Some(pclk) = u64::from(bw.link_khz())
            .saturating_mul(u64::from(m))
            .checked_div(u64::from(n))
        else {
            trace!("N_VID not latched yet");
            return Ok(Outcome::Continue);
        };
        self.pixel_clock_khz = u32::try_from(pclk).unwrap_or(u32::MAX);

        let deep = ctx.hw.read(rx_p0::DEV, rx_p0::DEEP_COLOR)?;
        let bpp = bits_per_pixel(deep);
        let capacity = bw.payload_kbps(lanes);
        let required = required_kbps(self.pixel_clock_khz, bpp, false);
        info!(
            "input {} kHz at {} bpp needs {} kbps, link carries {}",
            self.pixel_clock_khz,
            bpp,
            required,
            capacity
        );

        self.downsampled = false;
        if required > capacity {
            if let Some(faster) = bw.higher().filter(|f| *f <= limit) {
                warn!("link too slow for the input, retraining at {:?}", faster);
                *bw_hint = Some(faster);
                return Ok(Outcome::Rollback(SystemState::LinkTraining));
            }
            self.downsampled = true;
            if required_kbps(self.pixel_clock_khz, bpp, true) > capacity {
                warn!("input exceeds the link even at 4:2:2");
            } else {
                info!("down-sampling to 4:2:2 to fit {:?}", bw);
            }
        }

        let avi = infoframe::read_received(ctx.hw, InfoFrameKind::Avi)?;
        self.configure_datapath(ctx, cable, deep, avi.as_ref())?;

        if let Some(mut frame) = avi {
            if self.downsampled {
                frame.set_color_format(ColorFormat::YCbCr422);
            }
            infoframe::publish(ctx.hw, InfoFrameKind::Avi, &frame)?;
        }
        infoframe::forward(ctx.hw, InfoFrameKind::Spd)?;
        infoframe::forward(ctx.hw, InfoFrameKind::Vendor)?;

        ctx.hw.clear_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
        self.configured = true;
        self.state = VideoOutputState::Finish;
        info!("video output on");
        Ok(Outcome::Advance)
    }

    fn configure_datapath<H: Hardware, D: DelayNs>(
        &self,
        ctx: &mut Ctx<'_, H, D>,
        cable: CableType,
        deep: u8,
        avi: Option<&InfoFrame>,
    ) -> Result<()> {
        let ycbcr = avi.is_some_and(|f| f.color_format() != ColorFormat::Rgb);
        let mut ctrl = match bits_per_pixel(deep) {
            24 => 0,
            30 => 1,
            _ => 2,
        };
        if ycbcr {
            ctrl |= tx_p2::IN_YCBCR;
        }
        if cable.is_analog() && ycbcr {
            ctrl |= tx_p2::CSC_EN;
            if uses_bt709(avi) {
                ctrl |= tx_p2::CSC_BT709;
            }
            debug!("CSC on, BT.709 {}", ctrl & tx_p2::CSC_BT709 != 0);
        }
        if self.downsampled {
            ctrl |= tx_p2::DOWNSAMPLE_EN;
        }
        ctx.hw.write(tx_p2::DEV, tx_p2::VID_CTRL2, ctrl)?;
        Ok(())
    }

    /// A new infoframe arrived on the input after output was configured.
    pub(crate) fn on_new_infoframe<H: Hardware>(&self, hw: &mut H, kind: InfoFrameKind) -> Result<()> {
        if !self.configured {
            return Ok(());
        }
        debug!("re-forwarding {:?} infoframe", kind);
        if kind == InfoFrameKind::Avi && self.downsampled {
            if let Some(mut frame) = infoframe::read_received(hw, kind)? {
                frame.set_color_format(ColorFormat::YCbCr422);
                infoframe::publish(hw, kind, &frame)?;
            }
            return Ok(());
        }
        infoframe::forward(hw, kind)?;
        Ok(())
    }
}

fn read_u24<H: Hardware>(hw: &mut H, base: u8) -> Result<u32> {
    let mut raw = [0u8; 4];
    for (offset, byte) in (base..).zip(raw.iter_mut()).take(3) {
        *byte = hw.read(tx_p0::DEV, offset)?;
    }
    Ok(u32::from_le_bytes(raw))
}

/// Mute the output.
pub(crate) fn mute<H: Hardware>(hw: &mut H) -> Result<()> {
    hw.set_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_colour_decoding() {
        assert_eq!(bits_per_pixel(0), 24);
        assert_eq!(bits_per_pixel(1), 24);
        assert_eq!(bits_per_pixel(2), 30);
        assert_eq!(bits_per_pixel(3), 36);
    }

    #[test]
    fn downsampling_saves_a_third() {
        assert_eq!(required_kbps(148_500, 24, false), 3_564_000);
        assert_eq!(required_kbps(148_500, 24, true), 2_376_000);
    }

    #[test]
    fn csc_matrix_selection() {
        assert!(!uses_bt709(None));
    }
}
