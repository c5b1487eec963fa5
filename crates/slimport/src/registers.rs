//! Transmitter register map.
//!
//! One module per register block. Offsets are one byte; bit masks live next
//! to the register they belong to. Interrupt status registers are
//! write-1-to-clear.

/// Transmitter families this core drives (DEVICE_ID_H:DEVICE_ID_L).
pub const CHIP_IDS: [u16; 3] = [0x7816, 0x7818, 0x7808];

/// Infoframe buffer layout shared by the receiver buffers and the
/// transmitter packet slots: HB0 type, HB1 version, HB2 length, PB0
/// checksum, PB1.. payload.
pub mod infoframe_slot {
    /// HB0: packet type.
    pub const TYPE: u8 = 0x00;
    /// HB1: version.
    pub const VERSION: u8 = 0x01;
    /// HB2: payload length.
    pub const LENGTH: u8 = 0x02;
    /// PB0: checksum.
    pub const CHECKSUM: u8 = 0x03;
    /// PB1: first payload byte.
    pub const PAYLOAD: u8 = 0x04;
    /// Largest payload a slot holds.
    pub const MAX_PAYLOAD: usize = 27;
    /// Bytes from HB0 to the last payload byte.
    pub const SLOT_LEN: usize = 4 + MAX_PAYLOAD;
}

/// TX page 0: link training, HDCP engine, stream timing.
pub mod tx_p0 {
    use platform::Device;

    /// Block this module describes.
    pub const DEV: Device = Device::TxP0;

    /// HDCP engine status.
    pub const HDCP_STATUS: u8 = 0x00;
    /// Authentication passed.
    pub const HDCP_AUTH_PASS: u8 = 1 << 1;
    /// Authentication failed.
    pub const HDCP_AUTH_FAIL: u8 = 1 << 5;

    /// HDCP control 0.
    pub const HDCP_CTRL0: u8 = 0x01;
    /// Hardware-assisted authentication enable.
    pub const HARD_AUTH_EN: u8 = 1 << 0;
    /// Link encryption enable.
    pub const ENC_EN: u8 = 1 << 2;
    /// KSV list from repeaters checked against SRM.
    pub const KSVLIST_VLD: u8 = 1 << 3;
    /// Re-authentication request.
    pub const RE_AUTH: u8 = 1 << 5;

    /// R0 calculation window.
    pub const HDCP_R0_TIMER: u8 = 0x40;
    /// KSV list ready window.
    pub const HDCP_KSV_TIMER: u8 = 0x41;

    /// System control 3.
    pub const SYS_CTRL3: u8 = 0x82;
    /// Outgoing stream timing is stable.
    pub const STRM_VALID: u8 = 1 << 2;

    /// System control 4.
    pub const SYS_CTRL4: u8 = 0x83;
    /// Enhanced framing mode.
    pub const ENHANCED_FRAMING: u8 = 1 << 3;

    /// Main-link bandwidth code (DPCD LINK_BW_SET encoding).
    pub const LINK_BW_SET: u8 = 0xA0;
    /// Main-link lane count.
    pub const LANE_COUNT_SET: u8 = 0xA1;
    /// Lane 0 drive settings.
    pub const TRAINING_LANE0_SET: u8 = 0xA3;
    /// Pre-emphasis field of TRAINING_LANE0_SET.
    pub const PRE_EMPHASIS_MASK: u8 = 0b0001_1000;
    /// Shift of the pre-emphasis field.
    pub const PRE_EMPHASIS_SHIFT: u8 = 3;
    /// Highest pre-emphasis level.
    pub const PRE_EMPHASIS_MAX: u8 = 3;

    /// Hardware link-training control.
    pub const LT_CTRL: u8 = 0xA8;
    /// Start hardware link training; self-clears when done.
    pub const LT_EN: u8 = 1 << 0;
    /// Non-zero when the last training attempt failed.
    pub const LT_ERR_MASK: u8 = 0b0111_0000;

    /// M_VID, 24-bit little endian.
    pub const M_VID_0: u8 = 0xC0;
    /// N_VID, 24-bit little endian.
    pub const N_VID_0: u8 = 0xC3;

    /// Link PLL control.
    pub const PLL_CTRL: u8 = 0xC7;
    /// PLL reset (hold high, then release).
    pub const PLL_RST: u8 = 1 << 6;
    /// Link PLL status.
    pub const PLL_STATUS: u8 = 0xC8;
    /// PLL locked.
    pub const PLL_LOCK: u8 = 1 << 0;
}

/// TX page 1: SerDes PHY.
pub mod tx_p1 {
    use platform::Device;

    /// Block this module describes.
    pub const DEV: Device = Device::TxP1;

    /// Analog power-down.
    pub const ANALOG_PD: u8 = 0x48;
    /// Lane 0 power-down.
    pub const CH0_PD: u8 = 1 << 0;
    /// Lane 1 power-down.
    pub const CH1_PD: u8 = 1 << 1;

    /// Spread-spectrum control.
    pub const SSC_CTRL: u8 = 0xA7;
    /// Spread-spectrum enable.
    pub const SSC_EN: u8 = 1 << 4;
    /// Spread-spectrum deviation.
    pub const SSC_DEVIATION: u8 = 0xB1;
}

/// TX page 2: system control, resets, A/V datapath, packets, interrupts.
pub mod tx_p2 {
    use platform::Device;

    /// Block this module describes.
    pub const DEV: Device = Device::TxP2;

    /// Device id, low byte.
    pub const DEVICE_ID_L: u8 = 0x02;
    /// Device id, high byte.
    pub const DEVICE_ID_H: u8 = 0x03;

    /// Reset control.
    pub const RST_CTRL: u8 = 0x05;
    /// Whole-chip logic reset.
    pub const SW_RST: u8 = 1 << 0;
    /// HDCP engine reset.
    pub const HDCP_RST: u8 = 1 << 2;

    /// Reset control 2.
    pub const RST_CTRL2: u8 = 0x06;
    /// AUX engine reset.
    pub const AUX_RST: u8 = 1 << 2;
    /// SerDes FIFO reset.
    pub const SERDES_FIFO_RST: u8 = 1 << 6;

    /// Block power-down.
    pub const POWERD_CTRL: u8 = 0x07;
    /// HDCP block.
    pub const HDCP_PD: u8 = 1 << 5;
    /// Audio block.
    pub const AUDIO_PD: u8 = 1 << 4;
    /// Video block.
    pub const VIDEO_PD: u8 = 1 << 3;
    /// Link block.
    pub const LINK_PD: u8 = 1 << 2;

    /// Video control 1.
    pub const VID_CTRL1: u8 = 0x08;
    /// Video datapath enable (input side).
    pub const VIDEO_EN: u8 = 1 << 7;
    /// Output video mute.
    pub const VIDEO_MUTE: u8 = 1 << 2;

    /// Video control 2.
    pub const VID_CTRL2: u8 = 0x09;
    /// Component depth field: 0 8 bit, 1 10 bit, 2 12 bit.
    pub const BPC_MASK: u8 = 0b0000_0011;
    /// Input is YCbCr.
    pub const IN_YCBCR: u8 = 1 << 2;
    /// Colour-space converter enable.
    pub const CSC_EN: u8 = 1 << 4;
    /// Converter uses the BT.709 matrix (BT.601 when clear).
    pub const CSC_BT709: u8 = 1 << 5;
    /// 4:4:4 to 4:2:2 down-sampler enable.
    pub const DOWNSAMPLE_EN: u8 = 1 << 6;

    /// Audio control.
    pub const AUD_CTRL: u8 = 0x0D;
    /// Audio datapath enable.
    pub const AUD_EN: u8 = 1 << 0;
    /// Audio mute.
    pub const AUD_MUTE: u8 = 1 << 1;

    /// First of five IEC 60958 channel-status bytes.
    pub const AUD_CH_STATUS_0: u8 = 0x30;

    /// Infoframe packet enables.
    pub const PACKET_CTRL: u8 = 0x70;
    /// AVI infoframe.
    pub const AVI_EN: u8 = 1 << 0;
    /// SPD infoframe.
    pub const SPD_EN: u8 = 1 << 1;
    /// Vendor-specific infoframe.
    pub const VSI_EN: u8 = 1 << 2;
    /// Audio infoframe.
    pub const AUD_IF_EN: u8 = 1 << 3;

    /// AVI packet slot.
    pub const AVI_SLOT: u8 = 0x80;
    /// SPD packet slot.
    pub const SPD_SLOT: u8 = 0xA0;
    /// Vendor-specific packet slot.
    pub const VSI_SLOT: u8 = 0xC0;
    /// Audio infoframe slot.
    pub const AUD_SLOT: u8 = 0x40;

    /// Common interrupt 1 (W1C).
    pub const COMMON_INT1: u8 = 0xF1;
    /// Link PLL lock changed.
    pub const PLL_LOCK_CHG: u8 = 1 << 0;

    /// Common interrupt 2 (W1C).
    pub const COMMON_INT2: u8 = 0xF2;
    /// Hardware authentication finished.
    pub const HDCP_AUTH_DONE: u8 = 1 << 0;
    /// Periodic link-integrity check failed.
    pub const HDCP_LINK_CHK_FAIL: u8 = 1 << 1;

    /// DisplayPort interrupt (W1C).
    pub const DP_INT: u8 = 0xF7;
    /// Hardware link training finished.
    pub const TRAINING_FINISHED: u8 = 1 << 0;
    /// Sink reported a link status change.
    pub const LINK_CHANGED: u8 = 1 << 1;
    /// HPD dropped.
    pub const HPD_LOST: u8 = 1 << 2;
    /// HPD IRQ pulse: sink wants the service vector read.
    pub const SINK_IRQ: u8 = 1 << 3;

    /// Mask for COMMON_INT1 (1 = enabled).
    pub const COMMON_INT_MASK1: u8 = 0xF8;
    /// Mask for COMMON_INT2.
    pub const COMMON_INT_MASK2: u8 = 0xF9;
    /// Mask for DP_INT.
    pub const DP_INT_MASK: u8 = 0xFE;
}

/// RX page 0: HDMI receiver status and interrupts.
pub mod rx_p0 {
    use platform::Device;

    /// Block this module describes.
    pub const DEV: Device = Device::RxP0;

    /// Receiver status.
    pub const SYS_STATUS: u8 = 0x14;
    /// TMDS clock detected.
    pub const CKDT: u8 = 1 << 0;
    /// Sync detected.
    pub const SCDT: u8 = 1 << 1;

    /// Input mode.
    pub const HDMI_STATUS: u8 = 0x15;
    /// Input is HDMI (DVI when clear).
    pub const HDMI_MODE: u8 = 1 << 0;

    /// Input-side HDCP status.
    pub const HDCP_STATUS: u8 = 0x16;
    /// Incoming stream is encrypted.
    pub const ENCRYPTED: u8 = 1 << 0;

    /// Deep-colour status, bits 1:0: 0 legacy, 1 24, 2 30, 3 36 bpp.
    pub const DEEP_COLOR: u8 = 0x17;

    /// Receiver interrupt 1 (W1C).
    pub const RX_INT1: u8 = 0x71;
    /// Clock-detect changed.
    pub const CKDT_CHG: u8 = 1 << 0;
    /// Sync-detect changed.
    pub const SCDT_CHG: u8 = 1 << 1;
    /// HDMI/DVI mode changed.
    pub const HDMI_DVI_CHG: u8 = 1 << 2;

    /// Receiver interrupt 2 (W1C).
    pub const RX_INT2: u8 = 0x72;
    /// New AVI infoframe.
    pub const NEW_AVI: u8 = 1 << 0;
    /// New SPD infoframe.
    pub const NEW_SPD: u8 = 1 << 1;
    /// New vendor-specific infoframe.
    pub const NEW_VSI: u8 = 1 << 2;
    /// New audio infoframe.
    pub const NEW_AUD_IF: u8 = 1 << 3;

    /// Receiver interrupt 3 (W1C).
    pub const RX_INT3: u8 = 0x73;
    /// Audio clock regeneration (CTS) packet received.
    pub const CTS_RCV: u8 = 1 << 0;
    /// Audio sample packet received.
    pub const AUDIO_RCV: u8 = 1 << 1;

    /// Mask for RX_INT1 (1 = enabled).
    pub const RX_INT_MASK1: u8 = 0x75;
    /// Mask for RX_INT2.
    pub const RX_INT_MASK2: u8 = 0x76;
    /// Mask for RX_INT3.
    pub const RX_INT_MASK3: u8 = 0x77;

    /// First of five received channel-status bytes.
    pub const AUD_CH_STATUS_0: u8 = 0xC7;
}

/// RX page 1: received infoframe buffers.
pub mod rx_p1 {
    use platform::Device;

    /// Block this module describes.
    pub const DEV: Device = Device::RxP1;

    /// AVI infoframe buffer.
    pub const AVI_BUF: u8 = 0x00;
    /// SPD infoframe buffer.
    pub const SPD_BUF: u8 = 0x20;
    /// Vendor-specific infoframe buffer.
    pub const VSI_BUF: u8 = 0x40;
    /// Audio infoframe buffer.
    pub const AUD_BUF: u8 = 0x60;
}
