//! Type system enforcement tests for audio domain newtypes.

// ── VolumePercent ────────────────────────────────────────────────────────────

#[test]
fn volume_percent_new_clamps_over_100() {
    use platform::audio_types::VolumePercent;
    let v = VolumePercent::new(150);
    assert_eq!(v.get(), 100, "VolumePercent::new(150) should clamp to 100");
}

#[test]
fn volume_percent_bounds_are_kept() {
    use platform::audio_types::VolumePercent;
    assert_eq!(VolumePercent::new(0), VolumePercent::MUTE);
    assert_eq!(VolumePercent::new(100), VolumePercent::MAX);
}

#[test]
fn volume_percent_try_new_rejects_over_100() {
    use platform::audio_types::VolumePercent;
    assert!(VolumePercent::try_new(101).is_err());
    assert!(VolumePercent::try_new(255).is_err());
    assert!(VolumePercent::try_new(50).is_ok());
}

#[test]
fn volume_percent_saturating_from_wide_values() {
    use platform::audio_types::VolumePercent;
    assert_eq!(VolumePercent::saturating_from(42).get(), 42);
    assert_eq!(VolumePercent::saturating_from(101).get(), 100);
    assert_eq!(VolumePercent::saturating_from(u32::MAX).get(), 100);
}

#[test]
fn volume_percent_is_one_byte() {
    use platform::audio_types::VolumePercent;
    assert_eq!(core::mem::size_of::<VolumePercent>(), 1);
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

#[test]
fn sample_rate_hz_rejects_below_minimum() {
    use platform::audio_types::SampleRateHz;
    assert!(SampleRateHz::new(0).is_err());
    assert!(SampleRateHz::new(7999).is_err());
}

#[test]
fn sample_rate_hz_accepts_standard_rates() {
    use platform::audio_types::SampleRateHz;
    assert!(SampleRateHz::new(44100).is_ok());
    assert!(SampleRateHz::new(48000).is_ok());
    assert!(SampleRateHz::new(768_000).is_ok());
    assert!(SampleRateHz::new(768_001).is_err());
}

#[test]
fn sample_rate_hz_opus_is_48khz() {
    use platform::audio_types::SampleRateHz;
    assert_eq!(SampleRateHz::OPUS.get(), 48_000);
}

// ── ChannelCount ─────────────────────────────────────────────────────────────

#[test]
fn channel_count_accepts_mono_and_stereo_only() {
    use platform::audio_types::ChannelCount;
    assert!(ChannelCount::new(0).is_err());
    assert_eq!(ChannelCount::new(1).ok(), Some(ChannelCount::MONO));
    assert_eq!(ChannelCount::new(2).ok(), Some(ChannelCount::STEREO));
    assert!(ChannelCount::new(3).is_err());
}

#[test]
fn channel_count_error_reports_range() {
    use platform::audio_types::{ChannelCount, OutOfRangeError};
    assert_eq!(
        ChannelCount::new(6),
        Err(OutOfRangeError { value: 6, min: 1, max: 2 })
    );
}

// ── AudioConfig ──────────────────────────────────────────────────────────────

#[test]
fn audio_config_default_is_valid_stereo_48k() {
    use platform::AudioConfig;
    let config = AudioConfig::default();
    assert_eq!(config.sample_rate, 48_000);
    assert_eq!(config.channels, 2);
    assert!(config.validate().is_ok());
}

#[test]
fn audio_config_rejects_surround() {
    use platform::AudioConfig;
    let config = AudioConfig { channels: 6, ..AudioConfig::default() };
    assert!(config.validate().is_err());
}
