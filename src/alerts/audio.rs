//! Alert tones
//!
//! Audio is best-effort: the alert engine builds its [`ToneSink`] lazily through a
//! factory and logs, never propagates, any [`AudioError`].

use super::AlertKind;
use crate::error::{AudioError, VigilError};
use serde::{Deserialize, Serialize};

/// A short sine cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f32,
    /// Linear amplitude (0-1)
    pub gain: f32,
    pub duration_ms: u64,
}

/// Tone settings per alert kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub soft_frequency_hz: f32,
    pub soft_gain: f32,
    pub hard_frequency_hz: f32,
    pub hard_gain: f32,
    pub tone_duration_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            soft_frequency_hz: 440.0,
            soft_gain: 0.15,
            hard_frequency_hz: 880.0,
            hard_gain: 0.35,
            tone_duration_ms: 200,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), VigilError> {
        for (name, frequency) in [
            ("soft_frequency_hz", self.soft_frequency_hz),
            ("hard_frequency_hz", self.hard_frequency_hz),
        ] {
            if !(frequency > 0.0) || !frequency.is_finite() {
                return Err(VigilError::InvalidConfig(format!(
                    "{name} must be positive, got {frequency}"
                )));
            }
        }
        for (name, gain) in [("soft_gain", self.soft_gain), ("hard_gain", self.hard_gain)] {
            if !(0.0..=1.0).contains(&gain) {
                return Err(VigilError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {gain}"
                )));
            }
        }
        Ok(())
    }

    pub fn tone_for(&self, kind: AlertKind) -> Tone {
        let (frequency_hz, gain) = match kind {
            AlertKind::Soft => (self.soft_frequency_hz, self.soft_gain),
            AlertKind::Hard => (self.hard_frequency_hz, self.hard_gain),
        };
        Tone {
            frequency_hz,
            gain,
            duration_ms: self.tone_duration_ms,
        }
    }
}

/// Something that can play a [`Tone`]
pub trait ToneSink {
    /// Start playing; must not block for the tone's duration
    fn play(&mut self, tone: &Tone) -> Result<(), AudioError>;

    /// Release the output device
    fn close(&mut self) {}
}

/// Builds the engine's sink on first use
pub type ToneSinkFactory = Box<dyn Fn() -> Result<Box<dyn ToneSink>, AudioError>>;

/// Sink that only logs, used when no audio backend is compiled in
#[derive(Debug, Clone, Copy, Default)]
pub struct LogToneSink;

impl ToneSink for LogToneSink {
    fn play(&mut self, tone: &Tone) -> Result<(), AudioError> {
        log::debug!(
            "alert tone {:.0} Hz, gain {:.2}, {} ms",
            tone.frequency_hz,
            tone.gain,
            tone.duration_ms
        );
        Ok(())
    }
}

/// The sink used when none is injected
pub fn default_tone_sink() -> Result<Box<dyn ToneSink>, AudioError> {
    #[cfg(feature = "audio")]
    {
        Ok(Box::new(rodio_sink::RodioToneSink::open()?))
    }
    #[cfg(not(feature = "audio"))]
    {
        Ok(Box::new(LogToneSink))
    }
}

#[cfg(feature = "audio")]
pub use rodio_sink::{RodioToneSink, SineTone};

#[cfg(feature = "audio")]
mod rodio_sink {
    use super::{Tone, ToneSink};
    use crate::error::AudioError;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use std::f32::consts::PI;
    use std::time::Duration;

    const SAMPLE_RATE: u32 = 44_100;

    /// Mono sine wave of fixed length
    pub struct SineTone {
        frequency_hz: f32,
        gain: f32,
        num_sample: usize,
        total_samples: usize,
    }

    impl SineTone {
        pub fn new(tone: &Tone) -> Self {
            Self {
                frequency_hz: tone.frequency_hz,
                gain: tone.gain,
                num_sample: 0,
                total_samples: (tone.duration_ms as usize * SAMPLE_RATE as usize) / 1000,
            }
        }
    }

    impl Iterator for SineTone {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            if self.num_sample >= self.total_samples {
                return None;
            }
            self.num_sample += 1;
            let t = self.num_sample as f32 / SAMPLE_RATE as f32;
            Some((2.0 * PI * self.frequency_hz * t).sin() * self.gain)
        }
    }

    impl Source for SineTone {
        fn current_frame_len(&self) -> Option<usize> {
            Some(self.total_samples - self.num_sample)
        }

        fn channels(&self) -> u16 {
            1
        }

        fn sample_rate(&self) -> u32 {
            SAMPLE_RATE
        }

        fn total_duration(&self) -> Option<Duration> {
            Some(Duration::from_millis(
                (self.total_samples as u64 * 1000) / SAMPLE_RATE as u64,
            ))
        }
    }

    /// Plays tones on the default output device
    pub struct RodioToneSink {
        stream: Option<(OutputStream, OutputStreamHandle)>,
    }

    impl RodioToneSink {
        pub fn open() -> Result<Self, AudioError> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| AudioError::Unavailable(e.to_string()))?;
            Ok(Self {
                stream: Some((stream, handle)),
            })
        }
    }

    impl ToneSink for RodioToneSink {
        fn play(&mut self, tone: &Tone) -> Result<(), AudioError> {
            let (_, handle) = self.stream.as_ref().ok_or(AudioError::Closed)?;
            let sink = Sink::try_new(handle).map_err(|e| AudioError::Playback(e.to_string()))?;
            sink.append(SineTone::new(tone));
            sink.detach();
            Ok(())
        }

        fn close(&mut self) {
            self.stream = None;
        }
    }
}
