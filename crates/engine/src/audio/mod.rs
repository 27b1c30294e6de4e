//! Distance-attenuated looping sounds heard from a single listener.

#[cfg(feature = "audio-backend")]
mod output;

use glam::Vec3;
use thiserror::Error;
use tracing::{debug, info};

use crate::assets::AudioClip;

#[cfg(feature = "audio-backend")]
use output::AudioOutput;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open audio output device: {0}")]
    DeviceInit(String),
    #[error("failed to start playback of {label}: {message}")]
    Playback { label: String, message: String },
}

/// `gain = (max(d, ref) / ref)^(-rolloff)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialFalloff {
    pub ref_distance: f32,
    pub rolloff_factor: f32,
}

impl Default for ExponentialFalloff {
    fn default() -> Self {
        Self {
            ref_distance: 3.0,
            rolloff_factor: 2.0,
        }
    }
}

impl ExponentialFalloff {
    pub fn gain(&self, distance: f32) -> f32 {
        if !distance.is_finite() || self.ref_distance <= 0.0 {
            return 0.0;
        }
        let ratio = distance.max(self.ref_distance) / self.ref_distance;
        ratio.powf(-self.rolloff_factor)
    }
}

#[derive(Debug, Clone)]
pub struct PositionalSource {
    pub label: String,
    pub clip: AudioClip,
    pub position: Vec3,
    pub volume: f32,
    pub looping: bool,
    pub falloff: ExponentialFalloff,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioListener {
    position: Vec3,
}

impl AudioListener {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Moves the listener to `position` rounded to whole units on every axis.
    pub fn snap_to(&mut self, position: Vec3) {
        self.position = position.round();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u32);

#[derive(Debug)]
struct Voice {
    id: VoiceId,
    source: PositionalSource,
    gain: f32,
}

/// Every attached source plus the listener they are heard from.
///
/// Gains are always computed; a playback device is only driven when one was
/// opened with `open_default_output`.
pub struct SoundStage {
    listener: AudioListener,
    voices: Vec<Voice>,
    next_voice_id: u32,
    #[cfg(feature = "audio-backend")]
    output: Option<AudioOutput>,
}

impl Default for SoundStage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SoundStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundStage")
            .field("listener", &self.listener)
            .field("voices", &self.voices.len())
            .finish()
    }
}

impl SoundStage {
    pub fn new() -> Self {
        Self {
            listener: AudioListener::default(),
            voices: Vec::new(),
            next_voice_id: 1,
            #[cfg(feature = "audio-backend")]
            output: None,
        }
    }

    #[cfg(feature = "audio-backend")]
    pub fn open_default_output(&mut self) -> Result<(), AudioError> {
        let output = AudioOutput::open_default()?;
        info!("audio_output_opened");
        self.output = Some(output);
        Ok(())
    }

    pub fn has_output(&self) -> bool {
        #[cfg(feature = "audio-backend")]
        {
            self.output.is_some()
        }
        #[cfg(not(feature = "audio-backend"))]
        {
            false
        }
    }

    pub fn listener(&self) -> &AudioListener {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut AudioListener {
        &mut self.listener
    }

    pub fn attach(&mut self, source: PositionalSource) -> VoiceId {
        let id = VoiceId(self.next_voice_id);
        self.next_voice_id = self.next_voice_id.saturating_add(1);
        let gain = voice_gain(&self.listener, &source);

        #[cfg(feature = "audio-backend")]
        if let Some(output) = self.output.as_mut() {
            if let Err(error) = output.start(id, &source, gain) {
                tracing::warn!(voice = id.0, error = %error, "audio_voice_start_failed");
            }
        }

        info!(
            voice = id.0,
            label = %source.label,
            x = source.position.x,
            y = source.position.y,
            z = source.position.z,
            looping = source.looping,
            "sound_attached"
        );
        self.voices.push(Voice { id, source, gain });
        id
    }

    /// Recomputes every voice's gain against the current listener position.
    pub fn update(&mut self) {
        for voice in &mut self.voices {
            voice.gain = voice_gain(&self.listener, &voice.source);
            #[cfg(feature = "audio-backend")]
            if let Some(output) = self.output.as_mut() {
                output.set_gain(voice.id, voice.gain);
            }
        }
    }

    pub fn gain(&self, id: VoiceId) -> Option<f32> {
        self.voices
            .iter()
            .find(|voice| voice.id == id)
            .map(|voice| voice.gain)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.voices.iter().map(|voice| voice.source.label.as_str())
    }

    pub fn clear(&mut self) {
        #[cfg(feature = "audio-backend")]
        if let Some(output) = self.output.as_mut() {
            output.stop_all();
        }
        if !self.voices.is_empty() {
            debug!(voices = self.voices.len(), "sound_stage_cleared");
        }
        self.voices.clear();
    }
}

fn voice_gain(listener: &AudioListener, source: &PositionalSource) -> f32 {
    let distance = listener.position().distance(source.position);
    (source.volume * source.falloff.gain(distance)).max(0.0)
}
