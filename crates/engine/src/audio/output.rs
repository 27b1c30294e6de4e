use std::collections::HashMap;
use std::io::Cursor;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::{AudioError, PositionalSource, VoiceId};

/// Owns the device stream; dropping it silences every sink.
pub(super) struct AudioOutput {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sinks: HashMap<VoiceId, Sink>,
}

impl AudioOutput {
    pub(super) fn open_default() -> Result<Self, AudioError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|error| AudioError::DeviceInit(error.to_string()))?;
        Ok(Self {
            _stream: stream,
            stream_handle,
            sinks: HashMap::new(),
        })
    }

    pub(super) fn start(
        &mut self,
        id: VoiceId,
        source: &PositionalSource,
        gain: f32,
    ) -> Result<(), AudioError> {
        let playback_error = |message: String| AudioError::Playback {
            label: source.label.clone(),
            message,
        };
        let decoder = Decoder::new(Cursor::new(source.clip.bytes.clone()))
            .map_err(|error| playback_error(error.to_string()))?;
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|error| playback_error(error.to_string()))?;

        sink.set_volume(gain);
        if source.looping {
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
        }
        self.sinks.insert(id, sink);
        Ok(())
    }

    pub(super) fn set_gain(&mut self, id: VoiceId, gain: f32) {
        if let Some(sink) = self.sinks.get(&id) {
            sink.set_volume(gain);
        }
    }

    pub(super) fn stop_all(&mut self) {
        for (_, sink) in self.sinks.drain() {
            sink.stop();
        }
    }
}
