use log::debug;

use crate::audio::{AudioStream, RecordedAudio};
use crate::error::EditError;
use crate::history::EditAction;
use crate::interval::Interval;

/// Removes the audio inside an interval.
#[derive(Debug, Clone)]
pub struct DeleteAudioAction {
    interval: Interval<i64>,
    removed: Option<(usize, Vec<u8>)>,
}

impl DeleteAudioAction {
    pub fn new(interval: Interval<i64>) -> Self {
        Self {
            interval,
            removed: None,
        }
    }
}

impl EditAction<RecordedAudio> for DeleteAudioAction {
    fn execute(&mut self, audio: &mut RecordedAudio) -> Result<(), EditError> {
        let stream = audio.stream_mut();
        let offset = stream.byte_offset(self.interval.start());
        let frames = stream.delete(self.interval)?;
        debug!("deleted {} bytes of audio at {}", frames.len(), self.interval);
        self.removed = Some((offset, frames));
        Ok(())
    }

    fn undo(&mut self, audio: &mut RecordedAudio) -> Result<(), EditError> {
        let (offset, frames) = self.removed.take().ok_or(EditError::NotExecuted)?;
        audio.stream_mut().insert_bytes(offset, &frames)
    }

    fn redo(&mut self, audio: &mut RecordedAudio) -> Result<(), EditError> {
        self.execute(audio)
    }
}

/// Inserts frames of another stream at a point in time.
#[derive(Debug, Clone)]
pub struct InsertAudioAction {
    time: i64,
    frames: Vec<u8>,
    offset: Option<usize>,
}

impl InsertAudioAction {
    /// Fails with [`EditError::IncompatibleAudio`] unless both streams share
    /// the same sample format.
    pub fn new(
        target: &dyn AudioStream,
        source: &dyn AudioStream,
        time: i64,
    ) -> Result<Self, EditError> {
        if target.format() != source.format() {
            return Err(EditError::IncompatibleAudio(format!(
                "cannot insert {} audio into {} audio",
                source.format(),
                target.format()
            )));
        }
        Ok(Self {
            time,
            frames: source.samples().to_vec(),
            offset: None,
        })
    }
}

impl EditAction<RecordedAudio> for InsertAudioAction {
    fn execute(&mut self, audio: &mut RecordedAudio) -> Result<(), EditError> {
        let stream = audio.stream_mut();
        let offset = stream.byte_offset(self.time);
        stream.insert(self.time, &self.frames)?;
        debug!("inserted {} bytes of audio at {} ms", self.frames.len(), self.time);
        self.offset = Some(offset);
        Ok(())
    }

    fn undo(&mut self, audio: &mut RecordedAudio) -> Result<(), EditError> {
        let offset = self.offset.take().ok_or(EditError::NotExecuted)?;
        audio
            .stream_mut()
            .remove_bytes(offset..offset + self.frames.len())?;
        Ok(())
    }

    fn redo(&mut self, audio: &mut RecordedAudio) -> Result<(), EditError> {
        self.execute(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, WavAudio};

    fn audio(millis: usize) -> RecordedAudio {
        let data = (0..millis).map(|i| i as u8).collect();
        RecordedAudio::new(Box::new(WavAudio::new(AudioFormat::pcm(1000, 1, 8), data)))
    }

    #[test]
    fn test_delete_audio_undo() {
        let mut recorded = audio(200);
        let before = recorded.stream().samples().to_vec();
        let mut action = DeleteAudioAction::new(Interval::new(50, 150));

        action.execute(&mut recorded).unwrap();
        assert_eq!(recorded.length_in_millis(), 100);
        action.undo(&mut recorded).unwrap();
        assert_eq!(recorded.stream().samples(), before.as_slice());
        action.redo(&mut recorded).unwrap();
        assert_eq!(recorded.length_in_millis(), 100);
    }

    #[test]
    fn test_insert_audio_undo() {
        let mut recorded = audio(100);
        let other = WavAudio::silence(AudioFormat::pcm(1000, 1, 8), 40);
        let mut action = InsertAudioAction::new(recorded.stream(), &other, 30).unwrap();

        action.execute(&mut recorded).unwrap();
        assert_eq!(recorded.length_in_millis(), 140);
        assert_eq!(recorded.stream().samples()[30], 0);
        assert_eq!(recorded.stream().samples()[70], 30);

        action.undo(&mut recorded).unwrap();
        assert_eq!(recorded.length_in_millis(), 100);
        assert_eq!(recorded.stream().samples()[30], 30);
    }

    #[test]
    fn test_insert_audio_format_mismatch() {
        let recorded = audio(100);
        let other = WavAudio::silence(AudioFormat::pcm(48_000, 2, 16), 40);
        assert!(matches!(
            InsertAudioAction::new(recorded.stream(), &other, 0),
            Err(EditError::IncompatibleAudio(_))
        ));
    }
}
