use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

use crate::notify::AlertKind;

const SAMPLE_RATE: u32 = 44100;

/// Sequence of decaying sine notes.
pub struct Chime {
    notes: Vec<f32>,
    note_samples: usize,
    num_sample: usize,
}

impl Chime {
    pub fn new(notes: Vec<f32>, note_duration: Duration) -> Self {
        Self {
            notes,
            note_samples: (note_duration.as_secs_f32() * SAMPLE_RATE as f32) as usize,
            num_sample: 0,
        }
    }

    pub fn for_alert(kind: AlertKind) -> Self {
        let notes = match kind {
            // Rising: back to break.
            AlertKind::WorkFinished => vec![659.25, 783.99, 1046.5],
            // Falling: back to work.
            AlertKind::BreakFinished => vec![1046.5, 783.99, 659.25],
            AlertKind::Warning => vec![440.0, 440.0],
        };
        Self::new(notes, Duration::from_millis(350))
    }

    fn total_samples(&self) -> usize {
        self.notes.len() * self.note_samples
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.note_samples == 0 || self.num_sample >= self.total_samples() {
            return None;
        }

        let note = self.notes[self.num_sample / self.note_samples];
        let offset = self.num_sample % self.note_samples;
        self.num_sample += 1;

        let t = offset as f32 / SAMPLE_RATE as f32;
        // Exponential decay so consecutive notes do not click into each other.
        let envelope = (-6.0 * offset as f32 / self.note_samples as f32).exp();
        Some((2.0 * PI * note * t).sin() * envelope * 0.25)
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples().saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples() as f32 / SAMPLE_RATE as f32,
        ))
    }
}
