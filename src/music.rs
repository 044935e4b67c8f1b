//! Background tune: a two-voice square-wave loop in A minor at 100 BPM
//!
//! Only the score and the loop timing live here. The web build turns each
//! scheduled note into an oscillator (see `audio`).

/// Tempo of the loop
pub const TEMPO_BPM: f64 = 100.0;
/// How far ahead of the audio clock the next loop is queued (seconds)
pub const LOOKAHEAD: f64 = 1.0;
/// Delay before the first note so the start is never in the past
pub const START_DELAY: f64 = 0.05;
/// Fade applied when the music stops on game over (seconds)
pub const FADE_OUT: f64 = 0.7;
/// Per-note attack and release ramps, short enough to avoid clicks
pub const NOTE_ATTACK: f64 = 0.01;
pub const NOTE_RELEASE: f64 = 0.02;

/// One note of a voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub freq: f32,
    pub beats: u32,
}

const fn note(freq: f32, beats: u32) -> Note {
    Note { freq, beats }
}

// A minor, roughly
const A2: f32 = 110.00;
const E2: f32 = 82.41;
const F2: f32 = 87.31;
const G2: f32 = 98.00;
const A4: f32 = 440.00;
const C5: f32 = 523.25;
const D5: f32 = 587.33;
const E5: f32 = 659.25;
const G5: f32 = 783.99;

/// A repeated motif played at a fixed level
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub motif: &'static [Note],
    pub repeats: usize,
    /// Peak gain of each note before the master volume
    pub level: f32,
}

pub const LEAD: Voice = Voice {
    motif: &[
        note(A4, 1),
        note(C5, 1),
        note(E5, 1),
        note(C5, 1),
        note(G5, 1),
        note(E5, 1),
        note(D5, 1),
        note(C5, 1),
    ],
    repeats: 2,
    level: 0.09,
};

pub const BASS: Voice = Voice {
    motif: &[note(A2, 2), note(E2, 2), note(G2, 2), note(F2, 2)],
    repeats: 2,
    level: 0.12,
};

pub const VOICES: [Voice; 2] = [LEAD, BASS];

/// A note placed in time relative to the start of a loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub offset: f64,
    pub duration: f64,
    pub freq: f32,
}

pub fn beat_seconds() -> f64 {
    60.0 / TEMPO_BPM
}

impl Voice {
    pub fn beats(&self) -> u32 {
        self.motif.iter().map(|n| n.beats).sum::<u32>() * self.repeats as u32
    }

    /// Every note of one pass through the voice, back to back
    pub fn schedule(&self) -> impl Iterator<Item = ScheduledNote> + '_ {
        let beat = beat_seconds();
        self.motif
            .iter()
            .cycle()
            .take(self.motif.len() * self.repeats)
            .scan(0u32, move |elapsed, n| {
                let offset = *elapsed as f64 * beat;
                *elapsed += n.beats;
                Some(ScheduledNote {
                    offset,
                    duration: n.beats as f64 * beat,
                    freq: n.freq,
                })
            })
    }
}

/// Length of one loop: the longest voice
pub fn loop_seconds() -> f64 {
    let beats = VOICES.iter().map(Voice::beats).max().unwrap_or(0);
    beats as f64 * beat_seconds()
}

/// Decides when the next loop must be queued on the audio clock
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopScheduler {
    next_start: Option<f64>,
}

impl LoopScheduler {
    pub fn start(&mut self, now: f64) {
        if self.next_start.is_none() {
            self.next_start = Some(now + START_DELAY);
        }
    }

    pub fn stop(&mut self) {
        self.next_start = None;
    }

    pub fn is_playing(&self) -> bool {
        self.next_start.is_some()
    }

    /// Start time of a loop that must be queued now, if any.
    ///
    /// A loop that should already have started (the tab slept) is moved to
    /// `now` instead of being queued in the past.
    pub fn due(&mut self, now: f64) -> Option<f64> {
        let next = self.next_start?;
        if next - now > LOOKAHEAD {
            return None;
        }
        let start = next.max(now + START_DELAY);
        self.next_start = Some(start + loop_seconds());
        Some(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voices_share_loop_length() {
        assert_eq!(LEAD.beats(), 16);
        assert_eq!(BASS.beats(), 16);
        assert!((loop_seconds() - 9.6).abs() < 1e-9);
    }

    #[test]
    fn test_schedule_is_contiguous() {
        for voice in VOICES {
            let notes: Vec<_> = voice.schedule().collect();
            assert_eq!(notes.len(), voice.motif.len() * voice.repeats);
            assert_eq!(notes[0].offset, 0.0);
            for pair in notes.windows(2) {
                assert!((pair[0].offset + pair[0].duration - pair[1].offset).abs() < 1e-9);
            }
            let last = notes[notes.len() - 1];
            assert!((last.offset + last.duration - loop_seconds()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bass_roots() {
        let roots: Vec<f32> = BASS.schedule().map(|n| n.freq).collect();
        assert_eq!(roots, vec![A2, E2, G2, F2, A2, E2, G2, F2]);
        assert!(BASS.schedule().all(|n| (n.duration - 1.2).abs() < 1e-9));
    }

    #[test]
    fn test_scheduler_queues_ahead() {
        let mut clock = LoopScheduler::default();
        assert_eq!(clock.due(0.0), None);

        clock.start(10.0);
        assert!(clock.is_playing());
        let first = clock.due(10.0).unwrap();
        assert!((first - (10.0 + START_DELAY)).abs() < 1e-9);
        // Nothing more until the next loop is within the lookahead window
        assert_eq!(clock.due(12.0), None);

        let second = clock.due(first + loop_seconds() - LOOKAHEAD / 2.0).unwrap();
        assert!((second - first - loop_seconds()).abs() < 1e-9);
    }

    #[test]
    fn test_start_while_playing_keeps_timing() {
        let mut clock = LoopScheduler::default();
        clock.start(0.0);
        clock.due(0.0);
        let before = clock.clone();
        clock.start(3.0);
        assert_eq!(clock, before);
    }

    #[test]
    fn test_scheduler_resyncs_after_stall() {
        let mut clock = LoopScheduler::default();
        clock.start(0.0);
        clock.due(0.0);
        let late = clock.due(100.0).unwrap();
        assert!((late - (100.0 + START_DELAY)).abs() < 1e-9);
        assert_eq!(clock.due(100.5), None);
    }

    #[test]
    fn test_stop_clears() {
        let mut clock = LoopScheduler::default();
        clock.start(0.0);
        clock.stop();
        assert!(!clock.is_playing());
        assert_eq!(clock.due(0.0), None);
    }
}
