//! Sound effects using the Web Audio API
//!
//! All sounds are synthesized with oscillators, so there are no asset files.
//! Background music runs through its own gain bus so it can fade out on game over.

use web_sys::{AudioContext, AudioNode, GainNode, OscillatorNode, OscillatorType};

use crate::music::{self, LoopScheduler};
use crate::settings::Settings;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// The cat hit an obstacle ("ouch")
    Crash,
    /// The finished episode beat the stored best
    NewHighScore,
    /// A new episode starts
    Restart,
}

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master_volume: f32,
    muted: bool,
    music: LoopScheduler,
    /// Gain bus of the running tune; replaced on every start
    music_bus: Option<GainNode>,
}

impl AudioManager {
    pub fn new(settings: &Settings) -> Self {
        // Fails outside secure contexts
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: settings.master_volume.clamp(0.0, 1.0),
            muted: settings.muted,
            music: LoopScheduler::default(),
            music_bus: None,
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let (Some(ctx), Some(bus)) = (&self.ctx, &self.music_bus) {
            bus.gain()
                .set_value_at_time(self.effective_volume(), ctx.current_time())
                .ok();
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// Play a sound effect
    pub fn play(&self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }

        let Some(ctx) = &self.ctx else { return };

        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match effect {
            SoundEffect::Crash => self.play_crash(ctx, vol),
            SoundEffect::NewHighScore => self.play_high_score(ctx, vol),
            SoundEffect::Restart => self.play_restart(ctx, vol),
        }
    }

    /// Begin the looping tune unless it is already playing
    pub fn start_music(&mut self) {
        if self.music.is_playing() {
            return;
        }
        let Some(ctx) = &self.ctx else { return };
        let Ok(bus) = ctx.create_gain() else { return };
        if bus.connect_with_audio_node(&ctx.destination()).is_err() {
            return;
        }
        bus.gain().set_value(self.effective_volume());

        self.music.start(ctx.current_time());
        self.music_bus = Some(bus);
        self.update_music();
        log::debug!("Music started");
    }

    /// Fade the tune out; notes already queued die with the bus
    pub fn stop_music(&mut self) {
        self.music.stop();
        let (Some(ctx), Some(bus)) = (&self.ctx, self.music_bus.take()) else {
            return;
        };
        let t = ctx.current_time();
        bus.gain().cancel_scheduled_values(t).ok();
        bus.gain().set_value_at_time(bus.gain().value(), t).ok();
        bus.gain().linear_ramp_to_value_at_time(0.0, t + music::FADE_OUT).ok();
    }

    pub fn is_music_playing(&self) -> bool {
        self.music.is_playing()
    }

    /// Queue the next loop once it is within the lookahead window. Call every frame.
    pub fn update_music(&mut self) {
        let (Some(ctx), Some(bus)) = (&self.ctx, &self.music_bus) else {
            return;
        };
        while let Some(start) = self.music.due(ctx.current_time()) {
            // Muted loops keep the clock running but create no nodes
            if self.effective_volume() <= 0.0 {
                continue;
            }
            for voice in music::VOICES {
                for note in voice.schedule() {
                    self.play_note(
                        ctx,
                        bus,
                        start + note.offset,
                        note.duration,
                        note.freq,
                        voice.level,
                    );
                }
            }
        }
    }

    /// One enveloped square-wave note on the music bus
    fn play_note(
        &self,
        ctx: &AudioContext,
        bus: &GainNode,
        at: f64,
        duration: f64,
        freq: f32,
        level: f32,
    ) {
        let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Square, bus) else {
            return;
        };
        let end = at + duration;
        gain.gain().set_value_at_time(0.0, at).ok();
        gain.gain()
            .linear_ramp_to_value_at_time(level, at + music::NOTE_ATTACK)
            .ok();
        gain.gain()
            .set_value_at_time(level, end - music::NOTE_RELEASE)
            .ok();
        gain.gain().linear_ramp_to_value_at_time(0.0, end).ok();
        osc.start_with_when(at).ok();
        osc.stop_with_when(end).ok();
    }

    /// Oscillator routed through a gain node into `output`
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
        output: &AudioNode,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(output).ok()?;

        Some((osc, gain))
    }

    /// Crash - square wave sliding 900 Hz down to 220 Hz
    fn play_crash(&self, ctx: &AudioContext, vol: f32) {
        let output = ctx.destination();
        let Some((osc, gain)) = self.create_osc(ctx, 900.0, OscillatorType::Square, &output) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.35, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.35)
            .ok();
        osc.frequency().set_value_at_time(900.0, t).ok();
        osc.frequency()
            .linear_ramp_to_value_at_time(220.0, t + 0.35)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.36).ok();
    }

    /// New high score - rising arpeggio, after the crash has died down
    fn play_high_score(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [523.0, 659.0, 784.0, 1047.0].iter().enumerate() {
            let delay = 0.4 + i as f64 * 0.09;
            let output = ctx.destination();
            if let Some((osc, gain)) =
                self.create_osc(ctx, *freq, OscillatorType::Triangle, &output)
            {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(0.0, ctx.current_time()).ok();
                gain.gain().set_value_at_time(vol * 0.25, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.25)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.3).ok();
            }
        }
    }

    /// Restart - short upward blip
    fn play_restart(&self, ctx: &AudioContext, vol: f32) {
        let output = ctx.destination();
        let Some((osc, gain)) = self.create_osc(ctx, 300.0, OscillatorType::Triangle, &output)
        else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.2, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.15)
            .ok();
        osc.frequency().set_value_at_time(300.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(600.0, t + 0.12)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.18).ok();
    }
}
