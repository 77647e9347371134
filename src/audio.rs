//! Procedural sound cues.
//!
//! Every cue is synthesized on the fly (filtered noise for the piece clacks,
//! swept sines for check, a chord for draws, a small fanfare for wins) and
//! handed to the audio device as a raw sample buffer. Nothing is loaded from
//! disk.

use grandmaster::rules::{GameOutcome, MoveRecord};
use log::warn;
use rand::Rng;
use rodio::{buffer::SamplesBuffer, OutputStream, OutputStreamHandle};

const SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Move,
    Capture,
    Check,
    Draw,
    Victory,
}

/// Picks the cue for a just-applied move. Terminal outcomes win over the
/// move's own flags.
pub fn cue(record: &MoveRecord, outcome: GameOutcome) -> Cue {
    match outcome {
        GameOutcome::Checkmate { .. } => Cue::Victory,
        GameOutcome::Draw | GameOutcome::Stalemate => Cue::Draw,
        GameOutcome::Check => Cue::Check,
        GameOutcome::Ongoing => {
            if record.capture.is_some() || record.en_passant {
                Cue::Capture
            } else {
                Cue::Move
            }
        }
    }
}

/// Owns the output stream. Construction falls back to a silent mixer when no
/// audio device is available, so the game never refuses to start over sound.
pub struct Mixer {
    output: Option<(OutputStream, OutputStreamHandle)>,
    enabled: bool,
}

impl Mixer {
    pub fn new() -> Self {
        let output = match OutputStream::try_default() {
            Ok(pair) => Some(pair),
            Err(error) => {
                warn!("audio output unavailable, playing silently: {error}");
                None
            }
        };
        Mixer {
            output,
            enabled: true,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn play(&self, cue: Cue) {
        if !self.enabled {
            return;
        }
        let Some((_, handle)) = &self.output else {
            return;
        };
        let samples = render(cue);
        if let Err(error) = handle.play_raw(SamplesBuffer::new(1, SAMPLE_RATE, samples)) {
            warn!("failed to play sound cue {cue:?}: {error}");
        }
    }
}

fn render(cue: Cue) -> Vec<f32> {
    let mut samples = match cue {
        Cue::Move => move_clack(),
        Cue::Capture => capture_crack(),
        Cue::Check => check_sweep(),
        Cue::Draw => draw_chord(),
        Cue::Victory => victory_fanfare(),
    };
    for sample in &mut samples {
        *sample = sample.clamp(-1.0, 1.0);
    }
    samples
}

/// A crisp contact transient layered over a softer wood body.
fn move_clack() -> Vec<f32> {
    let mut contact = noise(0.04);
    lowpass_sweep(&mut contact, 3000.0, 100.0);
    envelope(&mut contact, 0.0, 0.25);

    let mut body = noise(0.1);
    lowpass_sweep(&mut body, 500.0, 50.0);
    envelope(&mut body, 0.01, 0.8);

    mix_into(&mut body, &contact, 0.0);
    body
}

/// Louder, sharper crack.
fn capture_crack() -> Vec<f32> {
    let mut burst = noise(0.08);
    lowpass_sweep(&mut burst, 800.0, 800.0);
    envelope(&mut burst, 0.0, 0.7);
    burst
}

/// Falling sine, a short warning tone.
fn check_sweep() -> Vec<f32> {
    let mut tone = sine_sweep(0.4, 600.0, 400.0);
    envelope(&mut tone, 0.0, 0.3);
    tone
}

/// Neutral three-note chord.
fn draw_chord() -> Vec<f32> {
    let mut out = vec![0.0; samples_for(1.5)];
    for freq in [400.0, 500.0, 600.0] {
        let mut voice = sine_sweep(1.5, freq, freq);
        envelope(&mut voice, 0.1, 0.1);
        mix_into(&mut out, &voice, 0.0);
    }
    out
}

/// Ascending arpeggio plus scattered pops and clap bursts.
fn victory_fanfare() -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let mut out = vec![0.0; samples_for(4.5)];

    // C major ninth, bright triangle voices
    for (i, freq) in [523.25, 659.25, 783.99, 1046.5, 1318.51, 1567.98]
        .into_iter()
        .enumerate()
    {
        let mut note = triangle(2.0, freq);
        envelope(&mut note, 0.05, 0.15);
        mix_into(&mut out, &note, i as f32 * 0.08);
    }

    for _ in 0..6 {
        let start = 0.4 + rng.gen::<f32>() * 1.5;
        let top = 600.0 + rng.gen::<f32>() * 200.0;
        let mut pop = sine_sweep(0.1, top, 100.0);
        envelope(&mut pop, 0.0, 0.1);
        mix_into(&mut out, &pop, start);
    }

    for _ in 0..60 {
        let start = 0.4 + rng.gen::<f32>() * 3.5;
        let center = 800.0 + rng.gen::<f32>() * 600.0;
        let mut clap = noise(0.15);
        lowpass_sweep(&mut clap, center, center * 0.5);
        envelope(&mut clap, 0.005, 0.05 + rng.gen::<f32>() * 0.05);
        mix_into(&mut out, &clap, start);
    }

    out
}

fn samples_for(duration: f32) -> usize {
    (SAMPLE_RATE as f32 * duration) as usize
}

fn noise(duration: f32) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..samples_for(duration))
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect()
}

fn sine_sweep(duration: f32, from_hz: f32, to_hz: f32) -> Vec<f32> {
    let count = samples_for(duration);
    let mut phase = 0.0f32;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let progress = i as f32 / count as f32;
        let freq = from_hz * (to_hz / from_hz).powf(progress);
        phase += std::f32::consts::TAU * freq / SAMPLE_RATE as f32;
        out.push(phase.sin());
    }
    out
}

fn triangle(duration: f32, freq: f32) -> Vec<f32> {
    let count = samples_for(duration);
    let step = freq / SAMPLE_RATE as f32;
    let mut phase = 0.0f32;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let p = phase.fract();
        out.push(if p < 0.5 { 4.0 * p - 1.0 } else { 3.0 - 4.0 * p });
        phase += step;
    }
    out
}

/// One-pole lowpass whose cutoff sweeps exponentially across the buffer.
fn lowpass_sweep(samples: &mut [f32], from_hz: f32, to_hz: f32) {
    let mut state = 0.0f32;
    let count = samples.len().max(1) as f32;
    for (i, sample) in samples.iter_mut().enumerate() {
        let progress = i as f32 / count;
        let cutoff = from_hz * (to_hz / from_hz).powf(progress);
        let alpha = 1.0 - (-std::f32::consts::TAU * cutoff / SAMPLE_RATE as f32).exp();
        state += alpha * (*sample - state);
        *sample = state;
    }
}

/// Linear attack up to `peak`, exponential decay over the remainder.
fn envelope(samples: &mut [f32], attack: f32, peak: f32) {
    let attack_len = samples_for(attack).min(samples.len());
    let decay_len = (samples.len() - attack_len).max(1);
    for (i, sample) in samples.iter_mut().enumerate() {
        let gain = if i < attack_len {
            peak * i as f32 / attack_len.max(1) as f32
        } else {
            let progress = (i - attack_len) as f32 / decay_len as f32;
            peak * 0.01f32.powf(progress)
        };
        *sample *= gain;
    }
}

fn mix_into(target: &mut Vec<f32>, source: &[f32], offset: f32) {
    let start = samples_for(offset);
    let needed = start + source.len();
    if target.len() < needed {
        target.resize(needed, 0.0);
    }
    for (i, sample) in source.iter().enumerate() {
        target[start + i] += *sample;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use grandmaster::rules::Actor;
    use shakmaty::{Color, Role, Square};

    fn record(capture: Option<Role>, en_passant: bool) -> MoveRecord {
        MoveRecord {
            san: "e4".to_string(),
            from: Square::E2,
            to: Square::E4,
            capture,
            en_passant,
            castle: false,
            promotion: None,
            actor: Actor::Human,
        }
    }

    #[test]
    fn terminal_outcomes_pick_their_cue() {
        let quiet = record(None, false);
        let checkmate = GameOutcome::Checkmate {
            winner: Color::White,
        };
        assert_eq!(cue(&quiet, checkmate), Cue::Victory);
        assert_eq!(cue(&quiet, GameOutcome::Draw), Cue::Draw);
        assert_eq!(cue(&quiet, GameOutcome::Stalemate), Cue::Draw);
        assert_eq!(cue(&quiet, GameOutcome::Check), Cue::Check);
    }

    #[test]
    fn captures_and_en_passant_crack() {
        assert_eq!(
            cue(&record(Some(Role::Pawn), false), GameOutcome::Ongoing),
            Cue::Capture
        );
        assert_eq!(
            cue(&record(None, true), GameOutcome::Ongoing),
            Cue::Capture
        );
        assert_eq!(cue(&record(None, false), GameOutcome::Ongoing), Cue::Move);
    }

    #[test]
    fn rendered_cues_are_bounded() {
        for cue in [Cue::Move, Cue::Capture, Cue::Check, Cue::Draw, Cue::Victory] {
            let samples = render(cue);
            assert!(!samples.is_empty(), "{cue:?} rendered nothing");
            assert!(
                samples.iter().all(|s| (-1.0..=1.0).contains(s)),
                "{cue:?} clips"
            );
        }
    }

    #[test]
    fn envelope_decays_to_near_silence() {
        let mut samples = vec![1.0f32; samples_for(0.5)];
        envelope(&mut samples, 0.0, 0.5);
        assert!((samples[0] - 0.5).abs() < 1e-3);
        assert!(samples.last().unwrap().abs() < 0.01);
    }

    #[test]
    fn mix_into_extends_the_target() {
        let mut target = vec![0.1f32; 10];
        mix_into(&mut target, &[0.2; 20], 0.0);
        assert_eq!(target.len(), 20);
        assert!((target[0] - 0.3).abs() < 1e-6);
        assert!((target[15] - 0.2).abs() < 1e-6);
    }
}
