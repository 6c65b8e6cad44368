//! Deterministic synthetic-signal generators used by scenario tests:
//! silence and fixed-frequency tone bursts at a given sample rate.

/// `n` samples of silence.
pub fn silence(n: usize) -> Vec<f32> {
    vec![0.0; n]
}

/// A sine tone at `freq_hz`, sampled at `sample_rate`, `amplitude` peak,
/// for `n` samples.
pub fn tone(freq_hz: f32, sample_rate: u32, amplitude: f32, n: usize) -> Vec<f32> {
    let step = std::f32::consts::TAU * freq_hz / sample_rate as f32;
    (0..n).map(|i| amplitude * (step * i as f32).sin()).collect()
}

/// Concatenate `silence(lead_in)`, `tone(...)` for `burst_samples`, then
/// `silence(lead_out)` — the standard "burst in the middle" scenario
/// shape used by the single-burst and cross-boundary-transition tests.
pub fn silence_tone_silence(
    lead_in: usize,
    freq_hz: f32,
    sample_rate: u32,
    amplitude: f32,
    burst_samples: usize,
    lead_out: usize,
) -> Vec<f32> {
    let mut out = silence(lead_in);
    out.extend(tone(freq_hz, sample_rate, amplitude, burst_samples));
    out.extend(silence(lead_out));
    out
}
