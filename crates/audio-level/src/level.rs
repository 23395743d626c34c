//! Loudness estimation

/// Level reported for an empty or silent window
pub const SILENCE_DB: f32 = -100.0;

/// Root-mean-square of samples normalized to -1.0..=1.0
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Convert an RMS amplitude to dB relative to full scale, floored at [`SILENCE_DB`]
pub fn to_dbfs(rms: f32) -> f32 {
    if rms <= 0.0 || !rms.is_finite() {
        return SILENCE_DB;
    }
    (20.0 * rms.log10()).max(SILENCE_DB)
}
