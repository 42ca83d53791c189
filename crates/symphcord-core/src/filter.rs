use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    LowPass,
    HighPass,
}

/// Trapezoidal state-variable filter, 12 dB per octave, no resonance peak.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    mode: FilterMode,
    g: f32,
    k: f32,
    ic1eq: f32,
    ic2eq: f32,
}

impl StateVariableFilter {
    /// `None` when the cutoff is not below Nyquist or not positive; such a
    /// stage would pass (low-pass) or reject (high-pass) the whole band.
    #[must_use]
    pub fn new(mode: FilterMode, cutoff_hz: f32, sample_rate: u32) -> Option<Self> {
        let sample_rate = sample_rate as f32;
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= sample_rate * 0.5 {
            return None;
        }
        Some(Self {
            mode,
            g: (PI * cutoff_hz / sample_rate).tan(),
            // Butterworth damping.
            k: std::f32::consts::SQRT_2,
            ic1eq: 0.0,
            ic2eq: 0.0,
        })
    }

    #[must_use]
    pub fn lowpass(cutoff_hz: f32, sample_rate: u32) -> Option<Self> {
        Self::new(FilterMode::LowPass, cutoff_hz, sample_rate)
    }

    #[must_use]
    pub fn highpass(cutoff_hz: f32, sample_rate: u32) -> Option<Self> {
        Self::new(FilterMode::HighPass, cutoff_hz, sample_rate)
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let h = 1.0 / (1.0 + self.g * (self.g + self.k));
        let v3 = input - self.ic2eq;
        let v1 = h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.mode {
            FilterMode::LowPass => v2,
            FilterMode::HighPass => input - self.k * v1 - v2,
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// Filters an interleaved buffer, each channel with its own state.
    pub fn run_interleaved(&self, samples: &mut [f32], channels: u16) {
        let stride = usize::from(channels.max(1));
        for channel in 0..stride {
            let mut state = self.clone();
            state.reset();
            for sample in samples.iter_mut().skip(channel).step_by(stride) {
                *sample = state.process(*sample);
            }
        }
    }
}
