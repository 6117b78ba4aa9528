//! Real-to-complex transform adapter behind the [`Spectrum`] trait.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;

use crate::bands::Spectrum;
use crate::error::{GlitchError, Result};

/// FFT-backed spectrum over a fixed number of time-domain samples.
///
/// The transform length must be a power of two, which the square
/// power-of-two scan blocks feeding it always satisfy. A length-`N` signal
/// yields `N / 2 + 1` spectrum bins, and [`inverse`](Spectrum::inverse)
/// folds the transform's normalization back in so a forward/inverse pair
/// reproduces its input.
pub struct FftSpectrum {
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    time_size: usize,
    sample_rate: f32,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    inverse_input: Vec<Complex32>,
    fwd_scratch: Vec<Complex32>,
    inv_scratch: Vec<Complex32>,
}

impl FftSpectrum {
    /// Plans forward and inverse transforms over `time_size` samples.
    pub fn new(time_size: usize, sample_rate: f32) -> Result<FftSpectrum> {
        if time_size < 2 || !time_size.is_power_of_two() {
            return Err(GlitchError::BadFftSize(time_size));
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(time_size);
        let inverse = planner.plan_fft_inverse(time_size);
        let input = forward.make_input_vec();
        let spectrum = forward.make_output_vec();
        let inverse_input = inverse.make_input_vec();
        let fwd_scratch = forward.make_scratch_vec();
        let inv_scratch = inverse.make_scratch_vec();
        Ok(FftSpectrum {
            forward,
            inverse,
            time_size,
            sample_rate,
            input,
            spectrum,
            inverse_input,
            fwd_scratch,
            inv_scratch,
        })
    }

    /// Transform length in time-domain samples.
    pub fn time_size(&self) -> usize {
        self.time_size
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Nearest spectrum bin to a frequency in Hz.
    pub fn freq_to_index(&self, freq: f32) -> usize {
        let bin = (freq / self.sample_rate * self.time_size as f32).round();
        (bin.max(0.0) as usize).min(self.spectrum.len() - 1)
    }
}

impl Spectrum for FftSpectrum {
    fn spec_size(&self) -> usize {
        self.spectrum.len()
    }

    fn index_to_freq(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate / self.time_size as f32
    }

    fn forward(&mut self, samples: &[f32]) {
        // the transform scrambles its input, so work on a copy
        self.input.copy_from_slice(samples);
        self.forward
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.fwd_scratch)
            .expect("real FFT forward transform");
    }

    fn inverse(&mut self, samples: &mut [f32]) {
        self.inverse_input.copy_from_slice(&self.spectrum);
        self.inverse
            .process_with_scratch(&mut self.inverse_input, samples, &mut self.inv_scratch)
            .expect("real FFT inverse transform");
        let scale = 1.0 / self.time_size as f32;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }

    fn get_band(&self, bin: usize) -> f32 {
        self.spectrum.get(bin).map_or(0.0, |c| c.norm())
    }

    fn scale_band(&mut self, bin: usize, factor: f32) {
        if let Some(c) = self.spectrum.get_mut(bin) {
            *c = *c * factor;
        }
    }

    fn scale_freq(&mut self, freq: f32, factor: f32) {
        let bin = self.freq_to_index(freq);
        self.scale_band(bin, factor);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn transform_length_must_be_a_power_of_two() {
        for &bad in &[0usize, 1, 12, 100] {
            assert_eq!(
                FftSpectrum::new(bad, 100.0).err(),
                Some(GlitchError::BadFftSize(bad))
            );
        }
        assert!(FftSpectrum::new(64, 100.0).is_ok());
    }

    #[test]
    fn spectrum_holds_half_the_bins_plus_one() {
        let fft = FftSpectrum::new(16, 16.0).unwrap();
        assert_eq!(fft.spec_size(), 9);
        assert_eq!(fft.time_size(), 16);
    }

    #[test]
    fn constant_signal_lands_in_the_dc_bin() {
        let mut fft = FftSpectrum::new(16, 16.0).unwrap();
        fft.forward(&[1.0; 16]);
        assert_relative_eq!(fft.get_band(0), 16.0, epsilon = 1e-3);
        for bin in 1..fft.spec_size() {
            assert!(fft.get_band(bin) < 1e-3, "bin {}", bin);
        }
    }

    #[test]
    fn pure_tone_lands_in_its_bin() {
        let mut fft = FftSpectrum::new(16, 16.0).unwrap();
        let tone: Vec<f32> = (0..16)
            .map(|n| (std::f32::consts::PI * 2.0 * 4.0 * n as f32 / 16.0).cos())
            .collect();
        fft.forward(&tone);
        assert_relative_eq!(fft.get_band(4), 8.0, epsilon = 1e-3);
        assert!(fft.get_band(3) < 1e-3);
        assert!(fft.get_band(5) < 1e-3);
        assert_relative_eq!(fft.index_to_freq(4), 4.0);
        assert_eq!(fft.freq_to_index(4.0), 4);
        fft.scale_freq(4.0, 0.5);
        assert_relative_eq!(fft.get_band(4), 4.0, epsilon = 1e-3);
    }

    #[test]
    fn forward_then_inverse_reproduces_the_signal() {
        let mut fft = FftSpectrum::new(32, 100.0).unwrap();
        let original: Vec<f32> = (0..32).map(|n| (n * n % 97) as f32).collect();
        let mut samples = original.clone();
        fft.forward(&samples);
        fft.inverse(&mut samples);
        for (&got, &want) in samples.iter().zip(original.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-3);
        }
    }

    #[test]
    fn out_of_range_frequencies_clamp_to_the_edges() {
        let fft = FftSpectrum::new(16, 16.0).unwrap();
        assert_eq!(fft.freq_to_index(-3.0), 0);
        assert_eq!(fft.freq_to_index(1000.0), fft.spec_size() - 1);
    }

    #[test]
    fn scaling_an_absent_bin_does_nothing() {
        let mut fft = FftSpectrum::new(16, 16.0).unwrap();
        fft.forward(&[1.0; 16]);
        fft.scale_band(1000, 2.0);
        assert_eq!(fft.get_band(1000), 0.0);
    }
}
