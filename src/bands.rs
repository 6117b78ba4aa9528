//! Logarithmic frequency bands and band statistics over a spectrum.
//!
//! The spectral effects never compute a transform themselves; they drive any
//! type implementing [`Spectrum`]. [`BandPartitioner`] splits the spectrum
//! into octave-derived bands of bin indices, and [`BandStats`] summarizes bin
//! amplitudes so effects can derive cut and boost thresholds from them.

use crate::error::{GlitchError, Result};
use crate::range::IntRange;

/// A windowed view of frequency-domain data, as produced by an FFT.
///
/// Bin `0` is the DC component and bin `spec_size() - 1` sits at the Nyquist
/// frequency. Implementations own whatever internal buffers the transform
/// needs; callers move sample data in and out through `forward` and
/// `inverse`, keeping the sample buffer at the implementation's planned
/// transform length.
pub trait Spectrum {
    /// Number of frequency bins.
    fn spec_size(&self) -> usize;

    /// Center frequency in Hz of the given bin.
    fn index_to_freq(&self, bin: usize) -> f32;

    /// Transforms `samples` into the internal spectrum.
    fn forward(&mut self, samples: &[f32]);

    /// Transforms the internal spectrum back into `samples`.
    fn inverse(&mut self, samples: &mut [f32]);

    /// Amplitude of the given bin.
    fn get_band(&self, bin: usize) -> f32;

    /// Multiplies the amplitude of the given bin by `factor`.
    fn scale_band(&mut self, bin: usize, factor: f32);

    /// Multiplies the amplitude of the bin nearest to `freq` by `factor`.
    fn scale_freq(&mut self, freq: f32, factor: f32);
}

/// A run of spectrum bins claimed by one logarithmic sub-band.
///
/// `lo_freq` and `hi_freq` are the edges of the sub-band that claimed the
/// bins. The lowest band also holds every bin below its lower edge (down to
/// DC) and the highest band every bin up to the Nyquist frequency, so the
/// bins of a partition always cover the whole spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub bins: IntRange,
    pub lo_freq: f32,
    pub hi_freq: f32,
}

/// Splits a spectrum into logarithmically spaced bands of bin indices.
///
/// Starting at the Nyquist frequency, each octave halves the frequency range
/// of the one above it and is cut into `bands_per_octave` equal slices. Low
/// octaves often span fewer bins than they have slices, so the number of
/// realized bands can be well below `octaves * bands_per_octave`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPartitioner {
    sample_rate: f32,
    octaves: usize,
    bands_per_octave: usize,
}

impl Default for BandPartitioner {
    fn default() -> BandPartitioner {
        BandPartitioner {
            sample_rate: 262_144.0,
            octaves: 11,
            bands_per_octave: 3,
        }
    }
}

impl BandPartitioner {
    pub fn new(sample_rate: f32) -> BandPartitioner {
        BandPartitioner {
            sample_rate,
            ..BandPartitioner::default()
        }
    }

    pub fn with_bands(
        sample_rate: f32,
        octaves: usize,
        bands_per_octave: usize,
    ) -> Result<BandPartitioner> {
        if octaves == 0 || bands_per_octave == 0 {
            return Err(GlitchError::BadBandLayout {
                octaves,
                bands_per_octave,
            });
        }
        Ok(BandPartitioner {
            sample_rate,
            octaves,
            bands_per_octave,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Upper bound on the number of bands `partition` can produce.
    pub fn slots(&self) -> usize {
        self.octaves * self.bands_per_octave
    }

    /// Maps the sub-band frequency edges onto runs of bin indices.
    ///
    /// Sub-bands too narrow to reach the next bin are folded into their
    /// neighbor, so the returned bands are disjoint and consecutive. The
    /// last band is stretched to the end of the spectrum.
    pub fn partition<S: Spectrum + ?Sized>(&self, spectrum: &S) -> Result<Vec<FrequencyBand>> {
        let spec_size = spectrum.spec_size();
        if spec_size == 0 {
            return Err(GlitchError::EmptyDomain);
        }

        let mut bands = Vec::new();
        let mut lo_bin = 0;
        let mut bin = 0;
        for (lo_freq, hi_freq) in self.frequency_edges() {
            // First bin whose center frequency reaches the sub-band's upper edge.
            while bin < spec_size && spectrum.index_to_freq(bin) < hi_freq {
                bin += 1;
            }
            if bin == lo_bin {
                continue;
            }
            bands.push(FrequencyBand {
                bins: IntRange::new(lo_bin, bin - 1),
                lo_freq,
                hi_freq,
            });
            lo_bin = bin;
        }
        match bands.last_mut() {
            Some(band) => band.bins.upper = spec_size - 1,
            None => bands.push(FrequencyBand {
                bins: IntRange::new(0, spec_size - 1),
                lo_freq: 0.0,
                hi_freq: self.sample_rate / 2.0,
            }),
        }
        Ok(bands)
    }

    /// Sub-band `(lower, upper)` frequency edges in Hz, ordered low to high.
    fn frequency_edges(&self) -> Vec<(f32, f32)> {
        let mut edges = Vec::with_capacity(self.slots());
        let mut hi_freq = self.sample_rate / 2.0;
        for _ in 0..self.octaves {
            let lo_freq = hi_freq * 0.5;
            let step = (hi_freq - lo_freq) / self.bands_per_octave as f32;
            for slice in (1..=self.bands_per_octave).rev() {
                edges.push((
                    lo_freq + (slice - 1) as f32 * step,
                    lo_freq + slice as f32 * step,
                ));
            }
            hi_freq = lo_freq;
        }
        edges.reverse();
        edges
    }
}

/// Summary statistics over a run of bin amplitudes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub skew: f64,
}

impl BandStats {
    /// Computes statistics over `values`, which must hold at least one entry.
    ///
    /// The median of an even count is the average of the two middle values,
    /// the standard deviation is the population form, and the skew is
    /// Pearson's second coefficient, `3 * (mean - median) / std_dev`, taken
    /// as zero for a constant run.
    pub fn over(values: &[f32]) -> Result<BandStats> {
        if values.is_empty() {
            return Err(GlitchError::EmptyStats);
        }
        let mut sum = 0.0f64;
        let mut square_sum = 0.0f64;
        let mut sorted = Vec::with_capacity(values.len());
        for &value in values {
            let value = f64::from(value);
            sum += value;
            square_sum += value * value;
            sorted.push(value);
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let mid = n / 2;
        let median = if n % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        let mean = sum / n as f64;
        // Rounding can push the difference of squares slightly negative.
        let variance = (square_sum / n as f64 - mean * mean).max(0.0);
        let std_dev = variance.sqrt();
        let skew = if std_dev == 0.0 {
            0.0
        } else {
            3.0 * (mean - median) / std_dev
        };
        Ok(BandStats {
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
            std_dev,
            skew,
        })
    }
}

/// Statistics over the bin amplitudes of `bins`, read from `spectrum`.
pub fn spectrum_stats<S: Spectrum + ?Sized>(spectrum: &S, bins: IntRange) -> Result<BandStats> {
    if bins.is_empty() {
        return Err(GlitchError::EmptyStats);
    }
    if bins.upper >= spectrum.spec_size() {
        return Err(GlitchError::BandOutOfRange {
            lower: bins.lower,
            upper: bins.upper,
            spec_size: spectrum.spec_size(),
        });
    }
    let values: Vec<f32> = (bins.lower..=bins.upper)
        .map(|bin| spectrum.get_band(bin))
        .collect();
    BandStats::over(&values)
}

/// Scales every bin in `bins` by `factor`.
pub fn scale_bins<S: Spectrum + ?Sized>(
    spectrum: &mut S,
    bins: IntRange,
    factor: f32,
) -> Result<()> {
    if bins.is_empty() {
        return Ok(());
    }
    if bins.upper >= spectrum.spec_size() {
        return Err(GlitchError::BandOutOfRange {
            lower: bins.lower,
            upper: bins.upper,
            spec_size: spectrum.spec_size(),
        });
    }
    for bin in bins.lower..=bins.upper {
        spectrum.scale_band(bin, factor);
    }
    Ok(())
}

/// Scales the bin nearest each frequency by the factor at the same position.
pub fn scale_freqs<S: Spectrum + ?Sized>(spectrum: &mut S, freqs: &[f32], factors: &[f32]) {
    for (&freq, &factor) in freqs.iter().zip(factors) {
        spectrum.scale_freq(freq, factor);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    struct TestSpectrum {
        bands: Vec<f32>,
        sample_rate: f32,
        time_size: usize,
    }

    impl TestSpectrum {
        fn flat(spec_size: usize, sample_rate: f32, time_size: usize) -> TestSpectrum {
            TestSpectrum {
                bands: vec![1.0; spec_size],
                sample_rate,
                time_size,
            }
        }
    }

    impl Spectrum for TestSpectrum {
        fn spec_size(&self) -> usize {
            self.bands.len()
        }

        fn index_to_freq(&self, bin: usize) -> f32 {
            bin as f32 * self.sample_rate / self.time_size as f32
        }

        fn forward(&mut self, _samples: &[f32]) {}

        fn inverse(&mut self, _samples: &mut [f32]) {}

        fn get_band(&self, bin: usize) -> f32 {
            self.bands[bin]
        }

        fn scale_band(&mut self, bin: usize, factor: f32) {
            self.bands[bin] *= factor;
        }

        fn scale_freq(&mut self, freq: f32, factor: f32) {
            let bin = (freq * self.time_size as f32 / self.sample_rate).round() as usize;
            let bin = bin.min(self.bands.len() - 1);
            self.bands[bin] *= factor;
        }
    }

    #[test]
    fn partition_covers_the_whole_spectrum() {
        // 64-sample transform at 512 Hz: 33 bins spaced 8 Hz apart.
        let spectrum = TestSpectrum::flat(33, 512.0, 64);
        let partitioner = BandPartitioner::with_bands(512.0, 3, 2).unwrap();
        let bands = partitioner.partition(&spectrum).unwrap();

        let bins: Vec<(usize, usize)> = bands.iter().map(|b| (b.bins.lower, b.bins.upper)).collect();
        assert_eq!(
            bins,
            vec![(0, 5), (6, 7), (8, 11), (12, 15), (16, 23), (24, 32)]
        );
        assert_eq!(bands[0].bins.lower, 0);
        assert_eq!(bands.last().unwrap().bins.upper, spectrum.spec_size() - 1);
        for pair in bands.windows(2) {
            assert_eq!(pair[1].bins.lower, pair[0].bins.upper + 1);
        }
    }

    #[test]
    fn narrow_sub_bands_fold_into_their_neighbor() {
        // 8 Hz bins cannot resolve 2 Hz sub-bands, so the low octaves merge.
        let spectrum = TestSpectrum::flat(33, 512.0, 64);
        let partitioner = BandPartitioner::with_bands(512.0, 8, 3).unwrap();
        let bands = partitioner.partition(&spectrum).unwrap();

        assert!(bands.len() < partitioner.slots());
        assert_eq!(bands[0].bins.lower, 0);
        assert_eq!(bands.last().unwrap().bins.upper, 32);
        for pair in bands.windows(2) {
            assert_eq!(pair[1].bins.lower, pair[0].bins.upper + 1);
        }
    }

    #[test]
    fn single_bin_spectrum_yields_one_band() {
        let spectrum = TestSpectrum::flat(1, 512.0, 64);
        let bands = BandPartitioner::new(512.0).partition(&spectrum).unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].bins, IntRange::new(0, 0));
    }

    #[test]
    fn degenerate_layouts_are_rejected() {
        assert!(BandPartitioner::with_bands(512.0, 0, 3).is_err());
        assert!(BandPartitioner::with_bands(512.0, 3, 0).is_err());
        let empty = TestSpectrum::flat(0, 512.0, 64);
        assert!(BandPartitioner::new(512.0).partition(&empty).is_err());
    }

    #[test]
    fn stats_over_even_count() {
        let stats = BandStats::over(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(stats.min, 2.0);
        assert_relative_eq!(stats.max, 9.0);
        assert_relative_eq!(stats.mean, 5.0);
        assert_relative_eq!(stats.median, 4.5);
        assert_relative_eq!(stats.std_dev, 2.0);
        assert_relative_eq!(stats.skew, 0.75);
    }

    #[test]
    fn stats_over_odd_count_take_the_middle_value() {
        let stats = BandStats::over(&[3.0, 1.0, 2.0]).unwrap();
        assert_relative_eq!(stats.median, 2.0);
        assert_relative_eq!(stats.mean, 2.0);
        assert_relative_eq!(stats.std_dev, (2.0f64 / 3.0).sqrt());
        assert_relative_eq!(stats.skew, 0.0);
    }

    #[test]
    fn constant_run_has_zero_spread_and_skew() {
        let stats = BandStats::over(&[3.0; 5]).unwrap();
        assert_relative_eq!(stats.std_dev, 0.0);
        assert_relative_eq!(stats.skew, 0.0);
        assert_relative_eq!(stats.median, 3.0);
    }

    #[test]
    fn stats_reject_an_empty_run() {
        assert_eq!(BandStats::over(&[]), Err(GlitchError::EmptyStats));
    }

    #[test]
    fn spectrum_stats_read_the_requested_bins() {
        let mut spectrum = TestSpectrum::flat(8, 512.0, 64);
        spectrum.bands = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let stats = spectrum_stats(&spectrum, IntRange::new(2, 5)).unwrap();
        assert_relative_eq!(stats.mean, 3.5);
        assert_relative_eq!(stats.min, 2.0);
        assert_relative_eq!(stats.max, 5.0);

        assert!(matches!(
            spectrum_stats(&spectrum, IntRange::new(4, 9)),
            Err(GlitchError::BandOutOfRange { .. })
        ));
    }

    #[test]
    fn scale_bins_touches_only_the_range() {
        let mut spectrum = TestSpectrum::flat(8, 512.0, 64);
        scale_bins(&mut spectrum, IntRange::new(2, 4), 2.0).unwrap();
        assert_eq!(
            spectrum.bands,
            vec![1.0, 1.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0]
        );
        assert!(scale_bins(&mut spectrum, IntRange::new(6, 8), 2.0).is_err());
    }

    #[test]
    fn scale_freqs_pairs_frequencies_with_factors() {
        let mut spectrum = TestSpectrum::flat(8, 512.0, 64);
        scale_freqs(&mut spectrum, &[8.0, 24.0], &[0.5, 4.0]);
        assert_eq!(
            spectrum.bands,
            vec![1.0, 0.5, 1.0, 4.0, 1.0, 1.0, 1.0, 1.0]
        );
    }
}
