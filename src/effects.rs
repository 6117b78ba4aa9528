//! Whole-image glitch passes: line sorts, block scans along space-filling
//! curves, and frequency-domain scaling of scanned blocks.
//!
//! Everything here drives the engine pieces over a [`Raster`]. The passes
//! touch only complete blocks of a centered grid, so images whose edges are
//! not a multiple of the block width keep a thin untouched margin.

use std::str;

use image::{Rgba, RgbaImage};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::bands::{scale_bins, spectrum_stats, BandStats, FrequencyBand, Spectrum};
use crate::color::{pull_channel, push_channel, Argb, Channel};
use crate::error::{GlitchError, Result};
use crate::range::{IntRange, RangeManager};
use crate::scan::{Orientation, PixelScanner};
use crate::sorting::{PixelSorter, SortConfig};

/// A row-major raster of packed colors.
#[derive(Clone, Debug)]
pub struct Raster {
    pixels: Vec<Argb>,
    width: usize,
    height: usize,
}

impl Raster {
    pub fn from_pixels(pixels: Vec<Argb>, width: usize, height: usize) -> Result<Raster> {
        if pixels.len() != width * height {
            return Err(GlitchError::RasterMismatch {
                len: pixels.len(),
                width,
                height,
            });
        }
        Ok(Raster {
            pixels,
            width,
            height,
        })
    }

    pub fn from_image(img: &RgbaImage) -> Raster {
        let pixels = img
            .pixels()
            .map(|px| {
                let [r, g, b, a] = px.0;
                Argb::pack(a, r, g, b)
            })
            .collect();
        Raster {
            pixels,
            width: img.width() as usize,
            height: img.height() as usize,
        }
    }

    pub fn to_image(&self) -> RgbaImage {
        let mut img = RgbaImage::new(self.width as u32, self.height as u32);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let c = self.pixels[y as usize * self.width + x as usize];
            *px = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        img
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Argb] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Argb] {
        &mut self.pixels
    }
}

/// How block orientations vary over the grid during a scan pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScanStyle {
    /// Every block is scanned the same way.
    Align,
    /// Each block may flip the scan on either axis.
    Random,
    /// Blocks are grouped 2x2 and the four orientations are dealt out
    /// randomly within each group.
    Permute,
}

impl ScanStyle {
    pub const ALL: [ScanStyle; 3] = [ScanStyle::Align, ScanStyle::Random, ScanStyle::Permute];
}

impl str::FromStr for ScanStyle {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "align" => Ok(ScanStyle::Align),
            "random" => Ok(ScanStyle::Random),
            "permute" => Ok(ScanStyle::Permute),
            _ => Err(String::from(s)),
        }
    }
}

/// Thresholds for statistically driven spectrum scaling.
///
/// The edges are placed `left_bound` and `right_bound` standard deviations
/// away from the mean bin amplitude (negative bounds reach below the mean).
/// Amplitudes outside the edges are scaled by `cut`, the rest by `boost`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatConfig {
    pub left_bound: f32,
    pub right_bound: f32,
    pub boost: f32,
    pub cut: f32,
}

impl Default for StatConfig {
    fn default() -> StatConfig {
        StatConfig {
            left_bound: -0.25,
            right_bound: 5.0,
            boost: 2.0,
            cut: 0.5,
        }
    }
}

impl StatConfig {
    /// Amplitude edges derived from measured statistics.
    pub fn edges(&self, stats: &BandStats) -> (f64, f64) {
        let left = stats.mean + stats.std_dev * f64::from(self.left_bound);
        let right = stats.mean + stats.std_dev * f64::from(self.right_bound);
        (left, right)
    }
}

/// Origins of the complete `d x d` blocks of a grid centered on the raster.
fn block_grid(width: usize, height: usize, d: usize) -> Vec<(usize, usize)> {
    let across = width / d;
    let down = height / d;
    let margin_x = (width - across * d) / 2;
    let margin_y = (height - down * d) / 2;
    let mut origins = Vec::with_capacity(across * down);
    for y in 0..down {
        for x in 0..across {
            origins.push((x * d + margin_x, y * d + margin_y));
        }
    }
    origins
}

/// Sorts the raster row by row, top to bottom.
///
/// Rows are joined into runs of `line_count` and each run is sorted as one
/// slice, so values migrate across row boundaries within a run. The final
/// run is clipped to the bottom of the image.
pub fn sort_lines<R: Rng>(
    raster: &mut Raster,
    sorter: &mut PixelSorter,
    cfg: &SortConfig,
    line_count: usize,
    rng: &mut R,
) -> Result<()> {
    cfg.validate()?;
    if raster.pixels.is_empty() {
        return Ok(());
    }
    let width = raster.width;
    let rows = raster.height;
    let line_count = line_count.max(1);
    let mut row = 0;
    while row < rows {
        let end = (row + line_count).min(rows);
        sorter.sort_range(&mut raster.pixels, row * width, end * width - 1, cfg, rng);
        row += line_count;
    }
    Ok(())
}

/// Incremental row sorting: each step sorts the next slice of a shuffled
/// row order, so repeated steps eat through the image in a fixed number of
/// bites and then start over.
#[derive(Debug)]
pub struct LineCycle {
    rows: Vec<usize>,
    ranger: RangeManager,
}

impl LineCycle {
    /// Plans a cycle over `height` rows in `steps` slices.
    pub fn new<R: Rng>(height: usize, steps: usize, rng: &mut R) -> Result<LineCycle> {
        let mut rows: Vec<usize> = (0..height).collect();
        rows.shuffle(rng);
        let ranger = RangeManager::new(height, steps)?;
        Ok(LineCycle { rows, ranger })
    }

    pub fn steps(&self) -> usize {
        self.ranger.interval_count()
    }

    /// Sorts the rows of the next slice and reports which slice it was.
    ///
    /// When the previous step finished the cycle, the row order is
    /// reshuffled and the cycle starts again from the first slice.
    pub fn step<R: Rng>(
        &mut self,
        raster: &mut Raster,
        sorter: &mut PixelSorter,
        cfg: &SortConfig,
        rng: &mut R,
    ) -> Result<IntRange> {
        cfg.validate()?;
        let range = match self.ranger.next_interval() {
            Some(range) => range,
            None => {
                self.ranger.reset();
                self.rows.shuffle(rng);
                debug!("row cycle wrapped, reshuffling");
                match self.ranger.next_interval() {
                    Some(range) => range,
                    None => return Err(GlitchError::EmptyDomain),
                }
            }
        };
        let width = raster.width;
        if width == 0 {
            return Ok(range);
        }
        for i in range.lower..=range.upper {
            let row = self.rows[i];
            let lo = row * width;
            let hi = lo + width - 1;
            sorter.sort_range(&mut raster.pixels, lo, hi, cfg, rng);
        }
        Ok(range)
    }
}

/// Sorts the pixels of every grid block along the scanner's traversal.
///
/// `percent` is the chance in `0..=100` that any given block is touched at
/// all. Returns the number of blocks sorted.
pub fn scan_blocks<S, R>(
    raster: &mut Raster,
    scanner: &mut S,
    sorter: &mut PixelSorter,
    cfg: &SortConfig,
    style: ScanStyle,
    percent: f32,
    rng: &mut R,
) -> Result<usize>
where
    S: PixelScanner + ?Sized,
    R: Rng,
{
    cfg.validate()?;
    let d = scanner.block_width();
    let mut buf = Vec::with_capacity(d * d);
    let mut sorted = 0;
    match style {
        ScanStyle::Align | ScanStyle::Random => {
            for (x, y) in block_grid(raster.width, raster.height, d) {
                if rng.gen_range(0.0f32, 100.0) >= percent {
                    continue;
                }
                scanner.pluck_into(&raster.pixels, raster.width, raster.height, x, y, &mut buf)?;
                sorter.sort(&mut buf, cfg, rng);
                scanner.plant(&mut raster.pixels, raster.width, raster.height, x, y, &buf)?;
                sorted += 1;
                if style == ScanStyle::Random {
                    if rng.gen_range(0.0f32, 1.0) > 0.5 {
                        scanner.flip_x();
                    }
                    if rng.gen_range(0.0f32, 1.0) > 0.5 {
                        scanner.flip_y();
                    }
                }
            }
        }
        ScanStyle::Permute => {
            let across = (raster.width / d) / 2;
            let down = (raster.height / d) / 2;
            let margin_x = (raster.width - (raster.width / d) * d) / 2;
            let margin_y = (raster.height - (raster.height / d) * d) / 2;
            for gy in 0..down {
                for gx in 0..across {
                    if rng.gen_range(0.0f32, 100.0) >= percent {
                        continue;
                    }
                    let x = 2 * gx * d + margin_x;
                    let y = 2 * gy * d + margin_y;
                    let mut orients = Orientation::ALL;
                    orients.shuffle(rng);
                    // visit the quarters counterclockwise from the top left
                    let cells = [(x, y), (x, y + d), (x + d, y + d), (x + d, y)];
                    for (&orient, &(cx, cy)) in orients.iter().zip(cells.iter()) {
                        scanner.set_orientation(orient);
                        scanner.pluck_into(
                            &raster.pixels,
                            raster.width,
                            raster.height,
                            cx,
                            cy,
                            &mut buf,
                        )?;
                        sorter.sort(&mut buf, cfg, rng);
                        scanner.plant(&mut raster.pixels, raster.width, raster.height, cx, cy, &buf)?;
                        sorted += 1;
                    }
                }
            }
        }
    }
    Ok(sorted)
}

fn check_transform_size<F: Spectrum + ?Sized>(spectrum: &F, samples: &[f32]) -> Result<()> {
    let expected = 2 * (spectrum.spec_size().saturating_sub(1));
    if expected == 0 || samples.len() != expected {
        return Err(GlitchError::BufferMismatch {
            got: samples.len(),
            expected,
        });
    }
    Ok(())
}

/// Runs one channel of a pixel buffer through the transform and scales each
/// frequency band by its paired gain.
///
/// Gains multiply bin amplitudes directly, so `1.0` leaves a band alone.
/// Bands without a paired gain are left alone too.
pub fn eq_glitch<F>(
    pixels: &mut [Argb],
    chan: Channel,
    spectrum: &mut F,
    bands: &[FrequencyBand],
    gains: &[f32],
    samples: &mut Vec<f32>,
) -> Result<()>
where
    F: Spectrum + ?Sized,
{
    pull_channel(pixels, chan, samples);
    check_transform_size(spectrum, samples)?;
    spectrum.forward(samples);
    for (band, &gain) in bands.iter().zip(gains) {
        scale_bins(spectrum, band.bins, gain)?;
    }
    spectrum.inverse(samples);
    push_channel(pixels, chan, samples);
    Ok(())
}

/// Runs one channel of a pixel buffer through the transform, measures the
/// bin amplitudes and cuts or boosts them around the measured spread.
///
/// The DC bin and the topmost bin are never scaled. Returns the statistics
/// the edges were derived from.
pub fn stat_glitch<F>(
    pixels: &mut [Argb],
    chan: Channel,
    spectrum: &mut F,
    cfg: &StatConfig,
    samples: &mut Vec<f32>,
) -> Result<BandStats>
where
    F: Spectrum + ?Sized,
{
    pull_channel(pixels, chan, samples);
    check_transform_size(spectrum, samples)?;
    spectrum.forward(samples);
    let spec_size = spectrum.spec_size();
    let stats = spectrum_stats(spectrum, IntRange::new(0, spec_size - 1))?;
    let (left_edge, right_edge) = cfg.edges(&stats);
    for bin in 1..spec_size - 1 {
        let amplitude = f64::from(spectrum.get_band(bin));
        if amplitude < left_edge || amplitude > right_edge {
            spectrum.scale_band(bin, cfg.cut);
        } else {
            spectrum.scale_band(bin, cfg.boost);
        }
    }
    spectrum.inverse(samples);
    push_channel(pixels, chan, samples);
    Ok(stats)
}

/// Applies [`eq_glitch`] to every grid block, channel by channel.
///
/// Returns the number of blocks processed.
pub fn eq_scan<S, F>(
    raster: &mut Raster,
    scanner: &S,
    spectrum: &mut F,
    bands: &[FrequencyBand],
    gains: &[f32],
    channels: &[Channel],
) -> Result<usize>
where
    S: PixelScanner + ?Sized,
    F: Spectrum + ?Sized,
{
    let d = scanner.block_width();
    let mut block = Vec::with_capacity(d * d);
    let mut samples = Vec::with_capacity(d * d);
    let mut blocks = 0;
    for (x, y) in block_grid(raster.width, raster.height, d) {
        scanner.pluck_into(&raster.pixels, raster.width, raster.height, x, y, &mut block)?;
        for &chan in channels {
            eq_glitch(&mut block, chan, spectrum, bands, gains, &mut samples)?;
        }
        scanner.plant(&mut raster.pixels, raster.width, raster.height, x, y, &block)?;
        blocks += 1;
    }
    Ok(blocks)
}

/// Applies [`stat_glitch`] to every grid block, channel by channel, and
/// averages the per-block statistics.
pub fn stat_scan<S, F>(
    raster: &mut Raster,
    scanner: &S,
    spectrum: &mut F,
    cfg: &StatConfig,
    channels: &[Channel],
) -> Result<BandStats>
where
    S: PixelScanner + ?Sized,
    F: Spectrum + ?Sized,
{
    let d = scanner.block_width();
    let mut block = Vec::with_capacity(d * d);
    let mut samples = Vec::with_capacity(d * d);
    let mut sum = BandStats::default();
    let mut passes = 0u32;
    for (x, y) in block_grid(raster.width, raster.height, d) {
        scanner.pluck_into(&raster.pixels, raster.width, raster.height, x, y, &mut block)?;
        for &chan in channels {
            let stats = stat_glitch(&mut block, chan, spectrum, cfg, &mut samples)?;
            sum.min += stats.min;
            sum.max += stats.max;
            sum.mean += stats.mean;
            sum.median += stats.median;
            sum.std_dev += stats.std_dev;
            sum.skew += stats.skew;
            passes += 1;
        }
        scanner.plant(&mut raster.pixels, raster.width, raster.height, x, y, &block)?;
    }
    if passes == 0 {
        return Err(GlitchError::EmptyStats);
    }
    let n = f64::from(passes);
    let avg = BandStats {
        min: sum.min / n,
        max: sum.max / n,
        mean: sum.mean / n,
        median: sum.median / n,
        std_dev: sum.std_dev / n,
        skew: sum.skew / n,
    };
    let (left, right) = cfg.edges(&avg);
    info!(
        "spectral averages over {} passes: min = {:.2}, max = {:.2}, mean = {:.2}, median = {:.2}, sd = {:.2}, skew = {:.2}",
        passes, avg.min, avg.max, avg.mean, avg.median, avg.std_dev, avg.skew
    );
    info!("amplitude edges: cut outside ({:.2}, {:.2})", left, right);
    Ok(avg)
}

/// Measures the mean amplitude of each frequency band over the brightness
/// channel of every grid block.
///
/// The raster is only read. Returns one normalized mean per band.
pub fn analyze_bands<S, F>(
    raster: &Raster,
    scanner: &S,
    spectrum: &mut F,
    bands: &[FrequencyBand],
) -> Result<Vec<f64>>
where
    S: PixelScanner + ?Sized,
    F: Spectrum + ?Sized,
{
    let d = scanner.block_width();
    let origins = block_grid(raster.width, raster.height, d);
    if origins.is_empty() {
        return Err(GlitchError::EmptyStats);
    }
    let mut block = Vec::with_capacity(d * d);
    let mut samples = Vec::with_capacity(d * d);
    let mut totals = vec![0.0f64; bands.len()];
    for &(x, y) in &origins {
        scanner.pluck_into(&raster.pixels, raster.width, raster.height, x, y, &mut block)?;
        samples.clear();
        samples.extend(block.iter().map(|px| px.brightness() as f32));
        check_transform_size(spectrum, &samples)?;
        spectrum.forward(&samples);
        for (band, total) in bands.iter().zip(totals.iter_mut()) {
            let mut sum = 0.0f64;
            for bin in band.bins.lower..=band.bins.upper {
                sum += f64::from(spectrum.get_band(bin));
            }
            *total += sum / (band.bins.len() * origins.len()) as f64;
        }
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::scan::Zigzag;
    use crate::sorting::{ColorOrdering, SorterKind};

    use super::*;

    fn shaded(width: usize, height: usize) -> Raster {
        // a deterministic spread of distinct values, no two pixels equal
        let pixels = (0..width * height)
            .map(|i| Argb::opaque((191 - (i * 7) % 192) as u8, (i % 256) as u8, 64))
            .collect();
        Raster::from_pixels(pixels, width, height).unwrap()
    }

    fn keys(pixels: &[Argb]) -> Vec<u32> {
        pixels.iter().map(|&p| ColorOrdering::Rgb.key(p)).collect()
    }

    fn assert_sorted(keys: &[u32]) {
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "keys: {:?}", keys);
    }

    struct FakeSpectrum {
        bands: Vec<f32>,
        stash: Vec<f32>,
        scaled: Vec<(usize, f32)>,
    }

    impl FakeSpectrum {
        fn with_bands(bands: Vec<f32>) -> FakeSpectrum {
            FakeSpectrum {
                bands,
                stash: Vec::new(),
                scaled: Vec::new(),
            }
        }
    }

    impl Spectrum for FakeSpectrum {
        fn spec_size(&self) -> usize {
            self.bands.len()
        }

        fn index_to_freq(&self, bin: usize) -> f32 {
            bin as f32
        }

        fn forward(&mut self, samples: &[f32]) {
            self.stash = samples.to_vec();
        }

        fn inverse(&mut self, samples: &mut [f32]) {
            samples.copy_from_slice(&self.stash);
        }

        fn get_band(&self, bin: usize) -> f32 {
            self.bands[bin]
        }

        fn scale_band(&mut self, bin: usize, factor: f32) {
            self.scaled.push((bin, factor));
            self.bands[bin] *= factor;
        }

        fn scale_freq(&mut self, freq: f32, factor: f32) {
            let bin = freq as usize;
            self.scale_band(bin, factor);
        }
    }

    #[test]
    fn raster_round_trips_through_an_image() {
        let raster = shaded(3, 2);
        let img = raster.to_image();
        assert_eq!(img.dimensions(), (3, 2));
        let back = Raster::from_image(&img);
        assert_eq!(back.pixels(), raster.pixels());
    }

    #[test]
    fn sort_lines_orders_each_row() {
        let mut raster = shaded(8, 4);
        let mut sorter = PixelSorter::new(SorterKind::Insert);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        sort_lines(&mut raster, &mut sorter, &cfg, 1, &mut rng).unwrap();
        for row in raster.pixels().chunks(8) {
            assert_sorted(&keys(row));
        }
    }

    #[test]
    fn grouped_lines_sort_in_runs_and_clip_the_tail() {
        let mut raster = shaded(4, 5);
        let mut sorter = PixelSorter::new(SorterKind::Quick);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        sort_lines(&mut raster, &mut sorter, &cfg, 2, &mut rng).unwrap();
        // rows pair up into runs, the clipped final run is row 4 alone
        assert_sorted(&keys(&raster.pixels()[0..8]));
        assert_sorted(&keys(&raster.pixels()[8..16]));
        assert_sorted(&keys(&raster.pixels()[16..20]));
        assert!(keys(raster.pixels()).windows(2).any(|w| w[0] > w[1]));
    }

    #[test]
    fn line_cycle_covers_the_image_then_wraps() {
        let mut raster = shaded(4, 6);
        let mut sorter = PixelSorter::new(SorterKind::Bubble);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut cycle = LineCycle::new(6, 3, &mut rng).unwrap();
        assert_eq!(cycle.steps(), 3);

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(cycle.step(&mut raster, &mut sorter, &cfg, &mut rng).unwrap());
        }
        assert_eq!(
            seen,
            vec![IntRange::new(0, 1), IntRange::new(2, 3), IntRange::new(4, 5)]
        );
        for row in raster.pixels().chunks(4) {
            assert_sorted(&keys(row));
        }
        // a fourth step starts the next cycle at the first slice again
        let wrapped = cycle.step(&mut raster, &mut sorter, &cfg, &mut rng).unwrap();
        assert_eq!(wrapped, IntRange::new(0, 1));
    }

    #[test]
    fn zero_width_rasters_cycle_without_sorting() {
        let mut raster = Raster::from_pixels(Vec::new(), 0, 4).unwrap();
        let mut sorter = PixelSorter::new(SorterKind::Quick);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut cycle = LineCycle::new(4, 2, &mut rng).unwrap();
        let first = cycle.step(&mut raster, &mut sorter, &cfg, &mut rng).unwrap();
        assert_eq!(first, IntRange::new(0, 1));
        assert!(raster.pixels().is_empty());
    }

    #[test]
    fn scan_blocks_sorts_along_the_traversal() {
        let mut raster = shaded(4, 4);
        let mut scanner = Zigzag::new(2).unwrap();
        let mut sorter = PixelSorter::new(SorterKind::Shell);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(41);
        let sorted = scan_blocks(
            &mut raster,
            &mut scanner,
            &mut sorter,
            &cfg,
            ScanStyle::Align,
            100.0,
            &mut rng,
        )
        .unwrap();
        assert_eq!(sorted, 4);
        for (x, y) in block_grid(4, 4, 2) {
            let block = scanner.pluck(raster.pixels(), 4, 4, x, y).unwrap();
            assert_sorted(&keys(&block));
        }
    }

    #[test]
    fn zero_percent_leaves_the_raster_alone() {
        let mut raster = shaded(4, 4);
        let before = raster.pixels().to_vec();
        let mut scanner = Zigzag::new(2).unwrap();
        let mut sorter = PixelSorter::new(SorterKind::Quick);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let sorted = scan_blocks(
            &mut raster,
            &mut scanner,
            &mut sorter,
            &cfg,
            ScanStyle::Random,
            0.0,
            &mut rng,
        )
        .unwrap();
        assert_eq!(sorted, 0);
        assert_eq!(raster.pixels(), &before[..]);
    }

    #[test]
    fn scan_margins_stay_untouched() {
        let mut raster = shaded(8, 7);
        let before = raster.pixels().to_vec();
        let mut scanner = Zigzag::new(3).unwrap();
        let mut sorter = PixelSorter::new(SorterKind::Quick);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(23);
        let sorted = scan_blocks(
            &mut raster,
            &mut scanner,
            &mut sorter,
            &cfg,
            ScanStyle::Align,
            100.0,
            &mut rng,
        )
        .unwrap();
        assert_eq!(sorted, 4);
        let grid = block_grid(8, 7, 3);
        let covered = |x: usize, y: usize| {
            grid.iter()
                .any(|&(bx, by)| x >= bx && x < bx + 3 && y >= by && y < by + 3)
        };
        // the centered grid leaves both vertical margins and the bottom row
        assert!(!covered(0, 0) && !covered(7, 0) && !covered(3, 6));
        for y in 0..7 {
            for x in 0..8 {
                if !covered(x, y) {
                    assert_eq!(
                        raster.pixels()[y * 8 + x],
                        before[y * 8 + x],
                        "({}, {})",
                        x,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn permute_deals_all_four_orientations() {
        let mut raster = shaded(8, 8);
        let mut scanner = Zigzag::new(2).unwrap();
        let mut sorter = PixelSorter::new(SorterKind::Insert);
        let cfg = SortConfig::default();
        let mut rng = StdRng::seed_from_u64(19);
        let sorted = scan_blocks(
            &mut raster,
            &mut scanner,
            &mut sorter,
            &cfg,
            ScanStyle::Permute,
            100.0,
            &mut rng,
        )
        .unwrap();
        // two super-blocks per axis, four cells each
        assert_eq!(sorted, 16);
    }

    #[test]
    fn eq_glitch_scales_each_band_by_its_gain() {
        // four samples, so the fake spectrum needs three bins
        let mut pixels = vec![
            Argb::opaque(10, 0, 0),
            Argb::opaque(20, 0, 0),
            Argb::opaque(30, 0, 0),
            Argb::opaque(40, 0, 0),
        ];
        let mut spectrum = FakeSpectrum::with_bands(vec![1.0, 1.0, 1.0]);
        let bands = [
            FrequencyBand {
                bins: IntRange::new(0, 1),
                lo_freq: 0.0,
                hi_freq: 2.0,
            },
            FrequencyBand {
                bins: IntRange::new(2, 2),
                lo_freq: 2.0,
                hi_freq: 3.0,
            },
        ];
        let mut samples = Vec::new();
        eq_glitch(
            &mut pixels,
            Channel::Red,
            &mut spectrum,
            &bands,
            &[2.0, 0.25],
            &mut samples,
        )
        .unwrap();
        assert_eq!(spectrum.scaled, vec![(0, 2.0), (1, 2.0), (2, 0.25)]);
        // the fake transform reproduces its input, so the pixels survive
        let reds: Vec<u8> = pixels.iter().map(|p| p.red()).collect();
        assert_eq!(reds, vec![10, 20, 30, 40]);
    }

    #[test]
    fn stat_glitch_spares_the_dc_and_top_bins() {
        let mut pixels = vec![Argb::opaque(0, 128, 0); 4];
        let mut spectrum = FakeSpectrum::with_bands(vec![4.0, 1.0, 9.0]);
        let cfg = StatConfig::default();
        let mut samples = Vec::new();
        let stats = stat_glitch(
            &mut pixels,
            Channel::Green,
            &mut spectrum,
            &cfg,
            &mut samples,
        )
        .unwrap();
        assert_eq!(stats.median, 4.0);
        // bin 1 sits below mean - 0.25 sd, so it is cut; bins 0 and 2 are
        // out of the scaling range entirely
        assert_eq!(spectrum.scaled, vec![(1, 0.5)]);
    }

    #[test]
    fn transform_size_mismatch_is_reported() {
        let mut pixels = vec![Argb::opaque(0, 0, 0); 6];
        let mut spectrum = FakeSpectrum::with_bands(vec![1.0, 1.0, 1.0]);
        let mut samples = Vec::new();
        let err = stat_glitch(
            &mut pixels,
            Channel::Red,
            &mut spectrum,
            &StatConfig::default(),
            &mut samples,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GlitchError::BufferMismatch {
                got: 6,
                expected: 4
            }
        );
    }

    #[test]
    fn analyze_bands_averages_band_amplitudes() {
        let raster = shaded(2, 2);
        let scanner = Zigzag::new(2).unwrap();
        let mut spectrum = FakeSpectrum::with_bands(vec![2.0, 4.0, 6.0]);
        let bands = [
            FrequencyBand {
                bins: IntRange::new(0, 1),
                lo_freq: 0.0,
                hi_freq: 2.0,
            },
            FrequencyBand {
                bins: IntRange::new(2, 2),
                lo_freq: 2.0,
                hi_freq: 3.0,
            },
        ];
        let totals = analyze_bands(&raster, &scanner, &mut spectrum, &bands).unwrap();
        assert_eq!(totals, vec![3.0, 6.0]);
    }
}
