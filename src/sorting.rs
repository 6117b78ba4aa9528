//! Comparator/exchange machinery and the four interruptible sort
//! strategies that give reordered pixels their glitched look.

use std::cmp::Ordering;
use std::str;

use rand::Rng;

use crate::color::{Argb, Channel};
use crate::error::{GlitchError, Result};

/// Which channel triple forms the comparison key, and in what order.
///
/// The first six permute red, green and blue directly; the second six
/// permute the derived hue, saturation and brightness components.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorOrdering {
    Rgb,
    Rbg,
    Gbr,
    Grb,
    Brg,
    Bgr,
    Hsb,
    Hbs,
    Sbh,
    Shb,
    Bhs,
    Bsh,
}

impl ColorOrdering {
    pub const ALL: [ColorOrdering; 12] = [
        ColorOrdering::Rgb,
        ColorOrdering::Rbg,
        ColorOrdering::Gbr,
        ColorOrdering::Grb,
        ColorOrdering::Brg,
        ColorOrdering::Bgr,
        ColorOrdering::Hsb,
        ColorOrdering::Hbs,
        ColorOrdering::Sbh,
        ColorOrdering::Shb,
        ColorOrdering::Bhs,
        ColorOrdering::Bsh,
    ];

    /// Packs the ordering's component triple under an opaque alpha. Keys
    /// compare as plain unsigned integers.
    pub fn key(self, c: Argb) -> u32 {
        let key = match self {
            ColorOrdering::Rgb => Argb::opaque(c.red(), c.green(), c.blue()),
            ColorOrdering::Rbg => Argb::opaque(c.red(), c.blue(), c.green()),
            ColorOrdering::Gbr => Argb::opaque(c.green(), c.blue(), c.red()),
            ColorOrdering::Grb => Argb::opaque(c.green(), c.red(), c.blue()),
            ColorOrdering::Brg => Argb::opaque(c.blue(), c.red(), c.green()),
            ColorOrdering::Bgr => Argb::opaque(c.blue(), c.green(), c.red()),
            ColorOrdering::Hsb => Argb::opaque(c.hue(), c.saturation(), c.brightness()),
            ColorOrdering::Hbs => Argb::opaque(c.hue(), c.brightness(), c.saturation()),
            ColorOrdering::Sbh => Argb::opaque(c.saturation(), c.brightness(), c.hue()),
            ColorOrdering::Shb => Argb::opaque(c.saturation(), c.hue(), c.brightness()),
            ColorOrdering::Bhs => Argb::opaque(c.brightness(), c.hue(), c.saturation()),
            ColorOrdering::Bsh => Argb::opaque(c.brightness(), c.saturation(), c.hue()),
        };
        key.0
    }
}

impl str::FromStr for ColorOrdering {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rgb" => Ok(ColorOrdering::Rgb),
            "rbg" => Ok(ColorOrdering::Rbg),
            "gbr" => Ok(ColorOrdering::Gbr),
            "grb" => Ok(ColorOrdering::Grb),
            "brg" => Ok(ColorOrdering::Brg),
            "bgr" => Ok(ColorOrdering::Bgr),
            "hsb" => Ok(ColorOrdering::Hsb),
            "hbs" => Ok(ColorOrdering::Hbs),
            "sbh" => Ok(ColorOrdering::Sbh),
            "shb" => Ok(ColorOrdering::Shb),
            "bhs" => Ok(ColorOrdering::Bhs),
            "bsh" => Ok(ColorOrdering::Bsh),
            _ => Err(String::from(s)),
        }
    }
}

/// Names the pair of channels an exchange trades: the first letter is the
/// channel of the earlier element, the second that of the later one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SwapRule {
    Rr,
    Rg,
    Rb,
    Gr,
    Gg,
    Gb,
    Br,
    Bg,
    Bb,
}

impl SwapRule {
    pub const ALL: [SwapRule; 9] = [
        SwapRule::Rr,
        SwapRule::Rg,
        SwapRule::Rb,
        SwapRule::Gr,
        SwapRule::Gg,
        SwapRule::Gb,
        SwapRule::Br,
        SwapRule::Bg,
        SwapRule::Bb,
    ];

    #[inline]
    pub fn channels(self) -> (Channel, Channel) {
        match self {
            SwapRule::Rr => (Channel::Red, Channel::Red),
            SwapRule::Rg => (Channel::Red, Channel::Green),
            SwapRule::Rb => (Channel::Red, Channel::Blue),
            SwapRule::Gr => (Channel::Green, Channel::Red),
            SwapRule::Gg => (Channel::Green, Channel::Green),
            SwapRule::Gb => (Channel::Green, Channel::Blue),
            SwapRule::Br => (Channel::Blue, Channel::Red),
            SwapRule::Bg => (Channel::Blue, Channel::Green),
            SwapRule::Bb => (Channel::Blue, Channel::Blue),
        }
    }
}

impl str::FromStr for SwapRule {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rr" => Ok(SwapRule::Rr),
            "rg" => Ok(SwapRule::Rg),
            "rb" => Ok(SwapRule::Rb),
            "gr" => Ok(SwapRule::Gr),
            "gg" => Ok(SwapRule::Gg),
            "gb" => Ok(SwapRule::Gb),
            "br" => Ok(SwapRule::Br),
            "bg" => Ok(SwapRule::Bg),
            "bb" => Ok(SwapRule::Bb),
            _ => Err(String::from(s)),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SorterKind {
    Quick,
    Shell,
    Bubble,
    Insert,
}

impl SorterKind {
    pub const ALL: [SorterKind; 4] = [
        SorterKind::Quick,
        SorterKind::Shell,
        SorterKind::Bubble,
        SorterKind::Insert,
    ];
}

impl str::FromStr for SorterKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "quick" => Ok(SorterKind::Quick),
            "shell" => Ok(SorterKind::Shell),
            "bubble" => Ok(SorterKind::Bubble),
            "insert" => Ok(SorterKind::Insert),
            _ => Err(String::from(s)),
        }
    }
}

/// Shellsort gap parameters that pair well visually, as (ratio, divisor).
pub const SHELL_PRESETS: [(usize, usize); 11] = [
    (2, 3),
    (2, 5),
    (3, 5),
    (3, 7),
    (3, 9),
    (4, 7),
    (4, 9),
    (5, 7),
    (5, 9),
    (5, 11),
    (8, 13),
];

/// One sort invocation's settings. Owned by the caller and borrowed for
/// the duration of the call.
#[derive(Clone, Debug)]
pub struct SortConfig {
    pub ordering: ColorOrdering,
    pub swap_rule: Option<SwapRule>,
    /// Blend factor for channel exchanges; anything at or above 1 swaps
    /// the channels outright.
    pub swap_weight: f32,
    pub ascending: bool,
    /// Threshold in `(0, 999]` the break test draws against; lower values
    /// interrupt sooner and leave more of the range untouched.
    pub break_point: f32,
    pub random_break: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            ordering: ColorOrdering::Rgb,
            swap_rule: None,
            swap_weight: 1.0,
            ascending: true,
            break_point: 500.0,
            random_break: false,
        }
    }
}

impl SortConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.swap_weight.is_finite() || self.swap_weight <= 0.0 {
            return Err(GlitchError::BadSwapWeight(self.swap_weight));
        }
        if !(self.break_point > 0.0 && self.break_point <= 999.0) {
            return Err(GlitchError::BadBreakPoint(self.break_point));
        }
        Ok(())
    }
}

/// In-place pixel sorter. Comparison components captured by the most
/// recent compare feed the following exchange, so a sorter instance
/// belongs to one scan sequence at a time.
pub struct PixelSorter {
    kind: SorterKind,
    shell_ratio: usize,
    shell_divisor: usize,
    count: u64,
    comp_v: [u8; 3],
    comp_w: [u8; 3],
}

impl PixelSorter {
    pub fn new(kind: SorterKind) -> PixelSorter {
        PixelSorter {
            kind,
            shell_ratio: 3,
            shell_divisor: 9,
            count: 0,
            comp_v: [0; 3],
            comp_w: [0; 3],
        }
    }

    pub fn kind(&self) -> SorterKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: SorterKind) {
        self.kind = kind;
    }

    /// Shellsort gap parameters; `ratio` must be at least 2 and `divisor`
    /// at least 1. See [`SHELL_PRESETS`] for pairs that work.
    pub fn set_shell_params(&mut self, ratio: usize, divisor: usize) -> Result<()> {
        if ratio < 2 || divisor == 0 {
            return Err(GlitchError::BadShellParams { ratio, divisor });
        }
        self.shell_ratio = ratio;
        self.shell_divisor = divisor;
        Ok(())
    }

    /// Total comparisons made since construction or the last reset.
    pub fn comparisons(&self) -> u64 {
        self.count
    }

    pub fn reset_comparisons(&mut self) {
        self.count = 0;
    }

    /// Sorts the whole slice. Empty and single-element slices are left
    /// alone.
    pub fn sort<R: Rng>(&mut self, a: &mut [Argb], cfg: &SortConfig, rng: &mut R) {
        if a.len() > 1 {
            let hi = a.len() - 1;
            self.sort_range(a, 0, hi, cfg, rng);
        }
    }

    /// Sorts the inclusive range `[lo, hi]`. Inverted or out-of-bounds
    /// ranges are a no-op.
    pub fn sort_range<R: Rng>(
        &mut self,
        a: &mut [Argb],
        lo: usize,
        hi: usize,
        cfg: &SortConfig,
        rng: &mut R,
    ) {
        if lo >= hi || hi >= a.len() {
            return;
        }
        match self.kind {
            SorterKind::Quick => self.quick(a, lo, hi, cfg, rng),
            SorterKind::Shell => self.shell(a, lo, hi, cfg, rng),
            SorterKind::Bubble => self.bubble(a, lo, hi, cfg, rng),
            SorterKind::Insert => self.insert(a, lo, hi, cfg, rng),
        }
    }

    /// Compares two colors under the configured ordering, capturing both
    /// RGB triples for a following exchange.
    fn compare(&mut self, v: Argb, w: Argb, cfg: &SortConfig) -> Ordering {
        self.comp_v = [v.red(), v.green(), v.blue()];
        self.comp_w = [w.red(), w.green(), w.blue()];
        self.count += 1;
        let ord = cfg.ordering.key(v).cmp(&cfg.ordering.key(w));
        if cfg.ascending {
            ord
        } else {
            ord.reverse()
        }
    }

    /// Exchanges positions `i` and `j`. Without a swap rule this is a
    /// plain swap; with one, only the rule's channel pair trades places
    /// (or blends), donor values taken from the captured compare triples.
    fn exchange(&mut self, a: &mut [Argb], i: usize, j: usize, cfg: &SortConfig) {
        let rule = match cfg.swap_rule {
            Some(rule) => rule,
            None => {
                a.swap(i, j);
                return;
            }
        };
        let (ci, cj) = rule.channels();
        let own_i = self.comp_v[ci.index()];
        let own_j = self.comp_w[cj.index()];
        if cfg.swap_weight >= 1.0 {
            a[i] = rebuild(self.comp_v, ci, own_j);
            a[j] = rebuild(self.comp_w, cj, own_i);
        } else {
            let w = cfg.swap_weight;
            a[i] = rebuild(self.comp_v, ci, blend(own_i, own_j, w));
            a[j] = rebuild(self.comp_w, cj, blend(own_j, own_i, w));
        }
    }

    /// Compare-and-exchange of two positions, the building block every
    /// strategy shares.
    fn comp_exch(&mut self, a: &mut [Argb], i: usize, j: usize, cfg: &SortConfig) {
        if self.compare(a[i], a[j], cfg) == Ordering::Greater {
            self.exchange(a, i, j, cfg);
        }
    }

    fn break_test<R: Rng>(&self, cfg: &SortConfig, rng: &mut R) -> bool {
        cfg.random_break && cfg.break_point < rng.gen_range(0.0f32, 1000.0)
    }

    fn quick<R: Rng>(
        &mut self,
        a: &mut [Argb],
        lo: usize,
        hi: usize,
        cfg: &SortConfig,
        rng: &mut R,
    ) {
        if hi <= lo {
            return;
        }
        // abandoning a subrange leaves it partially partitioned
        if self.break_test(cfg, rng) {
            return;
        }
        let mid = self.partition(a, lo, hi, cfg);
        if mid > lo {
            self.quick(a, lo, mid - 1, cfg, rng);
        }
        self.quick(a, mid + 1, hi, cfg, rng);
    }

    fn partition(&mut self, a: &mut [Argb], lo: usize, hi: usize, cfg: &SortConfig) -> usize {
        let pivot = a[hi];
        let mut i = lo;
        let mut j = hi;
        loop {
            while self.compare(a[i], pivot, cfg) == Ordering::Less {
                i += 1;
            }
            while j > lo {
                j -= 1;
                if self.compare(pivot, a[j], cfg) != Ordering::Less {
                    break;
                }
            }
            if i >= j {
                break;
            }
            self.exchange(a, i, j, cfg);
            i += 1;
        }
        self.exchange(a, i, hi, cfg);
        i
    }

    fn shell<R: Rng>(
        &mut self,
        a: &mut [Argb],
        lo: usize,
        hi: usize,
        cfg: &SortConfig,
        rng: &mut R,
    ) {
        let mut h = 1;
        while h <= (hi - lo) / self.shell_divisor {
            h = self.shell_ratio * h + 1;
        }
        while h > 0 {
            for i in (lo + h)..=hi {
                let mut j = i;
                while j >= lo + h && self.compare(a[j - h], a[j], cfg) == Ordering::Greater {
                    self.exchange(a, j - h, j, cfg);
                    j -= h;
                }
                if self.break_test(cfg, rng) {
                    return;
                }
            }
            h /= self.shell_ratio;
        }
    }

    fn bubble<R: Rng>(
        &mut self,
        a: &mut [Argb],
        lo: usize,
        hi: usize,
        cfg: &SortConfig,
        rng: &mut R,
    ) {
        for i in lo..hi {
            for j in ((i + 1)..=hi).rev() {
                self.comp_exch(a, j - 1, j, cfg);
            }
            if self.break_test(cfg, rng) {
                return;
            }
        }
    }

    fn insert<R: Rng>(
        &mut self,
        a: &mut [Argb],
        lo: usize,
        hi: usize,
        cfg: &SortConfig,
        rng: &mut R,
    ) {
        for i in (lo + 1)..=hi {
            let mut j = i;
            while j > lo && self.compare(a[j - 1], a[j], cfg) == Ordering::Greater {
                self.exchange(a, j - 1, j, cfg);
                j -= 1;
            }
            if self.break_test(cfg, rng) {
                return;
            }
        }
    }
}

#[inline]
fn rebuild(triple: [u8; 3], chan: Channel, value: u8) -> Argb {
    let mut t = triple;
    t[chan.index()] = value;
    Argb::opaque(t[0], t[1], t[2])
}

/// Linear interpolation from `own` toward `donor`, rounded and clamped to
/// the channel range.
#[inline]
fn blend(own: u8, donor: u8, weight: f32) -> u8 {
    let v = own as f32 + weight * (donor as f32 - own as f32);
    v.round().max(0.0).min(255.0) as u8
}
