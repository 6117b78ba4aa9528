//! Packed 32-bit ARGB colors and the channel arithmetic shared by the
//! sorting and scanning effects.

/// A packed color: alpha in bits 24-31, then red, green, blue.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Argb(pub u32);

impl Argb {
    /// Packs all four channel values.
    #[inline]
    pub fn pack(a: u8, r: u8, g: u8, b: u8) -> Argb {
        Argb((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Packs three channel values under a fully opaque alpha.
    #[inline]
    pub fn opaque(r: u8, g: u8, b: u8) -> Argb {
        Argb::pack(0xFF, r, g, b)
    }

    #[inline]
    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub fn channel(self, chan: Channel) -> u8 {
        match chan {
            Channel::Red => self.red(),
            Channel::Green => self.green(),
            Channel::Blue => self.blue(),
        }
    }

    /// Replaces one channel, keeping the others and the alpha bits as they are.
    #[inline]
    pub fn with_channel(self, chan: Channel, value: u8) -> Argb {
        let shift = match chan {
            Channel::Red => 16,
            Channel::Green => 8,
            Channel::Blue => 0,
        };
        Argb(self.0 & !(0xFF << shift) | (value as u32) << shift)
    }

    /// Brightness in `0..=255`: the largest of the three channels.
    #[inline]
    pub fn brightness(self) -> u8 {
        self.red().max(self.green()).max(self.blue())
    }

    /// Saturation in `0..=255`, zero for grays and for black.
    pub fn saturation(self) -> u8 {
        let max = self.brightness();
        if max == 0 {
            return 0;
        }
        let min = self.red().min(self.green()).min(self.blue());
        ((max - min) as f32 * 255.0 / max as f32).round() as u8
    }

    /// Hue on the same `0..=255` scale as the other components, zero for
    /// grays, so a full turn of the color wheel spans one byte.
    pub fn hue(self) -> u8 {
        let (r, g, b) = (
            self.red() as f32,
            self.green() as f32,
            self.blue() as f32,
        );
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        if delta == 0.0 {
            return 0;
        }
        let mut h = if r == max {
            (g - b) / delta
        } else if g == max {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        } / 6.0;
        if h < 0.0 {
            h += 1.0;
        }
        (h * 255.0).round() as u8
    }
}

/// One of the three 8-bit color components a swap rule or a sample
/// transfer can single out.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Position within an `[r, g, b]` triple.
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Copies one channel of every pixel into `samples` as floats, reusing the
/// buffer's capacity.
pub fn pull_channel(pixels: &[Argb], chan: Channel, samples: &mut Vec<f32>) {
    samples.clear();
    samples.extend(pixels.iter().map(|px| px.channel(chan) as f32));
}

/// Writes float samples back into one channel of every pixel, truncating
/// and clamping each value to `0..=255` and forcing the alpha opaque.
pub fn push_channel(pixels: &mut [Argb], chan: Channel, samples: &[f32]) {
    for (px, &sample) in pixels.iter_mut().zip(samples) {
        let value = (sample as i32).max(0).min(255) as u8;
        let filled = px.with_channel(chan, value);
        *px = Argb::opaque(filled.red(), filled.green(), filled.blue());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_in_argb_order() {
        let c = Argb::opaque(0x10, 0x20, 0x30);
        assert_eq!(c.0, 0xFF10_2030);
        assert_eq!(c.alpha(), 0xFF);
        assert_eq!(c.red(), 0x10);
        assert_eq!(c.green(), 0x20);
        assert_eq!(c.blue(), 0x30);
    }

    #[test]
    fn with_channel_touches_one_component() {
        let c = Argb(0x8010_2030).with_channel(Channel::Green, 0xAB);
        assert_eq!(c.0, 0x8010_AB30);
    }

    #[test]
    fn hsb_of_primaries() {
        assert_eq!(Argb::opaque(255, 0, 0).hue(), 0);
        assert_eq!(Argb::opaque(0, 255, 0).hue(), 85);
        assert_eq!(Argb::opaque(0, 0, 255).hue(), 170);
        assert_eq!(Argb::opaque(255, 0, 0).saturation(), 255);
        assert_eq!(Argb::opaque(255, 0, 0).brightness(), 255);
    }

    #[test]
    fn hue_runs_red_to_magenta() {
        // secondaries pin the sign of the per-sextant differences
        assert_eq!(Argb::opaque(255, 255, 0).hue(), 43);
        assert_eq!(Argb::opaque(0, 255, 255).hue(), 128);
        assert_eq!(Argb::opaque(255, 0, 255).hue(), 212);
    }

    #[test]
    fn hsb_of_grays() {
        for &v in &[0u8, 127, 255] {
            let gray = Argb::opaque(v, v, v);
            assert_eq!(gray.hue(), 0);
            assert_eq!(gray.saturation(), 0);
            assert_eq!(gray.brightness(), v);
        }
    }

    #[test]
    fn push_truncates_and_clamps() {
        let mut pixels = vec![Argb(0x0011_2233); 4];
        push_channel(&mut pixels, Channel::Red, &[-5.0, 12.7, 300.0, 255.0]);
        let reds: Vec<u8> = pixels.iter().map(|px| px.red()).collect();
        assert_eq!(reds, vec![0, 12, 255, 255]);
        // alpha comes back opaque
        assert!(pixels.iter().all(|px| px.alpha() == 0xFF));
    }

    #[test]
    fn pull_reuses_the_buffer() {
        let pixels = vec![Argb::opaque(1, 2, 3), Argb::opaque(4, 5, 6)];
        let mut samples = vec![0.0; 16];
        pull_channel(&pixels, Channel::Blue, &mut samples);
        assert_eq!(samples, vec![3.0, 6.0]);
    }
}
