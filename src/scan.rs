//! Space-filling scan orders over square pixel blocks.
//!
//! A scanner linearizes a `d x d` block of a larger raster into a flat
//! buffer (`pluck`) and writes such a buffer back (`plant`). The zig-zag
//! order is the diagonal traversal JPEG compression uses; the Hilbert
//! order keeps neighbors in the sequence close in the plane, which reads
//! much better through a frequency transform.

use crate::color::Argb;
use crate::error::{GlitchError, Result};

/// Reflection state applied to a scanner's coordinate table at lookup
/// time. The table itself never changes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Orientation {
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Orientation {
    /// The four distinct orientations of a square block.
    pub const ALL: [Orientation; 4] = [
        Orientation {
            flip_x: false,
            flip_y: false,
        },
        Orientation {
            flip_x: true,
            flip_y: false,
        },
        Orientation {
            flip_x: false,
            flip_y: true,
        },
        Orientation {
            flip_x: true,
            flip_y: true,
        },
    ];
}

/// Common surface of the two scan orders.
pub trait PixelScanner {
    /// Edge length `d` of the scanned block.
    fn block_width(&self) -> usize;

    /// Curve recursion depth, for scanners that have one.
    fn depth(&self) -> Option<u32>;

    fn orientation(&self) -> Orientation;

    fn set_orientation(&mut self, orient: Orientation);

    /// The `i`-th block coordinate of the traversal, orientation applied.
    fn coord(&self, i: usize) -> (usize, usize);

    /// Gathers the block at `(origin_x, origin_y)` into `out` in traversal
    /// order, reusing `out`'s capacity.
    fn pluck_into(
        &self,
        raster: &[Argb],
        width: usize,
        height: usize,
        origin_x: usize,
        origin_y: usize,
        out: &mut Vec<Argb>,
    ) -> Result<()>;

    /// Scatters `buf` back over the block at `(origin_x, origin_y)`.
    fn plant(
        &self,
        raster: &mut [Argb],
        width: usize,
        height: usize,
        origin_x: usize,
        origin_y: usize,
        buf: &[Argb],
    ) -> Result<()>;

    fn flip_x(&mut self) {
        let mut orient = self.orientation();
        orient.flip_x = !orient.flip_x;
        self.set_orientation(orient);
    }

    fn flip_y(&mut self) {
        let mut orient = self.orientation();
        orient.flip_y = !orient.flip_y;
        self.set_orientation(orient);
    }

    fn pluck(
        &self,
        raster: &[Argb],
        width: usize,
        height: usize,
        origin_x: usize,
        origin_y: usize,
    ) -> Result<Vec<Argb>> {
        let mut out = Vec::new();
        self.pluck_into(raster, width, height, origin_x, origin_y, &mut out)?;
        Ok(out)
    }
}

/// Diagonal traversal of a `d x d` block in the classic JPEG order.
#[derive(Clone, Debug)]
pub struct Zigzag {
    coords: Vec<(u32, u32)>,
    width: usize,
    orient: Orientation,
}

impl Zigzag {
    /// Builds the scan for a block `order` pixels on edge.
    pub fn new(order: usize) -> Result<Zigzag> {
        if order == 0 {
            return Err(GlitchError::BadOrder(order));
        }
        let d = order;
        let mut coords = Vec::with_capacity(d * d);
        for t in 0..(2 * d - 1) {
            // the diagonal x + y = t, swept in alternating directions
            let lo = t.saturating_sub(d - 1);
            let hi = t.min(d - 1);
            if t % 2 == 0 {
                for x in lo..=hi {
                    coords.push((x as u32, (t - x) as u32));
                }
            } else {
                for x in (lo..=hi).rev() {
                    coords.push((x as u32, (t - x) as u32));
                }
            }
        }
        Ok(Zigzag {
            coords,
            width: d,
            orient: Orientation::default(),
        })
    }
}

impl PixelScanner for Zigzag {
    fn block_width(&self) -> usize {
        self.width
    }

    fn depth(&self) -> Option<u32> {
        None
    }

    fn orientation(&self) -> Orientation {
        self.orient
    }

    fn set_orientation(&mut self, orient: Orientation) {
        self.orient = orient;
    }

    fn coord(&self, i: usize) -> (usize, usize) {
        oriented(&self.coords, self.width, self.orient, i)
    }

    fn pluck_into(
        &self,
        raster: &[Argb],
        width: usize,
        height: usize,
        origin_x: usize,
        origin_y: usize,
        out: &mut Vec<Argb>,
    ) -> Result<()> {
        pluck_table(
            &self.coords,
            self.width,
            self.orient,
            raster,
            width,
            height,
            origin_x,
            origin_y,
            out,
        )
    }

    fn plant(
        &self,
        raster: &mut [Argb],
        width: usize,
        height: usize,
        origin_x: usize,
        origin_y: usize,
        buf: &[Argb],
    ) -> Result<()> {
        plant_table(
            &self.coords,
            self.width,
            self.orient,
            raster,
            width,
            height,
            origin_x,
            origin_y,
            buf,
        )
    }
}

/// Hilbert-curve traversal of a `2^depth x 2^depth` block.
#[derive(Clone, Debug)]
pub struct Hilbert {
    coords: Vec<(u32, u32)>,
    width: usize,
    depth: u32,
    orient: Orientation,
}

/// Depths beyond this would build unreasonably large coordinate tables.
pub const MAX_HILBERT_DEPTH: u32 = 12;

impl Hilbert {
    pub fn new(depth: u32) -> Result<Hilbert> {
        if depth == 0 || depth > MAX_HILBERT_DEPTH {
            return Err(GlitchError::BadDepth(depth));
        }
        let d = 1usize << depth;
        let program = expand_lsystem(depth);
        let mut coords = Vec::with_capacity(d * d);
        coords.push((0, 0));
        let dirs: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
        let (mut x, mut y) = (0i32, 0i32);
        let mut dir = 0usize;
        for ch in program.bytes() {
            match ch {
                b'+' => dir = (dir + 1) % 4,
                b'-' => dir = (dir + 3) % 4,
                b'F' => {
                    x += dirs[dir].0;
                    y += dirs[dir].1;
                    coords.push((x as u32, y as u32));
                }
                _ => {}
            }
        }
        Ok(Hilbert {
            coords,
            width: d,
            depth,
            orient: Orientation::default(),
        })
    }

    /// Smallest valid depth whose block covers `order` pixels on edge,
    /// clamped to the supported range.
    pub fn depth_for_block(order: usize) -> u32 {
        let mut depth = 1;
        while depth < MAX_HILBERT_DEPTH && (1usize << depth) < order {
            depth += 1;
        }
        depth
    }
}

impl PixelScanner for Hilbert {
    fn block_width(&self) -> usize {
        self.width
    }

    fn depth(&self) -> Option<u32> {
        Some(self.depth)
    }

    fn orientation(&self) -> Orientation {
        self.orient
    }

    fn set_orientation(&mut self, orient: Orientation) {
        self.orient = orient;
    }

    fn coord(&self, i: usize) -> (usize, usize) {
        oriented(&self.coords, self.width, self.orient, i)
    }

    fn pluck_into(
        &self,
        raster: &[Argb],
        width: usize,
        height: usize,
        origin_x: usize,
        origin_y: usize,
        out: &mut Vec<Argb>,
    ) -> Result<()> {
        pluck_table(
            &self.coords,
            self.width,
            self.orient,
            raster,
            width,
            height,
            origin_x,
            origin_y,
            out,
        )
    }

    fn plant(
        &self,
        raster: &mut [Argb],
        width: usize,
        height: usize,
        origin_x: usize,
        origin_y: usize,
        buf: &[Argb],
    ) -> Result<()> {
        plant_table(
            &self.coords,
            self.width,
            self.orient,
            raster,
            width,
            height,
            origin_x,
            origin_y,
            buf,
        )
    }
}

/// Runs the two-symbol rewriting system `depth` times starting from `L`.
/// `+`/`-` turn the drawing turtle, `F` advances it one cell.
fn expand_lsystem(depth: u32) -> String {
    let mut current = String::from("L");
    for _ in 0..depth {
        let mut next = String::with_capacity(current.len() * 11);
        for ch in current.chars() {
            match ch {
                'L' => next.push_str("+RF-LFL-FR+"),
                'R' => next.push_str("-LF+RFR+FL-"),
                other => next.push(other),
            }
        }
        current = next;
    }
    current
}

#[inline]
fn oriented(coords: &[(u32, u32)], d: usize, orient: Orientation, i: usize) -> (usize, usize) {
    let (mut x, mut y) = (coords[i].0 as usize, coords[i].1 as usize);
    if orient.flip_x {
        x = d - 1 - x;
    }
    if orient.flip_y {
        y = d - 1 - y;
    }
    (x, y)
}

fn check_block(
    d: usize,
    raster_len: usize,
    width: usize,
    height: usize,
    origin_x: usize,
    origin_y: usize,
) -> Result<()> {
    if raster_len != width * height {
        return Err(GlitchError::RasterMismatch {
            len: raster_len,
            width,
            height,
        });
    }
    if origin_x + d > width || origin_y + d > height {
        return Err(GlitchError::BlockOutOfBounds {
            width: d,
            x: origin_x,
            y: origin_y,
            raster_width: width,
            raster_height: height,
        });
    }
    Ok(())
}

fn pluck_table(
    coords: &[(u32, u32)],
    d: usize,
    orient: Orientation,
    raster: &[Argb],
    width: usize,
    height: usize,
    origin_x: usize,
    origin_y: usize,
    out: &mut Vec<Argb>,
) -> Result<()> {
    check_block(d, raster.len(), width, height, origin_x, origin_y)?;
    out.clear();
    out.reserve(coords.len());
    for i in 0..coords.len() {
        let (x, y) = oriented(coords, d, orient, i);
        out.push(raster[(origin_y + y) * width + origin_x + x]);
    }
    Ok(())
}

fn plant_table(
    coords: &[(u32, u32)],
    d: usize,
    orient: Orientation,
    raster: &mut [Argb],
    width: usize,
    height: usize,
    origin_x: usize,
    origin_y: usize,
    buf: &[Argb],
) -> Result<()> {
    check_block(d, raster.len(), width, height, origin_x, origin_y)?;
    if buf.len() != coords.len() {
        return Err(GlitchError::BufferMismatch {
            got: buf.len(),
            expected: coords.len(),
        });
    }
    for (i, &value) in buf.iter().enumerate() {
        let (x, y) = oriented(coords, d, orient, i);
        // SAFETY: check_block proved the whole block lies inside the raster,
        // and table coordinates never leave [0, d)
        unsafe { *raster.get_unchecked_mut((origin_y + y) * width + origin_x + x) = value };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_three_matches_jpeg_order() {
        let zz = Zigzag::new(3).unwrap();
        let visited: Vec<_> = (0..9).map(|i| zz.coord(i)).collect();
        assert_eq!(
            visited,
            vec![
                (0, 0),
                (1, 0),
                (0, 1),
                (0, 2),
                (1, 1),
                (2, 0),
                (2, 1),
                (1, 2),
                (2, 2)
            ]
        );
    }

    #[test]
    fn hilbert_depth_one_traversal() {
        let h = Hilbert::new(1).unwrap();
        let visited: Vec<_> = (0..4).map(|i| h.coord(i)).collect();
        assert_eq!(visited, vec![(0, 0), (0, 1), (1, 1), (1, 0)]);
    }

    #[test]
    fn constructors_reject_degenerate_sizes() {
        assert!(Zigzag::new(0).is_err());
        assert!(Hilbert::new(0).is_err());
        assert!(Hilbert::new(MAX_HILBERT_DEPTH + 1).is_err());
    }

    #[test]
    fn depth_reporting() {
        assert_eq!(Zigzag::new(4).unwrap().depth(), None);
        assert_eq!(Hilbert::new(3).unwrap().depth(), Some(3));
        assert_eq!(Hilbert::new(3).unwrap().block_width(), 8);
    }

    #[test]
    fn depth_for_block_rounds_up() {
        assert_eq!(Hilbert::depth_for_block(2), 1);
        assert_eq!(Hilbert::depth_for_block(3), 2);
        assert_eq!(Hilbert::depth_for_block(64), 6);
        assert_eq!(Hilbert::depth_for_block(65), 7);
    }

    #[test]
    fn out_of_bounds_block_is_reported() {
        let raster = vec![Argb::default(); 16];
        let zz = Zigzag::new(3).unwrap();
        let err = zz.pluck(&raster, 4, 4, 2, 2).unwrap_err();
        match err {
            GlitchError::BlockOutOfBounds { .. } => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn orientations_keep_the_traversal_a_bijection() {
        fn check<S: PixelScanner>(scanner: &mut S, label: &str) {
            let d = scanner.block_width();
            let want: Vec<(usize, usize)> = (0..d)
                .flat_map(|x| (0..d).map(move |y| (x, y)))
                .collect();
            for &orient in Orientation::ALL.iter() {
                scanner.set_orientation(orient);
                let mut seen: Vec<_> = (0..d * d).map(|i| scanner.coord(i)).collect();
                seen.sort();
                assert_eq!(seen, want, "{} d {} {:?}", label, d, orient);
            }
        }
        for &order in &[1usize, 2, 3, 5, 8, 16] {
            check(&mut Zigzag::new(order).unwrap(), "zigzag");
        }
        for depth in 1..=4 {
            check(&mut Hilbert::new(depth).unwrap(), "hilbert");
        }
    }

    #[test]
    fn flips_are_involutions() {
        let mut zz = Zigzag::new(4).unwrap();
        let base: Vec<_> = (0..16).map(|i| zz.coord(i)).collect();
        zz.flip_y();
        let flipped: Vec<_> = (0..16).map(|i| zz.coord(i)).collect();
        assert_ne!(base, flipped);
        zz.flip_y();
        let twice: Vec<_> = (0..16).map(|i| zz.coord(i)).collect();
        assert_eq!(base, twice);
    }

    #[test]
    fn hilbert_steps_are_always_adjacent() {
        let h = Hilbert::new(4).unwrap();
        let d = h.block_width();
        for i in 1..d * d {
            let (x0, y0) = h.coord(i - 1);
            let (x1, y1) = h.coord(i);
            let dist = (x0 as i64 - x1 as i64).abs() + (y0 as i64 - y1 as i64).abs();
            assert_eq!(dist, 1, "step {}", i);
        }
    }

    #[test]
    fn pluck_then_plant_restores_the_raster() {
        let width = 7;
        let height = 6;
        let raster: Vec<Argb> = (0..width * height)
            .map(|i| Argb::opaque(i as u8, (2 * i) as u8, 1))
            .collect();
        let mut scratch = raster.clone();
        let mut h = Hilbert::new(2).unwrap();
        h.set_orientation(Orientation {
            flip_x: true,
            flip_y: false,
        });
        let block = h.pluck(&scratch, width, height, 2, 1).unwrap();
        assert_eq!(block.len(), 16);
        h.plant(&mut scratch, width, height, 2, 1, &block).unwrap();
        assert_eq!(scratch, raster);
    }
}
