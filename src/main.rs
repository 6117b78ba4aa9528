use clap::{App, Arg};
use image::imageops;
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::path::{Path, PathBuf};
use std::str;

use pixelglitch::bands::BandPartitioner;
use pixelglitch::color::Channel;
use pixelglitch::effects::{self, LineCycle, Raster, ScanStyle, StatConfig};
use pixelglitch::fft::FftSpectrum;
use pixelglitch::scan::{Hilbert, PixelScanner, Zigzag};
use pixelglitch::sorting::{
    ColorOrdering, PixelSorter, SortConfig, SorterKind, SwapRule, SHELL_PRESETS,
};

/// Nominal sample rate the frequency bands are laid out against.
const SAMPLE_RATE: f32 = 262_144.0;

#[derive(Clone, Copy)]
pub enum Effect {
    Lines,
    Cycle,
    Zigzag,
    Hilbert,
    Eq,
    Stat,
    Analyze,
}

impl str::FromStr for Effect {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lines" => Ok(Effect::Lines),
            "cycle" => Ok(Effect::Cycle),
            "zigzag" => Ok(Effect::Zigzag),
            "hilbert" => Ok(Effect::Hilbert),
            "eq" => Ok(Effect::Eq),
            "stat" => Ok(Effect::Stat),
            "analyze" => Ok(Effect::Analyze),
            _ => Err(String::from(s)),
        }
    }
}

#[derive(Clone, Copy)]
pub enum Curve {
    Zigzag,
    Hilbert,
}

impl str::FromStr for Curve {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zigzag" => Ok(Curve::Zigzag),
            "hilbert" => Ok(Curve::Hilbert),
            _ => Err(String::from(s)),
        }
    }
}

#[derive(Clone, Copy)]
pub enum Rotation {
    Zero,
    Quarter,
    Half,
    NegQuarter,
}

impl str::FromStr for Rotation {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let num = s
            .parse::<isize>()
            .map_err(|e| format!("{:?}", e))?
            .rem_euclid(360);
        match num {
            0 => Ok(Rotation::Zero),
            90 => Ok(Rotation::Quarter),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::NegQuarter),
            _ => Err(String::from("rotation angle must be a multiple of 90")),
        }
    }
}

fn main() {
    use std::str::FromStr;
    env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = App::new("pixelglitch")
        .version(clap::crate_version!())
        .about("Bring your pixels out of order.")
        .arg(
            Arg::with_name("input")
                .help("The input image to glitch.")
                .required(true)
                .takes_value(true),
        )
        .args(&[
            arg_output(),
            arg_effect(),
            arg_sorter(),
            arg_order(),
            arg_descending(),
            arg_swap(),
            arg_swap_weight(),
            arg_break(),
            arg_shell(),
            arg_block(),
            arg_depth(),
            arg_style(),
            arg_percent(),
            arg_lines(),
            arg_steps(),
            arg_runs(),
            arg_curve(),
            arg_channels(),
            arg_gains(),
            arg_left(),
            arg_right(),
            arg_boost(),
            arg_cut(),
            arg_rotation(),
            arg_seed(),
        ])
        .get_matches();
    let input = Path::new(matches.value_of_os("input").unwrap());
    let mut image = image::open(input)
        .expect("failed to read input image")
        .to_rgba();
    let output = matches
        .value_of_os("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let extension = input
                .extension()
                .and_then(std::ffi::OsStr::to_str)
                .unwrap_or("png");
            input.with_extension(["glitched", ".", extension].concat())
        });
    let rotate = Rotation::from_str(matches.value_of("rotation").unwrap()).unwrap();

    // rotate
    match rotate {
        Rotation::Quarter => image = imageops::rotate90(&image),
        Rotation::Half => image = imageops::rotate180(&image),
        Rotation::NegQuarter => image = imageops::rotate270(&image),
        Rotation::Zero => (),
    }

    let effect = Effect::from_str(matches.value_of("effect").unwrap()).unwrap();
    let mut rng = match matches.value_of("seed") {
        Some(seed) => StdRng::seed_from_u64(seed.parse().expect("seed was not an integer")),
        None => StdRng::from_entropy(),
    };

    let mut cfg = SortConfig::default();
    cfg.ordering = ColorOrdering::from_str(matches.value_of("order").unwrap()).unwrap();
    cfg.ascending = !matches.is_present("descending");
    if let Some(rule) = matches.value_of("swap") {
        cfg.swap_rule = Some(SwapRule::from_str(rule).unwrap());
    }
    cfg.swap_weight = matches
        .value_of("swap-weight")
        .unwrap()
        .parse()
        .expect("swap weight was not a number");
    if let Some(point) = matches.value_of("break") {
        cfg.random_break = true;
        cfg.break_point = point.parse().expect("break point was not a number");
    }
    cfg.validate().expect("invalid sorting settings");

    let mut sorter =
        PixelSorter::new(SorterKind::from_str(matches.value_of("sorter").unwrap()).unwrap());
    if let Some(preset) = matches.value_of("shell") {
        let i: usize = preset.parse().expect("shell preset was not an integer");
        let (ratio, divisor) = *SHELL_PRESETS.get(i).expect("no such shell preset");
        sorter
            .set_shell_params(ratio, divisor)
            .expect("invalid shell parameters");
    }

    let block: usize = matches
        .value_of("block")
        .unwrap()
        .parse()
        .expect("block width was not an integer");
    let percent: f32 = matches
        .value_of("percent")
        .unwrap()
        .parse()
        .expect("percent was not a number");
    let style = ScanStyle::from_str(matches.value_of("style").unwrap()).unwrap();
    let curve = Curve::from_str(matches.value_of("curve").unwrap()).unwrap();
    let depth: Option<u32> = matches
        .value_of("depth")
        .map(|d| d.parse().expect("depth was not an integer"));
    let channels = parse_channels(matches.value_of("channels").unwrap());

    let mut raster = Raster::from_image(&image);
    match effect {
        Effect::Lines => {
            let lines: usize = matches
                .value_of("lines")
                .unwrap()
                .parse()
                .expect("line count was not an integer");
            effects::sort_lines(&mut raster, &mut sorter, &cfg, lines, &mut rng)
                .expect("line sorting failed");
        }
        Effect::Cycle => {
            let steps: usize = matches
                .value_of("steps")
                .unwrap()
                .parse()
                .expect("step count was not an integer");
            let runs: usize = matches
                .value_of("runs")
                .unwrap()
                .parse()
                .expect("run count was not an integer");
            let mut cycle =
                LineCycle::new(raster.height(), steps, &mut rng).expect("invalid step count");
            for _ in 0..runs {
                cycle
                    .step(&mut raster, &mut sorter, &cfg, &mut rng)
                    .expect("cycle step failed");
            }
        }
        Effect::Zigzag => {
            let mut scanner = Zigzag::new(block).expect("invalid block width");
            effects::scan_blocks(
                &mut raster,
                &mut scanner,
                &mut sorter,
                &cfg,
                style,
                percent,
                &mut rng,
            )
            .expect("block scan failed");
        }
        Effect::Hilbert => {
            let depth = depth.unwrap_or_else(|| Hilbert::depth_for_block(block));
            let mut scanner = Hilbert::new(depth).expect("invalid curve depth");
            effects::scan_blocks(
                &mut raster,
                &mut scanner,
                &mut sorter,
                &cfg,
                style,
                percent,
                &mut rng,
            )
            .expect("block scan failed");
        }
        Effect::Eq => {
            let scanner = curve_scanner(curve, block, depth);
            let edge = scanner.block_width();
            let mut fft = FftSpectrum::new(edge * edge, SAMPLE_RATE)
                .expect("block width must be a power of two");
            let bands = BandPartitioner::default()
                .partition(&fft)
                .expect("band layout failed");
            let gains = parse_gains(matches.value_of("gains").unwrap());
            effects::eq_scan(
                &mut raster,
                scanner.as_ref(),
                &mut fft,
                &bands,
                &gains,
                &channels,
            )
            .expect("eq glitch failed");
        }
        Effect::Stat => {
            let stat_cfg = StatConfig {
                left_bound: matches
                    .value_of("left")
                    .unwrap()
                    .parse()
                    .expect("left bound was not a number"),
                right_bound: matches
                    .value_of("right")
                    .unwrap()
                    .parse()
                    .expect("right bound was not a number"),
                boost: matches
                    .value_of("boost")
                    .unwrap()
                    .parse()
                    .expect("boost was not a number"),
                cut: matches
                    .value_of("cut")
                    .unwrap()
                    .parse()
                    .expect("cut was not a number"),
            };
            let scanner = curve_scanner(curve, block, depth);
            let edge = scanner.block_width();
            let mut fft = FftSpectrum::new(edge * edge, SAMPLE_RATE)
                .expect("block width must be a power of two");
            effects::stat_scan(&mut raster, scanner.as_ref(), &mut fft, &stat_cfg, &channels)
                .expect("stat glitch failed");
        }
        Effect::Analyze => {
            let scanner = curve_scanner(curve, block, depth);
            let edge = scanner.block_width();
            let mut fft = FftSpectrum::new(edge * edge, SAMPLE_RATE)
                .expect("block width must be a power of two");
            let bands = BandPartitioner::default()
                .partition(&fft)
                .expect("band layout failed");
            let means = effects::analyze_bands(&raster, scanner.as_ref(), &mut fft, &bands)
                .expect("analysis failed");
            println!("band  bins            frequencies            mean amplitude");
            for (i, (band, mean)) in bands.iter().zip(means.iter()).enumerate() {
                println!(
                    "{:>4}  {:>6} ..{:>6}  {:>9.1} ..{:>10.1} Hz  {:.4}",
                    i, band.bins.lower, band.bins.upper, band.lo_freq, band.hi_freq, mean
                );
            }
            // analysis never touches the image, so there is nothing to save
            return;
        }
    }
    image = raster.to_image();
    // rotate back
    match rotate {
        Rotation::Quarter => image = imageops::rotate270(&image),
        Rotation::Half => image = imageops::rotate180(&image),
        Rotation::NegQuarter => image = imageops::rotate90(&image),
        Rotation::Zero => (),
    }
    image.save(&output).unwrap();
}

fn curve_scanner(curve: Curve, block: usize, depth: Option<u32>) -> Box<dyn PixelScanner> {
    match curve {
        Curve::Zigzag => Box::new(Zigzag::new(block).expect("invalid block width")),
        Curve::Hilbert => {
            let depth = depth.unwrap_or_else(|| Hilbert::depth_for_block(block));
            Box::new(Hilbert::new(depth).expect("invalid curve depth"))
        }
    }
}

fn parse_channels(arg: &str) -> Vec<Channel> {
    arg.chars()
        .map(|c| match c {
            'r' => Channel::Red,
            'g' => Channel::Green,
            'b' => Channel::Blue,
            _ => panic!("unknown channel `{}`, expected a subset of `rgb`", c),
        })
        .collect()
}

fn parse_gains(arg: &str) -> Vec<f32> {
    arg.split(',')
        .map(|s| {
            s.trim()
                .parse()
                .expect("gains must be comma-separated numbers")
        })
        .collect()
}

fn arg_output() -> Arg<'static, 'static> {
    Arg::with_name("output")
        .short("o")
        .long("output")
        .help("A file path to save the output image to.")
        .takes_value(true)
}

fn arg_effect() -> Arg<'static, 'static> {
    Arg::with_name("effect")
        .short("e")
        .long("effect")
        .help("The glitch effect to apply.")
        .long_help(
            "The glitch effect to apply.\n\
             \n\
             `lines` sorts the image row by row and `cycle` does the same incrementally \
             over a shuffled row order. `zigzag` and `hilbert` sort square blocks along \
             the named scanning curve. `eq` scales frequency bands of each block, `stat` \
             cuts and boosts block frequencies around their measured spread, and `analyze` \
             prints the mean band amplitudes without touching the image.",
        )
        .possible_values(&["lines", "cycle", "zigzag", "hilbert", "eq", "stat", "analyze"])
        .default_value("lines")
        .takes_value(true)
}

fn arg_sorter() -> Arg<'static, 'static> {
    Arg::with_name("sorter")
        .short("s")
        .long("sorter")
        .help("The sorting algorithm to glitch with.")
        .long_help(
            "The sorting algorithm to glitch with.\n\
             \n\
             The algorithms only differ visibly when a sort is interrupted (see --break) \
             or a swap rule distorts the exchanges (see --swap); a completed clean sort \
             gives the same result for all of them.",
        )
        .possible_values(&["quick", "shell", "bubble", "insert"])
        .default_value("quick")
        .takes_value(true)
}

fn arg_order() -> Arg<'static, 'static> {
    Arg::with_name("order")
        .long("order")
        .help("The component order pixels are compared by.")
        .long_help(
            "The component order pixels are compared by.\n\
             \n\
             Three-letter names list the components most significant first, either a \
             permutation of the red/green/blue channels or of hue/saturation/brightness.",
        )
        .possible_values(&[
            "rgb", "rbg", "gbr", "grb", "brg", "bgr", "hsb", "hbs", "sbh", "shb", "bhs", "bsh",
        ])
        .default_value("rgb")
        .takes_value(true)
}

fn arg_descending() -> Arg<'static, 'static> {
    Arg::with_name("descending")
        .short("d")
        .long("descending")
        .help("Sorts pixels in descending instead of ascending order.")
}

fn arg_swap() -> Arg<'static, 'static> {
    Arg::with_name("swap")
        .long("swap")
        .help("Restricts exchanges to one channel pair.")
        .long_help(
            "Restricts exchanges to one channel pair.\n\
             \n\
             The first letter names the channel written on the left pixel, the second \
             the channel it is taken from on the right pixel, so `rb` pushes blue values \
             into the red channel. With a fractional --swap-weight the channels blend \
             instead of trading places.",
        )
        .possible_values(&["rr", "rg", "rb", "gr", "gg", "gb", "br", "bg", "bb"])
        .takes_value(true)
}

fn arg_swap_weight() -> Arg<'static, 'static> {
    Arg::with_name("swap-weight")
        .long("swap-weight")
        .help("Weight of a swap; values below 1.0 blend the channel pair.")
        .default_value("1.0")
        .takes_value(true)
}

fn arg_break() -> Arg<'static, 'static> {
    Arg::with_name("break")
        .long("break")
        .help("Interrupts sorts at random, at a threshold in (0, 999].")
        .long_help(
            "Interrupts sorts at random, at a threshold in (0, 999].\n\
             \n\
             Each sorting pass draws against the threshold and abandons the range when \
             the draw exceeds it, leaving the range partially sorted. Lower values break \
             sooner. Without this option sorts always run to completion.",
        )
        .takes_value(true)
}

fn arg_shell() -> Arg<'static, 'static> {
    Arg::with_name("shell")
        .long("shell")
        .help("Gap preset (0-10) for the shell sorter.")
        .takes_value(true)
}

fn arg_block() -> Arg<'static, 'static> {
    Arg::with_name("block")
        .short("b")
        .long("block")
        .help("Edge length of the square blocks scanned over the image.")
        .long_help(
            "Edge length of the square blocks scanned over the image.\n\
             \n\
             The block grid is centered, leaving edges that do not divide evenly \
             untouched. The frequency effects `eq`, `stat` and `analyze` require a \
             power of two.",
        )
        .default_value("128")
        .takes_value(true)
}

fn arg_depth() -> Arg<'static, 'static> {
    Arg::with_name("depth")
        .long("depth")
        .help("Recursion depth of the hilbert curve, overriding --block.")
        .takes_value(true)
}

fn arg_style() -> Arg<'static, 'static> {
    Arg::with_name("style")
        .long("style")
        .help("How block orientations vary over the grid.")
        .long_help(
            "How block orientations vary over the grid.\n\
             \n\
             `align` scans every block the same way, `random` flips the scan axes of \
             each block at random, and `permute` deals the four orientations out \
             randomly within groups of four blocks.",
        )
        .possible_values(&["align", "random", "permute"])
        .default_value("align")
        .takes_value(true)
}

fn arg_percent() -> Arg<'static, 'static> {
    Arg::with_name("percent")
        .short("p")
        .long("percent")
        .help("The chance in percent that a scanned block is sorted.")
        .default_value("100")
        .takes_value(true)
}

fn arg_lines() -> Arg<'static, 'static> {
    Arg::with_name("lines")
        .long("lines")
        .help("Number of rows joined into one sorting run by `lines`.")
        .default_value("1")
        .takes_value(true)
}

fn arg_steps() -> Arg<'static, 'static> {
    Arg::with_name("steps")
        .long("steps")
        .help("Number of slices a `cycle` splits the rows into.")
        .default_value("1")
        .takes_value(true)
}

fn arg_runs() -> Arg<'static, 'static> {
    Arg::with_name("runs")
        .long("runs")
        .help("Number of `cycle` slices to actually sort.")
        .long_help(
            "Number of `cycle` slices to actually sort.\n\
             \n\
             Fewer runs than steps leave part of the image untouched; more runs than \
             steps wrap around into a fresh cycle over a reshuffled row order.",
        )
        .default_value("1")
        .takes_value(true)
}

fn arg_curve() -> Arg<'static, 'static> {
    Arg::with_name("curve")
        .short("c")
        .long("curve")
        .help("The scanning curve used by the frequency effects.")
        .possible_values(&["zigzag", "hilbert"])
        .default_value("zigzag")
        .takes_value(true)
}

fn arg_channels() -> Arg<'static, 'static> {
    Arg::with_name("channels")
        .long("channels")
        .help("The color channels the frequency effects run over.")
        .default_value("rgb")
        .takes_value(true)
}

fn arg_gains() -> Arg<'static, 'static> {
    Arg::with_name("gains")
        .long("gains")
        .help("Comma-separated amplitude factors, lowest band first.")
        .long_help(
            "Comma-separated amplitude factors, lowest band first.\n\
             \n\
             Each factor multiplies the amplitudes of one frequency band; 1.0 leaves a \
             band alone. Bands beyond the list are left alone. Run `analyze` to see the \
             band layout for the current block size.",
        )
        .required_if("effect", "eq")
        .takes_value(true)
}

fn arg_left() -> Arg<'static, 'static> {
    Arg::with_name("left")
        .long("left")
        .help("Left amplitude edge for `stat`, in standard deviations.")
        .default_value("-0.25")
        .allow_hyphen_values(true)
        .takes_value(true)
}

fn arg_right() -> Arg<'static, 'static> {
    Arg::with_name("right")
        .long("right")
        .help("Right amplitude edge for `stat`, in standard deviations.")
        .default_value("5.0")
        .allow_hyphen_values(true)
        .takes_value(true)
}

fn arg_boost() -> Arg<'static, 'static> {
    Arg::with_name("boost")
        .long("boost")
        .help("Factor applied between the amplitude edges by `stat`.")
        .default_value("2.0")
        .takes_value(true)
}

fn arg_cut() -> Arg<'static, 'static> {
    Arg::with_name("cut")
        .long("cut")
        .help("Factor applied outside the amplitude edges by `stat`.")
        .default_value("0.5")
        .takes_value(true)
}

fn arg_rotation() -> Arg<'static, 'static> {
    Arg::with_name("rotation")
        .short("r")
        .long("rotation")
        .help("The rotation to apply to the image prior to glitching.")
        .long_help(
            "The rotation to apply to the image prior to glitching.\n\
             \n\
             The image is rotated back before saving, so this sets the direction the \
             effects work in. Sorting runs along rows; to sort columns instead, rotate \
             by 90 or 270 degrees. Any multiple of 90 is accepted.",
        )
        .default_value("0")
        .takes_value(true)
}

fn arg_seed() -> Arg<'static, 'static> {
    Arg::with_name("seed")
        .long("seed")
        .help("Seeds the random generator for reproducible output.")
        .takes_value(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_scanners_honor_the_depth_override() {
        assert_eq!(curve_scanner(Curve::Hilbert, 16, None).block_width(), 16);
        assert_eq!(curve_scanner(Curve::Hilbert, 16, Some(5)).block_width(), 32);
        assert_eq!(curve_scanner(Curve::Hilbert, 65, None).block_width(), 128);
        assert_eq!(curve_scanner(Curve::Zigzag, 16, Some(5)).block_width(), 16);
    }
}
