use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Write a synthetic three-ink dataset: a `.quad` with LK, C and K curves
/// and the L*a*b* ramp those curves would print.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Directory to write `sample.quad` and `sample_lab.txt` into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Seed for the measurement noise.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Standard deviation of the L* noise.
    #[arg(long, default_value_t = 0.08)]
    noise: f64,
}

const CURVE_POINTS: usize = 256;
const MAX_DRAW: f64 = 65535.0;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Ink channel with its draw curve and density per unit of draw area.
struct Ink {
    name: &'static str,
    draws: Vec<f64>,
    strength: f64,
}

fn inks() -> Vec<Ink> {
    let x = |i: usize| i as f64 / (CURVE_POINTS - 1) as f64;
    vec![
        Ink {
            name: "LK",
            draws: (0..CURVE_POINTS).map(|i| gaussian(x(i), 0.25, 0.14, 30000.0)).collect(),
            strength: 1.2,
        },
        Ink {
            name: "C",
            draws: (0..CURVE_POINTS).map(|i| gaussian(x(i), 0.5, 0.11, 14000.0)).collect(),
            strength: 1.5,
        },
        Ink {
            name: "K",
            draws: (0..CURVE_POINTS)
                .map(|i| MAX_DRAW * ((x(i) - 0.4).max(0.0) / 0.6).powf(1.4))
                .collect(),
            strength: 2.2,
        },
    ]
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn quad_text(inks: &[Ink]) -> Result<String> {
    let names: Vec<&str> = inks.iter().map(|ink| ink.name).collect();
    let mut out = String::new();
    writeln!(out, "## QuadToneRIP {}", names.join(","))?;
    writeln!(out, "# Synthetic carbon profile")?;
    for ink in inks {
        writeln!(out, "# {} curve", ink.name)?;
        for draw in &ink.draws {
            writeln!(out, "{}", draw.round().clamp(0.0, MAX_DRAW) as u32)?;
        }
    }
    Ok(out)
}

/// L* at an input level: paper white minus every ink's accumulated density.
fn lightness(inks: &[Ink], input: f64) -> f64 {
    let last = (input / 100.0 * (CURVE_POINTS - 1) as f64).round() as usize;
    let density: f64 = inks
        .iter()
        .map(|ink| {
            let area: f64 = ink.draws[..=last].iter().sum::<f64>() / MAX_DRAW / (CURVE_POINTS - 1) as f64;
            ink.strength * area * 100.0
        })
        .sum();
    96.0 - density
}

fn lab_text(inks: &[Ink], rng: &mut SimpleRng, noise: f64) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "GRAY\tLAB_L\tLAB_A\tLAB_B")?;
    for i in 0..=40 {
        let input = i as f64 * 2.5;
        let l = (lightness(inks, input) + rng.gauss(0.0, noise)).clamp(0.0, 100.0);
        let a = rng.gauss(0.0, 0.3);
        let b = rng.gauss(-0.5, 0.3);
        writeln!(out, "{input:.1}\t{l:.3}\t{a:.3}\t{b:.3}")?;
    }
    Ok(out)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let inks = inks();

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let quad_path = args.out_dir.join("sample.quad");
    std::fs::write(&quad_path, quad_text(&inks)?)
        .with_context(|| format!("writing {}", quad_path.display()))?;

    let lab_path = args.out_dir.join("sample_lab.txt");
    std::fs::write(&lab_path, lab_text(&inks, &mut rng, args.noise)?)
        .with_context(|| format!("writing {}", lab_path.display()))?;

    println!(
        "Wrote {} channels ({} points each) to {} and 41 measurements to {}",
        inks.len(),
        CURVE_POINTS,
        quad_path.display(),
        lab_path.display()
    );
    Ok(())
}
