use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use emg_inspector::data::loader::save_mat;
use emg_inspector::data::model::{ElementType, NamedArray};

const CHANNELS: usize = 12;
const ACC_CHANNELS: usize = 36;
const MOVEMENTS: u8 = 17;
const REPETITIONS: u8 = 6;

/// Write a synthetic EMG recording laid out like a NinaPro DB2 file.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output file
    #[arg(default_value = "sample_emg.mat")]
    out: PathBuf,

    /// Number of samples
    #[arg(short, long, default_value_t = 120_000)]
    rows: usize,

    /// Store each array zlib-compressed
    #[arg(short, long)]
    compress: bool,
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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

/// Protocol timeline: rest blocks alternating with movement repetitions.
///
/// Returns `(stimulus, repetition)` per sample. Rest is class 0.
fn protocol(rows: usize) -> (Vec<f64>, Vec<f64>) {
    let trials = MOVEMENTS as usize * REPETITIONS as usize;
    // Each trial is one movement block followed by a rest block of equal length.
    let block = (rows / (2 * trials).max(1)).max(1);

    let mut stimulus = Vec::with_capacity(rows);
    let mut repetition = Vec::with_capacity(rows);
    for i in 0..rows {
        let trial = i / (2 * block);
        let moving = (i / block) % 2 == 0 && trial < trials;
        if moving {
            stimulus.push((trial / REPETITIONS as usize + 1) as f64);
            repetition.push((trial % REPETITIONS as usize + 1) as f64);
        } else {
            stimulus.push(0.0);
            repetition.push(0.0);
        }
    }
    (stimulus, repetition)
}

/// Surface EMG: noise whose amplitude rises while a movement is held.
fn emg(rows: usize, stimulus: &[f64], rng: &mut SimpleRng) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|i| {
            let active = stimulus[i] != 0.0;
            (0..CHANNELS)
                .map(|ch| {
                    let gain = if active {
                        2e-5 * (1.0 + (stimulus[i] + ch as f64) % 4.0)
                    } else {
                        2e-6
                    };
                    rng.gauss(0.0, gain)
                })
                .collect()
        })
        .collect()
}

/// Slow accelerometer drift, stored single precision.
fn acc(rows: usize, rng: &mut SimpleRng) -> Vec<Vec<f64>> {
    let mut level = vec![0.0f64; ACC_CHANNELS];
    (0..rows)
        .map(|_| {
            for v in &mut level {
                *v = (*v + rng.gauss(0.0, 1e-3)).clamp(-1.0, 1.0);
            }
            level.iter().map(|&v| v as f32 as f64).collect()
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    anyhow::ensure!(args.rows > 0, "--rows must be positive");

    let mut rng = SimpleRng::new(42);
    let rows = args.rows;
    let (stimulus, repetition) = protocol(rows);

    let arrays = vec![
        NamedArray::from_rows("emg", ElementType::Float64, &emg(rows, &stimulus, &mut rng))?,
        NamedArray::from_rows("acc", ElementType::Float32, &acc(rows, &mut rng))?,
        NamedArray::column_vector("stimulus", ElementType::UInt8, stimulus.clone()),
        NamedArray::column_vector("restimulus", ElementType::UInt8, stimulus),
        NamedArray::column_vector("repetition", ElementType::UInt8, repetition.clone()),
        NamedArray::column_vector("rerepetition", ElementType::UInt8, repetition),
        NamedArray::scalar("subject", ElementType::UInt8, 1.0),
        NamedArray::scalar("exercise", ElementType::UInt8, 1.0),
        NamedArray::scalar("daytesting", ElementType::UInt8, 1.0),
        // Per-movement table; its row count differs from the recording.
        NamedArray::column_vector(
            "movements",
            ElementType::UInt8,
            (1..=MOVEMENTS).map(f64::from).collect(),
        ),
    ];

    save_mat(&args.out, &arrays, args.compress)
        .with_context(|| format!("writing {}", args.out.display()))?;

    println!(
        "Wrote {} samples x {CHANNELS} channels ({} arrays) to {}",
        rows,
        arrays.len(),
        args.out.display()
    );
    Ok(())
}
