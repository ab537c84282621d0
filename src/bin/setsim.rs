use std::process::exit;

use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use setsim::{
    c, CoordinateRange, Error, Formula, GeneratorConfig, Multibrot, Result, SetVariant, Status,
};

const SHADES: &[u8] = b" .:-=+*#%";
const SETS: &[&str] = &["mandelbrot", "julia", "multibrot"];

#[derive(Debug, StructOpt)]
#[structopt(name = "setsim", about = "Step through escape-time fractal generation")]
struct Opt {
    #[structopt(long, default_value = "mandelbrot", possible_values = SETS)]
    set: String,

    #[structopt(long, default_value = "-2", allow_hyphen_values = true)]
    x_min: f64,
    #[structopt(long, default_value = "1", allow_hyphen_values = true)]
    x_max: f64,
    #[structopt(long, default_value = "-1", allow_hyphen_values = true)]
    y_min: f64,
    #[structopt(long, default_value = "1", allow_hyphen_values = true)]
    y_max: f64,

    #[structopt(long, default_value = "80")]
    cols: usize,
    #[structopt(long, default_value = "40")]
    rows: usize,
    #[structopt(short, long, default_value = "100")]
    iterations: u32,

    /// Julia constant, real part
    #[structopt(long, default_value = "-0.79", allow_hyphen_values = true)]
    re: f64,
    /// Julia constant, imaginary part
    #[structopt(long, default_value = "0.15", allow_hyphen_values = true)]
    im: f64,

    /// Multibrot exponent
    #[structopt(long, default_value = "3")]
    power: u32,

    /// Worker threads; 0 steps on the main thread and logs every step
    #[structopt(short, long, default_value = "0")]
    threads: usize,

    /// Print the divergence map as text
    #[structopt(long)]
    ascii: bool,

    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

impl Opt {
    fn variant(&self) -> Result<SetVariant> {
        Ok(match self.set.as_str() {
            "julia" => SetVariant::julia(c(self.re, self.im)),
            "multibrot" => Multibrot::new(self.power)?.into(),
            "mandelbrot" => SetVariant::mandelbrot(),
            other => return Err(Error::UnknownSet(other.to_string())),
        })
    }

    fn config(&self) -> Result<GeneratorConfig> {
        Ok(GeneratorConfig {
            range: CoordinateRange::new(self.x_min, self.x_max, self.y_min, self.y_max)?,
            cols: self.cols,
            rows: self.rows,
            max_iterations: self.iterations,
            variant: self.variant()?,
            threads: self.threads,
        })
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn shade(divergence: u32, max_iterations: u32) -> char {
    if divergence == setsim::NOT_DIVERGED {
        return '@';
    }
    let n = SHADES.len() as u64;
    let i = (u64::from(divergence) * n / (u64::from(max_iterations) + 1)).min(n - 1);
    SHADES[i as usize] as char
}

fn run(opt: &Opt) -> Result<()> {
    let config = opt.config()?;
    let mut generator = config.build()?;
    info!(set = generator.formula().name(), "generating");

    if opt.threads > 1 {
        generator.run_to_completion()?;
    } else {
        while !generator.is_terminal() {
            let step = generator.step()?;
            if step.newly_diverged > 0 {
                info!(
                    iteration = step.iteration,
                    escaped = step.newly_diverged,
                    active = step.active,
                    "step"
                );
            }
        }
    }

    let session = generator.session();
    let status = match session.status() {
        Status::AllDiverged => "all points escaped",
        _ => "iteration budget exhausted",
    };
    println!(
        "{}: {} after {} iterations, {} of {} points bounded",
        generator.formula().name(),
        status,
        session.current_iteration(),
        session.active_count(),
        session.template().len(),
    );

    if opt.ascii {
        let divergence = generator.displayed();
        // row 0 is y_min; print the top of the plane first
        for row in divergence.outer_iter().rev() {
            let line: String = row
                .iter()
                .map(|&d| shade(d, generator.max_iterations()))
                .collect();
            println!("{}", line);
        }
    }
    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    init_logging(opt.verbose);
    if let Err(e) = run(&opt) {
        eprintln!("error: {}", e);
        exit(1);
    }
}
