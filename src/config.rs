//! Default generation settings, and assembly of a [`Generator`] from them.

use crate::complex::C;
use crate::coord::CoordinateRange;
use crate::error::Result;
use crate::solver::Sequential;
use crate::variant::{SetVariant, DEFAULT_JULIA_CONSTANT};
use crate::Generator;

pub const DEFAULT_COLS: usize = 800;
pub const DEFAULT_ROWS: usize = 600;
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    pub range: CoordinateRange,
    pub cols: usize,
    pub rows: usize,
    pub max_iterations: u32,
    pub variant: SetVariant,
    /// Worker threads for [`Generator::run_to_completion`]; 0 or 1 runs on
    /// the calling thread.
    pub threads: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            range: CoordinateRange::default(),
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            variant: SetVariant::default(),
            threads: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn julia(k: C<f64>) -> Self {
        Self {
            variant: SetVariant::julia(k),
            ..Self::default()
        }
    }

    pub fn default_julia() -> Self {
        Self::julia(DEFAULT_JULIA_CONSTANT)
    }

    pub fn build(&self) -> Result<Generator<SetVariant>> {
        let generator = Generator::new(
            self.range,
            self.cols,
            self.rows,
            self.max_iterations,
            self.variant,
        )?;
        Ok(if self.threads > 1 {
            generator.with_solver(Sequential.threaded(self.threads))
        } else {
            generator
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::variant::Formula;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        let g = config.build().unwrap();
        assert_eq!(g.resolution(), (800, 600));
        assert_eq!(g.max_iterations(), 100);
        assert_eq!(g.formula().name(), "Mandelbrot");
        assert_eq!(g.range(), &CoordinateRange::new(-2.0, 1.0, -1.0, 1.0).unwrap());

        let julia = GeneratorConfig::default_julia();
        assert_eq!(julia.variant.constant(), Some(DEFAULT_JULIA_CONSTANT));
    }

    #[test]
    fn test_build_validates() {
        let config = GeneratorConfig {
            rows: 0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            config.build(),
            Err(Error::InvalidResolution { cols: 800, rows: 0 })
        ));
    }

    #[test]
    fn test_threaded_build() {
        let config = GeneratorConfig {
            cols: 20,
            rows: 12,
            max_iterations: 30,
            threads: 3,
            ..GeneratorConfig::default()
        };
        let mut g = config.build().unwrap();
        g.run_to_completion().unwrap();
        assert!(g.is_terminal());
    }
}
