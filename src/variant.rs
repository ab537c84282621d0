//! Iteration formulas. A session is generic over [`Formula`]; adding a new
//! family of sets means implementing its `update`.

use crate::complex::{c, C, ZERO};
use crate::error::{Error, Result};

pub trait Formula {
    /// Starting value of `z` for the grid sample `point`.
    #[inline]
    fn initial_z(&self, _point: C<f64>) -> C<f64> {
        ZERO
    }

    /// Next value of `z` for the grid sample `point`.
    fn update(&self, z: C<f64>, point: C<f64>) -> C<f64>;

    fn name(&self) -> &'static str;
}

/// `z*z + point`: every sample is its own additive constant.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Mandelbrot;

impl Formula for Mandelbrot {
    #[inline]
    fn update(&self, z: C<f64>, point: C<f64>) -> C<f64> {
        (z * z) + point
    }

    fn name(&self) -> &'static str {
        "Mandelbrot"
    }
}

pub const DEFAULT_JULIA_CONSTANT: C<f64> = c(-0.79, 0.15);

/// `z*z + k` with one constant `k` shared by the whole grid. Each orbit
/// starts at its own grid sample.
///
/// Sessions take their own copy of the formula, so [`Julia::set_constant`]
/// only affects sessions created afterwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Julia {
    k: C<f64>,
}

impl Julia {
    pub fn new(k: C<f64>) -> Self {
        Self { k }
    }

    pub fn constant(&self) -> C<f64> {
        self.k
    }

    pub fn set_constant(&mut self, k: C<f64>) {
        self.k = k;
    }
}

impl Default for Julia {
    fn default() -> Self {
        Self::new(DEFAULT_JULIA_CONSTANT)
    }
}

impl Formula for Julia {
    #[inline]
    fn initial_z(&self, point: C<f64>) -> C<f64> {
        point
    }

    #[inline]
    fn update(&self, z: C<f64>, _point: C<f64>) -> C<f64> {
        (z * z) + self.k
    }

    fn name(&self) -> &'static str {
        "Julia"
    }
}

/// `z^power + point`. Radius 2 still bounds the escape for every `power >= 2`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Multibrot {
    power: u32,
}

impl Multibrot {
    pub fn new(power: u32) -> Result<Self> {
        if power < 2 {
            return Err(Error::InvalidPower(power));
        }
        Ok(Self { power })
    }

    pub fn power(&self) -> u32 {
        self.power
    }
}

impl Formula for Multibrot {
    #[inline]
    fn update(&self, z: C<f64>, point: C<f64>) -> C<f64> {
        z.powu(self.power) + point
    }

    fn name(&self) -> &'static str {
        "Multibrot"
    }
}

/// Closed set of the formulas shipped with the crate, for callers that pick
/// the family at runtime.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SetVariant {
    Mandelbrot(Mandelbrot),
    Julia(Julia),
    Multibrot(Multibrot),
}

impl SetVariant {
    pub fn mandelbrot() -> Self {
        Self::Mandelbrot(Mandelbrot)
    }

    pub fn julia(k: C<f64>) -> Self {
        Self::Julia(Julia::new(k))
    }

    pub fn constant(&self) -> Option<C<f64>> {
        match self {
            Self::Julia(julia) => Some(julia.constant()),
            _ => None,
        }
    }

    /// Returns `false`, leaving the variant unchanged, when it has no constant.
    pub fn set_constant(&mut self, k: C<f64>) -> bool {
        match self {
            Self::Julia(julia) => {
                julia.set_constant(k);
                true
            }
            _ => false,
        }
    }
}

impl Default for SetVariant {
    fn default() -> Self {
        Self::mandelbrot()
    }
}

impl Formula for SetVariant {
    #[inline]
    fn initial_z(&self, point: C<f64>) -> C<f64> {
        match self {
            Self::Mandelbrot(f) => f.initial_z(point),
            Self::Julia(f) => f.initial_z(point),
            Self::Multibrot(f) => f.initial_z(point),
        }
    }

    #[inline]
    fn update(&self, z: C<f64>, point: C<f64>) -> C<f64> {
        match self {
            Self::Mandelbrot(f) => f.update(z, point),
            Self::Julia(f) => f.update(z, point),
            Self::Multibrot(f) => f.update(z, point),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Mandelbrot(f) => f.name(),
            Self::Julia(f) => f.name(),
            Self::Multibrot(f) => f.name(),
        }
    }
}

impl From<Mandelbrot> for SetVariant {
    fn from(f: Mandelbrot) -> Self {
        Self::Mandelbrot(f)
    }
}

impl From<Julia> for SetVariant {
    fn from(f: Julia) -> Self {
        Self::Julia(f)
    }
}

impl From<Multibrot> for SetVariant {
    fn from(f: Multibrot) -> Self {
        Self::Multibrot(f)
    }
}
