use crate::error::{Error, Result};

/// A validated `[min, max]` interval along one axis of the complex plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Axis {
    min: f64,
    max: f64,
}

impl Axis {
    /// Both bounds and the length between them must be finite, and
    /// `min < max`. `name` only labels the error.
    pub fn new(name: char, min: f64, max: f64) -> Result<Self> {
        if !(max - min).is_finite() || min >= max {
            return Err(Error::InvalidBounds {
                axis: name,
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.max + self.min) / 2.0
    }

    /// `n` evenly spaced samples, first at `min`, last exactly at `max`.
    pub fn linspace(&self, n: usize) -> Vec<f64> {
        match n {
            0 => return vec![],
            1 => return vec![self.min],
            _ => (),
        }
        let last = n - 1;
        let step = self.length() / last as f64;
        (0..n)
            .map(|i| {
                if i == last {
                    self.max
                } else {
                    self.min + step * i as f64
                }
            })
            .collect()
    }
}

/// Rectangular bounds on the complex plane, x along the real axis and y along
/// the imaginary axis. Both axes are always strictly increasing; every
/// "mutation" hands back a new, revalidated range.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CoordinateRange {
    x: Axis,
    y: Axis,
}

impl CoordinateRange {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self> {
        Ok(Self {
            x: Axis::new('x', x_min, x_max)?,
            y: Axis::new('y', y_min, y_max)?,
        })
    }

    /// Range of size `width` x `height` centered on `(center_x, center_y)`.
    pub fn from_box(center_x: f64, center_y: f64, width: f64, height: f64) -> Result<Self> {
        Self::new(
            center_x - width / 2.0,
            center_x + width / 2.0,
            center_y - height / 2.0,
            center_y + height / 2.0,
        )
    }

    pub fn with_x(&self, x_min: f64, x_max: f64) -> Result<Self> {
        Ok(Self {
            x: Axis::new('x', x_min, x_max)?,
            y: self.y,
        })
    }

    pub fn with_y(&self, y_min: f64, y_max: f64) -> Result<Self> {
        Ok(Self {
            x: self.x,
            y: Axis::new('y', y_min, y_max)?,
        })
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    pub fn x_min(&self) -> f64 {
        self.x.min
    }

    pub fn x_max(&self) -> f64 {
        self.x.max
    }

    pub fn y_min(&self) -> f64 {
        self.y.min
    }

    pub fn y_max(&self) -> f64 {
        self.y.max
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x.center(), self.y.center())
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.x.length() / self.y.length()
    }

    pub fn pan(&self, dx: f64, dy: f64) -> Result<Self> {
        Self::new(
            self.x.min + dx,
            self.x.max + dx,
            self.y.min + dy,
            self.y.max + dy,
        )
    }

    /// Pan by fractions of the current width and height.
    pub fn pan_relative(&self, xfrac: f64, yfrac: f64) -> Result<Self> {
        self.pan(xfrac * self.x.length(), yfrac * self.y.length())
    }

    /// Scale both axes about the center. `factor < 1` zooms in.
    pub fn zoom(&self, factor: f64) -> Result<Self> {
        let (xc, yc) = self.center();
        Self::new(
            xc + (self.x.min - xc) * factor,
            xc + (self.x.max - xc) * factor,
            yc + (self.y.min - yc) * factor,
            yc + (self.y.max - yc) * factor,
        )
    }
}

impl Default for CoordinateRange {
    fn default() -> Self {
        Self {
            x: Axis { min: -2.0, max: 1.0 },
            y: Axis { min: -1.0, max: 1.0 },
        }
    }
}
