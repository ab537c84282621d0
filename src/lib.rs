use ndarray::{Array2, ArrayView2};
use tracing::info;

use crate::complex::C;
use crate::solver::{Sequential, Solver};

mod complex;
pub mod config;
pub mod coord;
pub mod error;
pub mod session;
pub mod solver;
pub mod template;
pub mod threads;
pub mod variant;

pub use crate::complex::{c, ci, cr};
pub use crate::config::GeneratorConfig;
pub use crate::coord::{Axis, CoordinateRange};
pub use crate::error::{Error, Result};
pub use crate::session::{Session, Status, Step, DIVERGENCE_RADIUS, NOT_DIVERGED};
pub use crate::template::Template;
pub use crate::variant::{Formula, Julia, Mandelbrot, Multibrot, SetVariant};

pub type Complex = C<f64>;

/// Owns one generation at a time for a given range, resolution, budget and
/// formula. Changing any of them replaces the session with a fresh one; the
/// last completed divergence map stays available through
/// [`Generator::displayed`] until the new session completes.
pub struct Generator<F> {
    range: CoordinateRange,
    cols: usize,
    rows: usize,
    max_iterations: u32,
    formula: F,
    session: Session<F>,
    completed: Option<Array2<u32>>,
    solver: Box<dyn Solver<Session<F>>>,
}

impl<F> Generator<F>
where
    F: Formula + Clone + 'static,
{
    pub fn new(
        range: CoordinateRange,
        cols: usize,
        rows: usize,
        max_iterations: u32,
        formula: F,
    ) -> Result<Self> {
        let session = Self::fresh_session(range, cols, rows, max_iterations, formula.clone())?;
        Ok(Self {
            range,
            cols,
            rows,
            max_iterations,
            formula,
            session,
            completed: None,
            solver: Box::new(Sequential),
        })
    }

    /// Solver used by [`Generator::run_to_completion`].
    pub fn with_solver<S>(mut self, solver: S) -> Self
    where
        S: Solver<Session<F>> + 'static,
    {
        self.solver = Box::new(solver);
        self
    }

    fn fresh_session(
        range: CoordinateRange,
        cols: usize,
        rows: usize,
        max_iterations: u32,
        formula: F,
    ) -> Result<Session<F>> {
        let template = Template::build(range, cols, rows)?;
        Session::new(template, formula, max_iterations)
    }

    /// Validate and build the new session before touching any field, so a
    /// rejected change leaves the generator as it was.
    fn replace(
        &mut self,
        range: CoordinateRange,
        cols: usize,
        rows: usize,
        max_iterations: u32,
        formula: F,
    ) -> Result<()> {
        let session = Self::fresh_session(range, cols, rows, max_iterations, formula.clone())?;
        info!(
            formula = formula.name(),
            ?range,
            cols,
            rows,
            max_iterations,
            "restarting generation"
        );
        self.range = range;
        self.cols = cols;
        self.rows = rows;
        self.max_iterations = max_iterations;
        self.formula = formula;
        self.session = session;
        Ok(())
    }

    /// Start over with the current settings.
    pub fn restart(&mut self) {
        self.session.reset();
    }

    pub fn set_range(&mut self, range: CoordinateRange) -> Result<()> {
        self.replace(range, self.cols, self.rows, self.max_iterations, self.formula.clone())
    }

    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<()> {
        self.replace(self.range, cols, rows, self.max_iterations, self.formula.clone())
    }

    pub fn set_iterations(&mut self, max_iterations: u32) -> Result<()> {
        self.replace(self.range, self.cols, self.rows, max_iterations, self.formula.clone())
    }

    pub fn set_formula(&mut self, formula: F) -> Result<()> {
        self.replace(self.range, self.cols, self.rows, self.max_iterations, formula)
    }

    pub fn zoom(&mut self, factor: f64) -> Result<()> {
        self.set_range(self.range.zoom(factor)?)
    }

    pub fn pan_relative(&mut self, xfrac: f64, yfrac: f64) -> Result<()> {
        self.set_range(self.range.pan_relative(xfrac, yfrac)?)
    }

    pub fn step(&mut self) -> Result<Step<'_>> {
        let (iteration, newly_diverged, active) = {
            let step = self.session.step()?;
            (step.iteration, step.newly_diverged, step.active)
        };
        self.record_if_complete();
        Ok(Step {
            iteration,
            newly_diverged,
            active,
            divergence: self.session.divergence(),
        })
    }

    /// Finish the current session with the configured solver. On error the
    /// session is left where it was.
    pub fn run_to_completion(&mut self) -> Result<()> {
        if !self.session.is_terminal() {
            self.session = self.solver.solve(self.session.clone())?;
        }
        self.record_if_complete();
        Ok(())
    }

    fn record_if_complete(&mut self) {
        if self.session.is_terminal() {
            self.completed = Some(self.session.divergence().to_owned());
        }
    }
}

impl<F> Generator<F> {
    pub fn is_terminal(&self) -> bool {
        self.session.is_terminal()
    }

    pub fn progress(&self) -> f64 {
        self.session.progress()
    }

    pub fn session(&self) -> &Session<F> {
        &self.session
    }

    /// Divergence map of the current session, complete or not.
    pub fn divergence(&self) -> ArrayView2<'_, u32> {
        self.session.divergence()
    }

    /// The map to show: the current session's once it is complete, otherwise
    /// the last completed one, falling back to the partial current map when
    /// nothing has completed yet.
    pub fn displayed(&self) -> ArrayView2<'_, u32> {
        match &self.completed {
            Some(completed) if !self.session.is_terminal() => completed.view(),
            _ => self.session.divergence(),
        }
    }

    pub fn range(&self) -> &CoordinateRange {
        &self.range
    }

    /// `(cols, rows)`.
    pub fn resolution(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn formula(&self) -> &F {
        &self.formula
    }
}

impl Generator<Julia> {
    /// Restart with a new Julia constant; the running session is discarded.
    pub fn set_constant(&mut self, k: Complex) -> Result<()> {
        let mut formula = self.formula;
        formula.set_constant(k);
        self.set_formula(formula)
    }
}

impl Generator<SetVariant> {
    /// Restart with a new constant. Returns `Ok(false)` without restarting
    /// when the current variant has no constant.
    pub fn set_constant(&mut self, k: Complex) -> Result<bool> {
        let mut formula = self.formula;
        if !formula.set_constant(k) {
            return Ok(false);
        }
        self.set_formula(formula)?;
        Ok(true)
    }
}
