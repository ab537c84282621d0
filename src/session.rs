//! Escape-time iteration state, advanced one pass over the grid at a time.
//!
//! A [`Session`] owns everything that changes while a set is generated: the
//! running `z` values, the mask of points not yet proven divergent and the
//! iteration at which each divergent point escaped. The grid itself lives in
//! a shared, immutable [`Template`]. Each call to [`Session::step`] does one
//! bounded pass and returns, so a caller can drive generation from a timer or
//! animation callback, stop calling to pause, and clone the session to keep a
//! snapshot.

use std::sync::Arc;

use ndarray::{concatenate, s, Array2, ArrayView2, Axis, Zip};
use tracing::{debug, trace};

use crate::complex::{C, ZERO};
use crate::error::{Error, Result};
use crate::template::Template;
use crate::threads::{Join, RangeSplitter, Split};
use crate::variant::Formula;

/// Magnitude beyond which an orbit provably escapes to infinity.
pub const DIVERGENCE_RADIUS: f64 = 2.0;
const DIVERGENCE_RADIUS_SQR: f64 = DIVERGENCE_RADIUS * DIVERGENCE_RADIUS;

/// Divergence value of a point that has not escaped (yet). Escapes are
/// recorded as the 1-based number of the iteration that proved them, so this
/// never collides with a real value.
pub const NOT_DIVERGED: u32 = 0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Fresh,
    Running,
    /// Iteration budget used up.
    Exhausted,
    /// Every point escaped before the budget ran out.
    AllDiverged,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::AllDiverged)
    }
}

/// Observable result of one [`Session::step`].
#[derive(Debug)]
pub struct Step<'a> {
    /// Iteration just completed, equal to the session's new current iteration.
    pub iteration: u32,
    pub newly_diverged: usize,
    /// Points still active after this step.
    pub active: usize,
    pub divergence: ArrayView2<'a, u32>,
}

#[derive(Clone, Debug)]
pub struct Session<F> {
    template: Arc<Template>,
    formula: F,
    z: Array2<C<f64>>,
    active: Array2<bool>,
    divergence: Array2<u32>,
    iteration: u32,
    max_iterations: u32,
    active_count: usize,
}

impl<F> Session<F>
where
    F: Formula,
{
    /// Fresh session over `template`. The formula is moved in, so later changes
    /// to the caller's copy never reach this session.
    pub fn new(
        template: impl Into<Arc<Template>>,
        formula: F,
        max_iterations: u32,
    ) -> Result<Self> {
        if max_iterations == 0 {
            return Err(Error::InvalidIterations);
        }
        let template = template.into();
        let dim = template.points().dim();
        let mut z = Array2::from_elem(dim, ZERO);
        seed(&mut z, &template, &formula);
        let session = Self {
            z,
            active: Array2::from_elem(dim, true),
            divergence: Array2::from_elem(dim, NOT_DIVERGED),
            iteration: 0,
            max_iterations,
            active_count: template.len(),
            template,
            formula,
        };
        debug!(
            formula = session.formula.name(),
            rows = dim.0,
            cols = dim.1,
            max_iterations,
            "created session"
        );
        Ok(session)
    }

    /// Advance every active point by one iteration.
    ///
    /// Fails with [`Error::SessionComplete`] once the session is terminal.
    pub fn step(&mut self) -> Result<Step<'_>> {
        if self.is_terminal() {
            return Err(Error::SessionComplete {
                iteration: self.iteration,
            });
        }
        let newly_diverged = self.advance();
        Ok(Step {
            iteration: self.iteration,
            newly_diverged,
            active: self.active_count,
            divergence: self.divergence.view(),
        })
    }

    /// Step until terminal. Returns the number of steps taken, 0 when the
    /// session was already terminal.
    pub fn run_to_completion(&mut self) -> u32 {
        let start = self.iteration;
        while !self.is_terminal() {
            self.advance();
        }
        self.iteration - start
    }

    /// Iterator over the remaining steps, yielding `(iteration, newly_diverged)`.
    pub fn steps(&mut self) -> Steps<'_, F> {
        Steps { session: self }
    }

    fn advance(&mut self) -> usize {
        let next = self.iteration + 1;
        let formula = &self.formula;
        let mut newly_diverged = 0;

        Zip::from(&mut self.z)
            .and(&mut self.active)
            .and(&mut self.divergence)
            .and(self.template.points())
            .for_each(|z, active, divergence, &point| {
                if *active {
                    *z = formula.update(*z, point);
                    if z.norm_sqr() > DIVERGENCE_RADIUS_SQR {
                        *divergence = next;
                        *active = false;
                        newly_diverged += 1;
                    }
                }
            });

        self.iteration = next;
        self.active_count -= newly_diverged;
        trace!(iteration = next, newly_diverged, active = self.active_count, "step");
        if self.is_terminal() {
            debug!(
                status = ?self.status(),
                iteration = self.iteration,
                active = self.active_count,
                "session complete"
            );
        }
        newly_diverged
    }

    /// Back to [`Status::Fresh`], keeping the template, formula and budget.
    pub fn reset(&mut self) {
        seed(&mut self.z, &self.template, &self.formula);
        self.active.fill(true);
        self.divergence.fill(NOT_DIVERGED);
        self.iteration = 0;
        self.active_count = self.active.len();
    }
}

fn seed<F: Formula>(z: &mut Array2<C<f64>>, template: &Template, formula: &F) {
    Zip::from(z)
        .and(template.points())
        .for_each(|z, &point| *z = formula.initial_z(point));
}

impl<F> Session<F> {
    pub fn status(&self) -> Status {
        if self.active_count == 0 {
            Status::AllDiverged
        } else if self.iteration >= self.max_iterations {
            Status::Exhausted
        } else if self.iteration == 0 {
            Status::Fresh
        } else {
            Status::Running
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// `current_iteration / max_iterations`, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        f64::from(self.iteration) / f64::from(self.max_iterations)
    }

    pub fn current_iteration(&self) -> u32 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn formula(&self) -> &F {
        &self.formula
    }

    /// Row-major divergence map, [`NOT_DIVERGED`] for points still active.
    pub fn divergence(&self) -> ArrayView2<'_, u32> {
        self.divergence.view()
    }

    /// Iteration at which the point escaped; `None` if it has not escaped or
    /// lies outside the grid.
    pub fn escape_iteration(&self, row: usize, col: usize) -> Option<u32> {
        self.divergence
            .get([row, col])
            .copied()
            .filter(|&i| i != NOT_DIVERGED)
    }

    pub fn z(&self) -> ArrayView2<'_, C<f64>> {
        self.z.view()
    }

    pub fn active_mask(&self) -> ArrayView2<'_, bool> {
        self.active.view()
    }
}

pub struct Steps<'a, F> {
    session: &'a mut Session<F>,
}

impl<F> Iterator for Steps<'_, F>
where
    F: Formula,
{
    type Item = (u32, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.session.is_terminal() {
            return None;
        }
        let newly_diverged = self.session.advance();
        Some((self.session.iteration, newly_diverged))
    }
}

/// Splits into bands of whole rows, dropping empty bands.
impl<F> Split for Session<F>
where
    F: Clone,
{
    fn split_to_vec(self, n: usize) -> Vec<Self> {
        let range = *self.template.range();
        RangeSplitter::split(0, self.template.rows(), n)
            .into_iter()
            .filter(|(start, end)| start < end)
            .map(|(start, end)| {
                let active = self.active.slice(s![start..end, ..]).to_owned();
                let active_count = active.iter().filter(|&&a| a).count();
                Self {
                    template: Arc::new(Template::from_band(
                        range,
                        self.template.points().slice(s![start..end, ..]).to_owned(),
                    )),
                    formula: self.formula.clone(),
                    z: self.z.slice(s![start..end, ..]).to_owned(),
                    active,
                    divergence: self.divergence.slice(s![start..end, ..]).to_owned(),
                    iteration: self.iteration,
                    max_iterations: self.max_iterations,
                    active_count,
                }
            })
            .collect()
    }
}

/// Stacks bands back together. Bands may have stopped at different
/// iterations; the joined session sits at the latest one, which is where a
/// single sequential session would have stopped too.
impl<F> Join for Session<F>
where
    F: PartialEq,
{
    fn join_vec(parts: Vec<Self>) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| Error::JoinMismatch("no parts".to_string()))?;
        let cols = first.template.cols();
        let max_iterations = first.max_iterations;
        let range = *first.template.range();
        for part in &parts[1..] {
            if part.template.cols() != cols {
                return Err(Error::JoinMismatch("different width".to_string()));
            }
            if part.max_iterations != max_iterations {
                return Err(Error::JoinMismatch("different iteration budget".to_string()));
            }
            if part.formula != first.formula {
                return Err(Error::JoinMismatch("different formula".to_string()));
            }
        }

        let shape_err = |e: ndarray::ShapeError| Error::JoinMismatch(e.to_string());
        let points: Vec<_> = parts.iter().map(|p| p.template.points()).collect();
        let zs: Vec<_> = parts.iter().map(|p| p.z.view()).collect();
        let actives: Vec<_> = parts.iter().map(|p| p.active.view()).collect();
        let divergences: Vec<_> = parts.iter().map(|p| p.divergence.view()).collect();

        let points = concatenate(Axis(0), &points).map_err(shape_err)?;
        let z = concatenate(Axis(0), &zs).map_err(shape_err)?;
        let active = concatenate(Axis(0), &actives).map_err(shape_err)?;
        let divergence = concatenate(Axis(0), &divergences).map_err(shape_err)?;
        let iteration = parts.iter().map(|p| p.iteration).max().unwrap_or(0);
        let active_count = parts.iter().map(|p| p.active_count).sum();

        let formula = parts
            .into_iter()
            .next()
            .map(|p| p.formula)
            .ok_or_else(|| Error::JoinMismatch("no parts".to_string()))?;

        Ok(Self {
            template: Arc::new(Template::from_band(range, points)),
            formula,
            z,
            active,
            divergence,
            iteration,
            max_iterations,
            active_count,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::complex::c;
    use crate::coord::CoordinateRange;
    use crate::variant::{Julia, Mandelbrot};

    fn square(cols: usize, rows: usize) -> Arc<Template> {
        let range = CoordinateRange::new(-2.0, 2.0, -2.0, 2.0).unwrap();
        Arc::new(Template::build(range, cols, rows).unwrap())
    }

    #[test]
    fn test_fresh_state() {
        let session = Session::new(square(5, 5), Mandelbrot, 10).unwrap();
        assert_eq!(session.status(), Status::Fresh);
        assert_eq!(session.current_iteration(), 0);
        assert_eq!(session.active_count(), 25);
        assert!(session.z().iter().all(|&z| z == ZERO));
        assert!(session.active_mask().iter().all(|&a| a));
        assert!(session.divergence().iter().all(|&d| d == NOT_DIVERGED));
    }

    #[test]
    fn test_zero_budget() {
        assert_eq!(
            Session::new(square(2, 2), Mandelbrot, 0).err(),
            Some(Error::InvalidIterations)
        );
    }

    #[test]
    fn test_corner_diverges_first_step() {
        let mut session = Session::new(square(5, 5), Mandelbrot, 10).unwrap();
        let step = session.step().unwrap();
        assert_eq!(step.iteration, 1);
        assert_eq!(step.divergence[[4, 4]], 1);
        assert_eq!(step.divergence[[0, 0]], 1);
        assert_eq!(step.divergence[[2, 2]], NOT_DIVERGED);
        assert_eq!(session.escape_iteration(4, 4), Some(1));
        assert_eq!(session.status(), Status::Running);
    }

    #[test]
    fn test_origin_never_diverges() {
        let mut session = Session::new(square(5, 5), Mandelbrot, 200).unwrap();
        session.run_to_completion();
        assert_eq!(session.status(), Status::Exhausted);
        assert_eq!(session.divergence()[[2, 2]], NOT_DIVERGED);
        assert_eq!(session.escape_iteration(2, 2), None);
        // -2 lands on the radius exactly and stays there
        assert_eq!(session.escape_iteration(2, 0), None);
    }

    #[test]
    fn test_step_on_terminal() {
        let mut session = Session::new(square(3, 3), Mandelbrot, 2).unwrap();
        session.step().unwrap();
        session.step().unwrap();
        assert!(session.is_terminal());
        assert_eq!(
            session.step().err(),
            Some(Error::SessionComplete { iteration: 2 })
        );
        assert_eq!(session.run_to_completion(), 0);
    }

    #[test]
    fn test_all_diverged_stops_early() {
        let range = CoordinateRange::new(3.0, 4.0, 3.0, 4.0).unwrap();
        let template = Template::build(range, 4, 4).unwrap();
        let mut session = Session::new(template, Mandelbrot, 1000).unwrap();
        assert_eq!(session.run_to_completion(), 1);
        assert_eq!(session.status(), Status::AllDiverged);
        assert!(session.progress() < 1.0);
    }

    #[test]
    fn test_progress() {
        let mut session = Session::new(square(3, 3), Mandelbrot, 4).unwrap();
        assert_eq!(session.progress(), 0.0);
        session.step().unwrap();
        assert_eq!(session.progress(), 0.25);
        assert_eq!(session.progress(), 0.25);
        session.run_to_completion();
        assert_eq!(session.progress(), 1.0);
    }

    #[test]
    fn test_diverged_points_are_frozen() {
        let mut session = Session::new(square(9, 9), Mandelbrot, 30).unwrap();
        session.step().unwrap();
        let z_after = session.z()[[8, 8]];
        assert!(!session.active_mask()[[8, 8]]);
        session.run_to_completion();
        assert_eq!(session.z()[[8, 8]], z_after);
        assert_eq!(session.divergence()[[8, 8]], 1);
    }

    #[test]
    fn test_steps_iterator() {
        let mut session = Session::new(square(5, 5), Mandelbrot, 6).unwrap();
        let iterations: Vec<u32> = session.steps().map(|(i, _)| i).collect();
        assert_eq!(iterations, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(session.steps().count(), 0);
    }

    #[test]
    fn test_reset() {
        let mut session = Session::new(square(5, 5), Julia::new(c(-0.4, 0.6)), 20).unwrap();
        session.run_to_completion();
        let first = session.divergence().to_owned();
        session.reset();
        assert_eq!(session.status(), Status::Fresh);
        assert_eq!(session.active_count(), 25);
        session.run_to_completion();
        assert_eq!(session.divergence(), first.view());
    }

    #[test]
    fn test_julia_orbits_start_at_their_point() {
        let template = square(5, 5);
        let session = Session::new(template.clone(), Julia::new(c(-0.12, 0.75)), 10).unwrap();
        assert_eq!(session.z(), template.points());
    }

    #[test]
    fn test_julia_outer_points_escape_first_step() {
        // |point| > 2 escapes at once for any bounded constant
        for k in [c(-0.12, 0.75), c(-0.8, 0.156), c(0.0, 0.0), c(0.285, 0.01)] {
            let mut session = Session::new(square(5, 5), Julia::new(k), 10).unwrap();
            session.step().unwrap();
            for (row, col) in [(0, 0), (0, 4), (4, 0), (4, 4), (2, 4)] {
                assert_eq!(session.escape_iteration(row, col), Some(1), "k = {}", k);
            }
        }

        let range = CoordinateRange::new(3.0, 4.0, 3.0, 4.0).unwrap();
        let template = Template::build(range, 2, 2).unwrap();
        let mut session = Session::new(template, Julia::new(c(-0.12, 0.75)), 100).unwrap();
        assert_eq!(session.run_to_completion(), 1);
        assert_eq!(session.status(), Status::AllDiverged);
        assert!(session.divergence().iter().all(|&d| d == 1));
    }

    #[test]
    fn test_julia_map_varies_across_grid() {
        let range = CoordinateRange::new(-1.5, 1.5, -1.5, 1.5).unwrap();
        let template = Template::build(range, 41, 41).unwrap();
        let mut session = Session::new(template, Julia::new(c(-0.12, 0.75)), 100).unwrap();
        session.run_to_completion();

        let d = session.divergence();
        // the critical point stays bounded, the corners escape at once
        assert_eq!(d[[20, 20]], NOT_DIVERGED);
        assert_eq!(d[[0, 0]], 1);
        let mut distinct: Vec<u32> = d.iter().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert!(distinct.len() > 2, "distinct values: {:?}", distinct);
    }

    #[test]
    fn test_reset_reseeds_julia() {
        let template = square(5, 5);
        let mut session = Session::new(template.clone(), Julia::new(c(-0.4, 0.6)), 20).unwrap();
        session.step().unwrap();
        session.step().unwrap();
        assert_ne!(session.z(), template.points());
        session.reset();
        assert_eq!(session.z(), template.points());

        let mut mandelbrot = Session::new(template, Mandelbrot, 20).unwrap();
        mandelbrot.run_to_completion();
        mandelbrot.reset();
        assert!(mandelbrot.z().iter().all(|&z| z == ZERO));
    }

    #[test]
    fn test_clone_resumes_identically() {
        let mut a = Session::new(square(16, 12), Mandelbrot, 50).unwrap();
        for _ in 0..7 {
            a.step().unwrap();
        }
        let mut b = a.clone();
        a.run_to_completion();
        b.run_to_completion();
        assert_eq!(a.divergence(), b.divergence());
        assert_eq!(a.current_iteration(), b.current_iteration());
    }

    #[test]
    fn test_split_join_matches_sequential() {
        let template = square(13, 11);
        let mut sequential = Session::new(template.clone(), Mandelbrot, 40).unwrap();
        let mut partial = Session::new(template, Mandelbrot, 40).unwrap();
        partial.step().unwrap();

        let parts: Vec<_> = partial
            .split_to_vec(4)
            .into_iter()
            .map(|mut part| {
                part.run_to_completion();
                part
            })
            .collect();
        assert_eq!(parts.len(), 4);
        let joined = Session::join_vec(parts).unwrap();

        sequential.run_to_completion();
        assert_eq!(joined.divergence(), sequential.divergence());
        assert_eq!(joined.z(), sequential.z());
        assert_eq!(joined.active_count(), sequential.active_count());
        assert_eq!(joined.current_iteration(), sequential.current_iteration());
        assert_eq!(joined.template().points(), sequential.template().points());
    }

    #[test]
    fn test_split_more_parts_than_rows() {
        let session = Session::new(square(4, 2), Mandelbrot, 5).unwrap();
        let parts = session.split_to_vec(8);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.template().rows() == 1));
    }

    #[test]
    fn test_join_rejects_mismatch() {
        let a = Session::new(square(4, 2), Mandelbrot, 5).unwrap();
        let b = Session::new(square(3, 2), Mandelbrot, 5).unwrap();
        assert!(matches!(
            Session::join_vec(vec![a, b]),
            Err(Error::JoinMismatch(_))
        ));
        assert!(Session::<Mandelbrot>::join_vec(vec![]).is_err());
    }
}
