use tracing::debug;

use crate::error::Result;
use crate::session::Session;
use crate::threads::WorkerPool;
use crate::variant::Formula;

/// Runs a state to completion.
pub trait Solver<T> {
    fn solve(&self, state: T) -> Result<T>;
}

/// Steps the session on the calling thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sequential;

impl Sequential {
    /// Pool of `n` workers, each completing one row band of the session.
    pub fn threaded<F>(self, n: usize) -> WorkerPool<Session<F>, Session<F>>
    where
        F: Formula + Clone + PartialEq + Send + 'static,
    {
        debug!(threads = n, "starting solver pool");
        WorkerPool::with(n, || {
            |mut session: Session<F>| {
                session.run_to_completion();
                session
            }
        })
    }
}

impl<F> Solver<Session<F>> for Sequential
where
    F: Formula,
{
    fn solve(&self, mut session: Session<F>) -> Result<Session<F>> {
        session.run_to_completion();
        Ok(session)
    }
}

impl<F> Solver<Session<F>> for WorkerPool<Session<F>, Session<F>>
where
    F: Formula + Clone + PartialEq + Send + 'static,
{
    fn solve(&self, session: Session<F>) -> Result<Session<F>> {
        self.call(session)
    }
}

/// Pool with one worker per physical core.
pub fn default_solver<F>() -> WorkerPool<Session<F>, Session<F>>
where
    F: Formula + Clone + PartialEq + Send + 'static,
{
    Sequential.threaded(num_cpus::get_physical())
}
