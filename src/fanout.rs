//! Parallel fan-out with first-error-wins joining.
//!
//! Rayon's `collect::<Result<_, _>>()` stops handing out work once any unit
//! fails, and which failure it reports depends on scheduling. Decoding wants
//! the opposite: every unit runs to completion, and the error reported is the
//! first one in input order.

use rayon::prelude::*;

/// Run `unit` over every item on the rayon pool and join the results.
///
/// Each unit writes only its own slot of the result vector. Once all units
/// have finished, returns every value in input order, or the error of the
/// earliest failing item.
pub fn join_all<I, T, E, F>(items: &[I], unit: F) -> Result<Vec<T>, E>
where
    I: Sync,
    T: Send,
    E: Send,
    F: Fn(&I) -> Result<T, E> + Sync + Send,
{
    let slots: Vec<Result<T, E>> = items.par_iter().map(unit).collect();
    slots.into_iter().collect()
}
