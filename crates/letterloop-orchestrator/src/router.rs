//! Decision routing after each review.

use crate::loop_state::{Decision, WritingOutcome};

/// What the loop does after a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The writing phase is over.
    Finish(WritingOutcome),
    /// Revise the draft in another iteration.
    Revise,
}

/// Picks the next step from the review decision and the iteration count.
///
/// Approval is checked before the bound, so a draft approved on the last
/// allowed iteration finishes as approved.
///
/// ```
/// use letterloop_orchestrator::{route, Decision, Route, WritingOutcome};
///
/// assert_eq!(route(Decision::Approved, 3, 3), Route::Finish(WritingOutcome::Approved));
/// assert_eq!(route(Decision::NeedsImprovement, 1, 3), Route::Revise);
/// ```
#[must_use]
pub const fn route(decision: Decision, iteration: u32, max_iterations: u32) -> Route {
    match decision {
        Decision::Approved => Route::Finish(WritingOutcome::Approved),
        Decision::NeedsImprovement if iteration >= max_iterations => {
            Route::Finish(WritingOutcome::MaxIterationsReached)
        }
        Decision::NeedsImprovement => Route::Revise,
    }
}
