//! Effect driver.
//!
//! Runs a reducer to quiescence: every effect it returns is executed, and
//! every action an effect produces is fed back in, until no work is left.
//! Actions are processed one at a time, so the reducer never sees two
//! actions concurrently.

use reunion_core::effect::Effect;
use reunion_core::reducer::Reducer;
use std::collections::VecDeque;

/// Feed `initial` into `reducer` and execute effects until none remain.
pub async fn run<R>(reducer: &R, state: &mut R::State, env: &R::Environment, initial: R::Action)
where
    R: Reducer,
    R::Action: Send + 'static,
{
    let mut pending = VecDeque::from([initial]);
    while let Some(action) = pending.pop_front() {
        for effect in reducer.reduce(state, action, env) {
            pending.extend(execute(effect).await);
        }
    }
}

/// Execute one effect, returning the action it produced, if any.
async fn execute<A>(effect: Effect<A>) -> Option<A> {
    match effect {
        Effect::None => {
            tracing::trace!("Executing Effect::None (no-op)");
            None
        },
        Effect::Future(fut) => {
            tracing::trace!("Executing Effect::Future");
            fut.await
        },
    }
}
