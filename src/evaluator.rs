use crate::pricing::{classify, compute_fair_price};
use crate::state::{Evaluation, Observation, Parameters};

/// Evaluate one observation. No state is carried between calls.
#[inline]
pub fn evaluate(observation: &Observation, params: &Parameters) -> Evaluation {
    let fair_price = compute_fair_price(
        observation.price,
        params.strike_price,
        &params.option_type,
    );
    Evaluation {
        timestamp: observation.timestamp,
        underlying_price: observation.price,
        fair_price,
        signal: classify(observation.price, fair_price, params.threshold),
    }
}

/// Lazy form: yields one evaluation per observation, in input order.
pub fn evaluate_iter<'a, I>(observations: I, params: &'a Parameters) -> impl Iterator<Item = Evaluation> + 'a
where
    I: IntoIterator<Item = &'a Observation>,
    I::IntoIter: 'a,
{
    observations.into_iter().map(move |obs| evaluate(obs, params))
}

/// Eager form. Same length and order as the input; empty in, empty out.
pub fn evaluate_series(observations: &[Observation], params: &Parameters) -> Vec<Evaluation> {
    evaluate_iter(observations, params).collect()
}
