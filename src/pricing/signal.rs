use crate::state::Signal;

/// Classify an underlying price against a band of +/- `threshold` around fair price.
///
/// S < F * (1 - t)  -> buy option
/// S > F * (1 + t)  -> sell option
/// otherwise        -> no arbitrage opportunity
///
/// With F == 0 the band collapses to the single point 0, so any positive
/// price classifies as a sell.
#[inline]
pub fn classify(underlying_price: f64, fair_price: f64, threshold: f64) -> Signal {
    if underlying_price < fair_price * (1.0 - threshold) {
        Signal::BuyOption
    } else if underlying_price > fair_price * (1.0 + threshold) {
        Signal::SellOption
    } else {
        Signal::NoArbitrage
    }
}
