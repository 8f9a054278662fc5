use crate::state::OptionType;

/// Intrinsic value of an option at the given underlying price.
///
/// call: max(S - K, 0)
/// put:  max(K - S, 0)
/// other option types: 0
///
/// No time value, volatility or rates. Pure and total over all f64 inputs.
#[inline]
pub fn compute_fair_price(underlying_price: f64, strike_price: f64, option_type: &OptionType) -> f64 {
    match option_type {
        OptionType::Call => (underlying_price - strike_price).max(0.0),
        OptionType::Put => (strike_price - underlying_price).max(0.0),
        OptionType::Other(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_intrinsic() {
        let call = OptionType::Call;
        assert_eq!(compute_fair_price(19100.0, 19000.0, &call), 100.0);
        assert_eq!(compute_fair_price(18800.0, 18970.0, &call), 0.0);
        assert_eq!(compute_fair_price(18970.0, 18970.0, &call), 0.0);
    }

    #[test]
    fn test_put_intrinsic() {
        let put = OptionType::Put;
        assert_eq!(compute_fair_price(18800.0, 18970.0, &put), 170.0);
        assert_eq!(compute_fair_price(19100.0, 19000.0, &put), 0.0);
    }

    #[test]
    fn test_matches_max_formula_over_a_grid() {
        let strike = 100.0;
        for i in -50..=250 {
            let p = i as f64;
            assert_eq!(compute_fair_price(p, strike, &OptionType::Call), (p - strike).max(0.0));
            assert_eq!(compute_fair_price(p, strike, &OptionType::Put), (strike - p).max(0.0));
        }
    }

    #[test]
    fn test_unknown_type_is_zero() {
        let other = OptionType::from("binary");
        for p in [-10.0, 0.0, 18800.0, 1e9] {
            assert_eq!(compute_fair_price(p, 18970.0, &other), 0.0);
        }
    }
}
