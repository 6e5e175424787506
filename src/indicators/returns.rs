use rust_decimal::Decimal;

/// Fractional change between consecutive values
///
/// Returns `None` when a step is undefined (previous value of zero, or
/// arithmetic overflow). The result has one entry fewer than the input.
pub fn pct_change(values: &[Decimal]) -> Option<Vec<Decimal>> {
    values
        .windows(2)
        .map(|pair| {
            let (previous, current) = (pair[0], pair[1]);
            current.checked_sub(previous)?.checked_div(previous)
        })
        .collect()
}

/// Compounded return across the whole window
///
/// Product of `(1 + step_return)` over every step, minus one. Needs at least
/// two values; anything shorter has no defined return.
///
/// # Example
/// ```
/// use dipbot::indicators::cumulative_return;
/// use rust_decimal::Decimal;
///
/// let opens = [Decimal::from(100), Decimal::from(110), Decimal::from(121)];
/// assert_eq!(cumulative_return(&opens), Some(Decimal::new(21, 2)));
/// ```
pub fn cumulative_return(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }

    let growth = pct_change(values)?
        .into_iter()
        .try_fold(Decimal::ONE, |acc, step| acc.checked_mul(Decimal::ONE + step))?;

    Some(growth - Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pct_change_steps() {
        let steps = pct_change(&[dec!(100), dec!(110), dec!(99)]).unwrap();
        assert_eq!(steps, vec![dec!(0.1), dec!(-0.1)]);
    }

    #[test]
    fn test_pct_change_zero_previous() {
        assert!(pct_change(&[dec!(0), dec!(1)]).is_none());
    }

    #[test]
    fn test_cumulative_return_insufficient_data() {
        assert!(cumulative_return(&[]).is_none());
        assert!(cumulative_return(&[dec!(100)]).is_none());
    }

    #[test]
    fn test_cumulative_return_compounds() {
        let r = cumulative_return(&[dec!(100), dec!(99.95), dec!(99.99)]).unwrap();
        // Compounding telescopes to last / first - 1
        assert!((r - dec!(-0.0001)).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_cumulative_return_flat_prices() {
        let r = cumulative_return(&[dec!(50), dec!(50), dec!(50), dec!(50)]).unwrap();
        assert!(r.is_zero());
    }

    #[test]
    fn test_cumulative_return_undefined_on_zero_open() {
        assert!(cumulative_return(&[dec!(100), dec!(0), dec!(100)]).is_none());
    }
}
