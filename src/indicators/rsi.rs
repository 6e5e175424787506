use rust_decimal::Decimal;

/// Calculate Relative Strength Index (RSI)
///
/// Simple-average RSI over the last `period` price changes.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
pub fn calculate_rsi(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let (gain_sum, loss_sum) = prices
        .windows(2)
        .rev()
        .take(period)
        .map(|pair| pair[1] - pair[0])
        .fold((Decimal::ZERO, Decimal::ZERO), |(gains, losses), change| {
            if change > Decimal::ZERO {
                (gains + change, losses)
            } else {
                (gains, losses + change.abs())
            }
        });

    let period = Decimal::from(period);
    let avg_gain = gain_sum / period;
    let avg_loss = loss_sum / period;

    if avg_loss.is_zero() {
        return Some(Decimal::ONE_HUNDRED);
    }

    let rs = avg_gain / avg_loss;
    Some(Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs))
}
