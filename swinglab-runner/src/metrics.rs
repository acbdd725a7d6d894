//! Trade statistics — pure functions over PnL and excursion columns.
//!
//! Every metric is a pure function: slices in, scalar out. Ratios that would
//! divide by zero, or by an undefined input, return `None` rather than
//! `inf`/`NaN`, so callers can tell "no data" from a real zero.

/// `num / den`, or `None` when the denominator is zero or the result is not finite.
pub fn safe_divide(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let q = num / den;
    q.is_finite().then_some(q)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom
/// (0 = population, 1 = sample). `None` when `len <= ddof`.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - ddof) as f64).sqrt())
}

/// Percentage of trades with strictly positive PnL.
pub fn win_rate_pct(pnl: &[f64]) -> Option<f64> {
    let wins = pnl.iter().filter(|&&p| p > 0.0).count();
    safe_divide(wins as f64 * 100.0, pnl.len() as f64)
}

pub fn winners(pnl: &[f64]) -> Vec<f64> {
    pnl.iter().copied().filter(|&p| p > 0.0).collect()
}

pub fn losers(pnl: &[f64]) -> Vec<f64> {
    pnl.iter().copied().filter(|&p| p < 0.0).collect()
}

/// Running sum of PnL.
pub fn cumulative(pnl: &[f64]) -> Vec<f64> {
    pnl.iter()
        .scan(0.0, |acc, &p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

/// Largest drop from a running peak of the cumulative PnL curve.
///
/// The peak starts at the first point of the curve, not at zero.
pub fn max_drawdown(cumulative_pnl: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in cumulative_pnl {
        peak = peak.max(v);
        worst = worst.max(peak - v);
    }
    worst
}

/// `|avg win| / |avg loss|`.
pub fn risk_reward(avg_win: Option<f64>, avg_loss: Option<f64>) -> Option<f64> {
    safe_divide(avg_win?.abs(), avg_loss?.abs())
}

/// Mean of `100 · pnl / mfe`, skipping trades whose MFE is zero.
pub fn trade_efficiency_pct(pnl: &[f64], mfe: &[f64]) -> Option<f64> {
    let ratios: Vec<f64> = pnl
        .iter()
        .zip(mfe)
        .filter_map(|(&p, &m)| safe_divide(p, m))
        .map(|r| r * 100.0)
        .collect();
    mean(&ratios)
}

/// Average PnL over the population spread of `[avg win, |avg loss|]`.
pub fn sharpe_like(avg_pnl: f64, avg_win: Option<f64>, avg_loss: Option<f64>) -> Option<f64> {
    let spread = std_dev(&[avg_win?, avg_loss?.abs()], 0)?;
    safe_divide(avg_pnl, spread)
}

/// Average PnL over the sample standard deviation of losing trades.
pub fn sortino_like(avg_pnl: f64, losing_pnl: &[f64]) -> Option<f64> {
    safe_divide(avg_pnl, std_dev(losing_pnl, 1)?)
}

/// `wr · avg win + (1 − wr) · avg loss`, with `wr` as a fraction.
pub fn expectancy(win_rate_pct: f64, avg_win: Option<f64>, avg_loss: Option<f64>) -> Option<f64> {
    let wr = win_rate_pct / 100.0;
    Some(wr * avg_win? + (1.0 - wr) * avg_loss?)
}
