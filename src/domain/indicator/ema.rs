//! Exponential moving average over raw values.
//!
//! k = 2/(n+1), seeded with the SMA of the first n values, then
//! EMA[i] = X[i]*k + EMA[i-1]*(1-k). The first n-1 points are warmup.

pub(crate) fn ema_values(xs: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; xs.len()];
    if period == 0 || xs.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = xs[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);
    for i in period..xs.len() {
        ema = xs[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}
