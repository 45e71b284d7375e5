//! Conversions between the three equivalent rating scales: the natural
//! (log-gamma) scale the optimizer works in, the Elo scale used at the API
//! boundary, and the Bradley-Terry strength `gamma = exp(r)`.

#[inline]
pub(crate) fn natural_from_elo(elo: f64) -> f64 {
    elo / NATURAL_RATING_SCALE
}

#[inline]
pub(crate) fn elo_from_natural(r: f64) -> f64 {
    r * NATURAL_RATING_SCALE
}

#[inline]
pub(crate) fn gamma_from_elo(elo: f64) -> f64 {
    f64::powf(10.0, elo / 400.0)
}

/// Elo-squared variance to natural-squared variance.
#[inline]
pub(crate) fn natural_variance_from_elo(w2: f64) -> f64 {
    w2 / (NATURAL_RATING_SCALE * NATURAL_RATING_SCALE)
}

/// One natural rating unit in Elo points: `400 / ln 10`.
pub(crate) const NATURAL_RATING_SCALE: f64 = 400.0 / std::f64::consts::LN_10;
