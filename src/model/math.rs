//! Pure numeric helpers for the Bayesian update.
//!
//! Everything in this module is side-effect free and deterministic so the
//! rating engine itself stays trivially testable.

use std::f64::consts::{PI, SQRT_2};

/// Probabilities are clamped away from 0 and 1 before hitting the
/// inverse CDF or a division.
const EPSILON: f64 = 1e-9;

/// Error function, Abramowitz & Stegun 7.1.26. Max absolute error 1.5e-7,
/// which is far below anything visible in a rating delta.
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal probability density function.
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Inverse standard normal CDF via the Beasley-Springer-Moro rational
/// approximation. Input is clamped into the open unit interval.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    let p = p.clamp(EPSILON, 1.0 - EPSILON);

    const A: [f64; 4] = [2.50662823884, -18.61500062529, 41.39119773534, -25.44106049637];
    const B: [f64; 4] = [-8.47351093090, 23.08336743743, -21.06224101826, 3.13082909833];
    const C: [f64; 9] = [
        0.3374754822726147,
        0.9761690190917186,
        0.1607979714918209,
        0.0276438810333863,
        0.0038405729373609,
        0.0003951896511919,
        0.0000321767881768,
        0.0000002888167364,
        0.0000003960315187
    ];

    let y = p - 0.5;

    if y.abs() < 0.42 {
        let r = y * y;
        let numerator = y * (((A[3] * r + A[2]) * r + A[1]) * r + A[0]);
        let denominator = (((B[3] * r + B[2]) * r + B[1]) * r + B[0]) * r + 1.0;
        return numerator / denominator;
    }

    let r = if y > 0.0 { 1.0 - p } else { p };
    let r = (-r.ln()).ln();
    let mut x = C[0];
    let mut power = 1.0;
    for coefficient in C.iter().skip(1) {
        power *= r;
        x += coefficient * power;
    }

    if y < 0.0 {
        -x
    } else {
        x
    }
}

/// Mean-shift correction term `v`. Positive for wins, negative for
/// losses, and a margin-based value for draws.
pub fn v_correction(win_probability: f64, draw_probability: f64, score: f64) -> f64 {
    let p = win_probability.clamp(EPSILON, 1.0 - EPSILON);
    let t = inverse_normal_cdf(p);

    if score > 0.75 {
        // Win: truncated-Gaussian pull, large when the win was unlikely
        normal_pdf(t) / p.max(EPSILON)
    } else if score < 0.25 {
        // Loss: the winner-frame pull with the sign flipped
        -normal_pdf(t) / (1.0 - p).max(EPSILON)
    } else {
        // Draw: mass between the draw margins around the mean difference
        let margin = draw_margin(draw_probability);
        let alpha = -margin - t;
        let beta = margin - t;
        let denominator = normal_cdf(beta) - normal_cdf(alpha);

        if denominator.abs() < EPSILON {
            return 0.0;
        }

        (normal_pdf(alpha) - normal_pdf(beta)) / denominator
    }
}

/// Half-width of the draw band implied by the draw prior.
fn draw_margin(draw_probability: f64) -> f64 {
    inverse_normal_cdf((1.0 + draw_probability.clamp(0.0, 1.0)) / 2.0)
}

/// Variance-shrink correction term `w`. Always non-negative for decisive
/// results; callers still guard the shrink product against going negative.
pub fn w_correction(win_probability: f64, draw_probability: f64, score: f64) -> f64 {
    let p = win_probability.clamp(EPSILON, 1.0 - EPSILON);
    let t = inverse_normal_cdf(p);
    let v = v_correction(p, draw_probability, score);

    if score > 0.75 || score < 0.25 {
        // Same form for both decisive outcomes; the hazard bound keeps
        // v + t and v on the same side, so w stays positive
        v * (v + t)
    } else {
        let margin = draw_margin(draw_probability);
        let alpha = -margin - t;
        let beta = margin - t;
        let denominator = normal_cdf(beta) - normal_cdf(alpha);

        if denominator.abs() < EPSILON {
            return 0.0;
        }

        v * v + (beta * normal_pdf(beta) - alpha * normal_pdf(alpha)) / denominator
    }
}
