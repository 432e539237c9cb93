//! Probability distributions used by the engine.
//!
//! Implemented from first principles:
//! - Inverse standard-normal CDF (Acklam's rational approximation), giving the
//!   critical value z(c) for any confidence level c
//! - Two-sided Student's t tail probability at fractional degrees of
//!   freedom, through the regularized incomplete beta function

/// Inverse CDF of the standard normal distribution.
///
/// Acklam's algorithm; relative error below 1.2e-9 over (0, 1). Returns NaN
/// outside the open unit interval.
pub fn normal_quantile(p: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    #[allow(clippy::excessive_precision)]
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    #[allow(clippy::excessive_precision)]
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    #[allow(clippy::excessive_precision)]
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        tail(q)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -tail(q)
    }
}

/// Two-sided standard-normal critical value for confidence level `c`:
/// the z with P(|Z| <= z) = c.
pub fn z_critical(confidence: f64) -> f64 {
    normal_quantile(1.0 - (1.0 - confidence) / 2.0)
}

// ─── Student's t tail ───────────────────────────────────────────────

/// ln Gamma(x) for x > 0: shift up to x >= 15, then the Stirling series.
fn ln_gamma(x: f64) -> f64 {
    let mut z = x;
    let mut shift = 0.0;
    while z < 15.0 {
        shift += z.ln();
        z += 1.0;
    }
    let inv = 1.0 / z;
    let inv2 = inv * inv;
    let series = inv * (1.0 / 12.0 - inv2 * (1.0 / 360.0 - inv2 * (1.0 / 1260.0 - inv2 / 1680.0)));
    (z - 0.5) * z.ln() - z + 0.5 * (2.0 * std::f64::consts::PI).ln() + series - shift
}

/// Regularized incomplete beta I_x(a, b) for a, b > 0.
fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front =
        (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_fraction(b, a, 1.0 - x) / b
    }
}

/// Continued fraction for the incomplete beta, evaluated with Lentz's method.
fn beta_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_TERMS: u32 = 300;
    const TOLERANCE: f64 = 1e-15;
    const FLOOR: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < FLOOR { FLOOR.copysign(v) } else { v };
    let (sum, up, down) = (a + b, a + 1.0, a - 1.0);

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - sum * x / up);
    let mut h = d;
    for m in 1..=MAX_TERMS {
        let m = f64::from(m);
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((down + m2) * (a + m2));
        d = 1.0 / guard(1.0 + even * d);
        c = guard(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (sum + m) * x / ((a + m2) * (up + m2));
        d = 1.0 / guard(1.0 + odd * d);
        c = guard(1.0 + odd / c);
        let step = d * c;
        h *= step;

        if (step - 1.0).abs() < TOLERANCE {
            break;
        }
    }
    h
}

/// Two-sided tail probability P(|T| >= |t|) of Student's t with `df`
/// degrees of freedom. `df` need not be an integer.
pub fn t_two_sided_p(t: f64, df: f64) -> f64 {
    if !(df > 0.0) || t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    incomplete_beta(0.5 * df, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_critical_known_levels() {
        assert!((z_critical(0.95) - 1.959_964).abs() < 1e-6);
        assert!((z_critical(0.99) - 2.575_829).abs() < 1e-6);
        assert!((z_critical(0.90) - 1.644_854).abs() < 1e-6);
        assert!((z_critical(0.6827) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn normal_quantile_is_antisymmetric() {
        for &p in &[0.001, 0.01, 0.2, 0.4] {
            let lo = normal_quantile(p);
            let hi = normal_quantile(1.0 - p);
            assert!((lo + hi).abs() < 1e-8, "p={p}: {lo} vs {hi}");
        }
        assert!(normal_quantile(0.5).abs() < 1e-12);
    }

    #[test]
    fn normal_quantile_tail_regions() {
        // Phi^-1(0.001) = -3.090232
        assert!((normal_quantile(0.001) + 3.090_232).abs() < 1e-5);
        assert!((normal_quantile(0.999) - 3.090_232).abs() < 1e-5);
    }

    #[test]
    fn normal_quantile_rejects_out_of_range() {
        assert!(normal_quantile(0.0).is_nan());
        assert!(normal_quantile(1.0).is_nan());
        assert!(normal_quantile(-0.5).is_nan());
    }

    const SQRT_PI: f64 = 1.772_453_850_905_516;

    #[test]
    fn ln_gamma_at_welch_half_shapes() {
        // Gamma(df / 2) for the half-integer shapes Welch df produce
        assert!((ln_gamma(0.5) - SQRT_PI.ln()).abs() < 1e-12);
        assert!((ln_gamma(1.5) - (SQRT_PI / 2.0).ln()).abs() < 1e-12);
        assert!((ln_gamma(3.5) - (15.0 * SQRT_PI / 8.0).ln()).abs() < 1e-12);
        assert!((ln_gamma(6.0) - 120.0_f64.ln()).abs() < 1e-12);
        assert!((ln_gamma(25.0) - 620_448_401_733_239_439_360_000.0_f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn two_sided_p_matches_closed_forms() {
        for &t in &[0.3_f64, 1.0, 1.7, 2.9, 6.5] {
            // df = 1: Cauchy
            let cauchy = 1.0 - 2.0 / std::f64::consts::PI * t.atan();
            assert!((t_two_sided_p(t, 1.0) - cauchy).abs() < 1e-10, "df=1 t={t}");

            // df = 2
            let two = 1.0 - t / (2.0 + t * t).sqrt();
            assert!((t_two_sided_p(t, 2.0) - two).abs() < 1e-10, "df=2 t={t}");

            // df = 3
            let u = t / 3.0_f64.sqrt();
            let three = 1.0 - 2.0 / std::f64::consts::PI * (u.atan() + u / (1.0 + u * u));
            assert!((t_two_sided_p(t, 3.0) - three).abs() < 1e-10, "df=3 t={t}");
        }
    }

    #[test]
    fn fractional_df_sits_between_integer_neighbours() {
        // heavier tails at lower df
        let t = 2.1;
        let dfs = [2.0, 2.37, 3.0, 4.62, 8.91, 17.3, 41.05];
        let ps: Vec<f64> = dfs.iter().map(|&df| t_two_sided_p(t, df)).collect();
        for pair in ps.windows(2) {
            assert!(pair[0] > pair[1], "{ps:?}");
        }
        let near = t_two_sided_p(t, 4.999_999);
        assert!((near - t_two_sided_p(t, 5.0)).abs() < 1e-6);
    }

    #[test]
    fn two_sided_p_at_tabulated_critical_values() {
        // t_{0.975} critical values
        assert!((t_two_sided_p(2.570_582, 5.0) - 0.05).abs() < 1e-6);
        assert!((t_two_sided_p(2.228_139, 10.0) - 0.05).abs() < 1e-6);
        // Welch df from large run sets approaches the normal
        assert!((t_two_sided_p(1.959_964, 2_500.5) - 0.05).abs() < 5e-4);
    }

    #[test]
    fn two_sided_p_edges() {
        assert_eq!(t_two_sided_p(0.0, 7.3), 1.0);
        assert_eq!(t_two_sided_p(f64::INFINITY, 7.3), 0.0);
        assert_eq!(t_two_sided_p(f64::NEG_INFINITY, 7.3), 0.0);
        assert!(t_two_sided_p(1.0, 0.0).is_nan());
        assert!(t_two_sided_p(1.0, f64::NAN).is_nan());
        assert!(t_two_sided_p(f64::NAN, 3.0).is_nan());
        // sign of t does not matter
        assert_eq!(t_two_sided_p(-1.3, 6.8), t_two_sided_p(1.3, 6.8));
    }
}
