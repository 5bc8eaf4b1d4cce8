//! Pure FSRS formulas.
//!
//! No I/O, no mutation of inputs. Every stability result is clamped to
//! `[MIN_STABILITY, MAX_STABILITY]` and every difficulty to
//! `[MIN_DIFFICULTY, MAX_DIFFICULTY]`, so no sequence of reviews can drift out of
//! bounds or reach a non-finite value.

use super::parameters::{FsrsParameters, MAX_INTERVAL_DAYS};
use crate::types::Rating;

/// Forgetting curve exponent.
pub const DECAY: f64 = -0.5;

/// Curve scale, chosen so that retrievability is 0.9 when elapsed days equal stability.
/// Equals `0.9^(1/DECAY) - 1` (= 19/81).
pub const FACTOR: f64 = 19.0 / 81.0;

/// Stability floor, in days.
pub const MIN_STABILITY: f64 = 0.01;

/// Stability ceiling, in days. Matches the longest schedulable interval.
pub const MAX_STABILITY: f64 = MAX_INTERVAL_DAYS as f64;

/// Easiest possible difficulty.
pub const MIN_DIFFICULTY: f64 = 1.0;

/// Hardest possible difficulty.
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Bonus applied to successful-review stability growth on an Easy rating.
pub const EASY_BONUS: f64 = 1.3;

fn clamp_stability(stability: f64) -> f64 {
    if stability.is_nan() {
        return MIN_STABILITY;
    }
    stability.clamp(MIN_STABILITY, MAX_STABILITY)
}

fn clamp_difficulty(difficulty: f64) -> f64 {
    if difficulty.is_nan() {
        return MAX_DIFFICULTY;
    }
    difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Probability of recall after `elapsed_days` for a memory of the given stability.
///
/// R = (1 + FACTOR * t / S)^DECAY. Stability is floored at 0.01 and negative
/// elapsed time counts as zero.
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    let stability = clamp_stability(stability);
    let elapsed = if elapsed_days.is_finite() {
        elapsed_days.max(0.0)
    } else if elapsed_days > 0.0 {
        return 0.0;
    } else {
        0.0
    };
    (1.0 + FACTOR * elapsed / stability)
        .powf(DECAY)
        .clamp(0.0, 1.0)
}

/// Stability of a memory formed by a first review with `rating`: `w[rating]`.
pub fn initial_stability(params: &FsrsParameters, rating: Rating) -> f64 {
    clamp_stability(params.w(rating.ordinal()))
}

/// Difficulty of a memory formed by a first review with `rating`.
///
/// `w4 - w5 * (ordinal - 2)`, with Again scored as Hard.
pub fn initial_difficulty(params: &FsrsParameters, rating: Rating) -> f64 {
    let ordinal = rating.ordinal().max(Rating::Hard.ordinal()) as f64;
    clamp_difficulty(params.w(4) - params.w(5) * (ordinal - 2.0))
}

/// Difficulty after a review: `D - w6 * ((ordinal + 1) - 2.5)`.
pub fn update_difficulty(params: &FsrsParameters, current: f64, rating: Rating) -> f64 {
    let grade = rating.ordinal() as f64 + 1.0;
    clamp_difficulty(current - params.w(6) * (grade - 2.5))
}

/// Stability after the first transition out of the new state.
///
/// Again resets to the Again initial stability; other ratings scale the current
/// stability by `exp(w8 * (ordinal - 3 + w9))`.
pub fn update_stability_on_first_review(
    params: &FsrsParameters,
    stability: f64,
    rating: Rating,
) -> f64 {
    if rating.is_failure() {
        return initial_stability(params, Rating::Again);
    }
    let ordinal = rating.ordinal() as f64;
    clamp_stability(stability * (params.w(8) * (ordinal - 3.0 + params.w(9))).exp())
}

/// Stability after a review of an already-learned memory.
///
/// Again applies the lapse formula
/// `w10 * D^-w11 * ((S + 1)^w12 - 1) * exp(w13 * (1 - R))`.
/// Other ratings apply the success formula
/// `S * (1 + exp(w14) * (11 - D) * S^-w15 * (exp((1 - R) * w16) - 1))`,
/// multiplied by 1.3 for Easy.
pub fn update_stability_on_review(
    params: &FsrsParameters,
    stability: f64,
    difficulty: f64,
    retrievability: f64,
    rating: Rating,
) -> f64 {
    let s = clamp_stability(stability);
    let d = clamp_difficulty(difficulty);
    let r = retrievability.clamp(0.0, 1.0);

    if rating.is_failure() {
        let lapse = params.w(10)
            * d.powf(-params.w(11))
            * ((s + 1.0).powf(params.w(12)) - 1.0)
            * (params.w(13) * (1.0 - r)).exp();
        return clamp_stability(lapse);
    }

    let growth = params.w(14).exp()
        * (11.0 - d)
        * s.powf(-params.w(15))
        * (((1.0 - r) * params.w(16)).exp() - 1.0);
    let mut next = s * (1.0 + growth);
    if rating == Rating::Easy {
        next *= EASY_BONUS;
    }
    clamp_stability(next)
}

/// Interval in whole days after which recall probability falls to `desired_retention`.
///
/// `(S / FACTOR) * (retention^(1/DECAY) - 1)`, rounded and clamped to `[1, 36500]`.
pub fn next_interval(stability: f64, desired_retention: f64) -> u32 {
    next_interval_with_max(stability, desired_retention, MAX_INTERVAL_DAYS)
}

/// [`next_interval`] with a custom upper bound.
pub fn next_interval_with_max(stability: f64, desired_retention: f64, maximum_interval: u32) -> u32 {
    let maximum = maximum_interval.clamp(1, MAX_INTERVAL_DAYS);
    let raw = (clamp_stability(stability) / FACTOR) * (desired_retention.powf(1.0 / DECAY) - 1.0);
    if !raw.is_finite() {
        return if raw > 0.0 { maximum } else { 1 };
    }
    raw.round().clamp(1.0, maximum as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsrs::DEFAULT_RETENTION;

    const EPS: f64 = 1e-9;

    fn params() -> FsrsParameters {
        FsrsParameters::default()
    }

    #[test]
    fn test_factor_matches_decay() {
        let derived = 0.9f64.powf(1.0 / DECAY) - 1.0;
        assert!((derived - FACTOR).abs() < EPS);
    }

    #[test]
    fn test_retrievability_at_zero_elapsed() {
        assert!((retrievability(0.0, 10.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_retrievability_at_stability_is_target() {
        for s in [0.5, 3.0, 10.0, 365.0] {
            assert!((retrievability(s, s) - 0.9).abs() < 1e-9, "S = {}", s);
        }
    }

    #[test]
    fn test_retrievability_decays_over_time() {
        let r1 = retrievability(1.0, 10.0);
        let r2 = retrievability(5.0, 10.0);
        let r3 = retrievability(30.0, 10.0);
        assert!(r1 > r2 && r2 > r3);
        assert!(r3 > 0.0);
    }

    #[test]
    fn test_retrievability_guards_degenerate_input() {
        // Zero stability is floored, not a division by zero.
        let r = retrievability(1.0, 0.0);
        assert!(r.is_finite() && r > 0.0 && r < 1.0);
        // Clock skew counts as no elapsed time.
        assert_eq!(retrievability(-3.0, 5.0), 1.0);
        assert_eq!(retrievability(f64::INFINITY, 5.0), 0.0);
    }

    #[test]
    fn test_initial_stability_lookup() {
        let p = params();
        assert_eq!(initial_stability(&p, Rating::Again), 0.4);
        assert_eq!(initial_stability(&p, Rating::Hard), 0.6);
        assert_eq!(initial_stability(&p, Rating::Good), 2.4);
        assert_eq!(initial_stability(&p, Rating::Easy), 5.8);
    }

    #[test]
    fn test_initial_stability_floor() {
        let mut weights = crate::fsrs::DEFAULT_WEIGHTS;
        weights[0] = 0.0;
        let p = FsrsParameters::with_weights(weights);
        assert_eq!(initial_stability(&p, Rating::Again), MIN_STABILITY);
    }

    #[test]
    fn test_initial_difficulty_again_behaves_like_hard() {
        let p = params();
        let again = initial_difficulty(&p, Rating::Again);
        let hard = initial_difficulty(&p, Rating::Hard);
        assert!((again - hard).abs() < EPS);
        assert!((hard - 5.87).abs() < 1e-9);
        assert!((initial_difficulty(&p, Rating::Good) - 4.93).abs() < 1e-9);
        assert!((initial_difficulty(&p, Rating::Easy) - 3.99).abs() < 1e-9);
    }

    #[test]
    fn test_update_difficulty_direction() {
        let p = params();
        assert!((update_difficulty(&p, 5.0, Rating::Again) - 6.29).abs() < 1e-9);
        assert!((update_difficulty(&p, 5.0, Rating::Hard) - 5.43).abs() < 1e-9);
        assert!((update_difficulty(&p, 5.0, Rating::Good) - 4.57).abs() < 1e-9);
        assert!((update_difficulty(&p, 5.0, Rating::Easy) - 3.71).abs() < 1e-9);
    }

    #[test]
    fn test_update_difficulty_clamped() {
        let p = params();
        let mut d = 5.0;
        for _ in 0..100 {
            d = update_difficulty(&p, d, Rating::Again);
        }
        assert_eq!(d, MAX_DIFFICULTY);
        for _ in 0..100 {
            d = update_difficulty(&p, d, Rating::Easy);
        }
        assert_eq!(d, MIN_DIFFICULTY);
    }

    #[test]
    fn test_first_review_stability() {
        let p = params();
        assert_eq!(update_stability_on_first_review(&p, 3.0, Rating::Again), 0.4);

        let easy = update_stability_on_first_review(&p, 3.0, Rating::Easy);
        let expected = 3.0 * (1.49f64 * 0.14).exp();
        assert!((easy - expected).abs() < 1e-9);

        let good = update_stability_on_first_review(&p, 3.0, Rating::Good);
        assert!(good < easy);

        // A new card's zero stability is floored rather than propagated.
        assert_eq!(update_stability_on_first_review(&p, 0.0, Rating::Good), MIN_STABILITY);
    }

    #[test]
    fn test_success_stability_grows() {
        let p = params();
        let r = retrievability(10.0, 10.0);
        let hard = update_stability_on_review(&p, 10.0, 5.0, r, Rating::Hard);
        let good = update_stability_on_review(&p, 10.0, 5.0, r, Rating::Good);
        let easy = update_stability_on_review(&p, 10.0, 5.0, r, Rating::Easy);

        assert!(good > 10.0);
        assert!((good - 42.35).abs() < 0.1, "good = {}", good);
        assert!((hard - good).abs() < EPS);
        assert!((easy - good * EASY_BONUS).abs() < 1e-9);
    }

    #[test]
    fn test_lower_retrievability_means_more_growth() {
        let p = params();
        let early = update_stability_on_review(&p, 10.0, 5.0, 0.97, Rating::Good);
        let late = update_stability_on_review(&p, 10.0, 5.0, 0.6, Rating::Good);
        assert!(late > early);
    }

    #[test]
    fn test_lapse_stability_shrinks_and_is_floored() {
        let p = params();
        let s = update_stability_on_review(&p, 10.0, 5.0, 0.9, Rating::Again);
        assert!(s < 10.0);
        assert!(s >= MIN_STABILITY);
        assert_eq!(s, MIN_STABILITY);
    }

    #[test]
    fn test_stability_never_exceeds_ceiling() {
        let p = params();
        let mut s = 1000.0;
        for _ in 0..500 {
            s = update_stability_on_review(&p, s, 1.0, 0.0, Rating::Easy);
            assert!(s.is_finite());
        }
        assert_eq!(s, MAX_STABILITY);
    }

    #[test]
    fn test_next_interval_equals_stability_at_default_retention() {
        assert_eq!(next_interval(10.0, DEFAULT_RETENTION), 10);
        assert_eq!(next_interval(42.4, DEFAULT_RETENTION), 42);
    }

    #[test]
    fn test_next_interval_bounds() {
        assert_eq!(next_interval(0.01, DEFAULT_RETENTION), 1);
        assert_eq!(next_interval(1e9, DEFAULT_RETENTION), MAX_INTERVAL_DAYS);
        assert_eq!(next_interval_with_max(500.0, DEFAULT_RETENTION, 90), 90);
    }

    #[test]
    fn test_higher_retention_shortens_interval() {
        assert!(next_interval(30.0, 0.95) < next_interval(30.0, 0.9));
        assert!(next_interval(30.0, 0.8) > next_interval(30.0, 0.9));
    }
}
