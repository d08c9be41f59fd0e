use std::ops::RangeInclusive;

use common::models::{Direction, IndicatorSnapshot};
use rand::Rng;
use tracing::debug;

pub const OVERSOLD_RSI: f64 = 35.0;
pub const OVERBOUGHT_RSI: f64 = 65.0;

/// Band the displayed confidence is drawn from.
///
/// The value is uniform over the band and independent of the score. It is a
/// presentation choice, not a calibrated probability. Whether it should be
/// derived from score magnitude is still an open product question.
pub const CONFIDENCE_BAND: RangeInclusive<u8> = 82..=96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Sum of three votes, in `-3..=3`.
    pub score: i8,
    pub direction: Direction,
    pub confidence: u8,
}

/// Majority vote over RSI, MACD crossover and price versus SMA.
pub fn score(snapshot: &IndicatorSnapshot) -> i8 {
    let mut score = 0;

    // RSI only votes at the extremes
    if snapshot.rsi < OVERSOLD_RSI {
        score += 1;
    }
    if snapshot.rsi > OVERBOUGHT_RSI {
        score -= 1;
    }

    score += if snapshot.macd > snapshot.macd_signal { 1 } else { -1 };
    score += if snapshot.close > snapshot.sma { 1 } else { -1 };

    score
}

/// A score of exactly zero resolves to `Down`.
pub fn direction_for(score: i8) -> Direction {
    if score >= 1 {
        Direction::Up
    } else {
        Direction::Down
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, snapshot: &IndicatorSnapshot) -> Verdict {
        self.evaluate_with(snapshot, &mut rand::thread_rng())
    }

    pub fn evaluate_with<R: Rng + ?Sized>(&self, snapshot: &IndicatorSnapshot, rng: &mut R) -> Verdict {
        let score = score(snapshot);
        let verdict = Verdict {
            score,
            direction: direction_for(score),
            confidence: rng.gen_range(CONFIDENCE_BAND),
        };
        debug!(
            "Scored RSI={:.1} MACD={:.5}/{:.5} Close={:.5} SMA={:.5} -> {} ({:?})",
            snapshot.rsi,
            snapshot.macd,
            snapshot.macd_signal,
            snapshot.close,
            snapshot.sma,
            score,
            verdict.direction
        );
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn snapshot(rsi: f64, macd: f64, macd_signal: f64, close: f64, sma: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi,
            macd,
            macd_signal,
            sma,
            close,
        }
    }

    #[test]
    fn test_all_bullish_votes_score_plus_three() {
        let engine = ScoringEngine::new();
        for rsi in [0.0, 12.5, 34.99] {
            for (macd, sig) in [(0.2, 0.1), (-0.1, -0.3)] {
                for (close, sma) in [(1.10, 1.09), (191.5, 190.0)] {
                    let verdict = engine.evaluate(&snapshot(rsi, macd, sig, close, sma));
                    assert_eq!(verdict.score, 3);
                    assert_eq!(verdict.direction, Direction::Up);
                }
            }
        }
    }

    #[test]
    fn test_all_bearish_votes_score_minus_three() {
        let engine = ScoringEngine::new();
        for rsi in [65.01, 80.0, 100.0] {
            // equality counts as bearish for both crossovers
            for (macd, sig) in [(0.1, 0.2), (0.1, 0.1)] {
                for (close, sma) in [(1.08, 1.09), (1.09, 1.09)] {
                    let verdict = engine.evaluate(&snapshot(rsi, macd, sig, close, sma));
                    assert_eq!(verdict.score, -3);
                    assert_eq!(verdict.direction, Direction::Down);
                }
            }
        }
    }

    #[test]
    fn test_zero_score_resolves_down() {
        // neutral RSI, MACD bullish, price bearish
        let s = snapshot(50.0, 0.2, 0.1, 1.0, 2.0);
        assert_eq!(score(&s), 0);
        assert_eq!(ScoringEngine::new().evaluate(&s).direction, Direction::Down);
        assert_eq!(direction_for(0), Direction::Down);
        assert_eq!(direction_for(1), Direction::Up);
    }

    #[test]
    fn test_rsi_thresholds_are_exclusive() {
        assert_eq!(score(&snapshot(35.0, 1.0, 0.0, 2.0, 1.0)), 2);
        assert_eq!(score(&snapshot(65.0, 1.0, 0.0, 2.0, 1.0)), 2);
    }

    #[test]
    fn test_neutral_snapshot_is_down() {
        let verdict = ScoringEngine::new().evaluate(&IndicatorSnapshot::default());
        assert_eq!(verdict.score, -2);
        assert_eq!(verdict.direction, Direction::Down);
    }

    #[test]
    fn test_confidence_always_within_band() {
        let engine = ScoringEngine::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();

        for i in 0..2_000 {
            let rsi = (i % 101) as f64;
            let s = snapshot(rsi, (i % 3) as f64, 1.0, (i % 5) as f64, 2.0);
            let verdict = engine.evaluate_with(&s, &mut rng);
            assert!(CONFIDENCE_BAND.contains(&verdict.confidence));
            seen.insert(verdict.confidence);
        }

        // both ends of the closed band are reachable
        assert!(seen.contains(&82));
        assert!(seen.contains(&96));
    }

    #[test]
    fn test_direction_is_stable_for_identical_input() {
        let engine = ScoringEngine::new();
        let s = snapshot(40.0, 0.3, 0.1, 1.2, 1.3);
        let first = engine.evaluate(&s);
        let second = engine.evaluate(&s);
        assert_eq!(first.direction, second.direction);
        assert_eq!(first.score, second.score);
    }
}
