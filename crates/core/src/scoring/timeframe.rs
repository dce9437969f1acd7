use crate::domain::analysis::{clamp_score, Sentiment, TimeframeResult};
use crate::domain::questionnaire::Timeframe;
use crate::scoring::normalizer::SignalContribution;

const BASE_SCORE: f64 = 50.0;
const BULLISH_SCORE_FLOOR: f64 = 55.0;
const BEARISH_SCORE_CEILING: f64 = 45.0;

/// Folds all normalized contributions for one timeframe into its result.
/// With no answers the timeframe stays at the neutral baseline of 50.
pub fn score_timeframe(
    timeframe: Timeframe,
    contributions: &[SignalContribution],
) -> TimeframeResult {
    let mut score = BASE_SCORE;
    let mut bullish_count = 0usize;
    let mut bearish_count = 0usize;
    let mut notes = Vec::new();

    for contribution in contributions {
        score = clamp_score(score + contribution.delta);
        match contribution.direction {
            d if d > 0 => bullish_count += 1,
            d if d < 0 => bearish_count += 1,
            _ => {}
        }
        if let Some(note) = &contribution.note {
            notes.push(note.as_str());
        }
    }

    let total = contributions.len();
    let sentiment = if bullish_count > bearish_count && score > BULLISH_SCORE_FLOOR {
        Sentiment::Bullish
    } else if bearish_count > bullish_count && score < BEARISH_SCORE_CEILING {
        Sentiment::Bearish
    } else {
        Sentiment::Neutral
    };

    let strength = if total > 0 {
        bullish_count.max(bearish_count) as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    TimeframeResult {
        timeframe,
        probability: score,
        sentiment,
        strength,
        reasoning: notes.join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullish(delta: f64) -> SignalContribution {
        SignalContribution {
            direction: 1,
            delta,
            note: Some("up".to_string()),
        }
    }

    fn bearish(delta: f64) -> SignalContribution {
        SignalContribution {
            direction: -1,
            delta: -delta,
            note: Some("down".to_string()),
        }
    }

    #[test]
    fn empty_timeframe_is_neutral_fifty() {
        let r = score_timeframe(Timeframe::Daily, &[]);
        assert_eq!(r.probability, 50.0);
        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert_eq!(r.strength, 0.0);
        assert!(r.reasoning.is_empty());
    }

    #[test]
    fn single_bullish_choice_scores_sixty_five() {
        // One bullish CHOICE answer moves the baseline by 15.
        let r = score_timeframe(Timeframe::Daily, &[bullish(15.0)]);
        assert_eq!(r.probability, 65.0);
        assert_eq!(r.sentiment, Sentiment::Bullish);
        assert_eq!(r.strength, 100.0);
    }

    #[test]
    fn score_clamps_under_heavy_one_sided_input() {
        let contributions: Vec<_> = (0..6).map(|_| bullish(15.0)).collect();
        let r = score_timeframe(Timeframe::H4, &contributions);
        assert_eq!(r.probability, 100.0);

        let contributions: Vec<_> = (0..6).map(|_| bearish(15.0)).collect();
        let r = score_timeframe(Timeframe::H4, &contributions);
        assert_eq!(r.probability, 0.0);
        assert_eq!(r.sentiment, Sentiment::Bearish);
    }

    #[test]
    fn majority_without_score_margin_stays_neutral() {
        // Two bullish votes but offsetting deltas keep the score at 51;
        // the 55 floor gates the bullish call.
        let contributions = [bullish(8.0), bullish(8.0), bearish(15.0)];
        let r = score_timeframe(Timeframe::H1, &contributions);
        assert_eq!(r.probability, 51.0);
        assert_eq!(r.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn strength_counts_dominant_side_over_all_answers() {
        let contributions = [
            bullish(15.0),
            bullish(10.0),
            bearish(8.0),
            SignalContribution { direction: 0, delta: 0.0, note: None },
        ];
        let r = score_timeframe(Timeframe::W1, &contributions);
        assert_eq!(r.strength, 50.0);
    }

    #[test]
    fn reasoning_joins_notes_in_order() {
        let contributions = [bullish(15.0), bearish(8.0)];
        let r = score_timeframe(Timeframe::Daily, &contributions);
        assert_eq!(r.reasoning, "up; down");
    }

    #[test]
    fn sideways_delta_drags_score_without_a_vote() {
        let sideways = SignalContribution {
            direction: 0,
            delta: -5.0,
            note: Some("sideways".to_string()),
        };
        let r = score_timeframe(Timeframe::Daily, &[sideways]);
        assert_eq!(r.probability, 45.0);
        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert_eq!(r.strength, 0.0);
    }
}
