use crate::domain::questionnaire::{Answer, AnswerKind, AnswerValue, Question};

const BULLISH_KEYWORDS: [&str; 3] = ["bullish", "strong", "support"];
const BEARISH_KEYWORDS: [&str; 3] = ["bearish", "weak", "resistance"];

/// One answer's contribution to its timeframe score.
///
/// `direction` feeds the bullish/bearish tallies; `delta` is the signed score
/// movement. They are usually `direction * magnitude`, except for the
/// "sideways" choice which drags the score down by 5 while staying neutral
/// for the tallies (an intentional asymmetry in the source heuristic).
#[derive(Debug, Clone, PartialEq)]
pub struct SignalContribution {
    pub direction: i8,
    pub delta: f64,
    pub note: Option<String>,
}

impl SignalContribution {
    fn bullish(magnitude: f64, note: String) -> Self {
        Self {
            direction: 1,
            delta: magnitude,
            note: Some(note),
        }
    }

    fn bearish(magnitude: f64, note: String) -> Self {
        Self {
            direction: -1,
            delta: -magnitude,
            note: Some(note),
        }
    }

    fn neutral() -> Self {
        Self {
            direction: 0,
            delta: 0.0,
            note: None,
        }
    }
}

/// Maps one raw answer into a signal contribution. Malformed or unrecognized
/// values never error; they degrade to a silent neutral contribution.
pub fn normalize_answer(answer: &Answer, question: &Question) -> SignalContribution {
    match &answer.value {
        AnswerValue::Choice(option) => {
            if question.kind != AnswerKind::Choice {
                return SignalContribution::neutral();
            }
            let lowered = option.trim().to_lowercase();
            if lowered.is_empty() {
                SignalContribution::neutral()
            } else if lowered.contains("bullish") {
                SignalContribution::bullish(15.0, format!("{}: bullish", question.text))
            } else if lowered.contains("bearish") {
                SignalContribution::bearish(15.0, format!("{}: bearish", question.text))
            } else if lowered.contains("sideways") || lowered.contains("neutral") {
                // Sideways leans mildly bearish without counting as a bearish vote.
                SignalContribution {
                    direction: 0,
                    delta: -5.0,
                    note: Some(format!("{}: sideways", question.text)),
                }
            } else {
                SignalContribution::neutral()
            }
        }
        AnswerValue::Rating(level) => {
            if question.kind != AnswerKind::Rating {
                return SignalContribution::neutral();
            }
            let scale = question.rating_scale();
            if *level < 1 || *level > scale {
                return SignalContribution::neutral();
            }
            // Top 20% of the scale reads bullish, bottom 40% bearish.
            let high = ((scale as f64) * 0.8).ceil() as i32;
            let low = ((scale as f64) * 0.4).floor() as i32;
            if *level >= high {
                SignalContribution::bullish(10.0, format!("{}: rated {level}/{scale}", question.text))
            } else if *level <= low {
                SignalContribution::bearish(10.0, format!("{}: rated {level}/{scale}", question.text))
            } else {
                SignalContribution::neutral()
            }
        }
        AnswerValue::Flag(flag) => {
            if question.kind != AnswerKind::Flag {
                return SignalContribution::neutral();
            }
            if *flag {
                SignalContribution::bullish(8.0, format!("{}: yes", question.text))
            } else {
                SignalContribution::bearish(8.0, format!("{}: no", question.text))
            }
        }
        AnswerValue::Text(text) => {
            if question.kind != AnswerKind::Text {
                return SignalContribution::neutral();
            }
            let lowered = text.to_lowercase();
            if BULLISH_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                SignalContribution::bullish(5.0, format!("{}: bullish wording", question.text))
            } else if BEARISH_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                SignalContribution::bearish(5.0, format!("{}: bearish wording", question.text))
            } else {
                SignalContribution::neutral()
            }
        }
    }
}
