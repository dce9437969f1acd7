use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart intervals a trader evaluates, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "MN1")]
    Mn1,
    #[serde(rename = "W1")]
    W1,
    #[serde(rename = "DAILY")]
    Daily,
    #[serde(rename = "H8")]
    H8,
    #[serde(rename = "H4")]
    H4,
    #[serde(rename = "H2")]
    H2,
    #[serde(rename = "H1")]
    H1,
    #[serde(rename = "M30")]
    M30,
    #[serde(rename = "M15")]
    M15,
    #[serde(rename = "M10")]
    M10,
}

impl Timeframe {
    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::Mn1 => "MN1",
            Timeframe::W1 => "W1",
            Timeframe::Daily => "DAILY",
            Timeframe::H8 => "H8",
            Timeframe::H4 => "H4",
            Timeframe::H2 => "H2",
            Timeframe::H1 => "H1",
            Timeframe::M30 => "M30",
            Timeframe::M15 => "M15",
            Timeframe::M10 => "M10",
        }
    }

    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::Mn1,
            Timeframe::W1,
            Timeframe::Daily,
            Timeframe::H8,
            Timeframe::H4,
            Timeframe::H2,
            Timeframe::H1,
            Timeframe::M30,
            Timeframe::M15,
            Timeframe::M10,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MN1" => Ok(Timeframe::Mn1),
            "W1" => Ok(Timeframe::W1),
            "DAILY" | "D1" => Ok(Timeframe::Daily),
            "H8" => Ok(Timeframe::H8),
            "H4" => Ok(Timeframe::H4),
            "H2" => Ok(Timeframe::H2),
            "H1" => Ok(Timeframe::H1),
            "M30" => Ok(Timeframe::M30),
            "M15" => Ok(Timeframe::M15),
            "M10" => Ok(Timeframe::M10),
            other => anyhow::bail!("unknown timeframe code: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnswerKind {
    Choice,
    Rating,
    Flag,
    Text,
}

/// Immutable questionnaire reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub timeframe: Timeframe,
    pub text: String,
    pub kind: AnswerKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl Question {
    /// Upper bound of the rating scale for RATING questions. Defaults to the
    /// 1..=5 scale when the question does not enumerate its levels.
    pub fn rating_scale(&self) -> i32 {
        if self.kind == AnswerKind::Rating && !self.options.is_empty() {
            self.options.len() as i32
        } else {
            5
        }
    }
}

/// One value field per answer kind, a tagged union rather than a loose blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Choice(String),
    Rating(i32),
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub analysis_id: i64,
    pub value: AnswerValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timeframe_round_trips_through_its_code() {
        for tf in Timeframe::all() {
            assert_eq!(tf.code().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn timeframe_parse_is_case_insensitive() {
        assert_eq!("daily".parse::<Timeframe>().unwrap(), Timeframe::Daily);
        assert_eq!("h4".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert!("M45".parse::<Timeframe>().is_err());
    }

    #[test]
    fn answer_value_serde_is_tagged() {
        let v = AnswerValue::Rating(4);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, json!({"kind": "rating", "value": 4}));

        let back: AnswerValue =
            serde_json::from_value(json!({"kind": "flag", "value": true})).unwrap();
        assert_eq!(back, AnswerValue::Flag(true));
    }

    #[test]
    fn rating_scale_follows_option_count() {
        let q = Question {
            id: 1,
            timeframe: Timeframe::Daily,
            text: "Trend strength".to_string(),
            kind: AnswerKind::Rating,
            options: vec!["1".into(), "2".into(), "3".into()],
            sort_order: 0,
        };
        assert_eq!(q.rating_scale(), 3);

        let q = Question { options: vec![], ..q };
        assert_eq!(q.rating_scale(), 5);
    }
}
