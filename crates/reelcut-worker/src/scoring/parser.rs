//! Parsing of free-text engagement analysis.
//!
//! The collaborator is asked for JSON but responses may be wrapped in a
//! Markdown fence, be a bare array, or be plain prose. Anything that cannot
//! be attributed to a segment index is ignored.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// A score attributed to one segment index.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScore {
    pub index: usize,
    pub score: f64,
    pub rationale: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnalysisJson {
    Object { segments: Vec<Value> },
    List(Vec<Value>),
}

#[derive(Deserialize)]
struct ScoreJson {
    #[serde(alias = "segment", alias = "id")]
    index: usize,
    #[serde(alias = "engagement_score")]
    score: Option<f64>,
    #[serde(default, alias = "explanation", alias = "reason")]
    rationale: String,
}

static SEGMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)segment\s*#?\s*(\d+)\W+?(?:score\W*?)?(\d{1,3}(?:\.\d+)?)(?:\s*/\s*100)?(?:\s*(?:[-|,]|:\s)[\s\-:|,]*(.*))?\s*$",
    )
    .expect("segment line pattern is valid")
});

/// Extract per-segment scores from an analysis response.
///
/// Returns one entry per index; when an index appears more than once the
/// first occurrence wins. Malformed JSON entries are skipped on their own
/// so the rest of the response still counts.
pub fn parse_analysis(text: &str) -> BTreeMap<usize, ParsedScore> {
    let body = strip_code_fence(text);
    if let Ok(parsed) = serde_json::from_str::<AnalysisJson>(body) {
        let entries = match parsed {
            AnalysisJson::Object { segments } => segments,
            AnalysisJson::List(list) => list,
        };
        return collect(entries.into_iter().filter_map(|entry| {
            let e: ScoreJson = serde_json::from_value(entry).ok()?;
            let score = e.score.filter(|s| s.is_finite())?;
            Some(ParsedScore {
                index: e.index,
                score,
                rationale: e.rationale.trim().to_string(),
            })
        }));
    }

    collect(text.lines().filter_map(parse_line))
}

fn collect(scores: impl Iterator<Item = ParsedScore>) -> BTreeMap<usize, ParsedScore> {
    let mut map = BTreeMap::new();
    for score in scores {
        map.entry(score.index).or_insert(score);
    }
    map
}

fn parse_line(line: &str) -> Option<ParsedScore> {
    let caps = SEGMENT_LINE.captures(line.trim())?;
    let index = caps.get(1)?.as_str().parse().ok()?;
    let score = caps.get(2)?.as_str().parse().ok()?;
    let rationale = caps
        .get(3)
        .map(|m| m.as_str().trim().trim_matches('*').trim().to_string())
        .unwrap_or_default();
    Some(ParsedScore {
        index,
        score,
        rationale,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the language tag line
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_object() {
        let scores = parse_analysis(
            r#"{"segments": [
                {"index": 1, "score": 82, "rationale": "Strong hook"},
                {"index": 2, "score": 45.5, "explanation": "Slow start"}
            ]}"#,
        );
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&1].score, 82.0);
        assert_eq!(scores[&1].rationale, "Strong hook");
        assert_eq!(scores[&2].score, 45.5);
        assert_eq!(scores[&2].rationale, "Slow start");
    }

    #[test]
    fn test_parse_fenced_json_list() {
        let scores = parse_analysis(
            "```json\n[{\"segment\": 3, \"engagement_score\": 91, \"reason\": \"Punchline\"}]\n```",
        );
        assert_eq!(scores[&3].score, 91.0);
        assert_eq!(scores[&3].rationale, "Punchline");
    }

    #[test]
    fn test_json_entries_without_score_are_skipped() {
        let scores = parse_analysis(r#"{"segments": [{"index": 1}, {"index": 2, "score": 70}]}"#);
        assert!(!scores.contains_key(&1));
        assert_eq!(scores[&2].score, 70.0);
    }

    #[test]
    fn test_malformed_json_entries_only_drop_themselves() {
        let scores = parse_analysis(
            r#"{"segments": [
                {"index": 1, "score": 80, "rationale": "good"},
                {"index": 2, "score": "N/A"},
                {"index": "3", "score": 60},
                {"score": 55},
                {"index": 5, "score": 35.5}
            ]}"#,
        );
        assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(scores[&1].score, 80.0);
        assert_eq!(scores[&1].rationale, "good");
        assert_eq!(scores[&5].score, 35.5);
    }

    #[test]
    fn test_echoed_segment_listing_is_not_a_score() {
        let scores = parse_analysis(
            "Segment 1: 00:00:00 - 00:00:20 (20.0s)\n\
             Segment 2: 75 - solid\n\
             Segment 3: 0:01:05 - 0:01:30 (25.0s)\n\
             Segment 4: 64: quotable line",
        );
        assert!(!scores.contains_key(&1));
        assert!(!scores.contains_key(&3));
        assert_eq!(scores[&2].score, 75.0);
        assert_eq!(scores[&2].rationale, "solid");
        assert_eq!(scores[&4].score, 64.0);
        assert_eq!(scores[&4].rationale, "quotable line");
    }

    #[test]
    fn test_parse_prose_lines() {
        let text = "Here is my analysis.\n\
                    Segment 1: 85 - Great storytelling\n\
                    **Segment 2** - Score: 40/100 - Too much setup\n\
                    Segment 3: no clear score\n\
                    segment #4 | 72";
        let scores = parse_analysis(text);

        assert_eq!(scores[&1].score, 85.0);
        assert_eq!(scores[&1].rationale, "Great storytelling");
        assert_eq!(scores[&2].score, 40.0);
        assert_eq!(scores[&2].rationale, "Too much setup");
        assert!(!scores.contains_key(&3));
        assert_eq!(scores[&4].score, 72.0);
        assert_eq!(scores[&4].rationale, "");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let scores = parse_analysis("Segment 1: 60 - first\nSegment 1: 10 - second");
        assert_eq!(scores[&1].score, 60.0);
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(parse_analysis("").is_empty());
        assert!(parse_analysis("I cannot help with that.").is_empty());
        assert!(parse_analysis("{\"unexpected\": true}").is_empty());
    }
}
