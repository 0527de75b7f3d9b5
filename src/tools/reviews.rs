//! 评论工具（模拟）：reviews.get
//!
//! 评论从固定语料中按 place_id 的稳定哈希挑选，附带评分统计与按方面（员工、房间、餐饮、位置、设施、性价比）的情感分析。

use std::collections::BTreeMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::mock_data;
use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolCallContext};

/// 方面 → (正面词, 负面词)
const REVIEW_ASPECTS: &[(&str, &[&str], &[&str])] = &[
    (
        "staff",
        &["friendly", "helpful", "welcoming", "attentive", "polite"],
        &["rude", "unhelpful", "slow", "ignored"],
    ),
    (
        "room",
        &["clean", "spacious", "comfortable", "quiet", "cozy"],
        &["dirty", "small", "noisy", "cramped", "smelly"],
    ),
    (
        "food",
        &["delicious", "tasty", "fresh", "excellent food", "great breakfast"],
        &["bland", "cold", "overpriced food", "stale"],
    ),
    (
        "location",
        &["central", "convenient", "close to", "great location", "walkable"],
        &["far from", "remote", "hard to find", "unsafe"],
    ),
    (
        "amenities",
        &["pool", "gym", "wifi worked", "well equipped", "great view"],
        &["broken", "no wifi", "closed", "out of order"],
    ),
    (
        "value",
        &["worth", "good value", "reasonable", "affordable"],
        &["expensive", "overpriced", "not worth", "rip-off"],
    ),
];

/// (作者, 评分, 内容)
const REVIEW_CORPUS: &[(&str, u8, &str)] = &[
    ("Amélie R.", 5, "Absolutely worth the visit. Central, easy to reach and the staff were friendly and helpful."),
    ("Kenji T.", 4, "Great view and very clean. A bit expensive but good value overall."),
    ("Priya S.", 5, "Delicious food nearby and a great location for walking around. Would come back."),
    ("Marco B.", 3, "Interesting but crowded and noisy at midday. Go early."),
    ("Sarah L.", 2, "Overpriced and the staff seemed slow. Parts were closed for renovation."),
    ("Tom H.", 4, "Convenient and well organised. The audio guide was excellent, staff polite."),
    ("Lena K.", 5, "Spacious, quiet corners and a comfortable cafe. Reasonable prices."),
    ("Diego F.", 1, "Not worth the queue. Rude security and the lifts were out of order."),
];

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReviewsArgs {
    pub place_id: String,
    #[serde(default)]
    pub limit: Option<usize>,
    /// relevance（默认）/ newest / rating
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// 对一组评论文本做方面情感分析
pub fn analyze_sentiment(texts: &[&str]) -> Value {
    let lowered: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
    let mut aspects = serde_json::Map::new();
    let mut total_positive = 0usize;
    let mut total_negative = 0usize;

    for (aspect, positive_words, negative_words) in REVIEW_ASPECTS {
        let count = |words: &[&str]| -> usize {
            lowered
                .iter()
                .map(|t| words.iter().filter(|w| t.contains(*w)).count())
                .sum()
        };
        let positive = count(*positive_words);
        let negative = count(*negative_words);
        if positive + negative == 0 {
            continue;
        }
        total_positive += positive;
        total_negative += negative;
        let score = (positive as f64 - negative as f64) / (positive + negative) as f64;
        aspects.insert(
            aspect.to_string(),
            json!({ "positive": positive, "negative": negative, "score": (score * 100.0).round() / 100.0 }),
        );
    }

    let overall = match total_positive.cmp(&total_negative) {
        std::cmp::Ordering::Greater => "positive",
        std::cmp::Ordering::Less => "negative",
        std::cmp::Ordering::Equal => "neutral",
    };
    json!({ "overall": overall, "aspects": aspects })
}

/// reviews.get
pub struct ReviewsTool;

#[async_trait]
impl Tool for ReviewsTool {
    fn name(&self) -> &str {
        "reviews.get"
    }

    fn description(&self) -> &str {
        "Get recent reviews, rating statistics and aspect sentiment for a place or hotel."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<ReviewsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolCallContext) -> Result<Value, String> {
        let args: ReviewsArgs = parse_args(self.name(), args)?;
        if args.place_id.trim().is_empty() {
            return Err("place_id must not be empty".to_string());
        }
        let limit = args.limit.unwrap_or(5).clamp(1, REVIEW_CORPUS.len());

        let start = (mock_data::stable_hash(&args.place_id) % REVIEW_CORPUS.len() as u64) as usize;
        let mut picked: Vec<(usize, &(&str, u8, &str))> = (0..REVIEW_CORPUS.len())
            .map(|i| (i, &REVIEW_CORPUS[(start + i) % REVIEW_CORPUS.len()]))
            .collect();
        match args.sort_by.as_deref() {
            Some("rating") => picked.sort_by(|a, b| b.1 .1.cmp(&a.1 .1)),
            Some("newest") => picked.reverse(),
            _ => {}
        }

        let mut distribution: BTreeMap<String, usize> =
            (1..=5).map(|r| (r.to_string(), 0)).collect();
        let mut sum = 0u32;
        for (_, (_, rating, _)) in &picked {
            sum += u32::from(*rating);
            *distribution.entry(rating.to_string()).or_default() += 1;
        }
        let average = f64::from(sum) / picked.len() as f64;

        let selected: Vec<&(&str, u8, &str)> =
            picked.iter().take(limit).map(|(_, review)| *review).collect();
        let texts: Vec<&str> = selected.iter().map(|(_, _, text)| *text).collect();
        let reviews: Vec<Value> = selected
            .iter()
            .enumerate()
            .map(|(i, (author, rating, text))| {
                json!({
                    "author_name": author,
                    "rating": rating,
                    "text": text,
                    "relative_time_description": format!("{} weeks ago", i + 1),
                })
            })
            .collect();

        Ok(json!({
            "place_id": args.place_id,
            "reviews": reviews,
            "rating_stats": {
                "average": (average * 10.0).round() / 10.0,
                "count": picked.len(),
                "distribution": distribution,
            },
            "sentiment": analyze_sentiment(&texts),
        }))
    }
}
