//! Ambiguity Detector
//!
//! Flags the decisions a question leaves open before SQL can be written safely.
//! Each flag is an independent predicate over the lowercased turn text and the
//! preferences resolved so far; a flag backed by a preference stays quiet once
//! that preference is known.

use crate::conversation::preferences::PreferenceModel;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref YEAR: Regex = Regex::new(r"\b20\d{2}\b").expect("valid year pattern");
    static ref TOP_WORD: Regex = Regex::new(r"\btop\b").expect("valid top pattern");
}

const PERIOD_WORDS: &[&str] = &["quarter", "q1", "q2", "q3", "q4", "month", "year"];
const METRIC_WORDS: &[&str] = &["revenue", "quantity", "orders", "sales"];
const REVENUE_QUALIFIERS: &[&str] = &["discount", "net", "gross"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityFlag {
    CountryFieldChoice,
    MissingYear,
    DateFieldChoice,
    MissingTopN,
    MissingMetric,
    NetVsGross,
    RegionVsCountry,
}

impl AmbiguityFlag {
    /// Every flag, in detection order.
    pub const ALL: [AmbiguityFlag; 7] = [
        AmbiguityFlag::CountryFieldChoice,
        AmbiguityFlag::MissingYear,
        AmbiguityFlag::DateFieldChoice,
        AmbiguityFlag::MissingTopN,
        AmbiguityFlag::MissingMetric,
        AmbiguityFlag::NetVsGross,
        AmbiguityFlag::RegionVsCountry,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            AmbiguityFlag::CountryFieldChoice => "country-field-choice",
            AmbiguityFlag::MissingYear => "missing-year",
            AmbiguityFlag::DateFieldChoice => "date-field-choice",
            AmbiguityFlag::MissingTopN => "missing-top-n",
            AmbiguityFlag::MissingMetric => "missing-metric",
            AmbiguityFlag::NetVsGross => "net-vs-gross",
            AmbiguityFlag::RegionVsCountry => "region-vs-country",
        }
    }

    /// Clarifying question asked for this flag. The wording is a stable contract.
    pub fn question(&self) -> &'static str {
        match self {
            AmbiguityFlag::CountryFieldChoice => {
                "Do you want shipping destination (Orders.ShipCountry) or the customer's country (Customers.Country)?"
            }
            AmbiguityFlag::MissingYear => "Which year should I use? (e.g., 2023 or 2024)",
            AmbiguityFlag::DateFieldChoice => "Should I filter by OrderDate or ShippedDate?",
            AmbiguityFlag::MissingTopN => "How many should I list? (Top 5, Top 10?)",
            AmbiguityFlag::MissingMetric => "Rank by revenue, quantity, or number of orders?",
            AmbiguityFlag::NetVsGross => "Revenue: net (after discount) or gross (before discount)?",
            AmbiguityFlag::RegionVsCountry => {
                "When you say region/market, do you mean countries or a regional grouping?"
            }
        }
    }

    fn raised(&self, text: &str, prefs: &PreferenceModel) -> bool {
        match self {
            AmbiguityFlag::CountryFieldChoice => {
                text.contains("country")
                    && contains_any(text, &["order", "ship"])
                    && prefs.country_field.is_none()
            }
            AmbiguityFlag::MissingYear => {
                contains_any(text, PERIOD_WORDS) && !YEAR.is_match(text)
            }
            AmbiguityFlag::DateFieldChoice => text.contains("date") && prefs.date_field.is_none(),
            AmbiguityFlag::MissingTopN => has_unquantified_top(text) && prefs.top_n.is_none(),
            AmbiguityFlag::MissingMetric => {
                contains_any(text, &["best", "top"])
                    && !contains_any(text, METRIC_WORDS)
                    && prefs.metric.is_none()
            }
            AmbiguityFlag::NetVsGross => {
                text.contains("revenue")
                    && prefs.net_revenue.is_none()
                    && !contains_any(text, REVENUE_QUALIFIERS)
            }
            // Re-asked whenever the phrasing recurs; no preference backs it.
            AmbiguityFlag::RegionVsCountry => contains_any(text, &["region", "market"]),
        }
    }
}

impl fmt::Display for AmbiguityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

/// True when some standalone "top" is not followed by a number.
fn has_unquantified_top(text: &str) -> bool {
    TOP_WORD.find_iter(text).any(|m| {
        !text[m.end()..]
            .trim_start()
            .starts_with(|c: char| c.is_ascii_digit())
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AmbiguityDetector;

impl AmbiguityDetector {
    pub fn new() -> Self {
        Self
    }

    /// Flags raised by `text` given what is already resolved, in detection order.
    pub fn detect(&self, text: &str, prefs: &PreferenceModel) -> Vec<AmbiguityFlag> {
        let lowered = text.to_lowercase();
        AmbiguityFlag::ALL
            .iter()
            .copied()
            .filter(|flag| flag.raised(&lowered, prefs))
            .collect()
    }

    pub fn questions(&self, flags: &[AmbiguityFlag]) -> Vec<String> {
        flags.iter().map(|flag| flag.question().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Vec<AmbiguityFlag> {
        AmbiguityDetector::new().detect(text, &PreferenceModel::new())
    }

    fn detect_after(answer: &str, text: &str) -> Vec<AmbiguityFlag> {
        let mut prefs = PreferenceModel::new();
        prefs.update(answer);
        AmbiguityDetector::new().detect(text, &prefs)
    }

    #[test]
    fn test_top_products_in_q2() {
        let flags = detect("Top products in Q2");
        assert!(flags.contains(&AmbiguityFlag::MissingYear));
        assert!(flags.contains(&AmbiguityFlag::MissingMetric));
        assert!(flags.contains(&AmbiguityFlag::MissingTopN));
        assert!(!flags.contains(&AmbiguityFlag::NetVsGross));
    }

    #[test]
    fn test_fully_specified_answer_has_no_flags() {
        let text = "Q2 2024 by revenue net after discount ShipCountry";
        assert!(detect_after(text, text).is_empty());
    }

    #[test]
    fn test_country_choice_needs_order_or_ship() {
        assert_eq!(detect("orders by country"), vec![AmbiguityFlag::CountryFieldChoice]);
        assert!(detect("customers per country").is_empty());
        assert!(detect_after("customer country", "orders by country").is_empty());
    }

    #[test]
    fn test_year_token_suppresses_missing_year() {
        assert!(detect("sales per month").contains(&AmbiguityFlag::MissingYear));
        assert!(!detect("sales per month in 2023").contains(&AmbiguityFlag::MissingYear));
        assert!(detect("sales per month in 1997").contains(&AmbiguityFlag::MissingYear));
    }

    #[test]
    fn test_missing_year_ignores_preferences() {
        assert!(detect_after("by quarter", "revenue net in Q3").contains(&AmbiguityFlag::MissingYear));
    }

    #[test]
    fn test_date_field_choice() {
        assert_eq!(detect("orders with a late date"), vec![AmbiguityFlag::DateFieldChoice]);
        assert!(detect_after("ShippedDate", "orders with a late date").is_empty());
    }

    #[test]
    fn test_top_followed_by_number_is_quantified() {
        assert!(!detect("top 5 customers by revenue gross").contains(&AmbiguityFlag::MissingTopN));
        assert!(!detect("top5 customers by quantity").contains(&AmbiguityFlag::MissingTopN));
        assert!(detect("top customers by quantity").contains(&AmbiguityFlag::MissingTopN));
        assert!(!detect("stop the orders").contains(&AmbiguityFlag::MissingTopN));
        assert!(detect_after("top 10", "top customers").iter().all(|f| *f != AmbiguityFlag::MissingTopN));
    }

    #[test]
    fn test_missing_metric() {
        assert!(detect("best employees").contains(&AmbiguityFlag::MissingMetric));
        assert!(!detect("best employees by sales").contains(&AmbiguityFlag::MissingMetric));
        assert!(!detect_after("by quantity", "best employees").contains(&AmbiguityFlag::MissingMetric));
    }

    #[test]
    fn test_net_vs_gross_and_missing_metric_are_independent() {
        let flags = detect("best revenue in Q2 2024");
        assert!(flags.contains(&AmbiguityFlag::NetVsGross));
        assert!(!flags.contains(&AmbiguityFlag::MissingMetric));
        assert!(!detect("gross revenue").contains(&AmbiguityFlag::NetVsGross));
        assert!(detect_after("gross revenue", "revenue by customer").is_empty());
    }

    #[test]
    fn test_region_is_always_reasked() {
        let mut prefs = PreferenceModel::new();
        prefs.update("ShipCountry, OrderDate, net revenue, top 5, by year");
        let detector = AmbiguityDetector::new();
        for text in ["sales by region", "best market in 2024", "Regional revenue net"] {
            assert!(detector.detect(text, &prefs).contains(&AmbiguityFlag::RegionVsCountry));
        }
    }

    #[test]
    fn test_flags_come_back_in_detection_order() {
        let flags = detect("top revenue by order country and date per region in Q1");
        assert_eq!(
            flags,
            vec![
                AmbiguityFlag::CountryFieldChoice,
                AmbiguityFlag::MissingYear,
                AmbiguityFlag::DateFieldChoice,
                AmbiguityFlag::MissingTopN,
                AmbiguityFlag::NetVsGross,
                AmbiguityFlag::RegionVsCountry,
            ]
        );
    }

    #[test]
    fn test_questions_follow_flag_order() {
        let detector = AmbiguityDetector::new();
        let questions =
            detector.questions(&[AmbiguityFlag::MissingMetric, AmbiguityFlag::MissingYear]);
        assert_eq!(
            questions,
            vec![
                "Rank by revenue, quantity, or number of orders?".to_string(),
                "Which year should I use? (e.g., 2023 or 2024)".to_string(),
            ]
        );
    }

    #[test]
    fn test_tags_are_kebab_case() {
        assert_eq!(AmbiguityFlag::MissingTopN.tag(), "missing-top-n");
        assert_eq!(
            serde_json::to_string(&AmbiguityFlag::RegionVsCountry).unwrap(),
            "\"region-vs-country\""
        );
    }
}
