//! Preference Model
//!
//! Accumulates interpretive defaults (which country column, which date column,
//! ranking metric, net vs gross revenue, result limit, time granularity) from the
//! user's own wording, so an answered question is not asked again.
//!
//! Resolution is a declarative rule table. Each field owns a rule group evaluated
//! against the lowercased text; a group either keeps its first match or lets the
//! last match win. Groups are independent of each other.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref TOP_N: Regex = Regex::new(r"(?i)top\s*(\d+)").expect("valid top-n pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountryField {
    ShipCountry,
    CustomerCountry,
}

impl CountryField {
    pub fn column(&self) -> &'static str {
        match self {
            CountryField::ShipCountry => "Orders.ShipCountry",
            CountryField::CustomerCountry => "Customers.Country",
        }
    }

    pub fn meaning(&self) -> &'static str {
        match self {
            CountryField::ShipCountry => "shipping destination",
            CountryField::CustomerCountry => "customer's registered country",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateField {
    OrderDate,
    ShippedDate,
}

impl DateField {
    pub fn column(&self) -> &'static str {
        match self {
            DateField::OrderDate => "OrderDate",
            DateField::ShippedDate => "ShippedDate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Revenue,
    Quantity,
    Orders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeGranularity {
    Month,
    Quarter,
    Year,
}

impl TimeGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGranularity::Month => "month",
            TimeGranularity::Quarter => "quarter",
            TimeGranularity::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Resolution {
    Country(CountryField),
    Date(DateField),
    Metric(Metric),
    NetRevenue(bool),
    Granularity(TimeGranularity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precedence {
    FirstMatch,
    LastMatch,
}

struct Rule {
    when: fn(&str) -> bool,
    then: Resolution,
}

struct RuleGroup {
    precedence: Precedence,
    rules: &'static [Rule],
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

static RULE_GROUPS: &[RuleGroup] = &[
    RuleGroup {
        precedence: Precedence::FirstMatch,
        rules: &[
            Rule {
                when: |t| t.contains("ship") && t.contains("country"),
                then: Resolution::Country(CountryField::ShipCountry),
            },
            Rule {
                when: |t| t.contains("customer") && t.contains("country"),
                then: Resolution::Country(CountryField::CustomerCountry),
            },
        ],
    },
    RuleGroup {
        precedence: Precedence::LastMatch,
        rules: &[
            Rule {
                when: |t| t.contains("orderdate"),
                then: Resolution::Date(DateField::OrderDate),
            },
            Rule {
                when: |t| contains_any(t, &["shippeddate", "ship date"]),
                then: Resolution::Date(DateField::ShippedDate),
            },
        ],
    },
    RuleGroup {
        precedence: Precedence::LastMatch,
        rules: &[
            Rule {
                when: |t| t.contains("revenue"),
                then: Resolution::Metric(Metric::Revenue),
            },
            Rule {
                when: |t| t.contains("quantity"),
                then: Resolution::Metric(Metric::Quantity),
            },
            Rule {
                when: |t| contains_any(t, &["orders", "order count"]),
                then: Resolution::Metric(Metric::Orders),
            },
        ],
    },
    // Net/gross is only read from a turn that talks about revenue.
    RuleGroup {
        precedence: Precedence::LastMatch,
        rules: &[
            Rule {
                when: |t| t.contains("revenue") && contains_any(t, &["net", "discount"]),
                then: Resolution::NetRevenue(true),
            },
            Rule {
                when: |t| t.contains("revenue") && t.contains("gross"),
                then: Resolution::NetRevenue(false),
            },
        ],
    },
    RuleGroup {
        precedence: Precedence::FirstMatch,
        rules: &[
            Rule {
                when: |t| t.contains("month"),
                then: Resolution::Granularity(TimeGranularity::Month),
            },
            Rule {
                when: |t| contains_any(t, &["quarter", "q1", "q2", "q3", "q4"]),
                then: Resolution::Granularity(TimeGranularity::Quarter),
            },
            Rule {
                when: |t| t.contains("year"),
                then: Resolution::Granularity(TimeGranularity::Year),
            },
        ],
    },
];

/// Resolved interpretive choices for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceModel {
    pub country_field: Option<CountryField>,
    pub date_field: Option<DateField>,
    pub metric: Option<Metric>,
    /// `true` = net of discount, `false` = gross.
    pub net_revenue: Option<bool>,
    pub top_n: Option<u64>,
    pub time_granularity: Option<TimeGranularity>,
}

impl PreferenceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one user answer into the model. Fields the text says nothing about
    /// keep their current value.
    pub fn update(&mut self, answer: &str) {
        let text = answer.to_lowercase();

        for group in RULE_GROUPS {
            let mut matching = group.rules.iter().filter(|rule| (rule.when)(&text));
            let chosen = match group.precedence {
                Precedence::FirstMatch => matching.next(),
                Precedence::LastMatch => matching.last(),
            };
            if let Some(rule) = chosen {
                self.apply(rule.then);
            }
        }

        if let Some(n) = TOP_N
            .captures(&text)
            .map(|caps| caps[1].parse::<u64>().unwrap_or(u64::MAX))
            .filter(|n| *n > 0)
        {
            self.top_n = Some(n);
        }
    }

    fn apply(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Country(field) => self.country_field = Some(field),
            Resolution::Date(field) => self.date_field = Some(field),
            Resolution::Metric(metric) => self.metric = Some(metric),
            Resolution::NetRevenue(net) => self.net_revenue = Some(net),
            Resolution::Granularity(granularity) => self.time_granularity = Some(granularity),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Generation instructions for every resolved field, in a fixed order.
    pub fn hints(&self) -> Vec<String> {
        let mut hints = Vec::new();

        if let Some(country) = self.country_field {
            hints.push(format!(
                "Use {} ({}) as the country field.",
                country.column(),
                country.meaning()
            ));
        }

        if let Some(date) = self.date_field {
            hints.push(format!("Use {} for date filtering.", date.column()));
        }

        match self.metric {
            Some(Metric::Revenue) => hints.push(
                match self.net_revenue {
                    Some(true) => {
                        "Rank by net revenue: SUM(od.UnitPrice*od.Quantity*(1-od.Discount)) per line item."
                    }
                    Some(false) => "Rank by gross revenue: SUM(od.UnitPrice*od.Quantity).",
                    None => "Prefer revenue for ranking unless specified.",
                }
                .to_string(),
            ),
            Some(Metric::Quantity) => hints.push("Rank by total quantity sold.".to_string()),
            Some(Metric::Orders) => hints.push("Rank by number of orders.".to_string()),
            None => {}
        }

        if let Some(n) = self.top_n {
            hints.push(format!("Use LIMIT {}.", n));
        }

        if let Some(granularity) = self.time_granularity {
            hints.push(format!("Aggregate by {}.", granularity.as_str()));
        }

        hints
    }

    /// Hints joined for the generator prompt, or `"None"` when nothing is resolved.
    pub fn hint_block(&self) -> String {
        let hints = self.hints();
        if hints.is_empty() {
            "None".to_string()
        } else {
            hints.join("\n")
        }
    }
}
