use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::models::AgentRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Flag(bool),
    Empty,
}

impl RawValue {
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(text) => text.trim().is_empty(),
            RawValue::Number(_) | RawValue::Flag(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            RawValue::Number(value) => value.to_string(),
            RawValue::Text(text) => text.trim().to_string(),
            RawValue::Flag(value) => value.to_string(),
            RawValue::Empty => String::new(),
        }
    }

    pub fn to_count(&self) -> u64 {
        match self {
            RawValue::Number(value) => non_negative(*value).trunc() as u64,
            RawValue::Text(text) => parse_count(text),
            RawValue::Flag(_) | RawValue::Empty => 0,
        }
    }

    pub fn to_percent(&self) -> f64 {
        match self {
            RawValue::Number(value) => non_negative(*value),
            RawValue::Text(text) => parse_percent(text),
            RawValue::Flag(_) | RawValue::Empty => 0.0,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(value.to_string())
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    cells: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: impl Into<String>, value: RawValue) {
        let header = header.into();
        match self.cells.iter_mut().find(|(existing, _)| *existing == header) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((header, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&RawValue> {
        self.cells
            .iter()
            .find(|(existing, _)| existing == header)
            .or_else(|| {
                let folded = fold_header(header);
                self.cells
                    .iter()
                    .find(|(existing, _)| fold_header(existing) == folded)
            })
            .map(|(_, value)| value)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(header, _)| header.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| value.is_blank())
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (header, value) in iter {
            record.insert(header, value);
        }
        record
    }
}

/// Lowercases a header and drops spacing and cosmetic punctuation.
/// `%`, `+`, `-` and `&` survive because they change a column's meaning.
pub fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '#' | '.' | ':' | '"' | '\''))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses a count cell. Thousands separators are ignored; fractions truncate.
pub fn parse_count(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .map(|value| non_negative(value).trunc() as u64)
        .unwrap_or(0)
}

pub fn parse_percent(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number.parse::<f64>().map(non_negative).unwrap_or(0.0)
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Week,
    Agent,
    FirstQuotes,
    SecondQuotes,
    Submitted,
    FreeLooked,
    PreLapseCases,
    CcPercent,
    FirstQuoteSmoker,
    SecondQuoteSmoker,
    Smoker,
    Preferred,
    Standard,
    Graded,
    Gi,
    IssuedPaidMinus,
    IssuedPaidPlus,
}

#[derive(Debug, Clone, Copy)]
enum Pick {
    First,
    Last,
}

#[derive(Debug, Clone, Copy)]
enum Strategy {
    Lookup {
        exact: &'static [&'static str],
        contains: &'static [&'static str],
    },
    Marker {
        tokens: &'static [&'static str],
        pick: Pick,
    },
    Literal(&'static [&'static str]),
}

const SMOKER: &[&str] = &["smoker"];
const PREFERRED: &[&str] = &["preferred"];
const STANDARD: &[&str] = &["standard"];
const GRADED: &[&str] = &["graded"];
const GI: &[&str] = &["gi%", "guaranteedissue"];

const ISSUED_PAID_MINUS: &[&str] = &[
    "issued&paid%-",
    "issuedandpaid%-",
    "issuedpaid%-",
    "i&p%-",
    "issued&paid-",
    "issued&paid%minus",
    "issuedandpaid%minus",
    "issued&paidminus",
    "issuedandpaidminus",
    "issuedpaidminus",
];

const ISSUED_PAID_PLUS: &[&str] = &[
    "issued&paid%+",
    "issuedandpaid%+",
    "issuedpaid%+",
    "i&p%+",
    "issued&paid+",
    "issued&paid%plus",
    "issuedandpaid%plus",
    "issued&paidplus",
    "issuedandpaidplus",
    "issuedpaidplus",
];

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Week,
        Field::Agent,
        Field::FirstQuotes,
        Field::SecondQuotes,
        Field::Submitted,
        Field::FreeLooked,
        Field::PreLapseCases,
        Field::CcPercent,
        Field::FirstQuoteSmoker,
        Field::SecondQuoteSmoker,
        Field::Smoker,
        Field::Preferred,
        Field::Standard,
        Field::Graded,
        Field::Gi,
        Field::IssuedPaidMinus,
        Field::IssuedPaidPlus,
    ];

    fn is_count(self) -> bool {
        matches!(
            self,
            Field::FirstQuotes
                | Field::SecondQuotes
                | Field::Submitted
                | Field::FreeLooked
                | Field::PreLapseCases
        )
    }

    fn strategy(self) -> Strategy {
        match self {
            Field::Week => Strategy::Lookup {
                exact: &["week", "weekof", "weekending", "weekstart", "wk", "period"],
                contains: &["week", "period"],
            },
            Field::Agent => Strategy::Lookup {
                exact: &["agent", "agentname", "agentid", "name", "rep", "producer"],
                contains: &["agent"],
            },
            Field::FirstQuotes => Strategy::Lookup {
                exact: &["1stquotes", "1stquote", "firstquotes", "firstquote", "quotes1st"],
                contains: &["1stquote", "firstquote"],
            },
            Field::SecondQuotes => Strategy::Lookup {
                exact: &["2ndquotes", "2ndquote", "secondquotes", "secondquote", "quotes2nd"],
                contains: &["2ndquote", "secondquote"],
            },
            Field::Submitted => Strategy::Lookup {
                exact: &["submitted", "submissions", "submits", "submittedapps", "apps"],
                contains: &["submit"],
            },
            Field::FreeLooked => Strategy::Lookup {
                exact: &["freelook", "freelooks", "freelooked", "freelookcancellations"],
                contains: &["freelook"],
            },
            Field::PreLapseCases => Strategy::Lookup {
                exact: &["prelapse", "prelapses", "prelapsecases", "pre-lapse", "pre-lapsecases"],
                contains: &["prelapse", "pre-lapse"],
            },
            Field::CcPercent => Strategy::Lookup {
                exact: &["cc%", "cc", "creditcard%", "creditcard"],
                contains: &["cc%", "creditcard"],
            },
            Field::FirstQuoteSmoker => Strategy::Marker {
                tokens: SMOKER,
                pick: Pick::First,
            },
            Field::SecondQuoteSmoker | Field::Smoker => Strategy::Marker {
                tokens: SMOKER,
                pick: Pick::Last,
            },
            Field::Preferred => Strategy::Marker {
                tokens: PREFERRED,
                pick: Pick::Last,
            },
            Field::Standard => Strategy::Marker {
                tokens: STANDARD,
                pick: Pick::Last,
            },
            Field::Graded => Strategy::Marker {
                tokens: GRADED,
                pick: Pick::Last,
            },
            Field::Gi => Strategy::Marker {
                tokens: GI,
                pick: Pick::Last,
            },
            Field::IssuedPaidMinus => Strategy::Literal(ISSUED_PAID_MINUS),
            Field::IssuedPaidPlus => Strategy::Literal(ISSUED_PAID_PLUS),
        }
    }

    fn resolve(self, folded: &[String]) -> Option<usize> {
        match self.strategy() {
            Strategy::Lookup { exact, contains } => exact
                .iter()
                .find_map(|candidate| folded.iter().position(|header| header == candidate))
                .or_else(|| {
                    contains.iter().find_map(|token| {
                        folded.iter().position(|header| {
                            header.contains(token) && !(self.is_count() && header.contains('%'))
                        })
                    })
                }),
            Strategy::Marker { tokens, pick } => {
                let mut hits = folded
                    .iter()
                    .enumerate()
                    .filter(|(_, header)| {
                        tokens.iter().any(|token| {
                            header.contains(token) || header.as_str() == token.trim_end_matches('%')
                        })
                    })
                    .map(|(index, _)| index);
                match pick {
                    Pick::First => hits.next(),
                    Pick::Last => hits.last(),
                }
            }
            Strategy::Literal(variants) => folded
                .iter()
                .position(|header| variants.contains(&header.as_str())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Self {
        let folded: Vec<String> = headers.iter().map(|header| fold_header(header)).collect();
        let columns = Field::ALL
            .into_iter()
            .filter_map(|field| field.resolve(&folded).map(|index| (field, index)))
            .collect();
        Self { columns }
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn header<'h>(&self, field: Field, headers: &'h [String]) -> Option<&'h str> {
        self.index(field)
            .and_then(|index| headers.get(index))
            .map(String::as_str)
    }

    fn cell<'r>(&self, row: &'r RawRecord, headers: &[String], field: Field) -> Option<&'r RawValue> {
        self.header(field, headers).and_then(|header| row.get(header))
    }

    pub fn apply(&self, row: &RawRecord, headers: &[String]) -> AgentRecord {
        let text = |field| {
            self.cell(row, headers, field)
                .map(RawValue::as_text)
                .unwrap_or_default()
        };
        let count = |field| self.cell(row, headers, field).map_or(0, RawValue::to_count);
        let percent = |field| {
            self.cell(row, headers, field)
                .map_or(0.0, RawValue::to_percent)
        };

        AgentRecord {
            week: text(Field::Week),
            agent: text(Field::Agent),
            first_quotes: count(Field::FirstQuotes),
            second_quotes: count(Field::SecondQuotes),
            submitted: count(Field::Submitted),
            free_looked: count(Field::FreeLooked),
            pre_lapse_cases: count(Field::PreLapseCases),
            first_quote_smoker_percent: percent(Field::FirstQuoteSmoker),
            second_quote_smoker_percent: percent(Field::SecondQuoteSmoker),
            smoker_percent: percent(Field::Smoker),
            preferred_percent: percent(Field::Preferred),
            standard_percent: percent(Field::Standard),
            graded_percent: percent(Field::Graded),
            gi_percent: percent(Field::Gi),
            cc_percent: percent(Field::CcPercent),
            issued_paid_minus: percent(Field::IssuedPaidMinus),
            issued_paid_plus: percent(Field::IssuedPaidPlus),
        }
    }
}

pub fn normalize(rows: &[RawRecord], headers: &[String]) -> Vec<AgentRecord> {
    let detected: Vec<String> = if headers.is_empty() {
        rows.first()
            .map(|row| row.headers().map(str::to_string).collect())
            .unwrap_or_default()
    } else {
        headers.to_vec()
    };

    let columns = ColumnMap::resolve(&detected);
    for field in Field::ALL {
        match columns.header(field, &detected) {
            Some(header) => debug!(?field, header, "resolved column"),
            None if matches!(field, Field::Week | Field::Agent | Field::Submitted) => {
                if !rows.is_empty() {
                    warn!(?field, "no header matched; field defaults for every row");
                }
            }
            None => debug!(?field, "no header matched"),
        }
    }

    let mut dropped = 0usize;
    let records: Vec<AgentRecord> = rows
        .iter()
        .filter_map(|row| {
            if row.is_blank() {
                dropped += 1;
                None
            } else {
                Some(columns.apply(row, &detected))
            }
        })
        .collect();

    info!(rows = rows.len(), records = records.len(), dropped, "normalized batch");
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn row(cells: &[(&str, &str)]) -> RawRecord {
        cells
            .iter()
            .map(|(header, value)| (*header, RawValue::from(*value)))
            .collect()
    }

    #[test]
    fn fold_header_strips_cosmetics_but_keeps_signs() {
        assert_eq!(fold_header("# 1st Quotes"), "1stquotes");
        assert_eq!(fold_header("first_quotes"), "firstquotes");
        assert_eq!(fold_header("Issued & Paid %-"), "issued&paid%-");
        assert_eq!(fold_header("Smoker %.1"), "smoker%1");
    }

    #[test]
    fn parses_percent_with_trailing_sign() {
        assert_eq!(parse_percent("42.5%"), 42.5);
        assert_eq!(parse_percent(" 42.5 % "), 42.5);
        assert_eq!(parse_percent("17"), 17.0);
        assert_eq!(parse_percent("n/a"), 0.0);
        assert_eq!(parse_percent("-3"), 0.0);
        assert_eq!(parse_percent("NaN"), 0.0);
    }

    #[test]
    fn parses_counts_defensively() {
        assert_eq!(parse_count("1,204"), 1204);
        assert_eq!(parse_count("12.9"), 12);
        assert_eq!(parse_count("-4"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("lots"), 0);
        assert_eq!(RawValue::Number(7.0).to_count(), 7);
        assert_eq!(RawValue::Number(-7.0).to_count(), 0);
    }

    #[test]
    fn exact_spellings_resolve_standard_export() {
        let headers = headers(&[
            "Week",
            "Agent",
            "# 1st Quotes",
            "# 2nd Quotes",
            "# Submitted",
            "# Free look",
            "Smoker %",
            "Preferred %",
            "Standard %",
            "Graded %",
            "GI %",
            "CC %",
        ]);
        let columns = ColumnMap::resolve(&headers);
        assert_eq!(columns.index(Field::Week), Some(0));
        assert_eq!(columns.index(Field::Agent), Some(1));
        assert_eq!(columns.index(Field::FirstQuotes), Some(2));
        assert_eq!(columns.index(Field::SecondQuotes), Some(3));
        assert_eq!(columns.index(Field::Submitted), Some(4));
        assert_eq!(columns.index(Field::FreeLooked), Some(5));
        assert_eq!(columns.index(Field::Smoker), Some(6));
        assert_eq!(columns.index(Field::FirstQuoteSmoker), Some(6));
        assert_eq!(columns.index(Field::SecondQuoteSmoker), Some(6));
        assert_eq!(columns.index(Field::Gi), Some(10));
        assert_eq!(columns.index(Field::CcPercent), Some(11));
        assert_eq!(columns.index(Field::IssuedPaidPlus), None);
    }

    #[test]
    fn substring_fallback_skips_percent_columns_for_counts() {
        let headers = headers(&["1st Quote Smoker %", "Total 1st Quotes Sent", "Agent Full Name"]);
        let columns = ColumnMap::resolve(&headers);
        assert_eq!(columns.index(Field::FirstQuotes), Some(1));
        assert_eq!(columns.index(Field::Agent), Some(2));
    }

    #[test]
    fn duplicate_smoker_columns_split_first_and_last() {
        let headers = headers(&["Agent", "Smoker %", "# 2nd Quotes", "Smoker %.1"]);
        let columns = ColumnMap::resolve(&headers);
        assert_eq!(columns.index(Field::FirstQuoteSmoker), Some(1));
        assert_eq!(columns.index(Field::SecondQuoteSmoker), Some(3));
        assert_eq!(columns.index(Field::Smoker), Some(3));
    }

    #[test]
    fn preferred_uses_last_occurring_header() {
        let headers = headers(&["Agent", "1st Quote Preferred %", "2nd Quote Preferred %"]);
        let rows = vec![row(&[
            ("Agent", "Dana"),
            ("1st Quote Preferred %", "35%"),
            ("2nd Quote Preferred %", "48%"),
        ])];
        let records = normalize(&rows, &headers);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].preferred_percent, 48.0);
    }

    #[test]
    fn issued_paid_columns_respect_sign() {
        let headers = headers(&["Agent", "Issued & Paid %+", "Issued & Paid %-"]);
        let rows = vec![row(&[
            ("Agent", "Dana"),
            ("Issued & Paid %+", "71%"),
            ("Issued & Paid %-", "12%"),
        ])];
        let records = normalize(&rows, &headers);
        assert_eq!(records[0].issued_paid_plus, 71.0);
        assert_eq!(records[0].issued_paid_minus, 12.0);
    }

    #[test]
    fn malformed_cells_default_to_zero() {
        let headers = headers(&["Week", "Agent", "# Submitted", "GI %"]);
        let rows = vec![row(&[
            ("Week", "3"),
            ("Agent", "Dana"),
            ("# Submitted", "twelve"),
            ("GI %", "--"),
        ])];
        let record = &normalize(&rows, &headers)[0];
        assert_eq!(record.week, "3");
        assert_eq!(record.submitted, 0);
        assert_eq!(record.gi_percent, 0.0);
        assert_eq!(record.first_quotes, 0);
    }

    #[test]
    fn blank_rows_are_dropped_and_agentless_rows_kept() {
        let headers = headers(&["Week", "Agent", "# Submitted"]);
        let rows = vec![
            row(&[("Week", ""), ("Agent", " "), ("# Submitted", "")]),
            row(&[("Week", "1"), ("Agent", ""), ("# Submitted", "4")]),
        ];
        let records = normalize(&rows, &headers);
        assert_eq!(records.len(), 1);
        assert!(!records[0].has_agent());
        assert_eq!(records[0].submitted, 4);
    }

    #[test]
    fn headers_fall_back_to_first_row_order() {
        let rows = vec![RawRecord::from_iter([
            ("agent_name", RawValue::from("Lee")),
            ("week", RawValue::Number(2.0)),
            ("submissions", RawValue::Number(11.0)),
        ])];
        let records = normalize(&rows, &[]);
        assert_eq!(records[0].agent, "Lee");
        assert_eq!(records[0].week, "2");
        assert_eq!(records[0].submitted, 11);
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        assert!(normalize(&[], &[]).is_empty());
    }

    #[test]
    fn raw_record_lookup_is_case_insensitive() {
        let record = row(&[("GI %", "12")]);
        assert_eq!(record.get("gi%"), Some(&RawValue::Text("12".to_string())));
        assert!(record.get("preferred").is_none());
    }
}
