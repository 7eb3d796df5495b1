// src/schema/mod.rs

// --- Imports ---
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod canonical;

pub use canonical::{CanonicalBuilder, CanonicalReport, ReviewItem, ReviewReason};

// --- Core Enums ---

/// The three primary statements this crate locates and normalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    IncomeStatement,
    FinancialPosition,
    CashFlow,
}

impl StatementType {
    pub const ALL: [StatementType; 3] = [
        StatementType::IncomeStatement,
        StatementType::FinancialPosition,
        StatementType::CashFlow,
    ];

    /// Stable snake_case identifier, matching the serialized form.
    pub fn key(&self) -> &'static str {
        match self {
            StatementType::IncomeStatement => "income_statement",
            StatementType::FinancialPosition => "financial_position",
            StatementType::CashFlow => "cash_flow",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementType::IncomeStatement => "Income Statement",
            StatementType::FinancialPosition => "Statement of Financial Position",
            StatementType::CashFlow => "Statement of Cash Flows",
        };
        write!(f, "{}", name)
    }
}

/// Reporting entity a statement column belongs to. Bank statements
/// habitually show standalone ("Bank") and consolidated ("Group")
/// figures side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Bank,
    Group,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Bank => write!(f, "Bank"),
            Entity::Group => write!(f, "Group"),
        }
    }
}

/// Fiscal-year slot: Year1 is the most recent year in the header,
/// Year2 the comparative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearSlot {
    Year1,
    Year2,
}

impl fmt::Display for YearSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearSlot::Year1 => write!(f, "year1"),
            YearSlot::Year2 => write!(f, "year2"),
        }
    }
}

// --- Shared Patterns ---

/// Four-digit fiscal years as they appear in headers and ToC probes.
pub static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(20\d{2})\b").expect("Failed to compile YEAR_RE"));

// --- Statement Title Keywords ---
// Phrases that title a statement in a ToC line or page heading.
// Ordered most-specific first; matching is case-insensitive downstream.

const INCOME_TITLES: &[&str] = &[
    "consolidated income statement",
    "statement of profit or loss",
    "statement of profit and loss",
    "statement of comprehensive income",
    "income statement",
    "profit and loss account",
];

const POSITION_TITLES: &[&str] = &[
    "consolidated statement of financial position",
    "statement of financial position",
    "consolidated balance sheet",
    "balance sheet",
];

const CASH_FLOW_TITLES: &[&str] = &[
    "consolidated statement of cash flows",
    "statement of cash flows",
    "statement of cash flow",
    "cash flow statement",
];

pub fn title_keywords(statement: StatementType) -> &'static [&'static str] {
    match statement {
        StatementType::IncomeStatement => INCOME_TITLES,
        StatementType::FinancialPosition => POSITION_TITLES,
        StatementType::CashFlow => CASH_FLOW_TITLES,
    }
}

// --- Domain Keywords ---
// Line items characteristic of each statement's body, used to attribute
// a table-dense page to a statement type.

const INCOME_DOMAIN: &[&str] = &[
    "interest income",
    "interest expense",
    "net interest income",
    "fee and commission",
    "gross income",
    "operating income",
    "operating expenses",
    "personnel expenses",
    "profit before tax",
    "profit for the year",
    "earnings per share",
];

const POSITION_DOMAIN: &[&str] = &[
    "total assets",
    "total liabilities",
    "total equity",
    "loans and advances",
    "deposits from customers",
    "due to banks",
    "cash and cash equivalents",
    "stated capital",
    "retained earnings",
    "property, plant and equipment",
];

const CASH_FLOW_DOMAIN: &[&str] = &[
    "operating activities",
    "investing activities",
    "financing activities",
    "net cash",
    "cash and cash equivalents at the beginning",
    "cash and cash equivalents at the end",
    "interest received",
    "income tax paid",
];

pub fn domain_keywords(statement: StatementType) -> &'static [&'static str] {
    match statement {
        StatementType::IncomeStatement => INCOME_DOMAIN,
        StatementType::FinancialPosition => POSITION_DOMAIN,
        StatementType::CashFlow => CASH_FLOW_DOMAIN,
    }
}

// --- Canonical Fields & Synonyms ---
// One table per statement: (canonical key, reported-label synonyms).
// Synonyms are stored pre-normalized (lowercase, single spaces); the
// mapping engine normalizes incoming labels the same way.

pub type SynonymTable = &'static [(&'static str, &'static [&'static str])];

const INCOME_FIELDS: SynonymTable = &[
    ("Interest income", &["interest income", "interest revenue", "total interest income"]),
    ("Interest expenses", &["interest expenses", "interest expense", "total interest expenses"]),
    ("Net interest income", &["net interest income"]),
    ("Fee and commission income", &["fee and commission income", "fees and commission income", "fee income"]),
    ("Fee and commission expenses", &["fee and commission expenses", "fees and commission expenses", "fee expenses"]),
    ("Net fee and commission income", &["net fee and commission income", "net fees and commission income"]),
    ("Net trading income", &["net trading income", "net gains from trading", "net gains losses from trading", "trading income"]),
    ("Other operating income", &["other operating income", "other income", "net other operating income"]),
    ("Gross income", &["gross income", "total income"]),
    ("Total operating income", &["total operating income", "operating income"]),
    ("Impairment charges", &["impairment charges", "impairment for loans and other losses", "provision for credit losses", "impairment charges reversals"]),
    ("Net operating income", &["net operating income"]),
    ("Personnel expenses", &["personnel expenses", "staff costs", "personnel cost"]),
    ("Depreciation and amortisation", &["depreciation and amortisation", "depreciation and amortization", "depreciation of property plant and equipment"]),
    ("Other expenses", &["other expenses", "other operating expenses"]),
    ("Total operating expenses", &["total operating expenses", "operating expenses"]),
    ("Operating profit before taxes on financial services", &["operating profit before taxes on financial services", "operating profit before vat", "operating profit before value added tax"]),
    ("Taxes on financial services", &["taxes on financial services", "value added tax on financial services", "vat on financial services"]),
    ("Profit before tax", &["profit before tax", "profit before income tax", "profit before taxation"]),
    ("Income tax expenses", &["income tax expenses", "income tax expense", "taxation", "tax expense"]),
    ("Profit for the year", &["profit for the year", "profit after tax", "net profit for the year", "profit for the period"]),
    ("Basic earnings per share", &["basic earnings per share", "basic eps", "earnings per share basic"]),
];

const POSITION_FIELDS: SynonymTable = &[
    ("Cash and cash equivalents", &["cash and cash equivalents", "cash and short term funds"]),
    ("Balances with central banks", &["balances with central banks", "balances with central bank", "statutory deposit with central bank"]),
    ("Placements with banks", &["placements with banks", "placements with other banks"]),
    ("Derivative financial instruments", &["derivative financial instruments", "derivative assets"]),
    ("Financial assets at fair value through profit or loss", &["financial assets at fair value through profit or loss", "financial assets recognized through profit or loss", "financial assets fvtpl"]),
    ("Financial assets at amortised cost", &["financial assets at amortised cost", "financial assets at amortized cost"]),
    ("Loans and advances to customers", &["loans and advances to customers", "loans and advances", "loans to and receivables from customers", "net loans and advances"]),
    ("Financial assets at fair value through other comprehensive income", &["financial assets at fair value through other comprehensive income", "financial assets fvoci"]),
    ("Investment in subsidiaries", &["investment in subsidiaries", "investments in subsidiaries"]),
    ("Property, plant and equipment", &["property plant and equipment", "property and equipment"]),
    ("Intangible assets", &["intangible assets", "intangible assets and goodwill"]),
    ("Deferred tax assets", &["deferred tax assets", "deferred taxation"]),
    ("Other assets", &["other assets"]),
    ("Total assets", &["total assets"]),
    ("Due to banks", &["due to banks", "borrowings from banks"]),
    ("Deposits from customers", &["deposits from customers", "customer deposits", "due to customers", "deposits due to customers"]),
    ("Debt securities issued", &["debt securities issued", "debentures issued"]),
    ("Other borrowings", &["other borrowings", "borrowings"]),
    ("Current tax liabilities", &["current tax liabilities", "income tax payable"]),
    ("Deferred tax liabilities", &["deferred tax liabilities"]),
    ("Other liabilities", &["other liabilities"]),
    ("Subordinated term debts", &["subordinated term debts", "subordinated liabilities", "subordinated debentures"]),
    ("Total liabilities", &["total liabilities"]),
    ("Stated capital", &["stated capital", "share capital"]),
    ("Statutory reserve fund", &["statutory reserve fund", "statutory reserves"]),
    ("Retained earnings", &["retained earnings", "retained profits", "accumulated profits"]),
    ("Other reserves", &["other reserves"]),
    ("Total equity", &["total equity", "total shareholders funds", "shareholders funds", "total equity attributable to equity holders"]),
    ("Total liabilities and equity", &["total liabilities and equity", "total equity and liabilities"]),
];

const CASH_FLOW_FIELDS: SynonymTable = &[
    ("Cash flows from operating activities", &["cash flows from operating activities", "net cash generated from operating activities", "net cash from operating activities", "net cash flow from operating activities"]),
    ("Cash flows from investing activities", &["cash flows from investing activities", "net cash used in investing activities", "net cash flow from investing activities"]),
    ("Cash flows from financing activities", &["cash flows from financing activities", "net cash used in financing activities", "net cash flow from financing activities"]),
    ("Net change in cash and cash equivalents", &["net change in cash and cash equivalents", "net increase decrease in cash and cash equivalents", "net increase in cash and cash equivalents", "net movement in cash and cash equivalents"]),
    ("Cash and cash equivalents at the beginning of the year", &["cash and cash equivalents at the beginning of the year", "cash and cash equivalents at the beginning of the period", "cash and cash equivalents at 1 january"]),
    ("Cash and cash equivalents at the end of the year", &["cash and cash equivalents at the end of the year", "cash and cash equivalents at the end of the period", "cash and cash equivalents at 31 december"]),
    ("Interest received", &["interest received", "interest receipts"]),
    ("Interest paid", &["interest paid", "interest payments"]),
    ("Dividends received", &["dividends received", "dividend income received"]),
    ("Income tax paid", &["income tax paid", "taxes paid", "income taxes paid"]),
];

pub fn field_synonyms(statement: StatementType) -> SynonymTable {
    match statement {
        StatementType::IncomeStatement => INCOME_FIELDS,
        StatementType::FinancialPosition => POSITION_FIELDS,
        StatementType::CashFlow => CASH_FLOW_FIELDS,
    }
}

/// Canonical field keys for one statement, in presentation order.
pub fn canonical_fields(statement: StatementType) -> impl Iterator<Item = &'static str> {
    field_synonyms(statement).iter().map(|(key, _)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_type_serializes_as_snake_case() {
        let json = serde_json::to_string(&StatementType::FinancialPosition).unwrap();
        assert_eq!(json, "\"financial_position\"");
        assert_eq!(StatementType::CashFlow.key(), "cash_flow");
    }

    #[test]
    fn test_every_statement_has_titles_domain_and_fields() {
        for statement in StatementType::ALL {
            assert!(!title_keywords(statement).is_empty(), "No titles for {}", statement);
            assert!(!domain_keywords(statement).is_empty(), "No domain keywords for {}", statement);
            assert!(
                canonical_fields(statement).count() >= 10,
                "Suspiciously small field table for {}",
                statement
            );
        }
    }

    #[test]
    fn test_synonyms_are_stored_normalized() {
        for statement in StatementType::ALL {
            for (key, synonyms) in field_synonyms(statement) {
                for synonym in synonyms.iter() {
                    assert_eq!(
                        *synonym,
                        synonym.to_lowercase(),
                        "Synonym '{}' of '{}' is not lowercase",
                        synonym,
                        key
                    );
                    assert!(!synonym.contains("  "), "Synonym '{}' has doubled spaces", synonym);
                }
            }
        }
    }

    #[test]
    fn test_year_regex_matches_header_years() {
        let caps: Vec<&str> = YEAR_RE
            .find_iter("For the year ended 31 December 2023 (2022)")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(caps, vec!["2023", "2022"]);
    }
}
