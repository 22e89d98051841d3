//! Domain models for Sift

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A transaction as held in the client's cache of the displayed slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    /// Signed amount (negative for expenses)
    pub amount: f64,
    pub description: String,
    #[serde(default)]
    pub normalized_description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
    /// Set when the last categorization was a low-confidence guess
    #[serde(default, alias = "is_uncertain")]
    pub uncertain: bool,
}

/// Lightweight transaction returned as a similarity candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    #[serde(default)]
    pub normalized_description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl TransactionSummary {
    /// Text that wildcard patterns are evaluated against
    pub fn match_text(&self) -> &str {
        match self.normalized_description.as_deref() {
            Some(normalized) if !normalized.is_empty() => normalized,
            _ => &self.description,
        }
    }
}

/// A persisted pattern -> category mapping owned by the transaction service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub pattern: String,
    pub category_id: i64,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
}

/// Response body of `GET transactions/{id}/similar`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarResponse {
    #[serde(default)]
    pub similar: Vec<TransactionSummary>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub matching_rule: Option<Rule>,
}

/// Final statistics of a batch categorization job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizeStats {
    #[serde(default)]
    pub categorized: u64,
    #[serde(default)]
    pub rules_created: u64,
}

/// Raw response of `POST ai/categorize/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SingleCategorizeResponse {
    pub status: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub similar_updated: u64,
    #[serde(default)]
    pub suggested_category: Option<String>,
    #[serde(default)]
    pub suggested_subcategory: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Interpreted outcome of a single-transaction AI categorization
#[derive(Debug, Clone, PartialEq)]
pub enum SingleCategorizeOutcome {
    /// The transaction (and possibly similar ones) was categorized
    Categorized {
        category: String,
        subcategory: Option<String>,
        similar_updated: u64,
    },
    /// The service was unsure and stored a suggestion for review instead
    SuggestionCreated {
        suggested_category: String,
        suggested_subcategory: Option<String>,
    },
    Other { message: String },
}

impl From<SingleCategorizeResponse> for SingleCategorizeOutcome {
    fn from(response: SingleCategorizeResponse) -> Self {
        match response.status.as_str() {
            "ok" => Self::Categorized {
                category: response.category.unwrap_or_default(),
                subcategory: response.subcategory,
                similar_updated: response.similar_updated,
            },
            "suggestion_created" => Self::SuggestionCreated {
                suggested_category: response.suggested_category.unwrap_or_default(),
                suggested_subcategory: response.suggested_subcategory,
            },
            other => Self::Other {
                message: response
                    .message
                    .unwrap_or_else(|| format!("Categorization returned status '{}'", other)),
            },
        }
    }
}

impl SingleCategorizeOutcome {
    /// Whether transactions beyond the requested one were changed server-side
    pub fn touched_others(&self) -> bool {
        matches!(self, Self::Categorized { similar_updated, .. } if *similar_updated > 0)
    }

    pub fn notification(&self) -> Notification {
        match self {
            Self::Categorized {
                category,
                subcategory,
                similar_updated,
            } => {
                let target = match subcategory {
                    Some(sub) => format!("{} / {}", category, sub),
                    None => category.clone(),
                };
                if *similar_updated > 0 {
                    Notification::Success(format!(
                        "Categorized as {} (also updated {} similar transactions)",
                        target, similar_updated
                    ))
                } else {
                    Notification::Success(format!("Categorized as {}", target))
                }
            }
            Self::SuggestionCreated {
                suggested_category,
                suggested_subcategory,
            } => {
                let target = match suggested_subcategory {
                    Some(sub) => format!("{} / {}", suggested_category, sub),
                    None => suggested_category.clone(),
                };
                Notification::Info(format!("Suggested {} (pending review)", target))
            }
            Self::Other { message } => Notification::Error(message.clone()),
        }
    }
}

/// User-facing message produced by a primary action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Info(String),
    Error(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Info(m) | Self::Error(m) => m,
        }
    }

    pub fn level(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Info(_) => "info",
            Self::Error(_) => "error",
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_text_prefers_normalized() {
        let mut summary = TransactionSummary {
            id: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            amount: -12.5,
            description: "AMZN MKTP US*2K4".to_string(),
            normalized_description: Some("AMZN MKTP".to_string()),
            category_id: None,
        };
        assert_eq!(summary.match_text(), "AMZN MKTP");

        summary.normalized_description = Some(String::new());
        assert_eq!(summary.match_text(), "AMZN MKTP US*2K4");
    }

    #[test]
    fn test_single_categorize_status_mapping() {
        let ok: SingleCategorizeOutcome = serde_json::from_str::<SingleCategorizeResponse>(
            r#"{"status":"ok","category":"Food","subcategory":"Groceries","similar_updated":4}"#,
        )
        .unwrap()
        .into();
        assert!(ok.touched_others());
        assert_eq!(
            ok.notification().message(),
            "Categorized as Food / Groceries (also updated 4 similar transactions)"
        );

        let suggestion: SingleCategorizeOutcome = serde_json::from_str::<SingleCategorizeResponse>(
            r#"{"status":"suggestion_created","suggested_category":"Travel"}"#,
        )
        .unwrap()
        .into();
        assert_eq!(
            suggestion,
            SingleCategorizeOutcome::SuggestionCreated {
                suggested_category: "Travel".to_string(),
                suggested_subcategory: None,
            }
        );
        assert_eq!(suggestion.notification().level(), "info");

        let other: SingleCategorizeOutcome = serde_json::from_str::<SingleCategorizeResponse>(
            r#"{"status":"no_match","message":"No confident category"}"#,
        )
        .unwrap()
        .into();
        assert_eq!(
            other.notification(),
            Notification::Error("No confident category".to_string())
        );
    }

    #[test]
    fn test_transaction_uncertain_alias() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id":7,"date":"2024-02-01","amount":-3.0,"description":"COFFEE","is_uncertain":true}"#,
        )
        .unwrap();
        assert!(tx.uncertain);
        assert_eq!(tx.category_id, None);
    }
}
