//! Integrity service - ledger health checks
//!
//! Re-derives everything from the stored log and reports any record or
//! balance that breaks the ledger's invariants. Read-only; every check sees
//! the same snapshot, so it is safe to run while the ledger takes traffic.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::domain::result::Result;
use crate::domain::{Direction, LedgerEntry, UserId};
use crate::ports::LedgerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Error,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl CheckResult {
    fn from_findings(findings: Vec<serde_json::Value>, ok: &str, failed: impl FnOnce(usize) -> String) -> Self {
        if findings.is_empty() {
            Self {
                status: CheckStatus::Pass,
                message: ok.to_string(),
                details: None,
            }
        } else {
            Self {
                status: CheckStatus::Error,
                message: failed(findings.len()),
                details: Some(findings),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: IntegritySummary,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct IntegritySummary {
    pub passed: usize,
    pub errors: usize,
    pub users: i64,
    pub records: usize,
    pub total_supply: i128,
}

pub struct IntegrityService {
    store: Arc<dyn LedgerStore>,
}

impl IntegrityService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Run all checks
    pub fn run(&self) -> Result<IntegrityReport> {
        let snapshot = self.store.audit_snapshot()?;
        let entries = &snapshot.entries;
        let mut checks = BTreeMap::new();

        checks.insert("record_shape".to_string(), check_shapes(entries));
        checks.insert("transfer_pairs".to_string(), check_pairs(entries));

        let folded = fold_balances(entries);
        checks.insert("non_negative_balances".to_string(), check_non_negative(&folded));
        checks.insert(
            "derived_balances".to_string(),
            check_derivation(&folded, &snapshot.balances),
        );

        let topups: i128 = entries
            .iter()
            .filter(|e| e.direction == Direction::Credit && e.transfer_id.is_none())
            .map(|e| i128::from(e.amount))
            .sum();
        let total: i128 = folded.values().sum();
        checks.insert("conservation".to_string(), check_conservation(topups, total));

        let passed = checks.values().filter(|c| c.status == CheckStatus::Pass).count();
        let errors = checks.len() - passed;

        if errors > 0 {
            tracing::warn!(errors, "ledger integrity check failed");
        }

        Ok(IntegrityReport {
            checks,
            summary: IntegritySummary {
                passed,
                errors,
                users: snapshot.user_count,
                records: entries.len(),
                total_supply: topups,
            },
        })
    }

}

/// Per-user balances folded from the log, wide enough that no sum overflows
fn fold_balances(entries: &[LedgerEntry]) -> HashMap<UserId, i128> {
    let mut balances: HashMap<UserId, i128> = HashMap::new();
    for entry in entries {
        for user in entry.from_user.iter().chain(entry.to_user.iter()) {
            *balances.entry(user.clone()).or_default() += i128::from(entry.signed_amount_for(user));
        }
    }
    balances
}

/// The store's own balance query must agree with the folded log
fn check_derivation(folded: &HashMap<UserId, i128>, reported: &HashMap<UserId, i64>) -> CheckResult {
    let users: BTreeSet<&UserId> = folded.keys().chain(reported.keys()).collect();
    let findings = users
        .into_iter()
        .filter_map(|user| {
            let expected = folded.get(user).copied().unwrap_or(0);
            let stored = reported.get(user).copied();
            (stored.map(i128::from) != Some(expected)).then(|| {
                json!({"user_id": user, "folded": expected, "reported": stored})
            })
        })
        .collect();
    CheckResult::from_findings(findings, "Stored balances match the log", |n| {
        format!("{} user(s) have a balance that disagrees with the log", n)
    })
}

fn check_shapes(entries: &[LedgerEntry]) -> CheckResult {
    let findings = entries
        .iter()
        .filter(|e| !e.is_well_formed())
        .map(|e| json!({"transaction_id": e.id, "direction": e.direction}))
        .collect();
    CheckResult::from_findings(findings, "All records are well formed", |n| {
        format!("{} record(s) have the wrong parties for their direction", n)
    })
}

fn check_pairs(entries: &[LedgerEntry]) -> CheckResult {
    let mut groups: BTreeMap<&str, Vec<&LedgerEntry>> = BTreeMap::new();
    for entry in entries {
        if let Some(transfer_id) = entry.transfer_id.as_deref() {
            groups.entry(transfer_id).or_default().push(entry);
        }
    }

    let findings = groups
        .into_iter()
        .filter(|(_, halves)| {
            let debits: Vec<_> = halves.iter().filter(|e| e.direction == Direction::Debit).collect();
            let credits: Vec<_> = halves.iter().filter(|e| e.direction == Direction::Credit).collect();
            !(debits.len() == 1 && credits.len() == 1 && debits[0].amount == credits[0].amount)
        })
        .map(|(transfer_id, halves)| json!({"transfer_id": transfer_id, "records": halves.len()}))
        .collect();

    CheckResult::from_findings(findings, "Every transfer is a balanced pair", |n| {
        format!("{} transfer(s) are not one DEBIT and one equal CREDIT", n)
    })
}

fn check_non_negative(balances: &HashMap<UserId, i128>) -> CheckResult {
    let findings = balances
        .iter()
        .filter(|(_, balance)| **balance < 0)
        .map(|(user, balance)| json!({"user_id": user, "balance": balance}))
        .collect();
    CheckResult::from_findings(findings, "No balance is negative", |n| {
        format!("{} user(s) have a negative balance", n)
    })
}

fn check_conservation(topups: i128, total: i128) -> CheckResult {
    let findings = if topups == total {
        Vec::new()
    } else {
        vec![json!({"topups": topups, "sum_of_balances": total})]
    };
    CheckResult::from_findings(findings, "Sum of balances equals total topups", |_| {
        format!("Sum of balances {} differs from total topups {}", total, topups)
    })
}
