//! Document status machine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::half_minor_unit;
use super::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Viewed,
    Approved,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Viewed => "viewed",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Partial => "partial",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
            DocumentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DocumentStatus::Draft),
            "sent" => Some(DocumentStatus::Sent),
            "viewed" => Some(DocumentStatus::Viewed),
            "approved" => Some(DocumentStatus::Approved),
            "partial" => Some(DocumentStatus::Partial),
            "paid" => Some(DocumentStatus::Paid),
            "overdue" => Some(DocumentStatus::Overdue),
            "cancelled" => Some(DocumentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Paid | DocumentStatus::Cancelled)
    }

    /// States from which a payment may be recorded.
    pub fn accepts_payment(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Sent
                | DocumentStatus::Viewed
                | DocumentStatus::Approved
                | DocumentStatus::Partial
                | DocumentStatus::Overdue
        )
    }

    /// Still owed money: counted as open on the dashboard.
    pub fn is_open(&self) -> bool {
        self.accepts_payment()
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-triggered transitions. Payments go through [`settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAction {
    Send,
    MarkViewed,
    Approve,
    MarkOverdue,
    Cancel,
}

impl DocumentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentAction::Send => "send",
            DocumentAction::MarkViewed => "mark_viewed",
            DocumentAction::Approve => "approve",
            DocumentAction::MarkOverdue => "mark_overdue",
            DocumentAction::Cancel => "cancel",
        }
    }
}

fn illegal(current: DocumentStatus, action: DocumentAction) -> LedgerError {
    LedgerError::validation(
        "status",
        format!("cannot {} a document that is {}", action.as_str(), current),
    )
}

/// Next status for `action`, or a validation error when the transition is not
/// allowed. `item_count` guards sending an empty draft.
pub fn apply_action(
    current: DocumentStatus,
    action: DocumentAction,
    item_count: usize,
) -> Result<DocumentStatus, LedgerError> {
    use DocumentStatus::*;

    let next = match (action, current) {
        (DocumentAction::Send, Draft) => {
            if item_count == 0 {
                return Err(LedgerError::validation(
                    "items",
                    "a document without items cannot be sent",
                ));
            }
            Sent
        }
        (DocumentAction::MarkViewed, Sent) => Viewed,
        (DocumentAction::Approve, Sent | Viewed) => Approved,
        (DocumentAction::MarkOverdue, Sent | Viewed | Approved | Partial) => Overdue,
        (DocumentAction::Cancel, s) if !s.is_terminal() => Cancelled,
        _ => return Err(illegal(current, action)),
    };
    Ok(next)
}

/// Classify a document after a payment.
///
/// `paid_total` is the sum of all transactions linked to the document,
/// including the one being recorded.
pub fn settle(
    current: DocumentStatus,
    document_amount: Decimal,
    paid_total: Decimal,
    precision: u32,
) -> Result<DocumentStatus, LedgerError> {
    if !current.accepts_payment() {
        return Err(LedgerError::validation(
            "status",
            format!("cannot record a payment on a document that is {}", current),
        ));
    }
    if paid_total <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "amount",
            "payment amount must be greater than zero",
        ));
    }

    let tolerance = half_minor_unit(precision);
    if paid_total > document_amount + tolerance {
        return Err(LedgerError::validation(
            "amount",
            format!(
                "payments of {} exceed the document amount {}",
                paid_total, document_amount
            ),
        ));
    }

    if paid_total >= document_amount - tolerance {
        Ok(DocumentStatus::Paid)
    } else {
        Ok(DocumentStatus::Partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use DocumentStatus::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const ALL: [DocumentStatus; 8] = [
        Draft, Sent, Viewed, Approved, Partial, Paid, Overdue, Cancelled,
    ];

    #[test]
    fn status_strings_round_trip() {
        for status in ALL {
            assert_eq!(DocumentStatus::from_string(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::from_string("unknown"), None);
    }

    #[test]
    fn sending_an_empty_draft_is_rejected() {
        let err = apply_action(Draft, DocumentAction::Send, 0).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "items"));
        assert_eq!(apply_action(Draft, DocumentAction::Send, 1).unwrap(), Sent);
    }

    #[test]
    fn forward_transitions() {
        assert_eq!(apply_action(Sent, DocumentAction::MarkViewed, 1).unwrap(), Viewed);
        assert_eq!(apply_action(Viewed, DocumentAction::Approve, 1).unwrap(), Approved);
        assert_eq!(apply_action(Partial, DocumentAction::MarkOverdue, 1).unwrap(), Overdue);
        assert_eq!(apply_action(Approved, DocumentAction::MarkOverdue, 1).unwrap(), Overdue);
    }

    #[test]
    fn transitions_never_go_backwards() {
        assert!(apply_action(Viewed, DocumentAction::Send, 1).is_err());
        assert!(apply_action(Overdue, DocumentAction::MarkViewed, 1).is_err());
        assert!(apply_action(Draft, DocumentAction::Approve, 1).is_err());
        assert!(apply_action(Draft, DocumentAction::MarkOverdue, 1).is_err());
    }

    #[test]
    fn terminal_states_reject_everything() {
        let actions = [
            DocumentAction::Send,
            DocumentAction::MarkViewed,
            DocumentAction::Approve,
            DocumentAction::MarkOverdue,
            DocumentAction::Cancel,
        ];
        for status in [Paid, Cancelled] {
            for action in actions {
                assert!(apply_action(status, action, 1).is_err());
            }
            assert!(settle(status, dec("10"), dec("10"), 2).is_err());
        }
    }

    #[test]
    fn any_open_state_can_be_cancelled() {
        for status in ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(apply_action(status, DocumentAction::Cancel, 0).unwrap(), Cancelled);
        }
    }

    #[test]
    fn full_payment_marks_paid() {
        assert_eq!(settle(Sent, dec("110.00"), dec("110.00"), 2).unwrap(), Paid);
        assert_eq!(settle(Overdue, dec("110.00"), dec("110.00"), 2).unwrap(), Paid);
    }

    #[test]
    fn short_payment_marks_partial() {
        assert_eq!(settle(Sent, dec("110.00"), dec("50.00"), 2).unwrap(), Partial);
        assert_eq!(settle(Partial, dec("110.00"), dec("109.99"), 2).unwrap(), Partial);
        assert_eq!(settle(Partial, dec("110.00"), dec("110.00"), 2).unwrap(), Paid);
    }

    #[test]
    fn payment_within_half_minor_unit_is_full() {
        assert_eq!(settle(Sent, dec("110.0049"), dec("110.00"), 2).unwrap(), Paid);
    }

    #[test]
    fn overpayment_and_zero_payment_are_rejected() {
        assert!(settle(Sent, dec("110.00"), dec("110.01"), 2).is_err());
        assert!(settle(Sent, dec("110.00"), Decimal::ZERO, 2).is_err());
        assert!(settle(Draft, dec("110.00"), dec("110.00"), 2).is_err());
    }
}
