//! Explicit state machines for deals, games, and transactions.
//!
//! Every allowed transition lives here; handlers and queries never compare
//! raw status strings. The enums serialize to the legacy wire strings so
//! existing clients keep working.

use serde::{Deserialize, Serialize};

/// Settlement currencies accepted on deals and transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Currency {
    #[serde(rename = "USDC")]
    #[sqlx(rename = "USDC")]
    Usdc,
    #[serde(rename = "USDT")]
    #[sqlx(rename = "USDT")]
    Usdt,
    #[serde(rename = "SOL")]
    #[sqlx(rename = "SOL")]
    Sol,
}

/// Currencies accepted on game stakes/rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum GameCurrency {
    #[serde(rename = "GOR")]
    #[sqlx(rename = "GOR")]
    Gor,
    #[serde(rename = "USDT")]
    #[sqlx(rename = "USDT")]
    Usdt,
    #[serde(rename = "SOL")]
    #[sqlx(rename = "SOL")]
    Sol,
}

/// Counterparty response state of a deal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum RequestStatus {
    #[serde(rename = "awaiting approval")]
    #[sqlx(rename = "awaiting approval")]
    AwaitingApproval,
    #[serde(rename = "accepted")]
    #[sqlx(rename = "accepted")]
    Accepted,
    #[serde(rename = "declined")]
    #[sqlx(rename = "declined")]
    Declined,
}

/// Progress state of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ProgressStatus {
    #[serde(rename = "awaiting approval")]
    #[sqlx(rename = "awaiting approval")]
    AwaitingApproval,
    #[serde(rename = "declined")]
    #[sqlx(rename = "declined")]
    Declined,
    #[serde(rename = "awaiting payment")]
    #[sqlx(rename = "awaiting payment")]
    AwaitingPayment,
    #[serde(rename = "in progress")]
    #[sqlx(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    #[sqlx(rename = "completed")]
    Completed,
    #[serde(rename = "dispute")]
    #[sqlx(rename = "dispute")]
    Dispute,
    #[serde(rename = "canceled")]
    #[sqlx(rename = "canceled")]
    Canceled,
}

impl ProgressStatus {
    /// The creator may cancel only before the counterparty has been paid into.
    pub const fn cancelable(self) -> bool {
        matches!(self, Self::AwaitingApproval | Self::AwaitingPayment)
    }

    /// Deletion is never allowed once a deal is in progress, completed, or
    /// disputed.
    pub const fn deletable(self) -> bool {
        matches!(
            self,
            Self::AwaitingApproval | Self::AwaitingPayment | Self::Declined | Self::Canceled
        )
    }
}

/// The counterparty's answer to a deal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestResponse {
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "declined")]
    Declined,
}

impl RequestResponse {
    pub const fn request_status(self) -> RequestStatus {
        match self {
            Self::Accepted => RequestStatus::Accepted,
            Self::Declined => RequestStatus::Declined,
        }
    }

    pub const fn progress_status(self) -> ProgressStatus {
        match self {
            Self::Accepted => ProgressStatus::AwaitingPayment,
            Self::Declined => ProgressStatus::Declined,
        }
    }
}

/// Lifecycle of a multiplayer game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum GameStatus {
    #[serde(rename = "pending")]
    #[sqlx(rename = "pending")]
    Pending,
    #[serde(rename = "ongoing")]
    #[sqlx(rename = "ongoing")]
    Ongoing,
    #[serde(rename = "ended")]
    #[sqlx(rename = "ended")]
    Ended,
}

impl GameStatus {
    /// pending -> ongoing -> ended; ended is terminal.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ongoing) | (Self::Ongoing, Self::Ended)
        )
    }

    /// Deletion only from pending/ended.
    pub const fn deletable(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    /// Detail edits only before the game starts.
    pub const fn editable(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// New players only before the game starts.
    pub const fn joinable(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Escrow state of a recorded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TransactionStatus {
    #[serde(rename = "escrow")]
    #[sqlx(rename = "escrow")]
    Escrow,
    #[serde(rename = "released")]
    #[sqlx(rename = "released")]
    Released,
}

/// Admin privilege tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum AdminRole {
    #[serde(rename = "super")]
    #[sqlx(rename = "super")]
    Super,
    #[serde(rename = "manager")]
    #[sqlx(rename = "manager")]
    Manager,
    #[serde(rename = "support")]
    #[sqlx(rename = "support")]
    Support,
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cancel_allowed_only_before_payment() {
        assert!(ProgressStatus::AwaitingApproval.cancelable());
        assert!(ProgressStatus::AwaitingPayment.cancelable());
        assert!(!ProgressStatus::InProgress.cancelable());
        assert!(!ProgressStatus::Completed.cancelable());
        assert!(!ProgressStatus::Dispute.cancelable());
        assert!(!ProgressStatus::Canceled.cancelable());
    }

    #[test]
    fn delete_never_allowed_while_active() {
        assert!(ProgressStatus::Declined.deletable());
        assert!(ProgressStatus::Canceled.deletable());
        assert!(!ProgressStatus::InProgress.deletable());
        assert!(!ProgressStatus::Dispute.deletable());
    }

    #[test]
    fn accept_moves_progress_to_awaiting_payment() {
        assert_eq!(
            RequestResponse::Accepted.progress_status(),
            ProgressStatus::AwaitingPayment
        );
        assert_eq!(
            RequestResponse::Declined.progress_status(),
            ProgressStatus::Declined
        );
    }

    #[test]
    fn game_lifecycle_is_linear() {
        assert!(GameStatus::Pending.can_transition_to(GameStatus::Ongoing));
        assert!(GameStatus::Ongoing.can_transition_to(GameStatus::Ended));
        assert!(!GameStatus::Pending.can_transition_to(GameStatus::Ended));
        assert!(!GameStatus::Ended.can_transition_to(GameStatus::Ongoing));
        assert!(!GameStatus::Ended.can_transition_to(GameStatus::Pending));
    }

    #[test]
    fn ongoing_games_cannot_be_deleted() {
        assert!(GameStatus::Pending.deletable());
        assert!(GameStatus::Ended.deletable());
        assert!(!GameStatus::Ongoing.deletable());
    }

    #[test]
    fn status_wire_strings_round_trip() {
        let s: ProgressStatus = serde_json::from_str("\"awaiting payment\"").unwrap();
        assert_eq!(s, ProgressStatus::AwaitingPayment);
        assert_eq!(
            serde_json::to_string(&ProgressStatus::InProgress).unwrap(),
            "\"in progress\""
        );
    }
}
