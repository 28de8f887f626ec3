//! Deposit conversation - amount, then network, then proof of payment.
//!
//! Each user has at most one [`DepositFlow`] in progress. Transitions are plain
//! methods that consume the current state, so an event that does not fit the
//! current step is an `InvalidState` error instead of being silently ignored.

use crate::{
    config::WalletConfig,
    core::wallet::create_pending_deposit,
    entities::transaction,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::fmt;
use std::str::FromStr;

/// Chain a deposit is sent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// USDT on Tron
    Trc20,
    /// USDT on BNB Smart Chain
    Bep20,
}

impl Network {
    /// Both networks, in menu order.
    pub const ALL: [Self; 2] = [Self::Trc20, Self::Bep20];

    /// Receiving address configured for this network.
    #[must_use]
    pub fn address(self, wallet: &WalletConfig) -> &str {
        match self {
            Self::Trc20 => &wallet.trc20_address,
            Self::Bep20 => &wallet.bep20_address,
        }
    }

    /// Name with the chain it runs on.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Trc20 => "TRC20 (Tron)",
            Self::Bep20 => "BEP20 (BSC)",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trc20 => "TRC20",
            Self::Bep20 => "BEP20",
        })
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "TRC20" => Ok(Self::Trc20),
            "BEP20" => Ok(Self::Bep20),
            other => Err(Error::Validation {
                message: format!("Unknown network '{other}'"),
            }),
        }
    }
}

/// Where a user is in the deposit conversation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepositFlow {
    /// Waiting for an amount
    ChoosingAmount,
    /// Amount accepted, waiting for a network
    ChoosingNetwork {
        /// Amount in USDT
        amount: f64,
    },
    /// Waiting for the proof of payment
    AwaitingProof {
        /// Amount in USDT
        amount: f64,
        /// Network the user pays on
        network: Network,
    },
    /// Proof received and a pending deposit recorded
    Submitted {
        /// The pending deposit
        transaction_id: i64,
    },
    /// User gave up
    Cancelled,
}

impl DepositFlow {
    /// A fresh conversation.
    #[must_use]
    pub const fn start() -> Self {
        Self::ChoosingAmount
    }

    /// Whether the conversation is over.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Submitted { .. } | Self::Cancelled)
    }

    fn out_of_order(self, expected: &str) -> Error {
        Error::InvalidState {
            message: format!("Expected {expected}, but the deposit is at step {self:?}"),
        }
    }

    /// Accepts the deposit amount.
    ///
    /// # Errors
    /// `InvalidAmount` below the configured minimum, `InvalidState` when no
    /// amount is expected.
    pub fn choose_amount(self, amount: f64, wallet: &WalletConfig) -> Result<Self> {
        if self != Self::ChoosingAmount {
            return Err(self.out_of_order("an amount"));
        }
        if !amount.is_finite() || amount < wallet.min_deposit {
            return Err(Error::InvalidAmount { amount });
        }
        Ok(Self::ChoosingNetwork { amount })
    }

    /// Accepts the network.
    ///
    /// # Errors
    /// `InvalidState` when no network is expected.
    pub fn choose_network(self, network: Network) -> Result<Self> {
        match self {
            Self::ChoosingNetwork { amount } => Ok(Self::AwaitingProof { amount, network }),
            other => Err(other.out_of_order("a network")),
        }
    }

    /// Abandons the conversation.
    ///
    /// # Errors
    /// `InvalidState` when the conversation is already over.
    pub fn cancel(self) -> Result<Self> {
        if self.is_finished() {
            return Err(self.out_of_order("an open deposit"));
        }
        Ok(Self::Cancelled)
    }

    /// Records the pending deposit once the proof arrives.
    ///
    /// Returns the final state and the pending transaction. The description is
    /// `Deposit <amount> USDT via <network>`.
    ///
    /// # Errors
    /// `InvalidState` when no proof is expected, plus anything
    /// [`create_pending_deposit`] returns.
    pub async fn submit_proof(
        self,
        db: &DatabaseConnection,
        user_id: i64,
    ) -> Result<(Self, transaction::Model)> {
        let Self::AwaitingProof { amount, network } = self else {
            return Err(self.out_of_order("a proof of payment"));
        };

        let entry =
            create_pending_deposit(db, user_id, amount, format!("Deposit {amount} USDT via {network}"))
                .await?;
        Ok((
            Self::Submitted {
                transaction_id: entry.id,
            },
            entry,
        ))
    }
}

/// Accepts a proof of payment only when it is an image.
///
/// # Errors
/// `Validation` when the content type is missing or not `image/*`.
pub fn check_proof_image(content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(kind) if kind.trim().to_ascii_lowercase().starts_with("image/") => Ok(()),
        other => Err(Error::Validation {
            message: format!(
                "The proof of payment must be an image, got {}",
                other.unwrap_or("an unknown file type")
            ),
        }),
    }
}
