//! Where every unit of each token currently sits.
//!
//! Outside of external credits and debits the grand total per token never
//! changes: free balances, order escrow, deal escrow and commission retained
//! by the exchange always add up to what was deposited.

use super::{Exchange, ExchangeError};
use crate::domain::{DealStatus, Decimal, EntryReason, TokenKind};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowSummary {
    pub free: BTreeMap<TokenKind, Decimal>,
    pub in_orders: BTreeMap<TokenKind, Decimal>,
    pub in_deals: BTreeMap<TokenKind, Decimal>,
    /// Commission from completed deals that was not credited to a platform account.
    pub retained_commission: BTreeMap<TokenKind, Decimal>,
}

fn add(map: &mut BTreeMap<TokenKind, Decimal>, token: TokenKind, amount: Decimal) {
    let entry = map.entry(token).or_insert_with(Decimal::zero);
    *entry = *entry + amount;
}

fn get(map: &BTreeMap<TokenKind, Decimal>, token: TokenKind) -> Decimal {
    map.get(&token).copied().unwrap_or_else(Decimal::zero)
}

impl EscrowSummary {
    /// Everything accounted for in `token`.
    pub fn total(&self, token: TokenKind) -> Decimal {
        get(&self.free, token)
            + get(&self.in_orders, token)
            + get(&self.in_deals, token)
            + get(&self.retained_commission, token)
    }
}

impl Exchange {
    /// Snapshot of free balances, escrow and retained commission per token.
    ///
    /// Reads are not taken under one transaction, so the snapshot is only
    /// exact while no other operation runs.
    pub async fn escrow_summary(&self) -> Result<EscrowSummary, ExchangeError> {
        let mut summary = EscrowSummary::default();

        for token in TokenKind::ALL {
            add(&mut summary.free, token, self.repo.total_supply(token).await?);
        }

        for order in self.repo.list_active_orders().await? {
            let (token, amount) = order.escrow_for(order.quantity);
            add(&mut summary.in_orders, token, amount);
        }

        for status in [DealStatus::Pending, DealStatus::Paid] {
            for deal in self.repo.list_deals_with_status(status).await? {
                let (token, amount) = deal.taker_escrow();
                add(&mut summary.in_deals, token, amount);
                let (token, amount) = deal.maker_escrow();
                add(&mut summary.in_deals, token, amount);
            }
        }

        for deal in self.repo.list_deals_with_status(DealStatus::Completed).await? {
            add(&mut summary.retained_commission, deal.payment_token(), deal.commission);
        }
        for token in TokenKind::ALL {
            let paid_out = self.repo.journal_total(EntryReason::Commission, token).await?;
            add(&mut summary.retained_commission, token, -paid_out);
        }

        debug!(?summary, "Computed escrow summary");
        Ok(summary)
    }
}
