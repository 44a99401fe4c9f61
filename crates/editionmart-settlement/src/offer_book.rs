//! Fixed-price offers.
//!
//! A seller escrows `quantity` units at `price_per_unit`. The first buyer to
//! pay at least the full price takes the whole lot; any overpayment is
//! credited back as a claim. The seller may withdraw an open offer at any
//! time.

use std::collections::HashMap;

use editionmart_escrow::{ClaimVault, Custody, Ledger, Lot};
use editionmart_types::{
    Address, Amount, Call, MarketError, MarketEvent, Offer, OfferId, OfferState, Result, TokenId,
    amount,
};

use crate::event_log::transfer_event;

/// All offers, keyed by token. Offer ids are per token, starting at 1.
#[derive(Debug, Default)]
pub struct OfferBook {
    offers: HashMap<TokenId, Vec<Offer>>,
}

fn index(id: OfferId) -> Option<usize> {
    usize::try_from(id.0).ok()?.checked_sub(1)
}

impl OfferBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an offer.
    pub fn get(&self, token_id: TokenId, offer_id: OfferId) -> Result<&Offer> {
        self.offers
            .get(&token_id)
            .and_then(|list| list.get(index(offer_id)?))
            .ok_or(MarketError::OfferNotFound { token_id, offer_id })
    }

    fn get_mut(&mut self, token_id: TokenId, offer_id: OfferId) -> Result<&mut Offer> {
        self.offers
            .get_mut(&token_id)
            .and_then(|list| list.get_mut(index(offer_id)?))
            .ok_or(MarketError::OfferNotFound { token_id, offer_id })
    }

    /// Ids of every offer ever listed on `token_id`.
    #[must_use]
    pub fn all_offers_on_token(&self, token_id: TokenId) -> Vec<OfferId> {
        self.offers
            .get(&token_id)
            .map(|list| list.iter().map(|o| o.offer_id).collect())
            .unwrap_or_default()
    }

    /// Number of offers still open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.offers
            .values()
            .flatten()
            .filter(|o| o.state == OfferState::Open)
            .count()
    }

    /// List `quantity` units at `price_per_unit` and escrow them.
    ///
    /// # Errors
    /// `InvalidQuantity`, `InvalidAmount`, `ArithmeticOverflow`,
    /// `InsufficientBalance`.
    #[allow(clippy::too_many_arguments)]
    pub fn offer(
        &mut self,
        call: &Call,
        token_id: TokenId,
        quantity: u64,
        price_per_unit: Amount,
        fee_percent: u8,
        ledger: &mut Ledger,
        custody: &mut Custody,
    ) -> Result<(OfferId, Vec<MarketEvent>)> {
        call.ensure_no_value()?;
        if quantity == 0 {
            return Err(MarketError::InvalidQuantity {
                reason: "offer of zero units".into(),
            });
        }
        let price = amount::ensure_whole(price_per_unit)?;
        if price.is_zero() {
            return Err(MarketError::InvalidAmount {
                amount: price,
                reason: "offer price must be positive".into(),
            });
        }
        // The lot must stay purchasable.
        amount::checked_total(price, quantity)?;

        let list = self.offers.entry(token_id).or_default();
        let offer_id = OfferId(list.len() as u64 + 1);

        let mv = custody.lock(ledger, Lot::Offer(token_id, offer_id), call.caller, quantity)?;

        list.push(Offer {
            offer_id,
            token_id,
            seller: call.caller,
            quantity,
            price_per_unit: price,
            fee_percent,
            state: OfferState::Open,
            created_at: call.now,
            buyer: None,
        });

        tracing::info!(
            token = %token_id,
            offer = %offer_id,
            seller = %call.caller,
            quantity,
            price = %price,
            fee_percent,
            "Offer listed"
        );

        Ok((
            offer_id,
            vec![
                transfer_event(custody.address(), &mv),
                MarketEvent::OfferCreated {
                    token_id,
                    offer_id,
                    seller: call.caller,
                    quantity,
                    price_per_unit: price,
                },
            ],
        ))
    }

    /// Buy a whole offer with the call's value.
    ///
    /// Credits the buyer's overpayment, the seller's share and the
    /// operator's fee as claims, then moves the units to the buyer.
    ///
    /// # Errors
    /// `OfferNotFound`, `OfferNotOpen`, `InvalidAmount`, `InsufficientFunds`,
    /// `ArithmeticOverflow`.
    #[allow(clippy::too_many_arguments)]
    pub fn accept_offer(
        &mut self,
        call: &Call,
        token_id: TokenId,
        offer_id: OfferId,
        operator: Address,
        ledger: &mut Ledger,
        custody: &mut Custody,
        claims: &mut ClaimVault,
    ) -> Result<Vec<MarketEvent>> {
        let offer = self.get(token_id, offer_id)?;
        offer.ensure_open()?;
        let payment = call.funds()?;
        let cost = offer.cost()?;
        if payment < cost {
            return Err(MarketError::InsufficientFunds {
                needed: cost,
                supplied: payment,
            });
        }
        let change = amount::checked_sub(payment, cost, "offer change")?;
        let (seller_share, fee) = amount::split_fee(cost, offer.fee_percent)?;
        let seller = offer.seller;
        let quantity = offer.quantity;

        let plan = claims.plan(&[(call.caller, change), (seller, seller_share), (operator, fee)])?;
        let moves = custody.release(ledger, Lot::Offer(token_id, offer_id), &[(call.caller, quantity)])?;
        let applied = claims.commit(plan);

        let offer = self.get_mut(token_id, offer_id)?;
        offer.state = OfferState::Filled;
        offer.buyer = Some(call.caller);

        tracing::info!(
            token = %token_id,
            offer = %offer_id,
            buyer = %call.caller,
            seller = %seller,
            quantity,
            cost = %cost,
            fee = %fee,
            change = %change,
            "Offer filled"
        );

        let mut events: Vec<MarketEvent> = moves
            .iter()
            .map(|mv| transfer_event(custody.address(), mv))
            .collect();
        events.extend(
            applied
                .into_iter()
                .map(|(claimant, increase_amount)| MarketEvent::ClaimIncreased {
                    claimant,
                    increase_amount,
                }),
        );
        events.push(MarketEvent::OfferFilled {
            token_id,
            offer_id,
            buyer: call.caller,
        });
        Ok(events)
    }

    /// Cancel an open offer and return the units to its seller.
    ///
    /// # Errors
    /// `OfferNotFound`, `NotSeller`, `OfferNotOpen`.
    pub fn withdraw_offer(
        &mut self,
        call: &Call,
        token_id: TokenId,
        offer_id: OfferId,
        ledger: &mut Ledger,
        custody: &mut Custody,
    ) -> Result<Vec<MarketEvent>> {
        call.ensure_no_value()?;
        let offer = self.get(token_id, offer_id)?;
        if offer.seller != call.caller {
            return Err(MarketError::NotSeller(call.caller));
        }
        offer.ensure_open()?;
        let quantity = offer.quantity;

        let moves = custody.release(ledger, Lot::Offer(token_id, offer_id), &[(call.caller, quantity)])?;
        self.get_mut(token_id, offer_id)?.state = OfferState::Withdrawn;

        tracing::info!(token = %token_id, offer = %offer_id, seller = %call.caller, "Offer withdrawn");

        let mut events: Vec<MarketEvent> = moves
            .iter()
            .map(|mv| transfer_event(custody.address(), mv))
            .collect();
        events.push(MarketEvent::OfferWithdrawn { token_id, offer_id });
        Ok(events)
    }
}
