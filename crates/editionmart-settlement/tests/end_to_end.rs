//! End-to-end scenarios through the marketplace facade.
//!
//! These drive complete lifecycles (mint, list or auction, settle, claim)
//! and check balances, the notification stream, conservation and replay
//! after each one.

use chrono::{DateTime, Duration, Utc};
use editionmart_clearing::{allocate, verify_allocation_digest};
use editionmart_settlement::{AuctionTerms, Marketplace, SharedMarketplace, StateMirror};
use editionmart_types::*;
use rand::Rng;
use rust_decimal::Decimal;

const T: TokenId = TokenId(2);
const SELLER: u64 = 1;
const BUYER: u64 = 2;
const OPERATOR: u64 = 0xFE;
const CUSTODY: u64 = 0xC0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

/// Marketplace plus a fixed clock origin.
struct Harness {
    market: Marketplace,
    t0: DateTime<Utc>,
}

impl Harness {
    fn new(minted: u64) -> Self {
        init_tracing();
        let mut market = Marketplace::new(MarketConfig::new(addr(OPERATOR), addr(CUSTODY)))
            .expect("default config is valid");
        let t0 = Utc::now();
        market
            .mint(&Call::new(addr(OPERATOR), t0), addr(SELLER), T, minted)
            .expect("operator mints");
        Self { market, t0 }
    }

    fn at(&self, caller: u64, secs: i64) -> Call {
        Call::new(addr(caller), self.t0 + Duration::seconds(secs))
    }

    fn start(&mut self, quantity: u64, reserve: i64) -> AuctionId {
        let call = self.at(SELLER, 0);
        self.market
            .start_auction(
                &call,
                T,
                &AuctionTerms {
                    quantity,
                    reserve_price_per_unit: dec(reserve),
                    fee_override: None,
                    bid_window_secs: 120,
                    reveal_window_secs: 120,
                },
            )
            .expect("auction starts")
    }

    fn bid(&mut self, id: AuctionId, bidder: u64, qty: u64, price: i64, deposit: i64) -> BidId {
        let commit = compute_commitment(dec(price), &Nonce::from_u64(bidder), addr(bidder)).unwrap();
        let call = self.at(bidder, 1).with_value(dec(deposit));
        self.market
            .bid_on_auction(&call, T, id, qty, commit)
            .expect("bid accepted")
    }

    fn reveal(&mut self, id: AuctionId, bid: BidId, bidder: u64, price: i64, top_up: i64) -> Result<()> {
        let call = self.at(bidder, 121).with_value(dec(top_up));
        self.market
            .reveal_bid_on_auction(&call, T, id, bid, dec(price), &Nonce::from_u64(bidder))
    }

    fn finalize(&mut self, id: AuctionId) -> Result<()> {
        let call = self.at(99, 240);
        self.market.finalize_auction(&call, T, id)
    }

    fn check_invariants(&self) {
        self.market.verify_conservation().expect("conservation holds");
        let mirror = StateMirror::replay(self.market.events_since(0)).expect("log replays");
        for holder in [SELLER, BUYER, OPERATOR, CUSTODY]
            .into_iter()
            .chain(100..=110)
        {
            assert_eq!(
                mirror.balance_of(addr(holder), T),
                self.market.balance_of(addr(holder), T),
                "token balance of {holder} replays"
            );
            assert_eq!(
                mirror.claim_balance(addr(holder)),
                self.market.claim_balance(addr(holder)),
                "claim of {holder} replays"
            );
        }
        assert_eq!(mirror.total_supply(T), self.market.total_supply(T));
    }
}

// =============================================================================
// Auction: 10 bidders over 100 units, pay-your-bid
// =============================================================================
#[test]
fn ten_bidders_pay_their_bids() {
    let mut h = Harness::new(100);
    let id = h.start(100, 0);
    assert_eq!(h.market.balance_of(addr(SELLER), T), 0);
    assert_eq!(h.market.balance_of(addr(CUSTODY), T), 100);

    let bidder = |i: u64| 100 + i;
    let price = |i: u64| 21 - i as i64;
    let qty = |i: u64| 2 * i;
    let deposit = |i: u64| 40 * i as i64;
    let top_up = |i: u64| {
        let shortfall = price(i) * qty(i) as i64 - deposit(i);
        if shortfall <= 0 { 10 } else { shortfall }
    };

    let bids: Vec<BidId> = (1..=10)
        .map(|i| h.bid(id, bidder(i), qty(i), price(i), deposit(i)))
        .collect();
    assert_eq!(bids[0], BidId(0));
    assert_eq!(bids[9], BidId(9));
    h.check_invariants();

    for i in 1..=10u64 {
        h.reveal(id, bids[i as usize - 1], bidder(i), price(i), top_up(i))
            .expect("reveal accepted");
    }
    h.check_invariants();

    h.finalize(id).expect("finalize succeeds");
    h.check_invariants();

    let mut total = 0;
    for i in 1..=10u64 {
        let won = h.market.balance_of(addr(bidder(i)), T);
        let expected = if i < 10 { qty(i) } else { 10 };
        assert_eq!(won, expected, "bidder {i}");
        total += won;

        let paid = dec(price(i)) * Decimal::from(won);
        assert_eq!(
            h.market.claim_balance(addr(bidder(i))),
            dec(deposit(i) + top_up(i)) - paid,
            "bidder {i} is charged exactly price * allocation"
        );
    }
    assert_eq!(total, 100);
    assert_eq!(h.market.balance_of(addr(CUSTODY), T), 0);

    // Proceeds 1320 + 110 = 1430, fee 10%.
    assert_eq!(h.market.claim_balance(addr(SELLER)), dec(1287));
    assert_eq!(h.market.claim_balance(addr(OPERATOR)), dec(143));

    let auction = h.market.auction(T, id).unwrap();
    assert_eq!(auction.state, AuctionState::Finalized);
    assert_eq!(auction.quantity_allocated, 100);
    assert!(auction.bids.iter().all(|b| b.escrowed.is_zero()));
}

#[test]
fn finalized_digest_can_be_recomputed() {
    let mut h = Harness::new(10);
    let id = h.start(10, 5);
    let a = h.bid(id, 100, 4, 9, 40);
    let b = h.bid(id, 101, 8, 7, 80);
    h.reveal(id, a, 100, 9, 0).unwrap();
    h.reveal(id, b, 101, 7, 0).unwrap();
    h.finalize(id).unwrap();

    let digest = h
        .market
        .events_since(0)
        .iter()
        .find_map(|r| match &r.event {
            MarketEvent::AuctionFinalized {
                allocation_digest, ..
            } => Some(allocation_digest.clone()),
            _ => None,
        })
        .expect("AuctionFinalized emitted");

    let auction = h.market.auction(T, id).unwrap();
    let recomputed = allocate(
        &auction.bids,
        auction.quantity_offered,
        auction.reserve_price_per_unit,
    )
    .unwrap();
    assert!(verify_allocation_digest(T, id, &recomputed.lines, &digest));
    assert_eq!(h.market.balance_of(addr(100), T), 4);
    assert_eq!(h.market.balance_of(addr(101), T), 6);
}

#[test]
fn unrevealed_and_below_reserve_bids_are_refunded() {
    let mut h = Harness::new(20);
    let id = h.start(20, 10);
    let _silent = h.bid(id, 100, 5, 50, 50);
    let cheap = h.bid(id, 101, 5, 9, 50);
    h.reveal(id, cheap, 101, 9, 0).unwrap();
    h.finalize(id).unwrap();

    assert_eq!(h.market.claim_balance(addr(100)), dec(50));
    assert_eq!(h.market.claim_balance(addr(101)), dec(50));
    assert_eq!(h.market.balance_of(addr(SELLER), T), 20, "units return to seller");
    assert_eq!(h.market.claim_balance(addr(SELLER)), Decimal::ZERO);
    h.check_invariants();
}

#[test]
fn phase_gating_and_single_finalize() {
    let mut h = Harness::new(10);
    let id = h.start(10, 0);
    let b = h.bid(id, 100, 1, 10, 10);

    // Reveal before the bid deadline.
    let early = h.at(100, 119);
    assert!(matches!(
        h.market
            .reveal_bid_on_auction(&early, T, id, b, dec(10), &Nonce::from_u64(100)),
        Err(MarketError::DeadlineNotReached { .. })
    ));
    // Bid after the bid deadline.
    let late = h.at(100, 120).with_value(dec(10));
    assert!(matches!(
        h.market.bid_on_auction(&late, T, id, 1, CommitHash([0; 32])),
        Err(MarketError::AuctionClosed { .. })
    ));
    // Finalize before the reveal deadline.
    assert!(matches!(
        h.market.finalize_auction(&h.at(99, 239), T, id),
        Err(MarketError::DeadlineNotReached { .. })
    ));

    h.reveal(id, b, 100, 10, 0).unwrap();
    assert_eq!(
        h.reveal(id, b, 100, 10, 0).unwrap_err(),
        MarketError::AlreadyRevealed(b)
    );

    h.finalize(id).unwrap();
    let logged = h.market.event_log().len();
    assert_eq!(h.finalize(id).unwrap_err(), MarketError::AlreadyFinalized(id));
    assert_eq!(h.market.event_log().len(), logged, "second finalize has no effect");
    h.check_invariants();
}

#[test]
fn random_commitments_only_open_with_their_secret() {
    let mut rng = rand::thread_rng();
    for _ in 0..32 {
        let bidder = Address::random();
        let nonce = Nonce::random();
        let price = Decimal::from(rng.gen_range(1..=1_000_000u64));
        let commit = compute_commitment(price, &nonce, bidder).unwrap();
        assert!(verify_commitment(&commit, price, &nonce, bidder).unwrap());

        let other_price = price + Decimal::from(rng.gen_range(1..=1_000u64));
        assert!(!verify_commitment(&commit, other_price, &nonce, bidder).unwrap());
        assert!(!verify_commitment(&commit, price, &Nonce::random(), bidder).unwrap());
        assert!(!verify_commitment(&commit, price, &nonce, Address::random()).unwrap());
    }
}

// =============================================================================
// Offers
// =============================================================================
#[test]
fn offer_overpayment_becomes_claim() {
    let mut h = Harness::new(499);
    let id = h
        .market
        .offer(&h.at(SELLER, 0), T, 10, dec(100))
        .expect("offer listed");
    h.check_invariants();

    let pay = h.at(BUYER, 5).with_value(dec(1200));
    h.market.accept_offer(&pay, T, id).expect("offer accepted");

    assert_eq!(h.market.balance_of(addr(BUYER), T), 10);
    assert_eq!(h.market.balance_of(addr(SELLER), T), 489);
    assert_eq!(h.market.claim_balance(addr(BUYER)), dec(200));
    assert_eq!(h.market.claim_balance(addr(SELLER)), dec(900));
    assert_eq!(h.market.claim_balance(addr(OPERATOR)), dec(100));
    assert_eq!(
        h.market.offer_details(T, id).unwrap().state,
        OfferState::Filled
    );
    h.check_invariants();

    let paid = h.market.claim_withdrawal(&h.at(BUYER, 6)).unwrap();
    assert_eq!(paid, dec(200));
    assert_eq!(h.market.claim_balance(addr(BUYER)), Decimal::ZERO);
    assert_eq!(
        h.market.claim_withdrawal(&h.at(BUYER, 7)).unwrap_err(),
        MarketError::NothingToClaim(addr(BUYER))
    );

    let last = h.market.events_since(0).last().cloned().unwrap();
    assert_eq!(
        last.event,
        MarketEvent::ClaimWithdrawn {
            claimant: addr(BUYER),
            withdrawal_amount: dec(200)
        }
    );
    h.check_invariants();
}

#[test]
fn withdrawn_offer_restores_seller() {
    let mut h = Harness::new(50);
    let id = h.market.offer(&h.at(SELLER, 0), T, 50, dec(3)).unwrap();
    assert_eq!(
        h.market.withdraw_offer(&h.at(BUYER, 1), T, id).unwrap_err(),
        MarketError::NotSeller(addr(BUYER))
    );
    h.market.withdraw_offer(&h.at(SELLER, 1), T, id).unwrap();
    assert_eq!(h.market.balance_of(addr(SELLER), T), 50);
    assert!(matches!(
        h.market
            .accept_offer(&h.at(BUYER, 2).with_value(dec(150)), T, id),
        Err(MarketError::OfferNotOpen(_))
    ));
    assert_eq!(h.market.currency_received(), Decimal::ZERO, "rejected payment not counted");
    h.check_invariants();
}

#[test]
fn log_tails_from_offset_and_exports() {
    let mut h = Harness::new(10);
    let offset = h.market.event_log().len() as u64;
    h.market.offer(&h.at(SELLER, 0), T, 10, dec(7)).unwrap();

    let tail = h.market.events_since(offset);
    let names: Vec<&str> = tail.iter().map(|r| r.event.name()).collect();
    assert_eq!(names, vec!["TransferSingle", "OfferCreated"]);
    assert_eq!(tail[0].sequence, offset);

    let exported = h.market.event_log().to_json_lines().unwrap();
    let parsed = editionmart_settlement::EventLog::parse_json_lines(&exported).unwrap();
    assert_eq!(parsed, h.market.events_since(0));
    let mirror = StateMirror::replay(&parsed).unwrap();
    assert_eq!(mirror.balance_of(addr(CUSTODY), T), 10);
}

// =============================================================================
// Concurrency: one global lock, operations serialized
// =============================================================================
#[test]
fn concurrent_buyers_fill_an_offer_once() {
    let mut h = Harness::new(10);
    let id = h.market.offer(&h.at(SELLER, 0), T, 10, dec(10)).unwrap();
    let now = h.t0;
    let shared = SharedMarketplace::new(h.market);

    let outcomes: Vec<Result<()>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8u64)
            .map(|n| {
                let shared = shared.clone();
                s.spawn(move || {
                    let call = Call::new(addr(200 + n), now).with_value(dec(100));
                    shared.with(|m| m.accept_offer(&call, T, id))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("buyer thread"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == MarketError::OfferNotOpen(id))
    );
    shared
        .with(|m| {
            assert_eq!(m.currency_received(), dec(100));
            m.verify_conservation()
        })
        .unwrap();
}

#[test]
fn concurrent_finalize_runs_once() {
    let mut h = Harness::new(20);
    let id = h.start(20, 0);
    let b = h.bid(id, 100, 5, 10, 50);
    h.reveal(id, b, 100, 10, 0).unwrap();
    let now = h.t0 + Duration::seconds(240);
    let shared = SharedMarketplace::new(h.market);

    let outcomes: Vec<Result<()>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8u64)
            .map(|n| {
                let shared = shared.clone();
                s.spawn(move || {
                    let call = Call::new(addr(300 + n), now);
                    shared.with(|m| m.finalize_auction(&call, T, id))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("finalizer thread"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| **r == Err(MarketError::AlreadyFinalized(id)))
            .count(),
        7
    );
    shared
        .with(|m| {
            let finalized = m
                .events_since(0)
                .iter()
                .filter(|r| r.event.name() == "AuctionFinalized")
                .count();
            assert_eq!(finalized, 1);
            assert_eq!(m.balance_of(addr(100), T), 5);
            assert_eq!(m.balance_of(addr(SELLER), T), 15);
            assert_eq!(m.balance_of(addr(CUSTODY), T), 0);
            m.verify_conservation()
        })
        .unwrap();
}

// =============================================================================
// Identities that may not hold or receive tokens
// =============================================================================
#[test]
fn custody_address_cannot_list_escrowed_units() {
    let mut h = Harness::new(30);
    let id = h.market.offer(&h.at(SELLER, 0), T, 30, dec(5)).unwrap();
    let logged = h.market.event_log().len();

    assert_eq!(
        h.market.offer(&h.at(CUSTODY, 1), T, 30, dec(1)).unwrap_err(),
        MarketError::Unauthorized(addr(CUSTODY))
    );
    let terms = AuctionTerms {
        quantity: 30,
        reserve_price_per_unit: Decimal::ZERO,
        fee_override: None,
        bid_window_secs: 120,
        reveal_window_secs: 120,
    };
    assert_eq!(
        h.market.start_auction(&h.at(CUSTODY, 1), T, &terms).unwrap_err(),
        MarketError::Unauthorized(addr(CUSTODY))
    );
    assert_eq!(h.market.event_log().len(), logged, "rejected calls log nothing");

    // The seller's escrowed units are untouched.
    h.market.withdraw_offer(&h.at(SELLER, 2), T, id).unwrap();
    assert_eq!(h.market.balance_of(addr(SELLER), T), 30);
    h.check_invariants();
}

#[test]
fn mint_to_zero_address_rejected() {
    let mut h = Harness::new(10);
    let logged = h.market.event_log().len();
    assert_eq!(
        h.market
            .mint(&h.at(OPERATOR, 0), Address::ZERO, T, 5)
            .unwrap_err(),
        MarketError::Unauthorized(Address::ZERO)
    );
    assert_eq!(h.market.event_log().len(), logged);
    assert_eq!(h.market.total_supply(T), 10);
    h.check_invariants();
}
