//! Integration tests for rentals and the drain.
//!
//! Covers:
//! 1. Availability of rentals
//! 2. Loan creation, expiry and refund
//! 3. Automatic renewal from the loan balance
//! 4. Funding and defunding a loan
//! 5. Sell orders queued behind lent liquidity

mod common;

use common::{Harness, T0, eos, n, rex};
use rex_core::TimePointSec;
use rex_ledger::{Action, DrainReport, RexError, RexNotice};

/// Whale liquidity plus one CPU loan from bob to carol: payment 1 EOS,
/// renewal balance 0.5 EOS.
fn with_cpu_loan() -> Harness {
    let mut h = Harness::new();
    h.buy("whale", 1_000_000_0000);
    h.deposit("bob", 10_0000);
    let outcome = h.ok(Action::RentCpu {
        from: n("bob"),
        receiver: n("carol"),
        loan_payment: eos(1_0000),
        loan_fund: eos(5000),
    });
    assert_eq!(
        outcome.notices,
        vec![RexNotice::RentResult {
            rented_tokens: eos(49_9975)
        }]
    );
    h
}

fn sold_now(outcome: &rex_ledger::ActionOutcome) -> bool {
    outcome
        .notices
        .iter()
        .any(|notice| matches!(notice, RexNotice::SellResult { .. }))
}

// ============================================================================
// Phase 1: Availability
// ============================================================================

#[test]
fn rentals_need_a_pool() {
    let mut h = Harness::new();
    h.deposit("bob", 10_0000);
    let err = h.fail(Action::RentCpu {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(1_0000),
        loan_fund: eos(0),
    });
    assert!(matches!(err, RexError::Unavailable));
}

#[test]
fn rental_validation() {
    let mut h = Harness::new();
    h.buy("whale", 1_000_000_0000);
    h.deposit("bob", 10_0000);

    let err = h.fail(Action::RentNet {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(0),
        loan_fund: eos(0),
    });
    assert_eq!(err.to_string(), "must use positive asset amount");

    let err = h.fail(Action::RentNet {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(1_0000),
        loan_fund: eos(-1),
    });
    assert_eq!(err.to_string(), "must use positive asset amount");

    let err = h.fail(Action::RentNet {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(10_0000),
        loan_fund: eos(1),
    });
    assert_eq!(err.to_string(), "insufficient funds");

    let err = h.fail(Action::RentNet {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: rex(1_0000),
        loan_fund: eos(0),
    });
    assert!(matches!(err, RexError::SymbolMismatch { .. }));
}

#[test]
fn tiny_pool_rejects_unfavorable_price() {
    let mut h = Harness::new();
    // 0.0001 EOS of liquidity against a 20,000 EOS rent reserve.
    h.buy("alice", 1);
    h.deposit("bob", 1_0000);
    let err = h.fail(Action::RentCpu {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(1_0000),
        loan_fund: eos(0),
    });
    assert_eq!(err.to_string(), "loan price does not favor renting");
}

// ============================================================================
// Phase 2: Creation and expiry
// ============================================================================

#[test]
fn new_loan_books_pool_and_receiver() {
    let h = with_cpu_loan();
    let loan = h.state().cpu_loans.get(1).unwrap();
    assert_eq!(loan.from, n("bob"));
    assert_eq!(loan.receiver, n("carol"));
    assert_eq!(loan.payment, eos(1_0000));
    assert_eq!(loan.balance, eos(5000));
    assert_eq!(loan.total_staked, eos(49_9975));
    assert_eq!(
        loan.expiration,
        TimePointSec::from_secs(T0).plus_days(30)
    );

    let pool = h.pool();
    assert_eq!(pool.loan_num, 1);
    assert_eq!(pool.total_lent, eos(49_9975));
    assert_eq!(pool.total_rent.amount, 20_000_0000 + 1_0000);
    assert_eq!(h.host().resources(n("carol")).rented_cpu, 49_9975);
    assert_eq!(h.fund("bob"), 8_5000);
    assert_eq!(h.state().return_pool.as_ref().unwrap().proceeds, 1_0000);
}

#[test]
fn loan_numbers_are_shared_across_tables() {
    let mut h = with_cpu_loan();
    h.ok(Action::RentNet {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(1_0000),
        loan_fund: eos(0),
    });
    assert!(h.state().net_loans.get(2).is_some());
    assert_eq!(h.pool().loan_num, 2);
}

#[test]
fn expired_loan_closes_and_refunds() {
    let mut h = with_cpu_loan();

    h.at_day(29);
    let outcome = h.rexexec(10);
    assert_eq!(outcome.report, DrainReport::default());
    assert!(h.state().cpu_loans.get(1).is_some());

    h.at_day(31);
    let outcome = h.rexexec(10);
    assert_eq!(outcome.report.loans_closed, 1);
    assert_eq!(outcome.report.loans_renewed, 0);
    assert!(h.state().cpu_loans.is_empty());
    assert_eq!(h.fund("bob"), 9_0000);
    assert_eq!(h.host().resources(n("carol")).rented_cpu, 0);
    assert_eq!(h.pool().total_lent.amount, 0);
}

#[test]
fn zero_bound_drain_changes_nothing() {
    let mut h = with_cpu_loan();
    h.at_day(31);
    let before = h.state().clone();
    let outcome = h.rexexec(0);
    assert_eq!(outcome.report.processed(), 0);
    assert_eq!(h.state(), &before);
}

#[test]
fn user_actions_drain_expired_loans() {
    let mut h = with_cpu_loan();
    h.at_day(31);
    let outcome = h.ok(Action::Withdraw {
        owner: n("bob"),
        amount: eos(9_0000),
    });
    assert_eq!(outcome.report.loans_closed, 1);
    assert_eq!(h.fund("bob"), 0);
}

// ============================================================================
// Phase 3: Renewal
// ============================================================================

#[test]
fn loan_renews_while_balance_covers_payment() {
    let mut h = Harness::new();
    h.buy("whale", 1_000_000_0000);
    h.deposit("bob", 10_0000);
    h.ok(Action::RentNet {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(1_0000),
        loan_fund: eos(2_5000),
    });
    assert_eq!(h.fund("bob"), 6_5000);

    h.at_day(31);
    let outcome = h.rexexec(10);
    assert_eq!(outcome.report.loans_renewed, 1);
    let loan = h.state().net_loans.get(1).unwrap();
    assert_eq!(loan.balance, eos(1_5000));
    assert_eq!(loan.expiration, TimePointSec::from_secs(T0).plus_days(60));
    assert_eq!(
        h.host().resources(n("bob")).rented_net,
        loan.total_staked.amount
    );

    h.at_day(61);
    assert_eq!(h.rexexec(10).report.loans_renewed, 1);
    assert_eq!(h.state().net_loans.get(1).unwrap().balance, eos(5000));

    h.at_day(91);
    assert_eq!(h.rexexec(10).report.loans_closed, 1);
    assert!(h.state().net_loans.is_empty());
    assert_eq!(h.fund("bob"), 7_0000);
    assert_eq!(h.host().resources(n("bob")).rented_net, 0);
}

// ============================================================================
// Phase 4: Funding
// ============================================================================

#[test]
fn fund_and_defund_loan() {
    let mut h = with_cpu_loan();

    h.ok(Action::FundCpuLoan {
        from: n("bob"),
        loan_num: 1,
        payment: eos(1_0000),
    });
    assert_eq!(h.state().cpu_loans.get(1).unwrap().balance, eos(1_5000));
    assert_eq!(h.fund("bob"), 7_5000);

    let err = h.fail(Action::DefCpuLoan {
        from: n("bob"),
        loan_num: 1,
        amount: eos(2_0000),
    });
    assert_eq!(err.to_string(), "insufficient loan balance");

    h.ok(Action::DefCpuLoan {
        from: n("bob"),
        loan_num: 1,
        amount: eos(1_5000),
    });
    assert_eq!(h.state().cpu_loans.get(1).unwrap().balance, eos(0));
    assert_eq!(h.fund("bob"), 9_0000);
}

#[test]
fn loan_funding_checks_ownership_and_expiry() {
    let mut h = with_cpu_loan();
    h.deposit("carol", 5_0000);

    let err = h.fail(Action::FundCpuLoan {
        from: n("carol"),
        loan_num: 1,
        payment: eos(1_0000),
    });
    assert_eq!(err.to_string(), "user must be loan creator");

    let err = h.fail(Action::FundCpuLoan {
        from: n("bob"),
        loan_num: 99,
        payment: eos(1_0000),
    });
    assert_eq!(err.to_string(), "loan not found");

    // Loan 1 lives in the CPU table only.
    let err = h.fail(Action::FundNetLoan {
        from: n("bob"),
        loan_num: 1,
        payment: eos(1_0000),
    });
    assert_eq!(err.to_string(), "loan not found");

    let err = h.fail(Action::DefCpuLoan {
        from: n("bob"),
        loan_num: 1,
        amount: eos(0),
    });
    assert_eq!(err.to_string(), "must use positive asset amount");

    h.at_day(30);
    let err = h.fail(Action::FundCpuLoan {
        from: n("bob"),
        loan_num: 1,
        payment: eos(1_0000),
    });
    assert_eq!(err.to_string(), "loan has already expired");
}

// ============================================================================
// Phase 5: Queued sell orders
// ============================================================================

/// alice holds 900 EOS of shares and carol 200; bob rents 1000 EOS of the
/// 1100 in the pool.
fn lent_out() -> (Harness, i64, i64) {
    let mut h = Harness::new();
    let alice = h.buy("alice", 900_0000);
    let carol = h.buy("carol", 200_0000);
    h.ok(Action::SetRex { balance: eos(1_0000) });
    h.deposit("bob", 20_0000);
    let outcome = h.ok(Action::RentCpu {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(10_0000),
        loan_fund: eos(0),
    });
    assert_eq!(
        outcome.notices,
        vec![RexNotice::RentResult {
            rented_tokens: eos(1_000_0000)
        }]
    );
    assert_eq!(h.pool().total_unlent, eos(100_0000));
    (h, alice, carol)
}

#[test]
fn sells_queue_and_fill_in_order() {
    let (mut h, alice, carol) = lent_out();

    h.at_day(6);
    let outcome = h.ok(Action::SellRex {
        from: n("alice"),
        rex: rex(alice),
    });
    assert!(!sold_now(&outcome));
    let order = h.state().orders.get(n("alice")).unwrap();
    assert!(order.is_open);
    assert_eq!(order.rex_requested, rex(alice));

    h.at_day(7);
    let outcome = h.ok(Action::SellRex {
        from: n("carol"),
        rex: rex(carol),
    });
    assert!(!sold_now(&outcome));

    // Shares behind an open order cannot be moved to savings.
    let err = h.fail(Action::MvToSavings {
        owner: n("alice"),
        rex: rex(1),
    });
    assert_eq!(err.to_string(), "insufficient REX balance");

    h.at_day(31);
    let outcome = h.rexexec(1);
    assert_eq!(outcome.report.loans_closed, 1);
    assert_eq!(outcome.report.orders_filled, 1);
    let alice_proceeds = match outcome.notices.as_slice() {
        [RexNotice::OrderResult { owner, proceeds }] => {
            assert_eq!(*owner, n("alice"));
            proceeds.amount
        }
        other => panic!("unexpected notices {other:?}"),
    };
    // Rent paid by bob has been released into the pool.
    assert!(alice_proceeds > 900_0000);
    assert!(!h.state().orders.get(n("alice")).unwrap().is_open);
    assert!(h.state().orders.get(n("carol")).unwrap().is_open);

    let outcome = h.rexexec(1);
    assert_eq!(outcome.report.orders_filled, 1);
    assert_eq!(h.pool().total_rex.amount, 0);
    assert_eq!(h.pool().total_lendable.amount, 0);

    let err = h.fail(Action::CnclRexOrder { owner: n("alice") });
    assert_eq!(
        err.to_string(),
        "sellrex order has been filled and cannot be canceled"
    );

    // Any account action settles the filled order into the fund.
    h.ok(Action::Withdraw {
        owner: n("alice"),
        amount: eos(alice_proceeds),
    });
    assert!(h.state().orders.get(n("alice")).is_none());
    assert_eq!(h.shares("alice"), 0);
    assert_eq!(h.fund("alice"), 0);
    assert_eq!(h.balance("alice"), 9_100_0000 + alice_proceeds);
}

#[test]
fn sale_covered_by_unlent_fills_while_lent_out() {
    let (mut h, _, carol) = lent_out();
    h.at_day(6);
    h.rexexec(1);
    let unlent = h.pool().total_unlent.amount;
    let outcome = h.ok(Action::SellRex {
        from: n("carol"),
        rex: rex(carol / 2),
    });
    let proceeds = outcome
        .notices
        .iter()
        .find_map(|notice| match notice {
            RexNotice::SellResult { proceeds } => Some(proceeds.amount),
            _ => None,
        })
        .unwrap();
    assert!(proceeds >= 100_0000 && proceeds <= unlent, "{proceeds} of {unlent}");
    assert!(h.state().orders.get(n("carol")).is_none());
    assert_eq!(h.pool().total_lent, eos(1_000_0000));
    assert_eq!(h.shares("carol"), carol - carol / 2);
    h.assert_custody();
}

#[test]
fn rentals_stay_open_behind_queued_orders() {
    let (mut h, alice, _) = lent_out();
    h.at_day(6);
    h.ok(Action::SellRex {
        from: n("alice"),
        rex: rex(alice),
    });
    assert!(h.state().orders.get(n("alice")).unwrap().is_open);

    let outcome = h.ok(Action::RentCpu {
        from: n("bob"),
        receiver: n("bob"),
        loan_payment: eos(1_0000),
        loan_fund: eos(0),
    });
    assert!(outcome.notices.iter().any(|notice| matches!(
        notice,
        RexNotice::RentResult { rented_tokens } if rented_tokens.amount > 1_0000
    )));
    assert!(h.state().orders.get(n("alice")).unwrap().is_open);
    h.assert_custody();
}

#[test]
fn open_order_can_be_canceled() {
    let (mut h, alice, _) = lent_out();
    h.at_day(6);
    h.ok(Action::SellRex {
        from: n("alice"),
        rex: rex(alice / 2),
    });
    // A second sale adds to the open order.
    h.ok(Action::SellRex {
        from: n("alice"),
        rex: rex(alice / 4),
    });
    assert_eq!(
        h.state().orders.get(n("alice")).unwrap().rex_requested,
        rex(alice / 2 + alice / 4)
    );

    let err = h.fail(Action::SellRex {
        from: n("alice"),
        rex: rex(alice / 2),
    });
    assert_eq!(
        err.to_string(),
        "insufficient funds for current and scheduled orders"
    );

    h.ok(Action::CnclRexOrder { owner: n("alice") });
    assert!(h.state().orders.is_empty());
    assert_eq!(h.shares("alice"), alice);

    let err = h.fail(Action::CnclRexOrder { owner: n("alice") });
    assert_eq!(err.to_string(), "no sellrex order is scheduled");
}
