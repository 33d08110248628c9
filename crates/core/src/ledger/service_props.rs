//! Property-based tests for ExpenseLedger.
//!
//! Random sequences of submit/approve/reject/post never overcommit a category
//! or the contingency pool, and rejected expenses never hold capacity.

use chrono::{Duration, TimeZone, Utc};
use eventiq_shared::types::{EventId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::service::ExpenseLedger;
use super::types::{ExpenseStatus, ExpenseSubmission};
use crate::approval::{Actor, ApprovalPolicy, ApprovalThresholds, Role};
use crate::budget::{AllocationRequest, BudgetConfiguration, BudgetService, CategoryAllocation};

const CATEGORIES: [&str; 3] = ["Venue", "Catering", "Marketing"];

#[derive(Debug, Clone)]
enum Op {
    Submit {
        category: usize,
        amount: Decimal,
        draw: bool,
        role: Role,
    },
    Approve(usize),
    Reject(usize),
    Post(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..CATEGORIES.len(), 1i64..800_000, any::<bool>(), prop_oneof![
            Just(Role::Volunteer),
            Just(Role::Organizer),
            Just(Role::Manager),
        ])
            .prop_map(|(category, cents, draw, role)| Op::Submit {
                category,
                amount: Decimal::new(cents, 2),
                draw,
                role,
            }),
        1 => (0usize..64).prop_map(Op::Approve),
        1 => (0usize..64).prop_map(Op::Reject),
        1 => (0usize..64).prop_map(Op::Post),
    ]
}

fn config() -> BudgetConfiguration {
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    BudgetService::create(
        EventId::new(),
        AllocationRequest {
            total_amount: dec!(20000),
            currency: "USD".to_string(),
            categories: vec![
                CategoryAllocation::new("Venue", dec!(30)),
                CategoryAllocation::new("Catering", dec!(20)),
                CategoryAllocation::new("Marketing", dec!(10)),
            ],
            contingency_percent: dec!(10),
            event_start: start,
            event_end: Some(start + Duration::days(5)),
        },
        UserId::new(),
        start,
    )
    .unwrap()
}

fn policy() -> ApprovalPolicy {
    ApprovalPolicy::new(
        ApprovalThresholds::new()
            .with(Role::Volunteer, dec!(100))
            .with(Role::Organizer, dec!(1000))
            .with(Role::Manager, dec!(5000)),
    )
}

fn run(ops: &[Op]) -> (BudgetConfiguration, ExpenseLedger) {
    let config = config();
    let policy = policy();
    let manager = Actor::new(UserId::new(), Role::Admin);
    let now = config.event_start;
    let mut ledger = ExpenseLedger::new();

    for op in ops {
        let ids: Vec<_> = ledger.records().iter().map(|r| r.id).collect();
        let pick = |i: usize| (!ids.is_empty()).then(|| ids[i % ids.len()]);
        // Failures are expected; only the invariants matter.
        let _ = match op {
            Op::Submit {
                category,
                amount,
                draw,
                role,
            } => {
                let mut submission =
                    ExpenseSubmission::new(CATEGORIES[*category], *amount, "vendor");
                submission.draw_contingency = *draw;
                ledger
                    .submit(&config, &policy, Actor::new(UserId::new(), *role), submission, now)
                    .map(|_| ())
            }
            Op::Approve(i) => match pick(*i) {
                Some(id) => ledger.approve(&config, &policy, manager, id, now).map(|_| ()),
                None => Ok(()),
            },
            Op::Reject(i) => match pick(*i) {
                Some(id) => ledger
                    .reject(&config, &policy, manager, id, "over budget", now)
                    .map(|_| ()),
                None => Ok(()),
            },
            Op::Post(i) => match pick(*i) {
                Some(id) => ledger.post(&config, manager, id, "rcpt", now).map(|_| ()),
                None => Ok(()),
            },
        };
    }

    (config, ledger)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Reserved spend per category stays within allocation plus drawn contingency.
    #[test]
    fn prop_category_never_overcommitted(ops in prop::collection::vec(arb_op(), 1..40)) {
        let (config, ledger) = run(&ops);

        for name in CATEGORIES {
            let usage = ledger.usage_for(name);
            let allocated = config.allocated_amount(name).unwrap();
            prop_assert!(usage.reserved <= allocated + usage.contingency_drawn);

            let committed: Decimal = ledger
                .records()
                .iter()
                .filter(|r| r.in_category(name) && r.status.is_committed())
                .map(|r| r.amount)
                .sum();
            prop_assert!(committed <= allocated + usage.contingency_drawn);
        }
    }

    /// Total contingency drawn never exceeds the pool.
    #[test]
    fn prop_contingency_pool_never_exceeded(ops in prop::collection::vec(arb_op(), 1..40)) {
        let (config, ledger) = run(&ops);
        prop_assert!(ledger.contingency_drawn() <= config.contingency_amount());
        prop_assert!(ledger.contingency_drawn() >= Decimal::ZERO);
    }

    /// Rejected expenses hold no capacity.
    #[test]
    fn prop_rejected_never_counted(ops in prop::collection::vec(arb_op(), 1..40)) {
        let (_, ledger) = run(&ops);

        let live: Decimal = ledger
            .records()
            .iter()
            .filter(|r| r.status != ExpenseStatus::Rejected && r.status != ExpenseStatus::Draft)
            .map(|r| r.amount)
            .sum();
        let reserved: Decimal = ledger.category_usage().values().map(|u| u.reserved).sum();
        prop_assert_eq!(live, reserved);
    }

    /// A category holds exactly the contingency its own allocation cannot cover.
    #[test]
    fn prop_draw_matches_shortfall(ops in prop::collection::vec(arb_op(), 1..40)) {
        let (config, ledger) = run(&ops);
        for name in CATEGORIES {
            let usage = ledger.usage_for(name);
            let allocated = config.allocated_amount(name).unwrap();
            let shortfall = (usage.reserved - allocated).max(Decimal::ZERO);
            prop_assert_eq!(usage.contingency_drawn, shortfall);
        }
    }

    /// Only expenses that asked for it draw on contingency.
    #[test]
    fn prop_draw_only_when_requested(ops in prop::collection::vec(arb_op(), 1..40)) {
        let (_, ledger) = run(&ops);
        for record in ledger.records() {
            if !record.draw_contingency_requested {
                prop_assert_eq!(record.contingency_draw, Decimal::ZERO);
            }
            prop_assert!(record.contingency_draw <= record.amount);
        }
    }
}
