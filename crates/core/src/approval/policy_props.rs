//! Property-based tests for ApprovalPolicy.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::approval::policy::{ApprovalPolicy, ApprovalThresholds, RequiredApproval};
use crate::approval::role::Role;

/// Strategy for generating random positive Decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for generating random Role values.
fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Participant),
        Just(Role::Volunteer),
        Just(Role::Organizer),
        Just(Role::Manager),
        Just(Role::Admin),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The threshold itself is inclusive: amount <= limit auto-approves.
    #[test]
    fn prop_threshold_boundary(role in arb_role(), limit in arb_amount(), amount in arb_amount()) {
        let policy = ApprovalPolicy::new(ApprovalThresholds::new().with(role, limit));

        let required = policy.required_approval(role, amount).unwrap();
        if amount <= limit {
            prop_assert_eq!(required, RequiredApproval::AutoApproved);
        } else {
            prop_assert_eq!(required, RequiredApproval::ManagerApprovalRequired);
        }
    }

    /// Decisions are authorized exactly for manager and above when no limit is set.
    #[test]
    fn prop_decision_authority_follows_role_order(role in arb_role(), amount in arb_amount()) {
        let policy = ApprovalPolicy::new(ApprovalThresholds::new());

        let allowed = policy.authorize_decision(role, amount).is_ok();
        prop_assert_eq!(allowed, role >= Role::Manager);
    }

    /// Raising a threshold never turns an auto-approval into a manager approval.
    #[test]
    fn prop_threshold_monotonic(
        limit in arb_amount(),
        extra in arb_amount(),
        amount in arb_amount(),
    ) {
        let low = ApprovalPolicy::new(ApprovalThresholds::new().with(Role::Organizer, limit));
        let high =
            ApprovalPolicy::new(ApprovalThresholds::new().with(Role::Organizer, limit + extra));

        let low_result = low.required_approval(Role::Organizer, amount).unwrap();
        let high_result = high.required_approval(Role::Organizer, amount).unwrap();

        if low_result == RequiredApproval::AutoApproved {
            prop_assert_eq!(high_result, RequiredApproval::AutoApproved);
        }
    }
}
