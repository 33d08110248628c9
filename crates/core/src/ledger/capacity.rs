//! Category capacity checks and contingency draw planning.
//!
//! A category may reserve up to its own allocation. Past that, an expense that
//! explicitly asks for it draws the shortfall from the shared contingency pool,
//! first committed first served.

use rust_decimal::Decimal;

use crate::budget::{BudgetConfiguration, BudgetError, CategoryUsage};

/// Capacity a category has left for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headroom {
    /// Unreserved part of the category's own allocation.
    pub own: Decimal,
    /// Unreserved part of the shared contingency pool.
    pub pool: Decimal,
}

impl Headroom {
    /// Computes headroom from current usage.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UnknownCategory` if the category is absent.
    pub fn of(
        config: &BudgetConfiguration,
        category: &str,
        usage: &CategoryUsage,
        pool_drawn: Decimal,
    ) -> Result<Self, BudgetError> {
        let allocated = config.allocated_amount(category)?;
        Ok(Self {
            own: (allocated - usage.own_reserved()).max(Decimal::ZERO),
            pool: (config.contingency_amount() - pool_drawn).max(Decimal::ZERO),
        })
    }

    /// Plans how an amount is covered, returning the contingency draw.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ExceedsAvailable` when the amount does not fit. The
    /// reported `available` includes the pool only if a draw was requested.
    pub fn plan(
        &self,
        category: &str,
        amount: Decimal,
        draw_contingency: bool,
    ) -> Result<Decimal, BudgetError> {
        if amount <= self.own {
            return Ok(Decimal::ZERO);
        }

        let available = if draw_contingency {
            self.own + self.pool
        } else {
            self.own
        };

        if amount > available {
            return Err(BudgetError::ExceedsAvailable {
                category: category.to_string(),
                requested: amount,
                available,
            });
        }

        Ok(amount - self.own)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn headroom(own: Decimal, pool: Decimal) -> Headroom {
        Headroom { own, pool }
    }

    #[rstest]
    #[case(dec!(500), false, Ok(dec!(0)))]
    #[case(dec!(1000), false, Ok(dec!(0)))]
    #[case(dec!(1000.01), true, Ok(dec!(0.01)))]
    #[case(dec!(2000), true, Ok(dec!(1000)))]
    #[case(dec!(6000), true, Ok(dec!(5000)))]
    fn test_plan_accepts(
        #[case] amount: Decimal,
        #[case] draw: bool,
        #[case] expected: Result<Decimal, BudgetError>,
    ) {
        assert_eq!(headroom(dec!(1000), dec!(5000)).plan("Catering", amount, draw), expected);
    }

    #[test]
    fn test_plan_without_draw_reports_own_headroom() {
        let result = headroom(dec!(1000), dec!(5000)).plan("Catering", dec!(2000), false);
        assert_eq!(
            result,
            Err(BudgetError::ExceedsAvailable {
                category: "Catering".to_string(),
                requested: dec!(2000),
                available: dec!(1000),
            })
        );
    }

    #[test]
    fn test_plan_with_draw_reports_pool_too() {
        let result = headroom(dec!(1000), dec!(5000)).plan("Catering", dec!(6000.01), true);
        assert!(matches!(
            result,
            Err(BudgetError::ExceedsAvailable { available, .. }) if available == dec!(6000)
        ));
    }

    #[test]
    fn test_exhausted_pool() {
        let result = headroom(dec!(0), dec!(0)).plan("Catering", dec!(1), true);
        assert!(matches!(result, Err(BudgetError::ExceedsAvailable { .. })));
    }
}
