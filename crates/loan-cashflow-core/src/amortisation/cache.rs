//! Per-loan memo of scheduled profiles.
//!
//! Profiles depend only on a loan's static terms, so a sweep over many
//! scenarios builds each one once. Entries are never invalidated; a loan id
//! reappearing with different terms is rejected instead.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::amortisation::profile::{scheduled_profile, ScheduledProfile};
use crate::error::LoanCashflowError;
use crate::loan::{AmortisationVectors, Loan};
use crate::LoanCashflowResult;

#[derive(Debug, Clone, Default)]
pub struct ProfileCache {
    entries: HashMap<String, (Loan, ScheduledProfile)>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached profile for `loan`, building it on first use.
    pub fn get_or_build(
        &mut self,
        loan: &Loan,
        vectors: &AmortisationVectors,
    ) -> LoanCashflowResult<&ScheduledProfile> {
        match self.entries.entry(loan.loan_id.clone()) {
            Entry::Occupied(entry) => {
                let (cached, profile) = entry.into_mut();
                if cached != loan {
                    return Err(LoanCashflowError::invalid(
                        "loan_id",
                        format!(
                            "Loan {} already cached with different terms",
                            loan.loan_id
                        ),
                    ));
                }
                Ok(profile)
            }
            Entry::Vacant(entry) => {
                let profile = scheduled_profile(loan, vectors)?;
                let (_, profile) = entry.insert((loan.clone(), profile));
                Ok(profile)
            }
        }
    }

    /// Build profiles for every loan up front so later lookups need only
    /// shared access.
    pub fn warm(&mut self, loans: &[Loan], vectors: &AmortisationVectors) -> LoanCashflowResult<()> {
        for loan in loans {
            self.get_or_build(loan, vectors)?;
        }
        Ok(())
    }

    pub fn get(&self, loan_id: &str) -> Option<&ScheduledProfile> {
        self.entries.get(loan_id).map(|(_, profile)| profile)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_profile_built_once_per_loan() {
        let loan = Loan::bullet("1", dec!(100), dec!(0.05), 12).unwrap();
        let vectors = AmortisationVectors::new();
        let mut cache = ProfileCache::new();

        let first = cache.get_or_build(&loan, &vectors).unwrap().clone();
        let second = cache.get_or_build(&loan, &vectors).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_conflicting_terms_rejected() {
        let vectors = AmortisationVectors::new();
        let mut cache = ProfileCache::new();
        let a = Loan::bullet("1", dec!(100), dec!(0.05), 12).unwrap();
        let b = Loan::bullet("1", dec!(200), dec!(0.05), 12).unwrap();
        cache.get_or_build(&a, &vectors).unwrap();
        assert!(cache.get_or_build(&b, &vectors).is_err());
    }

    #[test]
    fn test_warm_then_get() {
        let vectors = AmortisationVectors::new();
        let loans = vec![
            Loan::bullet("1", dec!(100), dec!(0.05), 12).unwrap(),
            Loan::fix_instalment("2", dec!(100), dec!(0.05), 12).unwrap(),
        ];
        let mut cache = ProfileCache::new();
        cache.warm(&loans, &vectors).unwrap();
        assert!(cache.get("1").is_some());
        assert!(cache.get("2").is_some());
        assert!(cache.get("3").is_none());
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let loan = Loan::vector("1", dec!(100), dec!(0.05), 2, "v").unwrap();
        let mut cache = ProfileCache::new();
        assert!(cache.get_or_build(&loan, &AmortisationVectors::new()).is_err());
        assert!(cache.is_empty());
    }
}
