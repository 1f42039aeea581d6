// 📋 Record Service - Validated creation, decisions and statistics
//
// Every mutation is load → mutate → save over the whole collection.
// The write lock spans the full sequence so two callers cannot lose an update.

use crate::error::LoanError;
use crate::loan::{self, Decision, LoanApplication, LoanSummary, NewLoanApplication};
use crate::storage::LoanStorage;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

pub struct LoanService<S: LoanStorage> {
    storage: S,
    write_lock: Mutex<()>,
}

impl<S: LoanStorage> LoanService<S> {
    pub fn new(storage: S) -> Self {
        LoanService {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    // ========================================================================
    // CREATION
    // ========================================================================

    /// Validate `input`, append a new pending record and persist it.
    ///
    /// Invalid input never touches storage.
    pub fn create(&self, input: NewLoanApplication) -> Result<LoanApplication, LoanError> {
        if let Err(e) = input.validate() {
            warn!(reason = %e, "rejected loan application");
            return Err(e.into());
        }

        let _guard = self.lock();
        let mut loans = self.storage.load()?;

        let mut record = LoanApplication::from_input(input);
        while loans.iter().any(|l| l.id == record.id) {
            record.id = uuid::Uuid::new_v4().to_string();
        }

        loans.push(record.clone());
        self.storage.save(&loans)?;

        info!(
            id = %record.id,
            applicant = %record.applicant_name,
            amount = record.amount,
            term_months = record.term_months,
            "created loan application"
        );
        Ok(record)
    }

    // ========================================================================
    // STATUS MUTATION
    // ========================================================================

    /// Set the status of one record to `decision`.
    pub fn update_status(&self, id: &str, decision: Decision) -> Result<LoanApplication, LoanError> {
        let updated = self.mutate(id, |record| record.status = decision.into())?;
        info!(id = %id, status = %updated.status, "updated loan status");
        Ok(updated)
    }

    /// Apply the auto-decision rule to one record.
    pub fn auto_decide(&self, id: &str) -> Result<LoanApplication, LoanError> {
        let updated = self.mutate(id, |record| record.status = loan::decide(record).into())?;
        info!(
            id = %id,
            status = %updated.status,
            amount = updated.amount,
            term_months = updated.term_months,
            "auto-decided loan"
        );
        Ok(updated)
    }

    /// Remove one record from the collection.
    pub fn delete(&self, id: &str) -> Result<LoanApplication, LoanError> {
        let _guard = self.lock();
        let mut loans = self.storage.load()?;

        let Some(index) = loans.iter().position(|l| l.id == id) else {
            warn!(id = %id, "delete of unknown loan");
            return Err(LoanError::not_found(id));
        };

        let removed = loans.remove(index);
        self.storage.save(&loans)?;

        info!(id = %id, "deleted loan application");
        Ok(removed)
    }

    fn mutate<F>(&self, id: &str, apply: F) -> Result<LoanApplication, LoanError>
    where
        F: FnOnce(&mut LoanApplication),
    {
        let _guard = self.lock();
        let mut loans = self.storage.load()?;

        let Some(record) = loans.iter_mut().find(|l| l.id == id) else {
            warn!(id = %id, "loan not found");
            return Err(LoanError::not_found(id));
        };

        apply(record);
        let updated = record.clone();
        self.storage.save(&loans)?;

        Ok(updated)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// All records in creation order
    pub fn get_all(&self) -> Result<Vec<LoanApplication>, LoanError> {
        Ok(self.storage.load()?)
    }

    pub fn get(&self, id: &str) -> Result<LoanApplication, LoanError> {
        self.storage
            .load()?
            .into_iter()
            .find(|l| l.id == id)
            .ok_or_else(|| LoanError::not_found(id))
    }

    pub fn summary(&self) -> Result<LoanSummary, LoanError> {
        Ok(LoanSummary::from_loans(&self.storage.load()?))
    }

    pub fn monthly_payment(&self, record: &LoanApplication) -> f64 {
        loan::monthly_payment(record)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::LoanStatus;
    use crate::storage::{KeyValueStore, KvLoanStorage, MemoryStore, STORAGE_KEY};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn service() -> LoanService<KvLoanStorage<MemoryStore>> {
        LoanService::new(KvLoanStorage::new(MemoryStore::new()))
    }

    fn raw_blob(service: &LoanService<KvLoanStorage<MemoryStore>>) -> Option<String> {
        service.storage().store().get_item(STORAGE_KEY).unwrap()
    }

    fn create(
        service: &LoanService<KvLoanStorage<MemoryStore>>,
        amount: f64,
        term_months: i64,
    ) -> LoanApplication {
        service
            .create(NewLoanApplication::new("Applicant", amount, term_months, 0.08))
            .unwrap()
    }

    #[test]
    fn test_create_returns_pending_trimmed_record() {
        let service = service();
        let record = service
            .create(NewLoanApplication::new("  Jane Doe  ", 25_000.0, 36, 0.08))
            .unwrap();

        assert_eq!(record.status, LoanStatus::Pending);
        assert_eq!(record.applicant_name, "Jane Doe");
        assert!(!record.id.is_empty());
        assert_eq!(record.amount, 25_000.0);
        assert_eq!(record.term_months, 36);
        assert_eq!(record.interest_rate, 0.08);

        assert_eq!(service.get_all().unwrap(), vec![record]);
    }

    #[test]
    fn test_create_appends_in_order_with_unique_ids() {
        let service = service();
        let created: Vec<LoanApplication> = (1..=5)
            .map(|i| create(&service, 1000.0 * i as f64, 12))
            .collect();

        let all = service.get_all().unwrap();
        assert_eq!(all, created);

        let ids: HashSet<&str> = all.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_invalid_input_is_not_persisted() {
        let service = service();
        let existing = create(&service, 1000.0, 12);
        let before = raw_blob(&service);

        let cases = [
            (NewLoanApplication::new("   ", 1000.0, 12, 0.1), "Applicant name is required"),
            (NewLoanApplication::new("Jane", 0.0, 12, 0.1), "Amount must be greater than 0"),
            (NewLoanApplication::new("Jane", -5.0, 12, 0.1), "Amount must be greater than 0"),
            (NewLoanApplication::new("Jane", 1000.0, 0, 0.1), "Term months must be greater than 0"),
            (NewLoanApplication::new("Jane", 1000.0, -3, 0.1), "Term months must be greater than 0"),
            (NewLoanApplication::new("Jane", 1000.0, 12, -0.01), "Interest rate cannot be negative"),
        ];

        for (input, message) in cases {
            match service.create(input) {
                Err(LoanError::Validation(e)) => assert_eq!(e.message, message),
                other => panic!("expected validation error, got {:?}", other),
            }
        }

        assert_eq!(raw_blob(&service), before);
        assert_eq!(service.get_all().unwrap(), vec![existing]);
    }

    #[test]
    fn test_infinite_values_are_rejected_and_storage_stays_readable() {
        let service = service();
        let existing = create(&service, 1000.0, 12);
        let before = raw_blob(&service);

        let cases = [
            (NewLoanApplication::new("Jane", f64::INFINITY, 12, 0.1), "Amount must be greater than 0"),
            (NewLoanApplication::new("Jane", 1000.0, 12, f64::INFINITY), "Interest rate cannot be negative"),
        ];

        for (input, message) in cases {
            match service.create(input) {
                Err(LoanError::Validation(e)) => assert_eq!(e.message, message),
                other => panic!("expected validation error, got {:?}", other),
            }
        }

        assert_eq!(raw_blob(&service), before);
        assert_eq!(service.get_all().unwrap(), vec![existing]);
    }

    #[test]
    fn test_invalid_input_on_empty_storage_writes_nothing() {
        let service = service();
        assert!(service.create(NewLoanApplication::new("", 1.0, 1, 0.0)).is_err());
        assert_eq!(raw_blob(&service), None);
    }

    #[test]
    fn test_update_status_changes_only_target() {
        let service = service();
        let a = create(&service, 1000.0, 12);
        let b = create(&service, 2000.0, 24);

        let updated = service.update_status(&b.id, Decision::Rejected).unwrap();
        assert_eq!(updated.status, LoanStatus::Rejected);
        assert_eq!(updated.id, b.id);

        let all = service.get_all().unwrap();
        assert_eq!(all[0], a);
        assert_eq!(all[1].status, LoanStatus::Rejected);
        assert_eq!(all[1].created_at, b.created_at);
    }

    #[test]
    fn test_update_status_can_re_decide() {
        let service = service();
        let record = create(&service, 1000.0, 12);

        service.update_status(&record.id, Decision::Approved).unwrap();
        service.update_status(&record.id, Decision::Rejected).unwrap();

        assert_eq!(service.get(&record.id).unwrap().status, LoanStatus::Rejected);
    }

    #[test]
    fn test_unknown_id_leaves_storage_untouched() {
        let service = service();
        create(&service, 1000.0, 12);
        let before = service.get_all().unwrap();
        let raw_before = raw_blob(&service);

        let err = service.update_status("missing", Decision::Approved).unwrap_err();
        assert!(matches!(err, LoanError::NotFound { ref id } if id == "missing"));
        assert_eq!(err.to_string(), "Loan with id missing not found");

        let err = service.auto_decide("missing").unwrap_err();
        assert_eq!(err.to_string(), "Loan with id missing not found");

        assert!(matches!(service.delete("missing"), Err(LoanError::NotFound { .. })));
        assert!(matches!(service.get("missing"), Err(LoanError::NotFound { .. })));

        assert_eq!(service.get_all().unwrap(), before);
        assert_eq!(raw_blob(&service), raw_before);
    }

    #[test]
    fn test_auto_decide_thresholds() {
        let service = service();
        let cases = [
            (100_000.0, 60, LoanStatus::Approved),
            (150_000.0, 60, LoanStatus::Rejected),
            (50_000.0, 72, LoanStatus::Rejected),
            (5_000.0, 6, LoanStatus::Approved),
        ];

        for (amount, term_months, expected) in cases {
            let record = create(&service, amount, term_months);
            let decided = service.auto_decide(&record.id).unwrap();
            assert_eq!(decided.status, expected, "amount {} term {}", amount, term_months);
            assert_eq!(service.get(&record.id).unwrap().status, expected);
        }
    }

    #[test]
    fn test_delete_removes_one_record() {
        let service = service();
        let a = create(&service, 1000.0, 12);
        let b = create(&service, 2000.0, 12);
        let c = create(&service, 3000.0, 12);

        let removed = service.delete(&b.id).unwrap();
        assert_eq!(removed, b);
        assert_eq!(service.get_all().unwrap(), vec![a, c]);
    }

    #[test]
    fn test_summary_reflects_decisions() {
        let service = service();
        let a = create(&service, 10_000.0, 12);
        let b = create(&service, 200_000.0, 12);
        create(&service, 5_000.0, 6);

        service.auto_decide(&a.id).unwrap();
        service.auto_decide(&b.id).unwrap();

        let summary = service.summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.total_requested, 215_000.0);
        assert_eq!(summary.total_approved, 10_000.0);
    }

    #[test]
    fn test_monthly_payment_has_no_rounding() {
        let service = service();
        let record = service
            .create(NewLoanApplication::new("Jane", 10_000.0, 12, 0.1))
            .unwrap();

        let payment = service.monthly_payment(&record);
        assert!((payment - 916.666_666).abs() < 1e-3);
        assert_ne!(payment, 916.67);
    }

    #[test]
    fn test_corrupt_storage_propagates() {
        let service = service();
        service
            .storage()
            .store()
            .set_item(STORAGE_KEY, "garbage")
            .unwrap();

        let err = service
            .create(NewLoanApplication::new("Jane", 1000.0, 12, 0.1))
            .unwrap_err();
        assert!(matches!(err, LoanError::Storage(_)));
        assert!(!err.is_recoverable());
        assert_eq!(raw_blob(&service).as_deref(), Some("garbage"));
    }

    #[test]
    fn test_concurrent_creates_do_not_lose_updates() {
        let service = Arc::new(service());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    for i in 0..10 {
                        service
                            .create(NewLoanApplication::new(
                                &format!("Applicant {}-{}", t, i),
                                1000.0,
                                12,
                                0.05,
                            ))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(service.get_all().unwrap().len(), 80);
    }
}
