//! In-memory implementation of EarlyAdopterPool for testing and
//! development.
//!
//! The mutex plays the role the database's atomic UPDATE plays in the
//! PostgreSQL adapter; claim and release delegate to the domain
//! program's own transition logic.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::billing::EarlyAdopterProgram;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::EarlyAdopterPool;

/// In-memory slot pool. Not suitable for multi-server deployments.
pub struct InMemoryEarlyAdopterPool {
    program: Mutex<EarlyAdopterProgram>,
}

impl InMemoryEarlyAdopterPool {
    pub fn new(program: EarlyAdopterProgram) -> Self {
        Self {
            program: Mutex::new(program),
        }
    }
}

#[async_trait]
impl EarlyAdopterPool for InMemoryEarlyAdopterPool {
    async fn current(&self) -> Result<EarlyAdopterProgram, DomainError> {
        Ok(self.program.lock().unwrap().clone())
    }

    async fn claim_slot(&self) -> Result<bool, DomainError> {
        let mut program = self.program.lock().unwrap();
        Ok(program.claim(&Timestamp::now()))
    }

    async fn release_slot(&self) -> Result<bool, DomainError> {
        let mut program = self.program.lock().unwrap();
        Ok(program.release(&Timestamp::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_program(max_slots: i32) -> EarlyAdopterProgram {
        EarlyAdopterProgram {
            is_active: true,
            used_slots: 0,
            max_slots,
            cutoff_date: Timestamp::now().add_days(30),
        }
    }

    #[tokio::test]
    async fn claims_stop_when_pool_fills() {
        let pool = InMemoryEarlyAdopterPool::new(open_program(2));

        assert!(pool.claim_slot().await.unwrap());
        assert!(pool.claim_slot().await.unwrap());
        assert!(!pool.claim_slot().await.unwrap());

        let program = pool.current().await.unwrap();
        assert_eq!(program.used_slots, 2);
        assert!(!program.is_active);
    }

    #[tokio::test]
    async fn release_reopens_a_full_pool() {
        let pool = InMemoryEarlyAdopterPool::new(open_program(1));
        assert!(pool.claim_slot().await.unwrap());
        assert!(!pool.current().await.unwrap().is_active);

        assert!(pool.release_slot().await.unwrap());
        let program = pool.current().await.unwrap();
        assert_eq!(program.used_slots, 0);
        assert!(program.is_active);
    }

    #[tokio::test]
    async fn release_on_empty_pool_reports_false() {
        let pool = InMemoryEarlyAdopterPool::new(open_program(1));
        assert!(!pool.release_slot().await.unwrap());
    }
}
