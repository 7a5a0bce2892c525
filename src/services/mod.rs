//! Business logic services

pub mod catalog;
pub mod loans;
pub mod rankings;

use crate::{config::CirculationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub rankings: rankings::RankingsService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, circulation: CirculationConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), circulation.clone()),
            loans: loans::LoansService::new(repository.clone(), circulation),
            rankings: rankings::RankingsService::new(repository.clone()),
            repository,
        }
    }
}
