//! Business logic, one service per concern

pub mod catalog;
pub mod circulation;
pub mod stats;
pub mod users;

use crate::{
    config::{AuthConfig, LoansConfig},
    repository::Repository,
};

/// Every service the handlers reach through `AppState`
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub stats: stats::StatsService,
}

impl Services {
    pub fn new(repository: Repository, auth_config: AuthConfig, loans_config: LoansConfig) -> Self {
        Self {
            users: users::UsersService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            circulation: circulation::CirculationService::new(repository.clone(), loans_config),
            stats: stats::StatsService::new(repository),
        }
    }
}
