use std::sync::Arc;

use crate::config::Config;
use crate::ledger::Ledger;
use crate::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub users: Arc<dyn UserStore>,
    pub config: Config,
}
