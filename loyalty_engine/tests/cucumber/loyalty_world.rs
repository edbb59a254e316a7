use cucumber::World;
use log::*;
use loyalty_engine::{
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    LedgerApi,
    OrderFlowApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct LoyaltyWorld {
    pub system: Option<LoyaltySystem>,
    /// The error message of the most recent step that was expected to be able to fail.
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct LoyaltySystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub ledger: LedgerApi<SqliteDatabase>,
}

impl LoyaltyWorld {
    pub fn system(&self) -> &LoyaltySystem {
        self.system.as_ref().expect("Loyalty system not initialised")
    }
}

impl LoyaltySystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 2).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let orders = OrderFlowApi::new(db.clone());
        let ledger = LedgerApi::new(db.clone());
        Self { db_path: url, db, orders, ledger }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
