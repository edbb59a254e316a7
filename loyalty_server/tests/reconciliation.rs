//! Runs the accrual worker against a real SQLite database and a throw-away accrual service.
use std::{
    net::SocketAddr,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use accrual_client::{AccrualApi, AccrualConfig};
use actix_web::{dev::ServerHandle, get, web, App, HttpResponse, HttpServer, Responder};
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType},
    test_utils::prepare_env::new_test_db,
    LedgerApi,
    OrderFlowApi,
    SqliteDatabase,
    UploadResult,
};
use loyalty_server::{
    accrual_worker::{start_accrual_worker, WorkerConfig},
    config::ServerConfig,
    service::run_service_until,
};
use lp_common::Points;

const PAID: &str = "79927398713";
const REFUSED: &str = "12345678903";
const PENDING: &str = "2377225624";

const FAST: WorkerConfig =
    WorkerConfig { idle_poll_delay: Duration::from_millis(50), drain_step_delay: Duration::from_millis(5) };

struct RequestCount(AtomicUsize);

#[get("/api/orders/{number}")]
async fn order_status(path: web::Path<String>, count: web::Data<RequestCount>) -> impl Responder {
    let number = path.into_inner();
    match number.as_str() {
        PAID => HttpResponse::Ok().json(serde_json::json!({ "order": number, "status": "PROCESSED", "accrual": 500 })),
        REFUSED => {
            if count.0.fetch_add(1, Ordering::SeqCst) == 0 {
                HttpResponse::TooManyRequests().insert_header(("Retry-After", "1")).finish()
            } else {
                HttpResponse::Ok().json(serde_json::json!({ "order": number, "status": "INVALID" }))
            }
        },
        PENDING => HttpResponse::Ok().json(serde_json::json!({ "order": number, "status": "REGISTERED" })),
        _ => HttpResponse::NoContent().finish(),
    }
}

fn start_accrual_service() -> (SocketAddr, ServerHandle) {
    let count = web::Data::new(RequestCount(AtomicUsize::new(0)));
    let srv = HttpServer::new(move || App::new().app_data(count.clone()).service(order_status))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Could not bind test server");
    let addr = srv.addrs()[0];
    let server = srv.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    (addr, handle)
}

async fn upload_orders(db: &SqliteDatabase) {
    let api = OrderFlowApi::new(db.clone());
    for (user_id, number) in [(7, PAID), (7, REFUSED), (8, PENDING)] {
        let result = api.upload_order(user_id, number).await.expect("Upload failed");
        assert!(matches!(result, UploadResult::Accepted(_)));
    }
}

async fn status_of(db: &SqliteDatabase, number: &str) -> OrderStatusType {
    let api = OrderFlowApi::new(db.clone());
    api.order_by_number(&OrderNumber::from(number)).await.expect("Lookup failed").expect("Order not found").status
}

/// Polls until every order has been looked at by the worker.
async fn wait_for_reconciliation(db: &SqliteDatabase) {
    let done = async {
        loop {
            if status_of(db, PAID).await.is_terminal() &&
                status_of(db, REFUSED).await.is_terminal() &&
                status_of(db, PENDING).await == OrderStatusType::Processing
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(15), done).await.expect("Orders were not reconciled in time");
}

#[actix_web::test]
async fn worker_settles_orders_and_credits_owners() {
    let db = new_test_db(5).await;
    upload_orders(&db).await;
    let (addr, server) = start_accrual_service();
    let client = AccrualApi::new(AccrualConfig::new(format!("http://{addr}"))).expect("Could not create client");

    let worker = start_accrual_worker(db.clone(), client.clone(), FAST);
    wait_for_reconciliation(&db).await;
    worker.stop();
    let summary = worker.join().await.expect("Worker failed");

    assert_eq!(status_of(&db, PAID).await, OrderStatusType::Processed);
    assert_eq!(status_of(&db, REFUSED).await, OrderStatusType::Invalid);
    assert_eq!(summary.settled, 2);
    assert_eq!(summary.credited, Points::from_whole(500));
    assert_eq!(summary.retries, 1);
    assert_eq!(summary.marked_processing, 1);
    let ledger = LedgerApi::new(db.clone());
    assert_eq!(ledger.balance(7).await.unwrap().current, Points::from_whole(500));
    assert!(ledger.balance(8).await.unwrap().current.is_zero());

    // A restarted worker only ever sees the pending order again
    let worker = start_accrual_worker(db.clone(), client, FAST);
    tokio::time::sleep(Duration::from_millis(300)).await;
    worker.stop();
    let summary = worker.join().await.expect("Worker failed");
    assert_eq!(summary.settled, 0);
    assert_eq!(summary.marked_processing, 0);
    assert_eq!(ledger.balance(7).await.unwrap().current, Points::from_whole(500));
    assert_eq!(status_of(&db, PENDING).await, OrderStatusType::Processing);

    server.stop(true).await;
}

#[actix_web::test]
async fn service_runs_until_shutdown() {
    let db = new_test_db(5).await;
    upload_orders(&db).await;
    let (addr, server) = start_accrual_service();
    let config = ServerConfig {
        database_url: db.url().to_string(),
        accrual: AccrualConfig::new(format!("http://{addr}")),
        worker: FAST,
        ..Default::default()
    };

    let summary = run_service_until(config, wait_for_reconciliation(&db)).await.expect("Service failed");

    assert_eq!(summary.settled, 2);
    assert_eq!(summary.credited, Points::from_whole(500));
    let ledger = LedgerApi::new(db.clone());
    assert_eq!(ledger.balance(7).await.unwrap().current, Points::from_whole(500));
    server.stop(true).await;
}
