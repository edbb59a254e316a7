use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType},
    test_utils::prepare_env::new_test_db,
    LedgerManagement,
    OrderFlowApi,
    OrderFlowError,
    UploadResult,
};
use lp_common::Points;

#[tokio::test]
async fn upload_is_idempotent_for_the_owner() {
    let db = new_test_db(1).await;
    let api = OrderFlowApi::new(db);
    let first = api.upload_order(7, "79927398713").await.unwrap();
    assert!(matches!(first, UploadResult::Accepted(_)));
    assert_eq!(first.order().status, OrderStatusType::New);
    let second = api.upload_order(7, "79927398713").await.unwrap();
    let UploadResult::AlreadyUploaded(order) = second else {
        panic!("Second upload should be a no-op");
    };
    assert_eq!(order.id, first.order().id);
    assert_eq!(api.orders_for_user(7).await.unwrap().len(), 1);
}

#[tokio::test]
async fn upload_by_another_user_conflicts_whatever_the_status() {
    let db = new_test_db(1).await;
    let api = OrderFlowApi::new(db.clone());
    let order = api.upload_order(7, "79927398713").await.unwrap().order().clone();
    let number = OrderNumber::from("79927398713");
    let err = api.upload_order(8, "79927398713").await.unwrap_err();
    assert_eq!(err, OrderFlowError::OwnedByOtherUser(number.clone()));

    db.settle_order(order.id, OrderStatusType::Processed, Points::from_whole(500)).await.unwrap();
    let err = api.upload_order(8, "79927398713").await.unwrap_err();
    assert_eq!(err, OrderFlowError::OwnedByOtherUser(number.clone()));
    let again = api.upload_order(7, "79927398713").await.unwrap();
    assert_eq!(again.order().status, OrderStatusType::Processed);

    let stored = api.order_by_number(&number).await.unwrap().unwrap();
    assert_eq!(stored.user_id, 7);
    assert!(api.orders_for_user(8).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_uploads_have_one_owner() {
    let db = new_test_db(5).await;
    let mut handles = Vec::new();
    for user in 1..=6 {
        let api = OrderFlowApi::new(db.clone());
        handles.push(tokio::spawn(async move { api.upload_order(user, "4561261212345467").await }));
    }
    let mut accepted = 0;
    let mut conflicts = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(UploadResult::Accepted(_)) => accepted += 1,
            Err(OrderFlowError::OwnedByOtherUser(_)) => conflicts += 1,
            other => panic!("Unexpected result: {other:?}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 5);
}

#[tokio::test]
async fn invalid_numbers_are_rejected() {
    let db = new_test_db(1).await;
    let api = OrderFlowApi::new(db);
    for bad in ["79927398710", "", "12ab", "7992-7398-713"] {
        let err = api.upload_order(7, bad).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::InvalidOrderNumber(_)), "{bad} should be rejected");
    }
    assert!(api.orders_for_user(7).await.unwrap().is_empty());
}

#[tokio::test]
async fn orders_are_listed_newest_first() {
    let db = new_test_db(1).await;
    let api = OrderFlowApi::new(db);
    for n in ["18", "26", "34"] {
        api.upload_order(3, n).await.unwrap();
    }
    api.upload_order(4, "42").await.unwrap();
    let orders = api.orders_for_user(3).await.unwrap();
    let numbers = orders.iter().map(|o| o.number.as_str()).collect::<Vec<_>>();
    assert_eq!(numbers, vec!["34", "26", "18"]);
}
