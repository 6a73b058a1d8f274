//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_get`] or [`expect_action`] to assert behavior.

use crate::actor_framework::{Entity, ResourceClient, ResourceRequest, Response};
use tokio::sync::mpsc;

/// Creates a mock client and a receiver for asserting requests.
///
/// The client sends to a channel the test owns instead of a running
/// `ResourceActor`, so the test decides every response (success, rejection,
/// a dropped responder) and can check exactly what the client sent.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is an Insert request
pub async fn expect_insert<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T, Response<()>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Insert { item, respond_to }) => Some((item, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Id, Response<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Id, T::Action, Response<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::actor_framework::FrameworkError;
    use crate::cart_actor::CartAction;
    use crate::clients::{CartClient, ProductClient};
    use crate::domain::{Cart, Product, ProductId, UserId};
    use crate::product_actor::{ProductAction, ProductActionResult};
    use crate::store::StoreError;

    #[tokio::test]
    async fn set_stock_sends_action_and_returns_previous_level() {
        let (inner, mut receiver) = create_mock_client::<Product>(10);
        let client = ProductClient::new(inner);

        let task = tokio::spawn(async move { client.set_stock(ProductId(3), 9).await });

        let (id, action, responder) = expect_action(&mut receiver).await.expect("Expected Action request");
        assert_eq!(id, ProductId(3));
        assert!(matches!(action, ProductAction::SetStock(9)));
        responder.send(Ok(ProductActionResult::StockSet { previous: 4 })).unwrap();

        assert_eq!(task.await.unwrap(), Ok(4));
    }

    #[tokio::test]
    async fn mismatched_action_result_is_reported() {
        let (inner, mut receiver) = create_mock_client::<Product>(10);
        let client = ProductClient::new(inner);

        let task = tokio::spawn(async move { client.check_stock(ProductId(3)).await });

        let (_, _, responder) = expect_action(&mut receiver).await.expect("Expected Action request");
        responder.send(Ok(ProductActionResult::StockSet { previous: 1 })).unwrap();

        assert!(matches!(task.await.unwrap(), Err(StoreError::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn framework_errors_are_translated_for_the_store() {
        let (inner, mut receiver) = create_mock_client::<Cart>(10);
        let client = CartClient::new(inner);

        let task = tokio::spawn(async move { client.set_line(UserId(5), ProductId(1), 2).await });

        let (id, action, responder) = expect_action(&mut receiver).await.expect("Expected Action request");
        assert_eq!(id, UserId(5));
        assert!(matches!(action, CartAction::SetLine { product_id: ProductId(1), quantity: 2 }));
        responder.send(Err(FrameworkError::NotFound("5".to_string()))).unwrap();

        assert_eq!(
            task.await.unwrap(),
            Err(StoreError::NotFound { entity: "cart", id: "5".to_string() })
        );
    }

    #[tokio::test]
    async fn dropped_responder_means_store_unavailable() {
        let (inner, mut receiver) = create_mock_client::<Product>(10);
        let client = ProductClient::new(inner);

        let task = tokio::spawn(async move { client.get_product(ProductId(8)).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, ProductId(8));
        drop(responder);

        assert!(matches!(task.await.unwrap(), Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn insert_forwards_the_record() {
        let (inner, mut receiver) = create_mock_client::<Product>(10);
        let client = ProductClient::new(inner);

        let task = tokio::spawn(async move {
            client.insert_product(Product::new(2, "Mouse", dec!(19.50), 3)).await
        });

        let (item, responder) = expect_insert(&mut receiver).await.expect("Expected Insert request");
        assert_eq!(item, Product::new(2, "Mouse", dec!(19.50), 3));
        responder.send(Err(FrameworkError::Rejected("no".to_string()))).unwrap();

        assert_eq!(task.await.unwrap(), Err(StoreError::Rejected("no".to_string())));
    }
}
