//! # Mock Framework
//!
//! Utilities for testing clients without a running [`ResourceActor`](crate::actor_framework::ResourceActor).
//!
//! [`create_mock_client`] hands back a client plus the receiving end of its
//! channel; the `expect_*` helpers pop the next request and return its
//! payload together with the responder, so a test scripts the actor's reply.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, FrameworkError, ResourceClient, ResourceRequest};

type Reply<R> = oneshot::Sender<Result<R, FrameworkError>>;

/// Creates a client whose requests land on the returned receiver.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Reply<T::Id>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

pub async fn expect_get<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Id, Reply<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

pub async fn expect_list<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<Reply<Vec<T>>> {
    match receiver.recv().await {
        Some(ResourceRequest::List { respond_to }) => Some(respond_to),
        _ => None,
    }
}

pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Reply<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ProductInput, UserProfile};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<crate::domain::Product>(10);

        let create_task = tokio::spawn(async move {
            let input = ProductInput {
                name: "Coffee service".to_string(),
                price: 9900.0,
                description: String::new(),
                stock: 5,
                image_url: String::new(),
                category: Category::Beverages,
                is_vegetarian: true,
                is_combo: false,
            };
            client.create(input).await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name, "Coffee service");
        responder.send(Ok("product_000001".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("product_000001".to_string()));
    }

    #[tokio::test]
    async fn list_replies_are_scripted() {
        let (client, mut receiver) = create_mock_client::<UserProfile>(10);
        let list_task = tokio::spawn(async move { client.list().await });

        let responder = expect_list(&mut receiver).await.expect("Expected List request");
        responder.send(Ok(vec![UserProfile::new("uid-1", "ana@example.com", "Ana")])).unwrap();

        let profiles = list_task.await.unwrap().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].email, "ana@example.com");
    }
}
