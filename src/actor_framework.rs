use std::collections::HashMap;
use std::hash::Hash;
use std::fmt::{Debug, Display};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, and Actions)
// =============================================================================

/// Errors produced by the resource actor plumbing itself.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
}

/// Trait that any record must implement to be managed by a [`ResourceActor`].
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;

    fn id(&self) -> &Self::Id;

    /// Construct the full record from the generated ID and the create params.
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, String>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), String> { Ok(()) }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), String>;
    fn on_delete(&self) -> Result<(), String> { Ok(()) }

    /// Handle a record-specific action.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, String>;
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T::Id>,
    },
    Upsert {
        item: T,
        respond_to: Response<()>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        respond_to: Response<Vec<T>>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    /// Stops the actor even while other client handles are alive.
    Shutdown,
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    /// Runs until a `Shutdown` request arrives or every client handle has
    /// been dropped.
    pub async fn run(mut self) {
        debug!(entity = std::any::type_name::<T>(), "Resource actor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let _ = respond_to.send(self.handle_create(params));
                }
                ResourceRequest::Upsert { item, respond_to } => {
                    self.store.insert(item.id().clone(), item);
                    let _ = respond_to.send(Ok(()));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::List { respond_to } => {
                    let items = self.store.values().cloned().collect();
                    let _ = respond_to.send(Ok(items));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => item
                            .on_update(patch)
                            .map(|_| item.clone())
                            .map_err(FrameworkError::Rejected),
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let result = match self.store.get(&id) {
                        Some(item) => match item.on_delete() {
                            Ok(()) => {
                                self.store.remove(&id);
                                Ok(())
                            }
                            Err(e) => Err(FrameworkError::Rejected(e)),
                        },
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => item.handle_action(action).map_err(FrameworkError::Rejected),
                        None => Err(FrameworkError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Shutdown => break,
            }
        }
        debug!(entity = std::any::type_name::<T>(), "Resource actor stopped");
    }

    fn handle_create(&mut self, params: T::CreateParams) -> Result<T::Id, FrameworkError> {
        let id = (self.next_id_fn)();
        let mut item = T::from_create_params(id.clone(), params).map_err(FrameworkError::Rejected)?;
        if let Err(e) = item.on_create() {
            warn!(id = %id, error = %e, "Create hook rejected item");
            return Err(FrameworkError::Rejected(e));
        }
        self.store.insert(id.clone(), item);
        Ok(id)
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T::Id, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn upsert(&self, item: T) -> Result<(), FrameworkError> {
        self.request(|respond_to| ResourceRequest::Upsert { item, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn list(&self) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::List { respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn shutdown(&self) -> Result<(), FrameworkError> {
        self.sender
            .send(ResourceRequest::Shutdown)
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }

    pub async fn perform_action(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Tray {
        id: String,
        label: String,
        portions: u32,
    }

    #[derive(Debug)]
    struct TrayCreate {
        label: String,
        portions: u32,
    }

    #[derive(Debug)]
    enum TrayAction {
        Serve(u32),
    }

    impl Entity for Tray {
        type Id = String;
        type CreateParams = TrayCreate;
        type Patch = String;
        type Action = TrayAction;
        type ActionResult = u32;

        fn id(&self) -> &String { &self.id }

        fn from_create_params(id: String, params: TrayCreate) -> Result<Self, String> {
            Ok(Self { id, label: params.label, portions: params.portions })
        }

        fn on_create(&mut self) -> Result<(), String> {
            if self.label.is_empty() {
                return Err("label required".to_string());
            }
            Ok(())
        }

        fn on_update(&mut self, label: String) -> Result<(), String> {
            self.label = label;
            Ok(())
        }

        fn handle_action(&mut self, action: TrayAction) -> Result<u32, String> {
            match action {
                TrayAction::Serve(n) if n <= self.portions => {
                    self.portions -= n;
                    Ok(self.portions)
                }
                TrayAction::Serve(n) => Err(format!("only {} portions left, {} requested", self.portions, n)),
            }
        }
    }

    fn spawn_trays() -> ResourceClient<Tray> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("tray_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = ResourceActor::new(10, next_id);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn test_resource_actor_crud_and_actions() {
        let client = spawn_trays();

        let id = client.create(TrayCreate { label: "Empanadas".into(), portions: 10 }).await.unwrap();
        assert_eq!(id, "tray_1");

        let left = client.perform_action(id.clone(), TrayAction::Serve(4)).await.unwrap();
        assert_eq!(left, 6);

        let err = client.perform_action(id.clone(), TrayAction::Serve(7)).await.unwrap_err();
        assert!(matches!(err, FrameworkError::Rejected(_)));

        let renamed = client.update(id.clone(), "Sopaipillas".into()).await.unwrap();
        assert_eq!(renamed.label, "Sopaipillas");

        assert_eq!(client.list().await.unwrap().len(), 1);
        client.delete(id.clone()).await.unwrap();
        assert_eq!(client.get(id.clone()).await.unwrap(), None);
        assert_eq!(client.delete(id).await, Err(FrameworkError::NotFound("tray_1".into())));
    }

    #[tokio::test]
    async fn test_create_hook_rejection_is_not_stored() {
        let client = spawn_trays();
        let err = client.create(TrayCreate { label: String::new(), portions: 1 }).await.unwrap_err();
        assert_eq!(err, FrameworkError::Rejected("label required".into()));
        assert!(client.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_actor_with_live_clients() {
        let (actor, client) = ResourceActor::<Tray>::new(4, || "tray".to_string());
        let handle = tokio::spawn(actor.run());
        client.shutdown().await.unwrap();
        handle.await.unwrap();
        assert_eq!(client.list().await, Err(FrameworkError::ActorClosed));
    }

    #[tokio::test]
    async fn test_upsert_keeps_caller_id() {
        let client = spawn_trays();
        let tray = Tray { id: "fixed".into(), label: "Humitas".into(), portions: 2 };
        client.upsert(tray.clone()).await.unwrap();
        assert_eq!(client.get("fixed".into()).await.unwrap(), Some(tray));
    }
}
