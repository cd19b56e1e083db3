/// Read and delete methods shared by every resource client.
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: String) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.get(id).await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<list_ $entity_name_snake s>](&self) -> Result<Vec<$entity>, $error> {
                    tracing::debug!("Sending request");
                    self.inner.list().await.map_err(<$error>::from)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<delete_ $entity_name_snake>](&self, id: String) -> Result<(), $error> {
                    tracing::debug!("Sending request");
                    self.inner.delete(id).await.map_err(<$error>::from)
                }

                /// Stops the backing actor; every clone of this client fails afterwards.
                pub async fn shutdown_actor(&self) -> Result<(), $error> {
                    self.inner.shutdown().await.map_err(<$error>::from)
                }

                /// Stores the record under its own id, replacing any previous one.
                #[tracing::instrument(skip(self, item))]
                pub async fn [<put_ $entity_name_snake>](&self, item: $entity) -> Result<(), $error> {
                    tracing::debug!("Sending request");
                    self.inner.upsert(item).await.map_err(<$error>::from)
                }
            }
        }
    };
}

macro_rules! impl_client_new {
    ($client_name:ident, $entity:ty) => {
        impl $client_name {
            pub fn new(inner: crate::actor_framework::ResourceClient<$entity>) -> Self {
                Self { inner }
            }
        }
    };
}

macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        impl_client_new!($client_name, $entity);
        impl_client_methods!($client_name, $entity, $error, $entity_name_snake);
    };
}
