macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $id:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: $id) -> Result<Option<$entity>, crate::store::StoreError> {
                    tracing::debug!("Sending request");
                    self.inner.get(id).await
                        .map_err(|e| crate::store::StoreError::from_framework(stringify!($entity_name_snake), e))
                }

                #[tracing::instrument(skip(self, item))]
                pub async fn [<insert_ $entity_name_snake>](&self, item: $entity) -> Result<(), crate::store::StoreError> {
                    tracing::debug!("Sending request");
                    self.inner.insert(item).await
                        .map_err(|e| crate::store::StoreError::from_framework(stringify!($entity_name_snake), e))
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<delete_ $entity_name_snake>](&self, id: $id) -> Result<bool, crate::store::StoreError> {
                    tracing::debug!("Sending request");
                    self.inner.delete(id).await
                        .map_err(|e| crate::store::StoreError::from_framework(stringify!($entity_name_snake), e))
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<list_ $entity_name_snake s>](&self) -> Result<Vec<$entity>, crate::store::StoreError> {
                    tracing::debug!("Sending request");
                    self.inner.list().await
                        .map_err(|e| crate::store::StoreError::from_framework(stringify!($entity_name_snake), e))
                }

                pub async fn shutdown(&self) {
                    self.inner.shutdown().await
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
    ($client_name:ident, $entity:ty, $id:ty, $entity_name_snake:ident) => {
        impl_client_new!($client_name, $entity);
        impl_client_methods!($client_name, $entity, $id, $entity_name_snake);
    };
}
