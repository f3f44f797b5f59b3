//! Writes and their reconciliation with the cache.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::client::QueryClient;
use super::key::QueryKey;
use super::state::MutationState;
use crate::error::QueryError;

type MutationFn<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, QueryError>> + Send + Sync>;

/// A reusable write with observable state.
///
/// Each call to [`mutate`](Mutation::mutate) moves the state through
/// `Pending` to `Success` or `Error`. Clones share the state.
pub struct Mutation<A, R> {
    run: MutationFn<A, R>,
    state: Arc<Mutex<MutationState<R>>>,
}

impl<A, R> Clone for Mutation<A, R> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A, R> Mutation<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, QueryError>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |args| Box::pin(run(args))),
            state: Arc::new(Mutex::new(MutationState::Idle)),
        }
    }

    fn set_state(&self, state: MutationState<R>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub async fn mutate(&self, args: A) -> Result<R, QueryError> {
        self.set_state(MutationState::Pending);
        let result = (self.run)(args).await;
        self.set_state(match &result {
            Ok(value) => MutationState::Success(value.clone()),
            Err(err) => MutationState::Error(err.clone()),
        });
        result
    }

    pub fn state(&self) -> MutationState<R> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    pub fn is_success(&self) -> bool {
        self.state().is_success()
    }

    pub fn is_error(&self) -> bool {
        self.state().is_error()
    }

    pub fn error(&self) -> Option<QueryError> {
        self.state().error().cloned()
    }

    pub fn data(&self) -> Option<R> {
        self.state().data().cloned()
    }

    pub fn reset(&self) {
        self.set_state(MutationState::Idle);
    }
}

/// Perform `write` with an optimistic cache edit.
///
/// 1. In one step, in-flight fetches under `targets` are cancelled so their
///    responses cannot overwrite the edit, and every `T` value under
///    `targets` is copied and edited by `apply`.
/// 2. `write` runs. On success the copies are dropped; on failure exactly
///    the copied keys get their copies back and the error is returned.
pub async fn optimistic<T, F, Fut, R>(
    client: &QueryClient,
    targets: &[QueryKey],
    apply: F,
    write: Fut,
) -> Result<R, QueryError>
where
    T: Clone + Send + Sync + 'static,
    F: FnMut(&mut T),
    Fut: Future<Output = Result<R, QueryError>>,
{
    let snapshot = client.optimistic_update::<T, F>(targets, apply);
    debug!(keys = snapshot.len(), "applied optimistic edit");

    match client.with_timeout(write).await {
        Ok(value) => Ok(value),
        Err(err) => {
            let restored = client.restore(snapshot);
            warn!(error = %err, restored, "write failed, rolled back optimistic edit");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::InfiniteData;

    fn key(resource: &str, status: &str) -> QueryKey {
        QueryKey::new(resource).with(status)
    }

    #[tokio::test]
    async fn test_mutation_state_transitions() {
        let mutation = Mutation::new(|n: i32| async move {
            if n > 0 {
                Ok(n * 2)
            } else {
                Err(QueryError::Unauthenticated)
            }
        });
        assert!(mutation.state().is_idle());

        assert_eq!(mutation.mutate(4).await, Ok(8));
        assert!(mutation.is_success());
        assert_eq!(mutation.data(), Some(8));

        assert!(mutation.mutate(0).await.is_err());
        assert!(mutation.is_error());
        assert_eq!(mutation.error(), Some(QueryError::Unauthenticated));

        mutation.reset();
        assert!(mutation.state().is_idle());
    }

    #[tokio::test]
    async fn test_mutation_is_pending_while_running() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let rx = Arc::new(tokio::sync::Mutex::new(Some(rx)));
        let mutation = Mutation::new(move |_: ()| {
            let rx = Arc::clone(&rx);
            async move {
                if let Some(rx) = rx.lock().await.take() {
                    let _ = rx.await;
                }
                Ok(())
            }
        });

        let running = tokio::spawn({
            let mutation = mutation.clone();
            async move { mutation.mutate(()).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(mutation.is_pending());

        tx.send(()).unwrap();
        running.await.unwrap().unwrap();
        assert!(mutation.is_success());
    }

    #[tokio::test]
    async fn test_optimistic_success_keeps_edit() {
        let client = QueryClient::default();
        let k = key("listings", "draft");
        client.set_query_data(k.clone(), InfiniteData::from_pages(vec![vec![3, 5, 7]], 8));

        let result = optimistic::<InfiniteData<i32>, _, _, _>(
            &client,
            &[QueryKey::new("listings")],
            |data| {
                data.remove_where(|x| *x == 5);
            },
            async { Ok::<_, QueryError>(()) },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(
            client.get_query_data::<InfiniteData<i32>>(&k).unwrap().flatten(),
            vec![3, 7]
        );
    }

    #[tokio::test]
    async fn test_optimistic_failure_rolls_back() {
        let client = QueryClient::default();
        let k = key("listings", "draft");
        client.set_query_data(k.clone(), InfiniteData::from_pages(vec![vec![3, 5], vec![7]], 2));

        let result = optimistic::<InfiniteData<i32>, _, _, ()>(
            &client,
            &[QueryKey::new("listings")],
            |data| {
                data.remove_where(|x| *x == 5);
            },
            async { Err(QueryError::Cancelled) },
        )
        .await;

        assert_eq!(result, Err(QueryError::Cancelled));
        assert_eq!(
            client.get_query_data::<InfiniteData<i32>>(&k).unwrap().pages(),
            &[vec![3, 5], vec![7]]
        );
    }
}
