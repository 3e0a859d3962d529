//! A gateway whose calls wait for the test to answer them.
//!
//! Every call on a [`ScriptedGateway`] parks until the test takes it from the
//! paired [`CallQueue`] and responds. That lets a test hold several calls
//! open at once and resolve them in any order, which is how refresh and
//! mutation races are reproduced deterministically.

use std::time::Duration;

use async_trait::async_trait;
use listsync_core::{Document, OrderKey, Predicate, RecordId};
use listsync_gateway::{Gateway, GatewayError, Result};
use tokio::sync::{mpsc, oneshot};

use crate::flaky::Operation;

/// How long [`CallQueue::next`] waits before giving up.
const NEXT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// A call made on the scripted gateway, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List {
        entity: String,
        order: Option<OrderKey>,
        limit: Option<usize>,
    },
    Filter {
        entity: String,
        predicate: Predicate,
        order: Option<OrderKey>,
        limit: Option<usize>,
    },
    Create {
        entity: String,
        draft: Document,
    },
    Update {
        entity: String,
        id: RecordId,
        patch: Document,
    },
    Delete {
        entity: String,
        id: RecordId,
    },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::List { .. } => Operation::List,
            Call::Filter { .. } => Operation::Filter,
            Call::Create { .. } => Operation::Create,
            Call::Update { .. } => Operation::Update,
            Call::Delete { .. } => Operation::Delete,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            Call::List { entity, .. }
            | Call::Filter { entity, .. }
            | Call::Create { entity, .. }
            | Call::Update { entity, .. }
            | Call::Delete { entity, .. } => entity,
        }
    }
}

enum Reply {
    Documents(Result<Vec<Document>>),
    Document(Result<Document>),
    Unit(Result<()>),
}

/// A parked call awaiting a response.
///
/// Dropping it without responding fails the call with a transport error.
#[derive(Debug)]
pub struct PendingCall {
    call: Call,
    reply: oneshot::Sender<Reply>,
}

impl PendingCall {
    pub fn call(&self) -> &Call {
        &self.call
    }

    pub fn operation(&self) -> Operation {
        self.call.operation()
    }

    /// Answer a `list` or `filter` call.
    pub fn respond_documents(self, documents: Vec<Document>) {
        self.send(Reply::Documents(Ok(documents)));
    }

    /// Answer a `create` or `update` call.
    pub fn respond_document(self, document: Document) {
        self.send(Reply::Document(Ok(document)));
    }

    /// Answer a `delete` call.
    pub fn respond_ok(self) {
        self.send(Reply::Unit(Ok(())));
    }

    /// Fail the call with `error`.
    pub fn fail(self, error: GatewayError) {
        let reply = match self.call.operation() {
            Operation::List | Operation::Filter => Reply::Documents(Err(error)),
            Operation::Create | Operation::Update => Reply::Document(Err(error)),
            Operation::Delete => Reply::Unit(Err(error)),
        };
        self.send(reply);
    }

    /// Run the call against `gateway` and answer with its result.
    pub async fn forward<G: Gateway + ?Sized>(self, gateway: &G) {
        let reply = match &self.call {
            Call::List {
                entity,
                order,
                limit,
            } => Reply::Documents(gateway.list(entity, order.as_ref(), *limit).await),
            Call::Filter {
                entity,
                predicate,
                order,
                limit,
            } => Reply::Documents(
                gateway
                    .filter(entity, predicate, order.as_ref(), *limit)
                    .await,
            ),
            Call::Create { entity, draft } => {
                Reply::Document(gateway.create(entity, draft.clone()).await)
            }
            Call::Update { entity, id, patch } => {
                Reply::Document(gateway.update(entity, id, patch.clone()).await)
            }
            Call::Delete { entity, id } => Reply::Unit(gateway.delete(entity, id).await),
        };
        self.send(reply);
    }

    fn send(self, reply: Reply) {
        // The caller may have given up (timeout, cancelled task); that is fine.
        let _ = self.reply.send(reply);
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Documents(r) => f.debug_tuple("Documents").field(&r.as_ref().map(Vec::len)).finish(),
            Reply::Document(r) => f.debug_tuple("Document").field(&r.is_ok()).finish(),
            Reply::Unit(r) => f.debug_tuple("Unit").field(&r.is_ok()).finish(),
        }
    }
}

/// The test's end of a scripted gateway: calls arrive here in order.
#[derive(Debug)]
pub struct CallQueue {
    calls: mpsc::UnboundedReceiver<PendingCall>,
}

impl CallQueue {
    /// Wait for the next call.
    ///
    /// Panics if none arrives within five seconds, so a missing call fails
    /// the test instead of hanging it.
    pub async fn next(&mut self) -> PendingCall {
        match tokio::time::timeout(NEXT_CALL_TIMEOUT, self.calls.recv()).await {
            Ok(Some(call)) => call,
            Ok(None) => panic!("scripted gateway dropped while waiting for a call"),
            Err(_) => panic!("no gateway call within {:?}", NEXT_CALL_TIMEOUT),
        }
    }

    /// Take the next call if one is already parked.
    pub fn try_next(&mut self) -> Option<PendingCall> {
        self.calls.try_recv().ok()
    }

    /// Panic if a call is parked.
    pub fn assert_idle(&mut self) {
        if let Some(pending) = self.try_next() {
            panic!("unexpected gateway call: {:?}", pending.call());
        }
    }
}

/// A gateway whose every call is answered by the test.
#[derive(Debug, Clone)]
pub struct ScriptedGateway {
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl ScriptedGateway {
    /// Create a gateway and the queue its calls arrive on.
    pub fn new() -> (Self, CallQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { calls: tx }, CallQueue { calls: rx })
    }

    async fn park(&self, call: Call) -> Result<Reply> {
        let (reply, response) = oneshot::channel();
        self.calls
            .send(PendingCall { call, reply })
            .map_err(|_| GatewayError::Transport("call queue dropped".into()))?;
        response
            .await
            .map_err(|_| GatewayError::Transport("call dropped without a response".into()))
    }
}

fn mismatched() -> GatewayError {
    GatewayError::Transport("scripted reply does not match the call".into())
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn list(
        &self,
        entity: &str,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let call = Call::List {
            entity: entity.to_string(),
            order: order.cloned(),
            limit,
        };
        match self.park(call).await? {
            Reply::Documents(result) => result,
            _ => Err(mismatched()),
        }
    }

    async fn filter(
        &self,
        entity: &str,
        predicate: &Predicate,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let call = Call::Filter {
            entity: entity.to_string(),
            predicate: predicate.clone(),
            order: order.cloned(),
            limit,
        };
        match self.park(call).await? {
            Reply::Documents(result) => result,
            _ => Err(mismatched()),
        }
    }

    async fn create(&self, entity: &str, draft: Document) -> Result<Document> {
        let call = Call::Create {
            entity: entity.to_string(),
            draft,
        };
        match self.park(call).await? {
            Reply::Document(result) => result,
            _ => Err(mismatched()),
        }
    }

    async fn update(&self, entity: &str, id: &RecordId, patch: Document) -> Result<Document> {
        let call = Call::Update {
            entity: entity.to_string(),
            id: id.clone(),
            patch,
        };
        match self.park(call).await? {
            Reply::Document(result) => result,
            _ => Err(mismatched()),
        }
    }

    async fn delete(&self, entity: &str, id: &RecordId) -> Result<()> {
        let call = Call::Delete {
            entity: entity.to_string(),
            id: id.clone(),
        };
        match self.park(call).await? {
            Reply::Unit(result) => result,
            _ => Err(mismatched()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::document;
    use listsync_gateway::MemoryGateway;
    use serde_json::json;

    #[tokio::test]
    async fn test_calls_park_until_answered() {
        let (gateway, mut queue) = ScriptedGateway::new();
        let task = tokio::spawn(async move { gateway.list("Message", None, Some(3)).await });

        let pending = queue.next().await;
        assert_eq!(
            pending.call(),
            &Call::List {
                entity: "Message".into(),
                order: None,
                limit: Some(3),
            }
        );
        pending.respond_documents(vec![document(json!({ "id": "a" }))]);

        let docs = task.await.unwrap().unwrap();
        assert_eq!(docs.len(), 1);
        queue.assert_idle();
    }

    #[tokio::test]
    async fn test_answers_out_of_order() {
        let (gateway, mut queue) = ScriptedGateway::new();
        let first = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.delete("Row", &RecordId::new("1")).await }
        });
        let first_call = queue.next().await;
        let second = tokio::spawn(async move { gateway.delete("Row", &RecordId::new("2")).await });
        let second_call = queue.next().await;

        second_call.respond_ok();
        assert!(second.await.unwrap().is_ok());
        first_call.fail(GatewayError::Rejected("no".into()));
        assert!(matches!(
            first.await.unwrap(),
            Err(GatewayError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_call_fails_and_wrong_reply_fails() {
        let (gateway, mut queue) = ScriptedGateway::new();
        let task = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.create("Row", Document::new()).await }
        });
        drop(queue.next().await);
        assert!(matches!(
            task.await.unwrap(),
            Err(GatewayError::Transport(_))
        ));

        let task = tokio::spawn(async move { gateway.create("Row", Document::new()).await });
        queue.next().await.respond_ok();
        assert!(task.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_forward_to_real_gateway() {
        let backend = MemoryGateway::new();
        let (gateway, mut queue) = ScriptedGateway::new();
        let task = tokio::spawn(async move {
            gateway
                .create("Message", document(json!({ "text": "hi" })))
                .await
        });

        queue.next().await.forward(&backend).await;
        let created = task.await.unwrap().unwrap();
        assert_eq!(created["text"], json!("hi"));
        assert_eq!(backend.count("Message").unwrap(), 1);
    }
}
