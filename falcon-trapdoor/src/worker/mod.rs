//! An isolated signing worker reachable only through request/response messages.
//!
//! A [WorkerClient] owns a dedicated thread which in turn owns a [SignatureBackend]. Every
//! request carries a correlation id and receives exactly one response. Requests on one client
//! are served in order; separate clients share no state. Terminating a client (or dropping it)
//! stops the thread and drops the backend together with anything it holds.

use std::{
    io,
    string::{String, ToString},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    vec::Vec,
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::dsa::falcon::FalconLevel;

mod backend;
pub use backend::{BackendError, NativeFalcon, SignatureBackend};

mod protocol;
pub use protocol::{Action, Keypair, Reply, Request, RequestId, Response, SecretBytes};

// WORKER ERROR
// ================================================================================================

/// Errors surfaced to the caller of a [WorkerClient].
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn the worker thread")]
    Spawn(#[source] io::Error),
    #[error("the worker is no longer running")]
    Disconnected,
    #[error("expected a response to request {expected}, received one for {found}")]
    CorrelationMismatch { expected: RequestId, found: RequestId },
    #[error("request {id} ({action}) received an unexpected reply")]
    UnexpectedReply { id: RequestId, action: &'static str },
    #[error("request {id} failed: {reason}")]
    Failed { id: RequestId, reason: String },
}

// WORKER CLIENT
// ================================================================================================

/// The calling side of an isolated worker.
pub struct WorkerClient {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
    next_id: RequestId,
}

impl WorkerClient {
    /// Starts a worker thread serving requests with `backend`.
    pub fn spawn<B: SignatureBackend>(backend: B) -> Result<Self, WorkerError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("falcon-worker".to_string())
            .spawn(move || serve(backend, request_rx, response_tx))
            .map_err(WorkerError::Spawn)?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
            next_id: 0,
        })
    }

    /// Initializes the backend ahead of the first real request.
    pub fn init(&mut self) -> Result<(), WorkerError> {
        match self.call(Action::Init)? {
            (_, Reply::Ready) => Ok(()),
            (id, _) => Err(WorkerError::UnexpectedReply { id, action: "init" }),
        }
    }

    /// Generates a key pair at `level`, returning its encoded public and secret keys.
    pub fn generate_keypair(&mut self, level: FalconLevel) -> Result<Keypair, WorkerError> {
        match self.call(Action::GenerateKeypair { level })? {
            (_, Reply::Keypair(keypair)) => Ok(keypair),
            (id, _) => Err(WorkerError::UnexpectedReply { id, action: "generate_keypair" }),
        }
    }

    /// Signs `message` with the encoded secret key.
    ///
    /// The worker's copy of the secret key is wiped once the request has been served. The
    /// caller remains responsible for its own copy.
    pub fn sign(
        &mut self,
        level: FalconLevel,
        message: &[u8],
        secret_key: &SecretBytes,
    ) -> Result<Vec<u8>, WorkerError> {
        let action = Action::Sign {
            level,
            message: message.to_vec(),
            secret_key: secret_key.clone(),
        };
        match self.call(action)? {
            (_, Reply::Signature(signature)) => Ok(signature),
            (id, _) => Err(WorkerError::UnexpectedReply { id, action: "sign" }),
        }
    }

    /// Checks an encoded signature against an encoded public key.
    pub fn verify(
        &mut self,
        level: FalconLevel,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool, WorkerError> {
        let action = Action::Verify {
            level,
            message: message.to_vec(),
            signature: signature.to_vec(),
            public_key: public_key.to_vec(),
        };
        match self.call(action)? {
            (_, Reply::Verified(valid)) => Ok(valid),
            (id, _) => Err(WorkerError::UnexpectedReply { id, action: "verify" }),
        }
    }

    /// Stops the worker and waits for its thread to exit.
    pub fn terminate(mut self) {
        self.shutdown();
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    fn call(&mut self, action: Action) -> Result<(RequestId, Reply), WorkerError> {
        let id = self.next_id;
        self.next_id += 1;

        let requests = self.requests.as_ref().ok_or(WorkerError::Disconnected)?;
        requests.send(Request { id, action }).map_err(|_| WorkerError::Disconnected)?;

        let response = self.responses.recv().map_err(|_| WorkerError::Disconnected)?;
        if response.id != id {
            return Err(WorkerError::CorrelationMismatch { expected: id, found: response.id });
        }
        response
            .outcome
            .map(|reply| (id, reply))
            .map_err(|reason| WorkerError::Failed { id, reason })
    }

    fn shutdown(&mut self) {
        // closing the request channel ends the worker loop
        self.requests.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("worker thread panicked");
        }
    }
}

impl Drop for WorkerClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// WORKER LOOP
// ================================================================================================

fn serve<B: SignatureBackend>(
    mut backend: B,
    requests: Receiver<Request>,
    responses: Sender<Response>,
) {
    let mut initialized = false;
    for Request { id, action } in requests {
        let name = action.name();
        debug!(id, action = name, "serving request");

        let outcome = handle(&mut backend, &mut initialized, action).map_err(|err| {
            debug!(id, action = name, %err, "request failed");
            err.to_string()
        });
        if responses.send(Response { id, outcome }).is_err() {
            break;
        }
    }
    debug!("worker stopped");
}

fn handle<B: SignatureBackend>(
    backend: &mut B,
    initialized: &mut bool,
    action: Action,
) -> Result<Reply, BackendError> {
    if !*initialized {
        backend.init()?;
        *initialized = true;
    }

    match action {
        Action::Init => Ok(Reply::Ready),
        Action::GenerateKeypair { level } => backend.generate_keypair(level).map(Reply::Keypair),
        Action::Sign { level, message, secret_key } => {
            backend.sign(level, &message, secret_key.as_bytes()).map(Reply::Signature)
        },
        Action::Verify { level, message, signature, public_key } => {
            backend.verify(level, &message, &signature, &public_key).map(Reply::Verified)
        },
    }
}

// TESTS
// ================================================================================================
