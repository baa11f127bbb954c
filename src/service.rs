// WHY: orchestrator-facing entry point owning one worker per operation kind
// Wire shapes mirror the request/event messages exchanged with a UI or a JSON-lines client

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::matcher::{find_matches_with_progress, QuoteSpan};
use crate::tokenizer::{tokenize_with_progress, Word};
use crate::worker::{OperationKind, OperationWorker, RequestHandle, RequestId, WorkerError, WorkerEvent};

/// Input of one match request; both sides are shared, immutable word sequences
#[derive(Debug, Clone)]
pub struct MatchInput {
    pub source_words: Arc<[Word]>,
    pub query_words: Arc<[Word]>,
}

/// Request message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Request {
    Tokenize {
        text: String,
    },
    Match {
        #[serde(rename = "sourceWords")]
        source_words: Vec<Word>,
        #[serde(rename = "queryWords")]
        query_words: Vec<Word>,
    },
}

impl Request {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Tokenize { .. } => OperationKind::Tokenize,
            Self::Match { .. } => OperationKind::Match,
        }
    }
}

/// Result payload of either operation; serializes as a bare array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Words(Vec<Word>),
    Quotes(Vec<QuoteSpan>),
}

/// An in-flight request of either kind
#[derive(Debug)]
pub enum PendingRequest {
    Tokenize(RequestHandle<Vec<Word>>),
    Match(RequestHandle<Vec<QuoteSpan>>),
}

impl PendingRequest {
    pub fn id(&self) -> RequestId {
        match self {
            Self::Tokenize(handle) => handle.id(),
            Self::Match(handle) => handle.id(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Tokenize(handle) => handle.kind(),
            Self::Match(handle) => handle.kind(),
        }
    }

    /// Next event with the result wrapped as a `Response`
    pub async fn next_event(&mut self) -> Option<WorkerEvent<Response>> {
        match self {
            Self::Tokenize(handle) => handle.next_event().await.map(|e| e.map(Response::Words)),
            Self::Match(handle) => handle.next_event().await.map(|e| e.map(Response::Quotes)),
        }
    }
}

/// Runs tokenize and match requests off the caller's thread
///
/// Each operation kind has its own worker, started on first use. A worker accepts one
/// request at a time; a second request of the same kind fails with `WorkerError::Busy`
/// until the first has delivered its result.
pub struct QuoteService {
    tokenizer: OperationWorker<String, Vec<Word>>,
    matcher: OperationWorker<MatchInput, Vec<QuoteSpan>>,
}

impl Default for QuoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteService {
    pub fn new() -> Self {
        info!("Creating quote service");
        Self {
            tokenizer: OperationWorker::new(OperationKind::Tokenize, |text: String, progress: &mut dyn FnMut(u8)| {
                tokenize_with_progress(&text, progress)
            }),
            matcher: OperationWorker::new(OperationKind::Match, |input: MatchInput, progress: &mut dyn FnMut(u8)| {
                find_matches_with_progress(&input.source_words, &input.query_words, progress)
            }),
        }
    }

    /// Tokenize `text` on the tokenize worker
    pub fn tokenize(&self, text: impl Into<String>) -> Result<RequestHandle<Vec<Word>>, WorkerError> {
        self.tokenizer.submit(text.into())
    }

    /// Search `query_words` for runs of `source_words` on the match worker
    pub fn find_matches(
        &self,
        source_words: impl Into<Arc<[Word]>>,
        query_words: impl Into<Arc<[Word]>>,
    ) -> Result<RequestHandle<Vec<QuoteSpan>>, WorkerError> {
        self.matcher.submit(MatchInput {
            source_words: source_words.into(),
            query_words: query_words.into(),
        })
    }

    /// Dispatch a wire request to the matching worker
    pub fn submit(&self, request: Request) -> Result<PendingRequest, WorkerError> {
        match request {
            Request::Tokenize { text } => self.tokenize(text).map(PendingRequest::Tokenize),
            Request::Match {
                source_words,
                query_words,
            } => self
                .find_matches(source_words, query_words)
                .map(PendingRequest::Match),
        }
    }

    pub fn tokenize_worker(&self) -> &OperationWorker<String, Vec<Word>> {
        &self.tokenizer
    }

    pub fn match_worker(&self) -> &OperationWorker<MatchInput, Vec<QuoteSpan>> {
        &self.matcher
    }
}
