pub mod tokenizer;
pub mod matcher;
pub mod progress;
pub mod worker;
pub mod service;
pub mod report;
pub mod reader;

// Re-export main types for convenient access
pub use tokenizer::{tokenize, tokenize_with_progress, Word};
pub use matcher::{find_matches, find_matches_with_progress, QuoteSpan, MIN_RUN_LENGTH};

// Re-export the async execution contract
pub use worker::{
    OperationKind, OperationWorker, RequestHandle, RequestId,
    WorkerError, WorkerEvent, WorkerState
};
pub use service::{MatchInput, PendingRequest, QuoteService, Request, Response};
