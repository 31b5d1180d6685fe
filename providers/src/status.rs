//! Batch processing status derived from consult responses.
//!
//! The service reports "lot not yet processed" as an ordinary return
//! message with a well-known code, so polling loops need a pure predicate
//! over the parsed response rather than string matching on raw bodies.

use crate::wire::ConsultBatchResponse;

/// Return-message code the service uses for a lot still in its queue.
pub const PENDING_CODE: &str = "E92";

/// Where a submitted batch stands, as reported by one consult response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Still queued; consult again later.
    Processing,
    /// Processed and documents were issued.
    Completed,
    /// Processed and rejected; the return messages carry the reasons.
    Rejected,
}

/// Whether a consult response means the lot is still being processed.
///
/// Only the first return message is examined. When the lot is pending the
/// service emits exactly one message carrying [`PENDING_CODE`], and a
/// pending lot never mixes that sentinel with real rejection codes.
#[must_use]
pub fn is_pending(response: &ConsultBatchResponse) -> bool {
    response
        .messages()
        .first()
        .is_some_and(|message| message.code == PENDING_CODE)
}

/// Classifies one consult response into a batch status.
#[must_use]
pub fn batch_status(response: &ConsultBatchResponse) -> BatchStatus {
    if is_pending(response) {
        BatchStatus::Processing
    } else if response.has_documents() {
        BatchStatus::Completed
    } else {
        BatchStatus::Rejected
    }
}
