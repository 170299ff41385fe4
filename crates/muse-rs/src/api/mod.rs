//! Boundary with the generation service.
//!
//! [`GenerationService`] is the seam between the
//! [`Conversation`](crate::conversation::Conversation) driver and the network:
//! [`OpenAiClient`](crate::OpenAiClient) implements it over HTTP, tests
//! implement it with scripted replies. Failures are reported as
//! [`GenerationError`] and never escape a turn; the driver turns them into
//! apology messages.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::{ChatRequest, ImageRequest, OpenAiClient};

/// Why a generation call produced no usable output.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport failure, including timeouts.
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    /// The response could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The response carried no text or no image URL.
    #[error("empty response")]
    Empty,
}

/// Boxed future returned by [`GenerationService`] methods.
pub type GenerationFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, GenerationError>> + Send + 'a>>;

/// Text and image generation, one request per call.
pub trait GenerationService: Send + Sync {
    /// Produce a single non-empty text reply for the payload.
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> GenerationFuture<'a, String>;

    /// Produce the URL of one generated image.
    fn illustrate<'a>(&'a self, request: &'a ImageRequest) -> GenerationFuture<'a, String>;
}

impl GenerationService for OpenAiClient {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> GenerationFuture<'a, String> {
        Box::pin(async move {
            let completion = self.chat(request).await?;
            completion
                .content
                .filter(|text| !text.trim().is_empty())
                .ok_or(GenerationError::Empty)
        })
    }

    fn illustrate<'a>(&'a self, request: &'a ImageRequest) -> GenerationFuture<'a, String> {
        Box::pin(self.generate_image(request))
    }
}

impl<S: GenerationService + ?Sized> GenerationService for std::sync::Arc<S> {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> GenerationFuture<'a, String> {
        (**self).complete(request)
    }

    fn illustrate<'a>(&'a self, request: &'a ImageRequest) -> GenerationFuture<'a, String> {
        (**self).illustrate(request)
    }
}
