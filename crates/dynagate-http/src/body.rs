//! Response body type.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;

/// Response body for DynamoDB HTTP responses.
///
/// Every response is a single buffered JSON payload, sent as one frame.
#[derive(Debug, Default)]
pub struct DynamoDBResponseBody {
    data: Option<Bytes>,
}

impl DynamoDBResponseBody {
    /// Create a response body from a JSON payload.
    #[must_use]
    pub fn from_json(json: impl Into<Bytes>) -> Self {
        let data = json.into();
        Self {
            data: (!data.is_empty()).then_some(data),
        }
    }

    /// Create an empty response body.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl http_body::Body for DynamoDBResponseBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().data.take().map(|data| Ok(http_body::Frame::data(data))))
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_none()
    }

    fn size_hint(&self) -> http_body::SizeHint {
        let len = self.data.as_ref().map_or(0, Bytes::len);
        http_body::SizeHint::with_exact(u64::try_from(len).unwrap_or(u64::MAX))
    }
}
