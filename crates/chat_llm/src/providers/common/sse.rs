//! Shared SSE -> [`ChatStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::future::ready;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{ChatError, ChatStream, Result, StreamDelta};

/// One server-sent event as handed to a provider's frame parser:
/// the event name (empty for unnamed events) and the data payload.
pub struct SseFrame<'a> {
    pub event: &'a str,
    pub data: &'a str,
}

/// Turn an SSE HTTP [`Response`] into a [`ChatStream`] of text deltas.
///
/// `parse` runs once per frame. `Ok(None)` skips the frame (comments,
/// role preludes, `[DONE]` markers); `Ok(Some(delta))` emits it. Parse
/// failures and wire-level failures both surface as
/// [`ChatError::Stream`] items.
pub fn sse_delta_stream<P>(response: Response, mut parse: P) -> ChatStream
where
    P: FnMut(SseFrame<'_>) -> Result<Option<StreamDelta>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .filter_map(move |event| {
            let item = match event {
                Ok(event) => parse(SseFrame {
                    event: &event.event,
                    data: &event.data,
                })
                .map_err(|e| match e {
                    ChatError::Stream(msg) => ChatError::Stream(msg),
                    other => ChatError::Stream(other.to_string()),
                })
                .transpose(),
                Err(e) => Some(Err(ChatError::Stream(e.to_string()))),
            };
            ready(item)
        });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn sse_response(body: &str) -> Response {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body.to_string()),
            )
            .mount(&mock_server)
            .await;

        reqwest::Client::new()
            .get(format!("{}/sse", mock_server.uri()))
            .send()
            .await
            .expect("response")
    }

    #[tokio::test]
    async fn frames_reach_the_parser_and_skips_are_dropped() {
        let body = concat!(
            "event: token\n",
            "data: hello\n",
            "\n",
            "event: token\n",
            "data: skip\n",
            "\n",
        );
        let response = sse_response(body).await;

        let mut stream = sse_delta_stream(response, |frame| {
            if frame.data == "skip" {
                return Ok(None);
            }
            Ok(Some(StreamDelta::new(format!(
                "{}:{}",
                frame.event, frame.data
            ))))
        });

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("delta"));
        }

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "token:hello");
    }

    #[tokio::test]
    async fn parse_failures_become_stream_errors() {
        let response = sse_response("data: boom\n\n").await;

        let mut stream =
            sse_delta_stream(response, |_frame| Err(ChatError::Api("boom".to_string())));

        let Some(item) = stream.next().await else {
            panic!("expected one stream item");
        };

        match item {
            Ok(delta) => panic!("expected error, got delta: {delta:?}"),
            Err(ChatError::Stream(msg)) => assert!(msg.contains("API error")),
            Err(other) => panic!("expected ChatError::Stream, got: {other:?}"),
        }
    }
}
