//! SSE 실시간 스트림 핸들러.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use pulse_core::models::event::MetricEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;

use super::connection_id;
use crate::error::ApiError;
use crate::hub::HubSubscription;
use crate::AppState;

/// SSE 스트림 엔드포인트
///
/// GET /api/stream
///
/// 허브 이벤트 하나당 SSE 이벤트 하나. 이벤트 이름은 이벤트 종류
/// (`metric_update` 등), 데이터는 와이어 JSON. 클라이언트가 끊으면
/// 스트림이 drop되면서 허브 엔드포인트도 해제된다.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let client_id = connection_id("sse");
    let (subscription, rx) = HubSubscription::open(state.hub.clone(), &client_id, state.client_buffer)?;

    let sse_stream = ReceiverStream::new(rx).filter_map(move |event| {
        // 구독 가드는 스트림 수명 동안 유지
        let _guard = &subscription;
        to_sse_event(&event).map(Ok)
    });

    Ok(Sse::new(sse_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// 이벤트 → SSE 이벤트. 직렬화 실패 시 스킵.
fn to_sse_event(event: &MetricEvent) -> Option<Event> {
    match event.encode() {
        Ok(json) => Some(Event::default().event(event.kind.as_str()).data(json)),
        Err(e) => {
            debug!("SSE 이벤트 직렬화 실패: {e}");
            None
        }
    }
}
