// Copyright 2024, The Tremor Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::{
    client::EventsApi,
    model::{AuditEvent, Category, EventKind, ItemUsage, RawEvent, SigninAttempt},
    page::{PageRequest, PageResponse, Window},
};
use log::{debug, info};
use one2sen_common::{Error, Result};
use std::{sync::Arc, time::Duration};

/// Fetches every page of `T` in `window`, in arrival order.
///
/// The first request carries the window, every following request only the
/// cursor of the previous response. Stops when `has_more` is false.
///
/// # Errors
/// * whatever the api returns
/// * `Protocol` for undecodable pages, a populated error envelope, `has_more`
///   without a cursor or more than `max_rounds` pages
pub async fn fetch_pages<T: EventKind>(
    api: &dyn EventsApi,
    window: &Window,
    page_limit: u32,
    max_rounds: u32,
) -> Result<Vec<T>> {
    let category = T::CATEGORY;
    let endpoint = category.endpoint();
    let mut items = Vec::new();
    let mut request = PageRequest::window(page_limit, window);

    for round in 1..=max_rounds {
        debug!("fetching {category} events, round {round}");
        let body = api.post(endpoint, &request).await?;
        let page: PageResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            Error::Protocol(format!("could not decode {category} response: {e}"))
        })?;
        if let Some(msg) = page.error_message() {
            return Err(Error::Protocol(format!("{category} returned error: {msg}")));
        }
        items.extend(page.items.unwrap_or_default());
        if !page.has_more {
            debug!("retrieved {} {category} events in {round} rounds", items.len());
            return Ok(items);
        }
        if page.cursor.is_empty() {
            return Err(Error::Protocol(format!(
                "{category} signalled more pages without a cursor"
            )));
        }
        request = PageRequest::cursor(page.cursor);
    }
    Err(Error::Protocol(format!(
        "{category} still had more pages after {max_rounds} rounds"
    )))
}

/// Fetches the events of a category over a lookback window
#[derive(Clone)]
pub struct Fetcher {
    api: Arc<dyn EventsApi>,
    page_limit: u32,
    max_rounds: u32,
}

impl Fetcher {
    /// Creates a fetcher on top of `api`
    #[must_use]
    pub fn new(api: Arc<dyn EventsApi>, page_limit: u32, max_rounds: u32) -> Self {
        Self {
            api,
            page_limit,
            max_rounds,
        }
    }

    /// Fetches all events of `category` in `[now - lookback, now]`. The window is
    /// fixed before the first request.
    ///
    /// # Errors
    /// see [`fetch_pages`]
    pub async fn fetch(&self, category: Category, lookback: Duration) -> Result<Vec<RawEvent>> {
        self.fetch_window(category, &Window::lookback(lookback)).await
    }

    /// Fetches all events of `category` in `window`
    ///
    /// # Errors
    /// see [`fetch_pages`]
    pub async fn fetch_window(&self, category: Category, window: &Window) -> Result<Vec<RawEvent>> {
        let events = match category {
            Category::Signin => self.typed::<SigninAttempt>(window).await?,
            Category::Usage => self.typed::<ItemUsage>(window).await?,
            Category::Audit => self.typed::<AuditEvent>(window).await?,
        };
        info!("fetched {} {category} events", events.len());
        Ok(events)
    }

    async fn typed<T: EventKind>(&self, window: &Window) -> Result<Vec<RawEvent>> {
        let items =
            fetch_pages::<T>(self.api.as_ref(), window, self.page_limit, self.max_rounds).await?;
        Ok(items.into_iter().map(EventKind::into_raw).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::{collections::VecDeque, sync::Mutex};

    /// Replays canned responses and records every request
    #[derive(Default)]
    struct Recorder {
        responses: Mutex<VecDeque<Result<Vec<u8>>>>,
        requests: Mutex<Vec<(String, PageRequest)>>,
    }

    impl Recorder {
        fn with_pages(pages: Vec<serde_json::Value>) -> Self {
            let r = Self::default();
            if let Ok(mut q) = r.responses.lock() {
                q.extend(pages.into_iter().map(|p| Ok(p.to_string().into_bytes())));
            }
            r
        }

        fn requests(&self) -> Vec<(String, PageRequest)> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl EventsApi for Recorder {
        async fn post(&self, endpoint: &str, request: &PageRequest) -> Result<Vec<u8>> {
            if let Ok(mut r) = self.requests.lock() {
                r.push((endpoint.to_string(), request.clone()));
            }
            self.responses
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| Err(Error::Protocol("no more canned responses".to_string())))
        }
    }

    fn page(cursor: &str, has_more: bool, uuids: &[&str]) -> serde_json::Value {
        let items: Vec<_> = uuids
            .iter()
            .map(|u| json!({"uuid": u, "timestamp": "2024-01-15T10:30:00Z"}))
            .collect();
        json!({"cursor": cursor, "has_more": has_more, "items": items})
    }

    fn window() -> Window {
        Window::lookback(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn follows_cursors_until_done() -> Result<()> {
        let api = Recorder::with_pages(vec![
            page("c1", true, &["a", "b"]),
            page("c2", true, &["c"]),
            page("c3", false, &["d", "e"]),
        ]);
        let w = window();
        let items = fetch_pages::<ItemUsage>(&api, &w, 100, 10).await?;
        let uuids: Vec<_> = items.iter().map(|i| i.uuid.as_str()).collect();
        assert_eq!(uuids, ["a", "b", "c", "d", "e"]);

        let requests = api.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|(e, _)| e == "itemusages"));
        assert_eq!(requests[0].1, PageRequest::window(100, &w));
        assert_eq!(requests[1].1, PageRequest::cursor("c1".to_string()));
        assert_eq!(requests[2].1, PageRequest::cursor("c2".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn single_page() -> Result<()> {
        let api = Recorder::with_pages(vec![page("", false, &[])]);
        let items = fetch_pages::<SigninAttempt>(&api, &window(), 100, 10).await?;
        assert!(items.is_empty());
        assert_eq!(api.requests().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn null_items_are_empty() -> Result<()> {
        let api = Recorder::with_pages(vec![json!({
            "cursor": "x",
            "has_more": false,
            "items": null
        })]);
        let items = fetch_pages::<AuditEvent>(&api, &window(), 100, 10).await?;
        assert!(items.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn error_envelope_is_fatal() {
        let api = Recorder::with_pages(vec![
            json!({
                "cursor": "",
                "has_more": false,
                "items": [],
                "Error": {"Message": "invalid token"}
            }),
        ]);
        let res = fetch_pages::<SigninAttempt>(&api, &window(), 100, 10).await;
        match res {
            Err(Error::Protocol(msg)) => assert!(msg.contains("invalid token"), "{msg}"),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_page_is_protocol_error() {
        let api = Recorder::default();
        if let Ok(mut q) = api.responses.lock() {
            q.push_back(Ok(b"<html>".to_vec()));
        }
        let res = fetch_pages::<SigninAttempt>(&api, &window(), 100, 10).await;
        assert!(matches!(res, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn more_without_cursor_is_protocol_error() {
        let api = Recorder::with_pages(vec![page("", true, &["a"])]);
        let res = fetch_pages::<SigninAttempt>(&api, &window(), 100, 10).await;
        assert!(matches!(res, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn round_cap() {
        let api = Recorder::with_pages(
            (0..5)
                .map(|i| page(&format!("c{i}"), true, &["a"]))
                .collect(),
        );
        let res = fetch_pages::<SigninAttempt>(&api, &window(), 100, 3).await;
        assert!(matches!(res, Err(Error::Protocol(_))));
        assert_eq!(api.requests().len(), 3);
    }

    #[tokio::test]
    async fn api_errors_propagate() {
        let api = Recorder::default();
        if let Ok(mut q) = api.responses.lock() {
            q.push_back(Err(Error::Auth {
                status: 401,
                body: String::new(),
            }));
        }
        let res = fetch_pages::<SigninAttempt>(&api, &window(), 100, 3).await;
        assert!(matches!(res, Err(Error::Auth { .. })));
    }

    #[tokio::test]
    async fn fetcher_tags_events() -> Result<()> {
        let api = Arc::new(Recorder::with_pages(vec![page("", false, &["a", "b"])]));
        let fetcher = Fetcher::new(api.clone(), 50, 10);
        let events = fetcher.fetch(Category::Audit, Duration::from_secs(60)).await?;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.category() == Category::Audit));
        let requests = api.requests();
        assert_eq!(requests[0].0, "auditevents");
        assert!(matches!(requests[0].1, PageRequest::Window { limit: 50, .. }));
        Ok(())
    }

    #[test]
    fn no_request_mixes_cursor_and_window() -> serde_json::Result<()> {
        for req in [
            PageRequest::window(10, &window()),
            PageRequest::cursor("c".to_string()),
        ] {
            let v = serde_json::to_value(&req)?;
            let has_cursor = v.get("cursor").is_some();
            let has_window = v.get("start_time").is_some() || v.get("end_time").is_some();
            assert!(has_cursor != has_window, "{v}");
        }
        Ok(())
    }
}
