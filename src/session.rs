//! Front-end state for one search screen: active tab, typed query, drop
//! target, loading/failure status and the current result set.
//!
//! Every dispatched request gets a sequence number. Only the completion of the
//! most recently dispatched request is applied; anything older is dropped so a
//! slow response can never overwrite a newer one.

use std::path::{ Path, PathBuf };
use tracing::{ debug, error };

use crate::client::SearchBackend;
use crate::error::{ Result, SearchError };
use crate::media;
use crate::models::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Text,
    Image,
}

impl SearchMode {
    pub fn label(self) -> &'static str {
        match self {
            SearchMode::Text => "Text Search",
            SearchMode::Image => "Image Search",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

/// Feedback for a drag hovering over the image drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropState {
    #[default]
    Idle,
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    Text {
        query: String,
    },
    Image {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub request: SearchRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Dispatched(Ticket),
    Rejected(String),
}

#[derive(Debug, Default)]
pub struct SearchSession {
    mode: SearchMode,
    query: String,
    results: Vec<SearchResult>,
    status: SearchStatus,
    drop_state: DropState,
    latest_seq: u64,
}

fn check_drop(files: &[PathBuf]) -> std::result::Result<&Path, String> {
    match files {
        [] => Err("no file dropped".to_string()),
        [file] if media::is_accepted_image(file) => Ok(file.as_path()),
        [file] => Err(format!("{} is not a .png, .jpg or .jpeg image", file.display())),
        _ => Err(format!("drop exactly one image, got {}", files.len())),
    }
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Switch tabs. The typed query and the shown results are left alone.
    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == SearchStatus::Loading
    }

    pub fn submit_enabled(&self) -> bool {
        !self.is_loading()
    }

    pub fn drop_state(&self) -> DropState {
        self.drop_state
    }

    pub fn drag_over(&mut self, files: &[PathBuf]) -> DropState {
        self.drop_state = if check_drop(files).is_ok() { DropState::Accept } else { DropState::Reject };
        self.drop_state
    }

    pub fn drag_leave(&mut self) {
        self.drop_state = DropState::Idle;
    }

    fn dispatch(&mut self, request: SearchRequest) -> Ticket {
        self.latest_seq += 1;
        self.status = SearchStatus::Loading;
        debug!(seq = self.latest_seq, ?request, "dispatching search");
        Ticket {
            seq: self.latest_seq,
            request,
        }
    }

    /// Start a text search for the current query. Blank queries dispatch nothing.
    pub fn submit_text(&mut self) -> Option<Ticket> {
        if self.query.trim().is_empty() {
            return None;
        }
        let query = self.query.clone();
        Some(self.dispatch(SearchRequest::Text { query }))
    }

    /// Handle files dropped on the image target. Exactly one accepted image dispatches a search.
    pub fn drop_files(&mut self, files: &[PathBuf]) -> DropOutcome {
        self.drop_state = DropState::Idle;
        match check_drop(files) {
            Ok(path) => {
                let path = path.to_path_buf();
                DropOutcome::Dispatched(self.dispatch(SearchRequest::Image { path }))
            }
            Err(reason) => {
                debug!(%reason, "drop rejected");
                DropOutcome::Rejected(reason)
            }
        }
    }

    /// Apply a finished request. Returns false when the completion was stale and ignored.
    pub fn complete(&mut self, seq: u64, outcome: Result<Vec<SearchResult>>) -> bool {
        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, "discarding stale search response");
            return false;
        }
        match outcome {
            Ok(results) => {
                self.results = results;
                self.status = SearchStatus::Idle;
            }
            Err(e) => {
                error!(error = %e, "Error searching");
                self.status = SearchStatus::Failed(e.to_string());
            }
        }
        true
    }
}

/// Perform the HTTP round-trip a ticket describes.
pub async fn execute(backend: &dyn SearchBackend, ticket: &Ticket) -> Result<Vec<SearchResult>> {
    match &ticket.request {
        SearchRequest::Text { query } => backend.search_text(query).await,
        SearchRequest::Image { path } => backend.search_image(path).await,
    }
}

/// Submit the current query and wait for it. Returns false when nothing was dispatched.
pub async fn run_text_search(session: &mut SearchSession, backend: &dyn SearchBackend) -> bool {
    let Some(ticket) = session.submit_text() else {
        return false;
    };
    let outcome = execute(backend, &ticket).await;
    session.complete(ticket.seq, outcome);
    true
}

/// Drop files on the image target and wait for the resulting search, if any.
pub async fn run_image_drop(
    session: &mut SearchSession,
    backend: &dyn SearchBackend,
    files: &[PathBuf]
) -> Result<()> {
    match session.drop_files(files) {
        DropOutcome::Dispatched(ticket) => {
            let outcome = execute(backend, &ticket).await;
            session.complete(ticket.seq, outcome);
            Ok(())
        }
        DropOutcome::Rejected(reason) => Err(SearchError::UnsupportedImage(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Text(String),
        Image(PathBuf),
    }

    /// Records every call and answers with a canned response.
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
        response: Option<Vec<SearchResult>>,
    }

    impl RecordingBackend {
        fn answering(results: Vec<SearchResult>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Some(results),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: None,
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn reply(&self) -> Result<Vec<SearchResult>> {
            match self.response.clone() {
                Some(results) => Ok(results),
                None =>
                    Err(SearchError::Service {
                        status: 500,
                        message: "boom".to_string(),
                    }),
            }
        }
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn search_text(&self, query: &str) -> Result<Vec<SearchResult>> {
            self.calls.lock().unwrap().push(Call::Text(query.to_string()));
            self.reply()
        }

        async fn search_image(&self, path: &Path) -> Result<Vec<SearchResult>> {
            self.calls.lock().unwrap().push(Call::Image(path.to_path_buf()));
            self.reply()
        }
    }

    fn text_result(content: &str, score: f64) -> SearchResult {
        SearchResult {
            id: None,
            kind: ResultKind::Text,
            content: Some(content.to_string()),
            score,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn text_submit_issues_exactly_one_request() {
        let backend = RecordingBackend::answering(vec![text_result("hello", 0.9)]);
        let mut session = SearchSession::new();
        session.set_query("red sunset");

        assert!(run_text_search(&mut session, &backend).await);

        assert_eq!(backend.calls(), vec![Call::Text("red sunset".to_string())]);
        assert_eq!(session.results().len(), 1);
        assert_eq!(session.status(), &SearchStatus::Idle);
    }

    #[tokio::test]
    async fn blank_query_issues_no_request() {
        let backend = RecordingBackend::answering(Vec::new());
        let mut session = SearchSession::new();
        session.set_query("   ");

        assert!(!run_text_search(&mut session, &backend).await);
        assert!(backend.calls().is_empty());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn dropping_one_image_issues_one_request() {
        let backend = RecordingBackend::answering(Vec::new());
        let mut session = SearchSession::new();
        session.set_mode(SearchMode::Image);
        let file = PathBuf::from("/tmp/cat.jpeg");

        run_image_drop(&mut session, &backend, &[file.clone()]).await.unwrap();

        assert_eq!(backend.calls(), vec![Call::Image(file)]);
    }

    #[tokio::test]
    async fn rejected_drops_issue_no_request() {
        let backend = RecordingBackend::answering(Vec::new());
        let mut session = SearchSession::new();

        for files in [
            vec![PathBuf::from("cat.gif")],
            vec![PathBuf::from("notes.txt")],
            vec![],
            vec![PathBuf::from("a.png"), PathBuf::from("b.png")],
        ] {
            let outcome = run_image_drop(&mut session, &backend, &files).await;
            assert!(matches!(outcome, Err(SearchError::UnsupportedImage(_))));
        }
        assert!(backend.calls().is_empty());
        assert!(!session.is_loading());
    }

    #[test]
    fn loading_flag_spans_the_request() {
        let mut session = SearchSession::new();
        session.set_query("balloon");

        let ticket = session.submit_text().unwrap();
        assert!(session.is_loading());
        assert!(!session.submit_enabled());

        session.complete(ticket.seq, Ok(vec![text_result("A red balloon", 0.7)]));
        assert!(!session.is_loading());
        assert!(session.submit_enabled());

        let ticket = session.submit_text().unwrap();
        assert!(session.is_loading());
        session.complete(ticket.seq, Err(SearchError::InvalidInput("bad".into())));
        assert!(!session.is_loading());
    }

    #[test]
    fn failure_keeps_previous_results_and_reports_it() {
        let mut session = SearchSession::new();
        session.set_query("apple");
        let ticket = session.submit_text().unwrap();
        session.complete(ticket.seq, Ok(vec![text_result("A red apple", 0.8)]));

        let ticket = session.submit_text().unwrap();
        session.complete(ticket.seq, Err(SearchError::Service { status: 500, message: "boom".into() }));

        assert_eq!(session.results(), &[text_result("A red apple", 0.8)]);
        assert!(matches!(session.status(), SearchStatus::Failed(msg) if msg.contains("boom")));
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut session = SearchSession::new();
        session.set_query("first");
        let first = session.submit_text().unwrap();
        session.set_query("second");
        let second = session.submit_text().unwrap();
        assert!(second.seq > first.seq);

        // Older response arriving while the newer one is still in flight.
        assert!(!session.complete(first.seq, Ok(vec![text_result("old", 0.1)])));
        assert!(session.is_loading());
        assert!(session.results().is_empty());

        assert!(session.complete(second.seq, Ok(vec![text_result("new", 0.2)])));
        assert!(!session.complete(first.seq, Ok(vec![text_result("old", 0.1)])));
        assert_eq!(session.results(), &[text_result("new", 0.2)]);
    }

    #[test]
    fn switching_mode_keeps_query_and_results() {
        let mut session = SearchSession::new();
        session.set_query("red dress");
        let ticket = session.submit_text().unwrap();
        session.complete(ticket.seq, Ok(vec![text_result("A red dress", 0.6)]));

        session.set_mode(SearchMode::Image);
        session.set_mode(SearchMode::Text);

        assert_eq!(session.query(), "red dress");
        assert_eq!(session.results().len(), 1);
    }

    #[test]
    fn drag_feedback_distinguishes_accept_from_reject() {
        let mut session = SearchSession::new();
        assert_eq!(session.drop_state(), DropState::Idle);
        assert_eq!(session.drag_over(&[PathBuf::from("photo.PNG")]), DropState::Accept);
        assert_eq!(session.drag_over(&[PathBuf::from("clip.mp4")]), DropState::Reject);
        session.drag_leave();
        assert_eq!(session.drop_state(), DropState::Idle);
    }

    #[tokio::test]
    async fn backend_failure_surfaces_failed_state() {
        let backend = RecordingBackend::failing();
        let mut session = SearchSession::new();
        session.set_query("stop sign");

        run_text_search(&mut session, &backend).await;

        assert_eq!(backend.calls().len(), 1);
        assert!(matches!(session.status(), SearchStatus::Failed(_)));
        assert!(!session.is_loading());
    }
}
