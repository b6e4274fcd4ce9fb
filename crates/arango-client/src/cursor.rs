//! Lazily paginated server-side cursors.
//!
//! A [`Cursor`] sends nothing until it is first pulled. It then creates the
//! server cursor with `POST /_api/cursor` and advances it batch by batch with
//! `PUT /_api/cursor/{id}`, holding at most one batch in memory.
//!
//! Abandoned cursors are left for the server to reclaim; [`Cursor::close`]
//! is available when an explicit `DELETE` is wanted.

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transport::HttpResponse;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

const CURSOR_PATH: &str = "/_api/cursor";

/// Options forwarded to cursor creation.
///
/// Unset fields fall back to the connection's cursor defaults. Bind
/// variables are not an option: they always come from the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorOptions {
    /// Ask the server for the total row count
    pub count: Option<bool>,
    /// Rows per batch
    pub batch_size: Option<u32>,
}

impl CursorOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Request (or skip) the total count
    pub fn count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// Where a cursor is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing fetched yet
    Unstarted,
    /// Server cursor exists; more rows may follow
    Active,
    /// All rows handed out
    Exhausted,
    /// A fetch failed; terminal
    Failed,
}

type Decoder<T> = Arc<dyn Fn(Value) -> Result<T> + Send + Sync>;

#[derive(Serialize)]
struct CreateCursorBody<'a> {
    query: &'a str,
    count: bool,
    #[serde(rename = "batchSize")]
    batch_size: Option<u32>,
    #[serde(rename = "bindVars")]
    bind_vars: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CursorResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "hasMore")]
    has_more: bool,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    result: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(default, rename = "errorNum")]
    error_num: Option<i64>,
}

/// Forward-only, single-pass iteration over a query result
pub struct Cursor<T = Value> {
    connection: Connection,
    query: String,
    count: bool,
    batch_size: Option<u32>,
    bind_vars: Map<String, Value>,
    cursor_id: Option<String>,
    has_more: bool,
    batch: VecDeque<Value>,
    // `None` until the create request returns; then the head of the result
    head: Option<Option<Value>>,
    total: Option<u64>,
    state: CursorState,
    decoder: Decoder<T>,
}

impl<T> std::fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("query", &self.query)
            .field("state", &self.state)
            .field("cursor_id", &self.cursor_id)
            .field("buffered", &self.batch.len())
            .field("total", &self.total)
            .finish()
    }
}

impl Cursor<Value> {
    /// Cursor yielding raw JSON rows. Performs no I/O.
    pub fn new(
        connection: Connection,
        query: String,
        bind_vars: Map<String, Value>,
        options: CursorOptions,
    ) -> Self {
        let defaults = connection.cursor_defaults();
        let count = options.count.unwrap_or(defaults.count);
        let batch_size = options.batch_size.or(defaults.batch_size);

        Self {
            connection,
            query,
            count,
            batch_size,
            bind_vars,
            cursor_id: None,
            has_more: true,
            batch: VecDeque::new(),
            head: None,
            total: None,
            state: CursorState::Unstarted,
            decoder: Arc::new(Ok::<Value, Error>),
        }
    }
}

impl<T> Cursor<T> {
    /// Replace the row decoder
    pub fn with_decoder<U, F>(self, decoder: F) -> Cursor<U>
    where
        F: Fn(Value) -> Result<U> + Send + Sync + 'static,
    {
        Cursor {
            connection: self.connection,
            query: self.query,
            count: self.count,
            batch_size: self.batch_size,
            bind_vars: self.bind_vars,
            cursor_id: self.cursor_id,
            has_more: self.has_more,
            batch: self.batch,
            head: self.head,
            total: self.total,
            state: self.state,
            decoder: Arc::new(decoder),
        }
    }

    /// Query text sent to the server
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Bind variables sent with the query
    pub fn bind_vars(&self) -> &Map<String, Value> {
        &self.bind_vars
    }

    /// Whether the create request asks for a count
    pub fn wants_count(&self) -> bool {
        self.count
    }

    /// Requested batch size
    pub fn batch_size(&self) -> Option<u32> {
        self.batch_size
    }

    /// Current state
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Server cursor id, once one exists
    pub fn cursor_id(&self) -> Option<&str> {
        self.cursor_id.as_deref()
    }

    /// Total row count, if already known
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Pull the next decoded row; `Ok(None)` once exhausted.
    pub async fn next_row(&mut self) -> Result<Option<T>> {
        loop {
            match self.state {
                CursorState::Failed => return Err(Error::CursorFailed),
                CursorState::Exhausted => return Ok(None),
                CursorState::Unstarted | CursorState::Active => {}
            }

            if let Some(row) = self.batch.pop_front() {
                return (self.decoder)(row).map(Some);
            }

            if self.state == CursorState::Unstarted || self.has_more {
                self.fetch_batch(self.count).await?;
                continue;
            }

            self.finish();
            return Ok(None);
        }
    }

    /// The first row of the full result, regardless of how far iteration
    /// has progressed.
    ///
    /// Fetches the first batch if nothing has been fetched yet. A cursor
    /// closed before its first fetch falls back to a one-row query.
    pub async fn first(&mut self) -> Result<Option<T>> {
        match self.state {
            CursorState::Failed => return Err(Error::CursorFailed),
            CursorState::Unstarted => self.fetch_batch(self.count).await?,
            CursorState::Active | CursorState::Exhausted => {}
        }

        let head = match &self.head {
            Some(head) => head.clone(),
            None => self.fetch_row_at(0).await?,
        };
        head.map(|row| (self.decoder)(row)).transpose()
    }

    /// The last row of the full result.
    ///
    /// Runs a separate one-row query at offset `total - 1`; the iteration
    /// position of this cursor is not affected.
    pub async fn last(&mut self) -> Result<Option<T>> {
        if self.state == CursorState::Failed {
            return Err(Error::CursorFailed);
        }

        let total = self.len().await?;
        if total == 0 {
            return Ok(None);
        }

        let row = self.fetch_row_at(total - 1).await?;
        row.map(|row| (self.decoder)(row)).transpose()
    }

    /// Total number of rows reported by the server.
    ///
    /// Fetched at most once. An unstarted cursor performs its first fetch
    /// with counting forced on; a started cursor without a count issues a
    /// separate count request.
    pub async fn len(&mut self) -> Result<u64> {
        if let Some(total) = self.total {
            return Ok(total);
        }

        match self.state {
            CursorState::Failed => return Err(Error::CursorFailed),
            CursorState::Unstarted => self.fetch_batch(true).await?,
            CursorState::Active | CursorState::Exhausted => {
                let query = self.query.clone();
                let response = self.create(&query, true, Some(1)).await?;
                self.total = response.count;
                self.discard(&response).await?;
            }
        }

        self.total.ok_or_else(|| {
            Error::InvalidResponse("server did not report a result count".to_string())
        })
    }

    /// Whether the full result is empty
    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Delete the server cursor if it still holds unread batches.
    ///
    /// Buffered rows are dropped and the cursor becomes exhausted.
    pub async fn close(&mut self) -> Result<()> {
        if let (Some(id), true) = (self.cursor_id.as_deref(), self.has_more) {
            let url = self.connection.url(&advance_path(id));
            debug!("Closing cursor {}", id);
            let response = self.connection.transport().delete(&url).await?;
            check_status(&response)?;
        }

        if self.state != CursorState::Failed {
            self.finish();
        }
        Ok(())
    }

    /// Consume the cursor as a stream of decoded rows
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        stream::try_unfold(self, |mut cursor| async move {
            Ok::<_, Error>(cursor.next_row().await?.map(|row| (row, cursor)))
        })
    }

    fn finish(&mut self) {
        self.state = CursorState::Exhausted;
        self.has_more = false;
        self.cursor_id = None;
        self.batch.clear();
    }

    async fn fetch_batch(&mut self, count: bool) -> Result<()> {
        let outcome = match (self.state, self.cursor_id.clone()) {
            (CursorState::Unstarted, _) => {
                let query = self.query.clone();
                self.create(&query, count, self.batch_size).await
            }
            (_, Some(id)) => self.advance(&id).await,
            (_, None) => Err(Error::InvalidResponse(
                "server reported more results without a cursor id".to_string(),
            )),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                self.state = CursorState::Failed;
                self.cursor_id = None;
                self.has_more = false;
                self.batch.clear();
                return Err(err);
            }
        };

        debug!(
            rows = response.result.len(),
            has_more = response.has_more,
            "fetched cursor batch"
        );

        if self.state == CursorState::Unstarted {
            self.head = Some(response.result.first().cloned());
        }
        if response.id.is_some() {
            self.cursor_id = response.id;
        }
        self.has_more = response.has_more;
        if self.total.is_none() {
            self.total = response.count;
        }
        self.batch = response.result.into();
        self.state = CursorState::Active;
        Ok(())
    }

    async fn create(
        &self,
        query: &str,
        count: bool,
        batch_size: Option<u32>,
    ) -> Result<CursorResponse> {
        let body = serde_json::to_string(&CreateCursorBody {
            query,
            count,
            batch_size,
            bind_vars: &self.bind_vars,
        })?;
        let url = self.connection.url(CURSOR_PATH);
        let response = self.connection.transport().post(&url, Some(body)).await?;
        parse_response(response)
    }

    /// Single row at `offset` via a separate one-row cursor
    async fn fetch_row_at(&self, offset: u64) -> Result<Option<Value>> {
        let query = format!("FOR row IN ({}) LIMIT {}, 1 RETURN row", self.query, offset);
        let response = self.create(&query, false, Some(1)).await?;
        self.discard(&response).await?;
        Ok(response.result.into_iter().next())
    }

    /// Delete a side cursor the server still holds open
    async fn discard(&self, response: &CursorResponse) -> Result<()> {
        if let (Some(id), true) = (response.id.as_deref(), response.has_more) {
            let url = self.connection.url(&advance_path(id));
            debug!("Discarding side cursor {}", id);
            let response = self.connection.transport().delete(&url).await?;
            check_status(&response)?;
        }
        Ok(())
    }

    async fn advance(&self, id: &str) -> Result<CursorResponse> {
        let url = self.connection.url(&advance_path(id));
        let response = self.connection.transport().put(&url, None).await?;
        parse_response(response)
    }
}

fn advance_path(id: &str) -> String {
    format!("{}/{}", CURSOR_PATH, urlencoding::encode(id))
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }

    let body: ErrorBody = response.json().unwrap_or_default();
    let message = body
        .error_message
        .unwrap_or_else(|| response.text.clone());
    let code = body.error_num.unwrap_or(0);
    warn!(status = response.status, code, "AQL request failed: {}", message);

    Err(Error::Query {
        message,
        code,
        status: response.status,
    })
}

fn parse_response(response: HttpResponse) -> Result<CursorResponse> {
    check_status(&response)?;
    Ok(response.json()?)
}
