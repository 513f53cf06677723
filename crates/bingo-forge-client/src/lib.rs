//! Async client for the remote board store.
//!
//! The store is a small form-POST API keyed by opaque board identifiers:
//! boards are created from their interchange JSON (minus the board-level
//! category counts, which stay local), and tiles are claimed per cell.
//! Responses are passed through as raw JSON; their shape belongs to the
//! store, not to this crate.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use bingo_forge_core::Board;

/// Result type alias for board store operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while talking to a board store.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport or non-success status error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Board serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Client for one board store instance.
pub struct BoardStoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl BoardStoreClient {
    /// Create a client for the store at `base_url`. Trailing slashes are
    /// normalized away.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        base_url.push('/');
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// The normalized base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a board on the store and return its raw response, which
    /// carries the store-assigned board identifier.
    pub async fn upload(&self, board: &Board, allow_multiple_claims: bool) -> ClientResult<Value> {
        let payload = upload_payload(board)?;
        self.call(
            "create-board.php",
            &[
                ("boardJson", payload),
                (
                    "allow_multiple_claims",
                    if allow_multiple_claims { "1" } else { "0" }.to_string(),
                ),
            ],
        )
        .await
    }

    /// Delete a stored board.
    pub async fn delete(&self, board_id: i64) -> ClientResult<Value> {
        self.call("delete-board.php", &[("boardId", board_id.to_string())])
            .await
    }

    /// List every board the store knows about.
    pub async fn boards(&self) -> ClientResult<Value> {
        self.call("get-boards.php", &[]).await
    }

    /// Fetch the tiles of a stored board.
    pub async fn board_tiles(&self, board_id: i64) -> ClientResult<Value> {
        self.call("get-board-tiles.php", &[("boardId", board_id.to_string())])
            .await
    }

    /// Fetch the claim state of a stored board.
    pub async fn board_claims(&self, board_id: i64) -> ClientResult<Value> {
        self.call("get-board-claims.php", &[("boardId", board_id.to_string())])
            .await
    }

    /// Claim the tile at `(x, y)` for a single-character claimer tag.
    pub async fn claim_tile(
        &self,
        board_id: i64,
        x: usize,
        y: usize,
        claimer: char,
    ) -> ClientResult<Value> {
        self.call(
            "claim-board-tile.php",
            &[
                ("boardId", board_id.to_string()),
                ("x", x.to_string()),
                ("y", y.to_string()),
                ("claim", claimer.to_string()),
            ],
        )
        .await
    }

    async fn call(&self, endpoint: &str, form: &[(&str, String)]) -> ClientResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "board_store_request");
        let response = self.client.post(&url).form(form).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }
}

/// Board JSON sent to the store: the interchange form minus the board-level
/// `categories` counts, which are generation bookkeeping and stay local.
pub fn upload_payload(board: &Board) -> ClientResult<String> {
    let mut value = serde_json::to_value(board)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("categories");
    }
    Ok(value.to_string())
}
