use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{Folder, FolderId, FolderNode, Forest, MoveCommand, TreeError};

/// Result of a cascading folder delete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_folder_ids: Vec<FolderId>,
    pub deleted_test_cases: usize,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("folder `{0}` not found")]
    NotFound(FolderId),
    #[error("parent folder `{0}` does not exist")]
    MissingParent(FolderId),
    #[error("cannot move `{folder}` into its own subtree at `{parent}`")]
    IntoDescendant {
        folder: FolderId,
        parent: FolderId,
    },
    #[error("`{folder}` would reach depth {depth}, past the ceiling of {ceiling}")]
    DepthExceeded {
        folder: FolderId,
        depth: usize,
        ceiling: usize,
    },
    #[error("no folder can be added under `{parent}`, it already sits at the ceiling of {ceiling}")]
    ParentAtCeiling {
        parent: FolderId,
        ceiling: usize,
    },
    #[error("order {order} is already taken by sibling `{sibling}`")]
    OrderTaken {
        order: f64,
        sibling: FolderId,
    },
    #[error("order {0} is not a finite number")]
    InvalidOrder(f64),
    #[error("no order fits after the last sibling at {0}")]
    AppendOrderExhausted(f64),
    #[error("folder name must not be empty")]
    EmptyName,
    #[error("stored tree is malformed")]
    Malformed(#[from] TreeError),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Persistence side of the folder tree: the server, or anything standing in for it.
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// Full forest, nested, children sorted by order.
    async fn fetch_folder_tree(&self) -> Result<Vec<FolderNode>, StoreError>;

    /// Re-parent `folder_id` and optionally set its order; `None` asks the store to append.
    async fn move_folder(
        &self,
        folder_id: &FolderId,
        new_parent_id: Option<&FolderId>,
        new_order: Option<f64>,
    ) -> Result<Folder, StoreError>;

    async fn rename_folder(&self, folder_id: &FolderId, new_name: &str)
    -> Result<Folder, StoreError>;

    /// Remove `folder_id` with everything below it.
    async fn delete_folder(&self, folder_id: &FolderId) -> Result<DeleteSummary, StoreError>;

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&FolderId>,
    ) -> Result<Folder, StoreError>;
}

/// Fetch the whole tree and rebuild the arena from it.
pub async fn refresh_forest<S>(store: &S) -> Result<Forest, StoreError>
where
    S: FolderStore + ?Sized,
{
    let nodes = store.fetch_folder_tree().await?;
    Ok(Forest::from_nodes(nodes)?)
}

/// Persist a finished drag, then refetch the authoritative tree.
///
/// Failures are logged here and returned so the caller keeps showing the tree it already has;
/// nothing is retried or rolled back.
pub async fn commit_move<S>(store: &S, command: &MoveCommand) -> Result<Forest, StoreError>
where
    S: FolderStore + ?Sized,
{
    let moved = store
        .move_folder(
            &command.folder_id,
            command.new_parent_id.as_ref(),
            command.new_order,
        )
        .await
        .inspect_err(|err| error!(folder = %command.folder_id, "move failed: {err}"))?;
    info!(
        folder = %moved.id,
        parent = ?moved.parent_id.as_ref().map(FolderId::as_str),
        order = moved.order,
        "folder moved"
    );

    refresh_forest(store)
        .await
        .inspect_err(|err| error!("tree refresh after move failed: {err}"))
}
