use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    DeleteSummary, Folder, FolderId, FolderNode, FolderStore, Forest, StoreError, TreeConfig,
};

/// A [`FolderStore`] kept in memory that enforces the same rules a server would.
pub struct MemoryFolderStore {
    config: TreeConfig,
    records: Mutex<HashMap<FolderId, Folder>>,
    next_id: AtomicU64,
}

impl MemoryFolderStore {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seed the store with an existing tree; it has to satisfy every invariant already.
    pub fn with_tree(config: TreeConfig, nodes: Vec<FolderNode>) -> Result<Self, StoreError> {
        let forest = Forest::from_nodes(nodes)?;
        forest.check_invariants(config.depth_ceiling)?;
        let records = forest
            .preorder()
            .into_iter()
            .map(|(_, folder)| (folder.id.clone(), folder.clone()))
            .collect();
        Ok(Self {
            config,
            records: Mutex::new(records),
            next_id: AtomicU64::new(1),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<FolderId, Folder>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Transport("folder store lock poisoned".into()))
    }

    fn snapshot(records: &HashMap<FolderId, Folder>) -> Result<Forest, StoreError> {
        Ok(Forest::from_records(records.values().cloned())?)
    }

    fn fresh_id(&self, records: &HashMap<FolderId, Folder>) -> FolderId {
        loop {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed);
            let id = FolderId::from(format!("folder-{n}"));
            if !records.contains_key(&id) {
                return id;
            }
        }
    }

    /// Order strictly after every sibling: `floor(max) + 1`, or 1 for an empty level.
    ///
    /// Past 2^53 adding one no longer moves an `f64`, so the step grows with the magnitude.
    fn append_order(
        forest: &Forest,
        parent_id: Option<&FolderId>,
        skip: Option<&FolderId>,
    ) -> Result<f64, StoreError> {
        let Some(max) = forest
            .siblings_of_parent(parent_id.map(FolderId::as_str))
            .into_iter()
            .filter(|folder| Some(&folder.id) != skip)
            .map(|folder| folder.order)
            .reduce(f64::max)
        else {
            return Ok(1.0);
        };

        [max.floor() + 1.0, max + max.abs().max(1.0)]
            .into_iter()
            .find(|order| order.is_finite() && *order > max)
            .ok_or(StoreError::AppendOrderExhausted(max))
    }

    fn depth_below(
        &self,
        forest: &Forest,
        parent_id: Option<&FolderId>,
    ) -> Result<usize, StoreError> {
        match parent_id {
            None => Ok(0),
            Some(parent_id) => forest
                .depth_of(parent_id.as_str())
                .ok_or_else(|| StoreError::MissingParent(parent_id.clone())),
        }
    }
}

#[async_trait]
impl FolderStore for MemoryFolderStore {
    async fn fetch_folder_tree(&self) -> Result<Vec<FolderNode>, StoreError> {
        let records = self.lock()?;
        Ok(Self::snapshot(&records)?.to_nodes())
    }

    async fn move_folder(
        &self,
        folder_id: &FolderId,
        new_parent_id: Option<&FolderId>,
        new_order: Option<f64>,
    ) -> Result<Folder, StoreError> {
        let mut records = self.lock()?;
        let forest = Self::snapshot(&records)?;
        if !forest.contains(folder_id.as_str()) {
            return Err(StoreError::NotFound(folder_id.clone()));
        }

        let parent_depth = self.depth_below(&forest, new_parent_id)?;
        if let Some(parent_id) = new_parent_id
            && forest.is_descendant_of(parent_id.as_str(), folder_id.as_str())
        {
            return Err(StoreError::IntoDescendant {
                folder: folder_id.clone(),
                parent: parent_id.clone(),
            });
        }

        let reach = parent_depth + 1 + forest.max_descendant_depth(folder_id.as_str());
        if reach > self.config.depth_ceiling {
            return Err(StoreError::DepthExceeded {
                folder: folder_id.clone(),
                depth: reach,
                ceiling: self.config.depth_ceiling,
            });
        }

        let order = match new_order {
            Some(order) if !order.is_finite() => return Err(StoreError::InvalidOrder(order)),
            Some(order) => {
                let taken = forest
                    .siblings_of_parent(new_parent_id.map(FolderId::as_str))
                    .into_iter()
                    .find(|sibling| sibling.id != *folder_id && sibling.order == order);
                if let Some(sibling) = taken {
                    return Err(StoreError::OrderTaken {
                        order,
                        sibling: sibling.id.clone(),
                    });
                }
                order
            }
            None => Self::append_order(&forest, new_parent_id, Some(folder_id))?,
        };

        let folder = records
            .get_mut(folder_id)
            .ok_or_else(|| StoreError::NotFound(folder_id.clone()))?;
        folder.parent_id = new_parent_id.cloned();
        folder.order = order;
        info!(
            folder = %folder_id,
            parent = ?new_parent_id.map(FolderId::as_str),
            order,
            "moved folder"
        );
        Ok(folder.clone())
    }

    async fn rename_folder(
        &self,
        folder_id: &FolderId,
        new_name: &str,
    ) -> Result<Folder, StoreError> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let mut records = self.lock()?;
        let folder = records
            .get_mut(folder_id)
            .ok_or_else(|| StoreError::NotFound(folder_id.clone()))?;
        folder.name = name.to_string();
        debug!(folder = %folder_id, name, "renamed folder");
        Ok(folder.clone())
    }

    async fn delete_folder(&self, folder_id: &FolderId) -> Result<DeleteSummary, StoreError> {
        let mut records = self.lock()?;
        let forest = Self::snapshot(&records)?;
        if !forest.contains(folder_id.as_str()) {
            return Err(StoreError::NotFound(folder_id.clone()));
        }

        let mut summary = DeleteSummary::default();
        for id in forest.subtree_ids(folder_id.as_str()) {
            if let Some(folder) = records.remove(&id) {
                summary.deleted_test_cases += folder.test_case_count;
                summary.deleted_folder_ids.push(id);
            }
        }
        info!(
            folder = %folder_id,
            folders = summary.deleted_folder_ids.len(),
            test_cases = summary.deleted_test_cases,
            "deleted folder subtree"
        );
        Ok(summary)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&FolderId>,
    ) -> Result<Folder, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let mut records = self.lock()?;
        let forest = Self::snapshot(&records)?;

        let depth = self.depth_below(&forest, parent_id)? + 1;
        if depth > self.config.depth_ceiling
            && let Some(parent) = parent_id
        {
            return Err(StoreError::ParentAtCeiling {
                parent: parent.clone(),
                ceiling: self.config.depth_ceiling,
            });
        }
        let order = Self::append_order(&forest, parent_id, None)?;

        let id = self.fresh_id(&records);
        let folder = Folder {
            id: id.clone(),
            name: name.to_string(),
            parent_id: parent_id.cloned(),
            order,
            test_case_count: 0,
        };
        records.insert(id, folder.clone());
        info!(folder = %folder.id, depth, "created folder");
        Ok(folder)
    }
}
