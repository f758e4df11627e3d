use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque folder identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(Arc<str>);

impl FolderId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FolderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FolderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FolderId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for FolderId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One folder of the hierarchy, without its children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
    pub order: f64,
    #[serde(default)]
    pub test_case_count: usize,
}

impl Folder {
    pub fn new(id: impl Into<FolderId>, name: impl Into<String>, order: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            order,
            test_case_count: 0,
        }
    }

    pub fn parent(mut self, parent_id: impl Into<FolderId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn test_cases(mut self, count: usize) -> Self {
        self.test_case_count = count;
        self
    }
}

/// Nested wire form of a folder, as returned by a tree fetch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    #[serde(flatten)]
    pub folder: Folder,
    #[serde(default)]
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    pub fn new(id: impl Into<FolderId>, name: impl Into<String>, order: f64) -> Self {
        Self {
            folder: Folder::new(id, name, order),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: FolderNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn test_cases(mut self, count: usize) -> Self {
        self.folder.test_case_count = count;
        self
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("folder `{0}` appears more than once")]
    DuplicateId(FolderId),
    #[error("folder `{folder}` refers to missing parent `{parent}`")]
    DanglingParent {
        folder: FolderId,
        parent: FolderId,
    },
    #[error("folder `{0}` is its own ancestor")]
    Cycle(FolderId),
    #[error("siblings `{first}` and `{second}` share order {order}")]
    DuplicateOrder {
        first: FolderId,
        second: FolderId,
        order: f64,
    },
    #[error("folder `{folder}` sits at depth {depth}, deeper than the ceiling of {ceiling}")]
    DepthExceeded {
        folder: FolderId,
        depth: usize,
        ceiling: usize,
    },
}

/// Arena of folders keyed by id, plus a parent -> ordered children index.
///
/// The index is derived from `parent_id` and rebuilt whenever a forest is constructed, so a
/// `Forest` is treated as an immutable snapshot: a refetch produces a new value.
#[derive(Clone, Debug, Default)]
pub struct Forest {
    folders: HashMap<FolderId, Folder>,
    roots: Vec<FolderId>,
    children: HashMap<FolderId, Vec<FolderId>>,
}

impl Forest {
    /// Build a forest from flat records linked by `parent_id`.
    pub fn from_records(records: impl IntoIterator<Item = Folder>) -> Result<Self, TreeError> {
        let mut folders = HashMap::new();
        for folder in records {
            if folders.contains_key(&folder.id) {
                return Err(TreeError::DuplicateId(folder.id));
            }
            folders.insert(folder.id.clone(), folder);
        }

        let mut roots = Vec::new();
        let mut children: HashMap<FolderId, Vec<FolderId>> = HashMap::new();
        for folder in folders.values() {
            match folder.parent_id.as_ref() {
                None => roots.push(folder.id.clone()),
                Some(parent_id) => {
                    if !folders.contains_key(parent_id) {
                        return Err(TreeError::DanglingParent {
                            folder: folder.id.clone(),
                            parent: parent_id.clone(),
                        });
                    }
                    children
                        .entry(parent_id.clone())
                        .or_default()
                        .push(folder.id.clone());
                }
            }
        }

        let by_order = |a: &FolderId, b: &FolderId| {
            folders[a]
                .order
                .total_cmp(&folders[b].order)
                .then_with(|| a.cmp(b))
        };
        roots.sort_by(by_order);
        for ids in children.values_mut() {
            ids.sort_by(by_order);
        }

        let forest = Self {
            folders,
            roots,
            children,
        };

        // Anything not reachable from a root hangs off a parent chain that loops back on itself.
        let reachable = forest.preorder().len();
        if reachable < forest.folders.len() {
            let visited: BTreeSet<&FolderId> =
                forest.preorder().into_iter().map(|(_, f)| &f.id).collect();
            let looped = forest
                .folders
                .keys()
                .filter(|id| !visited.contains(id))
                .min()
                .cloned();
            if let Some(id) = looped {
                return Err(TreeError::Cycle(id));
            }
        }

        Ok(forest)
    }

    /// Build a forest from the nested wire form.
    ///
    /// `parent_id` is taken from the nesting, not from the node payload.
    pub fn from_nodes(nodes: impl IntoIterator<Item = FolderNode>) -> Result<Self, TreeError> {
        fn flatten(node: FolderNode, parent_id: Option<FolderId>, out: &mut Vec<Folder>) {
            let FolderNode {
                mut folder,
                children,
            } = node;
            folder.parent_id = parent_id;
            let id = folder.id.clone();
            out.push(folder);
            for child in children {
                flatten(child, Some(id.clone()), out);
            }
        }

        let mut records = Vec::new();
        for node in nodes {
            flatten(node, None, &mut records);
        }
        Self::from_records(records)
    }

    /// Nested wire form, children sorted by order.
    pub fn to_nodes(&self) -> Vec<FolderNode> {
        fn build(forest: &Forest, id: &FolderId) -> FolderNode {
            FolderNode {
                folder: forest.folders[id].clone(),
                children: forest
                    .children_of(id.as_str())
                    .iter()
                    .map(|child| build(forest, child))
                    .collect(),
            }
        }

        self.roots.iter().map(|id| build(self, id)).collect()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.folders.contains_key(id)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Folder> {
        self.folders.get(id)
    }

    pub fn root_ids(&self) -> &[FolderId] {
        &self.roots
    }

    pub fn children_of(&self, id: &str) -> &[FolderId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ordered siblings living under `parent_id` (root level for `None`).
    ///
    /// Empty when the parent is not part of the forest.
    pub fn siblings_of_parent(&self, parent_id: Option<&str>) -> Vec<&Folder> {
        let ids = match parent_id {
            None => self.roots.as_slice(),
            Some(parent_id) => self.children_of(parent_id),
        };
        ids.iter().map(|id| &self.folders[id]).collect()
    }

    /// 1-based depth: root folders sit at depth 1.
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        let mut folder = self.folders.get(id)?;
        let mut depth = 1;
        while let Some(parent_id) = folder.parent_id.as_ref() {
            folder = self.folders.get(parent_id)?;
            depth += 1;
            if depth > self.folders.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Levels below `id`: 0 for a leaf, otherwise one more than the deepest child.
    pub fn max_descendant_depth(&self, id: &str) -> usize {
        self.children_of(id)
            .iter()
            .map(|child| 1 + self.max_descendant_depth(child.as_str()))
            .max()
            .unwrap_or(0)
    }

    /// True when `candidate` is `ancestor` itself or sits anywhere below it.
    pub fn is_descendant_of(&self, candidate: &str, ancestor: &str) -> bool {
        if candidate == ancestor {
            return true;
        }

        let mut steps = 0;
        let mut current = self.folders.get(candidate);
        while let Some(folder) = current {
            let Some(parent_id) = folder.parent_id.as_ref() else {
                return false;
            };
            if parent_id.as_str() == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.folders.len() {
                return false;
            }
            current = self.folders.get(parent_id);
        }
        false
    }

    pub fn flatten_ids(&self) -> BTreeSet<FolderId> {
        self.folders.keys().cloned().collect()
    }

    /// `id` followed by every folder below it, depth first.
    pub fn subtree_ids(&self, id: &str) -> Vec<FolderId> {
        let Some(folder) = self.folders.get(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack = vec![&folder.id];
        while let Some(id) = stack.pop() {
            out.push(id.clone());
            stack.extend(self.children_of(id.as_str()).iter().rev());
        }
        out
    }

    /// Every folder in display order, paired with its depth.
    pub fn preorder(&self) -> Vec<(usize, &Folder)> {
        let mut out = Vec::with_capacity(self.folders.len());
        let mut stack: Vec<(usize, &FolderId)> =
            self.roots.iter().rev().map(|id| (1, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, &self.folders[id]));
            stack.extend(
                self.children_of(id.as_str())
                    .iter()
                    .rev()
                    .map(|child| (depth + 1, child)),
            );
        }
        out
    }

    /// Report the first violated invariant: duplicate sibling orders or a folder deeper than
    /// `depth_ceiling`. Cycles and dangling parents are already rejected at construction.
    pub fn check_invariants(&self, depth_ceiling: usize) -> Result<(), TreeError> {
        let sibling_lists = std::iter::once(&self.roots).chain(self.children.values());
        for ids in sibling_lists {
            for pair in ids.windows(2) {
                let (first, second) = (&self.folders[&pair[0]], &self.folders[&pair[1]]);
                if first.order == second.order {
                    return Err(TreeError::DuplicateOrder {
                        first: first.id.clone(),
                        second: second.id.clone(),
                        order: first.order,
                    });
                }
            }
        }

        for (depth, folder) in self.preorder() {
            if depth > depth_ceiling {
                return Err(TreeError::DepthExceeded {
                    folder: folder.id.clone(),
                    depth,
                    ceiling: depth_ceiling,
                });
            }
        }

        Ok(())
    }
}
