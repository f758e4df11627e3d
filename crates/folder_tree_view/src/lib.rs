mod tree;

pub use tree::{
    FolderTree, FolderTreeEntry, FolderTreeEvent, FolderTreeRowState, FolderTreeState, folder_tree,
};
