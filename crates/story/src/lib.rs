pub mod folder_tree;
