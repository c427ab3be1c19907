use git2::{ObjectType, Repository, Tree};

use crate::models::{FileTreeNode, ROOT_PARENT_ID, file_extension};

/// Flatten `tree` into a pre-order list of nodes linked by `parent_id`.
///
/// Ids are assigned from `start_id` in visiting order, so every directory
/// precedes its children. Paths are `base_path`-prefixed and `/`-joined.
pub fn flatten_tree(
    repo: &Repository,
    tree: &Tree,
    base_path: &str,
    start_id: i64,
) -> Vec<FileTreeNode> {
    let mut nodes = Vec::new();
    let mut next_id = start_id;
    walk(repo, tree, base_path, ROOT_PARENT_ID, &mut next_id, &mut nodes);
    nodes
}

fn walk(
    repo: &Repository,
    tree: &Tree,
    base_path: &str,
    parent_id: i64,
    next_id: &mut i64,
    nodes: &mut Vec<FileTreeNode>,
) {
    for entry in tree.iter() {
        let name = String::from_utf8_lossy(entry.name_bytes()).into_owned();
        let path = if base_path.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", base_path, name)
        };

        let id = *next_id;
        *next_id += 1;

        let is_directory = entry.kind() == Some(ObjectType::Tree);
        let (size, extension) = if is_directory {
            (0, None)
        } else {
            // Submodule entries point at commits that are not in this odb.
            let size = repo
                .find_blob(entry.id())
                .map(|blob| blob.size() as u64)
                .unwrap_or(0);
            (size, file_extension(&name))
        };

        nodes.push(FileTreeNode {
            id,
            parent_id,
            name,
            path: path.clone(),
            is_directory,
            object_id: entry.id().to_string(),
            mode: entry.filemode(),
            size,
            extension,
        });

        if is_directory {
            if let Ok(subtree) = repo.find_tree(entry.id()) {
                walk(repo, &subtree, &path, id, next_id, nodes);
            }
        }
    }
}
