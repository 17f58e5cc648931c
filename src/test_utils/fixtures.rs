//! Test fixtures for catalog nodes, dependency edges and package zips.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::constants::{ACTION_FLOW_FLAVOR, PACKAGE_DESCRIPTOR_FILE_NAME, STUDIO_FLAVOR};
use crate::models::{DependencyEdge, PackageNode};

/// Draft id the fixtures assign to the active version of node `id`.
pub fn active_draft(id: &str) -> String {
    format!("{id}-active")
}

/// Catalog node `key` with id `id`, an active draft and no space.
pub fn package(key: &str, id: &str) -> PackageNode {
    PackageNode {
        id: id.to_string(),
        key: key.to_string(),
        name: key.to_uppercase(),
        working_draft_id: Some(format!("{id}-working")),
        activated_draft_id: Some(active_draft(id)),
        ..Default::default()
    }
}

pub fn studio_package(key: &str, id: &str, space_id: &str) -> PackageNode {
    PackageNode {
        flavor: Some(STUDIO_FLAVOR.to_string()),
        space_id: Some(space_id.to_string()),
        ..package(key, id)
    }
}

pub fn action_flow_package(key: &str, id: &str) -> PackageNode {
    PackageNode {
        flavor: Some(ACTION_FLOW_FLAVOR.to_string()),
        ..package(key, id)
    }
}

/// Edge to `key@version` whose draft id is `draft`.
pub fn edge(key: &str, version: &str, draft: &str) -> DependencyEdge {
    DependencyEdge {
        key: key.to_string(),
        version: version.to_string(),
        root_node_id: Some(draft.to_string()),
    }
}

/// A package zip as the backend export endpoint returns it.
///
/// `nodes` are `(file name, node type)` pairs written below `nodes/`.
pub fn package_zip(key: &str, version: &str, nodes: &[(&str, &str)]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default();

        let descriptor = format!("key: {key}\nversion: {version}\n");
        zip.start_file(PACKAGE_DESCRIPTOR_FILE_NAME, options).expect("start descriptor");
        zip.write_all(descriptor.as_bytes()).expect("write descriptor");

        for (name, node_type) in nodes {
            zip.start_file(format!("nodes/{name}"), options).expect("start node");
            zip.write_all(format!("key: {name}\ntype: {node_type}\n").as_bytes())
                .expect("write node");
        }

        zip.finish().expect("finish package zip");
    }
    cursor.into_inner()
}
