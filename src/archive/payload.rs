//! Contents of one nested package archive.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::constants::{ACTION_FLOW_NODE_TYPE, NODES_DIR, PACKAGE_DESCRIPTOR_FILE_NAME};
use crate::core::PackportError;

const DESCRIPTOR_ALIASES: [&str; 3] = [PACKAGE_DESCRIPTOR_FILE_NAME, "package.yaml", "package.json"];

/// A child asset file of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFile {
    /// Path below `nodes/`.
    pub path: String,
    pub content: Vec<u8>,
}

impl NodeFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Declared node type (`type` field of the YAML/JSON document), if readable.
    #[must_use]
    pub fn node_type(&self) -> Option<String> {
        let document: serde_yaml::Value = serde_yaml::from_slice(&self.content).ok()?;
        document.get("type")?.as_str().map(str::to_string)
    }

    #[must_use]
    pub fn is_action_flow(&self) -> bool {
        self.node_type().as_deref() == Some(ACTION_FLOW_NODE_TYPE)
    }
}

/// Package descriptor plus child node files of one package version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagePayload {
    pub descriptor: Vec<u8>,
    pub nodes: Vec<NodeFile>,
}

impl PackagePayload {
    /// Unpacks a package zip, as returned by the backend export endpoint or stored as a
    /// nested archive.
    ///
    /// Entries other than the descriptor and files below `nodes/` are ignored.
    pub fn from_zip(bytes: &[u8]) -> Result<Self, PackportError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut descriptor = None;
        let mut nodes = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().replace('\\', "/");

            if DESCRIPTOR_ALIASES.contains(&name.as_str()) {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                descriptor = Some(buffer);
            } else if let Some(path) = name.strip_prefix(NODES_DIR) {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                nodes.push(NodeFile::new(path, buffer));
            } else {
                tracing::debug!("Ignoring unexpected package entry '{}'", name);
            }
        }

        let descriptor = descriptor.ok_or_else(|| PackportError::ArchiveEntryMissing {
            name: PACKAGE_DESCRIPTOR_FILE_NAME.to_string(),
        })?;

        Ok(Self {
            descriptor,
            nodes,
        })
    }

    /// Drops every action-flow node.
    #[must_use]
    pub fn without_action_flows(mut self) -> Self {
        let before = self.nodes.len();
        self.nodes.retain(|node| !node.is_action_flow());
        if self.nodes.len() != before {
            tracing::debug!("Filtered {} action-flow node(s)", before - self.nodes.len());
        }
        self
    }

    /// Serializes the payload as a nested package zip.
    ///
    /// Action-flow nodes are never written, whatever the payload holds.
    pub fn to_zip(&self) -> Result<Vec<u8>, PackportError> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            zip.start_file(PACKAGE_DESCRIPTOR_FILE_NAME, options)?;
            zip.write_all(&self.descriptor)?;

            zip.add_directory(NODES_DIR, options)?;
            for node in self.nodes.iter().filter(|node| !node.is_action_flow()) {
                zip.start_file(format!("{NODES_DIR}{}", node.path), options)?;
                zip.write_all(&node.content)?;
            }

            zip.finish()?;
        }
        Ok(cursor.into_inner())
    }
}
