//! Target space resolution for import.

use anyhow::{Context, Result};

use crate::api::PlatformApi;
use crate::constants::DEFAULT_SPACE_ICON;
use crate::core::PackportError;
use crate::models::SpaceDescriptor;

/// Resolves the space a package is imported into, creating it when needed.
///
/// Resolution order for a descriptor:
///
/// 1. an explicit id must name an existing space, otherwise the import fails;
/// 2. an existing space with the same name is reused;
/// 3. a new space is created with the descriptor's name.
///
/// Spaces created by this mapper join its known set, so later entries naming the same
/// space reuse it instead of creating a duplicate.
pub struct SpaceMapper<'a> {
    api: &'a dyn PlatformApi,
    spaces: Vec<SpaceDescriptor>,
}

impl<'a> SpaceMapper<'a> {
    pub fn new(api: &'a dyn PlatformApi, spaces: Vec<SpaceDescriptor>) -> Self {
        Self {
            api,
            spaces,
        }
    }

    /// Spaces known to the mapper, including the ones it created.
    #[must_use]
    pub fn spaces(&self) -> &[SpaceDescriptor] {
        &self.spaces
    }

    pub async fn resolve(&mut self, descriptor: &SpaceDescriptor) -> Result<SpaceDescriptor> {
        if let Some(id) = descriptor.id.as_deref() {
            return self
                .spaces
                .iter()
                .find(|space| space.id.as_deref() == Some(id))
                .cloned()
                .ok_or_else(|| {
                    PackportError::SpaceNotFound {
                        id: id.to_string(),
                    }
                    .into()
                });
        }

        if let Some(existing) = self.spaces.iter().find(|space| space.name == descriptor.name) {
            tracing::debug!("Using existing space '{}'", existing.name);
            return Ok(existing.clone());
        }

        if descriptor.name.trim().is_empty() {
            return Err(PackportError::ValidationError {
                reason: "Space descriptor has neither an id nor a name".to_string(),
            }
            .into());
        }

        let icon = descriptor.icon_reference.as_deref().unwrap_or(DEFAULT_SPACE_ICON);
        let created = self
            .api
            .create_space(&descriptor.name, icon)
            .await
            .with_context(|| format!("Failed to create space '{}'", descriptor.name))?;
        tracing::info!("Created space '{}'", created.name);

        self.spaces.push(created.clone());
        Ok(created)
    }
}
