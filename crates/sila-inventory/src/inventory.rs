use std::sync::Arc;

use sila_hierarchy::{DescendantOptions, Hierarchy, HierarchyConfig};
use sila_store::{Documents, Filter, InMemoryDocumentStore};
use sila_types::{Assembly, AssemblyOrPart, NodeId, NodeKind, Part};
use tracing::info;

use crate::error::InventoryResult;
use crate::filters::{AssemblyFilter, NewPart, PartFilter};

/// High-level inventory API.
#[derive(Clone, Debug)]
pub struct Inventory {
    documents: Documents,
    hierarchy: Hierarchy,
}

impl Inventory {
    pub fn new(documents: Documents, config: HierarchyConfig) -> Self {
        let hierarchy = Hierarchy::with_config(documents.clone(), config);
        Self {
            documents,
            hierarchy,
        }
    }

    /// An inventory over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(
            Documents::new(Arc::new(InMemoryDocumentStore::new())),
            HierarchyConfig::default(),
        )
    }

    pub fn documents(&self) -> &Documents {
        &self.documents
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    // ---- Creation ----

    pub async fn create_assembly(&self, name: &str) -> InventoryResult<Assembly> {
        let assembly = Assembly::new(NodeId::generate(), name)?;
        self.documents.insert_document(&assembly).await?;
        info!(id = %assembly.id, name = %assembly.name, "assembly created");
        Ok(assembly)
    }

    pub async fn create_part(&self, new: NewPart) -> InventoryResult<Part> {
        let part = Part::new(NodeId::generate(), new.name)?
            .with_color(new.color)
            .with_material(new.material);
        self.documents.insert_document(&part).await?;
        info!(id = %part.id, name = %part.name, "part created");
        Ok(part)
    }

    // ---- Reads ----

    pub async fn assembly(&self, id: &NodeId) -> InventoryResult<Option<Assembly>> {
        Ok(self.documents.find_by_id(id.as_str()).await?)
    }

    pub async fn part(&self, id: &NodeId) -> InventoryResult<Option<Part>> {
        Ok(self.documents.find_by_id(id.as_str()).await?)
    }

    pub async fn assemblies(&self, filter: AssemblyFilter) -> InventoryResult<Vec<Assembly>> {
        let filter = filter.to_filter()?;
        Ok(self.documents.query().filter(filter).to_list().await?)
    }

    pub async fn parts(&self, filter: PartFilter) -> InventoryResult<Vec<Part>> {
        let filter = filter.to_filter()?;
        Ok(self.documents.query().filter(filter).to_list().await?)
    }

    /// Descendants of an assembly. See [`Hierarchy::descendants`].
    pub async fn children(
        &self,
        assembly_id: &NodeId,
        options: DescendantOptions,
    ) -> InventoryResult<Vec<AssemblyOrPart>> {
        Ok(self.hierarchy.descendants(assembly_id, options).await?)
    }

    /// Ancestor ids of a node, nearest first.
    pub async fn ancestors(&self, kind: NodeKind, id: &NodeId) -> InventoryResult<Vec<NodeId>> {
        Ok(self.hierarchy.ancestor_chain(kind, id).await?)
    }

    /// Position of the first part in `filter`'s listing that satisfies
    /// `predicate`. Linear scan; not for hot paths.
    pub async fn position_of_part(
        &self,
        filter: PartFilter,
        predicate: impl FnMut(&Part) -> bool,
    ) -> InventoryResult<Option<usize>> {
        let filter: Filter = filter.to_filter()?;
        let query = self.documents.query::<Part>().filter(filter);
        Ok(self.documents.index_of(&query, predicate).await?)
    }

    // ---- Mutation ----

    pub async fn reparent_assembly(
        &self,
        id: &NodeId,
        parent: Option<&NodeId>,
    ) -> InventoryResult<()> {
        Ok(self
            .hierarchy
            .reparent(NodeKind::Assembly, id, parent)
            .await?)
    }

    pub async fn reparent_part(&self, id: &NodeId, parent: Option<&NodeId>) -> InventoryResult<()> {
        Ok(self.hierarchy.reparent(NodeKind::Part, id, parent).await?)
    }

    /// Delete an assembly and orphan its direct children.
    pub async fn delete_assembly(&self, id: &NodeId) -> InventoryResult<()> {
        Ok(self
            .hierarchy
            .delete_cascade_orphan(NodeKind::Assembly, id)
            .await?)
    }

    pub async fn delete_part(&self, id: &NodeId) -> InventoryResult<()> {
        Ok(self
            .hierarchy
            .delete_cascade_orphan(NodeKind::Part, id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use sila_store::StoreError;
    use sila_types::TypeError;

    fn with_store() -> (Arc<InMemoryDocumentStore>, Inventory) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let inventory = Inventory::new(Documents::new(store.clone()), HierarchyConfig::default());
        (store, inventory)
    }

    #[tokio::test]
    async fn get_after_create_returns_equal_record() {
        let inventory = Inventory::in_memory();
        let assembly = inventory.create_assembly("Chassis").await.unwrap();
        assert_eq!(inventory.assembly(&assembly.id).await.unwrap(), Some(assembly));

        let part = inventory
            .create_part(NewPart {
                name: "Bolt".into(),
                color: Some("silver".into()),
                material: Some("steel".into()),
            })
            .await
            .unwrap();
        assert_eq!(inventory.part(&part.id).await.unwrap(), Some(part.clone()));
        assert!(part.parent_id.is_none());
    }

    #[tokio::test]
    async fn blank_name_rejected_before_insert() {
        let (store, inventory) = with_store();
        let err = inventory.create_assembly("   ").await.unwrap_err();
        assert!(matches!(err, InventoryError::Type(TypeError::InvalidName(_))));
        assert!(inventory.create_part(NewPart::named("")).await.is_err());
        assert_eq!(store.stats().total(), 0);
    }

    #[tokio::test]
    async fn missing_entities_are_none() {
        let inventory = Inventory::in_memory();
        let id = NodeId::generate();
        assert!(inventory.assembly(&id).await.unwrap().is_none());
        assert!(inventory.part(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_select_by_parent() {
        let inventory = Inventory::in_memory();
        let top = inventory.create_assembly("Frame").await.unwrap();
        let sub = inventory.create_assembly("Wheel").await.unwrap();
        inventory.reparent_assembly(&sub.id, Some(&top.id)).await.unwrap();

        let tops = inventory
            .assemblies(AssemblyFilter {
                top_level_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tops, vec![top.clone()]);

        let subs = inventory
            .assemblies(AssemblyFilter {
                sub_assemblies_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].parent_id.as_ref(), Some(&top.id));

        assert_eq!(inventory.assemblies(AssemblyFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exclusive_list_flags_make_no_store_call() {
        let (store, inventory) = with_store();
        let err = inventory
            .assemblies(AssemblyFilter {
                top_level_only: true,
                sub_assemblies_only: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidFilterCombination { .. }));

        let err = inventory
            .parts(PartFilter {
                component_parts_only: true,
                orphan_parts_only: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidFilterCombination { .. }));

        let err = inventory
            .children(
                &NodeId::generate(),
                DescendantOptions {
                    first_level_only: true,
                    leaves_only: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidFilterCombination { .. }));
        assert_eq!(store.stats().total(), 0);
    }

    #[tokio::test]
    async fn orphan_and_component_parts() {
        let inventory = Inventory::in_memory();
        let frame = inventory.create_assembly("Frame").await.unwrap();
        let bolt = inventory.create_part(NewPart::named("Bolt")).await.unwrap();
        let nut = inventory.create_part(NewPart::named("Nut")).await.unwrap();
        inventory.reparent_part(&bolt.id, Some(&frame.id)).await.unwrap();

        let orphans = inventory
            .parts(PartFilter {
                orphan_parts_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(orphans, vec![nut]);

        let components = inventory
            .parts(PartFilter {
                component_parts_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].id, bolt.id);
    }

    #[tokio::test]
    async fn position_of_part_within_listing() {
        let inventory = Inventory::in_memory();
        for name in ["Bolt", "Nut", "Washer"] {
            inventory.create_part(NewPart::named(name)).await.unwrap();
        }
        let pos = inventory
            .position_of_part(PartFilter::default(), |p| p.name == "Washer")
            .await
            .unwrap();
        assert_eq!(pos, Some(2));
        let pos = inventory
            .position_of_part(PartFilter::default(), |p| p.name == "Gear")
            .await
            .unwrap();
        assert_eq!(pos, None);
    }

    #[tokio::test]
    async fn delete_part_removes_only_that_part() {
        let inventory = Inventory::in_memory();
        let bolt = inventory.create_part(NewPart::named("Bolt")).await.unwrap();
        let nut = inventory.create_part(NewPart::named("Nut")).await.unwrap();
        inventory.delete_part(&bolt.id).await.unwrap();
        assert!(inventory.part(&bolt.id).await.unwrap().is_none());
        assert!(inventory.part(&nut.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_store_error() {
        let (store, inventory) = with_store();
        store.set_available(false);
        let err = inventory.create_assembly("Frame").await.unwrap_err();
        assert!(matches!(err, InventoryError::Store(StoreError::Unavailable(_))));

        let err = inventory
            .delete_assembly(&NodeId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn strict_inventory_reports_integrity_failures() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let inventory = Inventory::new(
            Documents::new(store),
            HierarchyConfig {
                enforce_parent_integrity: true,
            },
        );
        let bolt = inventory.create_part(NewPart::named("Bolt")).await.unwrap();
        let err = inventory
            .reparent_part(&bolt.id, Some(&NodeId::generate()))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Hierarchy(ref e) if e.is_integrity()));
    }
}
