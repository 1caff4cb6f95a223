use std::collections::{HashSet, VecDeque};

use sila_store::{Documents, FieldPath, Filter};
use sila_types::{fields, Assembly, AssemblyOrPart, Node, NodeId, NodeKind, Part};
use tracing::{debug, info, warn};

use crate::error::{HierarchyError, HierarchyResult};
use crate::options::{DescendantOptions, HierarchyConfig};

/// The assembly/part forest stored in a [`Documents`] service.
///
/// The engine holds no state of its own. Every operation reads the current
/// `parentId` links from the store, so concurrent writers are visible
/// between round trips.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    documents: Documents,
    config: HierarchyConfig,
}

impl Hierarchy {
    pub fn new(documents: Documents) -> Self {
        Self::with_config(documents, HierarchyConfig::default())
    }

    pub fn with_config(documents: Documents, config: HierarchyConfig) -> Self {
        Self { documents, config }
    }

    pub fn documents(&self) -> &Documents {
        &self.documents
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    /// Ancestors of a node, nearest first.
    ///
    /// The walk follows `parentId` until it reaches a root. A parent id that
    /// resolves to no assembly is still reported, but nothing past it is. A
    /// missing start node has no ancestors. An id seen twice means the data
    /// contains a cycle; the walk stops there.
    pub async fn ancestor_chain(&self, kind: NodeKind, id: &NodeId) -> HierarchyResult<Vec<NodeId>> {
        let start = match kind {
            NodeKind::Assembly => self.parent_of::<Assembly>(id).await?,
            NodeKind::Part => self.parent_of::<Part>(id).await?,
        };
        let Some(mut next) = start else {
            debug!(%kind, %id, "ancestor chain of missing node");
            return Ok(Vec::new());
        };

        // Part ids live in their own namespace and never recur as parents.
        let mut visited = HashSet::new();
        if kind == NodeKind::Assembly {
            visited.insert(id.clone());
        }

        let mut chain = Vec::new();
        while let Some(parent) = next {
            if !visited.insert(parent.clone()) {
                warn!(%kind, %id, repeated = %parent, "parent cycle detected, ancestor chain truncated");
                break;
            }
            chain.push(parent.clone());
            next = match self.parent_of::<Assembly>(&parent).await? {
                Some(grandparent) => grandparent,
                None => {
                    warn!(%kind, %id, dangling = %parent, "ancestor chain ends at missing assembly");
                    None
                }
            };
        }
        Ok(chain)
    }

    /// Descendants of an assembly as a flat list.
    ///
    /// With `first_level_only`, returns the direct child parts and
    /// assemblies. Otherwise expands breadth-first through every level,
    /// emitting each assembly reached (unless `leaves_only`) and every part.
    /// The order of the result is unspecified.
    pub async fn descendants(
        &self,
        assembly_id: &NodeId,
        options: DescendantOptions,
    ) -> HierarchyResult<Vec<AssemblyOrPart>> {
        options.validate()?;

        let mut result: Vec<AssemblyOrPart> = self
            .child_parts(assembly_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        if options.first_level_only {
            let assemblies = self.child_assemblies(assembly_id).await?;
            result.extend(assemblies.into_iter().map(AssemblyOrPart::from));
            return Ok(result);
        }

        let mut visited = HashSet::from([assembly_id.clone()]);
        let mut frontier = VecDeque::new();
        self.enqueue_children(assembly_id, &mut visited, &mut frontier)
            .await?;

        while let Some(assembly) = frontier.pop_front() {
            let current = assembly.id.clone();
            if !options.leaves_only {
                result.push(assembly.into());
            }
            self.enqueue_children(&current, &mut visited, &mut frontier)
                .await?;
            let parts = self.child_parts(&current).await?;
            result.extend(parts.into_iter().map(AssemblyOrPart::from));
        }

        debug!(%assembly_id, ?options, count = result.len(), "descendants resolved");
        Ok(result)
    }

    async fn enqueue_children(
        &self,
        assembly_id: &NodeId,
        visited: &mut HashSet<NodeId>,
        frontier: &mut VecDeque<Assembly>,
    ) -> HierarchyResult<()> {
        for child in self.child_assemblies(assembly_id).await? {
            if visited.insert(child.id.clone()) {
                frontier.push_back(child);
            } else {
                warn!(parent = %assembly_id, child = %child.id, "assembly already visited, skipping");
            }
        }
        Ok(())
    }

    async fn child_parts(&self, assembly_id: &NodeId) -> HierarchyResult<Vec<Part>> {
        Ok(self
            .documents
            .query::<Part>()
            .filter(children_of(assembly_id)?)
            .to_list()
            .await?)
    }

    async fn child_assemblies(&self, assembly_id: &NodeId) -> HierarchyResult<Vec<Assembly>> {
        Ok(self
            .documents
            .query::<Assembly>()
            .filter(children_of(assembly_id)?)
            .to_list()
            .await?)
    }

    /// `None` if the node does not exist, `Some(parent)` otherwise.
    async fn parent_of<T: Node>(&self, id: &NodeId) -> HierarchyResult<Option<Option<NodeId>>> {
        let node = self.documents.find_by_id::<T>(id.as_str()).await?;
        Ok(node.map(|n| n.parent_id().cloned()))
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Point a node's `parentId` at `new_parent`, or clear it for `None`.
    ///
    /// A missing node is a no-op. When parent integrity is enforced, the
    /// new parent must be an existing assembly that is neither the node
    /// itself nor one of its descendants.
    pub async fn reparent(
        &self,
        kind: NodeKind,
        id: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> HierarchyResult<()> {
        if let (true, Some(parent)) = (self.config.enforce_parent_integrity, new_parent) {
            self.check_parent(kind, id, parent).await?;
        }

        let filter = Filter::by_id(id.as_str());
        let outcome = match (kind, new_parent) {
            (NodeKind::Assembly, Some(parent)) => {
                self.documents
                    .set_property::<Assembly>(&filter, None, fields::PARENT_ID, parent.as_str())
                    .await?
            }
            (NodeKind::Part, Some(parent)) => {
                self.documents
                    .set_property::<Part>(&filter, None, fields::PARENT_ID, parent.as_str())
                    .await?
            }
            (NodeKind::Assembly, None) => {
                self.documents
                    .unset_property::<Assembly>(&filter, None, fields::PARENT_ID)
                    .await?
            }
            (NodeKind::Part, None) => {
                self.documents
                    .unset_property::<Part>(&filter, None, fields::PARENT_ID)
                    .await?
            }
        };

        debug!(%kind, %id, parent = ?new_parent, matched = outcome.matched, "reparented");
        Ok(())
    }

    async fn check_parent(&self, kind: NodeKind, id: &NodeId, parent: &NodeId) -> HierarchyResult<()> {
        // A node that cannot contain anything cannot be its own ancestor.
        if kind.can_contain() && id == parent {
            return Err(HierarchyError::SelfParent(id.clone()));
        }
        if self.parent_of::<Assembly>(parent).await?.is_none() {
            return Err(HierarchyError::ParentNotFound(parent.clone()));
        }
        if kind.can_contain() {
            let above = self.ancestor_chain(NodeKind::Assembly, parent).await?;
            if above.contains(id) {
                return Err(HierarchyError::CycleDetected {
                    node: id.clone(),
                    parent: parent.clone(),
                });
            }
        }
        Ok(())
    }

    /// Delete a node, orphaning its children first.
    ///
    /// For an assembly this is three separate store calls, in order: clear
    /// `parentId` on child parts, clear it on child assemblies, delete the
    /// assembly. A failure stops the sequence and leaves the completed steps
    /// in place, so child parts may already be orphaned while the assembly
    /// still exists. Parts have no children and are simply deleted.
    pub async fn delete_cascade_orphan(&self, kind: NodeKind, id: &NodeId) -> HierarchyResult<()> {
        let (orphaned_parts, orphaned_assemblies) = if kind.can_contain() {
            let children = children_of(id)?;
            let parts = self
                .documents
                .unset_property_many::<Part>(&children, None, fields::PARENT_ID)
                .await?;
            let assemblies = self
                .documents
                .unset_property_many::<Assembly>(&children, None, fields::PARENT_ID)
                .await?;
            (parts.modified, assemblies.modified)
        } else {
            (0, 0)
        };

        let target = Filter::by_id(id.as_str());
        let removed = match kind {
            NodeKind::Assembly => self.documents.remove_document::<Assembly>(&target).await?,
            NodeKind::Part => self.documents.remove_document::<Part>(&target).await?,
        };
        info!(
            %kind,
            %id,
            orphaned_parts,
            orphaned_assemblies,
            removed,
            "node deleted"
        );
        Ok(())
    }
}

fn children_of(assembly_id: &NodeId) -> HierarchyResult<Filter> {
    Ok(Filter::eq(
        FieldPath::parse(fields::PARENT_ID)?,
        assembly_id.as_str(),
    ))
}
