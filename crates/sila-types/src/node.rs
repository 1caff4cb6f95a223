use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::TypeError;
use crate::id::NodeId;

/// Persisted field names shared by both node kinds.
pub mod fields {
    /// Document identifier.
    pub const ID: &str = "id";
    /// Display name.
    pub const NAME: &str = "name";
    /// Reference to the containing assembly; null for roots.
    pub const PARENT_ID: &str = "parentId";
    /// Part color.
    pub const COLOR: &str = "color";
    /// Part material.
    pub const MATERIAL: &str = "material";
}

/// The two kinds of inventory node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Composite node; the only kind that may be a parent.
    Assembly,
    /// Leaf node.
    Part,
}

impl NodeKind {
    /// Name of the collection holding nodes of this kind.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Assembly => Assembly::COLLECTION,
            Self::Part => Part::COLLECTION,
        }
    }

    /// Whether nodes of this kind may be referenced as a parent.
    pub fn can_contain(self) -> bool {
        matches!(self, Self::Assembly)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assembly => write!(f, "assembly"),
            Self::Part => write!(f, "part"),
        }
    }
}

/// Capability shared by assemblies and parts.
pub trait Node: Document {
    /// The kind of this node type.
    const KIND: NodeKind;

    /// The node identifier.
    fn node_id(&self) -> &NodeId;

    /// The display name.
    fn name(&self) -> &str;

    /// The containing assembly, or `None` for a root node.
    fn parent_id(&self) -> Option<&NodeId>;

    /// Returns `true` if the node has no container.
    fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }
}

fn validated_name(name: impl Into<String>) -> Result<String, TypeError> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(TypeError::InvalidName(name));
    }
    Ok(name)
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// A composite inventory node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
}

impl Assembly {
    /// Create a root assembly. Fails if `name` is blank.
    pub fn new(id: NodeId, name: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self {
            id,
            name: validated_name(name)?,
            parent_id: None,
        })
    }
}

impl Document for Assembly {
    const COLLECTION: &'static str = "Assembly";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Node for Assembly {
    const KIND: NodeKind = NodeKind::Assembly;

    fn node_id(&self) -> &NodeId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// A leaf inventory node. Parts never have children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}

impl Part {
    /// Create a root part with no color or material. Fails if `name` is blank.
    pub fn new(id: NodeId, name: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self {
            id,
            name: validated_name(name)?,
            parent_id: None,
            color: None,
            material: None,
        })
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }

    pub fn with_material(mut self, material: Option<String>) -> Self {
        self.material = material;
        self
    }
}

impl Document for Part {
    const COLLECTION: &'static str = "Part";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Node for Part {
    const KIND: NodeKind = NodeKind::Part;

    fn node_id(&self) -> &NodeId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }
}

// ---------------------------------------------------------------------------
// AssemblyOrPart
// ---------------------------------------------------------------------------

/// Either node kind, tagged with its discriminant when serialized.
///
/// ```json
/// { "kind": "part", "id": "…", "name": "Bolt", "parentId": "…", "color": null, "material": null }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssemblyOrPart {
    Assembly(Assembly),
    Part(Part),
}

impl AssemblyOrPart {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Assembly(_) => NodeKind::Assembly,
            Self::Part(_) => NodeKind::Part,
        }
    }

    pub fn id(&self) -> &NodeId {
        match self {
            Self::Assembly(a) => &a.id,
            Self::Part(p) => &p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Assembly(a) => &a.name,
            Self::Part(p) => &p.name,
        }
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        match self {
            Self::Assembly(a) => a.parent_id.as_ref(),
            Self::Part(p) => p.parent_id.as_ref(),
        }
    }

    pub fn as_assembly(&self) -> Option<&Assembly> {
        match self {
            Self::Assembly(a) => Some(a),
            Self::Part(_) => None,
        }
    }

    pub fn as_part(&self) -> Option<&Part> {
        match self {
            Self::Part(p) => Some(p),
            Self::Assembly(_) => None,
        }
    }
}

impl From<Assembly> for AssemblyOrPart {
    fn from(a: Assembly) -> Self {
        Self::Assembly(a)
    }
}

impl From<Part> for AssemblyOrPart {
    fn from(p: Part) -> Self {
        Self::Part(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[test]
    fn blank_names_rejected() {
        assert!(matches!(
            Assembly::new(id("A1"), "  "),
            Err(TypeError::InvalidName(_))
        ));
        assert!(Part::new(id("P1"), "").is_err());
    }

    #[test]
    fn new_nodes_are_roots() {
        let a = Assembly::new(id("A1"), "Chassis").unwrap();
        assert!(a.is_root());
        let p = Part::new(id("P1"), "Bolt").unwrap();
        assert!(p.is_root());
        assert_eq!(p.name(), "Bolt");
    }

    #[test]
    fn part_persisted_layout() {
        let part = Part::new(id("P1"), "Bolt")
            .unwrap()
            .with_color(Some("red".into()));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "P1",
                "name": "Bolt",
                "parentId": null,
                "color": "red",
                "material": null,
            })
        );
    }

    #[test]
    fn missing_parent_reads_as_root() {
        let a: Assembly = serde_json::from_value(json!({ "id": "A1", "name": "Chassis" })).unwrap();
        assert_eq!(a.parent_id, None);
        let p: Part = serde_json::from_value(json!({ "id": "P1", "name": "Bolt" })).unwrap();
        assert_eq!(p.color, None);
    }

    #[test]
    fn tagged_union_carries_kind() {
        let mut a = Assembly::new(id("A2"), "Wheel").unwrap();
        a.parent_id = Some(id("A1"));
        let item: AssemblyOrPart = a.clone().into();
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["kind"], "assembly");
        assert_eq!(value["parentId"], "A1");

        let back: AssemblyOrPart = serde_json::from_value(value).unwrap();
        assert_eq!(back.as_assembly(), Some(&a));
        assert_eq!(back.kind(), NodeKind::Assembly);
        assert_eq!(back.parent_id(), Some(&id("A1")));
    }

    #[test]
    fn kind_collections() {
        assert_eq!(NodeKind::Assembly.collection(), "Assembly");
        assert_eq!(NodeKind::Part.collection(), "Part");
        assert!(NodeKind::Assembly.can_contain());
        assert!(!NodeKind::Part.can_contain());
    }

    #[test]
    fn kind_display() {
        assert_eq!(NodeKind::Part.to_string(), "part");
        assert_eq!(NodeKind::Assembly.to_string(), "assembly");
    }
}
