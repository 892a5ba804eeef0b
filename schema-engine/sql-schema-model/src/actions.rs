//! The output contract of schema comparison: an ordered tree of node actions, grouped by upgrade
//! stage.

use crate::{hints::DataHint, NodePath, SchemaModelError, SchemaModelResult};
use enumflags2::{bitflags, BitFlags};
use std::fmt;

/// One elementary difference between two schema trees.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAction {
    /// Materialize the node at `path` in the target schema.
    Create { path: NodePath },
    /// Delete the node at `path` in the extracted schema.
    Remove { path: NodePath },
    /// The node at `path` in the extracted schema becomes the node at `new_path` in the target.
    Move {
        path: NodePath,
        new_path: NodePath,
        flags: BitFlags<MovementFlag>,
    },
    /// A single property of the node at `path` differs. The new value is read from the target
    /// schema.
    PropertyChange { path: NodePath, property: ChangedProperty },
    Group(ActionGroup),
    Data(DataHint),
}

impl NodeAction {
    pub fn create(path: NodePath) -> Self {
        NodeAction::Create { path }
    }

    pub fn remove(path: NodePath) -> Self {
        NodeAction::Remove { path }
    }

    pub fn rename(path: NodePath, new_path: NodePath) -> Self {
        NodeAction::Move {
            path,
            new_path,
            flags: MovementFlag::Name.into(),
        }
    }

    pub fn property_change(path: NodePath, property: ChangedProperty) -> Self {
        NodeAction::PropertyChange { path, property }
    }

    /// The node path the action is about, if any.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            NodeAction::Create { path }
            | NodeAction::Remove { path }
            | NodeAction::Move { path, .. }
            | NodeAction::PropertyChange { path, .. } => Some(path),
            NodeAction::Group(_) | NodeAction::Data(_) => None,
        }
    }

    /// Depth-first iteration over the action and its children.
    pub fn walk(&self) -> Box<dyn Iterator<Item = &NodeAction> + '_> {
        match self {
            NodeAction::Group(group) => {
                Box::new(std::iter::once(self).chain(group.actions.iter().flat_map(|a| a.walk())))
            }
            _ => Box::new(std::iter::once(self)),
        }
    }
}

impl fmt::Display for NodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeAction::Create { path } => write!(f, "Create {path}"),
            NodeAction::Remove { path } => write!(f, "Remove {path}"),
            NodeAction::Move { path, new_path, flags } => write!(f, "Move {path} -> {new_path} ({flags:?})"),
            NodeAction::PropertyChange { path, property } => write!(f, "Change {property} of {path}"),
            NodeAction::Group(group) => write!(f, "{} ({} actions)", group.stage, group.actions.len()),
            NodeAction::Data(hint) => write!(f, "{hint}"),
        }
    }
}

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementFlag {
    /// The node was renamed.
    Name,
    /// The node moved to another parent.
    Parent,
    /// The node moved within its parent.
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangedProperty {
    /// The column type, including nullability.
    Type,
    DefaultValue,
    /// A sequence's increment.
    Increment,
    /// A property without DDL consequences.
    Other(String),
}

impl fmt::Display for ChangedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangedProperty::Type => f.write_str("Type"),
            ChangedProperty::DefaultValue => f.write_str("DefaultValue"),
            ChangedProperty::Increment => f.write_str("Increment"),
            ChangedProperty::Other(name) => f.write_str(name),
        }
    }
}

/// The logical stages of an upgrade, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpgradeStage {
    DataCleanup,
    Prepare,
    TemporaryRename,
    Upgrade,
    CopyData,
    PostCopyData,
    Cleanup,
}

impl UpgradeStage {
    pub const COUNT: usize = 7;

    pub const ALL: [UpgradeStage; Self::COUNT] = [
        UpgradeStage::DataCleanup,
        UpgradeStage::Prepare,
        UpgradeStage::TemporaryRename,
        UpgradeStage::Upgrade,
        UpgradeStage::CopyData,
        UpgradeStage::PostCopyData,
        UpgradeStage::Cleanup,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for UpgradeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpgradeStage::DataCleanup => "data-cleanup",
            UpgradeStage::Prepare => "prepare",
            UpgradeStage::TemporaryRename => "temporary-rename",
            UpgradeStage::Upgrade => "upgrade",
            UpgradeStage::CopyData => "copy-data",
            UpgradeStage::PostCopyData => "post-copy-data",
            UpgradeStage::Cleanup => "cleanup",
        };

        f.write_str(s)
    }
}

/// An ordered container of actions, labelled with the stage they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionGroup {
    pub stage: UpgradeStage,
    pub actions: Vec<NodeAction>,
}

impl ActionGroup {
    pub fn new(stage: UpgradeStage, actions: Vec<NodeAction>) -> Self {
        ActionGroup { stage, actions }
    }
}

/// The complete output of a schema comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionSequence {
    actions: Vec<NodeAction>,
}

impl ActionSequence {
    pub fn new(actions: Vec<NodeAction>) -> Self {
        ActionSequence { actions }
    }

    /// Add a grouping for `stage`.
    pub fn push_group(&mut self, stage: UpgradeStage, actions: Vec<NodeAction>) {
        self.actions.push(NodeAction::Group(ActionGroup::new(stage, actions)));
    }

    pub fn actions(&self) -> &[NodeAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All actions, depth first, groupings included.
    pub fn walk(&self) -> impl Iterator<Item = &NodeAction> + '_ {
        self.actions.iter().flat_map(|a| a.walk())
    }

    /// All data hints in the sequence.
    pub fn data_hints(&self) -> impl Iterator<Item = &DataHint> + '_ {
        self.walk().filter_map(|action| match action {
            NodeAction::Data(hint) => Some(hint),
            _ => None,
        })
    }

    /// Resolve the stage groupings. Every top-level action must be a grouping, and there is at
    /// most one grouping per stage.
    pub fn stages(&self) -> SchemaModelResult<Stages<'_>> {
        let mut groups = [None; UpgradeStage::COUNT];

        for action in &self.actions {
            let NodeAction::Group(group) = action else {
                return Err(SchemaModelError::UngroupedAction(action.to_string()));
            };

            let slot = &mut groups[group.stage.index()];

            if slot.is_some() {
                return Err(SchemaModelError::DuplicateStage(group.stage));
            }

            *slot = Some(group);
        }

        Ok(Stages { groups })
    }
}

/// The stage groupings of an action sequence, indexed by stage.
#[derive(Debug, Clone, Copy)]
pub struct Stages<'a> {
    groups: [Option<&'a ActionGroup>; UpgradeStage::COUNT],
}

impl<'a> Stages<'a> {
    pub fn get(&self, stage: UpgradeStage) -> Option<&'a ActionGroup> {
        self.groups[stage.index()]
    }

    /// The actions of `stage`; empty when the stage is absent.
    pub fn actions(&self, stage: UpgradeStage) -> &'a [NodeAction] {
        self.get(stage).map(|group| group.actions.as_slice()).unwrap_or(&[])
    }
}
