//! Node arena
//!
//! The tree is stored as a flat arena; nodes are addressed by [`NodeId`]
//! (a stable index). The tree owns every node; callers keep ids, never
//! references. Child order is paint order, back to front.
//!
//! The tree is assembled once: nodes are created detached, then appended to
//! a parent exactly once. There is no removal or re-parenting.

use std::marker::PhantomData;

use crate::renderer::Renderer;

/// Stable handle to a node in a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw arena index (diagnostics only)
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Initialization status of a renderer node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererStatus {
    /// Not yet initialized
    Pending,
    /// Initialized; participates in every frame
    Ready,
    /// Initialization failed; no-op for the rest of its lifetime
    Failed,
}

/// What a node is
pub enum NodeKind<C> {
    /// Plain grouping node
    Group,
    /// Opacity applied to the whole subtree; 0 culls the subtree's draw calls
    Opacity { opacity: f32, culled: bool },
    /// Leaf owning a renderer
    Renderer {
        renderer: Box<dyn Renderer<C>>,
        status: RendererStatus,
    },
}

struct NodeData<C> {
    kind: NodeKind<C>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Typed, non-owning handle to a renderer node
///
/// Obtained from [`NodeTree::renderer_handle`], which checks the type once.
#[derive(Debug)]
pub struct RendererHandle<R> {
    id: NodeId,
    _marker: PhantomData<fn() -> R>,
}

impl<R> RendererHandle<R> {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<R> Clone for RendererHandle<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RendererHandle<R> {}

/// Owning arena of render nodes
pub struct NodeTree<C> {
    nodes: Vec<NodeData<C>>,
    root: NodeId,
}

impl<C: 'static> Default for NodeTree<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> NodeTree<C> {
    /// Create a tree holding only a root group node
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.insert(NodeKind::Group);
        tree
    }

    fn insert(&mut self, kind: NodeKind<C>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a detached grouping node
    pub fn create_group(&mut self) -> NodeId {
        self.insert(NodeKind::Group)
    }

    /// Create a detached opacity node
    pub fn create_opacity(&mut self, opacity: f32) -> NodeId {
        let id = self.insert(NodeKind::Opacity {
            opacity: 1.0,
            culled: false,
        });
        self.set_opacity(id, opacity);
        id
    }

    /// Create a detached renderer leaf; the tree takes ownership
    pub fn create_renderer(&mut self, renderer: Box<dyn Renderer<C>>) -> NodeId {
        self.insert(NodeKind::Renderer {
            renderer,
            status: RendererStatus::Pending,
        })
    }

    /// Append `child` as the last child of `parent`
    ///
    /// Returns the child's handle for chaining. A node can only be appended
    /// once; a second append is ignored (and asserts in debug builds).
    pub fn append_child_node(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        let valid = self.contains(parent)
            && self.contains(child)
            && parent != child
            && child != self.root
            && self.nodes[child.0 as usize].parent.is_none();
        if !valid {
            debug_assert!(valid, "invalid append of {child:?} under {parent:?}");
            log::error!("NodeTree: ignoring invalid append of {:?} under {:?}", child, parent);
            return child;
        }

        self.nodes[child.0 as usize].parent = Some(parent);
        self.nodes[parent.0 as usize].children.push(child);
        child
    }

    /// Create a renderer leaf and append it to `parent` in one step
    pub fn append_renderer(&mut self, parent: NodeId, renderer: Box<dyn Renderer<C>>) -> NodeId {
        let child = self.create_renderer(renderer);
        self.append_child_node(parent, child)
    }

    /// Most recently appended child of `parent`
    pub fn last_child(&self, parent: NodeId) -> Option<NodeId> {
        self.nodes.get(parent.0 as usize)?.children.last().copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0 as usize)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0 as usize)?.parent
    }

    pub fn contains(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind<C>> {
        self.nodes.get(id.0 as usize).map(|node| &node.kind)
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind<C>> {
        self.nodes.get_mut(id.0 as usize).map(|node| &mut node.kind)
    }

    /// Depth-first pre-order from the root: the paint order
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Renderer nodes in paint order
    pub fn renderer_nodes(&self) -> Vec<NodeId> {
        self.traverse()
            .into_iter()
            .filter(|&id| matches!(self.kind(id), Some(NodeKind::Renderer { .. })))
            .collect()
    }

    /// Renderer names in paint order
    pub fn renderer_names(&self) -> Vec<&'static str> {
        self.renderer_nodes()
            .into_iter()
            .filter_map(|id| self.renderer(id).map(|r| r.name()))
            .collect()
    }

    /// Opacity of an opacity node
    pub fn opacity(&self, id: NodeId) -> Option<f32> {
        match self.kind(id)? {
            NodeKind::Opacity { opacity, .. } => Some(*opacity),
            _ => None,
        }
    }

    /// Set the opacity of an opacity node, clamped to [0, 1]
    ///
    /// Values outside the range are a programming error (debug assertion).
    pub fn set_opacity(&mut self, id: NodeId, value: f32) {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "opacity {value} outside [0, 1]"
        );
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        match self.kind_mut(id) {
            Some(NodeKind::Opacity { opacity, .. }) => *opacity = value,
            _ => log::warn!("NodeTree: set_opacity on non-opacity node {:?}", id),
        }
    }

    /// Whether the opacity node was culled in the last rendered frame
    pub fn is_culled(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Opacity { culled: true, .. }))
    }

    pub fn renderer(&self, id: NodeId) -> Option<&(dyn Renderer<C> + 'static)> {
        match self.kind(id)? {
            NodeKind::Renderer { renderer, .. } => Some(renderer.as_ref()),
            _ => None,
        }
    }

    pub fn renderer_mut(&mut self, id: NodeId) -> Option<&mut (dyn Renderer<C> + 'static)> {
        match self.kind_mut(id)? {
            NodeKind::Renderer { renderer, .. } => Some(renderer.as_mut()),
            _ => None,
        }
    }

    pub fn renderer_status(&self, id: NodeId) -> Option<RendererStatus> {
        match self.kind(id)? {
            NodeKind::Renderer { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Typed handle to the renderer at `id`, if it is an `R`
    pub fn renderer_handle<R: 'static>(&self, id: NodeId) -> Option<RendererHandle<R>> {
        let renderer = self.renderer(id)?;
        renderer.as_any().is::<R>().then_some(RendererHandle {
            id,
            _marker: PhantomData,
        })
    }

    /// Typed access through a handle
    pub fn get<R: 'static>(&self, handle: RendererHandle<R>) -> Option<&R> {
        let renderer = self.renderer(handle.id)?;
        renderer.as_any().downcast_ref::<R>()
    }

    /// Typed mutable access through a handle
    pub fn get_mut<R: 'static>(&mut self, handle: RendererHandle<R>) -> Option<&mut R> {
        let renderer = self.renderer_mut(handle.id)?;
        renderer.as_any_mut().downcast_mut::<R>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::painter::Painter;

    struct Named(&'static str);

    impl Renderer<()> for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn paint(&mut self, _context: &(), _painter: &mut Painter<'_>) {}
    }

    fn named(name: &'static str) -> Box<dyn Renderer<()>> {
        Box::new(Named(name))
    }

    #[test]
    fn test_append_preserves_paint_order() {
        let mut tree = NodeTree::<()>::new();
        let root = tree.root();
        tree.append_renderer(root, named("a"));
        let group = tree.create_opacity(1.0);
        tree.append_renderer(group, named("b"));
        tree.append_renderer(group, named("c"));
        tree.append_child_node(root, group);
        tree.append_renderer(root, named("d"));

        assert_eq!(tree.renderer_names(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_last_child_returns_newest() {
        let mut tree = NodeTree::<()>::new();
        let root = tree.root();
        assert_eq!(tree.last_child(root), None);

        let first = tree.append_renderer(root, named("first"));
        assert_eq!(tree.last_child(root), Some(first));
        let second = tree.append_renderer(root, named("second"));
        assert_eq!(tree.last_child(root), Some(second));
        assert_eq!(tree.parent(second), Some(root));
    }

    #[test]
    fn test_typed_handle() {
        let mut tree = NodeTree::<()>::new();
        let root = tree.root();
        let id = tree.append_renderer(root, named("mark"));

        let handle = tree.renderer_handle::<Named>(id).expect("handle");
        assert_eq!(tree.get(handle).map(|r| r.0), Some("mark"));

        tree.get_mut(handle).unwrap().0 = "renamed";
        assert_eq!(tree.renderer(id).map(|r| r.name()), Some("renamed"));

        // Wrong type: no handle
        assert!(tree.renderer_handle::<String>(id).is_none());
        // Not a renderer: no handle
        assert!(tree.renderer_handle::<Named>(root).is_none());
    }

    #[test]
    fn test_opacity_is_clamped_in_release() {
        let mut tree = NodeTree::<()>::new();
        let opacity = tree.create_opacity(0.5);
        assert_eq!(tree.opacity(opacity), Some(0.5));

        tree.set_opacity(opacity, 0.0);
        assert_eq!(tree.opacity(opacity), Some(0.0));
        assert_eq!(tree.opacity(tree.root()), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside [0, 1]")]
    fn test_opacity_out_of_range_asserts() {
        let mut tree = NodeTree::<()>::new();
        let opacity = tree.create_opacity(1.0);
        tree.set_opacity(opacity, 1.5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid append")]
    fn test_reparenting_asserts() {
        let mut tree = NodeTree::<()>::new();
        let root = tree.root();
        let group = tree.create_group();
        let leaf = tree.append_renderer(group, named("leaf"));
        tree.append_child_node(root, leaf);
    }
}
