use std::{collections::HashSet, ops::Range, rc::Rc};

use folder_tree::{
    DragController, DropBounds, DropIndicator, DropPosition, Folder, FolderId, Forest,
    MoveCommand, Selection, TreeConfig,
};
use gpui::{
    App, AppContext as _, Context, ElementId, Entity, EntityId, EventEmitter, FocusHandle,
    InteractiveElement as _, IntoElement, ListSizingBehavior, ParentElement as _, Pixels, Point,
    Render, RenderOnce, SharedString, StatefulInteractiveElement as _, StyleRefinement, Styled,
    UniformListScrollHandle, Window, div, prelude::FluentBuilder as _, px, uniform_list,
};
use gpui_component::list::ListItem;
use gpui_component::scroll::{Scrollbar, ScrollbarState};
use gpui_component::{ActiveTheme as _, StyledExt as _};

const CONTEXT: &str = "FolderTree";

/// Create a [`FolderTree`].
pub fn folder_tree<R>(state: &Entity<FolderTreeState>, render_item: R) -> FolderTree
where
    R: Fn(usize, &FolderTreeEntry, FolderTreeRowState, &mut Window, &mut App) -> ListItem + 'static,
{
    FolderTree::new(state, render_item)
}

#[derive(Clone)]
struct FolderDrag {
    tree_id: EntityId,
    folder_id: FolderId,
    label: SharedString,
}

struct DragGhost {
    label: SharedString,
}

impl DragGhost {
    fn new(label: SharedString) -> Self {
        Self { label }
    }
}

impl Render for DragGhost {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        div()
            .px(px(10.))
            .py(px(6.))
            .rounded(px(8.))
            .bg(theme.popover)
            .border_1()
            .border_color(theme.border)
            .shadow_md()
            .text_color(theme.popover_foreground)
            .text_sm()
            .child(self.label.clone())
    }
}

/// A visible row: one folder with its depth in the forest.
#[derive(Clone, Debug, PartialEq)]
pub struct FolderTreeEntry {
    folder: Folder,
    depth: usize,
    has_children: bool,
    expanded: bool,
}

impl FolderTreeEntry {
    #[inline]
    pub fn folder(&self) -> &Folder {
        &self.folder
    }

    #[inline]
    pub fn id(&self) -> &FolderId {
        &self.folder.id
    }

    pub fn label(&self) -> SharedString {
        SharedString::from(self.folder.name.clone())
    }

    /// 1-based, matching the forest's depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FolderTreeRowState {
    pub selected: bool,
    pub checked: bool,
    pub dragging: bool,
    pub drop_target: Option<DropPosition>,
}

#[derive(Clone, Debug)]
pub enum FolderTreeEvent {
    /// A drag finished over a valid target. The tree itself is not changed; refetch and call
    /// [`FolderTreeState::set_forest`] once the move is persisted.
    MoveRequested(MoveCommand),
    SelectionChanged(Selection),
}

/// State for a folder tree that reorders and re-parents by drag and drop.
pub struct FolderTreeState {
    focus_handle: FocusHandle,
    controller: DragController,
    expanded: HashSet<FolderId>,
    entries: Vec<FolderTreeEntry>,
    scrollbar_state: ScrollbarState,
    scroll_handle: UniformListScrollHandle,
    selected_ix: Option<usize>,
    selection: Selection,
    indicator: Option<DropIndicator>,
    row_claim: RowClaim,
    render_item:
        Rc<dyn Fn(usize, &FolderTreeEntry, FolderTreeRowState, &mut Window, &mut App) -> ListItem>,
}

impl EventEmitter<FolderTreeEvent> for FolderTreeState {}

impl FolderTreeState {
    pub fn new(config: TreeConfig, cx: &mut App) -> Self {
        Self {
            focus_handle: cx.focus_handle(),
            controller: DragController::new(Forest::default(), config),
            expanded: HashSet::new(),
            entries: Vec::new(),
            scrollbar_state: ScrollbarState::default(),
            scroll_handle: UniformListScrollHandle::default(),
            selected_ix: None,
            selection: Selection::new(),
            indicator: None,
            row_claim: RowClaim::default(),
            render_item: Rc::new(|_, _, _, _, _| ListItem::new("folder-tree-empty")),
        }
    }

    /// Initial forest, with every folder expanded.
    pub fn forest(mut self, forest: Forest) -> Self {
        self.expanded = forest.flatten_ids().into_iter().collect();
        self.controller.replace_forest(forest);
        self.rebuild_entries();
        self
    }

    /// Replace the displayed tree with a freshly fetched one.
    ///
    /// Expansion, the selected row and the bulk selection carry over for folders that still
    /// exist.
    pub fn set_forest(&mut self, forest: Forest, cx: &mut Context<Self>) {
        let selected_id = self.selected_entry().map(|entry| entry.id().clone());
        self.expanded.retain(|id| forest.contains(id.as_str()));
        self.selection = self.selection.retain_existing(&forest);
        self.controller.replace_forest(forest);
        self.indicator = self.controller.indicator();
        self.rebuild_entries();
        self.selected_ix = selected_id.and_then(|id| self.index_of(&id));
        cx.notify();
    }

    pub fn expand_all(&mut self, cx: &mut Context<Self>) {
        let selected_id = self.selected_entry().map(|entry| entry.id().clone());
        self.expanded = self.controller.forest().flatten_ids().into_iter().collect();
        self.rebuild_entries();
        self.selected_ix = selected_id.and_then(|id| self.index_of(&id));
        cx.notify();
    }

    pub fn current_forest(&self) -> &Forest {
        self.controller.forest()
    }

    pub fn entries(&self) -> &[FolderTreeEntry] {
        &self.entries
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_entry(&self) -> Option<&FolderTreeEntry> {
        self.selected_ix.and_then(|ix| self.entries.get(ix))
    }

    fn index_of(&self, id: &FolderId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    fn rebuild_entries(&mut self) {
        self.entries = visible_entries(self.controller.forest(), &self.expanded);
    }

    fn toggle_expand(&mut self, ix: usize) {
        let Some(entry) = self.entries.get(ix) else {
            return;
        };
        if !entry.has_children() {
            return;
        }
        let id = entry.id().clone();
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
        self.rebuild_entries();
    }

    fn on_entry_click(
        &mut self,
        ix: usize,
        _event: &gpui::ClickEvent,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        let modifiers = window.modifiers();
        if modifiers.control || modifiers.platform {
            if let Some(entry) = self.entries.get(ix) {
                self.selection = self.selection.toggled(entry.id().clone());
                cx.emit(FolderTreeEvent::SelectionChanged(self.selection.clone()));
            }
            cx.notify();
            return;
        }

        self.selected_ix = Some(ix);
        self.toggle_expand(ix);
        cx.notify();
    }

    fn on_drag_start(
        &mut self,
        drag: &FolderDrag,
        _cursor_offset: Point<Pixels>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if let Err(err) = self.controller.start(drag.folder_id.as_str()) {
            tracing::warn!("folder drag refused: {err}");
            return;
        }
        self.indicator = None;
        self.row_claim.reset();
        self.selected_ix = self.index_of(&drag.folder_id);
        cx.notify();
    }

    fn set_indicator(&mut self, indicator: Option<DropIndicator>, cx: &mut Context<Self>) {
        if self.indicator != indicator {
            self.indicator = indicator;
            cx.notify();
        }
    }

    fn on_drag_move(
        &mut self,
        event: &gpui::DragMoveEvent<FolderDrag>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if !cx.has_active_drag() {
            return;
        }

        let mouse_position = event.event.position;
        let drag = event.drag(cx);
        let foreign = drag.tree_id != cx.entity_id();
        // Covers the pointer leaving the list as well as the empty area below the last row.
        if foreign || !self.row_claim.is_claimed(mouse_position) {
            let pointer_y: f32 = mouse_position.y.into();
            let indicator = self.controller.hover(pointer_y, None);
            self.set_indicator(indicator, cx);
        }
    }

    fn on_row_drag_move(
        &mut self,
        row_ix: usize,
        event: &gpui::DragMoveEvent<FolderDrag>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if !cx.has_active_drag() {
            return;
        }

        let drag = event.drag(cx);
        if drag.tree_id != cx.entity_id() {
            return;
        }

        let mouse_position = event.event.position;
        if !event.bounds.contains(&mouse_position) {
            return;
        }

        let Some(target_id) = self.entries.get(row_ix).map(|entry| entry.id().clone()) else {
            return;
        };
        self.row_claim.claim(mouse_position);
        let pointer_y: f32 = mouse_position.y.into();
        let bounds = DropBounds::new(
            event.bounds.origin.y.into(),
            event.bounds.size.height.into(),
        );
        let indicator = self
            .controller
            .hover(pointer_y, Some((target_id.as_str(), bounds)));
        self.set_indicator(indicator, cx);
    }

    fn on_drop(&mut self, drag: &FolderDrag, _window: &mut Window, cx: &mut Context<Self>) {
        if drag.tree_id != cx.entity_id() {
            self.controller.cancel();
            self.set_indicator(None, cx);
            return;
        }

        // Rows and the list container both receive the drop; only the first one finds a session.
        if let Some(command) = self.controller.finish() {
            cx.emit(FolderTreeEvent::MoveRequested(command));
        }
        self.row_claim.reset();
        self.set_indicator(None, cx);
    }
}

/// Pointer position a row's drag-move handler last accepted.
///
/// Rows and the list both see every drag move, in no guaranteed order. A position no row
/// claimed is over empty space, so the list clears the target for it. If the list runs
/// first and clears, the row that owns the position sets the target again right after.
#[derive(Clone, Copy, Debug, Default)]
struct RowClaim(Option<Point<Pixels>>);

impl RowClaim {
    fn claim(&mut self, position: Point<Pixels>) {
        self.0 = Some(position);
    }

    fn is_claimed(&self, position: Point<Pixels>) -> bool {
        self.0 == Some(position)
    }

    fn reset(&mut self) {
        self.0 = None;
    }
}

/// Flatten `forest` into display rows, descending only into expanded folders.
fn visible_entries(forest: &Forest, expanded: &HashSet<FolderId>) -> Vec<FolderTreeEntry> {
    fn push(
        forest: &Forest,
        expanded: &HashSet<FolderId>,
        id: &FolderId,
        depth: usize,
        out: &mut Vec<FolderTreeEntry>,
    ) {
        let Some(folder) = forest.find_by_id(id.as_str()) else {
            return;
        };
        let children = forest.children_of(id.as_str());
        let is_expanded = expanded.contains(id);
        out.push(FolderTreeEntry {
            folder: folder.clone(),
            depth,
            has_children: !children.is_empty(),
            expanded: is_expanded,
        });
        if is_expanded {
            for child in children {
                push(forest, expanded, child, depth + 1, out);
            }
        }
    }

    let mut out = Vec::with_capacity(forest.len());
    for id in forest.root_ids() {
        push(forest, expanded, id, 1, &mut out);
    }
    out
}

impl Render for FolderTreeState {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if !cx.has_active_drag() && self.controller.is_dragging() {
            // The gesture ended somewhere that never reported a drop.
            self.controller.cancel();
            self.indicator = None;
        }

        let render_item = Rc::clone(&self.render_item);
        let state_entity = cx.entity();
        let active_id = self.controller.active_id().cloned();
        let indicator = self.indicator.clone();

        div()
            .id("folder-tree-state")
            .size_full()
            .relative()
            .child(
                uniform_list("entries", self.entries.len(), {
                    cx.processor(move |state, visible_range: Range<usize>, window, cx| {
                        let theme = cx.theme();
                        let drop_target_bg = theme.drop_target;
                        let line_color = theme.drag_border;
                        let mut items = Vec::with_capacity(visible_range.len());
                        for ix in visible_range {
                            let entry = &state.entries[ix];
                            let selected = Some(ix) == state.selected_ix;
                            let checked = state.selection.contains(entry.id().as_str());
                            let dragging = active_id.as_ref().is_some_and(|id| id == entry.id())
                                && cx.has_active_drag();
                            let drop_target = indicator
                                .as_ref()
                                .filter(|indicator| indicator.target_id == *entry.id())
                                .map(|indicator| indicator.position);

                            let row_state = FolderTreeRowState {
                                selected,
                                checked,
                                dragging,
                                drop_target,
                            };

                            let item = (render_item)(ix, entry, row_state, window, cx);
                            let tree_id = cx.entity_id();
                            let drag_value = FolderDrag {
                                tree_id,
                                folder_id: entry.id().clone(),
                                label: entry.label(),
                            };
                            let line_left = px(10. + 16. * (entry.depth() - 1) as f32);

                            let state_entity = state_entity.clone();
                            let row = div()
                                .id(ix)
                                .relative()
                                .when(drop_target == Some(DropPosition::Inside), |this| {
                                    this.bg(drop_target_bg)
                                })
                                .child(item.selected(selected))
                                .when_some(
                                    drop_target.filter(|p| *p != DropPosition::Inside),
                                    |this, position| {
                                        let line = div()
                                            .absolute()
                                            .left(line_left)
                                            .right_0()
                                            .h(px(2.))
                                            .bg(line_color);
                                        this.child(match position {
                                            DropPosition::Before => line.top_0(),
                                            _ => line.bottom_0(),
                                        })
                                    },
                                )
                                .on_drag_move::<FolderDrag>(cx.listener(
                                    move |this, ev, window, cx| {
                                        this.on_row_drag_move(ix, ev, window, cx);
                                    },
                                ))
                                .on_drop::<FolderDrag>(cx.listener(
                                    move |this, drag, window, cx| {
                                        this.on_drop(drag, window, cx);
                                    },
                                ))
                                .on_click(cx.listener(move |this, click_event, window, cx| {
                                    this.on_entry_click(ix, click_event, window, cx);
                                }))
                                .on_drag(drag_value, move |drag, cursor_offset, window, cx| {
                                    state_entity.update(cx, |state, cx| {
                                        state.on_drag_start(drag, cursor_offset, window, cx);
                                    });
                                    let label = drag.label.clone();
                                    cx.new(|_| DragGhost::new(label))
                                });

                            items.push(row);
                        }
                        items
                    })
                })
                .on_drag_move::<FolderDrag>(cx.listener(Self::on_drag_move))
                .on_drop::<FolderDrag>(cx.listener(Self::on_drop))
                .flex_grow()
                .size_full()
                .track_scroll(self.scroll_handle.clone())
                .with_sizing_behavior(ListSizingBehavior::Auto)
                .into_any_element(),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .right_0()
                    .bottom_0()
                    .w(px(12.))
                    .child(Scrollbar::uniform_scroll(
                        &self.scrollbar_state,
                        &self.scroll_handle,
                    )),
            )
    }
}

/// A folder tree element that supports drag-to-reorder and drag-to-reparent.
#[derive(IntoElement)]
pub struct FolderTree {
    id: ElementId,
    state: Entity<FolderTreeState>,
    style: StyleRefinement,
    render_item:
        Rc<dyn Fn(usize, &FolderTreeEntry, FolderTreeRowState, &mut Window, &mut App) -> ListItem>,
}

impl FolderTree {
    pub fn new<R>(state: &Entity<FolderTreeState>, render_item: R) -> Self
    where
        R: Fn(usize, &FolderTreeEntry, FolderTreeRowState, &mut Window, &mut App) -> ListItem
            + 'static,
    {
        Self {
            id: ElementId::Name(format!("folder-tree-{}", state.entity_id()).into()),
            state: state.clone(),
            style: StyleRefinement::default(),
            render_item: Rc::new(move |ix, entry, row_state, window, cx| {
                render_item(ix, entry, row_state, window, cx)
            }),
        }
    }
}

impl Styled for FolderTree {
    fn style(&mut self) -> &mut StyleRefinement {
        &mut self.style
    }
}

impl RenderOnce for FolderTree {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let focus_handle = self.state.read(cx).focus_handle.clone();
        self.state
            .update(cx, |state, _| state.render_item = self.render_item);

        div()
            .id(self.id)
            .key_context(CONTEXT)
            .track_focus(&focus_handle)
            .size_full()
            .child(self.state)
            .refine_style(&self.style)
    }
}
