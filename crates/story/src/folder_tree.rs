use std::future::Future;
use std::sync::Arc;

use folder_tree::{
    FolderId, FolderNode, FolderStore, Forest, MemoryFolderStore, MoveCommand, StoreError,
    TreeConfig, commit_move, refresh_forest,
};
use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::button::{Button, ButtonVariants as _};
use gpui_component::list::ListItem;
use gpui_component::{ActiveTheme as _, h_flex, v_flex};
use gpui_folder_tree::{
    FolderTreeEntry, FolderTreeEvent, FolderTreeRowState, FolderTreeState, folder_tree,
};

type StoreOutcome = Result<(Forest, String), StoreError>;

pub struct FolderTreeExample {
    store: Arc<dyn FolderStore>,
    tree: Entity<FolderTreeState>,
    depth_ceiling: usize,
    status: SharedString,
    busy: bool,
}

impl FolderTreeExample {
    pub fn view(config: TreeConfig, window: &mut Window, cx: &mut App) -> Entity<Self> {
        cx.new(|cx| Self::new(config, window, cx))
    }

    fn new(config: TreeConfig, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let store: Arc<dyn FolderStore> =
            match MemoryFolderStore::with_tree(config.clone(), demo_folders()) {
                Ok(store) => Arc::new(store),
                Err(err) => {
                    tracing::error!("demo folders rejected: {err}");
                    Arc::new(MemoryFolderStore::new(config.clone()))
                }
            };
        let depth_ceiling = config.depth_ceiling;
        let tree = cx.new(|cx| FolderTreeState::new(config, cx));

        cx.subscribe_in(
            &tree,
            window,
            |this, _, event: &FolderTreeEvent, window, cx| match event {
                FolderTreeEvent::MoveRequested(command) => {
                    this.commit(command.clone(), window, cx);
                }
                FolderTreeEvent::SelectionChanged(selection) => {
                    this.status = format!("{} folder(s) selected", selection.len()).into();
                    cx.notify();
                }
            },
        )
        .detach();

        let mut this = Self {
            store,
            tree,
            depth_ceiling,
            status: "Loading folders...".into(),
            busy: false,
        };
        let store = Arc::clone(&this.store);
        this.run(
            async move {
                let forest = refresh_forest(store.as_ref()).await?;
                let loaded = format!("Loaded {} folder(s)", forest.len());
                Ok((forest, loaded))
            },
            window,
            cx,
        );
        this
    }

    fn commit(&mut self, command: MoveCommand, window: &mut Window, cx: &mut Context<Self>) {
        let store = Arc::clone(&self.store);
        let moved = command.folder_id.clone();
        self.status = format!("Moving {moved}...").into();
        self.run(
            async move {
                let forest = commit_move(store.as_ref(), &command).await?;
                Ok((forest, format!("Moved {moved}")))
            },
            window,
            cx,
        );
    }

    fn create_folder(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let store = Arc::clone(&self.store);
        let parent = self.selected_id(cx);
        self.run(
            async move {
                let folder = store.create_folder("New folder", parent.as_ref()).await?;
                let forest = refresh_forest(store.as_ref()).await?;
                Ok((forest, format!("Created {}", folder.id)))
            },
            window,
            cx,
        );
    }

    fn delete_selected(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let Some(folder_id) = self.selected_id(cx) else {
            self.status = "Select a folder to delete".into();
            cx.notify();
            return;
        };
        let store = Arc::clone(&self.store);
        self.run(
            async move {
                let summary = store.delete_folder(&folder_id).await?;
                let forest = refresh_forest(store.as_ref()).await?;
                let message = format!(
                    "Deleted {} folder(s) and {} test case(s)",
                    summary.deleted_folder_ids.len(),
                    summary.deleted_test_cases
                );
                Ok((forest, message))
            },
            window,
            cx,
        );
    }

    fn selected_id(&self, cx: &App) -> Option<FolderId> {
        self.tree
            .read(cx)
            .selected_entry()
            .map(|entry| entry.id().clone())
    }

    /// Run a store operation off the UI thread and show the refetched tree when it lands.
    fn run<F>(&mut self, task: F, window: &mut Window, cx: &mut Context<Self>)
    where
        F: Future<Output = StoreOutcome> + Send + 'static,
    {
        self.busy = true;
        cx.notify();

        cx.spawn_in(window, async move |this, window| {
            let outcome = window.background_executor().spawn(task).await;
            let _ = this.update_in(window, |this, _window, cx| this.apply(outcome, cx));
        })
        .detach();
    }

    fn apply(&mut self, outcome: StoreOutcome, cx: &mut Context<Self>) {
        self.busy = false;
        match outcome {
            Ok((forest, message)) => {
                let first_load = self.tree.read(cx).current_forest().is_empty();
                self.tree.update(cx, |tree, cx| {
                    tree.set_forest(forest, cx);
                    if first_load {
                        tree.expand_all(cx);
                    }
                });
                self.status = message.into();
            }
            Err(err) => {
                // The tree keeps showing the last fetched state.
                tracing::warn!("store operation failed: {err}");
                self.status = format!("Failed: {err}").into();
            }
        }
        cx.notify();
    }
}

impl Render for FolderTreeExample {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let tree_dump = format_forest(self.tree.read(cx).current_forest());
        let depth_ceiling = self.depth_ceiling;

        v_flex()
            .size_full()
            .p(px(16.))
            .gap_y_3()
            .child(
                v_flex()
                    .gap_y_1()
                    .child(
                        div()
                            .text_xl()
                            .font_weight(FontWeight::BOLD)
                            .child("Test Case Folders"),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child(format!(
                                "Drag a folder onto the top or bottom fifth of a row to place it \
                                 before or after, or onto the middle to nest it. Nesting stops at \
                                 depth {depth_ceiling}. Ctrl/Cmd-click toggles bulk selection."
                            )),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .when(self.busy, |this| this.opacity(0.6))
                            .child(self.status.clone()),
                    ),
            )
            .child(
                h_flex()
                    .gap_x_2()
                    .child(
                        Button::new("new-folder")
                            .ghost()
                            .label("New folder")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.create_folder(window, cx);
                            })),
                    )
                    .child(
                        Button::new("delete-folder")
                            .ghost()
                            .label("Delete")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.delete_selected(window, cx);
                            })),
                    ),
            )
            .child(
                h_flex()
                    .flex_1()
                    .min_h(px(0.))
                    .gap_x_3()
                    .child(
                        div()
                            .w(px(420.))
                            .min_w(px(0.))
                            .h_full()
                            .rounded(px(12.))
                            .border_1()
                            .border_color(theme.border)
                            .bg(theme.background)
                            .child(folder_tree(
                                &self.tree,
                                move |ix, entry, row_state, _window, cx| {
                                    render_folder_row(ix, entry, row_state, cx)
                                },
                            )),
                    )
                    .child(
                        div()
                            .flex_1()
                            .min_w(px(0.))
                            .h_full()
                            .rounded(px(12.))
                            .border_1()
                            .border_color(theme.border)
                            .bg(theme.background)
                            .p(px(12.))
                            .child(render_tree_dump(tree_dump)),
                    ),
            )
    }
}

fn render_folder_row(
    ix: usize,
    entry: &FolderTreeEntry,
    row_state: FolderTreeRowState,
    cx: &mut App,
) -> ListItem {
    let theme = cx.theme();
    let indent = px(16.) * (entry.depth() - 1);
    let marker = match (entry.has_children(), entry.is_expanded()) {
        (false, _) => " ",
        (true, true) => "▾",
        (true, false) => "▸",
    };
    let count = entry.folder().test_case_count;

    ListItem::new(ix)
        .pl(px(10.) + indent)
        .when(row_state.dragging, |this| this.opacity(0.4))
        .when(row_state.checked, |this| this.bg(theme.accent))
        .child(
            h_flex()
                .gap_x_2()
                .items_center()
                .child(div().w(px(10.)).child(marker))
                .child(entry.label())
                .when(count > 0, |this| {
                    this.child(
                        div()
                            .text_xs()
                            .text_color(theme.muted_foreground)
                            .child(count.to_string()),
                    )
                }),
        )
}

fn render_tree_dump(text: String) -> impl IntoElement {
    let lines = text
        .lines()
        .map(|line| div().text_sm().child(line.to_string()));
    v_flex().gap_y_0p5().children(lines)
}

fn format_forest(forest: &Forest) -> String {
    let mut out = String::new();
    for (depth, folder) in forest.preorder() {
        out.push_str(&"  ".repeat(depth - 1));
        out.push_str(&format!("{} ({})\n", folder.name, folder.order));
    }
    out
}

fn demo_folders() -> Vec<FolderNode> {
    vec![
        FolderNode::new("auth", "Authentication", 1.0)
            .test_cases(4)
            .child(
                FolderNode::new("auth-login", "Login", 1.0)
                    .test_cases(12)
                    .child(
                        FolderNode::new("auth-sso", "Single sign-on", 1.0)
                            .test_cases(3)
                            .child(FolderNode::new("auth-saml", "SAML", 1.0).test_cases(2)),
                    ),
            )
            .child(FolderNode::new("auth-logout", "Logout", 2.0).test_cases(1)),
        FolderNode::new("checkout", "Checkout", 2.0)
            .child(
                FolderNode::new("checkout-pay", "Payments", 1.0)
                    .test_cases(8)
                    .child(FolderNode::new("checkout-cards", "Cards", 1.0).test_cases(5)),
            )
            .child(FolderNode::new("checkout-cart", "Cart", 2.0).test_cases(6)),
        FolderNode::new("smoke", "Smoke", 3.0).test_cases(9),
        FolderNode::new("regression", "Regression", 4.0),
    ]
}
