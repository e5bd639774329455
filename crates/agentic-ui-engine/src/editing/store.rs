use std::fmt;
use std::sync::Arc;

use regex::{NoExpand, RegexBuilder};
use uuid::Uuid;

use crate::editing::diff::{self, Action, Operation};
use crate::editing::load::{self, CancelHandle, LoadOptions};
use crate::editing::selection::{self, Point, Selection};
use crate::editing::table;
use crate::editing::{Cmd, Patch, ReplaceOptions};
use crate::parsing::{RuleSet, parse_with_rules};
use crate::schema::{
    ElementKind, Node, NodePath, TextRun, first_leaf_path, node_at, node_at_mut, siblings_mut,
    to_markdown,
};

/// Stable identity of a top-level block. Survives in-place updates; a block
/// that is replaced or inserted gets a fresh key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey(Uuid);

impl BlockKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document is readonly")]
    Readonly,
    #[error("no selection")]
    NoSelection,
    #[error("path {0:?} no longer resolves")]
    StalePath(NodePath),
    #[error("caret is not in a text run")]
    NotText,
    #[error("caret is not in a table cell")]
    NotInTable,
    #[error("cannot apply to a {0} block")]
    Unsupported(&'static str),
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("content load was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum TableEdit {
    InsertRow,
    DeleteRow,
    InsertColumn,
    DeleteColumn,
}

/// The live document.
///
/// Structural updates (`update_node_list`, `set_md_content`) always apply,
/// so streamed playback works in readonly mode; user commands through
/// [`EditorStore::apply`] are rejected there. A command that fails leaves the
/// document as it was.
#[derive(Debug)]
pub struct EditorStore {
    nodes: Vec<Node>,
    /// One per top-level node.
    keys: Vec<BlockKey>,
    selection: Option<Selection>,
    readonly: bool,
    version: u64,
    rules: Arc<RuleSet>,
    cancel: CancelHandle,
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorStore {
    pub fn new() -> Self {
        Self::with_rules(RuleSet::shared())
    }

    pub fn with_rules(rules: Arc<RuleSet>) -> Self {
        Self {
            nodes: Vec::new(),
            keys: Vec::new(),
            selection: None,
            readonly: false,
            version: 0,
            rules,
            cancel: CancelHandle::default(),
        }
    }

    pub fn from_markdown(markdown: &str) -> Self {
        let mut store = Self::new();
        store.set_md_content(markdown);
        store
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn keys(&self) -> &[BlockKey] {
        &self.keys
    }

    pub fn key_of(&self, block: usize) -> Option<BlockKey> {
        self.keys.get(block).copied()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The document serialised back to markdown.
    pub fn markdown(&self) -> String {
        to_markdown(&self.nodes)
    }

    /// Reconciles the live node list with `schema`.
    ///
    /// Invalid nodes are dropped first. Unchanged nodes stay in place with
    /// their keys; the selection is re-resolved against the result.
    pub fn update_node_list(&mut self, schema: Vec<Node>) -> Patch {
        let target: Vec<Node> = schema.into_iter().filter(is_valid_node).collect();
        let ops = diff::diff(&target, &self.nodes);
        if ops.is_empty() {
            return self.commit(Vec::new());
        }

        let before = self.selection.is_some().then(|| self.nodes.clone());
        let mut changed = Vec::with_capacity(ops.len());
        for op in &ops {
            if diff::execute(op, &mut self.nodes) {
                self.track_keys(op);
                changed.push(op.path.clone());
            }
        }
        if self.nodes != target {
            log::warn!("reconciliation diverged, replacing the node list");
            changed = (0..target.len()).map(|i| vec![i]).collect();
            self.nodes = target;
            self.keys.resize_with(self.nodes.len(), BlockKey::new);
        }

        if let (Some(before), Some(sel)) = (before, self.selection.take()) {
            self.selection = selection::remap(&before, &self.nodes, &sel);
        }
        self.commit(changed)
    }

    /// Parses `markdown` and reconciles. A no-op when it matches the current
    /// document once both are trimmed.
    pub fn set_md_content(&mut self, markdown: &str) -> Patch {
        if markdown.trim() == self.markdown().trim() {
            log::debug!("content unchanged, skipping update");
            return self.commit(Vec::new());
        }
        let schema = parse_with_rules(markdown, &self.rules).schema;
        self.update_node_list(schema)
    }

    /// Handle that stops an in-flight [`set_md_content_with`](Self::set_md_content_with).
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel_set_md_content(&self) {
        self.cancel.cancel();
    }

    /// Like [`set_md_content`](Self::set_md_content), but content longer than
    /// the chunk size is parsed in chunks and applied a batch at a time. The
    /// first batch replaces the document and later batches append to it.
    ///
    /// Cancellation is checked before every batch after the first. A
    /// cancelled load keeps the batches already applied and returns
    /// [`StoreError::Cancelled`].
    pub fn set_md_content_with(
        &mut self,
        markdown: &str,
        mut options: LoadOptions<'_>,
    ) -> Result<Patch, StoreError> {
        self.cancel.reset();
        if markdown.len() <= options.chunk_size {
            let patch = self.set_md_content(markdown);
            options.report(1.0);
            return Ok(patch);
        }
        if markdown.trim() == self.markdown().trim() {
            log::debug!("content unchanged, skipping update");
            options.report(1.0);
            return Ok(self.commit(Vec::new()));
        }

        let chunks = load::split_chunks(markdown);
        if chunks.is_empty() {
            let patch = self.update_node_list(Vec::new());
            options.report(1.0);
            return Ok(patch);
        }
        let total = chunks.len();
        let batch = options.batch_size.max(1);
        log::debug!("loading {} bytes as {total} chunks", markdown.len());

        let mut loaded: Vec<Node> = Vec::new();
        let mut changed: Vec<NodePath> = Vec::new();
        for (i, group) in chunks.chunks(batch).enumerate() {
            let done = i * batch;
            if done > 0 && self.cancel.is_cancelled() {
                log::debug!("content load cancelled after {done} of {total} chunks");
                return Err(StoreError::Cancelled);
            }
            for chunk in group {
                loaded.extend(parse_with_rules(chunk, &self.rules).schema);
            }
            changed.extend(self.update_node_list(loaded.clone()).changed);
            options.report((done + group.len()) as f64 / total as f64);
        }
        changed.sort();
        changed.dedup();
        Ok(Patch {
            changed,
            new_selection: self.selection.clone(),
            version: self.version,
        })
    }

    /// Applies a user command.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, StoreError> {
        if self.readonly {
            log::warn!("rejecting {} in readonly mode", cmd.name());
            return Err(StoreError::Readonly);
        }
        let name = cmd.name();
        match self.run(cmd) {
            Ok(changed) => Ok(self.commit(changed)),
            Err(e) => {
                log::warn!("{name} failed: {e}");
                Err(e)
            }
        }
    }

    /// Replaces matches across every text run, returning how many were
    /// replaced. Code and frontmatter are left alone.
    pub fn replace_text(
        &mut self,
        search: &str,
        replace: &str,
        options: ReplaceOptions,
    ) -> Result<usize, StoreError> {
        if self.readonly {
            return Err(StoreError::Readonly);
        }
        let (count, changed) = self.replace_in_text(search, replace, options)?;
        self.commit(changed);
        Ok(count)
    }

    fn commit(&mut self, changed: Vec<NodePath>) -> Patch {
        if !changed.is_empty() {
            self.version += 1;
        }
        Patch {
            changed,
            new_selection: self.selection.clone(),
            version: self.version,
        }
    }

    fn track_keys(&mut self, op: &Operation) {
        let &[idx] = op.path.as_slice() else {
            return;
        };
        match op.action {
            Action::Insert(_) => self.keys.insert(idx.min(self.keys.len()), BlockKey::new()),
            Action::Remove if idx < self.keys.len() => {
                self.keys.remove(idx);
            }
            Action::Replace(_) if idx < self.keys.len() => self.keys[idx] = BlockKey::new(),
            _ => {}
        }
    }

    fn run(&mut self, cmd: Cmd) -> Result<Vec<NodePath>, StoreError> {
        match cmd {
            Cmd::InsertText { text } => self.insert_text(&text),
            Cmd::DeleteBackward => self.delete_backward(),
            Cmd::SetHeading { level } => self.set_heading(level),
            Cmd::IncreaseHeadingLevel => self.shift_heading(true),
            Cmd::DecreaseHeadingLevel => self.shift_heading(false),
            Cmd::ToggleQuote => self.toggle_quote(),
            Cmd::InsertHorizontalRule => self.insert_hr(),
            Cmd::InsertCodeBlock { language } => self.insert_block(Node::code(language, "", true)),
            Cmd::InsertTable { rows, cols } => self.insert_block(table::new_table(rows, cols)),
            Cmd::InsertTableRow => self.edit_table(TableEdit::InsertRow),
            Cmd::DeleteTableRow => self.edit_table(TableEdit::DeleteRow),
            Cmd::InsertTableColumn => self.edit_table(TableEdit::InsertColumn),
            Cmd::DeleteTableColumn => self.edit_table(TableEdit::DeleteColumn),
            Cmd::ReplaceText {
                search,
                replace,
                options,
            } => self
                .replace_in_text(&search, &replace, options)
                .map(|(_, changed)| changed),
        }
    }

    fn caret(&self) -> Result<Point, StoreError> {
        self.selection
            .as_ref()
            .map(|s| s.focus.clone())
            .ok_or(StoreError::NoSelection)
    }

    fn caret_block(&self) -> Result<usize, StoreError> {
        self.caret()?.block().ok_or(StoreError::NotText)
    }

    /// Deletes a selected range inside one run; ranges spanning runs
    /// collapse to their focus.
    fn collapse_selection(&mut self) -> Result<Point, StoreError> {
        let sel = self.selection.clone().ok_or(StoreError::NoSelection)?;
        if sel.is_collapsed() || sel.anchor.path != sel.focus.path {
            return Ok(sel.focus);
        }
        let from = sel.anchor.offset.min(sel.focus.offset);
        let to = sel.anchor.offset.max(sel.focus.offset);
        let run = text_run_mut(&mut self.nodes, &sel.focus.path)?;
        let range = byte_offset(&run.text, from)..byte_offset(&run.text, to);
        run.text.replace_range(range, "");
        Ok(Point::new(sel.focus.path, from))
    }

    fn insert_text(&mut self, text: &str) -> Result<Vec<NodePath>, StoreError> {
        // Validate before collapsing so a bad caret leaves the text intact.
        let path = self.caret()?.path;
        text_run_mut(&mut self.nodes, &path)?;
        let caret = self.collapse_selection()?;
        let run = text_run_mut(&mut self.nodes, &caret.path)?;
        let at = byte_offset(&run.text, caret.offset);
        run.text.insert_str(at, text);
        self.sync_code_value(&caret.path);

        let mut point = Point::new(caret.path.clone(), caret.offset + text.chars().count());
        let mut changed = vec![caret.path];
        let mut chars = text.chars();
        if let (Some(key), None) = (chars.next(), chars.next())
            && let Some((converted, path)) = self.convert_typed(&point, key)
        {
            point = converted;
            changed.push(path);
        }
        self.selection = Some(Selection::collapsed(point));
        Ok(changed)
    }

    /// Turns text completed by the just-typed `key` into its construct.
    /// Returns the new caret and the path of the rewritten parent.
    fn convert_typed(&mut self, caret: &Point, key: char) -> Option<(Point, NodePath)> {
        let Some(Node::Text(run)) = node_at(&self.nodes, &caret.path) else {
            return None;
        };
        if run.code || in_raw_block(&self.nodes, &caret.path) {
            return None;
        }
        let run = run.clone();
        let at = byte_offset(&run.text, caret.offset);
        let found = self.rules.match_typed(&run.text[..at], key)?;

        if found.kind.is_inline() {
            let (&idx, parent) = caret.path.split_last()?;
            let mut replacement = Vec::with_capacity(found.nodes.len() + 2);
            if found.start > 0 {
                replacement.push(Node::Text(TextRun {
                    text: run.text[..found.start].to_string(),
                    ..run.clone()
                }));
            }
            replacement.extend(found.nodes);
            let caret_index = idx + replacement.len();
            replacement.push(Node::Text(TextRun {
                text: run.text[at..].to_string(),
                ..run
            }));
            let (siblings, _) = siblings_mut(&mut self.nodes, &caret.path)?;
            siblings.splice(idx..=idx, replacement);

            let mut path = parent.to_vec();
            path.push(caret_index);
            return Some((Point::new(path, 0), parent.to_vec()));
        }

        // Block triggers only fire on a bare marker opening a lone top-level
        // paragraph.
        let &[block, 0] = caret.path.as_slice() else {
            return None;
        };
        let para = self.nodes.get(block)?;
        let mut nodes = found.nodes;
        if found.start != 0
            || !matches!(para.kind(), Some(ElementKind::Paragraph))
            || para.children().len() != 1
            || nodes.is_empty()
            || nodes.iter().any(|n| !n.text_content().is_empty())
        {
            return None;
        }
        if let Some(leaf) = first_leaf_path(&nodes, &[0])
            && let Some(Node::Text(first)) = node_at_mut(&mut nodes, &leaf)
        {
            first.text = run.text[at..].to_string();
        }
        let count = nodes.len();
        self.nodes.splice(block..=block, nodes);
        self.keys
            .splice(block..=block, (0..count).map(|_| BlockKey::new()));
        log::debug!("typed {key:?} opened a {}", found.kind.name());
        Some((Point::start_of(&self.nodes, &[block])?, vec![block]))
    }

    fn delete_backward(&mut self) -> Result<Vec<NodePath>, StoreError> {
        let path = self.caret()?.path;
        text_run_mut(&mut self.nodes, &path)?;
        let caret = self.collapse_selection()?;
        let run = text_run_mut(&mut self.nodes, &caret.path)?;
        if caret.offset > 0 {
            let range = byte_offset(&run.text, caret.offset - 1)..byte_offset(&run.text, caret.offset);
            run.text.replace_range(range, "");
            self.sync_code_value(&caret.path);
            self.selection = Some(Selection::collapsed(Point::new(
                caret.path.clone(),
                caret.offset - 1,
            )));
            return Ok(vec![caret.path]);
        }

        let (&idx, parent) = caret.path.split_last().ok_or(StoreError::NotText)?;
        if idx > 0 {
            let mut prev = parent.to_vec();
            prev.push(idx - 1);
            let Some(Node::Text(prev_run)) = node_at_mut(&mut self.nodes, &prev) else {
                return Ok(Vec::new());
            };
            let Some((cut, _)) = prev_run.text.char_indices().next_back() else {
                return Ok(Vec::new());
            };
            prev_run.text.truncate(cut);
            let offset = prev_run.text.chars().count();
            self.selection = Some(Selection::collapsed(Point::new(prev.clone(), offset)));
            return Ok(vec![prev]);
        }

        let block = caret.path[0];
        if caret.path[1..].iter().any(|&i| i != 0) {
            return Ok(Vec::new());
        }
        let after_paragraph = block > 0
            && matches!(
                self.nodes.get(block - 1).and_then(Node::kind),
                Some(ElementKind::Paragraph)
            );
        match self.nodes.get_mut(block) {
            Some(Node::Element(el)) if matches!(el.kind, ElementKind::Head { .. }) => {
                el.kind = ElementKind::Paragraph;
                Ok(vec![vec![block]])
            }
            Some(Node::Element(el))
                if matches!(el.kind, ElementKind::Paragraph)
                    && caret.path.len() == 2
                    && after_paragraph =>
            {
                let moved = std::mem::take(&mut el.children);
                self.nodes.remove(block);
                self.keys.remove(block);
                let prev = block - 1;
                let joined = self.nodes[prev]
                    .children_mut()
                    .ok_or(StoreError::NotText)?;
                let at = joined.len();
                joined.extend(moved);
                self.selection = Some(Selection::collapsed(Point::new(vec![prev, at], 0)));
                Ok(vec![vec![prev], vec![block]])
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Keeps a code block's `value` equal to its edited text.
    fn sync_code_value(&mut self, leaf: &[usize]) {
        let Some((_, parent)) = leaf.split_last() else {
            return;
        };
        if let Some(Node::Element(el)) = node_at_mut(&mut self.nodes, parent)
            && let ElementKind::Code { value, .. } = &mut el.kind
        {
            *value = el
                .children
                .iter()
                .map(Node::text_content)
                .collect::<String>();
        }
    }

    fn heading_block(&mut self) -> Result<(usize, &mut ElementKind), StoreError> {
        let block = self.caret_block()?;
        match self.nodes.get_mut(block) {
            Some(Node::Element(el)) => match el.kind {
                ElementKind::Paragraph | ElementKind::Head { .. } => Ok((block, &mut el.kind)),
                ref other => Err(StoreError::Unsupported(other.type_name())),
            },
            Some(Node::Text(_)) => Err(StoreError::NotText),
            None => Err(StoreError::StalePath(vec![block])),
        }
    }

    fn set_heading(&mut self, level: Option<u8>) -> Result<Vec<NodePath>, StoreError> {
        let (block, kind) = self.heading_block()?;
        *kind = match level {
            Some(level) => ElementKind::Head {
                level: level.clamp(1, 6),
            },
            None => ElementKind::Paragraph,
        };
        Ok(vec![vec![block]])
    }

    fn shift_heading(&mut self, increase: bool) -> Result<Vec<NodePath>, StoreError> {
        let (block, kind) = self.heading_block()?;
        *kind = match (&*kind, increase) {
            (ElementKind::Head { level: 1 }, true) => ElementKind::Paragraph,
            (ElementKind::Head { level }, true) => ElementKind::Head { level: level - 1 },
            (ElementKind::Head { level }, false) if *level >= 4 => ElementKind::Paragraph,
            (ElementKind::Head { level }, false) => ElementKind::Head { level: level + 1 },
            (_, true) => ElementKind::Head { level: 4 },
            (_, false) => ElementKind::Head { level: 1 },
        };
        Ok(vec![vec![block]])
    }

    fn toggle_quote(&mut self) -> Result<Vec<NodePath>, StoreError> {
        let caret = self.caret()?;
        if let Some(quote) = enclosing(&self.nodes, &caret.path, |k| {
            matches!(k, ElementKind::Blockquote)
        }) {
            let depth = quote.len();
            let inner = node_at_mut(&mut self.nodes, &quote)
                .and_then(Node::children_mut)
                .map(std::mem::take)
                .unwrap_or_default();
            let count = inner.len();
            let (siblings, idx) = siblings_mut(&mut self.nodes, &quote)
                .ok_or_else(|| StoreError::StalePath(quote.clone()))?;
            siblings.splice(idx..=idx, inner);
            if depth == 1 {
                self.keys
                    .splice(idx..=idx, (0..count).map(|_| BlockKey::new()));
            }
            let mut path = quote[..depth - 1].to_vec();
            path.push(idx + caret.path.get(depth).copied().unwrap_or(0));
            path.extend_from_slice(caret.path.get(depth + 1..).unwrap_or_default());
            self.selection = Some(Selection::collapsed(Point::new(path, caret.offset)));
            return Ok(vec![quote]);
        }

        let (block, kind) = self.heading_block()?;
        *kind = ElementKind::Paragraph;
        let inner = self.nodes.remove(block);
        self.nodes
            .insert(block, Node::element(ElementKind::Blockquote, vec![inner]));
        self.keys[block] = BlockKey::new();
        let mut path = vec![block, 0];
        path.extend_from_slice(&caret.path[1..]);
        self.selection = Some(Selection::collapsed(Point::new(path, caret.offset)));
        Ok(vec![vec![block]])
    }

    /// Where a new block goes: replacing the caret's block when it is an
    /// empty paragraph, after it when it is a paragraph or heading.
    fn insertion_point(&mut self) -> Result<usize, StoreError> {
        if self.nodes.is_empty() {
            return Ok(0);
        }
        let block = self.caret_block()?;
        let node = self
            .nodes
            .get(block)
            .ok_or_else(|| StoreError::StalePath(vec![block]))?;
        let empty = matches!(node.kind(), Some(ElementKind::Paragraph))
            && node.text_content().is_empty();
        match node.kind() {
            Some(ElementKind::Paragraph | ElementKind::Head { .. }) => {}
            Some(other) => return Err(StoreError::Unsupported(other.type_name())),
            None => return Err(StoreError::NotText),
        }
        if !empty {
            return Ok(block + 1);
        }
        self.nodes.remove(block);
        self.keys.remove(block);
        Ok(block)
    }

    fn insert_block(&mut self, node: Node) -> Result<Vec<NodePath>, StoreError> {
        let at = self.insertion_point()?;
        self.nodes.insert(at, node);
        self.keys.insert(at, BlockKey::new());
        self.selection = Point::start_of(&self.nodes, &[at]).map(Selection::collapsed);
        Ok(vec![vec![at]])
    }

    /// Leaves the caret after the rule, adding a paragraph if nothing follows.
    fn insert_hr(&mut self) -> Result<Vec<NodePath>, StoreError> {
        let at = self.insertion_point()?;
        self.nodes.insert(at, Node::void(ElementKind::Hr));
        self.keys.insert(at, BlockKey::new());
        let mut changed = vec![vec![at]];
        if at + 1 == self.nodes.len() {
            self.nodes.push(Node::paragraph(vec![Node::text("")]));
            self.keys.push(BlockKey::new());
            changed.push(vec![at + 1]);
        }
        self.selection = Point::start_of(&self.nodes, &[at + 1]).map(Selection::collapsed);
        Ok(changed)
    }

    fn edit_table(&mut self, edit: TableEdit) -> Result<Vec<NodePath>, StoreError> {
        let caret = self.caret()?;
        let pos = table::locate(&self.nodes, &caret.path).ok_or(StoreError::NotInTable)?;
        let before = self.nodes.clone();
        let node = node_at_mut(&mut self.nodes, &pos.table)
            .ok_or_else(|| StoreError::StalePath(pos.table.clone()))?;

        let remove_table = match edit {
            TableEdit::InsertRow => {
                table::insert_row(node, pos.row + 1);
                false
            }
            TableEdit::InsertColumn => {
                table::insert_column(node, pos.column + 1);
                false
            }
            TableEdit::DeleteRow => table::delete_row(node, pos.row).ok_or(StoreError::NotInTable)?,
            TableEdit::DeleteColumn => {
                table::delete_column(node, pos.column).ok_or(StoreError::NotInTable)?
            }
        };
        if remove_table {
            let (siblings, idx) = siblings_mut(&mut self.nodes, &pos.table)
                .ok_or_else(|| StoreError::StalePath(pos.table.clone()))?;
            siblings.remove(idx);
            if pos.table.len() == 1 {
                self.keys.remove(idx);
            }
            log::debug!("removed table at {:?}", pos.table);
        }
        if let Some(sel) = self.selection.take() {
            self.selection = selection::remap(&before, &self.nodes, &sel);
        }
        Ok(vec![pos.table])
    }

    fn replace_in_text(
        &mut self,
        search: &str,
        replace: &str,
        options: ReplaceOptions,
    ) -> Result<(usize, Vec<NodePath>), StoreError> {
        if search.is_empty() {
            return Ok((0, Vec::new()));
        }
        let escaped = regex::escape(search);
        let pattern = if options.whole_word {
            format!(r"\b{escaped}\b")
        } else {
            escaped
        };
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .build()?;

        let mut paths = Vec::new();
        collect_text_paths(&self.nodes, &mut Vec::new(), &mut paths);
        let mut count = 0;
        let mut changed = Vec::new();
        for path in paths {
            let Some(Node::Text(run)) = node_at_mut(&mut self.nodes, &path) else {
                continue;
            };
            let hits = re.find_iter(&run.text).count();
            if hits == 0 {
                continue;
            }
            if options.replace_all {
                run.text = re.replace_all(&run.text, NoExpand(replace)).into_owned();
                count += hits;
                changed.push(path);
            } else {
                run.text = re.replace(&run.text, NoExpand(replace)).into_owned();
                count += 1;
                changed.push(path);
                break;
            }
        }
        if let Some(sel) = self.selection.take() {
            self.selection = selection::remap(&self.nodes, &self.nodes, &sel);
        }
        Ok((count, changed))
    }
}

fn is_valid_node(node: &Node) -> bool {
    match node {
        Node::Element(el) => match &el.kind {
            ElementKind::Paragraph | ElementKind::List { .. } | ElementKind::ListItem => {
                !el.children.is_empty()
            }
            ElementKind::Image { url, .. } => !url.is_empty(),
            _ => true,
        },
        Node::Text(_) => true,
    }
}

fn text_run_mut<'a>(nodes: &'a mut [Node], path: &[usize]) -> Result<&'a mut TextRun, StoreError> {
    match node_at_mut(nodes, path) {
        Some(Node::Text(run)) => Ok(run),
        Some(Node::Element(_)) => Err(StoreError::NotText),
        None => Err(StoreError::StalePath(path.to_vec())),
    }
}

/// Inside a code block or frontmatter, where markdown is not converted.
fn in_raw_block(nodes: &[Node], leaf: &[usize]) -> bool {
    leaf.split_last()
        .and_then(|(_, parent)| node_at(nodes, parent))
        .and_then(Node::kind)
        .is_some_and(|k| matches!(k, ElementKind::Code { .. } | ElementKind::Frontmatter { .. }))
}

/// Byte index of char `chars` in `s`, clamped to its length.
fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Longest proper prefix of `path` whose element satisfies `pred`.
fn enclosing(
    nodes: &[Node],
    path: &[usize],
    pred: impl Fn(&ElementKind) -> bool,
) -> Option<NodePath> {
    (1..path.len())
        .rev()
        .map(|len| &path[..len])
        .find(|p| node_at(nodes, p).and_then(Node::kind).is_some_and(&pred))
        .map(<[usize]>::to_vec)
}

fn collect_text_paths(nodes: &[Node], prefix: &mut NodePath, out: &mut Vec<NodePath>) {
    for (i, node) in nodes.iter().enumerate() {
        prefix.push(i);
        match node {
            Node::Text(_) => out.push(prefix.clone()),
            Node::Element(el)
                if !matches!(
                    el.kind,
                    ElementKind::Code { .. } | ElementKind::Frontmatter { .. }
                ) =>
            {
                collect_text_paths(&el.children, prefix, out)
            }
            Node::Element(_) => {}
        }
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use pretty_assertions::assert_eq;

    fn caret(path: &[usize], offset: usize) -> Option<Selection> {
        Some(Selection::collapsed(Point::new(path.to_vec(), offset)))
    }

    fn typed(store: &mut EditorStore, text: &str) {
        for ch in text.chars() {
            store
                .apply(Cmd::InsertText {
                    text: ch.to_string(),
                })
                .unwrap();
        }
    }

    #[test]
    fn set_md_content_parses_and_versions() {
        let mut store = EditorStore::new();
        let patch = store.set_md_content("# Title\n\nBody");
        assert_eq!(store.nodes(), parse("# Title\n\nBody").schema.as_slice());
        assert_eq!(patch.version, 1);
        assert_eq!(store.keys().len(), 2);
    }

    #[test]
    fn unchanged_markdown_is_skipped() {
        let mut store = EditorStore::from_markdown("# Title\n\nBody");
        let version = store.version();
        let patch = store.set_md_content("  # Title\n\nBody\n\n");
        assert!(patch.is_noop());
        assert_eq!(store.version(), version);
    }

    #[test]
    fn literal_marker_paragraph_is_not_mistaken_for_a_heading() {
        let mut store = EditorStore::new();
        store.set_md_content("\\# x");
        assert_eq!(store.nodes(), parse("\\# x").schema.as_slice());

        let patch = store.set_md_content("# x");
        assert!(!patch.is_noop());
        assert_eq!(store.nodes(), parse("# x").schema.as_slice());
        assert_eq!(store.nodes()[0].kind(), Some(&ElementKind::Head { level: 1 }));
    }

    fn long_document() -> String {
        let mut md: Vec<String> = (0..60).map(|i| format!("Paragraph {i} of the reply.")).collect();
        md.insert(30, "```rust\nfn a() {}\n\nfn b() {}\n```".to_string());
        md.insert(0, "# Report".to_string());
        md.join("\n\n")
    }

    #[test]
    fn chunked_load_matches_a_single_parse() {
        let md = long_document();
        let mut progress = Vec::new();
        let mut store = EditorStore::new();
        let options = LoadOptions::default()
            .chunk_size(200)
            .batch_size(8)
            .on_progress(|p| progress.push(p));
        let patch = store.set_md_content_with(&md, options).unwrap();

        assert!(!patch.is_noop());
        assert_eq!(store.nodes(), parse(&md).schema.as_slice());
        assert_eq!(store.keys().len(), store.nodes().len());
        assert!(progress.len() > 1);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&1.0));
    }

    #[test]
    fn chunked_load_keeps_fenced_blank_lines() {
        let md = long_document();
        let mut store = EditorStore::new();
        store
            .set_md_content_with(&md, LoadOptions::default().chunk_size(200).batch_size(1))
            .unwrap();
        let code = store.nodes().iter().find_map(|n| match n.kind() {
            Some(ElementKind::Code { value, .. }) => Some(value.clone()),
            _ => None,
        });
        assert_eq!(code.as_deref(), Some("fn a() {}\n\nfn b() {}"));
    }

    #[test]
    fn cancelled_load_stops_between_batches() {
        let md = long_document();
        let mut store = EditorStore::new();
        let handle = store.cancel_handle();
        let options = LoadOptions::default()
            .chunk_size(200)
            .batch_size(10)
            .on_progress(move |_| handle.cancel());
        let err = store.set_md_content_with(&md, options).unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        assert_eq!(store.nodes().len(), 10);

        // the next load starts with a fresh flag
        store
            .set_md_content_with(&md, LoadOptions::default().chunk_size(200))
            .unwrap();
        assert_eq!(store.nodes(), parse(&md).schema.as_slice());
    }

    #[test]
    fn short_content_loads_in_one_step() {
        let mut progress = Vec::new();
        let mut store = EditorStore::new();
        let options = LoadOptions::default().on_progress(|p| progress.push(p));
        store.set_md_content_with("# Title\n\nBody", options).unwrap();
        assert_eq!(progress, vec![1.0]);
        assert_eq!(store.nodes(), parse("# Title\n\nBody").schema.as_slice());
    }

    #[test]
    fn keys_survive_in_place_updates() {
        let mut store = EditorStore::from_markdown("# Title\n\nBody");
        let keys = store.keys().to_vec();
        store.set_md_content("# Title\n\nBody grows");
        assert_eq!(store.keys(), keys.as_slice());

        store.set_md_content("Title\n\nBody grows");
        assert_ne!(store.key_of(0), Some(keys[0]));
        assert_eq!(store.key_of(1), Some(keys[1]));
    }

    #[test]
    fn invalid_nodes_are_filtered() {
        let mut store = EditorStore::new();
        store.update_node_list(vec![
            Node::paragraph(vec![]),
            Node::void(ElementKind::Image {
                url: String::new(),
                alt: "x".into(),
            }),
            Node::paragraph(vec![Node::text("kept")]),
        ]);
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.nodes()[0].text_content(), "kept");
    }

    #[test]
    fn streaming_append_keeps_caret() {
        let mut store = EditorStore::from_markdown("first");
        store.set_selection(caret(&[0, 0], 3));
        store.set_md_content("first\n\nsecond");
        assert_eq!(store.selection().cloned(), caret(&[0, 0], 3));
    }

    #[test]
    fn replaced_block_moves_caret_to_its_start() {
        let mut store = EditorStore::from_markdown("first\n\nsecond");
        store.set_selection(caret(&[1, 0], 4));
        store.set_md_content("first\n\n## second");
        assert_eq!(store.selection().cloned(), caret(&[1, 0], 0));
    }

    #[test]
    fn readonly_rejects_commands_but_takes_updates() {
        let mut store = EditorStore::from_markdown("text");
        store.set_readonly(true);
        store.set_selection(caret(&[0, 0], 0));
        assert!(matches!(
            store.apply(Cmd::InsertText { text: "x".into() }),
            Err(StoreError::Readonly)
        ));
        assert!(matches!(
            store.replace_text("text", "y", ReplaceOptions::default()),
            Err(StoreError::Readonly)
        ));
        store.set_md_content("text streamed");
        assert_eq!(store.nodes()[0].text_content(), "text streamed");
    }

    #[test]
    fn stale_caret_fails_without_changes() {
        let mut store = EditorStore::from_markdown("text");
        store.set_selection(caret(&[3, 0], 0));
        let version = store.version();
        assert!(matches!(
            store.apply(Cmd::InsertText { text: "x".into() }),
            Err(StoreError::StalePath(_))
        ));
        assert_eq!(store.version(), version);
        assert_eq!(store.markdown(), "text");
    }

    #[test]
    fn missing_selection_is_an_error() {
        let mut store = EditorStore::from_markdown("text");
        assert!(matches!(
            store.apply(Cmd::DeleteBackward),
            Err(StoreError::NoSelection)
        ));
    }

    #[test]
    fn typing_completes_bold() {
        let mut store = EditorStore::from_markdown("say");
        store.set_selection(caret(&[0, 0], 3));
        typed(&mut store, " **hi**");
        let para = &store.nodes()[0];
        assert_eq!(para.children().len(), 3);
        let bold = para.children()[1].as_text().unwrap();
        assert!(bold.bold && !bold.italic);
        assert_eq!(bold.text, "hi");
        assert_eq!(store.selection().cloned(), caret(&[0, 2], 0));
    }

    #[test]
    fn typing_completes_bold_italic_not_italic() {
        let mut store = EditorStore::from_markdown("x");
        store.set_selection(caret(&[0, 0], 1));
        typed(&mut store, " ***b***");
        let run = store.nodes()[0].children()[1].as_text().unwrap();
        assert!(run.bold && run.italic);
        assert_eq!(run.text, "b");
    }

    #[test]
    fn typing_hash_space_opens_heading() {
        let mut store = EditorStore::from_markdown("x");
        store.set_selection(Some(Selection {
            anchor: Point::new(vec![0, 0], 0),
            focus: Point::new(vec![0, 0], 1),
        }));
        typed(&mut store, "## ");
        assert_eq!(
            store.nodes()[0].kind(),
            Some(&ElementKind::Head { level: 2 })
        );
        typed(&mut store, "Hi");
        assert_eq!(store.markdown(), "## Hi");
    }

    #[test]
    fn typing_dash_space_opens_list_only_once() {
        let mut store = EditorStore::from_markdown("x");
        store.set_selection(Some(Selection {
            anchor: Point::new(vec![0, 0], 0),
            focus: Point::new(vec![0, 0], 1),
        }));
        typed(&mut store, "- a b");
        assert_eq!(store.markdown(), "- a b");
        assert_eq!(store.nodes().len(), 1);
    }

    #[test]
    fn backspace_deletes_then_demotes_heading() {
        let mut store = EditorStore::from_markdown("# ab");
        store.set_selection(caret(&[0, 0], 1));
        store.apply(Cmd::DeleteBackward).unwrap();
        assert_eq!(store.markdown(), "# b");
        store.apply(Cmd::DeleteBackward).unwrap();
        assert_eq!(store.nodes()[0].kind(), Some(&ElementKind::Paragraph));
    }

    #[test]
    fn backspace_at_paragraph_start_merges() {
        let mut store = EditorStore::from_markdown("one\n\ntwo");
        store.set_selection(caret(&[1, 0], 0));
        let patch = store.apply(Cmd::DeleteBackward).unwrap();
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.nodes()[0].text_content(), "onetwo");
        assert_eq!(patch.new_selection, caret(&[0, 1], 0));
        assert_eq!(store.keys().len(), 1);
    }

    #[test]
    fn editing_code_keeps_value_in_sync() {
        let mut store = EditorStore::from_markdown("```\nab\n```");
        store.set_selection(caret(&[0, 0], 2));
        store.apply(Cmd::InsertText { text: "c".into() }).unwrap();
        assert!(matches!(
            store.nodes()[0].kind(),
            Some(ElementKind::Code { value, .. }) if value == "abc"
        ));
    }

    #[test]
    fn heading_level_cycles() {
        let mut store = EditorStore::from_markdown("t");
        store.set_selection(caret(&[0, 0], 0));
        let level = |s: &EditorStore| match s.nodes()[0].kind() {
            Some(ElementKind::Head { level }) => Some(*level),
            _ => None,
        };
        store.apply(Cmd::IncreaseHeadingLevel).unwrap();
        assert_eq!(level(&store), Some(4));
        store.apply(Cmd::IncreaseHeadingLevel).unwrap();
        assert_eq!(level(&store), Some(3));
        store.apply(Cmd::DecreaseHeadingLevel).unwrap();
        store.apply(Cmd::DecreaseHeadingLevel).unwrap();
        assert_eq!(level(&store), None);
        store.apply(Cmd::DecreaseHeadingLevel).unwrap();
        assert_eq!(level(&store), Some(1));
        store.apply(Cmd::IncreaseHeadingLevel).unwrap();
        assert_eq!(level(&store), None);
        store.apply(Cmd::SetHeading { level: Some(2) }).unwrap();
        assert_eq!(level(&store), Some(2));
    }

    #[test]
    fn heading_commands_reject_other_blocks() {
        let mut store = EditorStore::from_markdown("> q");
        store.set_selection(caret(&[0, 0, 0], 0));
        assert!(matches!(
            store.apply(Cmd::SetHeading { level: Some(1) }),
            Err(StoreError::Unsupported("blockquote"))
        ));
    }

    #[test]
    fn toggle_quote_wraps_and_unwraps() {
        let mut store = EditorStore::from_markdown("## note");
        store.set_selection(caret(&[0, 0], 2));
        store.apply(Cmd::ToggleQuote).unwrap();
        assert_eq!(store.markdown(), "> note");
        assert_eq!(store.selection().cloned(), caret(&[0, 0, 0], 2));

        store.apply(Cmd::ToggleQuote).unwrap();
        assert_eq!(store.markdown(), "note");
        assert_eq!(store.selection().cloned(), caret(&[0, 0], 2));
    }

    #[test]
    fn hr_at_end_adds_a_paragraph() {
        let mut store = EditorStore::from_markdown("text");
        store.set_selection(caret(&[0, 0], 4));
        let patch = store.apply(Cmd::InsertHorizontalRule).unwrap();
        assert_eq!(store.nodes().len(), 3);
        assert_eq!(store.nodes()[1].kind(), Some(&ElementKind::Hr));
        assert_eq!(patch.new_selection, caret(&[2, 0], 0));
    }

    #[test]
    fn table_replaces_empty_paragraph() {
        let mut store = EditorStore::new();
        store.update_node_list(vec![Node::paragraph(vec![Node::text("")])]);
        store.set_selection(caret(&[0, 0], 0));
        store
            .apply(Cmd::InsertTable { rows: 3, cols: 3 })
            .unwrap();
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(table::width(&store.nodes()[0]), 3);
        assert_eq!(store.selection().cloned(), caret(&[0, 0, 0, 0], 0));
    }

    #[test]
    fn code_block_goes_after_heading() {
        let mut store = EditorStore::from_markdown("# h");
        store.set_selection(caret(&[0, 0], 1));
        store
            .apply(Cmd::InsertCodeBlock {
                language: Some("rust".into()),
            })
            .unwrap();
        assert_eq!(store.markdown(), "# h\n\n```rust\n```");
    }

    #[test]
    fn table_rows_and_columns() {
        let mut store = EditorStore::from_markdown("| a | b |\n| - | - |\n| 1 | 2 |");
        store.set_selection(caret(&[0, 1, 0, 0], 1));
        store.apply(Cmd::InsertTableColumn).unwrap();
        store.apply(Cmd::InsertTableRow).unwrap();
        assert_eq!(
            store.markdown(),
            "| a |  | b |\n| --- | --- | --- |\n| 1 |  | 2 |\n|  |  |  |"
        );
        store.apply(Cmd::DeleteTableRow).unwrap();
        assert_eq!(store.nodes()[0].children().len(), 2);
    }

    #[test]
    fn table_command_outside_table() {
        let mut store = EditorStore::from_markdown("text");
        store.set_selection(caret(&[0, 0], 0));
        assert!(matches!(
            store.apply(Cmd::DeleteTableColumn),
            Err(StoreError::NotInTable)
        ));
    }

    #[test]
    fn replace_text_options() {
        let md = "Cat cat concat\n\n```\ncat\n```";
        let mut store = EditorStore::from_markdown(md);
        assert_eq!(
            store
                .replace_text("cat", "dog", ReplaceOptions::default())
                .unwrap(),
            3
        );
        assert_eq!(store.nodes()[0].text_content(), "dog dog condog");
        assert_eq!(store.nodes()[1].text_content(), "cat");

        let mut store = EditorStore::from_markdown(md);
        let opts = ReplaceOptions {
            case_sensitive: true,
            whole_word: true,
            replace_all: true,
        };
        assert_eq!(store.replace_text("cat", "dog", opts).unwrap(), 1);
        assert_eq!(store.nodes()[0].text_content(), "Cat dog concat");

        let mut store = EditorStore::from_markdown(md);
        let opts = ReplaceOptions {
            replace_all: false,
            ..ReplaceOptions::default()
        };
        assert_eq!(store.replace_text("cat", "$1", opts).unwrap(), 1);
        assert_eq!(store.nodes()[0].text_content(), "$1 cat concat");
        assert_eq!(store.replace_text("", "x", opts).unwrap(), 0);
    }
}
