//! Commands run by button 2 and files opened by button 3.
//!
//! A handful of words name built-in commands acting on the window the
//! command was run from; anything else is an external command line run by
//! the shell in that window's directory. Look opens the named file if it
//! exists and otherwise searches the window's body for the text.
//!
//! A command line starting with `<`, `|` or `>` is an edit command on the
//! body selection: `<` replaces it with the command's output, `|` filters
//! it through the command and `>` sends it to the command.

use crate::command::{launch, launch_edit};
use crate::editor::Editor;
use crate::events::EventKind;
use crate::mount::{MountDir, is_mount_point};
use crate::row::Row;
use crate::text::TextKind;
use crate::traits::PlumbMessage;
use crate::window::{LockOwner, TextRef, Window};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run `command` on behalf of the text it was selected in.
pub async fn execute(editor: &Arc<Editor>, source: &TextRef, command: &str) {
    let command = command.trim();
    let (word, arg) = match command.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (command, ""),
    };
    let window = &source.window;
    log::debug!("window {}: execute {:?}", window.id(), command);
    if let Some(op) = command.chars().next().filter(|c| matches!(c, '<' | '|' | '>')) {
        pipe(editor, window, op, &command[1..]).await;
        return;
    }
    match word {
        "Del" => del(editor, window, false),
        "Delete" => del(editor, window, true),
        "Get" => get(editor, window, arg),
        "Put" => put(editor, window, arg),
        "Putall" => putall(editor),
        "Undo" => undo(editor, window, true),
        "Redo" => undo(editor, window, false),
        "Snarf" => snarf(editor, window),
        "Look" => look_builtin(editor, window, arg),
        "Kill" => kill(editor, arg).await,
        "Dump" => dump(editor, arg),
        "Load" => load(editor, arg).await,
        "Zerox" => zerox(editor, window),
        "Font" => font(editor, window, arg),
        "New" => new(editor, window, arg),
        "Exit" => exit(editor),
        _ => run(editor, window, command).await,
    }
}

fn warn(editor: &Editor, text: String) {
    editor.warnings().add(None, text);
}

fn del(editor: &Arc<Editor>, window: &Arc<Window>, force: bool) {
    let mut row = editor.row();
    if !force {
        let clean = window.lock(LockOwner::Editor).is_clean();
        let zeroxed = row
            .column
            .windows()
            .any(|w| w.id() != window.id() && w.shares_file(window));
        if !clean && !zeroxed {
            let mut file = window.file().lock();
            warn(editor, format!("{} modified\n", file.name()));
            // A second Del goes through.
            file.treat_as_clean();
            return;
        }
    }
    editor.close_window(&mut row, window);
}

fn get(editor: &Arc<Editor>, window: &Arc<Window>, arg: &str) {
    let row = editor.row();
    let name = {
        let mut w = window.lock(LockOwner::Editor);
        if !arg.is_empty() {
            w.set_name(&absolute(arg));
        }
        w.name()
    };
    if name.is_empty() {
        warn(editor, "Get: no file name\n".to_string());
        return;
    }
    let loaded = window.file().lock().load_path(Path::new(&name));
    if let Err(e) = loaded {
        warn(editor, format!("{}: {}\n", name, e));
        return;
    }
    for view in views(&row, window) {
        let mut w = view.lock(LockOwner::Editor);
        let n = w.body.len();
        let (q0, q1) = w.body.selection();
        w.body.set_select(q0.min(n), q1.min(n));
        w.set_tag();
    }
    let current = current_view(&row, window);
    let mut w = current.lock(LockOwner::Editor);
    let (q0, q1) = w.body.selection();
    w.body.show(q0, q1);
}

fn put(editor: &Arc<Editor>, window: &Arc<Window>, arg: &str) {
    let row = editor.row();
    let name = {
        let mut w = window.lock(LockOwner::Editor);
        w.commit(TextKind::Tag);
        if !arg.is_empty() {
            w.set_name(&absolute(arg));
        }
        w.name()
    };
    if name.is_empty() {
        warn(editor, "Put: no file name\n".to_string());
        return;
    }
    let mtpt = editor.config().mount_point.clone().unwrap_or_default();
    if is_mount_point(&mtpt, &name) {
        warn(editor, format!("{}: can't Put to the mount point\n", name));
        return;
    }
    // Typing still pending in the view typed into last belongs in the file.
    let current = current_view(&row, window);
    current.lock(LockOwner::Editor).body.commit();
    let saved = window.file().lock().save();
    match saved {
        Ok(()) => retag(&row, window),
        Err(e) => warn(editor, format!("{}: {}\n", name, e)),
    }
}

fn putall(editor: &Arc<Editor>) {
    let row = editor.row();
    for window in row.column.windows() {
        let mut w = window.lock(LockOwner::Editor);
        let (name, dirty, is_dir) = {
            let file = window.file().lock();
            (file.name().to_string(), file.dirty(), file.is_dir())
        };
        if name.is_empty() || name.starts_with('+') || is_dir || !dirty {
            // A zerox saved earlier in the loop still shows Put.
            w.set_tag();
            continue;
        }
        let saved = window.file().lock().save();
        match saved {
            Ok(()) => w.set_tag(),
            Err(e) => warn(editor, format!("{}: {}\n", name, e)),
        }
    }
}

fn undo(editor: &Arc<Editor>, window: &Arc<Window>, is_undo: bool) {
    let row = editor.row();
    let current = current_view(&row, window);
    {
        let mut w = current.lock(LockOwner::Editor);
        w.body.commit();
        let changed = {
            let mut file = current.file().lock();
            if is_undo { file.undo() } else { file.redo() }
        };
        if let Some((q0, q1)) = changed {
            w.body.show(q0, q1);
        }
    }
    retag(&row, window);
}

/// Every window showing `window`'s file, `window` included.
fn views(row: &Row, window: &Arc<Window>) -> Vec<Arc<Window>> {
    let mut views: Vec<Arc<Window>> = row
        .column
        .windows()
        .filter(|w| w.shares_file(window))
        .cloned()
        .collect();
    if !views.iter().any(|w| w.id() == window.id()) {
        views.push(Arc::clone(window));
    }
    views
}

/// The view of `window`'s file typed into last, or `window` itself.
fn current_view(row: &Row, window: &Arc<Window>) -> Arc<Window> {
    let id = window.file().lock().cur_text();
    id.and_then(|id| row.lookup(id.window))
        .filter(|w| w.shares_file(window))
        .unwrap_or_else(|| Arc::clone(window))
}

/// Rebuild the tag of every view of `window`'s file.
fn retag(row: &Row, window: &Arc<Window>) {
    for view in views(row, window) {
        view.lock(LockOwner::Editor).set_tag();
    }
}

fn snarf(editor: &Arc<Editor>, window: &Arc<Window>) {
    let w = window.lock(LockOwner::Editor);
    let (q0, q1) = w.body.selection();
    editor.set_snarf(w.body.read(q0, q1));
}

fn look_builtin(editor: &Arc<Editor>, window: &Arc<Window>, arg: &str) {
    let target = if arg.is_empty() {
        let w = window.lock(LockOwner::Editor);
        let (q0, q1) = w.body.selection();
        w.body.read(q0, q1)
    } else {
        arg.to_string()
    };
    if target.is_empty() {
        return;
    }
    let from = window.lock(LockOwner::Editor).body.selection().1;
    search(editor, window, &target, from);
}

async fn kill(editor: &Arc<Editor>, arg: &str) {
    let names: Vec<String> = if arg.is_empty() {
        editor
            .commands()
            .running()
            .await
            .into_iter()
            .map(|n| n.trim_end().to_string())
            .collect()
    } else {
        shell_words::split(arg).unwrap_or_else(|_| arg.split_whitespace().map(str::to_string).collect())
    };
    for name in names {
        editor.commands().kill(name).await;
    }
}

fn dump_target(editor: &Editor, arg: &str) -> Option<PathBuf> {
    if arg.is_empty() {
        editor.config().dump_path()
    } else {
        Some(PathBuf::from(absolute(arg)))
    }
}

fn dump(editor: &Arc<Editor>, arg: &str) {
    let Some(path) = dump_target(editor, arg) else {
        warn(editor, "Dump: no dump file\n".to_string());
        return;
    };
    if let Err(e) = editor.dump_session(&path) {
        warn(editor, format!("Dump: {}\n", e));
    }
}

async fn load(editor: &Arc<Editor>, arg: &str) {
    let Some(path) = dump_target(editor, arg) else {
        warn(editor, "Load: no dump file\n".to_string());
        return;
    };
    if let Err(e) = editor.load_session(&path, false).await {
        warn(editor, format!("Load: {}\n", e));
    }
}

fn zerox(editor: &Arc<Editor>, window: &Arc<Window>) {
    let mut row = editor.row();
    let (name, is_dir) = {
        let file = window.file().lock();
        (file.name().to_string(), file.is_dir())
    };
    if is_dir {
        warn(editor, format!("{} is a directory; Zerox illegal\n", name));
        return;
    }
    match editor.add_window(&mut row, Some(window), "") {
        Ok(clone) => editor.events().log(clone.id(), EventKind::New, name),
        Err(e) => warn(editor, format!("Zerox: {:#}\n", e)),
    }
}

/// Name a body font, or toggle between the row's two fonts.
fn font(editor: &Arc<Editor>, window: &Arc<Window>, arg: &str) {
    let row = editor.row();
    let mut w = window.lock(LockOwner::Editor);
    w.font = if !arg.is_empty() {
        arg.to_string()
    } else if w.font == row.fixed_font {
        row.var_font.clone()
    } else {
        row.fixed_font.clone()
    };
    log::debug!("window {}: font {:?}", window.id(), w.font);
}

fn new(editor: &Arc<Editor>, window: &Arc<Window>, arg: &str) {
    let mut row = editor.row();
    if arg.is_empty() {
        match editor.add_window(&mut row, None, "") {
            Ok(w) => editor.events().log(w.id(), EventKind::New, ""),
            Err(e) => warn(editor, format!("New: {:#}\n", e)),
        }
        return;
    }
    let dir = window.lock(LockOwner::Editor).dir_name();
    for name in arg.split_whitespace() {
        let path = resolve(&dir, &row.wdir, name);
        if let Err(e) = editor.readfile(&mut row, &path.to_string_lossy()) {
            warn(editor, format!("New: {:#}\n", e));
        }
    }
}

fn exit(editor: &Arc<Editor>) {
    let row = editor.row();
    let mut dirty = false;
    for window in row.column.windows() {
        if window.lock(LockOwner::Editor).is_clean() {
            continue;
        }
        dirty = true;
        let mut file = window.file().lock();
        warn(editor, format!("{} modified\n", file.name()));
        file.treat_as_clean();
    }
    if dirty {
        return;
    }
    log::info!("Exit");
    editor.shutdown();
}

async fn run(editor: &Arc<Editor>, window: &Arc<Window>, cmdline: &str) {
    let (dir, incl) = {
        let w = window.lock(LockOwner::Editor);
        (w.dir_name(), w.incl.clone())
    };
    let dir = if dir.is_empty() { editor.row().wdir.clone() } else { dir };
    let mount = MountDir::new(dir.clone(), incl);
    let shell = editor.config().shell_program();
    let started = launch(
        editor.commands(),
        editor.warnings(),
        Some(Arc::clone(&mount)),
        &shell,
        Path::new(&dir),
        cmdline,
    )
    .await;
    if let Err(e) = started {
        editor.warnings().add(Some(&mount), format!("{}\n", e));
    }
}

/// Start an edit command on the body selection of `window`.
///
/// The result is applied from a separate task once the command's output
/// is in and the edit barrier has released, so `Kill` can still reach a
/// command that never finishes.
async fn pipe(editor: &Arc<Editor>, window: &Arc<Window>, op: char, cmdline: &str) {
    let (dir, incl, q0, q1, input) = {
        let _row = editor.row();
        let mut w = window.lock(LockOwner::Editor);
        w.body.commit();
        let (q0, q1) = w.body.selection();
        let input = (op != '<').then(|| w.body.read(q0, q1));
        (w.dir_name(), w.incl.clone(), q0, q1, input)
    };
    let dir = if dir.is_empty() { editor.row().wdir.clone() } else { dir };
    let mount = MountDir::new(dir.clone(), incl);
    let shell = editor.config().shell_program();
    let started = launch_edit(
        editor.commands(),
        editor.warnings(),
        Some(Arc::clone(&mount)),
        &shell,
        Path::new(&dir),
        cmdline,
        input,
        op != '>',
    )
    .await;
    let run = match started {
        Ok(run) => run,
        Err(e) => {
            editor.warnings().add(Some(&mount), format!("{}\n", e));
            return;
        }
    };

    let editor = Arc::clone(editor);
    let window = Arc::clone(window);
    tokio::spawn(async move {
        let output = run.output.await.ok();
        if editor.wait_edit_done().await.is_none() {
            return;
        }
        crate::debug_log!("EXEC", "edit command {} done: {:?}", run.pid, output);
        if op != '>'
            && let Some(output) = output.filter(|o| !o.signaled)
        {
            replace_selection(&editor, &window, q0, q1, &output.text);
        }
        editor.flush_warnings();
    });
}

/// Replace `[q0, q1)` of the body with `text` and select the result.
fn replace_selection(editor: &Arc<Editor>, window: &Arc<Window>, q0: usize, q1: usize, text: &str) {
    let _row = editor.row();
    if window.is_closed() {
        return;
    }
    let mut w = window.lock(LockOwner::Editor);
    let n = w.body.len();
    let (q0, q1) = (q0.min(n), q1.min(n));
    window.file().lock().mark();
    w.body.delete(q0, q1);
    w.body.insert(q0, text);
    w.body.show(q0, q0 + text.chars().count());
    w.set_tag();
}

/// Absolute form of `name`, relative to the process directory.
fn absolute(name: &str) -> String {
    std::path::absolute(name)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| name.to_string())
}

/// `name` made absolute against `dir`, falling back to `wdir`.
fn resolve(dir: &str, wdir: &str, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let base = if dir.is_empty() { wdir } else { dir };
    Path::new(base).join(path)
}

/// Split `file:line` into the file and a 1-based line number.
fn split_address(target: &str) -> (&str, Option<usize>) {
    if let Some((file, addr)) = target.rsplit_once(':')
        && let Ok(line) = addr.parse::<usize>()
    {
        return (file, Some(line));
    }
    (target, None)
}

/// Rune range of 1-based `line` in `s`, newline included.
fn line_range(s: &str, line: usize) -> (usize, usize) {
    let mut start = 0;
    let mut current = 1;
    for (i, c) in s.chars().enumerate() {
        if current == line {
            start = i;
            break;
        }
        if c == '\n' {
            current += 1;
            start = i + 1;
        }
    }
    if current < line {
        let n = s.chars().count();
        return (n, n);
    }
    let len = s
        .chars()
        .skip(start)
        .position(|c| c == '\n')
        .map(|p| p + 1)
        .unwrap_or_else(|| s.chars().count() - start);
    (start, start + len)
}

/// Button-3 release: open the file named by `target` if it exists,
/// otherwise search the window's body for it.
pub fn look(editor: &Arc<Editor>, source: &TextRef, target: &str, _q0: usize, q1: usize) {
    let target = target.trim();
    let (file, line) = split_address(target);
    let wdir = editor.row().wdir.clone();
    let dir = source.window.lock(LockOwner::Editor).dir_name();
    let path = resolve(&dir, &wdir, file);
    if !file.is_empty() && path.exists() {
        open_file(editor, &path, line);
        return;
    }
    let from = match source.kind {
        TextKind::Body => q1,
        TextKind::Tag => source.window.lock(LockOwner::Editor).body.selection().1,
    };
    search(editor, &source.window, target, from);
}

/// Show `path` in a window, opening one if none shows it yet.
fn open_file(editor: &Arc<Editor>, path: &Path, line: Option<usize>) -> Option<Arc<Window>> {
    let name = path.to_string_lossy().to_string();
    let mut row = editor.row();
    let window = match row.lookfile(&name) {
        Some(window) => window,
        None => match editor.readfile(&mut row, &name) {
            Ok(window) => window,
            Err(e) => {
                warn(editor, format!("{}: {:#}\n", name, e));
                return None;
            }
        },
    };
    let mut w = window.lock(LockOwner::Editor);
    if let Some(line) = line {
        let (q0, q1) = line_range(&w.body.contents(), line);
        w.body.show(q0, q1);
    }
    let target = w.body.rect();
    drop(w);
    if let Some(display) = window.display() {
        display.move_cursor(crate::geometry::Point::new(target.min.x + 3, target.min.y + 3));
    }
    row.focus.active = Some(Arc::clone(&window));
    Some(window)
}

/// Select the next occurrence of `target` in the body at or after `from`,
/// wrapping around to the start.
fn search(editor: &Arc<Editor>, window: &Arc<Window>, target: &str, from: usize) {
    let _row = editor.row();
    let mut w = window.lock(LockOwner::Editor);
    let body: Vec<char> = w.body.contents().chars().collect();
    let needle: Vec<char> = target.chars().collect();
    if needle.is_empty() || needle.len() > body.len() {
        return;
    }
    let matches_at = |i: usize| body[i..].starts_with(&needle);
    let last = body.len() - needle.len();
    let found = (from.min(last + 1)..=last)
        .find(|&i| matches_at(i))
        .or_else(|| (0..from.min(last + 1)).find(|&i| matches_at(i)));
    match found {
        Some(q) => w.body.show(q, q + needle.len()),
        None => log::debug!("look: {:?} not found in window {}", target, window.id()),
    }
}

/// Plumbed `showfile` (or untyped) text message: open the named file.
pub fn plumb_look(editor: &Arc<Editor>, msg: &PlumbMessage) {
    let data = msg.data.trim();
    if data.is_empty() {
        return;
    }
    let path = resolve(&msg.dir, &editor.row().wdir, data);
    let line = msg.attr("addr").and_then(|a| a.trim().parse::<usize>().ok());
    open_file(editor, &path, line);
}

/// Plumbed `showdata` message: show the data in a new window.
pub fn plumb_show(editor: &Arc<Editor>, msg: &PlumbMessage) {
    let name = match msg.attr("filename") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if msg.dir.is_empty() => "+plumb".to_string(),
        _ => Path::new(&msg.dir).join("+plumb").to_string_lossy().to_string(),
    };
    let mut row = editor.row();
    let window = match editor.add_window(&mut row, None, &name) {
        Ok(window) => window,
        Err(e) => {
            crate::debug_error!("PLUMB", "can't show plumbed data: {:#}", e);
            return;
        }
    };
    {
        let mut w = window.lock(LockOwner::Editor);
        w.body.insert(0, &msg.data);
        w.body.set_select(0, 0);
        window.file().lock().treat_as_clean();
        w.set_tag();
    }
    editor.events().log(window.id(), EventKind::New, name);
}
