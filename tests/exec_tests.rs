//! Tests for built-in commands, external commands and Look
//!
//! Commands are run through `exec::execute` directly, the same entry point
//! the action dispatcher uses after a button-2 sweep.

mod common;

use common::{SETTLE, TestEditor, body, contents, selection, tag, wait_for};
use std::sync::Arc;
use std::time::Duration;
use winrow::command::launch_edit;
use winrow::exec;
use winrow::text::TextKind;
use winrow::window::LockOwner;
use winrow_dumpfile::Content;

#[tokio::test(flavor = "multi_thread")]
async fn test_del_refuses_dirty_window_once() {
    let t = TestEditor::new();
    let path = t.write("dirty.txt", "text\n");
    let name = path.to_string_lossy().to_string();
    let w = t.open(&path);
    w.lock(LockOwner::Editor).body.insert(0, "more ");

    exec::execute(&t.editor, &tag(&w), "Del").await;
    assert_eq!(t.errors(""), format!("{} modified\n", name));
    assert!(!w.is_closed());

    exec::execute(&t.editor, &tag(&w), "Del").await;
    assert!(w.is_closed());
    assert!(t.lookfile(&name).is_none());
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_ignores_changes() {
    let t = TestEditor::new();
    let w = t.open(&t.write("x.txt", "x"));
    w.lock(LockOwner::Editor).body.insert(0, "y");
    exec::execute(&t.editor, &tag(&w), "Delete").await;
    assert!(w.is_closed());
    assert_eq!(t.errors(""), "");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_del_of_zeroxed_window_needs_no_confirmation() {
    let t = TestEditor::new();
    let w = t.open(&t.write("z.txt", "z"));
    exec::execute(&t.editor, &tag(&w), "Zerox").await;
    assert_eq!(t.window_count(), 2);
    w.lock(LockOwner::Editor).body.insert(0, "edit ");

    exec::execute(&t.editor, &tag(&w), "Del").await;
    assert!(w.is_closed());
    assert_eq!(t.window_count(), 1);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zerox_of_directory_is_refused() {
    let t = TestEditor::new();
    let dir = t.dir.path().to_path_buf();
    let w = t.open(&dir);
    exec::execute(&t.editor, &tag(&w), "Zerox").await;
    assert_eq!(t.window_count(), 1);
    assert!(t.errors("").contains("is a directory; Zerox illegal"));
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_put_and_get() {
    let t = TestEditor::new();
    let path = t.write("p.txt", "old\n");
    let w = t.open(&path);
    w.lock(LockOwner::Editor).body.insert(0, "new ");

    exec::execute(&t.editor, &tag(&w), "Put").await;
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "new old\n");
    assert!(!w.file().lock().dirty());
    assert!(!contents(&w, TextKind::Tag).contains(" Put |"));

    std::fs::write(&path, "changed on disk\n").unwrap();
    exec::execute(&t.editor, &tag(&w), "Get").await;
    assert_eq!(contents(&w, TextKind::Body), "changed on disk\n");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_put_under_mount_point_is_refused() {
    let mtpt = tempfile::TempDir::new().unwrap();
    let config = winrow::Config {
        mount_point: Some(mtpt.path().to_string_lossy().to_string()),
        ..winrow::Config::default()
    };
    let t = TestEditor::with_config(config);
    let path = mtpt.path().join("ctl");
    let w = t.open(&path);
    w.lock(LockOwner::Editor).body.insert(0, "x");
    exec::execute(&t.editor, &tag(&w), "Put").await;
    assert!(!path.exists());
    assert!(t.errors("").contains("can't Put to the mount point"));
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_putall_saves_dirty_files() {
    let t = TestEditor::new();
    let a = t.open(&t.write("a.txt", "a"));
    let b = t.open(&t.write("b.txt", "b"));
    a.lock(LockOwner::Editor).body.insert(1, "1");
    b.lock(LockOwner::Editor).body.insert(1, "2");
    exec::execute(&t.editor, &tag(&a), "Putall").await;
    assert_eq!(std::fs::read_to_string(t.path("a.txt")).unwrap(), "a1");
    assert_eq!(std::fs::read_to_string(t.path("b.txt")).unwrap(), "b2");
    assert!(t.editor.row().clean());
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_undo_and_redo() {
    let t = TestEditor::new();
    let w = t.open(&t.write("u.txt", "base"));
    w.lock(LockOwner::Editor).body.insert(4, "+edit");
    exec::execute(&t.editor, &tag(&w), "Undo").await;
    assert_eq!(contents(&w, TextKind::Body), "base");
    assert!(contents(&w, TextKind::Tag).contains(" Redo"));
    exec::execute(&t.editor, &tag(&w), "Redo").await;
    assert_eq!(contents(&w, TextKind::Body), "base+edit");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_snarf_copies_body_selection() {
    let t = TestEditor::new();
    let w = t.open(&t.write("s.txt", "copy this"));
    w.lock(LockOwner::Editor).body.set_select(5, 9);
    exec::execute(&t.editor, &tag(&w), "Snarf").await;
    assert_eq!(t.editor.snarf(), "this");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_look_builtin_searches_with_wraparound() {
    let t = TestEditor::new();
    let w = t.open(&t.write("l.txt", "needle hay needle"));
    w.lock(LockOwner::Editor).body.set_select(11, 17);
    exec::execute(&t.editor, &tag(&w), "Look needle").await;
    assert_eq!(selection(&w, TextKind::Body), (0, 6));
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_look_opens_existing_file_at_line() {
    let t = TestEditor::new();
    let w = t.open(&t.write("index.txt", "see other.txt:2\n"));
    let other = t.write("other.txt", "first\nsecond\n");

    exec::look(&t.editor, &body(&w), "other.txt:2", 4, 15);

    let opened = t.lookfile(&other.to_string_lossy()).expect("opened file");
    assert_eq!(selection(&opened, TextKind::Body), (6, 13));
    assert!(
        t.editor
            .row()
            .focus
            .active
            .as_ref()
            .is_some_and(|a| a.id() == opened.id())
    );

    // A second look reuses the window.
    exec::look(&t.editor, &body(&w), "other.txt", 4, 13);
    assert_eq!(t.window_count(), 2);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_new_opens_named_files_relative_to_window() {
    let t = TestEditor::new();
    let w = t.open(&t.write("origin.txt", ""));
    t.write("n1.txt", "one");
    exec::execute(&t.editor, &tag(&w), "New n1.txt n2.txt").await;
    assert_eq!(t.body_of(&t.path("n1.txt").to_string_lossy()).as_deref(), Some("one"));
    assert_eq!(t.body_of(&t.path("n2.txt").to_string_lossy()).as_deref(), Some(""));

    exec::execute(&t.editor, &tag(&w), "New").await;
    assert_eq!(t.window_count(), 4);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exit_waits_for_dirty_windows() {
    let t = TestEditor::new();
    let path = t.write("e.txt", "e");
    let w = t.open(&path);
    w.lock(LockOwner::Editor).body.insert(0, "x");

    exec::execute(&t.editor, &tag(&w), "Exit").await;
    assert!(!t.editor.is_shutting_down());
    assert_eq!(t.errors(""), format!("{} modified\n", path.to_string_lossy()));

    exec::execute(&t.editor, &tag(&w), "Exit").await;
    assert!(t.editor.is_shutting_down());
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_external_command_output_goes_to_directory_errors() {
    let t = TestEditor::new();
    let dir = t.dir.path().to_string_lossy().to_string();
    let w = t.open(&t.write("run.txt", ""));
    exec::execute(&t.editor, &tag(&w), "echo hello; exit 3").await;

    assert!(wait_for(|| t.errors(&dir).contains("hello\n")).await);
    assert!(wait_for(|| t.errors(&dir).contains("echo : exit status: 3")).await);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_stops_running_command() {
    let t = TestEditor::new();
    let w = t.open(&t.write("k.txt", ""));
    exec::execute(&t.editor, &tag(&w), "sleep 30").await;
    assert_eq!(t.editor.commands().running().await, vec!["sleep ".to_string()]);

    exec::execute(&t.editor, &tag(&w), "Kill sleep").await;
    let mut stopped = false;
    for _ in 0..500 {
        if t.editor.commands().running().await.is_empty() {
            stopped = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(stopped, "sleep should have been killed");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_miss_warns() {
    let t = TestEditor::new();
    let w = t.open(&t.write("m.txt", ""));
    exec::execute(&t.editor, &tag(&w), "Kill nosuch").await;
    assert!(wait_for(|| t.errors("").contains("Kill: no process nosuch\n")).await);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dump_and_load_commands() {
    let t = TestEditor::new();
    let path = t.write("dl.txt", "dumped\n");
    let w = t.open(&path);
    let dump = t.path("cmd.dump").to_string_lossy().to_string();

    exec::execute(&t.editor, &tag(&w), &format!("Dump {}", dump)).await;
    let mut content = Content::load(&dump).unwrap();
    assert_eq!(content.windows.len(), 1);
    content.current_dir.clear();
    content.save(&dump).unwrap();

    exec::execute(&t.editor, &tag(&w), &format!("Load {}", dump)).await;
    assert_eq!(t.window_count(), 2);
    assert_eq!(t.errors(""), "");

    exec::execute(&t.editor, &tag(&w), "Load /nonexistent/winrow.dump").await;
    assert!(t.errors("").starts_with("Load: "));
    t.stop().await;
}

async fn wait_until_idle(t: &TestEditor) -> bool {
    for _ in 0..500 {
        if t.editor.commands().running().await.is_empty() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread")]
async fn test_filter_replaces_selection_with_output() {
    let t = TestEditor::new();
    let w = t.open(&t.write("f.txt", "keep shout keep"));
    w.lock(LockOwner::Editor).body.set_select(5, 10);
    exec::execute(&t.editor, &tag(&w), "|tr a-z A-Z").await;

    assert!(wait_for(|| contents(&w, TextKind::Body) == "keep SHOUT keep").await);
    assert_eq!(selection(&w, TextKind::Body), (5, 10));
    assert!(t.editor.commands().running().await.is_empty());

    // The replacement is a single undo step.
    exec::execute(&t.editor, &tag(&w), "Undo").await;
    assert_eq!(contents(&w, TextKind::Body), "keep shout keep");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_input_command_inserts_output() {
    let t = TestEditor::new();
    let w = t.open(&t.write("i.txt", "x\n"));
    exec::execute(&t.editor, &tag(&w), "<echo inserted").await;
    assert!(wait_for(|| contents(&w, TextKind::Body) == "inserted\nx\n").await);
    assert_eq!(selection(&w, TextKind::Body), (0, 9));
    assert!(w.file().lock().dirty());
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_output_command_sends_selection() {
    let t = TestEditor::new();
    let dir = t.dir.path().to_string_lossy().to_string();
    let w = t.open(&t.write("o.txt", "sent text\nrest\n"));
    w.lock(LockOwner::Editor).body.set_select(0, 10);
    exec::execute(&t.editor, &tag(&w), ">cat").await;
    assert!(wait_for(|| t.errors(&dir).contains("sent text\n")).await);
    assert!(wait_until_idle(&t).await);
    assert_eq!(contents(&w, TextKind::Body), "sent text\nrest\n");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_killed_filter_leaves_body_and_releases_barrier() {
    let t = TestEditor::new();
    let w = t.open(&t.write("kf.txt", "untouched"));
    w.lock(LockOwner::Editor).body.set_select(0, 9);
    exec::execute(&t.editor, &tag(&w), "|sleep 30").await;
    assert_eq!(t.editor.commands().running().await, vec!["sleep ".to_string()]);

    exec::execute(&t.editor, &tag(&w), "Kill sleep").await;
    assert!(wait_until_idle(&t).await, "sleep should have been killed");

    // A later edit command is not held up by the killed one.
    exec::execute(&t.editor, &tag(&w), "|tr a-z A-Z").await;
    assert!(wait_for(|| contents(&w, TextKind::Body) == "UNTOUCHED").await);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_edit_barrier_releases_on_exit_and_kill() {
    let t = TestEditor::new();
    let shell = t.editor.config().shell_program();
    let dir = t.dir.path();

    let run = launch_edit(t.editor.commands(), t.editor.warnings(), None, &shell, dir, "printf done", None, true)
        .await
        .unwrap();
    let out = run.output.await.unwrap();
    assert_eq!(out.text, "done");
    assert!(!out.signaled);
    let released = tokio::time::timeout(SETTLE, t.editor.wait_edit_done()).await;
    assert_eq!(released.unwrap(), Some(()));

    let run = launch_edit(t.editor.commands(), t.editor.warnings(), None, &shell, dir, "sleep 30", None, true)
        .await
        .unwrap();
    let waiter = {
        let editor = Arc::clone(&t.editor);
        tokio::spawn(async move { editor.wait_edit_done().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    t.editor.commands().kill("sleep").await;
    let released = tokio::time::timeout(SETTLE, waiter).await;
    assert_eq!(released.unwrap().unwrap(), Some(()));
    assert!(run.output.await.unwrap().signaled);
    t.stop().await;
}
