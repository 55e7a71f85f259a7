//! Tests for session dump and load
//!
//! A dump classifies every window as Saved, Unsaved, Zerox or Exec; a load
//! rebuilds them. These tests dump from one editor and load into a fresh
//! one, checking what each kind preserves:
//!
//! - Saved and Zerox: tag text and selections exactly
//! - Unsaved: embedded text, dirtiness and selection
//! - Exec: only the directory and command line (the command is re-run)
//!
//! Loads clear `current_dir` so the tests never change the process
//! directory under each other.

mod common;

use common::{TestEditor, contents, selection, wait_for};
use std::sync::Arc;
use winrow::session::SessionError;
use winrow::text::TextKind;
use winrow::window::LockOwner;
use winrow_dumpfile::{Column, Content, Text, Window as DumpWindow, WindowType};

fn kinds(content: &Content) -> Vec<WindowType> {
    content.windows.iter().map(|w| w.kind).collect()
}

fn dump(t: &TestEditor) -> Content {
    let mut content = t.editor.row().dump();
    content.current_dir.clear();
    content
}

fn saved(tag: &str, q0: usize, q1: usize) -> DumpWindow {
    let mut w = DumpWindow::new(WindowType::Saved);
    w.tag = Text::new(tag);
    w.body = Text {
        buffer: String::new(),
        q0,
        q1,
    };
    w
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dump_records_row_and_single_column() {
    let t = TestEditor::new();
    t.open(&t.write("a.txt", "a\n"));
    let content = t.editor.row().dump();
    assert_eq!(content.current_dir, t.editor.row().wdir);
    assert_eq!(content.columns.len(), 1);
    assert_eq!(content.columns[0].position, 0.0);
    assert_eq!(content.row_tag.buffer, winrow::row::ROW_TAG);
    assert_eq!(content.windows.len(), 1);
    assert_eq!(content.windows[0].position, 0.0);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_saved_window_round_trip() {
    let src = TestEditor::new();
    let path = src.write("a.txt", "hello world\n");
    let w = src.open(&path);
    {
        let mut g = w.lock(LockOwner::Editor);
        g.body.set_select(6, 11);
        g.clear_tag();
        let n = g.tag.len();
        g.tag.insert(n, "look ");
        g.tag.set_select(2, 4);
    }
    let tag_before = contents(&w, TextKind::Tag);
    let content = dump(&src);
    assert_eq!(kinds(&content), vec![WindowType::Saved]);
    assert!(content.windows[0].body.buffer.is_empty());
    src.stop().await;

    let dst = TestEditor::new();
    let restored = dst.editor.load_content(&content, false).await.unwrap();
    assert_eq!(restored, 1);
    let name = path.to_string_lossy().to_string();
    let w = dst.lookfile(&name).expect("restored window");
    assert_eq!(contents(&w, TextKind::Body), "hello world\n");
    assert_eq!(contents(&w, TextKind::Tag), tag_before);
    assert_eq!(selection(&w, TextKind::Body), (6, 11));
    assert_eq!(selection(&w, TextKind::Tag), (2, 4));
    assert!(!w.file().lock().dirty());
    dst.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_window_font_round_trip() {
    let config = winrow::Config {
        var_font: "var.font".to_string(),
        fixed_font: "fixed.font".to_string(),
        ..winrow::Config::default()
    };
    let src = TestEditor::with_config(config);
    let fixed = src.open(&src.write("fixed.txt", "f\n"));
    let plain = src.open(&src.write("plain.txt", "p\n"));
    winrow::exec::execute(&src.editor, &common::tag(&fixed), "Font").await;
    assert_eq!(fixed.lock(LockOwner::Editor).font, "fixed.font");

    let content = dump(&src);
    assert_eq!(content.windows[0].font, "fixed.font");
    assert_eq!(content.windows[1].font, "var.font");
    src.stop().await;

    let dst = TestEditor::new();
    dst.editor.load_content(&content, false).await.unwrap();
    let name = |w: &Arc<winrow::window::Window>| w.file().lock().name().to_string();
    let restored = dst.lookfile(&name(&fixed)).unwrap();
    assert_eq!(restored.lock(LockOwner::Editor).font, "fixed.font");
    let restored = dst.lookfile(&name(&plain)).unwrap();
    assert_eq!(restored.lock(LockOwner::Editor).font, "var.font");

    // Toggling again goes back to the variable-width font.
    winrow::exec::execute(&dst.editor, &common::tag(&restored), "Font fixed.font").await;
    winrow::exec::execute(&dst.editor, &common::tag(&restored), "Font").await;
    assert_eq!(restored.lock(LockOwner::Editor).font, "var.font");
    dst.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unsaved_window_embeds_text() {
    let src = TestEditor::new();
    let path = src.write("b.txt", "on disk\n");
    let w = src.open(&path);
    {
        let mut g = w.lock(LockOwner::Editor);
        g.body.insert(0, "edited ");
        g.body.set_select(0, 6);
        g.set_tag();
    }
    let content = dump(&src);
    assert_eq!(kinds(&content), vec![WindowType::Unsaved]);
    assert_eq!(content.windows[0].body.buffer, "edited on disk\n");
    src.stop().await;

    let dst = TestEditor::new();
    dst.editor.load_content(&content, false).await.unwrap();
    let w = dst.lookfile(&path.to_string_lossy()).unwrap();
    assert_eq!(contents(&w, TextKind::Body), "edited on disk\n");
    assert_eq!(selection(&w, TextKind::Body), (0, 6));
    assert!(w.file().lock().dirty());
    assert!(contents(&w, TextKind::Tag).contains(" Put |"));
    // The file on disk is untouched until Put.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "on disk\n");
    dst.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unnamed_window_is_unsaved() {
    let src = TestEditor::new();
    let w = src.editor.new_window().await.unwrap();
    w.lock(LockOwner::Editor).body.insert(0, "scratch");
    let content = dump(&src);
    assert_eq!(kinds(&content), vec![WindowType::Unsaved]);
    src.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zerox_shares_restored_file() {
    let src = TestEditor::new();
    let path = src.write("c.txt", "shared\n");
    let orig = src.open(&path);
    {
        let mut row = src.editor.row();
        src.editor.add_window(&mut row, Some(&orig), "").unwrap();
    }
    let clone = src.editor.row().column.tiles()[1].window.clone();
    clone.lock(LockOwner::Editor).body.set_select(1, 3);
    let content = dump(&src);
    assert_eq!(kinds(&content), vec![WindowType::Saved, WindowType::Zerox]);
    src.stop().await;

    let dst = TestEditor::new();
    assert_eq!(dst.editor.load_content(&content, false).await.unwrap(), 2);
    let row = dst.editor.row();
    let tiles = row.column.tiles();
    let (a, b) = (Arc::clone(&tiles[0].window), Arc::clone(&tiles[1].window));
    drop(row);
    assert!(a.shares_file(&b));
    assert_eq!(selection(&b, TextKind::Body), (1, 3));
    assert_eq!(contents(&b, TextKind::Body), "shared\n");
    dst.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zerox_without_original_loads_from_disk() {
    let t = TestEditor::new();
    let path = t.write("d.txt", "alone\n");
    let mut entry = saved(&format!("{} Del Snarf | Look ", path.to_string_lossy()), 0, 0);
    entry.kind = WindowType::Zerox;
    let content = Content {
        windows: vec![entry],
        ..Content::default()
    };
    t.editor.load_content(&content, false).await.unwrap();
    assert_eq!(t.body_of(&path.to_string_lossy()).as_deref(), Some("alone\n"));
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exec_takes_precedence() {
    let src = TestEditor::new();
    let path = src.write("e.txt", "output\n");
    let w = src.open(&path);
    let ctl = format!("dumpdir {}\ndump echo replayed\n", src.dir.path().to_string_lossy());
    src.editor.window_ctl(&w, &ctl).unwrap();
    w.lock(LockOwner::Editor).body.insert(0, "dirty ");
    let content = dump(&src);
    assert_eq!(kinds(&content), vec![WindowType::Exec]);
    let entry = &content.windows[0];
    assert_eq!(entry.exec_command, "echo replayed");
    assert_eq!(entry.exec_dir, src.dir.path().to_string_lossy());
    assert!(entry.body.buffer.is_empty());
    src.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exec_entry_reruns_command() {
    let t = TestEditor::new();
    let dir = t.dir.path().to_string_lossy().to_string();
    let mut entry = DumpWindow::new(WindowType::Exec);
    entry.exec_dir = dir.clone();
    entry.exec_command = "echo replayed".to_string();
    let content = Content {
        windows: vec![entry],
        ..Content::default()
    };
    assert_eq!(t.editor.load_content(&content, false).await.unwrap(), 1);
    assert!(wait_for(|| t.errors(&dir).contains("replayed\n")).await);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_client_marked_window_is_rerun_after_load() {
    let run_dir = tempfile::TempDir::new().unwrap();
    let dir = run_dir.path().to_string_lossy().to_string();
    let src = TestEditor::new();
    let name = src.path("client.txt").to_string_lossy().to_string();
    let w = src.open(&src.write("client.txt", ""));
    src.editor
        .window_ctl(&w, &format!("dumpdir {}\ndump echo rebuilt", dir))
        .unwrap();
    assert!(matches!(
        src.editor.window_ctl(&w, "dump"),
        Err(winrow::window::CtlError::MissingArgument("dump"))
    ));
    let content = dump(&src);
    src.stop().await;

    let dst = TestEditor::new();
    assert_eq!(dst.editor.load_content(&content, false).await.unwrap(), 1);
    // The command runs again; the window itself is the command's to make.
    assert!(wait_for(|| dst.errors(&dir).contains("rebuilt\n")).await);
    assert!(dst.lookfile(&name).is_none());
    dst.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_stream_windows_are_skipped() {
    let t = TestEditor::new();
    let path = t.write("f.txt", "external\n");
    let ext = t.open(&path);
    {
        let mut row = t.editor.row();
        t.editor.add_window(&mut row, Some(&ext), "").unwrap();
    }
    ext.lock(LockOwner::Filesystem).open_events();
    let launched = t.open(&t.write("g.txt", "g\n"));
    launched.lock(LockOwner::Filesystem).open_events();
    t.editor.window_ctl(&launched, "dump win\n").unwrap();
    let content = dump(&t);
    // The external window and its zerox are gone; the exec-launched one stays.
    assert_eq!(kinds(&content), vec![WindowType::Exec]);
    assert_eq!(content.windows[0].exec_command, "win");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tag_suffix_scenario() {
    let t = TestEditor::new();
    let path = t.write("a.txt", "alpha\n");
    let name = path.to_string_lossy().to_string();
    let content = Content {
        windows: vec![saved(&format!("{} Del Snarf |look ", name), 0, 0)],
        ..Content::default()
    };
    t.editor.load_content(&content, false).await.unwrap();
    let w = t.lookfile(&name).unwrap();
    assert_eq!(w.lock(LockOwner::Editor).tag_suffix().as_deref(), Some("look "));
    assert_eq!(contents(&w, TextKind::Body), "alpha\n");
    assert_eq!(selection(&w, TextKind::Body), (0, 0));
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_range_selection_is_cleared() {
    let t = TestEditor::new();
    let path = t.write("short.txt", "abc");
    let name = path.to_string_lossy().to_string();
    let content = Content {
        windows: vec![saved(&format!("{} Del Snarf | Look ", name), 1, 500)],
        ..Content::default()
    };
    t.editor.load_content(&content, false).await.unwrap();
    let w = t.lookfile(&name).unwrap();
    assert_eq!(selection(&w, TextKind::Body), (0, 0));
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bad_entries_warn_and_loading_continues() {
    let t = TestEditor::new();
    let good = t.write("good.txt", "ok\n");
    let mut unknown = saved("x y |z", 0, 0);
    unknown.kind = WindowType::Unknown;
    let content = Content {
        windows: vec![
            saved("no-separator-here", 0, 0),
            unknown,
            saved(&format!("{} Del Snarf | Look ", good.to_string_lossy()), 0, 0),
        ],
        ..Content::default()
    };
    let restored = t.editor.load_content(&content, false).await.unwrap();
    assert_eq!(restored, 1);
    assert!(t.lookfile(&good.to_string_lossy()).is_some());
    let errors = t.errors("");
    assert!(errors.contains("bad window tag in dump file"), "{errors}");
    assert!(errors.contains("unknown dump file window type"), "{errors}");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scratch_names_are_not_read_from_disk() {
    let t = TestEditor::new();
    let content = Content {
        windows: vec![saved("+Errors Del Snarf | Look ", 0, 0)],
        ..Content::default()
    };
    t.editor.load_content(&content, false).await.unwrap();
    assert_eq!(t.body_of("+Errors").as_deref(), Some(""));
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_too_many_columns_rejects_document() {
    let t = TestEditor::new();
    let good = t.write("good.txt", "ok\n");
    let content = Content {
        columns: vec![Column::default(); 11],
        windows: vec![saved(&format!("{} Del Snarf | Look ", good.to_string_lossy()), 0, 0)],
        ..Content::default()
    };
    let err = t.editor.load_content(&content, false).await.unwrap_err();
    assert!(matches!(err, SessionError::TooManyColumns(11)));
    assert_eq!(err.to_string(), "bad number of columns 11");
    assert_eq!(t.window_count(), 0);
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initial_load_restores_row_tag() {
    let t = TestEditor::new();
    let content = Content {
        row_tag: Text::new("Newcol Kill Putall Dump Exit mk "),
        var_font: "/lib/font/var".to_string(),
        ..Content::default()
    };
    t.editor.load_content(&content, false).await.unwrap();
    assert_eq!(t.editor.row().tag.contents(), winrow::row::ROW_TAG);
    assert_eq!(t.editor.row().var_font, "/lib/font/var");

    t.editor.load_content(&content, true).await.unwrap();
    assert_eq!(t.editor.row().tag.contents(), "Newcol Kill Putall Dump Exit mk ");
    t.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dump_and_load_through_file() {
    let src = TestEditor::new();
    let path = src.write("h.txt", "via file\n");
    src.open(&path);
    let dump_path = src.path("session.dump");
    src.editor.dump_session(&dump_path).unwrap();

    // Keep the load from changing the process directory.
    let mut content = Content::load(&dump_path).unwrap();
    assert_eq!(kinds(&content), vec![WindowType::Saved]);
    content.current_dir.clear();
    content.save(&dump_path).unwrap();

    let dst = TestEditor::new();
    assert_eq!(dst.editor.load_session(&dump_path, false).await.unwrap(), 1);
    assert_eq!(dst.body_of(&path.to_string_lossy()).as_deref(), Some("via file\n"));
    dst.stop().await;

    let missing = src.path("missing.dump");
    let err = src.editor.load_session(&missing, false).await.unwrap_err();
    assert!(matches!(err, SessionError::Dumpfile(_)));
    src.stop().await;
}
