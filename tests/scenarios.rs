//! End-to-end coverage for the concrete buffer/emulator scenarios, driven
//! entirely through the public `Emulator` API.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use sunder_mux::term::emulator::{Emulator, EmulatorWriter};

#[derive(Debug, Clone, Default)]
struct RecordingWriter(Arc<Mutex<Vec<u8>>>);

impl EmulatorWriter for RecordingWriter {
    fn write(&mut self, data: &[u8]) {
        self.0.lock().unwrap().extend_from_slice(data);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn emulator(width: usize, height: usize) -> (Emulator, Arc<Mutex<Vec<u8>>>) {
    let writer = RecordingWriter::default();
    let replies = Arc::clone(&writer.0);
    (Emulator::new(width, height, Box::new(writer)), replies)
}

fn visible_line(e: &Emulator, row: usize) -> String {
    e.active_buffer().line_text(row)
}

#[test]
fn scenario_1_tab_stops_across_two_lines() {
    let (mut e, _) = emulator(30, 3);
    e.feed(b"hello");
    e.feed(b"\t");
    e.feed(b"x");
    e.feed(b"\t");
    e.feed(b"goodbye");
    e.feed(b"\r\n");
    e.feed(b"hell");
    e.feed(b"\t");
    e.feed(b"xxx");
    e.feed(b"\t");
    e.feed(b"good");
    e.feed(b"\r\n");

    assert_eq!(visible_line(&e, 0), "hello   x   goodbye");
    assert_eq!(visible_line(&e, 1), "hell    xxx good");
}

#[test]
fn scenario_2_six_x_wraps_one_line_width_5() {
    let (mut e, _) = emulator(5, 4);
    e.feed(b"xxxxxx");

    assert_eq!(e.active_buffer().cursor_x(), 1);
    assert_eq!(e.active_buffer().cursor_y(), 1);
    assert_eq!(visible_line(&e, 0), "xxxxx");
    assert_eq!(visible_line(&e, 1), "x");
}

#[test]
fn scenario_3_line_feed_mode_off_does_not_imply_carriage_return() {
    let (mut e, _) = emulator(3, 20);
    e.feed(b"\x1b[20l"); // RM 20: LineFeedMode off
    e.feed(b"abc");
    e.feed(b"\n");
    e.feed(b"def");
    e.feed(b"\n");

    assert_eq!(visible_line(&e, 0), "abc");
    assert_eq!(visible_line(&e, 1), "def");
    assert_eq!(visible_line(&e, 2), "");
}

#[test]
fn scenario_4_erase_line_to_cursor_after_moving_left() {
    let (mut e, _) = emulator(80, 5);
    e.feed(b"hello, this is a test\r\ndeleted");
    e.feed(b"\x1b[3D"); // CUB 3
    e.feed(b"\x1b[1K"); // EL 1: erase to cursor

    assert_eq!(visible_line(&e, 0), "hello, this is a test");
    let raw = e.active_buffer().line_raw_text(1);
    assert_eq!(&raw.as_bytes()[..5], [0, 0, 0, 0, 0]);
    assert!(raw.ends_with("ed"));
}

#[test]
fn scenario_5_da1_query_replies_over_the_public_writer_trait() {
    let (mut e, replies) = emulator(10, 5);
    e.feed(b"\x1b[c");
    assert_eq!(replies.lock().unwrap().as_slice(), b"\x1b[?1;2c");
}

#[tokio::test]
async fn scenario_6_shortcut_split_inserts_a_vertical_container() {
    use sunder_mux::pane::{Container, Leaf, Pane, SplitMode};

    let (tx, _rx) = tokio::sync::mpsc::channel(8);

    let mut leaf = Leaf::new("/bin/sh", 24, 80);
    leaf.start(24, 80, tx.clone()).expect("initial pty should spawn");
    leaf.set_active(true);
    let leaf_id = leaf.id();

    let mut container = Container::new(SplitMode::Horizontal, vec![Pane::Terminal(leaf)]);

    let new_id = container
        .split(leaf_id, SplitMode::Vertical, "/bin/sh", &tx)
        .expect("split against a single leaf should not fail")
        .expect("target leaf exists in this container");

    assert_ne!(new_id, leaf_id);
    assert_eq!(container.find_active(), Some(new_id));

    let mut out = String::new();
    container.render(new_id, 0, 0, 24, 80, &mut out);
    assert!(!out.is_empty(), "rendering the new leaf first should produce output");
}
