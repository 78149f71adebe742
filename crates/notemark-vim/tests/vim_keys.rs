use notemark_core::{Editor, Selection};
use notemark_preview::Key;
use notemark_syntax::SyntaxCache;
use notemark_vim::{HostRequest, Mode, Register, Vim};
use pretty_assertions::assert_eq;

struct Harness {
    editor: Editor,
    cache: SyntaxCache,
    vim: Vim,
    requests: Vec<HostRequest>,
}

impl Harness {
    fn new(text: &str, cursor: usize) -> Self {
        let mut editor = Editor::new(text);
        editor.set_selection(Selection::cursor(cursor)).unwrap();
        Self {
            editor,
            cache: SyntaxCache::default(),
            vim: Vim::new(true),
            requests: Vec::new(),
        }
    }

    fn keys(&mut self, notation: &str) -> &mut Self {
        for key in Key::parse_sequence(notation) {
            let requests = self
                .vim
                .feed(key, &mut self.editor, &mut self.cache)
                .unwrap();
            self.requests.extend(requests);
        }
        self
    }

    fn text(&self) -> String {
        self.editor.text()
    }

    fn cursor(&self) -> usize {
        self.editor.selection().head()
    }

    fn mode(&self) -> Mode {
        self.vim.state().mode()
    }
}

#[test]
fn test_insert_then_escape_returns_to_normal() {
    let mut h = Harness::new("", 0);
    h.keys("iabc<Esc>");
    assert_eq!(h.text(), "abc");
    assert_eq!(h.mode(), Mode::Normal);
    assert_eq!(h.cursor(), 2);
    assert_eq!(h.vim.state().indicator(), "NORMAL");
}

#[test]
fn test_operators_take_counts() {
    let mut h = Harness::new("one two three", 0);
    h.keys("d2w");
    assert_eq!(h.text(), "three");

    let mut h = Harness::new("a\nb\nc", 0);
    h.keys("2dd");
    assert_eq!(h.text(), "c");
    assert_eq!(
        h.vim.state().register(),
        &Register {
            text: "a\nb\n".to_string(),
            linewise: true
        }
    );

    let mut h = Harness::new("abcdef", 1);
    h.keys("3x");
    assert_eq!(h.text(), "aef");
    assert_eq!(h.cursor(), 1);
}

#[test]
fn test_delete_last_line_takes_preceding_break() {
    let mut h = Harness::new("a\nb", 2);
    h.keys("dd");
    assert_eq!(h.text(), "a");
    assert_eq!(h.cursor(), 0);
}

#[test]
fn test_delete_word_stops_at_line_end() {
    let mut h = Harness::new("foo bar\nbaz", 4);
    h.keys("dw");
    assert_eq!(h.text(), "foo \nbaz");
    assert_eq!(h.cursor(), 3);
}

#[test]
fn test_change_inner_word_is_one_undo_step() {
    let mut h = Harness::new("say hello world", 5);
    h.keys("ciwbye<Esc>");
    assert_eq!(h.text(), "say bye world");
    assert_eq!(h.mode(), Mode::Normal);

    h.keys("u");
    assert_eq!(h.text(), "say hello world");
    h.keys("<C-r>");
    assert_eq!(h.text(), "say bye world");
}

#[test]
fn test_change_word_with_count_spans_words_not_gaps() {
    let mut h = Harness::new("one two three", 0);
    h.keys("c2wx<Esc>");
    assert_eq!(h.text(), "x three");
}

#[test]
fn test_change_and_delete_to_line_end() {
    let mut h = Harness::new("keep this", 5);
    h.keys("D");
    assert_eq!(h.text(), "keep ");
    assert_eq!(h.cursor(), 4);

    let mut h = Harness::new("keep this", 5);
    h.keys("Cthat<Esc>");
    assert_eq!(h.text(), "keep that");

    let mut h = Harness::new("  a\nb", 0);
    h.keys("ccx<Esc>");
    assert_eq!(h.text(), "x\nb");
}

#[test]
fn test_dot_repeats_last_change() {
    let mut h = Harness::new("a b c d", 0);
    h.keys("dw..");
    assert_eq!(h.text(), "d");

    let mut h = Harness::new("x", 0);
    h.keys("ahi<Esc>.");
    assert_eq!(h.text(), "xhihi");
}

#[test]
fn test_dot_count_replaces_change_count() {
    let mut h = Harness::new("a b c d e f g", 0);
    h.keys("d2w");
    assert_eq!(h.text(), "c d e f g");
    h.keys("3.");
    assert_eq!(h.text(), "f g");

    let mut h = Harness::new("x", 0);
    h.keys("ahi<Esc>2.");
    assert_eq!(h.text(), "xhihihi");
}

#[test]
fn test_open_lines_above_and_below() {
    let mut h = Harness::new("a", 0);
    h.keys("ob<Esc>Oc<Esc>");
    assert_eq!(h.text(), "a\nc\nb");
}

#[test]
fn test_put_from_unnamed_register() {
    let mut h = Harness::new("one two", 0);
    h.keys("yiw$p");
    assert_eq!(h.text(), "one twoone");
    assert_eq!(h.cursor(), 9);

    let mut h = Harness::new("first\nsecond", 0);
    h.keys("yyp");
    assert_eq!(h.text(), "first\nfirst\nsecond");
    assert_eq!(h.cursor(), 6);

    let mut h = Harness::new("solo", 0);
    h.keys("yyp");
    assert_eq!(h.text(), "solo\nsolo");
}

#[test]
fn test_visual_operators() {
    let mut h = Harness::new("hello world", 0);
    h.keys("ve");
    assert_eq!(h.mode(), Mode::Visual);
    assert_eq!(h.editor.selection().main().from(), 0);
    assert_eq!(h.editor.selection().main().to(), 5);
    h.keys("d");
    assert_eq!(h.text(), " world");
    assert_eq!(h.mode(), Mode::Normal);

    let mut h = Harness::new("f(a, b)", 3);
    h.keys("vi(d");
    assert_eq!(h.text(), "f()");

    let mut h = Harness::new("a\nb", 0);
    h.keys("Vjy");
    assert_eq!(h.vim.state().register().text, "a\nb\n");
    assert_eq!(h.mode(), Mode::Normal);
}

#[test]
fn test_insert_mode_formatting_and_auto_pair() {
    let mut h = Harness::new("", 0);
    h.keys("i<C-b>bold<Esc>");
    assert_eq!(h.text(), "**bold**");

    let mut h = Harness::new("", 0);
    h.keys("i**x");
    assert_eq!(h.text(), "**x**");
    assert_eq!(h.mode(), Mode::Insert);
}

#[test]
fn test_write_quit_requests_save_and_close() {
    let mut h = Harness::new("note", 0);
    h.keys(":wq<CR>");
    assert_eq!(h.requests, vec![HostRequest::SaveAndClose]);
    assert_eq!(h.mode(), Mode::Normal);

    let mut h = Harness::new("note", 0);
    h.keys(":q!<CR>");
    assert_eq!(h.requests, vec![HostRequest::DiscardAndClose]);
}

#[test]
fn test_unknown_command_stays_in_command_mode() {
    let mut h = Harness::new("note", 0);
    h.keys(":bogus<CR>");
    assert!(h.requests.is_empty());
    assert_eq!(h.mode(), Mode::Command);
    assert_eq!(h.vim.state().message(), Some("Not a command: bogus"));
    assert_eq!(h.text(), "note");
}

#[test]
fn test_motions_move_cursor() {
    let mut h = Harness::new("alpha beta\n  gamma", 0);
    h.keys("w");
    assert_eq!(h.cursor(), 6);
    h.keys("$");
    assert_eq!(h.cursor(), 9);
    h.keys("j");
    assert_eq!(h.cursor(), 17);
    h.keys("^");
    assert_eq!(h.cursor(), 13);
    h.keys("gg");
    assert_eq!(h.cursor(), 0);
    h.keys("G");
    assert_eq!(h.cursor(), 13);
}

#[test]
fn test_tab_types_configured_spaces() {
    let mut h = Harness::new("", 0);
    h.vim = Vim::new(true).with_tab_width(2);
    h.keys("i<Tab>x<Esc>");
    assert_eq!(h.text(), "  x");

    let mut h = Harness::new("", 0);
    h.keys("i<Tab><Esc>");
    assert_eq!(h.text(), "\t");
}
