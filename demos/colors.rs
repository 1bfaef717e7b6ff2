// Draws every color and attribute combination. Tab flips between
// coloring the foreground and the background, Esc quits.

use termcell::*;

fn main() {
    let mut term = Term::init().unwrap();

    let mut on_fg = true;
    draw(&mut term, on_fg);

    loop {
        match term.poll_event() {
            Ok(Event::Key(ev)) if ev.key == KEY_ESC => break,
            Ok(Event::Key(ev)) if ev.key == KEY_TAB => {
                on_fg = !on_fg;
                draw(&mut term, on_fg);
            }
            Ok(Event::Resize { .. }) => draw(&mut term, on_fg),
            _ => {}
        }
    }
}

fn draw(term: &mut Term, on_fg: bool) {
    term.clear();

    for color in BLACK..=WHITE {
        for (row, &flags) in [0, BOLD, UNDERLINE, BOLD | UNDERLINE].iter().enumerate() {
            let attr = color | flags;
            let (fg, bg) = if on_fg { (attr, BLACK) } else { (WHITE, attr) };
            for (i, ch) in format!("{:02x} ", attr).chars().enumerate() {
                term.change_cell(color as u16 * 3 + i as u16, row as u16, ch, fg, bg);
            }
        }
    }

    term.present();
}
