// Echoes decoded input events on the first line. Press q to quit.

use termcell::*;

fn main() {
    let mut term = Term::init().unwrap();
    term.set_input_mode(InputMode::Esc);

    let mut line = String::from("press keys (q quits)");
    loop {
        term.clear();
        for (i, ch) in line.chars().enumerate() {
            term.change_cell(i as u16, 0, ch, WHITE, BLACK);
        }
        term.present();

        match term.poll_event() {
            Ok(Event::Key(ev)) => {
                if ev.ch == 'q' {
                    break;
                }
                line = if ev.key != 0 {
                    format!("key {:#06x}", ev.key)
                } else {
                    format!("char {:?} (alt: {})", ev.ch, ev.alt)
                };
            }
            Ok(Event::Resize { w, h }) => {
                line = format!("resize {}x{}", w, h);
            }
            Err(err) => {
                line = err.to_string();
            }
        }
    }
}
