use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers};
use futures::{future::FutureExt, StreamExt};
use futures_timer::Delay;
use motor::PwmOutput;
use std::time::Duration;

use crate::quad::Quadcopter;

const KEY_ENTER: Event = Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
const KEY_ESC: Event = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
const KEY_CTRL_C: Event = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
const KEY_CTRL_D: Event = Event::Key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));
const KEY_IGNITE: Event = Event::Key(KeyEvent::new(KeyCode::Char('i'), KeyModifiers::NONE));
const KEY_OFF: Event = Event::Key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE));
const KEY_PLUS: Event = Event::Key(KeyEvent::new(KeyCode::Char('+'), KeyModifiers::NONE));
const KEY_MINUS: Event = Event::Key(KeyEvent::new(KeyCode::Char('-'), KeyModifiers::NONE));
const KEY_ARROW_UP: Event = Event::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
const KEY_ARROW_DOWN: Event = Event::Key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));

const THROTTLE_STEP: u8 = 10;

/// Overall throttle level currently commanded, as percent per motor.
fn level<P: PwmOutput>(quad: &Quadcopter<P>) -> u8 {
    (quad.total_throttle() / 4) as u8
}

fn print_state<P: PwmOutput>(quad: &Quadcopter<P>) {
    if quad.is_powered() {
        let [fl, fr, rl, rr] = quad.throttles();
        println!(
            "ON   fl={}% fr={}% rl={}% rr={}%\r",
            fl, fr, rl, rr
        );
    } else {
        println!("OFF\r");
    }
}

/// Operator key loop. All control logic stays in the coordinator; this only
/// maps keys onto its three operations.
///
/// - 'i' ignite, 'o' off
/// - '+'/up +10% overall throttle, '-'/down -10%
/// - ESC / CTRL+C / CTRL+D: throttle to zero, off, exit
pub async fn run<P: PwmOutput>(quad: &mut Quadcopter<P>) {
    let mut reader = EventStream::new();
    println!("i: ignite | o: off | +: up | -: down | esc: quit\r");

    loop {
        let delay = Delay::new(Duration::from_millis(10)).fuse();
        let event = reader.next().fuse();
        tokio::select! {
            maybe_event = event => {
                match maybe_event {
                    Some(Ok(event)) => {
                        // add newline to terminal
                        if event == KEY_ENTER {
                            println!("\r");
                        }

                        if event == KEY_ESC || event == KEY_CTRL_C || event == KEY_CTRL_D {
                            quad.set_overall_throttle(0);
                            quad.turn_off();
                            break;
                        }

                        if event == KEY_IGNITE {
                            quad.turn_on();
                            print_state(quad);
                        }
                        if event == KEY_OFF {
                            quad.turn_off();
                            print_state(quad);
                        }

                        if event == KEY_PLUS || event == KEY_ARROW_UP {
                            let target = level(quad).saturating_add(THROTTLE_STEP).min(100);
                            quad.set_overall_throttle(target);
                            print_state(quad);
                        }
                        if event == KEY_MINUS || event == KEY_ARROW_DOWN {
                            let target = level(quad).saturating_sub(THROTTLE_STEP);
                            quad.set_overall_throttle(target);
                            print_state(quad);
                        }
                    }
                    Some(Err(e)) => println!("Error: {e:?}\r"),
                    None => break,
                }
            }
            _ = delay => {}
        }
    }
}
