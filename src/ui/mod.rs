//! Terminal chat screen.

mod draw;

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::session::Session;

/// Redraw cadence when no input arrives.
const FRAME_PERIOD: Duration = Duration::from_millis(100);

/// The chat screen. Owns the session engine and feeds keystrokes into it;
/// every frame ticks the engine and redraws.
pub struct App {
    session: Session,
    input: String,
    scroll: usize,
    force_quit: bool,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            input: String::new(),
            scroll: 0,
            force_quit: false,
        }
    }

    /// Main event loop. Returns once the operator signs off with `/quit` or
    /// bails out with Esc or Ctrl+C.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut events = EventStream::new();
        let mut frames = tokio::time::interval(FRAME_PERIOD);

        loop {
            tokio::select! {
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key).await?;
                        }
                        // Resizes settle on the next draw.
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => break,
                    }
                }
                _ = frames.tick() => {}
            }

            self.session.tick(Instant::now());
            terminal.draw(|f| draw::draw(f, &self.session, &self.input, self.scroll))?;

            if self.force_quit || self.session.is_ended() {
                break;
            }
        }

        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.force_quit = true;
            }
            KeyCode::Esc => self.force_quit = true,
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input);
                self.session.submit(&line, Instant::now()).await?;
                self.scroll = 0;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Up => {
                self.scroll = (self.scroll + 1).min(self.session.visible().count());
            }
            KeyCode::Down => {
                self.scroll = self.scroll.saturating_sub(1);
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finger::FingerStore;
    use crate::proto::{Command, Message};
    use ratatui::backend::TestBackend;
    use tempfile::{tempdir, TempDir};
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::Sender<Message>, TempDir) {
        let dir = tempdir().unwrap();
        let store = FingerStore::open(dir.path().join("finger.json")).unwrap();
        let (out_tx, _out_rx) = mpsc::channel(10);
        let (in_tx, in_rx) = mpsc::channel(10);
        let session = Session::new("N0CALL", "@CQ", store, out_tx, in_rx);
        (App::new(session), in_tx, dir)
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_draw_empty_screen() {
        let (app, _in_tx, _dir) = test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        terminal
            .draw(|f| draw::draw(f, &app.session, "hello", 0))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("@CQ"));
        assert!(text.contains("UTC"));
        assert!(text.contains("Heard"));
        assert!(text.contains("> hello"));
    }

    #[tokio::test]
    async fn test_draw_shows_traffic_and_stations() {
        let (mut app, in_tx, _dir) = test_app();

        in_tx
            .send(Message::new("W1AW", "@CQ", Command::Msg, "cq cq cq"))
            .await
            .unwrap();
        app.session.tick(Instant::now());

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|f| draw::draw(f, &app.session, "", 0))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("W1AW: cq cq cq"));
        // The station shows up in the heard panel too.
        assert!(text.contains(" W1AW"));
    }
}
