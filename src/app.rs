use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::error;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Stdout;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::assembler::{Turn, TurnStatus};
use crate::gateway::GatewayClient;
use crate::persona::Persona;
use crate::session::{Conversation, SessionStore};
use crate::ui;
use crate::ui::composer::{Composer, ComposerResult};

/// How long a transient notification stays on screen.
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Tick interval for draining the stream and redrawing.
const TICK: Duration = Duration::from_millis(50);

struct Notice {
    text: String,
    shown_at: Instant,
}

/// Top-level application state: the session store, the gateway client, the
/// composer, and at most one in-flight turn. Everything outside the network
/// read boundary is synchronous.
pub struct App {
    store: SessionStore,
    gateway: GatewayClient,
    persona: Persona,
    model: String,
    composer: Composer,
    turn: Option<Turn>,
    notice: Option<Notice>,
    should_quit: bool,
}

impl App {
    pub fn new(store: SessionStore, gateway: GatewayClient, persona: Persona, model: String) -> Self {
        Self {
            store,
            gateway,
            persona,
            model,
            composer: Composer::new("Say something... (Enter to send, Esc to quit)"),
            turn: None,
            notice: None,
            should_quit: false,
        }
    }

    /// Main loop: drain the in-flight stream, draw, then wait briefly for
    /// terminal input. Input handlers and stream updates never overlap.
    pub async fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while !self.should_quit {
            self.tick()?;
            terminal.draw(|frame| ui::draw(frame, self))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key)?;
                }
            }
        }
        Ok(())
    }

    /// Drain ready stream events into the store and expire stale notices.
    pub fn tick(&mut self) -> Result<()> {
        if let Some(turn) = &mut self.turn {
            match turn.poll(&mut self.store)? {
                TurnStatus::Streaming => {}
                TurnStatus::Finished => {
                    self.turn = None;
                }
                TurnStatus::Failed(reason) => {
                    error!("turn failed: {reason}");
                    self.turn = None;
                    self.show_notice(reason);
                }
            }
        }

        if let Some(notice) = &self.notice {
            if notice.shown_at.elapsed() > NOTICE_TTL {
                self.notice = None;
            }
        }

        Ok(())
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            (KeyCode::Char('n'), KeyModifiers::CONTROL) => {
                self.store.create_conversation()?;
            }
            (KeyCode::PageUp, _) => {
                self.select_adjacent(-1);
            }
            (KeyCode::PageDown, _) => {
                self.select_adjacent(1);
            }
            _ => {
                if let ComposerResult::Submitted(input) = self.composer.handle_key(key) {
                    if !self.submit(&input)? {
                        // Rejected send: give the typed text back.
                        self.composer.restore(input);
                    }
                }
            }
        }

        Ok(())
    }

    /// Send the user's text: append it to the active conversation (creating
    /// one if none), render the persona prompt, and start streaming the
    /// reply. A send while a turn is in flight is rejected with a notice;
    /// two interleaved streams into one conversation would corrupt it.
    /// Returns whether the send was accepted.
    pub fn submit(&mut self, input: &str) -> Result<bool> {
        if self.turn.is_some() {
            self.show_notice("A reply is still streaming; wait for it to finish".to_string());
            return Ok(false);
        }

        let conversation_id = self.store.post_user_message(input)?;
        let prior = self
            .store
            .conversation(conversation_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default();

        let prompt = self.persona.render(input);
        let events = self.gateway.stream_completion(prompt, self.model.clone());
        self.turn = Some(Turn::new(conversation_id, prior, events));

        Ok(true)
    }

    /// Move the active selection by `delta` within display order.
    fn select_adjacent(&mut self, delta: isize) {
        let conversations = self.store.conversations();
        if conversations.is_empty() {
            return;
        }

        let current = self
            .store
            .active_id()
            .and_then(|id| conversations.iter().position(|c| c.id == id))
            .unwrap_or(0);
        let len = conversations.len() as isize;
        let next = (current as isize + delta).rem_euclid(len) as usize;

        let id = conversations[next].id;
        self.store.select_conversation(id);
    }

    fn show_notice(&mut self, text: String) {
        self.notice = Some(Notice {
            text,
            shown_at: Instant::now(),
        });
    }

    // Accessors for rendering

    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.store.active_id()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.store.active_conversation()
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn is_streaming(&self) -> bool {
        self.turn.is_some()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|n| n.text.as_str())
    }
}
