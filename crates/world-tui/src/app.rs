use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use world_core::{Attempt, AttemptUpdate, GenerationState, GreetingController, Preset};

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

pub struct App {
    /// Sole writer of the generation state.
    pub controller: GreetingController,
    /// Set once the user asks to leave.
    pub should_quit: bool,
    spinner: usize,
}

impl App {
    pub fn new(controller: GreetingController) -> Self {
        Self {
            controller,
            should_quit: false,
            spinner: 0,
        }
    }

    pub fn state(&self) -> &GenerationState {
        self.controller.state()
    }

    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.controller.registry().iter()
    }

    pub fn selected_index(&self) -> usize {
        let active = &self.state().active_preset().id;
        self.controller.registry().position(active).unwrap_or(0)
    }

    pub fn select_index(&mut self, index: usize) -> bool {
        match self.controller.registry().at(index).cloned() {
            Some(preset) => {
                self.controller.select_preset(&preset);
                true
            }
            None => false,
        }
    }

    pub fn select_next(&mut self) {
        let len = self.controller.registry().len();
        self.select_index((self.selected_index() + 1) % len);
    }

    pub fn select_previous(&mut self) {
        let len = self.controller.registry().len();
        self.select_index((self.selected_index() + len - 1) % len);
    }

    /// Like the disabled button on the web page: nothing happens while loading.
    pub fn request_generation(&mut self) -> Option<Attempt> {
        if self.state().is_loading() {
            return None;
        }
        self.spinner = 0;
        Some(self.controller.begin(None))
    }

    pub fn apply(&mut self, update: AttemptUpdate) -> bool {
        self.controller.apply(update)
    }

    pub fn on_tick(&mut self) {
        if self.state().is_loading() {
            self.spinner = (self.spinner + 1) % SPINNER.len();
        }
    }

    pub fn spinner_frame(&self) -> &'static str {
        SPINNER[self.spinner]
    }

    /// Returns the attempt to run if the key started a generation.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Attempt> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Left | KeyCode::Char('h') => self.select_previous(),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => self.select_next(),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.select_index(index);
            }
            KeyCode::Enter | KeyCode::Char('g') => return self.request_generation(),
            _ => {}
        }
        None
    }
}
