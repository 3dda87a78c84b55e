use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use thiserror::Error;

use crate::config::PanelConfig;
use crate::error::PanelError;
use crate::geometry::{Point, Size};
use crate::layout::GridSpec;
use crate::runtime::PanelRuntime;
use crate::sync::PanelView;
use crate::touch::{TouchSample, TouchSensor, TouchTransform};

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("panel error: {0}")]
    Panel(#[from] PanelError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
struct TouchState {
    transform: TouchTransform,
    current: TouchSample,
    /// Press and release edges not yet seen by the runtime, oldest first.
    edges: VecDeque<TouchSample>,
}

impl Default for TouchState {
    fn default() -> Self {
        Self {
            transform: TouchTransform::identity(Size::new(0, 0)),
            current: TouchSample::released(),
            edges: VecDeque::new(),
        }
    }
}

/// Touch sensor fed by terminal mouse events. Clones share state.
///
/// Mouse cells are already in surface space, so each press is mapped back
/// into the configured sensor orientation; the synchronizer's transform then
/// undoes it. Every [`Orientation`](crate::touch::Orientation) is its own
/// inverse.
#[derive(Debug, Clone, Default)]
pub struct TerminalTouch {
    state: Arc<Mutex<TouchState>>,
}

impl TerminalTouch {
    pub fn new(transform: TouchTransform) -> Self {
        let touch = Self::default();
        touch.set_transform(transform);
        touch
    }

    pub fn set_transform(&self, transform: TouchTransform) {
        self.state().transform = transform;
    }

    fn state(&self) -> MutexGuard<'_, TouchState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn press(&self, point: Point) {
        let mut state = self.state();
        let raw = state.transform.apply(point);
        let sample = TouchSample::pressed(raw.x, raw.y);
        if !state.current.touched {
            state.edges.push_back(sample);
        }
        state.current = sample;
    }

    pub fn release(&self) {
        let mut state = self.state();
        if state.current.touched {
            state.edges.push_back(TouchSample::released());
        }
        state.current = TouchSample::released();
    }
}

impl TouchSensor for TerminalTouch {
    fn read(&mut self) -> TouchSample {
        let mut state = self.state();
        state.edges.pop_front().unwrap_or(state.current)
    }
}

/// Panel geometry from the config, scaled from pixels onto terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalGeometry {
    panel: Size,
    grid: GridSpec,
    touch: TouchTransform,
}

impl TerminalGeometry {
    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            panel: config.surface(),
            grid: config.grid(),
            touch: config.touch_transform(),
        }
    }

    /// Header keeps room for a bordered title row; non-zero padding keeps at
    /// least one cell.
    pub fn grid(&self, cells: Size) -> GridSpec {
        let header_height =
            scale(self.grid.header_height, self.panel.height, cells.height).max(MIN_HEADER_ROWS);
        let padding = match self.grid.padding {
            0 => 0,
            padding => scale(padding, self.panel.width, cells.width).max(1),
        };
        GridSpec {
            header_height,
            padding,
        }
    }

    pub fn touch_transform(&self, cells: Size) -> TouchTransform {
        let sensor = Size::new(
            scale(self.touch.sensor.width, self.panel.width, cells.width),
            scale(self.touch.sensor.height, self.panel.height, cells.height),
        );
        TouchTransform::new(self.touch.orientation, sensor)
    }
}

const MIN_HEADER_ROWS: u16 = 3;

fn scale(value: u16, from: u16, to: u16) -> u16 {
    let scaled = u32::from(value) * u32::from(to) / u32::from(from.max(1));
    u16::try_from(scaled).unwrap_or(u16::MAX)
}

pub fn terminal_size() -> DriverResult<Size> {
    let (width, height) = terminal::size()?;
    Ok(Size::new(width, height))
}

/// Driver-level meaning of a terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverInput {
    Press(Point),
    Release,
    Resize(Size),
    Exit,
}

pub fn translate(event: &Event) -> Option<DriverInput> {
    match event {
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                Some(DriverInput::Press(Point::new(mouse.column, mouse.row)))
            }
            MouseEventKind::Up(MouseButton::Left) => Some(DriverInput::Release),
            _ => None,
        },
        Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(DriverInput::Exit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(DriverInput::Exit)
            }
            _ => None,
        },
        Event::Resize(width, height) => Some(DriverInput::Resize(Size::new(*width, *height))),
        _ => None,
    }
}

/// Terminal driver: owns a `PanelRuntime`, manages raw mode, the alternate
/// screen and mouse capture, and paces the loop at the configured interval.
///
/// The runtime's surface should already match [`terminal_size`]; later
/// resizes arrive as events.
pub struct CliDriver<V: PanelView> {
    runtime: PanelRuntime<V>,
    touch: TerminalTouch,
    geometry: TerminalGeometry,
}

impl<V: PanelView> CliDriver<V> {
    /// `touch` must be a clone of the sensor the runtime was built with.
    pub fn new(runtime: PanelRuntime<V>, touch: TerminalTouch, geometry: TerminalGeometry) -> Self {
        Self {
            runtime,
            touch,
            geometry,
        }
    }

    pub fn run(mut self) -> DriverResult<PanelRuntime<V>> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner();
        self.exit(&mut stdout);
        result.map(|()| self.runtime)
    }

    fn run_inner(&mut self) -> DriverResult<()> {
        let interval = self.runtime.config().loop_interval;
        let mut last_tick = Instant::now();
        self.runtime.bootstrap(last_tick);

        while !self.runtime.should_exit() {
            let timeout = interval.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                let event = event::read()?;
                self.apply(translate(&event));
            }
            if last_tick.elapsed() >= interval {
                last_tick = Instant::now();
                self.runtime.tick(last_tick);
            }
        }
        self.runtime.finalize(Instant::now());
        Ok(())
    }

    fn apply(&mut self, input: Option<DriverInput>) {
        match input {
            Some(DriverInput::Press(point)) => self.touch.press(point),
            Some(DriverInput::Release) => self.touch.release(),
            Some(DriverInput::Resize(size)) => {
                let transform = self.geometry.touch_transform(size);
                self.touch.set_transform(transform);
                self.runtime.set_touch_transform(transform);
                self.runtime.resize(size);
            }
            Some(DriverInput::Exit) => self.runtime.request_exit(),
            None => {}
        }
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode().map_err(|err| DriverError::Terminal(err.to_string()))?;
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, Show, DisableMouseCapture, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}
