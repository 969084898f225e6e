//! Two-button settings menu
//!
//! Button 1 moves the highlight, button 2 changes the highlighted value (or
//! starts the selected mode when the highlight is on "Start"). Pressing both
//! starts immediately.

use core::fmt::Write;

use heapless::String;

use crate::config::{MonitorConfig, WarningLevel};
use crate::input::ButtonEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Mode,
    Warn,
    Alert,
    Time,
    Start,
}

impl MenuItem {
    pub const ALL: [Self; 5] = [Self::Mode, Self::Warn, Self::Alert, Self::Time, Self::Start];

    pub const fn next(self) -> Self {
        match self {
            Self::Mode => Self::Warn,
            Self::Warn => Self::Alert,
            Self::Alert => Self::Time,
            Self::Time => Self::Start,
            Self::Start => Self::Mode,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Mode => "Mode",
            Self::Warn => "Warn",
            Self::Alert => "Alert",
            Self::Time => "Time",
            Self::Start => "Start",
        }
    }
}

/// Snapshot handed to the display for one menu frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub selected: MenuItem,
    pub config: MonitorConfig,
}

impl MenuView {
    /// Text shown next to `item`'s label.
    pub fn value(&self, item: MenuItem) -> String<16> {
        let mut text = String::new();
        // 16 bytes fits every value below
        let _ = match item {
            MenuItem::Mode => text.push_str(self.config.mode.label()).map_err(|_| core::fmt::Error),
            MenuItem::Warn => match self.config.warning {
                WarningLevel::Disabled => text.push_str("Disabled").map_err(|_| core::fmt::Error),
                WarningLevel::Ppm(ppm) => write!(text, "{} ppm", ppm),
            },
            MenuItem::Alert => text.push_str(self.config.alert.label()).map_err(|_| core::fmt::Error),
            MenuItem::Time => write!(text, "{} Mins", self.config.period_minutes),
            MenuItem::Start => Ok(()),
        };
        text
    }
}

/// Result of feeding one button press to the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Nothing to do
    Ignore,
    Redraw,
    /// Leave the menu and run the configured mode
    Start,
}

pub struct Menu {
    selected: MenuItem,
    config: MonitorConfig,
}

impl Menu {
    pub const fn new(config: MonitorConfig) -> Self {
        Self {
            selected: MenuItem::Mode,
            config,
        }
    }

    pub const fn config(&self) -> MonitorConfig {
        self.config
    }

    pub fn view(&self) -> MenuView {
        MenuView {
            selected: self.selected,
            config: self.config,
        }
    }

    pub fn handle(&mut self, event: ButtonEvent) -> MenuAction {
        match event {
            ButtonEvent::None => MenuAction::Ignore,
            ButtonEvent::Both => MenuAction::Start,
            ButtonEvent::First => {
                self.selected = self.selected.next();
                MenuAction::Redraw
            }
            ButtonEvent::Second => {
                match self.selected {
                    MenuItem::Mode => self.config.mode = self.config.mode.next(),
                    MenuItem::Warn => self.config.warning = self.config.warning.next(),
                    MenuItem::Alert => self.config.alert = self.config.alert.next(),
                    MenuItem::Time => self.config.next_period(),
                    MenuItem::Start => return MenuAction::Start,
                }
                MenuAction::Redraw
            }
        }
    }
}
