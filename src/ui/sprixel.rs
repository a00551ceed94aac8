/// The atom of rendering: one styled glyph.
///
/// A Sprixel is a glyph plus optional foreground/background colors. A
/// transparent background means "inherit whatever the cell under me
/// uses": the board copies the overlapped item's background into the
/// mover when it steps onto it.

use crossterm::style::Color;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprixel {
    pub model: String,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
    pub is_bg_transparent: bool,
}

impl Sprixel {
    pub fn new(model: &str, fg_color: Option<Color>, bg_color: Option<Color>) -> Self {
        Sprixel {
            model: model.to_string(),
            fg_color,
            bg_color,
            is_bg_transparent: false,
        }
    }

    /// A bare glyph with no styling.
    pub fn from_model(model: &str) -> Self {
        Sprixel::new(model, None, None)
    }

    /// A glyph whose background adopts the cell it stands on.
    pub fn transparent(model: &str, fg_color: Option<Color>) -> Self {
        Sprixel {
            model: model.to_string(),
            fg_color,
            bg_color: None,
            is_bg_transparent: true,
        }
    }
}

// ── Animation ──

/// A cyclic list of sprixel frames. The engine only ever calls
/// `next_frame()` once per tick; the frame content is the host's
/// business.
#[derive(Clone, Debug)]
pub struct Animation {
    frames: Vec<Sprixel>,
    index: usize,
}

impl Animation {
    /// Panic-free on empty input: an empty animation just repeats a
    /// blank sprixel.
    pub fn new(frames: Vec<Sprixel>) -> Self {
        let frames = if frames.is_empty() {
            vec![Sprixel::from_model(" ")]
        } else {
            frames
        };
        Animation { frames, index: 0 }
    }

    pub fn current_frame(&self) -> &Sprixel {
        &self.frames[self.index]
    }

    /// Advance one frame, wrapping at the end.
    pub fn next_frame(&mut self) -> &Sprixel {
        self.index = (self.index + 1) % self.frames.len();
        &self.frames[self.index]
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
