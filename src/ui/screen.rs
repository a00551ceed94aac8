/// Minimal terminal surface: emit a styled glyph at the cursor, clear
/// the screen, move the cursor, report the size. Everything goes
/// through a buffered writer and crossterm's queued commands so a full
/// board redraw is one syscall.

use std::io::{self, BufWriter, Stdout, Write};

use crossterm::{
    cursor::MoveTo,
    execute, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::ui::sprixel::Sprixel;

/// Write one styled glyph to any writer. Colors are set only when the
/// sprixel carries them, and reset right after.
pub fn emit_sprixel(out: &mut impl Write, sprixel: &Sprixel) -> io::Result<()> {
    if let Some(fg) = sprixel.fg_color {
        queue!(out, SetForegroundColor(fg))?;
    }
    if let Some(bg) = sprixel.bg_color {
        queue!(out, SetBackgroundColor(bg))?;
    }
    queue!(out, Print(&sprixel.model))?;
    if sprixel.fg_color.is_some() || sprixel.bg_color.is_some() {
        queue!(out, ResetColor)?;
    }
    Ok(())
}

pub struct Screen {
    writer: BufWriter<Stdout>,
}

impl Screen {
    pub fn new() -> Self {
        Screen { writer: BufWriter::with_capacity(16384, io::stdout()) }
    }

    /// Wipe the terminal and home the cursor.
    pub fn clear(&mut self) -> io::Result<()> {
        execute!(self.writer, Clear(ClearType::All), MoveTo(0, 0))
    }

    pub fn move_to(&mut self, column: u16, row: u16) -> io::Result<()> {
        queue!(self.writer, MoveTo(column, row))
    }

    pub fn emit(&mut self, sprixel: &Sprixel) -> io::Result<()> {
        emit_sprixel(&mut self.writer, sprixel)
    }

    /// Terminal size as (columns, rows).
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Default for Screen {
    fn default() -> Self {
        Screen::new()
    }
}
